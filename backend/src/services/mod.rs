//! Domain services. Each takes the authenticated [`Actor`] and enforces its
//! own role and ownership rules.

use crate::{
    error::AppError,
    models::{lecture::Lecture, user::Actor},
    repositories::lecture::LectureRepositoryTrait,
    types::LectureId,
};

pub mod geofence;
pub mod lecture;
pub mod notifier;
pub mod passcode;
pub mod presence;
pub mod reconciliation;
pub mod scoring;

pub use lecture::LectureService;
pub use notifier::{EventHub, Notifier};
pub use passcode::{PasscodeRotator, PasscodeService};
pub use presence::PresenceService;
pub use reconciliation::ReconciliationService;
pub use scoring::ScoringPolicy;

pub(crate) fn require_teacher(actor: &Actor) -> Result<(), AppError> {
    if actor.is_teacher() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Teacher role required".into()))
    }
}

pub(crate) fn require_student(actor: &Actor) -> Result<(), AppError> {
    if actor.is_student() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Student role required".into()))
    }
}

pub(crate) async fn find_lecture(
    lectures: &dyn LectureRepositoryTrait,
    lecture_id: LectureId,
) -> Result<Lecture, AppError> {
    lectures
        .find_by_id(lecture_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lecture not found".into()))
}

/// Loads a lecture the actor presents. Missing lectures are `NotFound`,
/// somebody else's are `Forbidden`.
pub(crate) async fn find_owned_lecture(
    lectures: &dyn LectureRepositoryTrait,
    actor: &Actor,
    lecture_id: LectureId,
) -> Result<Lecture, AppError> {
    require_teacher(actor)?;
    let lecture = find_lecture(lectures, lecture_id).await?;
    if !lecture.is_owned_by(&actor.id) {
        return Err(AppError::Forbidden(
            "Only the lecture's presenter can do this".into(),
        ));
    }
    Ok(lecture)
}
