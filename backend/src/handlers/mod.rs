pub mod attendance;
pub mod lectures;
pub mod passcode;
pub mod presence;
pub mod profile;

use crate::{error::AppError, types::LectureId};

pub(crate) fn parse_lecture_id(raw: &str) -> Result<LectureId, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("Lecture ID is required".into()));
    }
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid lecture ID: {}", raw)))
}
