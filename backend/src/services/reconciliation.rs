//! Presenter-side views of a lecture and manual overrides.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        attendance::{
            AttendanceRecord, AttendanceResponse, AttendanceSummary, AttendanceView,
            AttendanceViewEntry, Verdict,
        },
        ping_log::PingLog,
        user::{Actor, Profile},
        PaginatedResponse, PaginationQuery,
    },
    repositories::Repositories,
    services::{
        find_owned_lecture,
        notifier::{Notifier, ATTENDANCE_UPDATED},
        scoring::ScoringPolicy,
    },
    types::{LectureId, UserId},
    utils::csv::append_csv_row,
};

#[derive(Clone)]
pub struct ReconciliationService {
    repos: Repositories,
    notifier: Arc<dyn Notifier>,
    policy: ScoringPolicy,
}

impl ReconciliationService {
    pub fn new(repos: Repositories, notifier: Arc<dyn Notifier>, policy: ScoringPolicy) -> Self {
        Self {
            repos,
            notifier,
            policy,
        }
    }

    /// Forces the matched student's record to a manual `present`, creating it
    /// when they never joined.
    pub async fn manual_add(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
        lookup: &str,
    ) -> Result<AttendanceResponse, AppError> {
        find_owned_lecture(self.repos.lectures.as_ref(), actor, lecture_id).await?;

        let lookup = lookup.trim();
        let mut matches = self.repos.profiles.find_students_by_lookup(lookup).await?;
        let student = match matches.len() {
            0 => {
                return Err(AppError::NotFound(format!(
                    "No student matches '{}'",
                    lookup
                )))
            }
            1 => matches.remove(0),
            _ => {
                return Err(AppError::Conflict(format!(
                    "More than one student matches '{}'",
                    lookup
                )))
            }
        };

        let record = self
            .repos
            .attendance
            .mark_manual_present(
                lecture_id,
                student.id,
                self.policy.manual_score(),
                Utc::now(),
            )
            .await?;

        tracing::info!(
            %lecture_id,
            student_id = %student.id,
            presenter_id = %actor.id,
            "Manually marked present"
        );
        self.notifier.publish(
            lecture_id,
            ATTENDANCE_UPDATED,
            json!({
                "student_id": student.id,
                "username": student.username,
                "verdict": record.verdict,
                "method": record.method,
                "via": "manual",
            }),
        );
        Ok(record.into())
    }

    /// Roster merged with records. Roster members without a record appear as
    /// synthesized absentees; record holders outside the roster are appended.
    pub async fn attendance_view(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
    ) -> Result<AttendanceView, AppError> {
        let lecture = find_owned_lecture(self.repos.lectures.as_ref(), actor, lecture_id).await?;
        let roster = self.repos.roster.students_in_group(lecture.group_id).await?;
        let records = self.repos.attendance.list_by_lecture(lecture_id).await?;

        let roster_ids: HashSet<UserId> = roster.iter().map(|p| p.id).collect();
        let outsider_ids: Vec<UserId> = records
            .iter()
            .map(|r| r.student_id)
            .filter(|id| !roster_ids.contains(id))
            .collect();
        let outsiders: HashMap<UserId, Profile> = self
            .repos
            .profiles
            .find_many(outsider_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let entries = merge_roster(&roster, &records, &outsiders);
        let summary = summarize(&entries);
        Ok(AttendanceView {
            lecture: lecture.into(),
            summary,
            entries,
        })
    }

    pub async fn export_csv(&self, actor: &Actor, lecture_id: LectureId) -> Result<String, AppError> {
        let view = self.attendance_view(actor, lecture_id).await?;
        Ok(render_csv(&view.entries))
    }

    pub async fn ping_log(
        &self,
        actor: &Actor,
        lecture_id: LectureId,
        page: &PaginationQuery,
    ) -> Result<PaginatedResponse<PingLog>, AppError> {
        find_owned_lecture(self.repos.lectures.as_ref(), actor, lecture_id).await?;
        let (limit, offset) = (page.limit(), page.offset());
        let data = self
            .repos
            .ping_logs
            .list_by_lecture(lecture_id, limit, offset)
            .await?;
        let total = self.repos.ping_logs.count_by_lecture(lecture_id).await?;
        Ok(PaginatedResponse::new(data, total, limit, offset))
    }
}

fn merge_roster(
    roster: &[Profile],
    records: &[AttendanceRecord],
    outsiders: &HashMap<UserId, Profile>,
) -> Vec<AttendanceViewEntry> {
    let mut by_student: HashMap<UserId, &AttendanceRecord> =
        records.iter().map(|r| (r.student_id, r)).collect();

    let mut entries: Vec<AttendanceViewEntry> = roster
        .iter()
        .map(|profile| {
            let record = by_student.remove(&profile.id);
            view_entry(profile.id, Some(profile), record, true)
        })
        .collect();

    // Outsiders keep record order.
    for record in records {
        if by_student.remove(&record.student_id).is_some() {
            let profile = outsiders.get(&record.student_id);
            entries.push(view_entry(record.student_id, profile, Some(record), false));
        }
    }
    entries
}

fn view_entry(
    student_id: UserId,
    profile: Option<&Profile>,
    record: Option<&AttendanceRecord>,
    in_roster: bool,
) -> AttendanceViewEntry {
    AttendanceViewEntry {
        student_id,
        username: profile.map(|p| p.username.clone()),
        full_name: profile.map(|p| p.full_name.clone()),
        roll_id: profile.and_then(|p| p.roll_id.clone()),
        in_roster,
        verdict: record.map_or(Verdict::Absent, |r| r.verdict),
        method: record.map(|r| r.method),
        check_score: record.map_or(0, |r| r.check_score),
        joined_at: record.and_then(|r| r.joined_at),
        submitted_at: record.and_then(|r| r.submitted_at),
    }
}

fn summarize(entries: &[AttendanceViewEntry]) -> AttendanceSummary {
    entries
        .iter()
        .fold(AttendanceSummary::default(), |mut summary, entry| {
            summary.total += 1;
            match entry.verdict {
                Verdict::Present => summary.present += 1,
                Verdict::Incomplete => summary.incomplete += 1,
                Verdict::Absent => summary.absent += 1,
            }
            summary
        })
}

fn render_csv(entries: &[AttendanceViewEntry]) -> String {
    let mut csv = String::new();
    append_csv_row(
        &mut csv,
        &[
            "Student ID".to_string(),
            "Username".to_string(),
            "Full Name".to_string(),
            "Roll ID".to_string(),
            "In Roster".to_string(),
            "Verdict".to_string(),
            "Method".to_string(),
            "Check Score".to_string(),
            "Joined At".to_string(),
            "Submitted At".to_string(),
        ],
    );
    for entry in entries {
        append_csv_row(
            &mut csv,
            &[
                entry.student_id.to_string(),
                entry.username.clone().unwrap_or_default(),
                entry.full_name.clone().unwrap_or_default(),
                entry.roll_id.clone().unwrap_or_default(),
                if entry.in_roster { "yes" } else { "no" }.to_string(),
                entry.verdict.as_str().to_string(),
                entry
                    .method
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                entry.check_score.to_string(),
                format_timestamp(entry.joined_at),
                format_timestamp(entry.submitted_at),
            ],
        );
    }
    csv
}

fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{attendance::AttendanceMethod, user::UserRole};

    fn profile(name: &str, roll_id: Option<&str>) -> Profile {
        Profile {
            id: UserId::new(),
            username: name.to_lowercase(),
            full_name: name.to_string(),
            email: None,
            role: UserRole::Student,
            roll_id: roll_id.map(str::to_string),
        }
    }

    #[test]
    fn roster_members_without_record_are_synthesized_absent() {
        let lecture_id = LectureId::new();
        let alice = profile("Alice", Some("A-1"));
        let bob = profile("Bob", None);
        let walk_in = profile("Walk In", None);

        let mut alice_record = AttendanceRecord::joined(lecture_id, alice.id, Utc::now());
        alice_record.verdict = Verdict::Present;
        let walk_in_record = AttendanceRecord::joined(lecture_id, walk_in.id, Utc::now());

        let outsiders = HashMap::from([(walk_in.id, walk_in.clone())]);
        let entries = merge_roster(
            &[alice.clone(), bob.clone()],
            &[walk_in_record, alice_record],
            &outsiders,
        );

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].student_id, alice.id);
        assert_eq!(entries[0].verdict, Verdict::Present);
        assert_eq!(entries[0].roll_id.as_deref(), Some("A-1"));
        assert_eq!(entries[1].student_id, bob.id);
        assert_eq!(entries[1].verdict, Verdict::Absent);
        assert_eq!(entries[1].method, None);
        assert_eq!(entries[1].check_score, 0);
        assert_eq!(entries[2].student_id, walk_in.id);
        assert!(!entries[2].in_roster);
        assert_eq!(entries[2].verdict, Verdict::Incomplete);
        assert_eq!(entries[2].method, Some(AttendanceMethod::Auto));

        let summary = summarize(&entries);
        assert_eq!(
            summary,
            AttendanceSummary {
                total: 3,
                present: 1,
                incomplete: 1,
                absent: 1,
            }
        );
    }

    #[test]
    fn csv_guards_formula_cells() {
        let mut evil = profile("=HYPERLINK(\"x\")", None);
        evil.username = "evil".into();
        let entries = merge_roster(&[evil], &[], &HashMap::new());
        let csv = render_csv(&entries);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("\"Student ID\",\"Username\""));
        let row = lines.next().unwrap();
        assert!(row.contains("\"'=HYPERLINK(\"\"x\"\")\""));
        assert!(row.contains("\"absent\""));
        assert!(row.contains("\"yes\""));
    }
}
