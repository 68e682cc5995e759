//! In-memory implementation of every repository trait.
//!
//! Backs tests and local demos. One mutex guards all tables, so each trait
//! method is atomic in the same way its single-statement SQL counterpart is.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    error::AppError,
    models::{
        attendance::{AttendanceMethod, AttendanceRecord, Verdict},
        lecture::{Lecture, LectureState},
        location::LocationSnapshot,
        ping_log::PingLog,
        user::{Profile, UserRole},
    },
    repositories::{
        attendance::AttendanceRepositoryTrait,
        lecture::{EndedLecture, LectureRepositoryTrait},
        ping_log::PingLogRepositoryTrait,
        profile::ProfileRepositoryTrait,
        roster::RosterProvider,
    },
    types::{GroupId, LectureId, UserId},
};

#[derive(Default)]
struct Tables {
    profiles: HashMap<UserId, Profile>,
    groups: HashMap<GroupId, Vec<UserId>>,
    lectures: HashMap<LectureId, Lecture>,
    attendance: HashMap<(LectureId, UserId), AttendanceRecord>,
    ping_logs: Vec<PingLog>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrors a profile from the identity provider.
    pub fn upsert_profile(&self, profile: Profile) {
        self.tables.lock().profiles.insert(profile.id, profile);
    }

    pub fn add_group_member(&self, group_id: GroupId, user_id: UserId) {
        let mut tables = self.tables.lock();
        let members = tables.groups.entry(group_id).or_default();
        if !members.contains(&user_id) {
            members.push(user_id);
        }
    }

    pub fn ping_log_len(&self) -> usize {
        self.tables.lock().ping_logs.len()
    }
}

#[async_trait]
impl LectureRepositoryTrait for MemoryStore {
    async fn create(&self, lecture: &Lecture) -> Result<Lecture, AppError> {
        let mut tables = self.tables.lock();
        if tables.lectures.contains_key(&lecture.id) {
            return Err(AppError::Conflict("Lecture already exists".into()));
        }
        tables.lectures.insert(lecture.id, lecture.clone());
        Ok(lecture.clone())
    }

    async fn find_by_id(&self, id: LectureId) -> Result<Option<Lecture>, AppError> {
        Ok(self.tables.lock().lectures.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Lecture>, AppError> {
        let tables = self.tables.lock();
        let mut lectures: Vec<Lecture> = tables
            .lectures
            .values()
            .filter(|l| l.owner_id == owner_id)
            .cloned()
            .collect();
        lectures.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(lectures)
    }

    async fn update_details(
        &self,
        id: LectureId,
        title: Option<String>,
        duration_minutes: Option<i32>,
    ) -> Result<Option<Lecture>, AppError> {
        let mut tables = self.tables.lock();
        let Some(lecture) = tables.lectures.get_mut(&id) else {
            return Ok(None);
        };
        if !lecture.is_active() {
            return Ok(None);
        }
        if let Some(title) = title {
            lecture.title = title;
        }
        if let Some(duration) = duration_minutes {
            lecture.duration_minutes = duration;
        }
        Ok(Some(lecture.clone()))
    }

    async fn end(
        &self,
        id: LectureId,
        now: DateTime<Utc>,
    ) -> Result<Option<EndedLecture>, AppError> {
        let mut tables = self.tables.lock();
        let lecture = match tables.lectures.get_mut(&id) {
            Some(lecture) if lecture.is_active() => {
                lecture.state = LectureState::Ended;
                lecture.ended_at = Some(now);
                lecture.clone()
            }
            _ => return Ok(None),
        };

        let mut swept = 0;
        for record in tables
            .attendance
            .values_mut()
            .filter(|r| r.lecture_id == id && r.verdict == Verdict::Incomplete)
        {
            record.verdict = Verdict::Absent;
            record.updated_at = now;
            swept += 1;
        }
        Ok(Some(EndedLecture { lecture, swept }))
    }

    async fn delete_ended(&self, id: LectureId) -> Result<bool, AppError> {
        let mut tables = self.tables.lock();
        match tables.lectures.get(&id) {
            Some(lecture) if !lecture.is_active() => {}
            _ => return Ok(false),
        }
        tables.ping_logs.retain(|p| p.lecture_id != id);
        tables.attendance.retain(|(lecture_id, _), _| *lecture_id != id);
        tables.lectures.remove(&id);
        Ok(true)
    }

    async fn rotate_passcode(
        &self,
        id: LectureId,
        expected: Option<String>,
        expected_rotated_at: Option<DateTime<Utc>>,
        code: String,
        now: DateTime<Utc>,
    ) -> Result<Option<Lecture>, AppError> {
        let mut tables = self.tables.lock();
        let Some(lecture) = tables.lectures.get_mut(&id) else {
            return Ok(None);
        };
        if lecture.passcode == expected && lecture.passcode_rotated_at == expected_rotated_at {
            lecture.passcode = Some(code);
            lecture.passcode_rotated_at = Some(now);
        }
        Ok(Some(lecture.clone()))
    }
}

#[async_trait]
impl AttendanceRepositoryTrait for MemoryStore {
    async fn insert_if_absent(
        &self,
        record: &AttendanceRecord,
    ) -> Result<(AttendanceRecord, bool), AppError> {
        let mut tables = self.tables.lock();
        let key = (record.lecture_id, record.student_id);
        if let Some(existing) = tables.attendance.get(&key) {
            return Ok((existing.clone(), false));
        }
        tables.attendance.insert(key, record.clone());
        Ok((record.clone(), true))
    }

    async fn find(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        Ok(self
            .tables
            .lock()
            .attendance
            .get(&(lecture_id, student_id))
            .cloned())
    }

    async fn increment_score(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<i32>, AppError> {
        let mut tables = self.tables.lock();
        Ok(tables
            .attendance
            .get_mut(&(lecture_id, student_id))
            .map(|record| {
                record.check_score += 1;
                record.updated_at = now;
                record.check_score
            }))
    }

    async fn finalize(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
        min_required: i32,
        snapshot: LocationSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let mut tables = self.tables.lock();
        Ok(tables
            .attendance
            .get_mut(&(lecture_id, student_id))
            .map(|record| {
                record.submitted_at = Some(now);
                record.updated_at = now;
                record.last_lat = Some(snapshot.lat);
                record.last_lon = Some(snapshot.lon);
                record.last_accuracy = Some(snapshot.accuracy);
                // Below the threshold the verdict stays as it is: `incomplete`
                // before the sweep, `absent` after it.
                if record.check_score >= min_required {
                    record.verdict = Verdict::Present;
                }
                record.clone()
            }))
    }

    async fn mark_manual_present(
        &self,
        lecture_id: LectureId,
        student_id: UserId,
        max_score: i32,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AppError> {
        let mut tables = self.tables.lock();
        let record = tables
            .attendance
            .entry((lecture_id, student_id))
            .and_modify(|record| {
                record.method = AttendanceMethod::Manual;
                record.verdict = Verdict::Present;
                record.check_score = record.check_score.max(max_score);
                record.submitted_at = Some(now);
                record.updated_at = now;
            })
            .or_insert_with(|| AttendanceRecord::manual(lecture_id, student_id, max_score, now));
        Ok(record.clone())
    }

    async fn list_by_lecture(
        &self,
        lecture_id: LectureId,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let tables = self.tables.lock();
        let mut records: Vec<AttendanceRecord> = tables
            .attendance
            .values()
            .filter(|r| r.lecture_id == lecture_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}

#[async_trait]
impl PingLogRepositoryTrait for MemoryStore {
    async fn append(&self, entry: &PingLog) -> Result<(), AppError> {
        self.tables.lock().ping_logs.push(entry.clone());
        Ok(())
    }

    async fn list_by_lecture(
        &self,
        lecture_id: LectureId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PingLog>, AppError> {
        let tables = self.tables.lock();
        Ok(tables
            .ping_logs
            .iter()
            .filter(|p| p.lecture_id == lecture_id)
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn count_by_lecture(&self, lecture_id: LectureId) -> Result<i64, AppError> {
        let tables = self.tables.lock();
        let count = tables
            .ping_logs
            .iter()
            .filter(|p| p.lecture_id == lecture_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl ProfileRepositoryTrait for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Profile>, AppError> {
        Ok(self.tables.lock().profiles.get(&id).cloned())
    }

    async fn find_many(&self, ids: Vec<UserId>) -> Result<Vec<Profile>, AppError> {
        let tables = self.tables.lock();
        Ok(ids
            .iter()
            .filter_map(|id| tables.profiles.get(id).cloned())
            .collect())
    }

    async fn set_roll_id(&self, id: UserId, roll_id: &str) -> Result<Option<Profile>, AppError> {
        let mut tables = self.tables.lock();
        Ok(tables.profiles.get_mut(&id).map(|profile| {
            profile.roll_id = Some(roll_id.to_string());
            profile.clone()
        }))
    }

    async fn find_students_by_lookup(&self, lookup: &str) -> Result<Vec<Profile>, AppError> {
        let tables = self.tables.lock();
        let mut matches: Vec<Profile> = tables
            .profiles
            .values()
            .filter(|p| p.role == UserRole::Student)
            .filter(|p| {
                p.id.to_string() == lookup
                    || p.username.eq_ignore_ascii_case(lookup)
                    || p
                        .email
                        .as_deref()
                        .is_some_and(|email| email.eq_ignore_ascii_case(lookup))
                    || p.roll_id.as_deref() == Some(lookup)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        matches.truncate(2);
        Ok(matches)
    }
}

#[async_trait]
impl RosterProvider for MemoryStore {
    async fn students_in_group(&self, group_id: GroupId) -> Result<Vec<Profile>, AppError> {
        let tables = self.tables.lock();
        let mut students: Vec<Profile> = tables
            .groups
            .get(&group_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.profiles.get(id))
            .filter(|p| p.role == UserRole::Student)
            .cloned()
            .collect();
        students.sort_by(|a, b| {
            a.full_name
                .cmp(&b.full_name)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(students)
    }
}
