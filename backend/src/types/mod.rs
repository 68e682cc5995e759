pub mod id;

pub use id::{AttendanceId, GroupId, LectureId, PingLogId, UserId};
