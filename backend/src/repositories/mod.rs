//! Persistence seams.
//!
//! Each concern sits behind an `async_trait` so services can run against
//! Postgres in production and [`memory::MemoryStore`] in tests.

use std::sync::Arc;

use sqlx::PgPool;

pub mod attendance;
pub mod lecture;
pub mod memory;
pub mod ping_log;
pub mod profile;
pub mod roster;
pub mod transaction;

use attendance::{AttendanceRepository, AttendanceRepositoryTrait};
use lecture::{LectureRepository, LectureRepositoryTrait};
use memory::MemoryStore;
use ping_log::{PingLogRepository, PingLogRepositoryTrait};
use profile::{ProfileRepository, ProfileRepositoryTrait};
use roster::{PgRosterProvider, RosterProvider};

#[derive(Clone)]
pub struct Repositories {
    pub lectures: Arc<dyn LectureRepositoryTrait>,
    pub attendance: Arc<dyn AttendanceRepositoryTrait>,
    pub ping_logs: Arc<dyn PingLogRepositoryTrait>,
    pub profiles: Arc<dyn ProfileRepositoryTrait>,
    pub roster: Arc<dyn RosterProvider>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            lectures: Arc::new(LectureRepository::new(pool.clone())),
            attendance: Arc::new(AttendanceRepository::new(pool.clone())),
            ping_logs: Arc::new(PingLogRepository::new(pool.clone())),
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
            roster: Arc::new(PgRosterProvider::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            lectures: store.clone(),
            attendance: store.clone(),
            ping_logs: store.clone(),
            profiles: store.clone(),
            roster: store,
        }
    }
}
