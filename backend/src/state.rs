use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::Config,
    repositories::{memory::MemoryStore, Repositories},
    services::{
        EventHub, LectureService, Notifier, PasscodeRotator, PasscodeService, PresenceService,
        ReconciliationService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub events: EventHub,
    pub lectures: LectureService,
    pub presence: PresenceService,
    pub passcodes: PasscodeService,
    pub reconciliation: ReconciliationService,
}

impl AppState {
    pub fn new(config: Config, repos: Repositories, events: EventHub) -> Self {
        let notifier: Arc<dyn Notifier> = Arc::new(events.clone());
        let policy = config.scoring_policy();
        Self {
            lectures: LectureService::new(
                repos.clone(),
                notifier.clone(),
                config.join_radius_m,
                config.presence_radius_m,
            ),
            presence: PresenceService::new(repos.clone(), notifier.clone(), policy),
            passcodes: PasscodeService::new(
                repos.clone(),
                notifier.clone(),
                PasscodeRotator::new(config.passcode_rotation_seconds),
                policy,
            ),
            reconciliation: ReconciliationService::new(repos, notifier, policy),
            events,
            config,
        }
    }

    pub fn postgres(config: Config, pool: PgPool) -> Self {
        Self::new(config, Repositories::postgres(pool), EventHub::new())
    }

    /// State backed by [`MemoryStore`], for tests and local demos.
    pub fn in_memory(config: Config, store: Arc<MemoryStore>) -> Self {
        Self::new(config, Repositories::in_memory(store), EventHub::new())
    }
}
