//! Fire-and-forget fan-out of lecture events to live observers.
//!
//! The hub is a single `tokio::sync::broadcast` channel; subscribers filter by
//! lecture id. Publishing never blocks and never fails the caller.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use crate::types::LectureId;

pub const PRESENCE_ANNOUNCED: &str = "presence-announced";
pub const SESSION_ENDED: &str = "session-ended";
pub const PASSCODE_ROTATED: &str = "passcode-rotated";
pub const ATTENDANCE_UPDATED: &str = "attendance-updated";

/// Slow receivers that fall behind skip messages (`RecvError::Lagged`).
const BROADCAST_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct LectureEvent {
    pub lecture_id: LectureId,
    pub event: String,
    pub payload: Value,
}

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn publish(&self, lecture_id: LectureId, event: &str, payload: Value);
}

#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<Arc<LectureEvent>>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LectureEvent>> {
        self.sender.subscribe()
    }
}

impl Notifier for EventHub {
    fn publish(&self, lecture_id: LectureId, event: &str, payload: Value) {
        let delivered = self
            .sender
            .send(Arc::new(LectureEvent {
                lecture_id,
                event: event.to_string(),
                payload,
            }))
            .unwrap_or(0);
        tracing::debug!(%lecture_id, event, delivered, "Published lecture event");
    }
}
