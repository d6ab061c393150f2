use serde::Serialize;

use super::domain::{CorrespondenceTrigger, TriggerId};

/// Outbound transport for composed notices (mail merge, e-mail, print vendor).
pub trait NoticeDispatcher: Send + Sync {
    fn dispatch(&self, trigger: &CorrespondenceTrigger) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notice transport unavailable: {0}")]
    Transport(String),
    #[error("notice rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchFailure {
    pub trigger_id: TriggerId,
    pub error: String,
}

/// Result of one pass over the pending outbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub sent: Vec<TriggerId>,
    pub failed: Vec<DispatchFailure>,
}
