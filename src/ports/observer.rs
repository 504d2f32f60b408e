//! Observer Port - Interface to the presentation layer.
//!
//! The engine pushes streaming progress and life-cycle events outward;
//! rendering is entirely the collaborator's concern. Observer calls must
//! not fail: a presentation problem is never allowed to affect a turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::conversation::{Message, Speaker};

/// Port for presentation-layer notifications.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    /// A chunk of the in-flight response arrived.
    async fn on_partial(&self, speaker: Speaker, delta: &str);

    /// A turn finished and its message is final.
    async fn on_turn_complete(&self, message: &Message);

    /// The conversation loop stopped.
    async fn on_conversation_stopped(&self, reason: &StopReason);
}

/// Why the conversation loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// The completion detector called the session done.
    Completed { reason: String },
    /// Consecutive same-role responses were repetitive.
    Repetitive,
    /// The exchange budget ran out.
    BudgetExhausted,
    /// A stop or hard stop was requested.
    Cancelled,
}

impl StopReason {
    /// Short description for logs and UI toasts.
    pub fn describe(&self) -> String {
        match self {
            StopReason::Completed { reason } => reason.clone(),
            StopReason::Repetitive => "repetitive".to_string(),
            StopReason::BudgetExhausted => "exchange budget exhausted".to_string(),
            StopReason::Cancelled => "stopped by user".to_string(),
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}
