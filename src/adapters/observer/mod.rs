//! Observer adapters.

mod channel;

pub use channel::{ChannelObserver, SessionEvent};

use async_trait::async_trait;

use crate::domain::conversation::{Message, Speaker};
use crate::ports::{SessionObserver, StopReason};

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

#[async_trait]
impl SessionObserver for NullObserver {
    async fn on_partial(&self, _speaker: Speaker, _delta: &str) {}

    async fn on_turn_complete(&self, _message: &Message) {}

    async fn on_conversation_stopped(&self, _reason: &StopReason) {}
}
