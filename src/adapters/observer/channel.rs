//! Channel-backed observer bridge.
//!
//! Translates observer calls into serializable events on an mpsc channel,
//! for a UI transport (WebSocket handler, TUI, test harness) to consume.
//! A full or closed channel drops events rather than stalling a turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::conversation::{Message, Speaker};
use crate::ports::{SessionObserver, StopReason};

/// Serializable session event for the presentation transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A chunk of the in-flight response.
    Chunk { speaker: Speaker, delta: String },
    /// A turn finished with this message.
    TurnComplete { message: Message },
    /// The conversation loop stopped.
    Stopped { reason: StopReason },
}

/// Observer that forwards events into an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<SessionEvent>,
}

impl ChannelObserver {
    /// Creates the observer and its event receiver.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    fn emit(&self, event: SessionEvent) {
        // Presentation slowness never blocks the engine.
        let _ = self.tx.try_send(event);
    }
}

#[async_trait]
impl SessionObserver for ChannelObserver {
    async fn on_partial(&self, speaker: Speaker, delta: &str) {
        self.emit(SessionEvent::Chunk {
            speaker,
            delta: delta.to_string(),
        });
    }

    async fn on_turn_complete(&self, message: &Message) {
        self.emit(SessionEvent::TurnComplete {
            message: message.clone(),
        });
    }

    async fn on_conversation_stopped(&self, reason: &StopReason) {
        self.emit(SessionEvent::Stopped {
            reason: reason.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_events_in_order() {
        let (observer, mut rx) = ChannelObserver::new(8);
        let message = Message::sent(Speaker::Therapist, "Tell me more.").unwrap();

        observer.on_partial(Speaker::Therapist, "Tell ").await;
        observer.on_turn_complete(&message).await;
        observer
            .on_conversation_stopped(&StopReason::BudgetExhausted)
            .await;

        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::Chunk {
                speaker: Speaker::Therapist,
                delta: "Tell ".to_string()
            })
        );
        assert!(matches!(
            rx.recv().await,
            Some(SessionEvent::TurnComplete { .. })
        ));
        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::Stopped {
                reason: StopReason::BudgetExhausted
            })
        );
    }

    #[tokio::test]
    async fn full_channel_drops_instead_of_blocking() {
        let (observer, mut rx) = ChannelObserver::new(1);

        observer.on_partial(Speaker::Patient, "one").await;
        observer.on_partial(Speaker::Patient, "two").await;

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_receiver_is_tolerated() {
        let (observer, rx) = ChannelObserver::new(1);
        drop(rx);

        // Must not panic or error.
        observer.on_partial(Speaker::Patient, "ignored").await;
    }

    #[test]
    fn events_serialize_with_type_tags() {
        let event = SessionEvent::Chunk {
            speaker: Speaker::Patient,
            delta: "hi".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"chunk\""));
        assert!(json.contains("\"speaker\":\"patient\""));
    }
}
