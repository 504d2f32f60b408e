//! Message Store Port - Interface for transcript persistence.
//!
//! Store failures are non-fatal to a turn: the engine logs them and keeps
//! going, because the response already exists for the UI.

use async_trait::async_trait;

use crate::domain::conversation::Message;
use crate::domain::foundation::{MessageId, SessionId, Timestamp};

/// Port for message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends a finalized message to a session's stored transcript.
    async fn append(&self, session_id: &SessionId, message: &Message)
        -> Result<StoreAck, StoreError>;

    /// Lists the most recent messages for a session, oldest first.
    async fn list_recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError>;
}

/// Acknowledgement of a stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAck {
    pub message_id: MessageId,
    pub stored_at: Timestamp,
}

impl StoreAck {
    pub fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            stored_at: Timestamp::now(),
        }
    }
}

/// Persistence collaborator errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The message could not be serialized for storage.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The session does not exist in the store.
    #[error("unknown session: {0}")]
    UnknownSession(String),
}
