//! In-memory message store.
//!
//! Reference implementation of the message store port, with optional
//! failure injection for exercising the non-fatal persistence path.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::conversation::Message;
use crate::domain::foundation::SessionId;
use crate::ports::{MessageStore, StoreAck, StoreError};

/// In-memory implementation of the message store port.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    sessions: RwLock<HashMap<SessionId, Vec<Message>>>,
    fail_appends: bool,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose appends always fail, for resilience tests.
    pub fn failing() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            fail_appends: true,
        }
    }

    /// Every stored message for a session, oldest first.
    pub async fn list_all(&self, session_id: &SessionId) -> Vec<Message> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of stored messages for a session.
    pub async fn count(&self, session_id: &SessionId) -> usize {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(
        &self,
        session_id: &SessionId,
        message: &Message,
    ) -> Result<StoreAck, StoreError> {
        if self.fail_appends {
            return Err(StoreError::Unavailable("append disabled".to_string()));
        }
        self.sessions
            .write()
            .await
            .entry(*session_id)
            .or_default()
            .push(message.clone());
        Ok(StoreAck::new(*message.id()))
    }

    async fn list_recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let sessions = self.sessions.read().await;
        let messages = sessions
            .get(session_id)
            .ok_or_else(|| StoreError::UnknownSession(session_id.to_string()))?;
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }
}
