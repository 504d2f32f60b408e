//! Message entity for roleplay sessions.
//!
//! Messages are owned by the session transcript. A message is mutable only
//! while streaming (its text grows monotonically as chunks arrive) and is
//! frozen once it reaches `Sent` or `Failed`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, MessageId, StateMachine, Timestamp};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The therapist persona.
    Therapist,
    /// The patient persona.
    Patient,
    /// The human operator chatting directly.
    HumanUser,
}

impl Speaker {
    /// Returns the persona that takes the next automated turn.
    ///
    /// The two personas alternate; a human message hands the floor to the
    /// therapist persona.
    pub fn counterpart(&self) -> Speaker {
        match self {
            Speaker::Therapist => Speaker::Patient,
            Speaker::Patient => Speaker::Therapist,
            Speaker::HumanUser => Speaker::Therapist,
        }
    }

    /// Returns true if this speaker is one of the two AI personas.
    pub fn is_persona(&self) -> bool {
        matches!(self, Speaker::Therapist | Speaker::Patient)
    }

    /// Returns a short label for UI display.
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Therapist => "Therapist",
            Speaker::Patient => "Patient",
            Speaker::HumanUser => "You",
        }
    }
}

/// Delivery status of a message.
///
/// Lifecycle: `Pending → Streaming → Sent | Failed`. A pending message may
/// also go straight to `Sent` (fallback text) or `Failed` (generation died
/// before the first chunk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Created, no content yet.
    #[default]
    Pending,
    /// Receiving streamed chunks; text grows monotonically.
    Streaming,
    /// Finalized and delivered; frozen.
    Sent,
    /// Generation or delivery failed; frozen.
    Failed,
}

impl StateMachine for MessageStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use MessageStatus::*;
        matches!(
            (self, target),
            (Pending, Streaming) | (Pending, Sent) | (Pending, Failed) | (Streaming, Sent) | (Streaming, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use MessageStatus::*;
        match self {
            Pending => vec![Streaming, Sent, Failed],
            Streaming => vec![Sent, Failed],
            Sent => vec![],
            Failed => vec![],
        }
    }
}

/// A message within a session transcript.
///
/// # Invariants
///
/// - `text` only grows while `status == Streaming`
/// - once `Sent` or `Failed`, the message is frozen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    speaker: Speaker,
    text: String,
    created_at: Timestamp,
    status: MessageStatus,
    error_detail: Option<String>,
}

impl Message {
    /// Creates a pending message with no content.
    pub fn pending(speaker: Speaker) -> Self {
        Self {
            id: MessageId::new(),
            speaker,
            text: String::new(),
            created_at: Timestamp::now(),
            status: MessageStatus::Pending,
            error_detail: None,
        }
    }

    /// Creates an already-delivered message.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if text is empty
    pub fn sent(speaker: Speaker, text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DomainError::validation(
                "text",
                "Message text cannot be empty",
            ));
        }
        Ok(Self {
            id: MessageId::new(),
            speaker,
            text,
            created_at: Timestamp::now(),
            status: MessageStatus::Sent,
            error_detail: None,
        })
    }

    /// Reconstitutes a message from persistence (no validation).
    pub fn reconstitute(
        id: MessageId,
        speaker: Speaker,
        text: String,
        created_at: Timestamp,
        status: MessageStatus,
        error_detail: Option<String>,
    ) -> Self {
        Self {
            id,
            speaker,
            text,
            created_at,
            status,
            error_detail,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    /// Returns true if this message carries no visible text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Returns true if the message is frozen (`Sent` or `Failed`).
    pub fn is_final(&self) -> bool {
        self.status.is_terminal()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Streaming lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Marks the message as receiving streamed chunks.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless status is `Pending`
    pub fn begin_streaming(&mut self) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(MessageStatus::Streaming)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        Ok(())
    }

    /// Appends a streamed chunk to the text.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless status is `Streaming`
    pub fn append_chunk(&mut self, delta: &str) -> Result<(), DomainError> {
        if self.status != MessageStatus::Streaming {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot append chunk while {:?}", self.status),
            ));
        }
        self.text.push_str(delta);
        Ok(())
    }

    /// Finalizes the message with its filtered text and freezes it.
    ///
    /// The final text may differ from the streamed buffer because the
    /// banned-phrase filter runs on the complete response.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if the message is already frozen
    pub fn finalize(&mut self, text: impl Into<String>) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(MessageStatus::Sent)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        self.text = text.into();
        Ok(())
    }

    /// Marks the message as failed and freezes it.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if the message is already frozen
    pub fn fail(&mut self, detail: impl Into<String>) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(MessageStatus::Failed)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        self.error_detail = Some(detail.into());
        Ok(())
    }
}
