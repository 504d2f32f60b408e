//! Generation Port - Interface for the utterance-producing collaborator.
//!
//! The network layer that performs the actual model call lives outside
//! this crate; the engine only sees an incremental text stream that yields
//! zero or more chunks and then terminates. The stream may fail with a
//! transport error at any point before or during streaming.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::domain::conversation::Speaker;

/// An incremental text source: chunks until end of stream.
pub type GenerationStream =
    Pin<Box<dyn Stream<Item = Result<GenerationChunk, GenerationError>> + Send>>;

/// Port for streamed utterance generation.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Starts generating a response for one turn.
    ///
    /// Returns the chunk stream, or fails immediately with a transport
    /// error. Timeout behavior belongs to the implementation; the engine
    /// imposes no deadline of its own.
    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationStream, GenerationError>;
}

/// Request for one turn's generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The persona speaking this turn.
    pub speaker: Speaker,
    /// Assembled instructions: persona, phase directive, intervention.
    pub instructions: String,
    /// Recent conversation history, oldest first.
    pub history: Vec<PromptMessage>,
}

impl GenerationRequest {
    /// Creates a request with empty history.
    pub fn new(speaker: Speaker, instructions: impl Into<String>) -> Self {
        Self {
            speaker,
            instructions: instructions.into(),
            history: Vec::new(),
        }
    }

    /// Adds a history entry.
    pub fn with_history_entry(mut self, speaker: Speaker, text: impl Into<String>) -> Self {
        self.history.push(PromptMessage {
            speaker,
            text: text.into(),
        });
        self
    }
}

/// A history entry in provider-facing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub speaker: Speaker,
    pub text: String,
}

/// A chunk of streamed response text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationChunk {
    /// New text in this chunk.
    pub delta: String,
}

impl GenerationChunk {
    pub fn new(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
        }
    }
}

/// Generation collaborator errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Network error before or during streaming.
    #[error("network error: {0}")]
    Network(String),

    /// The provider-side timeout fired.
    #[error("generation timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },

    /// The stream produced data the engine cannot use.
    #[error("malformed stream: {0}")]
    MalformedStream(String),

    /// The request itself was unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GenerationError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a malformed stream error.
    pub fn malformed_stream(message: impl Into<String>) -> Self {
        Self::MalformedStream(message.into())
    }

    /// Returns true if a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Unavailable { .. }
                | GenerationError::Network(_)
                | GenerationError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_accumulates_history() {
        let request = GenerationRequest::new(Speaker::Therapist, "instructions here")
            .with_history_entry(Speaker::Patient, "I had a rough week.")
            .with_history_entry(Speaker::Therapist, "Tell me about it.");

        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[0].speaker, Speaker::Patient);
        assert_eq!(request.history[1].text, "Tell me about it.");
    }

    #[test]
    fn transport_errors_are_retryable() {
        assert!(GenerationError::unavailable("down").is_retryable());
        assert!(GenerationError::network("reset").is_retryable());
        assert!(GenerationError::Timeout { timeout_secs: 30 }.is_retryable());
    }

    #[test]
    fn structural_errors_are_not_retryable() {
        assert!(!GenerationError::malformed_stream("garbage").is_retryable());
        assert!(!GenerationError::InvalidRequest("empty".into()).is_retryable());
    }

    #[test]
    fn errors_display_with_context() {
        let err = GenerationError::Timeout { timeout_secs: 45 };
        assert_eq!(err.to_string(), "generation timed out after 45s");
    }
}
