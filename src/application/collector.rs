//! Streaming response collector.
//!
//! Accumulates one turn's incremental text stream, surfaces partial chunks
//! to the caller, and applies the banned-phrase filter to the complete
//! buffer during finalization. Cancellation is cooperative via a watch
//! channel and is only meaningful while accumulating.

use tokio::sync::watch;

use futures::StreamExt;

use crate::domain::conversation::ResponseFilter;
use crate::domain::foundation::StateMachine;
use crate::ports::{GenerationError, GenerationStream};

/// Substituted when the source terminates without yielding any text.
pub const EMPTY_RESPONSE_FALLBACK: &str =
    "I'm not sure how to put it into words yet. Could you stay with me for a moment?";

/// Life-cycle of one collection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// Created, not started.
    Idle,
    /// Reading chunks from the stream.
    Accumulating,
    /// End of stream reached; applying the phrase filter.
    Finalizing,
    /// Final text delivered.
    Done,
    /// Cancelled mid-stream (or the stream failed); handle released.
    Cancelled,
}

impl StateMachine for CollectorState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use CollectorState::*;
        matches!(
            (self, target),
            (Idle, Accumulating)
                | (Accumulating, Finalizing)
                | (Accumulating, Cancelled)
                | (Finalizing, Done)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CollectorState::*;
        match self {
            Idle => vec![Accumulating],
            Accumulating => vec![Finalizing, Cancelled],
            Finalizing => vec![Done],
            Done => vec![],
            Cancelled => vec![],
        }
    }
}

/// How a collection pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorOutcome {
    /// Natural end of stream; the filtered final text.
    Completed(String),
    /// Cancelled while accumulating; no final text.
    Cancelled,
}

/// Collects one streamed response. Single use: one pass per collector.
#[derive(Debug)]
pub struct ResponseCollector {
    filter: ResponseFilter,
    state: CollectorState,
}

impl ResponseCollector {
    pub fn new(filter: ResponseFilter) -> Self {
        Self {
            filter,
            state: CollectorState::Idle,
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// Drives the stream to completion or cancellation.
    ///
    /// `on_partial` fires once per chunk with the chunk's delta; no
    /// callbacks fire after cancellation. A stream error is returned to the
    /// caller (who substitutes fallback text) and releases the stream.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if this collector was already used
    /// - any `GenerationError` surfaced by the stream
    pub async fn collect<F>(
        &mut self,
        stream: GenerationStream,
        cancel: &mut watch::Receiver<bool>,
        mut on_partial: F,
    ) -> Result<CollectorOutcome, GenerationError>
    where
        F: FnMut(&str) + Send,
    {
        if self.state != CollectorState::Idle {
            return Err(GenerationError::InvalidRequest(format!(
                "collector already used (state {:?})",
                self.state
            )));
        }
        self.state = CollectorState::Accumulating;

        let mut stream = stream;
        let mut buffer = String::new();
        let mut cancel_live = true;

        loop {
            if cancel_live && *cancel.borrow() {
                self.state = CollectorState::Cancelled;
                return Ok(CollectorOutcome::Cancelled);
            }

            tokio::select! {
                changed = cancel.changed(), if cancel_live => {
                    if changed.is_err() {
                        // Sender dropped; cancellation can no longer arrive.
                        cancel_live = false;
                    }
                }
                next = stream.next() => match next {
                    Some(Ok(chunk)) => {
                        buffer.push_str(&chunk.delta);
                        on_partial(&chunk.delta);
                    }
                    Some(Err(err)) => {
                        self.state = CollectorState::Cancelled;
                        return Err(err);
                    }
                    None => break,
                }
            }
        }

        self.state = CollectorState::Finalizing;
        let text = if buffer.trim().is_empty() {
            EMPTY_RESPONSE_FALLBACK.to_string()
        } else {
            self.filter.apply(&buffer)
        };
        self.state = CollectorState::Done;

        Ok(CollectorOutcome::Completed(text))
    }
}
