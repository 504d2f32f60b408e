//! Session transcript - the owning message list.
//!
//! Messages are never deleted during a session; `prune_abandoned` removes
//! only zero-length entries left behind by interrupted turns, and only on
//! explicit cleanup.

use crate::domain::conversation::{Message, Speaker};

/// The ordered message list of one session.
///
/// The transcript is the exclusive owner of its messages; collaborators see
/// borrowed slices or clones only.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript from persisted messages.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Appends a message and returns a mutable handle to it.
    ///
    /// The handle is how a streaming turn grows the tail message in place.
    pub fn push(&mut self, message: Message) -> &mut Message {
        self.messages.push(message);
        let tail = self.messages.len() - 1;
        &mut self.messages[tail]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Message> {
        self.messages.last_mut()
    }

    /// Returns the last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Returns the last `n` non-empty texts by one speaker, newest first.
    pub fn recent_texts_by(&self, speaker: Speaker, n: usize) -> Vec<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.speaker() == speaker && !m.is_empty())
            .take(n)
            .map(|m| m.text())
            .collect()
    }

    /// Returns true if any message carries visible text.
    pub fn has_content(&self) -> bool {
        self.messages.iter().any(|m| !m.is_empty())
    }

    /// Returns the speaker of the most recent non-empty message.
    pub fn last_speaker(&self) -> Option<Speaker> {
        self.messages
            .iter()
            .rev()
            .find(|m| !m.is_empty())
            .map(|m| m.speaker())
    }

    /// Removes zero-length non-final entries left by interrupted turns.
    ///
    /// Returns how many entries were removed. Finalized messages are never
    /// touched, regardless of content.
    pub fn prune_abandoned(&mut self) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| m.is_final() || !m.is_empty());
        before - self.messages.len()
    }
}
