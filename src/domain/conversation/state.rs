//! The orchestrator's mutable conversation record.
//!
//! `ConversationState` is owned and mutated only by the orchestrator and
//! turn executor (single-writer discipline). The narrative phase is always
//! derived from the turn count and never set directly.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{CompletionDecision, SessionPhase, Speaker};
use crate::domain::foundation::Timestamp;

/// Story summaries kept; oldest evicted beyond this.
const MAX_STORY_SUMMARIES: usize = 10;

/// Mutable orchestration state for one session.
///
/// Created when a session starts or resumes, reset whenever a human
/// explicitly restarts automated play, and discarded (never persisted)
/// when the session view closes. Only the transcript persists externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    turn_count: u32,
    phase: SessionPhase,
    last_speaker: Option<Speaker>,
    is_running: bool,
    exchange_budget: u32,
    last_intervention_at: Option<Timestamp>,
    shared_story_summaries: VecDeque<String>,
    completion: CompletionDecision,
}

impl ConversationState {
    /// Creates a fresh state with the given exchange budget.
    pub fn new(exchange_budget: u32) -> Self {
        Self {
            turn_count: 0,
            phase: SessionPhase::for_turn(0),
            last_speaker: None,
            is_running: false,
            exchange_budget,
            last_intervention_at: None,
            shared_story_summaries: VecDeque::new(),
            completion: CompletionDecision::not_yet(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors (read access for UI badges)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The phase label shown in the session header.
    pub fn phase_label(&self) -> &'static str {
        self.phase.label()
    }

    pub fn last_speaker(&self) -> Option<Speaker> {
        self.last_speaker
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn exchange_budget(&self) -> u32 {
        self.exchange_budget
    }

    pub fn last_intervention_at(&self) -> Option<&Timestamp> {
        self.last_intervention_at.as_ref()
    }

    pub fn shared_story_summaries(&self) -> impl Iterator<Item = &str> {
        self.shared_story_summaries.iter().map(String::as_str)
    }

    pub fn completion(&self) -> &CompletionDecision {
        &self.completion
    }

    /// Returns true if the budget leaves no room for another turn.
    pub fn budget_exhausted(&self) -> bool {
        self.turn_count >= self.exchange_budget
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation (orchestrator and turn executor only)
    // ─────────────────────────────────────────────────────────────────────────

    /// Resets for an explicit (re)start of automated play.
    ///
    /// The budget survives a reset; the transcript is not touched.
    pub fn reset(&mut self) {
        self.turn_count = 0;
        self.phase = SessionPhase::for_turn(0);
        self.last_speaker = None;
        self.is_running = false;
        self.last_intervention_at = None;
        self.shared_story_summaries.clear();
        self.completion = CompletionDecision::not_yet();
    }

    pub fn set_running(&mut self, running: bool) {
        self.is_running = running;
    }

    /// Records a completed turn: increments the count, re-derives the
    /// phase, and notes the speaker.
    pub fn record_turn(&mut self, speaker: Speaker) {
        self.turn_count += 1;
        self.phase = SessionPhase::for_turn(self.turn_count);
        self.last_speaker = Some(speaker);
    }

    /// Reconciles the last speaker after a hard stop interrupted `speaker`
    /// mid-stream, so a restart hands the turn back to the interrupted role.
    pub fn reconcile_interrupted(&mut self, speaker: Speaker) {
        self.last_speaker = Some(speaker.counterpart());
    }

    /// Notes that an intervention instruction was injected now.
    pub fn mark_intervention(&mut self, at: Timestamp) {
        self.last_intervention_at = Some(at);
    }

    /// Returns true if the intervention cooldown has elapsed at `now`.
    pub fn intervention_cooldown_elapsed(&self, now: &Timestamp, cooldown_secs: u64) -> bool {
        match &self.last_intervention_at {
            None => true,
            Some(last) => now.seconds_since(last) >= cooldown_secs as i64,
        }
    }

    /// Appends a story digest, evicting the oldest past the bound.
    pub fn push_story_summary(&mut self, summary: impl Into<String>) {
        self.shared_story_summaries.push_back(summary.into());
        while self.shared_story_summaries.len() > MAX_STORY_SUMMARIES {
            self.shared_story_summaries.pop_front();
        }
    }

    pub fn set_completion(&mut self, completion: CompletionDecision) {
        self.completion = completion;
    }
}
