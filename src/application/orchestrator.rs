//! Session orchestrator.
//!
//! Owns the alternating turn loop: first-speaker selection, the exchange
//! budget, cooperative cancellation, repetition detection, and the
//! post-turn phase/quality/completion bookkeeping. Turns run strictly
//! sequentially; the only concurrency is the control channel and the
//! in-flight response stream.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::application::turn::{TurnExecutor, TurnOutcome};
use crate::config::AppConfig;
use crate::domain::conversation::{
    CompletionDetector, ConversationState, Message, QualityScorer, QualitySnapshot, Speaker,
    Transcript,
};
use crate::domain::foundation::{DomainError, SessionId};
use crate::ports::{GenerationProvider, MessageStore, SessionObserver, StopReason, StoreError};

/// Control values carried on the session's watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlSignal {
    /// Keep looping.
    #[default]
    Run,
    /// Stop at the next checkpoint; an in-flight stream finishes first.
    Stop,
    /// Stop now and cancel the in-flight stream.
    HardStop,
}

/// Creates the control channel for one orchestrator run.
pub fn control_channel() -> (watch::Sender<ControlSignal>, watch::Receiver<ControlSignal>) {
    watch::channel(ControlSignal::Run)
}

/// Drives the dual-persona conversation loop for one session.
///
/// Single-writer discipline: the orchestrator is the only mutator of its
/// `ConversationState` and transcript. UI layers read state snapshots
/// between turns via the accessors.
pub struct SessionOrchestrator<G, S, O>
where
    G: GenerationProvider,
    S: MessageStore,
    O: SessionObserver,
{
    session_id: SessionId,
    executor: TurnExecutor<G, S, O>,
    observer: Arc<O>,
    transcript: Transcript,
    state: ConversationState,
    scorer: QualityScorer,
    completion: CompletionDetector,
    inter_turn_delay: Duration,
    /// Same-role responses in a row that count as repetition.
    repetition_run: usize,
    /// Shared-prefix length that marks near-identical responses.
    repetition_prefix_chars: usize,
}

impl<G, S, O> SessionOrchestrator<G, S, O>
where
    G: GenerationProvider + 'static,
    S: MessageStore + 'static,
    O: SessionObserver + 'static,
{
    /// Creates an orchestrator for a fresh session.
    pub fn new(
        session_id: SessionId,
        executor: TurnExecutor<G, S, O>,
        observer: Arc<O>,
        exchange_budget: u32,
    ) -> Self {
        Self {
            session_id,
            executor,
            observer,
            transcript: Transcript::new(),
            state: ConversationState::new(exchange_budget),
            scorer: QualityScorer::new(),
            completion: CompletionDetector::new(),
            inter_turn_delay: Duration::from_millis(2000),
            repetition_run: 3,
            repetition_prefix_chars: 50,
        }
    }

    /// Applies the configuration sections relevant to the loop.
    ///
    /// Replaces the conversation state, so apply this before running.
    pub fn with_app_config(mut self, config: &AppConfig) -> Self {
        self.state = ConversationState::new(config.session.exchange_budget);
        self.inter_turn_delay = config.session.inter_turn_delay();
        self.repetition_run = config.detection.repetition_run;
        self.repetition_prefix_chars = config.detection.repetition_prefix_chars;
        self.scorer = QualityScorer::new().with_weights(
            config.scoring.story_extraction_weight,
            config.scoring.loop_breaking_weight,
            config.scoring.phase_progression_weight,
        );
        self.completion =
            CompletionDetector::new().with_min_turns(config.detection.min_completion_turns);
        self
    }

    /// Resumes over an existing transcript (e.g. loaded from the store).
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    /// Overrides the pause between turns.
    pub fn with_inter_turn_delay(mut self, delay: Duration) -> Self {
        self.inter_turn_delay = delay;
        self
    }

    /// Overrides the quality scorer.
    pub fn with_scorer(mut self, scorer: QualityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Overrides the completion detector.
    pub fn with_completion_detector(mut self, detector: CompletionDetector) -> Self {
        self.completion = detector;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read access for the presentation layer
    // ─────────────────────────────────────────────────────────────────────────

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn quality_history(&self) -> impl Iterator<Item = &QualitySnapshot> {
        self.scorer.history()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Life-cycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Records a message typed by the human operator.
    ///
    /// The next automated turn alternates against it. Persistence is best
    /// effort, like any other turn.
    pub async fn append_human_message(
        &mut self,
        text: impl Into<String>,
    ) -> Result<(), DomainError> {
        let message = Message::sent(Speaker::HumanUser, text)?;
        self.executor
            .persist_best_effort(&self.session_id, &message)
            .await;
        self.transcript.push(message);
        Ok(())
    }

    /// Removes zero-length entries abandoned by interrupted turns.
    pub fn cleanup_transcript(&mut self) -> usize {
        self.transcript.prune_abandoned()
    }

    /// Reloads the transcript from the message store (session resume).
    ///
    /// # Errors
    ///
    /// Returns the store error unchanged; resuming has no fallback.
    pub async fn resume_from_store(&mut self, limit: usize) -> Result<(), StoreError> {
        self.transcript = self.executor.load_recent(&self.session_id, limit).await?;
        Ok(())
    }

    /// Runs automated play until a stop condition is reached.
    ///
    /// Restarting always resets the conversation state (turn 0, Diagnosis);
    /// the transcript carries over. The first speaker is `initial_speaker`
    /// if given, the patient for an empty session, and otherwise whoever
    /// did not speak last.
    pub async fn run(
        &mut self,
        initial_speaker: Option<Speaker>,
        mut control: watch::Receiver<ControlSignal>,
    ) -> StopReason {
        self.state.reset();
        self.state.set_running(true);
        let mut speaker = initial_speaker.unwrap_or_else(|| self.first_speaker());
        let mut control_live = true;

        let reason = loop {
            // (a) cooperative cancellation checkpoint
            if *control.borrow() != ControlSignal::Run {
                break StopReason::Cancelled;
            }
            if self.state.budget_exhausted() {
                break StopReason::BudgetExhausted;
            }

            // (b) one turn, watching for a hard stop mid-stream
            let (hard_tx, mut hard_rx) = watch::channel(false);
            let outcome = {
                let turn = self.executor.execute_turn(
                    &self.session_id,
                    speaker,
                    &mut self.transcript,
                    &mut self.state,
                    &mut hard_rx,
                );
                tokio::pin!(turn);
                loop {
                    tokio::select! {
                        result = &mut turn => break result,
                        changed = control.changed(), if control_live => {
                            if changed.is_err() {
                                control_live = false;
                            } else if *control.borrow() == ControlSignal::HardStop {
                                let _ = hard_tx.send(true);
                            }
                        }
                    }
                }
            };

            match outcome {
                Err(err) => {
                    // A broken turn never kills the session; hand the floor
                    // to the other role.
                    tracing::warn!(error = %err, speaker = ?speaker, "turn failed");
                    speaker = speaker.counterpart();
                }
                Ok(TurnOutcome::Cancelled { interrupted }) => {
                    self.state.reconcile_interrupted(interrupted);
                    break StopReason::Cancelled;
                }
                Ok(TurnOutcome::Completed(turn)) => {
                    // (c) immediate repetition check, before the turn counts
                    if self.is_repetitive(speaker) {
                        break StopReason::Repetitive;
                    }

                    // (d) bookkeeping strictly after the message is final
                    self.state.record_turn(speaker);
                    self.scorer.score(
                        self.transcript.messages(),
                        self.state.phase(),
                        self.state.turn_count(),
                    );
                    let completion = self.completion.detect(
                        self.transcript.messages(),
                        self.state.phase(),
                        self.state.turn_count(),
                    );
                    let completed = completion.completed;
                    let completion_reason = completion.reason.clone();
                    self.state.set_completion(completion);

                    // (e) natural end
                    if completed {
                        break StopReason::Completed {
                            reason: completion_reason,
                        };
                    }

                    // (f) inter-turn delay, cut short by control changes
                    speaker = turn.next_speaker;
                    self.pause_between_turns(&mut control, &mut control_live)
                        .await;
                }
            }
        };

        self.state.set_running(false);
        self.observer.on_conversation_stopped(&reason).await;
        reason
    }

    /// Patient opens an empty session; otherwise alternation continues.
    fn first_speaker(&self) -> Speaker {
        match self.transcript.last_speaker() {
            None => Speaker::Patient,
            Some(last) => last.counterpart(),
        }
    }

    /// True if the last `repetition_run` same-role responses are identical
    /// or share a long common prefix.
    fn is_repetitive(&self, speaker: Speaker) -> bool {
        let texts = self
            .transcript
            .recent_texts_by(speaker, self.repetition_run);
        if texts.len() < self.repetition_run {
            return false;
        }

        if texts.windows(2).all(|pair| pair[0] == pair[1]) {
            return true;
        }

        let prefixes: Vec<String> = texts
            .iter()
            .map(|text| text.chars().take(self.repetition_prefix_chars).collect())
            .collect();
        prefixes[0].chars().count() == self.repetition_prefix_chars
            && prefixes.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// Sleeps between turns without holding up a stop request.
    async fn pause_between_turns(
        &self,
        control: &mut watch::Receiver<ControlSignal>,
        control_live: &mut bool,
    ) {
        let delay = tokio::time::sleep(self.inter_turn_delay);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                _ = &mut delay => break,
                changed = control.changed(), if *control_live => {
                    if changed.is_err() {
                        *control_live = false;
                    } else if *control.borrow() != ControlSignal::Run {
                        break;
                    }
                }
            }
        }
    }
}
