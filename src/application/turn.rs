//! Turn executor.
//!
//! Runs one persona's turn end to end: loop check, instruction assembly,
//! streamed generation through the collector, persistence, therapist-side
//! deepening, and story digest updates. A generation failure never fails
//! the turn; a graceful fallback utterance is substituted instead.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::application::collector::{CollectorOutcome, ResponseCollector};
use crate::config::AppConfig;
use crate::domain::conversation::{
    contains_story_prompt, intervention_directive, ConversationState, LoopDetector, Message,
    PersonaBriefing, ResponseFilter, SessionPhase, Speaker, StoryElements, StoryExtractor,
    Transcript, TurnInstructions,
};
use crate::domain::foundation::{DomainError, MessageId, SessionId, Timestamp};
use crate::ports::{
    GenerationProvider, GenerationRequest, MessageStore, SessionObserver, StoreError,
};

/// Maximum characters of a response kept in a story digest.
const DIGEST_LIMIT: usize = 100;

/// Graceful fallback utterances when the therapist's generation fails.
const THERAPIST_FALLBACKS: &[&str] = &[
    "Take your time. Whenever you're ready, tell me more about what that was like.",
    "Let's slow down for a moment. What part of this feels most important right now?",
    "I'm still here. Could you walk me through what happened next?",
];

/// Graceful fallback utterances when the patient's generation fails.
const PATIENT_FALLBACKS: &[&str] = &[
    "Sorry, I lost my train of thought. Could we go back a moment?",
    "I'm not sure how to say it. Give me a second.",
    "It's hard to find the words right now.",
];

/// Result of one executed turn.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The turn produced a finalized message.
    Completed(CompletedTurn),
    /// A hard stop interrupted the stream; nothing was persisted.
    Cancelled {
        /// The role whose turn was cut short.
        interrupted: Speaker,
    },
}

/// A finalized turn.
#[derive(Debug, Clone)]
pub struct CompletedTurn {
    pub message_id: MessageId,
    pub response: String,
    /// The opposite role, due to speak next.
    pub next_speaker: Speaker,
    /// An intervention instruction was injected this turn.
    pub intervened: bool,
    /// The response is a fallback after a generation failure.
    pub recovered_from_failure: bool,
}

/// Executes single persona turns against the collaborator ports.
pub struct TurnExecutor<G, S, O>
where
    G: GenerationProvider,
    S: MessageStore,
    O: SessionObserver,
{
    provider: Arc<G>,
    store: Arc<S>,
    observer: Arc<O>,
    therapist: PersonaBriefing,
    patient: PersonaBriefing,
    detector: LoopDetector,
    extractor: StoryExtractor,
    filter: ResponseFilter,
    /// Wall-clock seconds between intervention injections.
    intervention_cooldown_secs: u64,
    /// Messages of history handed to the generation collaborator.
    history_limit: usize,
}

impl<G, S, O> TurnExecutor<G, S, O>
where
    G: GenerationProvider + 'static,
    S: MessageStore + 'static,
    O: SessionObserver + 'static,
{
    /// Creates an executor with default tuning.
    pub fn new(
        provider: Arc<G>,
        store: Arc<S>,
        observer: Arc<O>,
        therapist: PersonaBriefing,
        patient: PersonaBriefing,
    ) -> Self {
        Self {
            provider,
            store,
            observer,
            therapist,
            patient,
            detector: LoopDetector::new(),
            extractor: StoryExtractor::new(),
            filter: ResponseFilter::new(),
            intervention_cooldown_secs: 30,
            history_limit: 12,
        }
    }

    /// Applies the configuration sections relevant to turn execution.
    pub fn with_app_config(mut self, config: &AppConfig) -> Self {
        self.intervention_cooldown_secs = config.session.intervention_cooldown_secs;
        self.history_limit = config.session.history_limit;
        self.detector = LoopDetector::new()
            .with_window(config.detection.loop_window)
            .with_phrase_repeat_threshold(config.detection.phrase_repeat_threshold);
        self
    }

    /// Overrides the intervention cooldown.
    pub fn with_intervention_cooldown_secs(mut self, secs: u64) -> Self {
        self.intervention_cooldown_secs = secs;
        self
    }

    /// Overrides the loop detector.
    pub fn with_loop_detector(mut self, detector: LoopDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Overrides the history window handed to the provider.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Executes one turn for `speaker`.
    ///
    /// `hard_cancel` aborts the in-flight stream mid-turn; a graceful stop
    /// never reaches in here, the orchestrator simply stops looping.
    ///
    /// # Errors
    ///
    /// Only internal invariant violations surface as errors; generation
    /// and persistence failures are absorbed per the failure policy.
    pub async fn execute_turn(
        &self,
        session_id: &SessionId,
        speaker: Speaker,
        transcript: &mut Transcript,
        state: &mut ConversationState,
        hard_cancel: &mut watch::Receiver<bool>,
    ) -> Result<TurnOutcome, DomainError> {
        // 1. Loop check, gated by the intervention cooldown.
        let report = self.detector.analyze(transcript.messages());
        let now = Timestamp::now();
        let intervention = if report.needs_intervention
            && state.intervention_cooldown_elapsed(&now, self.intervention_cooldown_secs)
        {
            state.mark_intervention(now);
            Some(intervention_directive(
                &report,
                self.detector.phrase_repeat_threshold(),
            ))
        } else {
            None
        };
        let intervened = intervention.is_some();

        // 2. Phase-specific instructions.
        let mut instructions =
            TurnInstructions::for_phase(state.phase(), self.briefing_for(speaker).clone())
                .with_story_context(state.shared_story_summaries());
        if let Some(block) = intervention {
            instructions = instructions.with_intervention(block);
        }

        // 3. Generation request over the recent history.
        let mut request = GenerationRequest::new(speaker, instructions.render());
        for message in transcript.recent(self.history_limit) {
            if !message.is_empty() {
                request = request.with_history_entry(message.speaker(), message.text());
            }
        }

        // The prior patient story feeds the deepening prompt on the
        // therapist path; extract it before the transcript tail is borrowed.
        let prior_story: Option<StoryElements> = transcript
            .recent_texts_by(Speaker::Patient, 1)
            .first()
            .map(|text| self.extractor.extract(text));
        let phase = state.phase();

        // Partial chunks fan out to the observer off the hot path.
        let (partial_tx, mut partial_rx) = mpsc::channel::<String>(32);
        let observer = Arc::clone(&self.observer);
        let forward = tokio::spawn(async move {
            while let Some(delta) = partial_rx.recv().await {
                observer.on_partial(speaker, &delta).await;
            }
        });

        let entry = transcript.push(Message::pending(speaker));

        let collected = match self.provider.stream_generate(request).await {
            Ok(stream) => {
                entry.begin_streaming()?;
                let mut collector = ResponseCollector::new(self.filter.clone());
                collector
                    .collect(stream, hard_cancel, |delta| {
                        let _ = entry.append_chunk(delta);
                        // Best effort: a slow observer drops deltas, never
                        // stalls the stream.
                        let _ = partial_tx.try_send(delta.to_string());
                    })
                    .await
            }
            Err(err) => Err(err),
        };
        drop(partial_tx);

        let (mut response, recovered) = match collected {
            Ok(CollectorOutcome::Completed(text)) => (text, false),
            Ok(CollectorOutcome::Cancelled) => {
                // Hard stop: freeze a partial, leave an empty entry for
                // explicit cleanup, persist nothing.
                if !entry.is_empty() {
                    let _ = entry.fail("interrupted by hard stop");
                }
                let _ = forward.await;
                return Ok(TurnOutcome::Cancelled {
                    interrupted: speaker,
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, speaker = ?speaker, "generation failed, substituting fallback");
                (fallback_line(speaker, state.turn_count()).to_string(), true)
            }
        };

        // 5. Therapist responses that never ask for story detail get a
        // deepening follow-up derived from the patient's last utterance.
        if speaker == Speaker::Therapist && !contains_story_prompt(&response) {
            let elements = prior_story.unwrap_or_default();
            let prompt = self.extractor.deepening_prompt(&elements, phase);
            response = format!("{} {}", response, prompt);
        }

        entry.finalize(response.clone())?;
        let message = entry.clone();

        // 6. Digest the developing story.
        if matches!(
            phase,
            SessionPhase::StoryDevelopment | SessionPhase::Resolution
        ) {
            state.push_story_summary(digest(&response));
        }

        // 4/7. Persist (non-fatal) and notify.
        self.persist_best_effort(session_id, &message).await;
        let _ = forward.await;
        self.observer.on_turn_complete(&message).await;

        Ok(TurnOutcome::Completed(CompletedTurn {
            message_id: *message.id(),
            response,
            next_speaker: speaker.counterpart(),
            intervened,
            recovered_from_failure: recovered,
        }))
    }

    /// Loads a session's recent stored messages as a transcript.
    pub(crate) async fn load_recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Transcript, StoreError> {
        Ok(Transcript::from_messages(
            self.store.list_recent(session_id, limit).await?,
        ))
    }

    /// Appends to the store, logging instead of failing the turn.
    pub(crate) async fn persist_best_effort(&self, session_id: &SessionId, message: &Message) {
        if let Err(err) = self.store.append(session_id, message).await {
            tracing::warn!(error = %err, session = %session_id, "failed to persist message");
        }
    }

    fn briefing_for(&self, speaker: Speaker) -> &PersonaBriefing {
        match speaker {
            Speaker::Therapist | Speaker::HumanUser => &self.therapist,
            Speaker::Patient => &self.patient,
        }
    }
}

/// Picks a deterministic fallback line for a failed generation.
fn fallback_line(speaker: Speaker, turn_count: u32) -> &'static str {
    let lines = match speaker {
        Speaker::Therapist | Speaker::HumanUser => THERAPIST_FALLBACKS,
        Speaker::Patient => PATIENT_FALLBACKS,
    };
    lines[turn_count as usize % lines.len()]
}

/// First clause of a response, bounded for the story summary list.
fn digest(text: &str) -> String {
    let first = text
        .split_terminator(['.', '!', '?'])
        .next()
        .unwrap_or(text)
        .trim();
    first.chars().take(DIGEST_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryMessageStore, NullObserver, ScriptedProvider};
    use crate::domain::conversation::MessageStatus;

    fn personas() -> (PersonaBriefing, PersonaBriefing) {
        (
            PersonaBriefing::new("Dr. Mira Holt", "A therapist who asks for specifics.").unwrap(),
            PersonaBriefing::new("Sam", "A patient worn down by family conflict.").unwrap(),
        )
    }

    fn executor(
        provider: ScriptedProvider,
        store: Arc<InMemoryMessageStore>,
    ) -> TurnExecutor<ScriptedProvider, InMemoryMessageStore, NullObserver> {
        let (therapist, patient) = personas();
        TurnExecutor::new(
            Arc::new(provider),
            store,
            Arc::new(NullObserver),
            therapist,
            patient,
        )
    }

    fn seeded_transcript(texts: &[(&str, Speaker)]) -> Transcript {
        let mut transcript = Transcript::new();
        for (text, speaker) in texts {
            transcript.push(Message::sent(*speaker, *text).unwrap());
        }
        transcript
    }

    #[tokio::test]
    async fn turn_streams_persists_and_flips_roles() {
        let store = Arc::new(InMemoryMessageStore::new());
        let provider =
            ScriptedProvider::new().with_response("Tell me about the moment it started.");
        let executor = executor(provider, Arc::clone(&store));

        let session = SessionId::new();
        let mut transcript = seeded_transcript(&[("I had a rough week.", Speaker::Patient)]);
        let mut state = ConversationState::new(20);
        let (_tx, mut cancel) = watch::channel(false);

        let outcome = executor
            .execute_turn(
                &session,
                Speaker::Therapist,
                &mut transcript,
                &mut state,
                &mut cancel,
            )
            .await
            .unwrap();

        let TurnOutcome::Completed(turn) = outcome else {
            panic!("expected a completed turn");
        };
        assert_eq!(turn.next_speaker, Speaker::Patient);
        assert!(!turn.recovered_from_failure);
        assert_eq!(turn.response, "Tell me about the moment it started.");

        let tail = transcript.last().unwrap();
        assert_eq!(tail.status(), MessageStatus::Sent);
        assert_eq!(tail.text(), turn.response);

        let stored = store.list_all(&session).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text(), turn.response);
    }

    #[tokio::test]
    async fn generation_failure_substitutes_fallback() {
        let store = Arc::new(InMemoryMessageStore::new());
        let provider = ScriptedProvider::new()
            .with_error(crate::ports::GenerationError::unavailable("offline"));
        let executor = executor(provider, Arc::clone(&store));

        let session = SessionId::new();
        let mut transcript = Transcript::new();
        let mut state = ConversationState::new(20);
        let (_tx, mut cancel) = watch::channel(false);

        let outcome = executor
            .execute_turn(
                &session,
                Speaker::Patient,
                &mut transcript,
                &mut state,
                &mut cancel,
            )
            .await
            .unwrap();

        let TurnOutcome::Completed(turn) = outcome else {
            panic!("expected a completed turn");
        };
        assert!(turn.recovered_from_failure);
        assert!(!turn.response.is_empty());
        assert_eq!(transcript.last().unwrap().status(), MessageStatus::Sent);
    }

    #[tokio::test]
    async fn mid_stream_failure_also_recovers() {
        let store = Arc::new(InMemoryMessageStore::new());
        let provider = ScriptedProvider::new().with_failing_stream(
            "partial ",
            crate::ports::GenerationError::network("reset"),
        );
        let executor = executor(provider, Arc::clone(&store));

        let session = SessionId::new();
        let mut transcript = Transcript::new();
        let mut state = ConversationState::new(20);
        let (_tx, mut cancel) = watch::channel(false);

        let outcome = executor
            .execute_turn(
                &session,
                Speaker::Patient,
                &mut transcript,
                &mut state,
                &mut cancel,
            )
            .await
            .unwrap();

        let TurnOutcome::Completed(turn) = outcome else {
            panic!("expected a completed turn");
        };
        assert!(turn.recovered_from_failure);
        assert_eq!(transcript.last().unwrap().text(), turn.response);
    }

    #[tokio::test]
    async fn store_failure_does_not_fail_the_turn() {
        let store = Arc::new(InMemoryMessageStore::failing());
        let provider = ScriptedProvider::new().with_response("Describe that evening for me.");
        let executor = executor(provider, Arc::clone(&store));

        let session = SessionId::new();
        let mut transcript = Transcript::new();
        let mut state = ConversationState::new(20);
        let (_tx, mut cancel) = watch::channel(false);

        let outcome = executor
            .execute_turn(
                &session,
                Speaker::Therapist,
                &mut transcript,
                &mut state,
                &mut cancel,
            )
            .await;

        assert!(matches!(outcome, Ok(TurnOutcome::Completed(_))));
    }

    #[tokio::test]
    async fn loop_triggers_intervention_and_cooldown_suppresses_the_next() {
        let store = Arc::new(InMemoryMessageStore::new());
        let provider = ScriptedProvider::new()
            .with_response("What else happened, tell me about it?")
            .with_response("Describe one specific morning.");
        let executor = executor(provider, Arc::clone(&store));

        let session = SessionId::new();
        let text = "I've been feeling exhausted walking on eggshells lately";
        let mut transcript = seeded_transcript(&[
            (text, Speaker::Patient),
            (text, Speaker::Patient),
            (text, Speaker::Patient),
        ]);
        let mut state = ConversationState::new(20);
        let (_tx, mut cancel) = watch::channel(false);

        let first = executor
            .execute_turn(
                &session,
                Speaker::Therapist,
                &mut transcript,
                &mut state,
                &mut cancel,
            )
            .await
            .unwrap();
        let TurnOutcome::Completed(first) = first else {
            panic!("expected a completed turn");
        };
        assert!(first.intervened);
        assert!(state.last_intervention_at().is_some());

        // Still looping, but inside the cooldown window.
        let second = executor
            .execute_turn(
                &session,
                Speaker::Therapist,
                &mut transcript,
                &mut state,
                &mut cancel,
            )
            .await
            .unwrap();
        let TurnOutcome::Completed(second) = second else {
            panic!("expected a completed turn");
        };
        assert!(!second.intervened);
    }

    #[tokio::test]
    async fn therapist_without_story_prompt_gets_deepening_appended() {
        let store = Arc::new(InMemoryMessageStore::new());
        let provider = ScriptedProvider::new().with_response("That carries real weight.");
        let executor = executor(provider, Arc::clone(&store));

        let session = SessionId::new();
        let mut transcript =
            seeded_transcript(&[("I felt angry about everything.", Speaker::Patient)]);
        let mut state = ConversationState::new(20);
        let (_tx, mut cancel) = watch::channel(false);

        let outcome = executor
            .execute_turn(
                &session,
                Speaker::Therapist,
                &mut transcript,
                &mut state,
                &mut cancel,
            )
            .await
            .unwrap();

        let TurnOutcome::Completed(turn) = outcome else {
            panic!("expected a completed turn");
        };
        assert!(turn.response.starts_with("That carries real weight."));
        assert!(turn.response.contains("Could you tell me more about"));
    }

    #[tokio::test]
    async fn therapist_with_story_prompt_is_left_alone() {
        let store = Arc::new(InMemoryMessageStore::new());
        let provider = ScriptedProvider::new().with_response("Walk me through that evening.");
        let executor = executor(provider, Arc::clone(&store));

        let session = SessionId::new();
        let mut transcript = seeded_transcript(&[("It was bad.", Speaker::Patient)]);
        let mut state = ConversationState::new(20);
        let (_tx, mut cancel) = watch::channel(false);

        let outcome = executor
            .execute_turn(
                &session,
                Speaker::Therapist,
                &mut transcript,
                &mut state,
                &mut cancel,
            )
            .await
            .unwrap();

        let TurnOutcome::Completed(turn) = outcome else {
            panic!("expected a completed turn");
        };
        assert_eq!(turn.response, "Walk me through that evening.");
    }

    #[tokio::test]
    async fn story_development_turns_append_digests() {
        let store = Arc::new(InMemoryMessageStore::new());
        let provider = ScriptedProvider::new()
            .with_response("Last Tuesday in the kitchen, my mother said I never call. I felt small.");
        let executor = executor(provider, Arc::clone(&store));

        let session = SessionId::new();
        let mut transcript = Transcript::new();
        let mut state = ConversationState::new(20);
        for _ in 0..5 {
            state.record_turn(Speaker::Patient);
        }
        assert_eq!(state.phase(), SessionPhase::StoryDevelopment);
        let (_tx, mut cancel) = watch::channel(false);

        executor
            .execute_turn(
                &session,
                Speaker::Patient,
                &mut transcript,
                &mut state,
                &mut cancel,
            )
            .await
            .unwrap();

        let summaries: Vec<&str> = state.shared_story_summaries().collect();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].starts_with("Last Tuesday in the kitchen"));
    }

    #[tokio::test]
    async fn hard_cancel_mid_stream_persists_nothing() {
        let store = Arc::new(InMemoryMessageStore::new());
        let provider = ScriptedProvider::new().with_hanging_stream("never finishes ");
        let executor = executor(provider, Arc::clone(&store));

        let session = SessionId::new();
        let mut transcript = Transcript::new();
        let mut state = ConversationState::new(20);
        let (tx, mut cancel) = watch::channel(false);

        let turn = executor.execute_turn(
            &session,
            Speaker::Therapist,
            &mut transcript,
            &mut state,
            &mut cancel,
        );
        let cancel_later = async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            let _ = tx.send(true);
        };
        let (outcome, ()) = tokio::join!(turn, cancel_later);

        assert!(matches!(
            outcome.unwrap(),
            TurnOutcome::Cancelled {
                interrupted: Speaker::Therapist
            }
        ));
        assert!(store.list_all(&session).await.is_empty());
    }

    #[test]
    fn digest_takes_the_first_clause() {
        assert_eq!(
            digest("Last Tuesday it rained. Then more happened."),
            "Last Tuesday it rained"
        );
    }

    #[test]
    fn fallback_lines_rotate_by_turn() {
        let a = fallback_line(Speaker::Patient, 0);
        let b = fallback_line(Speaker::Patient, 1);
        assert_ne!(a, b);
        assert!(!fallback_line(Speaker::Therapist, 7).is_empty());
    }
}
