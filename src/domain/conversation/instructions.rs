//! Per-turn generation instruction assembly.
//!
//! Combines the persona briefing, the current phase directive, accumulated
//! story context, and an optional loop intervention into the instruction
//! string handed to the generation collaborator.

use crate::domain::conversation::{LoopReport, SessionPhase};
use crate::domain::foundation::DomainError;

/// A persona handed to the engine by the (excluded) persona-library layer.
///
/// Deliberately closed: a display name and a briefing paragraph. Free-form
/// preference bags are not accepted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaBriefing {
    name: String,
    briefing: String,
}

impl PersonaBriefing {
    /// Creates a persona briefing.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if name or briefing is empty
    pub fn new(name: impl Into<String>, briefing: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let briefing = briefing.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name", "Persona name cannot be empty"));
        }
        if briefing.trim().is_empty() {
            return Err(DomainError::validation(
                "briefing",
                "Persona briefing cannot be empty",
            ));
        }
        Ok(Self { name, briefing })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn briefing(&self) -> &str {
        &self.briefing
    }
}

/// Builds the intervention block for a detected loop.
///
/// Names the repeated phrases so the generator can steer away from them.
pub fn intervention_directive(report: &LoopReport, repeat_threshold: usize) -> String {
    let repeated = report.repeated_phrases(repeat_threshold);
    if repeated.is_empty() {
        return "The recent exchange keeps returning to the same ground. Move to a \
                specific moment that has not been discussed yet: a different day, a \
                different place, or a different person."
            .to_string();
    }

    let phrases: Vec<String> = repeated
        .iter()
        .map(|(phrase, _)| format!("\"{}\"", phrase))
        .collect();
    format!(
        "The conversation is circling. The phrasing {} has already been used \
         repeatedly; do not use it again. Ask about one concrete new moment \
         instead: when it happened, where, and who was there.",
        phrases.join(", ")
    )
}

/// The assembled instructions for one turn's generation call.
#[derive(Debug, Clone)]
pub struct TurnInstructions {
    phase: SessionPhase,
    persona: PersonaBriefing,
    story_context: Vec<String>,
    intervention: Option<String>,
}

impl TurnInstructions {
    /// Starts instruction assembly for a phase and persona.
    pub fn for_phase(phase: SessionPhase, persona: PersonaBriefing) -> Self {
        Self {
            phase,
            persona,
            story_context: Vec::new(),
            intervention: None,
        }
    }

    /// Adds the shared story digests accumulated so far.
    pub fn with_story_context<I, S>(mut self, summaries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.story_context = summaries.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a loop-intervention block.
    pub fn with_intervention(mut self, intervention: impl Into<String>) -> Self {
        self.intervention = Some(intervention.into());
        self
    }

    pub fn has_intervention(&self) -> bool {
        self.intervention.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Renders the final instruction string.
    ///
    /// Sections, in order: persona, phase directive, story context,
    /// intervention.
    pub fn render(&self) -> String {
        let mut sections = vec![
            format!("You are {}. {}", self.persona.name, self.persona.briefing),
            format!(
                "Current stage: {}. {}",
                self.phase.label(),
                self.phase.directive()
            ),
        ];

        if !self.story_context.is_empty() {
            sections.push(format!(
                "Story so far:\n- {}",
                self.story_context.join("\n- ")
            ));
        }

        if let Some(intervention) = &self.intervention {
            sections.push(format!("Important: {}", intervention));
        }

        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{LoopDetector, Message, Speaker};

    fn persona() -> PersonaBriefing {
        PersonaBriefing::new(
            "Dr. Mira Holt",
            "A warm, methodical therapist who asks for specifics.",
        )
        .unwrap()
    }

    mod persona_briefing {
        use super::*;

        #[test]
        fn rejects_empty_name() {
            assert!(PersonaBriefing::new("", "briefing").is_err());
        }

        #[test]
        fn rejects_empty_briefing() {
            assert!(PersonaBriefing::new("Dr. Holt", "   ").is_err());
        }
    }

    mod rendering {
        use super::*;

        #[test]
        fn render_includes_persona_and_phase_directive() {
            let rendered =
                TurnInstructions::for_phase(SessionPhase::Diagnosis, persona()).render();

            assert!(rendered.contains("Dr. Mira Holt"));
            assert!(rendered.contains(SessionPhase::Diagnosis.directive()));
        }

        #[test]
        fn render_includes_story_context_when_present() {
            let rendered = TurnInstructions::for_phase(SessionPhase::StoryDevelopment, persona())
                .with_story_context(vec!["The kitchen argument last Tuesday."])
                .render();

            assert!(rendered.contains("Story so far:"));
            assert!(rendered.contains("kitchen argument"));
        }

        #[test]
        fn render_omits_story_section_when_empty() {
            let rendered =
                TurnInstructions::for_phase(SessionPhase::Diagnosis, persona()).render();
            assert!(!rendered.contains("Story so far:"));
        }

        #[test]
        fn render_appends_intervention_block() {
            let instructions = TurnInstructions::for_phase(SessionPhase::Diagnosis, persona())
                .with_intervention("Stop circling; pick a new moment.");

            assert!(instructions.has_intervention());
            assert!(instructions.render().contains("Stop circling"));
        }
    }

    mod intervention_directive {
        use super::*;

        #[test]
        fn names_the_repeated_phrases() {
            let text = "I've been feeling exhausted walking on eggshells lately";
            let messages: Vec<Message> = (0..3)
                .map(|_| Message::sent(Speaker::Patient, text).unwrap())
                .collect();
            let report = LoopDetector::new().analyze(&messages);

            let directive = intervention_directive(&report, 2);

            assert!(directive.contains("\"walking on eggshells\""));
            assert!(directive.contains("do not use it again"));
        }

        #[test]
        fn theme_only_loop_gets_a_generic_redirect() {
            let messages: Vec<Message> = (0..4)
                .map(|i| {
                    Message::sent(Speaker::Patient, format!("My mother called again, take {}", i))
                        .unwrap()
                })
                .collect();
            let report = LoopDetector::new().analyze(&messages);
            assert!(report.theme_repetition);

            let directive = intervention_directive(&report, 2);
            assert!(directive.contains("same ground"));
        }
    }
}
