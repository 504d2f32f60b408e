//! Application layer - orchestration of the session engine.
//!
//! Composes the domain analyzers with the collaborator ports:
//!
//! - `collector`: drives one turn's incremental response stream
//! - `turn`: executes one persona turn end to end
//! - `orchestrator`: owns the alternating turn loop and its life-cycle

mod collector;
mod orchestrator;
mod turn;

pub use collector::{CollectorOutcome, CollectorState, ResponseCollector, EMPTY_RESPONSE_FALLBACK};
pub use orchestrator::{control_channel, ControlSignal, SessionOrchestrator};
pub use turn::{CompletedTurn, TurnExecutor, TurnOutcome};
