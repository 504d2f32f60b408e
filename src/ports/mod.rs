//! Ports - Interfaces for external collaborators.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the session engine and the layers this crate does not implement: the
//! network layer that generates utterances, the persistence store, and
//! the presentation layer.

mod generation;
mod message_store;
mod observer;

pub use generation::{
    GenerationChunk, GenerationError, GenerationProvider, GenerationRequest, GenerationStream,
    PromptMessage,
};
pub use message_store::{MessageStore, StoreAck, StoreError};
pub use observer::{SessionObserver, StopReason};
