//! Generation adapters.

mod scripted;

pub use scripted::ScriptedProvider;
