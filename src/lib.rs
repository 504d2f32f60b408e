//! Mindstage - Dual-Persona Roleplay Session Engine
//!
//! This crate implements the conversation orchestrator behind a
//! mental-health-roleplay chat product: two AI personas (therapist and
//! patient) alternate turns through a simulated therapy session while the
//! engine tracks narrative phase, detects conversational loops, scores
//! response quality, and decides when the session has reached a natural end.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
