//! Reconnaissance engine: an event bus with rules, plus the scanners that feed it.
//!
//! [`orchestrator::Orchestrator`] is the entry point for a full run.

pub mod barrier;
pub mod engine;
pub mod http;
pub mod hunter;
pub mod orchestrator;
pub mod resolver;
pub mod rules;
pub mod scanner;
