//! Replay driver

pub mod orchestrator;

pub use orchestrator::{ReplayOrchestrator, TraceResult};
