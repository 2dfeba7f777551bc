//! Relay scheduler
//!
//! Replays a recorded multi-threaded trace in its exact original
//! interleaving. Every recorded thread (leg) gets a runner; the baton moves
//! between runners at the recorded thread switches and only its holder may
//! retrace calls.

pub mod race;
mod runner;

pub use race::{Baton, FinishLine, RaceOutcome, RaceResult, RelayRace};
