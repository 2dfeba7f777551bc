//! relay-retrace library
//!
//! Deterministic replay of recorded multi-threaded call traces. Calls run on
//! one runner per recorded thread, handing a baton over at every recorded
//! thread switch, with snapshot capture and comparison at selected calls.

pub mod canvas;
pub mod config;
pub mod metrics;
pub mod relay;
pub mod replay;
pub mod retrace;
pub mod snapshot;
pub mod trace;
pub mod utils;
