//! Retracing one call at a time
//!
//! The dispatch step the relay runners call for every call they hold:
//! snapshot timing, the executor seam, replay counters and the state dump.

pub mod capture;
pub mod executor;
pub mod retracer;
pub mod state;

pub use capture::{take_snapshot, SnapshotReport};
pub use executor::{Executor, StateDumper};
pub use retracer::{Dispatch, Retracer};
pub use state::ReplayState;
