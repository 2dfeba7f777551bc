//! Executor and state dumper seams
//!
//! The executor applies the effect of each recorded call. The scheduler never
//! looks at what it does; it only orders the calls and asks for pending work
//! to be flushed before another leg takes over.

use std::io::Write;

use crate::trace::Call;
use crate::utils::Result;

/// Applies recorded calls
pub trait Executor: Send {
    /// Apply one call's effect. An error is fatal for the whole replay.
    fn apply(&mut self, call: &Call) -> Result<()>;

    /// Make buffered effects visible before a different leg runs
    fn flush_pending_work(&mut self) -> Result<()> {
        Ok(())
    }

    /// Executor-specific profiling summary printed after each race
    fn profile_summary(&self) -> Option<String> {
        None
    }
}

/// Writes a diagnostic dump of the executor state
pub trait StateDumper: Send {
    /// Dump state to `out`, reporting success
    fn dump_state(&mut self, out: &mut dyn Write) -> bool;
}
