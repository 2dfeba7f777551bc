//! Per-call dispatch
//!
//! Decides when a selected call is snapshotted relative to its effect,
//! applies the effect, and honours the state-dump threshold.

use std::io::{self, Write};
use std::time::Instant;

use tracing::{debug, warn};

use super::capture::{take_snapshot, SnapshotReport};
use super::executor::{Executor, StateDumper};
use super::state::ReplayState;
use crate::config::{Profiling, ReplayConfig, SnapshotConfig};
use crate::snapshot::SnapshotService;
use crate::trace::Call;
use crate::utils::Result;

/// What the race does after a call was retraced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Keep going
    Continue,
    /// The state was dumped, stop the replay
    Terminate,
}

/// Applies calls through the executor with snapshot and dump policy
pub struct Retracer {
    snapshot: SnapshotConfig,
    dump_state_call_no: Option<u32>,
    profiling: Profiling,
    executor: Box<dyn Executor>,
    snapshots: Box<dyn SnapshotService>,
    dumper: Option<Box<dyn StateDumper>>,
    dump_out: Box<dyn Write + Send>,
    state: ReplayState,
    last_snapshot: Option<SnapshotReport>,
}

impl Retracer {
    pub fn new(
        config: &ReplayConfig,
        executor: Box<dyn Executor>,
        snapshots: Box<dyn SnapshotService>,
    ) -> Self {
        Self {
            snapshot: config.snapshot.clone(),
            dump_state_call_no: config.dump_state_call_no,
            profiling: config.profiling,
            executor,
            snapshots,
            dumper: None,
            dump_out: Box::new(io::stdout()),
            state: ReplayState::new(config.profiling.cpu),
            last_snapshot: None,
        }
    }

    /// Dumper used once the dump threshold is reached
    pub fn with_dumper(mut self, dumper: Box<dyn StateDumper>) -> Self {
        self.dumper = Some(dumper);
        self
    }

    /// Redirect state dumps (stdout by default)
    pub fn with_dump_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.dump_out = out;
        self
    }

    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    /// Result of the most recent snapshot step
    pub fn last_snapshot(&self) -> Option<&SnapshotReport> {
        self.last_snapshot.as_ref()
    }

    pub fn profile_summary(&self) -> Option<String> {
        self.executor.profile_summary()
    }

    /// Reset per-race counters
    pub fn begin_race(&mut self) {
        self.state.begin_race();
    }

    /// Flush buffered executor work before another leg runs
    pub fn flush_pending_work(&mut self) -> Result<()> {
        self.executor.flush_pending_work()
    }

    /// Retrace one call
    pub fn retrace_call(&mut self, call: &Call) -> Result<Dispatch> {
        let do_snapshot = self.snapshot.selects(call);
        let swaps_target = call.swaps_render_target();

        // The output belongs to the previous call unless the switch also ends a frame
        if do_snapshot && swaps_target {
            let call_no = if call.ends_frame() {
                call.no
            } else {
                call.no.saturating_sub(1)
            };
            self.snapshot_at(call_no);
        }

        self.state.set_call_no(call.no);

        let started = self.profiling.cpu.then(Instant::now);
        self.executor.apply(call)?;
        if let Some(started) = started {
            let elapsed = started.elapsed();
            debug!("Call {} took {:?}", call.no, elapsed);
            self.state.record_cpu_time(elapsed);
        }
        self.state.record_call();

        if call.ends_frame() {
            self.state.frame_complete();
        }

        if do_snapshot && !swaps_target {
            self.snapshot_at(call.no);
        }

        match self.dump_state_call_no {
            Some(threshold) if call.no >= threshold => {
                if self.dump_state() {
                    return Ok(Dispatch::Terminate);
                }
            }
            _ => {}
        }

        Ok(Dispatch::Continue)
    }

    fn snapshot_at(&mut self, call_no: u32) {
        let report = take_snapshot(&self.snapshot, self.snapshots.as_mut(), call_no);
        self.last_snapshot = Some(report);
    }

    fn dump_state(&mut self) -> bool {
        let Some(dumper) = self.dumper.as_mut() else {
            return false;
        };
        if !dumper.dump_state(&mut self.dump_out) {
            return false;
        }
        if let Err(e) = self.dump_out.flush() {
            warn!("Failed to flush state dump: {}", e);
        }
        true
    }
}
