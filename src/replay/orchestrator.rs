//! Replay orchestrator
//!
//! Runs one relay race per trace file, in command-line order, and reports
//! each race's throughput. The retracer, and with it the replay state,
//! carries over from one race to the next.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::config::ReplayConfig;
use crate::metrics::RaceReport;
use crate::relay::{RaceOutcome, RelayRace};
use crate::retrace::Retracer;
use crate::trace::{CallSource, TraceFile};
use crate::utils::{ReplayError, Result};

/// Result of replaying one trace
#[derive(Debug, Clone)]
pub struct TraceResult {
    pub trace: String,
    pub outcome: RaceOutcome,
    pub report: RaceReport,
    /// Worker threads spawned and stopped for this trace
    pub workers_stopped: usize,
}

/// Sequential driver over every configured trace
pub struct ReplayOrchestrator {
    config: ReplayConfig,
    retracer: Option<Retracer>,
}

impl ReplayOrchestrator {
    pub fn new(config: ReplayConfig, retracer: Retracer) -> Self {
        Self {
            config,
            retracer: Some(retracer),
        }
    }

    /// Replay every trace, stopping early after a state dump
    pub fn run_all(&mut self) -> Result<Vec<TraceResult>> {
        let traces = self.config.traces.clone();
        let mut results = Vec::with_capacity(traces.len());

        for path in &traces {
            let result = self.run_trace(path)?;
            let dumped = matches!(result.outcome, RaceOutcome::StateDumped { .. });
            results.push(result);
            if dumped {
                break;
            }
            if self.config.wait_on_finish {
                wait_for_input(io::stdin().lock(), io::stderr());
            }
        }

        Ok(results)
    }

    /// Open and replay one trace file
    pub fn run_trace(&mut self, path: &Path) -> Result<TraceResult> {
        let trace = TraceFile::open(path)?;
        info!(
            "Replaying {} ({} calls recorded)",
            path.display(),
            trace.header().record_count
        );
        self.run_source(&path.display().to_string(), trace)
    }

    /// Replay calls from any source as one race
    pub fn run_source(
        &mut self,
        name: &str,
        source: impl CallSource + 'static,
    ) -> Result<TraceResult> {
        let retracer = self.retracer.take().ok_or_else(|| {
            ReplayError::Config("retracer was lost in an earlier failed race".to_string())
        })?;

        let start = Instant::now();
        let result = RelayRace::new(source, retracer).run()?;
        let elapsed = start.elapsed();

        let report = RaceReport::new(result.retracer.state(), result.legs.len(), elapsed)
            .with_executor_summary(result.retracer.profile_summary());

        match result.outcome {
            RaceOutcome::Completed => {
                info!(
                    "{}: {} calls on {} legs",
                    name, report.calls, report.legs
                );
                if self.config.reports_throughput() {
                    for line in report.lines() {
                        println!("{}", line);
                    }
                }
            }
            RaceOutcome::StateDumped { call_no } => {
                info!("{}: state dumped at call {}", name, call_no);
            }
        }

        let trace_result = TraceResult {
            trace: name.to_string(),
            outcome: result.outcome,
            report,
            workers_stopped: result.workers_stopped,
        };
        self.retracer = Some(result.retracer);
        Ok(trace_result)
    }

    /// The retracer, once no race is running
    pub fn retracer(&self) -> Option<&Retracer> {
        self.retracer.as_ref()
    }
}

/// The prompt goes to stderr, stdout may carry a snapshot stream
fn wait_for_input(mut input: impl BufRead, mut prompt: impl Write) {
    let _ = writeln!(prompt, "Press Enter to continue");
    let mut line = String::new();
    let _ = input.read_line(&mut line);
}
