//! Command-line argument parsing
//!
//! Flags mirror the classic retrace tool. Arguments are grouped by category
//! for clarity; trace files are trailing positionals.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Replay recorded multi-threaded traces
#[derive(Parser, Debug, Clone)]
#[command(name = "retrace")]
#[command(version, about = "Replay TRACE.", long_about = None)]
pub struct CliArgs {
    // ===== Replay Mode =====
    /// Benchmark mode (no error checking or warning messages)
    #[arg(short = 'b', long = "benchmark")]
    pub benchmark: bool,

    // ===== Profiling =====
    /// CPU profiling (cpu times per call)
    #[arg(long = "pcpu")]
    pub profile_cpu: bool,

    /// GPU profiling (gpu times per draw call)
    #[arg(long = "pgpu")]
    pub profile_gpu: bool,

    /// Pixels drawn profiling (pixels drawn per draw call)
    #[arg(long = "ppd")]
    pub profile_pixels_drawn: bool,

    // ===== Snapshots =====
    /// Compare against snapshots with this path prefix
    #[arg(short = 'c', long = "compare", value_name = "PREFIX")]
    pub compare_prefix: Option<String>,

    /// Calls to compare (default is every frame)
    #[arg(short = 'C', long = "compare-calls", value_name = "CALLSET")]
    pub compare_calls: Option<String>,

    /// Take snapshots with this path prefix; `-` for PNM stdout output
    #[arg(
        short = 's',
        long = "snapshot",
        value_name = "PREFIX",
        allow_hyphen_values = true
    )]
    pub snapshot_prefix: Option<String>,

    /// Calls to snapshot (default is every frame)
    #[arg(short = 'S', long = "snapshot-calls", value_name = "CALLSET")]
    pub snapshot_calls: Option<String>,

    // ===== Canvas =====
    /// Canvas width of the built-in executor
    #[arg(long = "width", default_value_t = 256)]
    pub width: u32,

    /// Canvas height of the built-in executor
    #[arg(long = "height", default_value_t = 256)]
    pub height: u32,

    // ===== Output =====
    /// Increase output verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Dump state at this call number and exit
    #[arg(short = 'D', long = "dump-state", value_name = "CALLNO")]
    pub dump_state: Option<u32>,

    /// Wait for Enter after the final frame
    #[arg(short = 'w', long = "wait")]
    pub wait: bool,

    /// Trace files to replay, in order
    #[arg(value_name = "TRACE", trailing_var_arg = true)]
    pub traces: Vec<PathBuf>,
}

impl CliArgs {
    /// Parse CLI arguments from the command line
    ///
    /// Errors (including `--help` and `--version`) are returned so the
    /// caller decides the exit status.
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// Any profiling category requested
    pub fn profiling(&self) -> bool {
        self.profile_cpu || self.profile_gpu || self.profile_pixels_drawn
    }
}
