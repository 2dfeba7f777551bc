//! Replay configuration derived from CLI arguments

use std::path::PathBuf;

use super::cli::CliArgs;
use crate::snapshot::STDOUT_PREFIX;
use crate::trace::{Call, CallSet};
use crate::utils::{ReplayError, Result};

/// Profiling categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Profiling {
    pub cpu: bool,
    pub gpu: bool,
    pub pixels_drawn: bool,
}

impl Profiling {
    pub fn enabled(&self) -> bool {
        self.cpu || self.gpu || self.pixels_drawn
    }
}

/// Which calls get snapshotted or compared, and where images live
#[derive(Debug, Clone, Default)]
pub struct SnapshotConfig {
    /// Prefix for written snapshots, `-` streams PNM to stdout
    pub snapshot_prefix: Option<String>,
    pub snapshot_calls: CallSet,
    /// Prefix of reference images to compare against
    pub compare_prefix: Option<String>,
    pub compare_calls: CallSet,
}

impl SnapshotConfig {
    /// Snapshot `-s PREFIX` on every frame
    pub fn snapshot_every_frame(prefix: impl Into<String>) -> Self {
        Self {
            snapshot_prefix: Some(prefix.into()),
            snapshot_calls: CallSet::every_frame(),
            ..Self::default()
        }
    }

    /// Compare `-c PREFIX` on every frame
    pub fn compare_every_frame(prefix: impl Into<String>) -> Self {
        Self {
            compare_prefix: Some(prefix.into()),
            compare_calls: CallSet::every_frame(),
            ..Self::default()
        }
    }

    /// Either a snapshot or compare prefix is configured
    pub fn is_enabled(&self) -> bool {
        self.snapshot_prefix.is_some() || self.compare_prefix.is_some()
    }

    /// The call is selected by either the snapshot or the compare set
    pub fn selects(&self, call: &Call) -> bool {
        self.snapshot_calls.contains(call) || self.compare_calls.contains(call)
    }

    /// Snapshots go to stdout as PNM
    pub fn streams_to_stdout(&self) -> bool {
        self.snapshot_prefix.as_deref() == Some(STDOUT_PREFIX)
    }
}

/// Complete replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    // Input
    pub traces: Vec<PathBuf>,

    // Output
    pub verbosity: i32,
    pub wait_on_finish: bool,

    // Profiling
    pub profiling: Profiling,

    // Snapshots
    pub snapshot: SnapshotConfig,
    pub dump_state_call_no: Option<u32>,

    // Canvas
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            traces: Vec::new(),
            verbosity: 0,
            wait_on_finish: false,
            profiling: Profiling::default(),
            snapshot: SnapshotConfig::default(),
            dump_state_call_no: None,
            canvas_width: 256,
            canvas_height: 256,
        }
    }
}

impl ReplayConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        if args.traces.is_empty() {
            return Err(ReplayError::Config("no trace file given".to_string()));
        }
        if args.width == 0 || args.height == 0 {
            return Err(ReplayError::Config(format!(
                "canvas size must be positive, got {}x{}",
                args.width, args.height
            )));
        }

        let profiling = Profiling {
            cpu: args.profile_cpu,
            gpu: args.profile_gpu,
            pixels_drawn: args.profile_pixels_drawn,
        };

        // -c/-s default to every frame; -C/-S alone default to an empty prefix
        let (compare_prefix, compare_calls) =
            resolve_selection(args.compare_prefix.as_deref(), args.compare_calls.as_deref())?;
        let (snapshot_prefix, snapshot_calls) =
            resolve_selection(args.snapshot_prefix.as_deref(), args.snapshot_calls.as_deref())?;

        let snapshot = SnapshotConfig {
            snapshot_prefix,
            snapshot_calls,
            compare_prefix,
            compare_calls,
        };

        let quiet = args.benchmark || args.profiling();
        let mut verbosity = 0;
        if quiet {
            verbosity = -1;
        }
        if args.dump_state.is_some() || snapshot.streams_to_stdout() {
            verbosity = -2;
        }
        verbosity += args.verbose as i32;

        Ok(Self {
            traces: args.traces.clone(),
            verbosity,
            wait_on_finish: args.wait,
            profiling,
            snapshot,
            dump_state_call_no: args.dump_state,
            canvas_width: args.width,
            canvas_height: args.height,
        })
    }

    /// Throughput is reported at the end of each race
    pub fn reports_throughput(&self) -> bool {
        self.verbosity >= -1 || self.profiling.enabled()
    }
}

fn resolve_selection(
    prefix: Option<&str>,
    calls: Option<&str>,
) -> Result<(Option<String>, CallSet)> {
    match (prefix, calls) {
        (None, None) => Ok((None, CallSet::empty())),
        (Some(prefix), None) => Ok((Some(prefix.to_string()), CallSet::every_frame())),
        (prefix, Some(calls)) => {
            let set: CallSet = calls.parse()?;
            Ok((Some(prefix.unwrap_or("").to_string()), set))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config(argv: &[&str]) -> ReplayConfig {
        let args = CliArgs::parse_from(argv);
        ReplayConfig::from_cli(&args).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&["retrace", "t"]);
        assert_eq!(cfg.verbosity, 0);
        assert!(!cfg.snapshot.is_enabled());
        assert_eq!(cfg.dump_state_call_no, None);
        assert!(cfg.reports_throughput());
    }

    #[test]
    fn test_requires_trace() {
        let args = CliArgs::parse_from(["retrace"]);
        assert!(matches!(
            ReplayConfig::from_cli(&args),
            Err(ReplayError::Config(_))
        ));
    }

    #[test]
    fn test_compare_defaults_to_every_frame() {
        let cfg = config(&["retrace", "-c", "ref/", "t"]);
        assert_eq!(cfg.snapshot.compare_prefix.as_deref(), Some("ref/"));
        assert_eq!(cfg.snapshot.compare_calls, CallSet::every_frame());
        assert!(cfg.snapshot.snapshot_calls.is_empty());
    }

    #[test]
    fn test_callset_without_prefix() {
        let cfg = config(&["retrace", "-S", "3,5", "t"]);
        assert_eq!(cfg.snapshot.snapshot_prefix.as_deref(), Some(""));
        assert!(cfg.snapshot.snapshot_calls.contains(&Call::new(5, 0)));
    }

    #[test]
    fn test_bad_callset() {
        let args = CliArgs::parse_from(["retrace", "-C", "x-y", "t"]);
        assert!(matches!(
            ReplayConfig::from_cli(&args),
            Err(ReplayError::CallSet(_))
        ));
    }

    #[test]
    fn test_verbosity_rules() {
        assert_eq!(config(&["retrace", "-b", "t"]).verbosity, -1);
        assert_eq!(config(&["retrace", "--pgpu", "t"]).verbosity, -1);
        assert_eq!(config(&["retrace", "-D", "10", "t"]).verbosity, -2);
        assert_eq!(config(&["retrace", "-s", "-", "t"]).verbosity, -2);
        assert_eq!(config(&["retrace", "-b", "-v", "-v", "t"]).verbosity, 1);
    }

    #[test]
    fn test_throughput_reporting() {
        assert!(!config(&["retrace", "-D", "1", "t"]).reports_throughput());
        assert!(config(&["retrace", "-D", "1", "--pcpu", "t"]).reports_throughput());
    }
}
