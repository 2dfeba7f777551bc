//! retrace - replay recorded multi-threaded traces
//!
//! Replays each trace file on the built-in canvas backend in its original
//! thread interleaving, optionally snapshotting, comparing against reference
//! images, or dumping state at a given call.

use std::process;

use anyhow::Result;
use clap::error::ErrorKind;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use relay_retrace::canvas::{capture_from, shared_canvas, CanvasDumper, CanvasExecutor};
use relay_retrace::config::{CliArgs, ReplayConfig};
use relay_retrace::relay::RaceOutcome;
use relay_retrace::replay::ReplayOrchestrator;
use relay_retrace::retrace::Retracer;
use relay_retrace::snapshot::PngSnapshots;

fn setup_logging(verbosity: i32) {
    let level = match verbosity {
        i32::MIN..=-2 => Level::ERROR,
        -1 => Level::WARN,
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // stdout is reserved for snapshot streams and state dumps
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: tracing subscriber already set");
    }
}

fn run() -> Result<i32> {
    let args = match CliArgs::try_parse_args() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            return Ok(code);
        }
    };

    let config = ReplayConfig::from_cli(&args)?;
    setup_logging(config.verbosity);

    let canvas = shared_canvas(config.canvas_width, config.canvas_height);
    let executor = CanvasExecutor::new(canvas.clone(), config.profiling);
    let snapshots = PngSnapshots::new(capture_from(&canvas));
    let retracer = Retracer::new(&config, Box::new(executor), Box::new(snapshots))
        .with_dumper(Box::new(CanvasDumper::new(canvas)));

    let mut orchestrator = ReplayOrchestrator::new(config, retracer);
    let results = orchestrator.run_all()?;

    if let Some(last) = results.last() {
        if let RaceOutcome::StateDumped { call_no } = last.outcome {
            debug!("Exiting after state dump at call {}", call_no);
        }
    }

    Ok(0)
}

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}
