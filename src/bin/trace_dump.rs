//! Print the calls of a trace file, one per line

use std::env;
use std::error::Error;
use std::io::{self, BufWriter, Write};

use relay_retrace::canvas::DrawCommand;
use relay_retrace::trace::{CallSource, TraceFile, TraceHeader};

fn dump_calls(
    header: &TraceHeader,
    source: &mut dyn CallSource,
    out: &mut dyn Write,
) -> Result<u64, Box<dyn Error>> {
    writeln!(
        out,
        "# version {} with {} calls recorded",
        header.version, header.record_count
    )?;

    let mut calls = 0u64;
    while let Some(call) = source.next_call()? {
        let command = match DrawCommand::decode(&call.payload) {
            Ok(command) => format!("{:?}", command),
            Err(e) => format!("<{}>", e),
        };
        writeln!(
            out,
            "{} {} {} {} {}",
            call.no,
            call.thread_id,
            call.flags,
            call.payload.len(),
            command
        )?;
        calls += 1;
    }

    writeln!(out, "# {} calls", calls)?;
    out.flush()?;
    Ok(calls)
}

/// A reader that closed the pipe early just stops the dump
fn is_broken_pipe(err: &(dyn Error + 'static)) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <trace>", args[0]);
        std::process::exit(1);
    }

    let mut trace = TraceFile::open(&args[1])?;
    let header = *trace.header();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match dump_calls(&header, &mut trace, &mut out) {
        Ok(_) => Ok(()),
        Err(e) if is_broken_pipe(e.as_ref()) => Ok(()),
        Err(e) => Err(e),
    }
}
