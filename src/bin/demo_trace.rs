//! Write a multi-threaded canvas demo trace
//!
//! Every frame, leg 0 clears the screen, each leg draws its own band, and
//! leg 0 presents. Every fourth frame also renders into target 1 first.

use std::env;

use relay_retrace::canvas::DrawCommand;
use relay_retrace::trace::{Call, CallFlags, Leg, TraceWriter};

struct Recorder {
    writer: TraceWriter<std::fs::File>,
    next_no: u32,
}

impl Recorder {
    fn record(
        &mut self,
        leg: Leg,
        command: DrawCommand,
        flags: CallFlags,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let call = Call::new(self.next_no, leg)
            .with_flags(flags)
            .with_payload(command.encode());
        self.writer.write_call(&call)?;
        self.next_no += 1;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <output> [frames] [legs]", args[0]);
        std::process::exit(1);
    }

    let frames: u16 = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(60);
    let legs: u16 = args.get(3).map(|s| s.parse()).transpose()?.unwrap_or(3).max(1);
    let (width, height) = (256u16, 256u16);
    let band = height / legs;

    let mut recorder = Recorder {
        writer: TraceWriter::create(&args[1])?,
        next_no: 0,
    };
    recorder.record(0, DrawCommand::Resize { width, height }, CallFlags::NONE)?;

    for frame in 0..frames {
        if frame % 4 == 0 {
            recorder.record(0, DrawCommand::BindTarget(1), CallFlags::SWAP_RENDERTARGET)?;
            recorder.record(0, DrawCommand::Clear([0, 0, 64, 255]), CallFlags::NONE)?;
            recorder.record(0, DrawCommand::BindTarget(0), CallFlags::SWAP_RENDERTARGET)?;
        }

        recorder.record(0, DrawCommand::Clear([16, 16, 16, 255]), CallFlags::NONE)?;
        for leg in 0..legs {
            let shade = (frame.wrapping_mul(4) % 256) as u8;
            let command = DrawCommand::FillRect {
                x: frame.wrapping_mul(3) % width,
                y: leg * band,
                width: width / 4,
                height: band,
                color: [shade, (leg * 60 % 256) as u8, 200, 255],
            };
            recorder.record(Leg::from(leg), command, CallFlags::NONE)?;
        }
        recorder.record(0, DrawCommand::Present, CallFlags::END_FRAME)?;
    }

    let calls = recorder.next_no;
    recorder.writer.finish()?;
    println!("Wrote {} calls over {} frames to {}", calls, frames, args[1]);
    Ok(())
}
