//! Canvas executor and state dumper

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::raster::{Canvas, DrawCommand};
use crate::config::Profiling;
use crate::metrics::format_count;
use crate::retrace::{Executor, StateDumper};
use crate::snapshot::Image;
use crate::trace::Call;
use crate::utils::{ReplayError, Result};

/// Canvas shared between the executor, the snapshot capture and the dumper
pub type SharedCanvas = Arc<Mutex<Canvas>>;

pub fn shared_canvas(width: u32, height: u32) -> SharedCanvas {
    Arc::new(Mutex::new(Canvas::new(width, height)))
}

/// Capture callback for the snapshot service
pub fn capture_from(canvas: &SharedCanvas) -> impl FnMut() -> Option<Image> + Send + 'static {
    let canvas = Arc::clone(canvas);
    move || Some(canvas.lock().capture())
}

/// Applies call payloads as draw commands
pub struct CanvasExecutor {
    canvas: SharedCanvas,
    profiling: Profiling,
}

impl CanvasExecutor {
    pub fn new(canvas: SharedCanvas, profiling: Profiling) -> Self {
        Self { canvas, profiling }
    }
}

impl Executor for CanvasExecutor {
    fn apply(&mut self, call: &Call) -> Result<()> {
        let command = DrawCommand::decode(&call.payload).map_err(|e| ReplayError::Executor {
            call_no: call.no,
            message: e.to_string(),
        })?;
        self.canvas.lock().submit(command);
        Ok(())
    }

    fn flush_pending_work(&mut self) -> Result<()> {
        self.canvas.lock().flush();
        Ok(())
    }

    fn profile_summary(&self) -> Option<String> {
        let canvas = self.canvas.lock();
        let mut parts = Vec::new();
        if self.profiling.gpu {
            parts.push(format!(
                "Raster time: {:.3} ms",
                canvas.raster_time().as_secs_f64() * 1000.0
            ));
        }
        if self.profiling.pixels_drawn {
            parts.push(format!("Pixels drawn: {}", format_count(canvas.pixels_drawn())));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Dumps the canvas state as JSON
pub struct CanvasDumper {
    canvas: SharedCanvas,
}

impl CanvasDumper {
    pub fn new(canvas: SharedCanvas) -> Self {
        Self { canvas }
    }
}

impl StateDumper for CanvasDumper {
    fn dump_state(&mut self, out: &mut dyn Write) -> bool {
        let state = self.canvas.lock().state();
        let written = serde_json::to_writer_pretty(&mut *out, &state)
            .map_err(|e| e.to_string())
            .and_then(|()| writeln!(out).map_err(|e| e.to_string()));
        match written {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to dump canvas state: {}", e);
                false
            }
        }
    }
}
