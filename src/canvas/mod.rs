//! Built-in software canvas backend
//!
//! Lets the `retrace` binary replay real traces end to end: call payloads
//! are draw commands rasterized into RGBA render targets.

pub mod executor;
pub mod raster;

pub use executor::{capture_from, shared_canvas, CanvasDumper, CanvasExecutor, SharedCanvas};
pub use raster::{Canvas, CanvasState, DrawCommand, TargetState};
