//! Snapshot images and the service that captures and stores them

pub mod bitmap;
pub mod service;

pub use bitmap::Image;
pub use service::{snapshot_path, CaptureFn, PngSnapshots, SnapshotService, STDOUT_PREFIX};
