//! Utility modules

pub mod error;

pub use error::{CallSetError, CommandError, ImageError, ReplayError, Result, TraceError};
