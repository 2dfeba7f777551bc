//! Error types for relay-retrace

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::trace::Leg;

/// Top-level replay error
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    CallSet(#[from] CallSetError),

    #[error("Executor fault at call {call_no}: {message}")]
    Executor { call_no: u32, message: String },

    #[error("Failed to spawn runner for leg {leg}: {source}")]
    Spawn { leg: Leg, source: io::Error },

    #[error("Runner for leg {leg} is gone, baton could not be delivered")]
    BatonDropped { leg: Leg },

    #[error("Race abandoned: no runner holds the race state")]
    RaceAbandoned,
}

/// Trace file errors
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Invalid trace magic: expected 0x{expected:08X}, got 0x{actual:08X}")]
    InvalidMagic { expected: u32, actual: u32 },

    #[error("Unsupported trace version: {0}")]
    UnsupportedVersion(u32),

    #[error("Trace file too small: {size} bytes, minimum {minimum} bytes")]
    FileTooSmall { size: u64, minimum: u64 },

    #[error("Truncated record at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("Call {actual} follows call {previous}, call numbers must increase")]
    OutOfOrder { previous: u32, actual: u32 },

    #[error("Failed to open trace {}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write trace: {0}")]
    WriteFailed(io::Error),
}

/// Call-selection set parse errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CallSetError {
    #[error("Empty element in call set '{0}'")]
    EmptyElement(String),

    #[error("Invalid call number '{0}'")]
    InvalidNumber(String),

    #[error("Invalid range '{0}': start is after stop")]
    InvalidRange(String),

    #[error("Invalid step '{0}'")]
    InvalidStep(String),
}

/// Snapshot image errors
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("Image buffer size mismatch: {width}x{height} needs {expected} bytes, got {actual}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Canvas draw command decode errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown draw opcode {0}")]
    UnknownOpcode(u8),

    #[error("Draw opcode {opcode} needs {expected} payload bytes, got {actual}")]
    Length {
        opcode: u8,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, ReplayError>;
