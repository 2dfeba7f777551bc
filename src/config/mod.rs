//! Configuration module

pub mod cli;
pub mod replay_config;

pub use cli::CliArgs;
pub use replay_config::{Profiling, ReplayConfig, SnapshotConfig};
