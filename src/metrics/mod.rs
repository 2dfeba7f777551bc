//! Race reporting
//!
//! Throughput and CPU-time summaries printed after each race.

pub mod reporter;

pub use reporter::{format_count, CpuSummary, RaceReport};
