//! Race report formatting

use std::time::Duration;

use hdrhistogram::Histogram;

use crate::retrace::ReplayState;

/// Per-call CPU time summary in microseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSummary {
    pub calls: u64,
    pub avg_us: f64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl CpuSummary {
    pub fn from_histogram(histogram: &Histogram<u64>) -> Option<Self> {
        if histogram.is_empty() {
            return None;
        }
        Some(Self {
            calls: histogram.len(),
            avg_us: histogram.mean(),
            p50_us: histogram.value_at_percentile(50.0),
            p99_us: histogram.value_at_percentile(99.0),
            max_us: histogram.max(),
        })
    }

    pub fn format(&self) -> String {
        format!(
            "CPU time per call (us): calls={} avg={:.2} p50={} p99={} max={}",
            format_count(self.calls),
            self.avg_us,
            self.p50_us,
            self.p99_us,
            self.max_us
        )
    }
}

/// Totals of one race
#[derive(Debug, Clone)]
pub struct RaceReport {
    pub frames: u64,
    pub calls: u64,
    pub legs: usize,
    pub elapsed: Duration,
    pub cpu: Option<CpuSummary>,
    /// Executor-specific profiling line
    pub executor: Option<String>,
}

impl RaceReport {
    pub fn new(state: &ReplayState, legs: usize, elapsed: Duration) -> Self {
        Self {
            frames: state.frame_no(),
            calls: state.calls_retraced(),
            legs,
            elapsed,
            cpu: state.cpu_times().and_then(CpuSummary::from_histogram),
            executor: None,
        }
    }

    pub fn with_executor_summary(mut self, summary: Option<String>) -> Self {
        self.executor = summary;
        self
    }

    /// Frames per second, 0.0 when no time elapsed
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }

    pub fn throughput_line(&self) -> String {
        format!(
            "Rendered {} frames in {:.6} secs, average of {:.6} fps",
            self.frames,
            self.elapsed.as_secs_f64(),
            self.fps()
        )
    }

    /// Throughput line followed by any profiling lines
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.throughput_line()];
        if let Some(ref cpu) = self.cpu {
            lines.push(cpu.format());
        }
        if let Some(ref executor) = self.executor {
            lines.push(executor.clone());
        }
        lines
    }
}

/// Format large numbers with thousands separators
/// Examples: 1,234,567 or 987,654
pub fn format_count(value: u64) -> String {
    let s = value.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}
