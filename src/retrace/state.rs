//! Replay state counters
//!
//! Owned by the retracer and carried with the baton, so only the runner
//! holding the baton ever touches it. No atomics needed.

use std::time::Duration;

use hdrhistogram::Histogram;

/// Highest per-call CPU time tracked, in microseconds (one hour)
const MAX_CPU_TIME_US: u64 = 3_600_000_000;

/// Counters read by reporting at the end of each race
pub struct ReplayState {
    /// Frames completed in the current race
    frame_no: u64,
    /// Number of the call being (or last) retraced
    call_no: u32,
    /// Calls retraced in the current race
    calls_retraced: u64,
    /// Calls retraced across every race
    total_calls: u64,
    /// Per-call CPU time in microseconds, when cpu profiling
    cpu_times: Option<Histogram<u64>>,
}

impl ReplayState {
    pub fn new(profile_cpu: bool) -> Self {
        let cpu_times = if profile_cpu {
            Histogram::new_with_bounds(1, MAX_CPU_TIME_US, 3).ok()
        } else {
            None
        };
        Self {
            frame_no: 0,
            call_no: 0,
            calls_retraced: 0,
            total_calls: 0,
            cpu_times,
        }
    }

    /// Reset per-race counters
    pub fn begin_race(&mut self) {
        self.frame_no = 0;
        self.calls_retraced = 0;
        if let Some(ref mut histogram) = self.cpu_times {
            histogram.reset();
        }
    }

    /// Frame boundary hook
    #[inline]
    pub fn frame_complete(&mut self) {
        self.frame_no += 1;
    }

    #[inline]
    pub fn set_call_no(&mut self, call_no: u32) {
        self.call_no = call_no;
    }

    #[inline]
    pub fn record_call(&mut self) {
        self.calls_retraced += 1;
        self.total_calls += 1;
    }

    pub fn record_cpu_time(&mut self, elapsed: Duration) {
        if let Some(ref mut histogram) = self.cpu_times {
            let us = (elapsed.as_micros() as u64).max(1);
            histogram.saturating_record(us);
        }
    }

    pub fn frame_no(&self) -> u64 {
        self.frame_no
    }

    pub fn call_no(&self) -> u32 {
        self.call_no
    }

    pub fn calls_retraced(&self) -> u64 {
        self.calls_retraced
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls
    }

    pub fn cpu_times(&self) -> Option<&Histogram<u64>> {
        self.cpu_times.as_ref()
    }
}

impl Default for ReplayState {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_counter() {
        let mut state = ReplayState::default();
        state.frame_complete();
        state.frame_complete();
        assert_eq!(state.frame_no(), 2);

        state.begin_race();
        assert_eq!(state.frame_no(), 0);
    }

    #[test]
    fn test_totals_survive_races() {
        let mut state = ReplayState::default();
        state.record_call();
        state.record_call();
        state.set_call_no(9);
        state.begin_race();
        state.record_call();

        assert_eq!(state.calls_retraced(), 1);
        assert_eq!(state.total_calls(), 3);
        assert_eq!(state.call_no(), 9);
    }

    #[test]
    fn test_cpu_times_only_when_profiling() {
        let mut state = ReplayState::new(false);
        state.record_cpu_time(Duration::from_micros(50));
        assert!(state.cpu_times().is_none());

        let mut state = ReplayState::new(true);
        state.record_cpu_time(Duration::from_micros(50));
        state.record_cpu_time(Duration::from_nanos(10));
        let histogram = state.cpu_times().unwrap();
        assert_eq!(histogram.len(), 2);
        assert_eq!(histogram.min(), 1);
    }
}
