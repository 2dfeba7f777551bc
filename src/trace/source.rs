//! Call sources
//!
//! A call source yields recorded calls in their original total order. Only
//! the runner currently holding the baton ever reads from it.

use std::collections::VecDeque;

use super::call::Call;
use crate::utils::TraceError;

/// Sequential reader of recorded calls
pub trait CallSource: Send {
    /// Next call in recorded order, or `None` at end of stream
    fn next_call(&mut self) -> Result<Option<Call>, TraceError>;
}

/// In-memory call source
#[derive(Debug, Default)]
pub struct MemorySource {
    calls: VecDeque<Call>,
}

impl MemorySource {
    pub fn new(calls: impl IntoIterator<Item = Call>) -> Self {
        Self {
            calls: calls.into_iter().collect(),
        }
    }

    /// Calls not yet read
    pub fn remaining(&self) -> usize {
        self.calls.len()
    }
}

impl From<Vec<Call>> for MemorySource {
    fn from(calls: Vec<Call>) -> Self {
        Self::new(calls)
    }
}

impl CallSource for MemorySource {
    fn next_call(&mut self) -> Result<Option<Call>, TraceError> {
        Ok(self.calls.pop_front())
    }
}
