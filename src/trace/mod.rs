//! Recorded traces
//!
//! Call records, call-selection sets and the sources that yield calls in
//! their recorded order.

pub mod call;
pub mod callset;
pub mod header;
pub mod source;
pub mod trace_file;

pub use call::{Call, CallFlags, Leg, FORERUNNER_LEG};
pub use callset::{CallFrequency, CallSet};
pub use header::{TraceHeader, HEADER_SIZE, TRACE_MAGIC, TRACE_VERSION};
pub use source::{CallSource, MemorySource};
pub use trace_file::{TraceFile, TraceWriter};
