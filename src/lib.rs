//! Streaming test-event reporting: capture an example's stdout while its
//! body runs, then emit one JSON line per lifecycle transition to a sink
//! the reporter owns. The test-execution engine itself lives elsewhere;
//! this crate only observes it.

pub mod capture;
pub mod cli;
pub mod event;
pub mod logging;
pub mod report;

pub use capture::{CaptureError, capture};
pub use event::{ExampleOutcome, ResultEvent, TestIdentity};
pub use report::{JsonlReporter, ReportError};
