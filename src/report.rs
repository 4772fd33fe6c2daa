// Streaming JSON Lines reporter

use crate::event::{ResultEvent, TestIdentity};
use serde_json::json;
use std::io::{self, Write};
use thiserror::Error;

/// Errors surfaced by the reporting operations.
///
/// None of these are retried internally. Re-emitting a line after a
/// partial write would duplicate a record in the consumer's stream, so
/// every failure is handed straight back to the caller.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The event violated a per-variant invariant; nothing was written
    #[error("malformed event: {0}")]
    MalformedEvent(String),
    /// The event could not be converted to JSON
    #[error("failed to serialize event")]
    Serialize(#[from] serde_json::Error),
    /// The sink rejected the write or the post-write flush
    #[error("failed to write event to sink")]
    Sink(#[from] io::Error),
}

/// Streaming JSON Lines reporter.
///
/// Owns its sink exclusively and only ever appends to it: one
/// newline-terminated JSON object per reported event, flushed
/// immediately so a consumer can parse the stream incrementally.
///
/// Whether passed and failed records carry a `captured_stdout` field is
/// fixed at construction time. Records of the same kind within one run
/// therefore always have the same shape.
pub struct JsonlReporter<W: Write> {
    sink: W,
    sender: Option<String>,
    captured_output: bool,
}

impl<W: Write> JsonlReporter<W> {
    /// Create a reporter writing to `sink`, with no sender tag and
    /// captured output disabled.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            sender: None,
            captured_output: false,
        }
    }

    /// Tag every emitted record with a `sender` field so consumers can
    /// tell this reporter's lines apart in a multiplexed stream.
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Enable or disable the `captured_stdout` field on passed and
    /// failed records.
    pub fn with_captured_output(mut self, enabled: bool) -> Self {
        self.captured_output = enabled;
        self
    }

    /// Consume the reporter and hand the sink back
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Report that the suite started with `example_count` examples
    pub fn report_start(&mut self, example_count: usize) -> Result<(), ReportError> {
        self.report(&ResultEvent::Start { example_count })
    }

    /// Report a passed example.
    ///
    /// `captured` is consulted only when captured output is enabled; the
    /// field is then always emitted, with a missing value coerced to the
    /// empty string.
    pub fn report_passed(
        &mut self,
        identity: &TestIdentity,
        captured: Option<String>,
    ) -> Result<(), ReportError> {
        self.report(&ResultEvent::ExamplePassed {
            identity: identity.clone(),
            captured_stdout: self.captured_field(captured),
        })
    }

    /// Report a failed example together with its decomposed failure
    /// message, one line per element
    pub fn report_failed(
        &mut self,
        identity: &TestIdentity,
        captured: Option<String>,
        message_lines: Vec<String>,
    ) -> Result<(), ReportError> {
        self.report(&ResultEvent::ExampleFailed {
            identity: identity.clone(),
            message_lines,
            captured_stdout: self.captured_field(captured),
        })
    }

    /// Report a pending example. Pending bodies never run, so these
    /// records never carry captured output.
    pub fn report_pending(&mut self, identity: &TestIdentity) -> Result<(), ReportError> {
        self.report(&ResultEvent::ExamplePending {
            identity: identity.clone(),
        })
    }

    /// Serialize one event as a single JSON line and append it to the
    /// sink.
    ///
    /// The event is validated first; a malformed event produces no bytes.
    /// The serialized record reaches the sink in one write, so reporting
    /// N events yields exactly N lines in call order.
    pub fn report(&mut self, event: &ResultEvent) -> Result<(), ReportError> {
        event.validate().map_err(ReportError::MalformedEvent)?;

        let mut line = if let Some(sender) = &self.sender {
            // The tag rides along as plain extra data, so the event goes
            // through a Value rather than growing a sender field itself
            let mut record = serde_json::to_value(event)?;
            record["sender"] = json!(sender);
            serde_json::to_string(&record)?
        } else {
            serde_json::to_string(event)?
        };
        line.push('\n');
        self.sink.write_all(line.as_bytes())?;
        self.sink.flush()?;
        Ok(())
    }

    fn captured_field(&self, captured: Option<String>) -> Option<String> {
        if self.captured_output {
            Some(captured.unwrap_or_default())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reporter_defaults() {
        let reporter = JsonlReporter::new(Vec::<u8>::new());
        assert!(reporter.sender.is_none());
        assert!(!reporter.captured_output);
    }

    #[test]
    fn test_captured_field_disabled_drops_value() {
        let reporter = JsonlReporter::new(Vec::<u8>::new());
        assert_eq!(reporter.captured_field(Some("out".to_string())), None);
        assert_eq!(reporter.captured_field(None), None);
    }

    #[test]
    fn test_captured_field_enabled_coerces_missing_value() {
        let reporter = JsonlReporter::new(Vec::<u8>::new()).with_captured_output(true);
        assert_eq!(
            reporter.captured_field(Some("out".to_string())),
            Some("out".to_string())
        );
        assert_eq!(reporter.captured_field(None), Some(String::new()));
    }

    #[test]
    fn test_into_inner_returns_sink() {
        let mut reporter = JsonlReporter::new(Vec::new());
        reporter.report_start(1).unwrap();
        let sink = reporter.into_inner();
        assert!(!sink.is_empty());
        assert_eq!(sink.last(), Some(&b'\n'));
    }
}
