// Test lifecycle event model

use serde::{Deserialize, Serialize};

/// Identity of one example within its spec file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestIdentity {
    /// Absolute path of the file defining the example
    pub absolute_filepath: String,
    /// Shortened path for display, usually relative to the suite root
    pub small_filepath: String,
    /// 1-based line where the example is defined
    pub line_number: u32,
}

impl TestIdentity {
    /// Create an example identity
    pub fn new(
        absolute_filepath: impl Into<String>,
        small_filepath: impl Into<String>,
        line_number: u32,
    ) -> Self {
        Self {
            absolute_filepath: absolute_filepath.into(),
            small_filepath: small_filepath.into(),
            line_number,
        }
    }
}

/// One lifecycle transition, tagged on the wire as `type`.
///
/// Each value is constructed for a single transition and serialized
/// exactly once. Missing optional fields are omitted from the wire
/// rather than written as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultEvent {
    /// Suite started; carries the number of examples the engine discovered
    Start { example_count: usize },
    /// Example body ran to completion without failing
    ExamplePassed {
        #[serde(flatten)]
        identity: TestIdentity,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        captured_stdout: Option<String>,
    },
    /// Example body failed; message lines keep the engine's order
    ExampleFailed {
        #[serde(flatten)]
        identity: TestIdentity,
        message_lines: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        captured_stdout: Option<String>,
    },
    /// Example was declared but its body never ran
    ExamplePending {
        #[serde(flatten)]
        identity: TestIdentity,
    },
}

impl ResultEvent {
    /// Check the per-variant invariants before the record is emitted.
    ///
    /// A failure with zero message lines or an identity with line number 0
    /// is a bug in the integration layer; rejecting it here keeps partial
    /// records off the wire.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ResultEvent::Start { .. } => Ok(()),
            ResultEvent::ExamplePassed { identity, .. }
            | ResultEvent::ExamplePending { identity } => validate_identity(identity),
            ResultEvent::ExampleFailed {
                identity,
                message_lines,
                ..
            } => {
                validate_identity(identity)?;
                if message_lines.is_empty() {
                    return Err(format!(
                        "failed example {} has no message lines",
                        identity.small_filepath
                    ));
                }
                Ok(())
            }
        }
    }
}

fn validate_identity(identity: &TestIdentity) -> Result<(), String> {
    if identity.line_number == 0 {
        return Err(format!(
            "line_number must be 1-based, got 0 for {}",
            identity.small_filepath
        ));
    }
    Ok(())
}

/// Outcome of one executed example body, as seen by the driving engine.
///
/// Pending examples never execute, so pending has no outcome and is
/// reported directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExampleOutcome {
    Passed,
    Failed { message_lines: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity() -> TestIdentity {
        TestIdentity::new("/a/s.rb", "s.rb", 4)
    }

    #[test]
    fn test_identity_new() {
        let id = identity();
        assert_eq!(id.absolute_filepath, "/a/s.rb");
        assert_eq!(id.small_filepath, "s.rb");
        assert_eq!(id.line_number, 4);
    }

    #[test]
    fn test_start_serializes_with_type_tag() {
        let event = ResultEvent::Start { example_count: 2 };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"type": "start", "example_count": 2}));
    }

    #[test]
    fn test_passed_flattens_identity_fields() {
        let event = ResultEvent::ExamplePassed {
            identity: identity(),
            captured_stdout: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "example_passed",
                "absolute_filepath": "/a/s.rb",
                "small_filepath": "s.rb",
                "line_number": 4
            })
        );
    }

    #[test]
    fn test_absent_captured_stdout_is_omitted() {
        let event = ResultEvent::ExamplePassed {
            identity: identity(),
            captured_stdout: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("captured_stdout").is_none());
    }

    #[test]
    fn test_present_captured_stdout_is_kept_verbatim() {
        let event = ResultEvent::ExampleFailed {
            identity: identity(),
            message_lines: vec!["expected 1".to_string(), "got 2".to_string()],
            captured_stdout: Some("line one\nline two\n".to_string()),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["captured_stdout"], json!("line one\nline two\n"));
        assert_eq!(value["message_lines"], json!(["expected 1", "got 2"]));
    }

    #[test]
    fn test_pending_serializes_identity_only() {
        let event = ResultEvent::ExamplePending {
            identity: identity(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "example_pending",
                "absolute_filepath": "/a/s.rb",
                "small_filepath": "s.rb",
                "line_number": 4
            })
        );
    }

    #[test]
    fn test_deserialize_ignores_unknown_fields() {
        let line = r#"{"type":"start","example_count":3,"sender":"demo"}"#;
        let event: ResultEvent = serde_json::from_str(line).unwrap();
        assert_eq!(event, ResultEvent::Start { example_count: 3 });
    }

    #[test]
    fn test_round_trip_failed_event() {
        let event = ResultEvent::ExampleFailed {
            identity: identity(),
            message_lines: vec!["boom".to_string()],
            captured_stdout: Some(String::new()),
        };
        let line = serde_json::to_string(&event).unwrap();
        let back: ResultEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_validate_accepts_well_formed_events() {
        assert!(ResultEvent::Start { example_count: 0 }.validate().is_ok());
        assert!(
            ResultEvent::ExampleFailed {
                identity: identity(),
                message_lines: vec!["expected 1".to_string()],
                captured_stdout: None,
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn test_validate_rejects_empty_message_lines() {
        let event = ResultEvent::ExampleFailed {
            identity: identity(),
            message_lines: Vec::new(),
            captured_stdout: None,
        };
        let err = event.validate().unwrap_err();
        assert!(err.contains("no message lines"));
    }

    #[test]
    fn test_validate_rejects_zero_line_number() {
        let event = ResultEvent::ExamplePending {
            identity: TestIdentity::new("/a/s.rb", "s.rb", 0),
        };
        let err = event.validate().unwrap_err();
        assert!(err.contains("1-based"));
    }

    #[test]
    fn test_example_outcome_equality() {
        assert_eq!(ExampleOutcome::Passed, ExampleOutcome::Passed);
        assert_ne!(
            ExampleOutcome::Passed,
            ExampleOutcome::Failed {
                message_lines: vec!["boom".to_string()],
            }
        );
    }
}
