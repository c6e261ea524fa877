//! Custom error types for the SDLT risk engine.
//!
//! Two families of failure exist: data-entry validation errors, which are
//! collected as a list of messages against the offending record, and scoring
//! input errors, which fail the scoring pass for a single submission.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::models::{ComponentId, ControlId, RiskId};

/// The main error type for SDLT operations.
#[derive(Debug, thiserror::Error)]
pub enum SdltError {
    /// I/O error (file read/write, permissions, etc.)
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error in {path:?}: {source}")]
    Json {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },

    /// TOML settings could not be parsed
    #[error("Invalid settings file {path:?}: {source}")]
    TomlDe {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// TOML settings could not be written
    #[error("Failed to serialize settings: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Settings loaded but inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A record was rejected by write-time validation
    #[error("{record} rejected: {errors}")]
    Validation {
        record: String,
        errors: ValidationErrors,
    },

    /// A submission could not be scored
    #[error("Scoring failed for submission '{submission}': {source}")]
    Scoring {
        submission: String,
        #[source]
        source: ScoringError,
    },

    /// Thread pool initialization error
    #[error("Failed to initialize thread pool: {0}")]
    ThreadPool(String),

    /// Progress bar template error
    #[error("UI error: {0}")]
    Ui(String),
}

/// Result type alias using SdltError
pub type SdltResult<T> = Result<T, SdltError>;

impl SdltError {
    /// Create an I/O error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a JSON error with path context
    pub fn json(source: serde_json::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Wrap validation errors for the named record
    pub fn validation(record: impl Into<String>, errors: ValidationErrors) -> Self {
        Self::Validation {
            record: record.into(),
            errors,
        }
    }

    /// Wrap a scoring error for the named submission
    pub fn scoring(submission: impl Into<String>, source: ScoringError) -> Self {
        Self::Scoring {
            submission: submission.into(),
            source,
        }
    }
}

/// Convert from raw I/O errors (without path context)
impl From<std::io::Error> for SdltError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}

/// One human-readable message attached to a field of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All validation messages raised against a single record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// True if any message was raised against `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    /// `Ok(())` when empty, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", joined.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Input errors that abort scoring of one submission.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    /// A weight on a selection/risk link is not a valid integer
    #[error("Weight '{raw}' for risk {risk} on selection {selection} is not a valid integer")]
    MalformedWeight {
        selection: String,
        risk: RiskId,
        raw: String,
    },

    /// A weight is an integer outside the signed 64-bit range
    #[error("Weight {raw} for risk {risk} on selection {selection} is out of range")]
    WeightOutOfRange {
        selection: String,
        risk: RiskId,
        raw: String,
    },

    /// Selection weights under one risk add up past the integer range
    #[error("Selection weights for risk {risk} overflow")]
    WeightOverflow { risk: RiskId },

    /// More than one weight row matches the same triple
    #[error("{count} weight rows match control {control}, risk {risk}, component {component}")]
    AmbiguousWeighting {
        control: ControlId,
        risk: RiskId,
        component: ComponentId,
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = SdltError::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            Some(PathBuf::from("/test/dataset.json")),
        );
        assert!(err.to_string().contains("/test/dataset.json"));
    }

    #[test]
    fn test_validation_errors_collect_messages() {
        let mut errors = ValidationErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.add("Likelihood", "Please enter a value between 0 and 10 for Likelihood.");
        errors.add("Risk", "Please select a risk.");
        assert_eq!(errors.len(), 2);
        assert!(errors.has_field("Risk"));
        assert!(!errors.has_field("Impact"));

        let err = SdltError::validation("ControlWeightSet", errors);
        let text = err.to_string();
        assert!(text.contains("ControlWeightSet rejected"));
        assert!(text.contains("Likelihood: Please enter a value between 0 and 10"));
    }

    #[test]
    fn test_scoring_error_names_submission() {
        let err = SdltError::scoring(
            "sub-7",
            ScoringError::MalformedWeight {
                selection: "sel-1".to_string(),
                risk: RiskId::from("R1"),
                raw: "\"lots\"".to_string(),
            },
        );
        let text = err.to_string();
        assert!(text.contains("sub-7"));
        assert!(matches!(err, SdltError::Scoring { .. }));
    }
}
