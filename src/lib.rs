//! SDLT Risk Score Engine
//!
//! Scores security-development-lifecycle questionnaire submissions against a
//! weight matrix of per-control, per-risk likelihood and impact values.

pub mod audit;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod matrix;
pub mod models;
pub mod questionnaire;
pub mod reporter;
pub mod scoring;
pub mod submission;
pub mod ui;

pub use audit::AuditContext;
pub use errors::{ScoringError, SdltError, SdltResult, ValidationErrors};
pub use scoring::RiskScoreEngine;
