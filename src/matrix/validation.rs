//! Write-time range checks for weight rows.

use super::ControlWeightSet;
use crate::errors::ValidationErrors;

pub const LIKELIHOOD_RANGE: (i32, i32) = (0, 10);
pub const IMPACT_RANGE: (i32, i32) = (0, 10);
pub const PENALTY_RANGE: (i32, i32) = (0, 100);

fn check_range(errors: &mut ValidationErrors, field: &str, value: i32, (min, max): (i32, i32)) {
    if value < min || value > max {
        errors.add(
            field,
            format!("Please enter a value between {min} and {max} for {field}."),
        );
    }
}

/// Range and required-relation checks that need nothing but the row itself.
pub fn validate_fields(row: &ControlWeightSet) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    check_range(&mut errors, "Likelihood", row.likelihood, LIKELIHOOD_RANGE);
    check_range(&mut errors, "Impact", row.impact, IMPACT_RANGE);
    check_range(
        &mut errors,
        "LikelihoodPenalty",
        row.likelihood_penalty,
        PENALTY_RANGE,
    );
    check_range(&mut errors, "ImpactPenalty", row.impact_penalty, PENALTY_RANGE);

    if row.risk.is_none() {
        errors.add("Risk", "Please select a risk.");
    }
    if row.control.is_none() {
        errors.add("SecurityControl", "Please select a security control.");
    }

    errors
}
