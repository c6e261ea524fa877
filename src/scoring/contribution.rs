//! Turns submitted answers into per-risk weight contributions.

use crate::errors::ScoringError;
use crate::models::RiskId;
use crate::submission::{AnswerScope, RiskLink, SelectedAnswer};
use serde_json::Value;
use std::num::IntErrorKind;

/// Raw contribution of one selection under one risk.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskContribution {
    pub selection: String,
    pub risk: RiskId,
    pub weight: i64,
    pub scope: AnswerScope,
}

/// Parse a weight that must be an integer, given as a number or a string.
/// Integers beyond `i64` are reported as out of range rather than malformed.
pub fn parse_weight(selection: &str, link: &RiskLink) -> Result<i64, ScoringError> {
    let malformed = || ScoringError::MalformedWeight {
        selection: selection.to_string(),
        risk: link.risk.clone(),
        raw: link.weight.to_string(),
    };
    let out_of_range = || ScoringError::WeightOutOfRange {
        selection: selection.to_string(),
        risk: link.risk.clone(),
        raw: link.weight.to_string(),
    };

    match &link.weight {
        Value::Number(n) => match n.as_i64() {
            Some(weight) => Ok(weight),
            None if n.is_u64() => Err(out_of_range()),
            None => Err(malformed()),
        },
        Value::String(s) => s.trim().parse::<i64>().map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => out_of_range(),
            _ => malformed(),
        }),
        _ => Err(malformed()),
    }
}

/// One contribution per (selection, risk) link. Selections with no risks add nothing.
pub fn resolve_contributions(
    answers: &[SelectedAnswer],
) -> Result<Vec<RiskContribution>, ScoringError> {
    let mut contributions = Vec::new();
    for answer in answers {
        if answer.risks.is_empty() {
            log::trace!("Selection {} carries no risks", answer.selection);
            continue;
        }
        for link in &answer.risks {
            contributions.push(RiskContribution {
                selection: answer.selection.clone(),
                risk: link.risk.clone(),
                weight: parse_weight(&answer.selection, link)?,
                scope: answer.scope.clone(),
            });
        }
    }
    Ok(contributions)
}
