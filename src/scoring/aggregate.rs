//! Reduction of a scope's contributions against the weight matrix.

use super::contribution::RiskContribution;
use super::formula::RiskFormula;
use crate::config::Settings;
use crate::errors::ScoringError;
use crate::matrix::{WeightKey, WeightMatrix};
use crate::models::{Catalog, ComponentId, ControlId, RiskId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ScopeKind {
    Questionnaire,
    Task,
    Pillar,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Questionnaire => write!(f, "Questionnaire"),
            ScopeKind::Task => write!(f, "Task"),
            ScopeKind::Pillar => write!(f, "Pillar"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeRef {
    pub kind: ScopeKind,
    pub id: String,
}

/// One selection's weight meeting a (component, control, risk) row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairContribution {
    pub selection: String,
    pub component: ComponentId,
    pub control: ControlId,
    pub risk: RiskId,
    pub weight: i64,
    pub likelihood: i32,
    pub impact: i32,
    pub likelihood_penalty: i32,
    pub impact_penalty: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSubtotal {
    pub risk: RiskId,
    pub name: Option<String>,
    /// Total of the selection weights under this risk
    pub weight: i64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeScore {
    pub scope: ScopeRef,
    pub score: f64,
    pub rating: Option<String>,
    /// Pair with the largest value
    pub dominant: Option<PairContribution>,
    pub risks: Vec<RiskSubtotal>,
    pub pairs: Vec<PairContribution>,
    /// Pairs with no weight row, counted as zero
    pub unweighted_pairs: usize,
}

/// Everything a scope reduction reads.
pub struct ScopeInputs<'a> {
    pub catalog: &'a Catalog,
    pub matrix: &'a WeightMatrix,
    pub settings: &'a Settings,
    pub formula: &'a dyn RiskFormula,
    /// Controls of the submission's selected components
    pub controls: &'a [(ComponentId, ControlId)],
}

/// Total weight of the selections under one risk.
fn total_weight(risk: &RiskId, selections: &[&RiskContribution]) -> Result<i64, ScoringError> {
    selections.iter().try_fold(0i64, |total, contribution| {
        total
            .checked_add(contribution.weight)
            .ok_or_else(|| ScoringError::WeightOverflow { risk: risk.clone() })
    })
}

/// Score one scope from the contributions that fall inside it.
///
/// Every selection meets the matrix on its own, so Maximum picks the single
/// worst (selection, control, risk) finding.
pub fn score_scope(
    scope: ScopeRef,
    contributions: &[&RiskContribution],
    inputs: &ScopeInputs<'_>,
) -> Result<ScopeScore, ScoringError> {
    let mut by_risk: BTreeMap<&RiskId, Vec<&RiskContribution>> = BTreeMap::new();
    for &contribution in contributions {
        by_risk.entry(&contribution.risk).or_default().push(contribution);
    }

    let mut pairs = Vec::new();
    let mut risks = Vec::new();
    let mut unweighted_pairs = 0;

    for (risk, selections) in by_risk {
        let weight = total_weight(risk, &selections)?;
        let mut values = Vec::new();
        for (component, control) in inputs.controls {
            let key = WeightKey {
                control: control.clone(),
                risk: risk.clone(),
                component: component.clone(),
            };
            let row = inputs.matrix.lookup(&key)?;

            for contribution in &selections {
                let value = inputs.formula.contribution(contribution.weight, row);
                values.push(value);

                match row {
                    Some(row) => pairs.push(PairContribution {
                        selection: contribution.selection.clone(),
                        component: key.component.clone(),
                        control: key.control.clone(),
                        risk: key.risk.clone(),
                        weight: contribution.weight,
                        likelihood: row.likelihood,
                        impact: row.impact,
                        likelihood_penalty: row.likelihood_penalty,
                        impact_penalty: row.impact_penalty,
                        value,
                    }),
                    None => unweighted_pairs += 1,
                }
            }
        }

        risks.push(RiskSubtotal {
            risk: risk.clone(),
            name: inputs.catalog.risk(risk).map(|r| r.name.clone()),
            weight,
            score: inputs.formula.reduce(&values),
        });
    }

    let values: Vec<f64> = pairs.iter().map(|p| p.value).collect();
    let score = inputs.formula.reduce(&values);
    let dominant = pairs
        .iter()
        .filter(|p| p.value > 0.0)
        .max_by(|a, b| a.value.total_cmp(&b.value))
        .cloned();
    let rating = inputs.settings.rating_for(score).map(|band| band.name.clone());

    log::debug!(
        "{} {} scored {:.2} from {} weighted pairs",
        scope.kind,
        scope.id,
        score,
        pairs.len()
    );

    Ok(ScopeScore {
        scope,
        score,
        rating,
        dominant,
        risks,
        pairs,
        unweighted_pairs,
    })
}
