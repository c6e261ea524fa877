//! Scoring Module - Risk score computation
//!
//! Split into submodules:
//! - `contribution`: answers to per-risk weight contributions
//! - `formula`: Maximum and NZTA approximation formulas
//! - `aggregate`: per-scope reduction against the weight matrix

mod aggregate;
mod contribution;
mod formula;

pub use aggregate::{
    score_scope, PairContribution, RiskSubtotal, ScopeInputs, ScopeKind, ScopeRef, ScopeScore,
};
pub use contribution::{parse_weight, resolve_contributions, RiskContribution};
pub use formula::{formula_for, Maximum, NztaApprox, RiskFormula};

use crate::audit::AuditContext;
use crate::config::Settings;
use crate::errors::{ScoringError, SdltError, SdltResult};
use crate::matrix::{short_fingerprint, WeightMatrix};
use crate::models::{Catalog, ComponentId, ControlId};
use crate::questionnaire::RiskCalculation;
use crate::submission::Submission;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// Scores for one submission across all its scopes.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionScore {
    pub submission: String,
    pub questionnaire: String,
    pub questionnaire_name: String,
    pub risk_relevant: bool,
    pub calculation: Option<RiskCalculation>,
    pub matrix_fingerprint: String,
    pub scored_by: String,
    pub scored_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub requires_approval: bool,
    pub scopes: Vec<ScopeScore>,
}

impl SubmissionScore {
    /// The questionnaire-wide scope, present for risk questionnaires.
    pub fn questionnaire_score(&self) -> Option<&ScopeScore> {
        self.scopes
            .iter()
            .find(|s| s.scope.kind == ScopeKind::Questionnaire)
    }

    pub fn scopes_of(&self, kind: ScopeKind) -> impl Iterator<Item = &ScopeScore> {
        self.scopes.iter().filter(move |s| s.scope.kind == kind)
    }
}

/// Outcome of one submission in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub submission: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Scored { score: SubmissionScore },
    Failed { error: String },
}

impl BatchEntry {
    pub fn score(&self) -> Option<&SubmissionScore> {
        match &self.outcome {
            BatchOutcome::Scored { score } => Some(score),
            BatchOutcome::Failed { .. } => None,
        }
    }
}

/// Scores submissions against a catalog and weight matrix held for the pass.
pub struct RiskScoreEngine {
    catalog: Catalog,
    matrix: WeightMatrix,
    settings: Settings,
    fingerprint: String,
}

impl RiskScoreEngine {
    pub fn new(catalog: Catalog, matrix: WeightMatrix, settings: Settings) -> Self {
        let fingerprint = matrix.fingerprint();
        log::info!(
            "Risk engine ready: {} weight rows, matrix {}",
            matrix.len(),
            short_fingerprint(&fingerprint)
        );
        Self {
            catalog,
            matrix,
            settings,
            fingerprint,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn matrix(&self) -> &WeightMatrix {
        &self.matrix
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// (component, control) pairs for the components selected on a submission.
    fn selected_controls(&self, submission: &Submission) -> Vec<(ComponentId, ControlId)> {
        let mut seen = BTreeSet::new();
        let mut controls = Vec::new();
        for component in &submission.components {
            if !seen.insert(component) {
                continue;
            }
            if self.catalog.component(component).is_none() {
                log::debug!("Submission {} selects unknown component {}", submission.id, component);
            }
            for control in self.catalog.controls_of(component) {
                controls.push((component.clone(), control));
            }
        }
        controls
    }

    /// Score one submission. Missing data scores zero; malformed input fails.
    pub fn score_submission(
        &self,
        submission: &Submission,
        ctx: &AuditContext,
    ) -> Result<SubmissionScore, ScoringError> {
        let questionnaire = &submission.questionnaire;
        let mut healed = submission.questionnaire.clone();
        let expires_at = healed.expires_at(submission.created_at, &self.settings.expiry);

        let mut score = SubmissionScore {
            submission: submission.id.clone(),
            questionnaire: questionnaire.id.clone(),
            questionnaire_name: questionnaire.name.clone(),
            risk_relevant: questionnaire.is_risk_type(),
            calculation: questionnaire.risk_calculation,
            matrix_fingerprint: self.fingerprint.clone(),
            scored_by: ctx.actor.clone(),
            scored_at: Utc::now(),
            expires_at,
            requires_approval: submission.requires_approval(),
            scopes: Vec::new(),
        };

        let calculation = match questionnaire.risk_calculation {
            Some(calculation) if questionnaire.is_risk_type() => calculation,
            _ => {
                log::debug!(
                    "Submission {} answers a non-risk questionnaire, nothing to score",
                    submission.id
                );
                return Ok(score);
            }
        };

        let answers = questionnaire.resolve_answers(&submission.answers);
        let contributions = resolve_contributions(&answers)?;
        let formula = formula_for(calculation, &self.settings.nzta);
        let controls = self.selected_controls(submission);
        let inputs = ScopeInputs {
            catalog: &self.catalog,
            matrix: &self.matrix,
            settings: &self.settings,
            formula: formula.as_ref(),
            controls: &controls,
        };

        let all: Vec<&RiskContribution> = contributions.iter().collect();
        score.scopes.push(score_scope(
            ScopeRef {
                kind: ScopeKind::Questionnaire,
                id: questionnaire.id.clone(),
            },
            &all,
            &inputs,
        )?);

        let tasks: BTreeSet<&str> = contributions
            .iter()
            .filter_map(|c| c.scope.task.as_deref())
            .collect();
        for task in tasks {
            let within: Vec<&RiskContribution> = contributions
                .iter()
                .filter(|c| c.scope.task.as_deref() == Some(task))
                .collect();
            let scope = ScopeRef {
                kind: ScopeKind::Task,
                id: task.to_string(),
            };
            score.scopes.push(score_scope(scope, &within, &inputs)?);
        }

        let pillars: BTreeSet<&str> = contributions
            .iter()
            .filter_map(|c| c.scope.pillar.as_deref())
            .collect();
        for pillar in pillars {
            let within: Vec<&RiskContribution> = contributions
                .iter()
                .filter(|c| c.scope.pillar.as_deref() == Some(pillar))
                .collect();
            let scope = ScopeRef {
                kind: ScopeKind::Pillar,
                id: pillar.to_string(),
            };
            score.scopes.push(score_scope(scope, &within, &inputs)?);
        }

        log::info!(
            "{} scored submission {} with {}: {:.2}",
            ctx.actor,
            submission.id,
            formula.name(),
            score.questionnaire_score().map_or(0.0, |s| s.score)
        );
        Ok(score)
    }

    /// Score independent submissions in parallel. Output keeps input order and a
    /// failure only affects its own entry.
    pub fn score_batch<F>(
        &self,
        submissions: &[Submission],
        ctx: &AuditContext,
        on_done: F,
    ) -> SdltResult<Vec<BatchEntry>>
    where
        F: Fn(&BatchEntry) + Sync,
    {
        let thread_count = self.settings.thread_count();
        log::info!(
            "Scoring {} submissions with {} threads",
            submissions.len(),
            thread_count
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build()
            .map_err(|e| SdltError::ThreadPool(e.to_string()))?;

        let entries: Vec<BatchEntry> = pool.install(|| {
            submissions
                .par_iter()
                .map(|submission| {
                    let outcome = match self.score_submission(submission, ctx) {
                        Ok(score) => BatchOutcome::Scored { score },
                        Err(e) => {
                            log::warn!("Submission {} not scored: {}", submission.id, e);
                            BatchOutcome::Failed {
                                error: SdltError::scoring(submission.id.clone(), e).to_string(),
                            }
                        }
                    };
                    let entry = BatchEntry {
                        submission: submission.id.clone(),
                        outcome,
                    };
                    on_done(&entry);
                    entry
                })
                .collect()
        });
        Ok(entries)
    }
}
