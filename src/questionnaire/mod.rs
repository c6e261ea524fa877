//! Questionnaire Module
//!
//! Questionnaire definitions: type and risk calculation, submission expiry,
//! the approval bypass flag, and the selection/risk weight join table.
//! - `answers`: questions, answer fields and selectable options

mod answers;

pub use answers::{
    AnswerInputField, InputType, MultiChoiceAnswerSelection, Question, SelectionRiskWeight,
};

use crate::config::ExpirySettings;
use crate::errors::ValidationErrors;
use crate::submission::{AnswerScope, RiskLink, SelectedAnswer};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuestionnaireType {
    #[default]
    Questionnaire,
    RiskQuestionnaire,
}

/// Formula used to reduce a risk questionnaire's contributions to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCalculation {
    NztaApproxRepresentation,
    Maximum,
}

impl fmt::Display for RiskCalculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskCalculation::NztaApproxRepresentation => write!(f, "NztaApproxRepresentation"),
            RiskCalculation::Maximum => write!(f, "Maximum"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub questionnaire_type: Option<QuestionnaireType>,
    #[serde(default)]
    pub risk_calculation: Option<RiskCalculation>,
    #[serde(default)]
    pub does_submission_expire: bool,
    #[serde(default)]
    pub expire_after_days: u32,
    #[serde(default)]
    pub approval_is_not_required: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub selection_risks: Vec<SelectionRiskWeight>,
}

impl Questionnaire {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            questionnaire_type: Some(QuestionnaireType::Questionnaire),
            risk_calculation: None,
            does_submission_expire: false,
            expire_after_days: 0,
            approval_is_not_required: false,
            questions: Vec::new(),
            selection_risks: Vec::new(),
        }
    }

    /// Stored type, defaulting to a plain questionnaire.
    pub fn kind(&self) -> QuestionnaireType {
        self.questionnaire_type.unwrap_or_default()
    }

    /// Both the type and the calculation must be set on the record.
    pub fn is_risk_type(&self) -> bool {
        self.kind() == QuestionnaireType::RiskQuestionnaire && self.risk_calculation.is_some()
    }

    /// Days a submission lives for.
    ///
    /// A stored value of zero or below the minimum predates the setting; it is
    /// reset to the default on the record and the default is returned.
    pub fn expire_after_days(&mut self, settings: &ExpirySettings) -> u32 {
        if self.expire_after_days == 0 || self.expire_after_days < settings.min_days {
            log::warn!(
                "Questionnaire {} had ExpireAfterDays {}, resetting to {}",
                self.id,
                self.expire_after_days,
                settings.default_days
            );
            self.expire_after_days = settings.default_days;
        }
        self.expire_after_days
    }

    /// When a submission created at `created_at` expires, if it does.
    pub fn expires_at(
        &mut self,
        created_at: DateTime<Utc>,
        settings: &ExpirySettings,
    ) -> Option<DateTime<Utc>> {
        if !self.does_submission_expire {
            return None;
        }
        let days = self.expire_after_days(settings);
        Some(created_at + Duration::days(i64::from(days)))
    }

    /// Whether a submission with `outstanding_tasks` open tasks still goes to approval.
    pub fn requires_approval(&self, outstanding_tasks: usize) -> bool {
        !(self.approval_is_not_required && outstanding_tasks == 0)
    }

    pub fn fields(&self) -> impl Iterator<Item = &AnswerInputField> {
        self.questions.iter().flat_map(|q| q.answer_fields.iter())
    }

    fn find_selection(&self, id: &str) -> Option<(&AnswerInputField, &MultiChoiceAnswerSelection)> {
        self.fields()
            .find_map(|field| field.selection(id).map(|selection| (field, selection)))
    }

    /// Join rows for a selection, empty unless the questionnaire is a risk type.
    pub fn risks_for(&self, selection: &str) -> Vec<&SelectionRiskWeight> {
        if !self.is_risk_type() {
            return Vec::new();
        }
        self.selection_risks
            .iter()
            .filter(|link| link.selection == selection)
            .collect()
    }

    fn risk_links(&self, selection: &str) -> Vec<RiskLink> {
        self.risks_for(selection)
            .into_iter()
            .map(|link| RiskLink {
                risk: link.risk.clone(),
                weight: serde_json::Value::from(link.weight),
            })
            .collect()
    }

    /// Build a submission answer for a selection of this questionnaire.
    pub fn selected_answer(&self, selection: &str, scope: AnswerScope) -> Option<SelectedAnswer> {
        self.find_selection(selection)?;
        Some(SelectedAnswer {
            selection: selection.to_string(),
            scope,
            risks: self.risk_links(selection),
        })
    }

    /// Replace the risk links on submitted answers with this questionnaire's
    /// join rows. Without join rows the submitted links are kept as-is.
    pub fn resolve_answers(&self, answers: &[SelectedAnswer]) -> Vec<SelectedAnswer> {
        if self.selection_risks.is_empty() {
            return answers.to_vec();
        }
        answers
            .iter()
            .map(|answer| {
                let risks = self.risk_links(&answer.selection);
                if !answer.risks.is_empty() && answer.risks != risks {
                    log::warn!(
                        "Selection {} carries risk links that differ from questionnaire {}; using the questionnaire's",
                        answer.selection,
                        self.id
                    );
                }
                SelectedAnswer {
                    selection: answer.selection.clone(),
                    scope: answer.scope.clone(),
                    risks,
                }
            })
            .collect()
    }

    /// Write-time validation.
    ///
    /// `previous` is the stored version when editing; an unchanged
    /// ExpireAfterDays is left to the self-healing read.
    pub fn validate(
        &self,
        previous: Option<&Questionnaire>,
        settings: &ExpirySettings,
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if self.name.trim().is_empty() {
            errors.add("Name", "Please enter a name.");
        }
        match self.questionnaire_type {
            None => errors.add("Type", "Please select a questionnaire type."),
            Some(QuestionnaireType::RiskQuestionnaire) if self.risk_calculation.is_none() => {
                errors.add(
                    "RiskCalculation",
                    "Please select a risk calculation for a risk questionnaire.",
                )
            }
            Some(_) => {}
        }

        let changed = previous.map_or(true, |p| p.expire_after_days != self.expire_after_days);
        if self.does_submission_expire && changed && self.expire_after_days < settings.min_days {
            errors.add(
                "ExpireAfterDays",
                format!(
                    "Please enter a value of at least {} for Expire After Days.",
                    settings.min_days
                ),
            );
        }

        for field in self.fields() {
            errors.extend(field.validate());
        }
        errors.extend(self.validate_selection_risks());

        errors
    }

    fn validate_selection_risks(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let mut seen = HashSet::new();

        for link in &self.selection_risks {
            match self.find_selection(&link.selection) {
                Some((field, _)) if field.input_type.is_multiple_choice() => {}
                Some(_) => errors.add(
                    "Risks",
                    format!("Option {} is not part of a multiple-choice field.", link.selection),
                ),
                None => errors.add(
                    "Risks",
                    format!("Option {} does not exist on this questionnaire.", link.selection),
                ),
            }
            if !seen.insert((link.selection.as_str(), &link.risk)) {
                errors.add(
                    "Risks",
                    format!(
                        "Risk {} is linked to option {} more than once.",
                        link.risk, link.selection
                    ),
                );
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskId;
    use chrono::TimeZone;

    fn settings() -> ExpirySettings {
        ExpirySettings {
            min_days: 5,
            default_days: 14,
        }
    }

    fn risk_questionnaire() -> Questionnaire {
        let mut q = Questionnaire::new("q1", "Initial risk assessment");
        q.questionnaire_type = Some(QuestionnaireType::RiskQuestionnaire);
        q.risk_calculation = Some(RiskCalculation::Maximum);
        q.questions.push(Question {
            id: "qn1".to_string(),
            title: "Does the system store personal data?".to_string(),
            answer_fields: vec![AnswerInputField {
                id: "f1".to_string(),
                label: "Personal data".to_string(),
                input_type: InputType::MultipleChoiceSingle,
                required: true,
                selections: vec![
                    MultiChoiceAnswerSelection {
                        id: "yes".to_string(),
                        label: "Yes".to_string(),
                        value: "yes".to_string(),
                    },
                    MultiChoiceAnswerSelection {
                        id: "no".to_string(),
                        label: "No".to_string(),
                        value: "no".to_string(),
                    },
                ],
            }],
        });
        q.selection_risks.push(SelectionRiskWeight {
            selection: "yes".to_string(),
            risk: RiskId::from("privacy"),
            weight: 50,
        });
        q
    }

    #[test]
    fn test_is_risk_type_needs_both_fields() {
        let mut q = Questionnaire::new("q", "Q");
        assert!(!q.is_risk_type());

        q.questionnaire_type = None;
        q.risk_calculation = Some(RiskCalculation::Maximum);
        assert_eq!(q.kind(), QuestionnaireType::Questionnaire);
        assert!(!q.is_risk_type());

        q.questionnaire_type = Some(QuestionnaireType::RiskQuestionnaire);
        assert!(q.is_risk_type());

        q.risk_calculation = None;
        assert!(!q.is_risk_type());
    }

    #[test]
    fn test_expire_after_days_self_heals() {
        let mut q = Questionnaire::new("q", "Q");
        q.expire_after_days = 0;
        assert_eq!(q.expire_after_days(&settings()), 14);
        assert_eq!(q.expire_after_days, 14);

        q.expire_after_days = 3;
        assert_eq!(q.expire_after_days(&settings()), 14);

        q.expire_after_days = 20;
        assert_eq!(q.expire_after_days(&settings()), 20);
        assert_eq!(q.expire_after_days, 20);
    }

    #[test]
    fn test_expiry_date() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut q = Questionnaire::new("q", "Q");
        assert!(q.expires_at(created, &settings()).is_none());

        q.does_submission_expire = true;
        q.expire_after_days = 0;
        let expiry = q.expires_at(created, &settings()).unwrap();
        assert_eq!(expiry, Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_approval_bypass_needs_no_outstanding_tasks() {
        let mut q = Questionnaire::new("q", "Q");
        assert!(q.requires_approval(0));
        q.approval_is_not_required = true;
        assert!(!q.requires_approval(0));
        assert!(q.requires_approval(2));
    }

    #[test]
    fn test_validation_reports_missing_fields() {
        let mut q = Questionnaire::new("q", "  ");
        q.questionnaire_type = None;
        let errors = q.validate(None, &settings());
        assert!(errors.has_field("Name"));
        assert!(errors.has_field("Type"));

        q.name = "Named".to_string();
        q.questionnaire_type = Some(QuestionnaireType::RiskQuestionnaire);
        let errors = q.validate(None, &settings());
        assert!(errors.has_field("RiskCalculation"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_expire_transition_checked_only_on_change() {
        let mut q = risk_questionnaire();
        q.does_submission_expire = true;
        q.expire_after_days = 2;
        assert!(q.validate(None, &settings()).has_field("ExpireAfterDays"));

        let stored = q.clone();
        assert!(q.validate(Some(&stored), &settings()).is_empty());

        let mut stored = q.clone();
        stored.expire_after_days = 10;
        assert!(q.validate(Some(&stored), &settings()).has_field("ExpireAfterDays"));

        q.expire_after_days = 5;
        assert!(q.validate(Some(&stored), &settings()).is_empty());
    }

    #[test]
    fn test_selection_risk_links_are_checked() {
        let mut q = risk_questionnaire();
        assert!(q.validate(None, &settings()).is_empty());

        q.selection_risks.push(SelectionRiskWeight {
            selection: "yes".to_string(),
            risk: RiskId::from("privacy"),
            weight: 10,
        });
        q.selection_risks.push(SelectionRiskWeight {
            selection: "maybe".to_string(),
            risk: RiskId::from("privacy"),
            weight: 10,
        });
        let errors = q.validate(None, &settings());
        assert_eq!(errors.len(), 2);
        assert!(errors.has_field("Risks"));
    }

    #[test]
    fn test_selected_answer_carries_join_rows() {
        let q = risk_questionnaire();
        let answer = q.selected_answer("yes", AnswerScope::default()).unwrap();
        assert_eq!(answer.risks.len(), 1);
        assert_eq!(answer.risks[0].weight, serde_json::json!(50));

        let answer = q.selected_answer("no", AnswerScope::default()).unwrap();
        assert!(answer.risks.is_empty());
        assert!(q.selected_answer("unknown", AnswerScope::default()).is_none());
    }

    #[test]
    fn test_join_rows_override_submitted_links() {
        let q = risk_questionnaire();
        let submitted = vec![
            SelectedAnswer {
                selection: "yes".to_string(),
                scope: AnswerScope::task("t1"),
                risks: vec![RiskLink {
                    risk: RiskId::from("outage"),
                    weight: serde_json::json!(999),
                }],
            },
            SelectedAnswer {
                selection: "no".to_string(),
                scope: AnswerScope::default(),
                risks: vec![RiskLink {
                    risk: RiskId::from("privacy"),
                    weight: serde_json::json!(10),
                }],
            },
        ];

        let resolved = q.resolve_answers(&submitted);
        assert_eq!(resolved[0].scope, AnswerScope::task("t1"));
        assert_eq!(resolved[0].risks.len(), 1);
        assert_eq!(resolved[0].risks[0].risk, RiskId::from("privacy"));
        assert_eq!(resolved[0].risks[0].weight, serde_json::json!(50));
        assert!(resolved[1].risks.is_empty());
    }

    #[test]
    fn test_submitted_links_kept_without_join_rows() {
        let mut q = risk_questionnaire();
        q.selection_risks.clear();
        let submitted = vec![SelectedAnswer {
            selection: "yes".to_string(),
            scope: AnswerScope::default(),
            risks: vec![RiskLink {
                risk: RiskId::from("outage"),
                weight: serde_json::json!("20"),
            }],
        }];
        assert_eq!(q.resolve_answers(&submitted), submitted);
    }

    #[test]
    fn test_plain_questionnaire_selections_are_not_risk_relevant() {
        let mut q = risk_questionnaire();
        q.questionnaire_type = Some(QuestionnaireType::Questionnaire);
        assert!(q.risks_for("yes").is_empty());
    }
}
