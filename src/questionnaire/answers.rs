//! Questions, answer fields and their selectable options.

use crate::errors::ValidationErrors;
use crate::models::RiskId;
use serde::{Deserialize, Serialize};

/// How an answer field is rendered and answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputType {
    #[default]
    Text,
    Email,
    Textarea,
    RichText,
    Date,
    Url,
    /// Radio buttons
    MultipleChoiceSingle,
    /// Checkboxes
    MultipleChoiceMultiple,
}

impl InputType {
    pub fn is_multiple_choice(self) -> bool {
        matches!(
            self,
            InputType::MultipleChoiceSingle | InputType::MultipleChoiceMultiple
        )
    }
}

/// One selectable option of a multiple-choice field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiChoiceAnswerSelection {
    pub id: String,
    pub label: String,
    pub value: String,
}

/// Join row: selecting `selection` contributes `weight` under `risk`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRiskWeight {
    pub selection: String,
    pub risk: RiskId,
    pub weight: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerInputField {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub input_type: InputType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub selections: Vec<MultiChoiceAnswerSelection>,
}

impl AnswerInputField {
    /// Check one selection against its siblings, excluding itself.
    pub fn validate_selection(&self, selection: &MultiChoiceAnswerSelection) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if !self.input_type.is_multiple_choice() {
            return errors;
        }

        let duplicate = self
            .selections
            .iter()
            .any(|other| other.id != selection.id && other.value == selection.value);
        if duplicate {
            errors.add(
                "Value",
                format!(
                    "Value '{}' is already used by another option of '{}'.",
                    selection.value, self.label
                ),
            );
        }
        errors
    }

    /// Sibling uniqueness for every selection of the field.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (index, selection) in self.selections.iter().enumerate() {
            // Report each clashing value once, at its first occurrence.
            let first = self
                .selections
                .iter()
                .position(|s| s.value == selection.value);
            if first == Some(index) {
                errors.extend(self.validate_selection(selection));
            }
        }
        errors
    }

    pub fn selection(&self, id: &str) -> Option<&MultiChoiceAnswerSelection> {
        self.selections.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub answer_fields: Vec<AnswerInputField>,
}
