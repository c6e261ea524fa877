use crate::config::ExpirySettings;
use crate::errors::{SdltError, SdltResult};
use crate::models::{ComponentId, RiskId};
use crate::questionnaire::Questionnaire;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A user's answers to one questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub questionnaire: Questionnaire,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Security components selected for the delivery
    #[serde(default)]
    pub components: Vec<ComponentId>,
    #[serde(default)]
    pub answers: Vec<SelectedAnswer>,
    /// Tasks not yet completed for this submission
    #[serde(default)]
    pub outstanding_tasks: usize,
}

/// Where an answer sits below the questionnaire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pillar: Option<String>,
}

impl AnswerScope {
    pub fn task(task: impl Into<String>) -> Self {
        Self {
            task: Some(task.into()),
            pillar: None,
        }
    }

    pub fn pillar(pillar: impl Into<String>) -> Self {
        Self {
            task: None,
            pillar: Some(pillar.into()),
        }
    }
}

/// One chosen multiple-choice option and the risks it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedAnswer {
    pub selection: String,
    #[serde(flatten)]
    pub scope: AnswerScope,
    #[serde(default)]
    pub risks: Vec<RiskLink>,
}

/// Weight as received; parsed to an integer when scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLink {
    pub risk: RiskId,
    pub weight: serde_json::Value,
}

impl Submission {
    pub fn load<P: AsRef<Path>>(path: P) -> SdltResult<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| SdltError::io(e, path.to_path_buf()))?;
        serde_json::from_str(&contents).map_err(|e| SdltError::json(e, path.to_path_buf()))
    }

    /// Expiry date, resetting a stale ExpireAfterDays on the questionnaire.
    pub fn expires_at(&mut self, settings: &ExpirySettings) -> Option<DateTime<Utc>> {
        let created_at = self.created_at;
        self.questionnaire.expires_at(created_at, settings)
    }

    pub fn is_expired(&mut self, now: DateTime<Utc>, settings: &ExpirySettings) -> bool {
        self.expires_at(settings).map_or(false, |expiry| now >= expiry)
    }

    pub fn requires_approval(&self) -> bool {
        self.questionnaire.requires_approval(self.outstanding_tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "id": "sub-1",
            "created_at": "2024-05-01T00:00:00Z",
            "questionnaire": {
                "id": "q1",
                "name": "Initial risk assessment",
                "type": "RiskQuestionnaire",
                "risk_calculation": "Maximum",
                "does_submission_expire": true,
                "expire_after_days": 0
            },
            "components": ["web"],
            "answers": [
                { "selection": "yes", "task": "t1", "risks": [{ "risk": "R1", "weight": 40 }] },
                { "selection": "cloud", "pillar": "p1", "risks": [{ "risk": "R2", "weight": "65" }] }
            ]
        })
    }

    #[test]
    fn test_parses_scopes_and_raw_weights() {
        let submission: Submission = serde_json::from_value(sample()).unwrap();
        assert_eq!(submission.answers[0].scope, AnswerScope::task("t1"));
        assert_eq!(submission.answers[1].scope, AnswerScope::pillar("p1"));
        assert_eq!(submission.answers[1].risks[0].weight, json!("65"));
        assert!(submission.questionnaire.is_risk_type());
    }

    #[test]
    fn test_expiry_uses_healed_default() {
        let mut submission: Submission = serde_json::from_value(sample()).unwrap();
        let settings = ExpirySettings::default();

        let before = Utc.with_ymd_and_hms(2024, 5, 14, 23, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap();
        assert!(!submission.is_expired(before, &settings));
        assert!(submission.is_expired(after, &settings));
        assert_eq!(submission.questionnaire.expire_after_days, 14);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub.json");
        std::fs::write(&path, sample().to_string()).unwrap();
        let submission = Submission::load(&path).unwrap();
        assert_eq!(submission.id, "sub-1");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Submission::load(&path), Err(SdltError::Json { .. })));
    }
}
