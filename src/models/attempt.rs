use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attempt_status", rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
}

impl AttemptStatus {
    /// in_progress -> submitted, one way. An attempt that is never submitted
    /// simply stays open; there is no timeout-driven auto-submit.
    pub fn can_transition_to(self, next: AttemptStatus) -> bool {
        matches!(
            (self, next),
            (AttemptStatus::InProgress, AttemptStatus::Submitted)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Submitted => "submitted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamAttempt {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub student_id: Uuid,
    pub status: AttemptStatus,
    /// Map of question id to the submitted free-form value.
    pub answers: JsonValue,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExamAttempt {
    /// Lenient view of the stored answers. Keys that are not question ids
    /// and values that are not strings are dropped rather than rejected;
    /// the grader scores whatever is missing as incorrect.
    pub fn answers_map(&self) -> HashMap<Uuid, String> {
        let mut map = HashMap::new();
        if let Some(obj) = self.answers.as_object() {
            for (key, value) in obj {
                let (Ok(question_id), Some(answer)) = (key.parse::<Uuid>(), value.as_str())
                else {
                    continue;
                };
                map.insert(question_id, answer.to_string());
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submit_is_the_only_transition() {
        assert!(AttemptStatus::InProgress.can_transition_to(AttemptStatus::Submitted));
        assert!(!AttemptStatus::Submitted.can_transition_to(AttemptStatus::InProgress));
        assert!(!AttemptStatus::Submitted.can_transition_to(AttemptStatus::Submitted));
    }

    #[test]
    fn answers_map_drops_malformed_entries() {
        let q1 = Uuid::new_v4();
        let attempt = ExamAttempt {
            id: Uuid::new_v4(),
            exam_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            status: AttemptStatus::InProgress,
            answers: json!({
                q1.to_string(): "B",
                "not-a-uuid": "ignored",
                Uuid::new_v4().to_string(): 42,
            }),
            started_at: Utc::now(),
            submitted_at: None,
            updated_at: None,
        };

        let map = attempt.answers_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&q1).map(String::as_str), Some("B"));
    }
}
