use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    Essay,
}

impl QuestionType {
    /// Essay questions need human judgment and stay out of the automatic tally.
    pub fn is_auto_gradable(self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::ShortAnswer)
    }
}

/// Type-specific payload. Untagged: the variants are told apart by their
/// fields, so multiple_choice must stay first (it is the only one carrying
/// `options`) and essay last (an empty payload matches anything).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionDetails {
    MultipleChoice(MultipleChoiceDetails),
    ShortAnswer(ShortAnswerDetails),
    Essay(EssayDetails),
}

impl QuestionDetails {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionDetails::MultipleChoice(_) => QuestionType::MultipleChoice,
            QuestionDetails::ShortAnswer(_) => QuestionType::ShortAnswer,
            QuestionDetails::Essay(_) => QuestionType::Essay,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleChoiceDetails {
    /// Option key ("A".."D") to display text, in authoring order.
    pub options: JsonMap<String, JsonValue>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortAnswerDetails {
    pub correct_answer: String,
}

/// Essays carry no answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssayDetails {}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub order_index: i32,
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: i32,
    pub details: JsonValue,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Question {
    /// Parses the stored payload and cross-checks it against the declared
    /// type. A mismatch means the bank was corrupted past the authoring
    /// validation and is reported as an integrity error.
    pub fn typed_details(&self) -> Result<QuestionDetails> {
        let details: QuestionDetails =
            serde_json::from_value(self.details.clone()).map_err(|e| {
                Error::Integrity(format!("question {} has a malformed payload: {}", self.id, e))
            })?;
        if details.question_type() != self.question_type {
            return Err(Error::Integrity(format!(
                "question {} is declared {:?} but carries a {:?} payload",
                self.id,
                self.question_type,
                details.question_type()
            )));
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(question_type: QuestionType, details: JsonValue) -> Question {
        Question {
            id: Uuid::new_v4(),
            exam_id: Uuid::new_v4(),
            order_index: 1,
            question_text: "q".into(),
            question_type,
            points: 10,
            details,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn details_parse_by_shape() {
        let mc = question(
            QuestionType::MultipleChoice,
            json!({"options": {"A": "Paris", "B": "Rome"}, "correct_answer": "A"}),
        );
        assert!(matches!(
            mc.typed_details().unwrap(),
            QuestionDetails::MultipleChoice(_)
        ));

        let sa = question(
            QuestionType::ShortAnswer,
            json!({"correct_answer": "Paris"}),
        );
        assert!(matches!(
            sa.typed_details().unwrap(),
            QuestionDetails::ShortAnswer(_)
        ));

        let essay = question(QuestionType::Essay, json!({}));
        assert!(matches!(
            essay.typed_details().unwrap(),
            QuestionDetails::Essay(_)
        ));
    }

    #[test]
    fn declared_type_must_match_payload() {
        let q = question(QuestionType::Essay, json!({"correct_answer": "Paris"}));
        let err = q.typed_details().unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn option_order_survives_round_trip() {
        let details = json!({
            "options": {"C": "third", "A": "first", "B": "second"},
            "correct_answer": "A"
        });
        let parsed: QuestionDetails = serde_json::from_value(details).unwrap();
        let QuestionDetails::MultipleChoice(mc) = &parsed else {
            panic!("expected multiple choice");
        };
        let keys: Vec<&str> = mc.options.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["C", "A", "B"]);

        let back = serde_json::to_string(&parsed).unwrap();
        let reparsed: QuestionDetails = serde_json::from_str(&back).unwrap();
        let QuestionDetails::MultipleChoice(mc2) = reparsed else {
            panic!("expected multiple choice");
        };
        let keys2: Vec<String> = mc2.options.keys().cloned().collect();
        assert_eq!(keys2, vec!["C", "A", "B"]);
    }
}
