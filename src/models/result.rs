use crate::models::question::QuestionType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One entry per question, in presentation order. For essays the key and
/// verdict stay null until a human grades them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub student_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub is_correct: Option<bool>,
    pub points_earned: i32,
    pub max_points: i32,
}

/// Stored outcome of grading a submitted attempt. Written once, in the
/// same transaction that flips the attempt to submitted; served back
/// verbatim on every read thereafter, even if the exam is edited.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamResult {
    pub attempt_id: Uuid,
    pub exam_id: Uuid,
    pub exam_title: String,
    pub passing_score: Decimal,
    pub score: i32,
    pub passed: bool,
    pub per_question: JsonValue,
    pub graded_at: DateTime<Utc>,
}
