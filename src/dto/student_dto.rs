use crate::error::Result;
use crate::models::attempt::{AttemptStatus, ExamAttempt};
use crate::models::question::{Question, QuestionDetails, QuestionType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Question as the learner sees it: options keep their authoring order,
/// answer keys never leave the server.
#[derive(Debug, Clone, Serialize)]
pub struct StudentQuestionView {
    pub id: Uuid,
    pub order_index: i32,
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<JsonMap<String, JsonValue>>,
}

impl StudentQuestionView {
    pub fn from_question(q: Question) -> Result<Self> {
        let options = match q.typed_details()? {
            QuestionDetails::MultipleChoice(mc) => Some(mc.options),
            QuestionDetails::ShortAnswer(_) | QuestionDetails::Essay(_) => None,
        };
        Ok(Self {
            id: q.id,
            order_index: q.order_index,
            question_text: q.question_text,
            question_type: q.question_type,
            points: q.points,
            options,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptView {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub answers: JsonValue,
}

impl From<ExamAttempt> for AttemptView {
    fn from(a: ExamAttempt) -> Self {
        Self {
            id: a.id,
            exam_id: a.exam_id,
            status: a.status,
            started_at: a.started_at,
            submitted_at: a.submitted_at,
            answers: a.answers,
        }
    }
}

/// Response for fetching an exam to take: the exam without keys plus the
/// attempt that was opened (or resumed) for the caller.
#[derive(Debug, Serialize)]
pub struct TakeExamResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub time_limit_minutes: i32,
    pub passing_score: Decimal,
    pub attempt: AttemptView,
    pub resumed: bool,
    pub questions: Vec<StudentQuestionView>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    pub question_id: Uuid,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SaveAnswerResponse {
    pub saved: bool,
    pub question_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitExamRequest {
    /// Final answers keyed by question id; merged over anything recorded
    /// incrementally before the submit.
    #[serde(default)]
    pub answers: HashMap<Uuid, String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitExamResponse {
    pub attempt_id: Uuid,
    pub status: AttemptStatus,
    pub score: i32,
    pub passed: bool,
    pub message: String,
}

/// One published exam in the student catalogue, with this student's
/// aggregate outcomes folded in.
#[derive(Debug, Serialize)]
pub struct StudentExamSummary {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub time_limit_minutes: i32,
    pub passing_score: Decimal,
    pub question_count: i64,
    pub best_score: Option<i32>,
    pub latest_score: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct StudentExamsResponse {
    pub exams: Vec<StudentExamSummary>,
    pub attempts: Vec<crate::dto::teacher_dto::AttemptOverview>,
}
