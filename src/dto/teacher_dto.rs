use crate::models::exam::{Exam, ExamStatus};
use crate::models::question::{Question, QuestionDetails, QuestionType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExamPayload {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// 0 means untimed.
    #[serde(default)]
    #[validate(range(min = 0, message = "Time limit must not be negative"))]
    pub time_limit_minutes: i32,
    #[validate(range(
        min = 0.0,
        max = 100.0,
        message = "Passing score must be between 0 and 100"
    ))]
    pub passing_score: f64,
    #[validate(range(min = 0.01, message = "Total points must be positive"))]
    pub total_points: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamPayload {
    // Serde deserializer trims and turns empty strings into None
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 0, message = "Time limit must not be negative"))]
    pub time_limit_minutes: Option<i32>,

    #[validate(range(
        min = 0.0,
        max = 100.0,
        message = "Passing score must be between 0 and 100"
    ))]
    pub passing_score: Option<f64>,

    #[validate(range(min = 0.01, message = "Total points must be positive"))]
    pub total_points: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(min = 1, message = "Question text must not be empty"))]
    pub question_text: String,
    #[serde(default = "default_points")]
    #[validate(range(min = 1, message = "Points must be positive"))]
    pub points: i32,
    #[serde(flatten)]
    pub details: QuestionDetails,
}

fn default_points() -> i32 {
    10
}

/// Partial update. The answer payload is replaced as a whole and only when
/// `type` is present; without it the flattened remainder is ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub question_text: Option<String>,

    #[validate(range(min = 1, message = "Points must be positive"))]
    pub points: Option<i32>,

    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,

    #[serde(flatten)]
    pub details: Option<QuestionDetails>,
}

// Custom deserializer to trim strings and convert empty strings to None
fn trim_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

/// Full authoring view, answer keys included.
#[derive(Debug, Serialize)]
pub struct ExamView {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub time_limit_minutes: i32,
    pub passing_score: Decimal,
    pub total_points: Decimal,
    pub status: ExamStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub questions: Vec<QuestionView>,
}

impl ExamView {
    pub fn from_parts(exam: Exam, questions: Vec<Question>) -> crate::error::Result<Self> {
        let questions = questions
            .into_iter()
            .map(QuestionView::try_from)
            .collect::<crate::error::Result<Vec<_>>>()?;
        Ok(Self {
            id: exam.id,
            course_id: exam.course_id,
            title: exam.title,
            description: exam.description,
            time_limit_minutes: exam.time_limit_minutes,
            passing_score: exam.passing_score,
            total_points: exam.total_points,
            status: exam.status,
            published_at: exam.published_at,
            created_at: exam.created_at,
            questions,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub order_index: i32,
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: i32,
    #[serde(flatten)]
    pub details: QuestionDetails,
}

impl TryFrom<Question> for QuestionView {
    type Error = crate::error::Error;

    fn try_from(q: Question) -> crate::error::Result<Self> {
        let details = q.typed_details()?;
        Ok(Self {
            id: q.id,
            order_index: q.order_index,
            question_text: q.question_text,
            question_type: q.question_type,
            points: q.points,
            details,
        })
    }
}

/// Course exam listing row; question_count comes from a scalar subquery.
#[derive(Debug, Serialize, FromRow)]
pub struct ExamOverview {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub time_limit_minutes: i32,
    pub passing_score: Decimal,
    pub total_points: Decimal,
    pub status: ExamStatus,
    pub question_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Analytics row for the teacher: one attempt with its graded outcome when
/// present.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptOverview {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub student_id: Uuid,
    pub status: crate::models::attempt::AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub passed: Option<bool>,
}
