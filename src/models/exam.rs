use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "exam_status", rename_all = "snake_case")]
pub enum ExamStatus {
    Draft,
    Published,
}

impl ExamStatus {
    /// Allowed transitions: draft -> published, nothing else. Published is
    /// terminal; there is no unpublish and no archived state for exams.
    pub fn can_transition_to(self, next: ExamStatus) -> bool {
        matches!((self, next), (ExamStatus::Draft, ExamStatus::Published))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExamStatus::Draft => "draft",
            ExamStatus::Published => "published",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    /// 0 means untimed.
    pub time_limit_minutes: i32,
    pub passing_score: Decimal,
    pub total_points: Decimal,
    pub status: ExamStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
