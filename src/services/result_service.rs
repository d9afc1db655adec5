use crate::error::{Error, Result};
use crate::models::attempt::AttemptStatus;
use crate::models::result::ExamResult;
use sqlx::PgPool;
use uuid::Uuid;

/// Serves graded outcomes exactly as they were stored. Results are written
/// once by the submit transaction and never recomputed on read, so a bank
/// edited after the fact cannot retroactively change a reported score.
#[derive(Clone)]
pub struct ResultService {
    pool: PgPool,
}

impl ResultService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_result_for_student(
        &self,
        attempt_id: Uuid,
        student_id: Uuid,
    ) -> Result<ExamResult> {
        let status: Option<AttemptStatus> = sqlx::query_scalar(
            "SELECT status FROM exam_attempts WHERE id = $1 AND student_id = $2",
        )
        .bind(attempt_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        self.stored_result(attempt_id, status).await
    }

    /// Teacher-side read, authorized through course ownership.
    pub async fn get_result_for_teacher(
        &self,
        attempt_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<ExamResult> {
        let status: Option<AttemptStatus> = sqlx::query_scalar(
            r#"
            SELECT a.status
            FROM exam_attempts a
            JOIN exams e ON e.id = a.exam_id
            JOIN courses c ON c.id = e.course_id
            WHERE a.id = $1 AND c.teacher_id = $2
            "#,
        )
        .bind(attempt_id)
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?;

        self.stored_result(attempt_id, status).await
    }

    async fn stored_result(
        &self,
        attempt_id: Uuid,
        status: Option<AttemptStatus>,
    ) -> Result<ExamResult> {
        match status {
            None => Err(Error::NotFound("Attempt not found".to_string())),
            Some(AttemptStatus::InProgress) => Err(Error::NotFound(
                "Attempt has not been submitted".to_string(),
            )),
            Some(AttemptStatus::Submitted) => {
                sqlx::query_as::<_, ExamResult>(
                    "SELECT * FROM exam_results WHERE attempt_id = $1",
                )
                .bind(attempt_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| {
                    Error::Integrity(format!(
                        "attempt {} is submitted but has no stored result",
                        attempt_id
                    ))
                })
            }
        }
    }
}
