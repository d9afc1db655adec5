use crate::dto::teacher_dto::AttemptOverview;
use crate::error::{Error, Result};
use crate::models::attempt::{AttemptStatus, ExamAttempt};
use crate::models::exam::Exam;
use crate::models::question::Question;
use crate::models::result::ExamResult;
use crate::services::grading_service::GradingService;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

/// What a submit call hands back: the attempt after the transition and the
/// stored result. `already_submitted` marks a retried submit that was served
/// from storage instead of being graded again.
#[derive(Debug)]
pub struct SubmittedOutcome {
    pub attempt: ExamAttempt,
    pub result: ExamResult,
    pub already_submitted: bool,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens an attempt against a published exam. Idempotent per
    /// (exam, student): an already-open attempt is returned as-is, and the
    /// partial unique index resolves the race between two concurrent starts.
    /// Returns the attempt and whether it was resumed rather than created.
    pub async fn start_attempt(
        &self,
        exam_id: Uuid,
        student_id: Uuid,
    ) -> Result<(ExamAttempt, bool)> {
        self.published_exam(exam_id).await?;

        if let Some(open) = self.open_attempt(exam_id, student_id).await? {
            return Ok((open, true));
        }

        let inserted = sqlx::query_as::<_, ExamAttempt>(
            r#"
            INSERT INTO exam_attempts (exam_id, student_id)
            VALUES ($1, $2)
            ON CONFLICT (exam_id, student_id) WHERE status = 'in_progress' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(exam_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(attempt) => {
                tracing::info!(attempt_id = %attempt.id, exam_id = %exam_id, "attempt started");
                Ok((attempt, false))
            }
            // Lost the insert race; the concurrent start owns the open attempt.
            None => self
                .open_attempt(exam_id, student_id)
                .await?
                .map(|a| (a, true))
                .ok_or_else(|| {
                    Error::Internal("Attempt creation raced and no open attempt exists".to_string())
                }),
        }
    }

    /// Upserts one answer. The jsonb merge is a single statement, so rapid
    /// per-field saves from the UI serialize on the attempt row without any
    /// further coordination.
    pub async fn record_answer(
        &self,
        attempt_id: Uuid,
        student_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Result<DateTime<Utc>> {
        let attempt = self.attempt_for_student(attempt_id, student_id).await?;
        if attempt.status != AttemptStatus::InProgress {
            return Err(Error::InvalidState(
                "Answers cannot be recorded on a submitted attempt".to_string(),
            ));
        }

        let in_exam: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM exam_questions WHERE id = $1 AND exam_id = $2)",
        )
        .bind(question_id)
        .bind(attempt.exam_id)
        .fetch_one(&self.pool)
        .await?;
        if !in_exam {
            return Err(Error::NotFound(
                "Question does not belong to this exam".to_string(),
            ));
        }

        let timestamp = Utc::now();
        let updated = sqlx::query(
            r#"
            UPDATE exam_attempts
            SET answers = answers || jsonb_build_object($2::text, $3::text),
                updated_at = $4
            WHERE id = $1 AND status = 'in_progress'
            "#,
        )
        .bind(attempt_id)
        .bind(question_id.to_string())
        .bind(answer)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        // The attempt was submitted between the status check and the write.
        if updated.rows_affected() == 0 {
            return Err(Error::InvalidState(
                "Answers cannot be recorded on a submitted attempt".to_string(),
            ));
        }

        Ok(timestamp)
    }

    /// in_progress -> submitted plus grading, in one transaction. The row
    /// lock makes retried or concurrent submits converge on the stored
    /// result instead of recomputing it, and a crash can never leave a
    /// submitted attempt without a result.
    pub async fn submit_attempt(
        &self,
        attempt_id: Uuid,
        student_id: Uuid,
        final_answers: &HashMap<Uuid, String>,
    ) -> Result<SubmittedOutcome> {
        let mut tx = self.pool.begin().await?;

        let attempt = sqlx::query_as::<_, ExamAttempt>(
            "SELECT * FROM exam_attempts WHERE id = $1 AND student_id = $2 FOR UPDATE",
        )
        .bind(attempt_id)
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))?;

        if attempt.status == AttemptStatus::Submitted {
            let result = sqlx::query_as::<_, ExamResult>(
                "SELECT * FROM exam_results WHERE attempt_id = $1",
            )
            .bind(attempt_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                Error::Integrity(format!(
                    "attempt {} is submitted but has no stored result",
                    attempt_id
                ))
            })?;
            tx.commit().await?;
            return Ok(SubmittedOutcome {
                attempt,
                result,
                already_submitted: true,
            });
        }

        let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
            .bind(attempt.exam_id)
            .fetch_one(&mut *tx)
            .await?;

        let submitted_at = Utc::now();
        if exam.time_limit_minutes > 0 {
            let deadline =
                attempt.started_at + Duration::minutes(i64::from(exam.time_limit_minutes));
            if submitted_at > deadline {
                // Late submits are accepted verbatim; there is no auto-clip.
                tracing::warn!(
                    attempt_id = %attempt_id,
                    exam_id = %exam.id,
                    "attempt submitted after the time limit"
                );
            }
        }

        let mut answers = attempt.answers_map();
        answers.extend(
            final_answers
                .iter()
                .map(|(id, value)| (*id, value.clone())),
        );

        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM exam_questions WHERE exam_id = $1 ORDER BY order_index",
        )
        .bind(attempt.exam_id)
        .fetch_all(&mut *tx)
        .await?;

        let graded = GradingService::grade(&questions, &answers, exam.passing_score)?;

        let result = sqlx::query_as::<_, ExamResult>(
            r#"
            INSERT INTO exam_results
                (attempt_id, exam_id, exam_title, passing_score, score, passed, per_question, graded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .bind(exam.id)
        .bind(&exam.title)
        .bind(exam.passing_score)
        .bind(graded.score)
        .bind(graded.passed)
        .bind(serde_json::to_value(&graded.per_question)?)
        .bind(submitted_at)
        .fetch_one(&mut *tx)
        .await?;

        let attempt = sqlx::query_as::<_, ExamAttempt>(
            r#"
            UPDATE exam_attempts
            SET status = 'submitted', submitted_at = $2, answers = $3, updated_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .bind(submitted_at)
        .bind(answers_json(&answers))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            attempt_id = %attempt_id,
            score = graded.score,
            passed = graded.passed,
            "attempt submitted and graded"
        );

        Ok(SubmittedOutcome {
            attempt,
            result,
            already_submitted: false,
        })
    }

    pub async fn open_attempt(
        &self,
        exam_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<ExamAttempt>> {
        let attempt = sqlx::query_as::<_, ExamAttempt>(
            r#"
            SELECT * FROM exam_attempts
            WHERE exam_id = $1 AND student_id = $2 AND status = 'in_progress'
            "#,
        )
        .bind(exam_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    pub async fn latest_submitted_attempt(
        &self,
        exam_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<ExamAttempt>> {
        let attempt = sqlx::query_as::<_, ExamAttempt>(
            r#"
            SELECT * FROM exam_attempts
            WHERE exam_id = $1 AND student_id = $2 AND status = 'submitted'
            ORDER BY submitted_at DESC
            LIMIT 1
            "#,
        )
        .bind(exam_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    pub async fn attempt_for_student(
        &self,
        attempt_id: Uuid,
        student_id: Uuid,
    ) -> Result<ExamAttempt> {
        sqlx::query_as::<_, ExamAttempt>(
            "SELECT * FROM exam_attempts WHERE id = $1 AND student_id = $2",
        )
        .bind(attempt_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))
    }

    /// Teacher analytics: every attempt against one exam with its outcome.
    pub async fn list_attempts_for_exam(&self, exam_id: Uuid) -> Result<Vec<AttemptOverview>> {
        let rows = sqlx::query_as::<_, AttemptOverview>(
            r#"
            SELECT a.id, a.exam_id, a.student_id, a.status, a.started_at, a.submitted_at,
                   r.score, r.passed
            FROM exam_attempts a
            LEFT JOIN exam_results r ON r.attempt_id = a.id
            WHERE a.exam_id = $1
            ORDER BY a.started_at DESC
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// All of one student's attempts across exams, newest first.
    pub async fn list_attempts_for_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<AttemptOverview>> {
        let rows = sqlx::query_as::<_, AttemptOverview>(
            r#"
            SELECT a.id, a.exam_id, a.student_id, a.status, a.started_at, a.submitted_at,
                   r.score, r.passed
            FROM exam_attempts a
            LEFT JOIN exam_results r ON r.attempt_id = a.id
            WHERE a.student_id = $1
            ORDER BY a.started_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn published_exam(&self, exam_id: Uuid) -> Result<Exam> {
        sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1 AND status = 'published'")
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found or not published".to_string()))
    }
}

fn answers_json(answers: &HashMap<Uuid, String>) -> JsonValue {
    let mut map = JsonMap::new();
    for (question_id, value) in answers {
        map.insert(question_id.to_string(), JsonValue::String(value.clone()));
    }
    JsonValue::Object(map)
}
