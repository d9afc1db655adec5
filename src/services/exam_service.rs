use crate::dto::teacher_dto::{
    CreateExamPayload, CreateQuestionPayload, ExamOverview, UpdateExamPayload,
    UpdateQuestionPayload,
};
use crate::error::{Error, Result};
use crate::models::course::Course;
use crate::models::exam::{Exam, ExamStatus};
use crate::models::question::{Question, QuestionDetails, QuestionType};
use crate::utils::validation::field_error;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ExamService {
    pool: PgPool,
}

impl ExamService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_exam(
        &self,
        course_id: Uuid,
        teacher_id: Uuid,
        payload: CreateExamPayload,
    ) -> Result<Exam> {
        self.assert_course_owner(course_id, teacher_id).await?;

        let passing_score = to_decimal(payload.passing_score, "passing score")?;
        let total_points = to_decimal(payload.total_points, "total points")?;

        let exam = sqlx::query_as::<_, Exam>(
            r#"
            INSERT INTO exams (course_id, title, description, time_limit_minutes, passing_score, total_points)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(payload.title.trim())
        .bind(&payload.description)
        .bind(payload.time_limit_minutes)
        .bind(passing_score)
        .bind(total_points)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(exam_id = %exam.id, course_id = %course_id, "exam created");
        Ok(exam)
    }

    pub async fn list_exams(
        &self,
        course_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<Vec<ExamOverview>> {
        self.assert_course_owner(course_id, teacher_id).await?;

        let exams = sqlx::query_as::<_, ExamOverview>(
            r#"
            SELECT e.id, e.course_id, e.title, e.description, e.time_limit_minutes,
                   e.passing_score, e.total_points, e.status, e.created_at,
                   (SELECT COUNT(*) FROM exam_questions q WHERE q.exam_id = e.id) AS question_count
            FROM exams e
            WHERE e.course_id = $1
            ORDER BY e.created_at DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(exams)
    }

    pub async fn get_exam(
        &self,
        course_id: Uuid,
        exam_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<(Exam, Vec<Question>)> {
        let exam = self.owned_exam(course_id, exam_id, teacher_id).await?;
        let questions = self.questions_for_exam(exam_id).await?;
        Ok((exam, questions))
    }

    pub async fn update_exam(
        &self,
        course_id: Uuid,
        exam_id: Uuid,
        teacher_id: Uuid,
        payload: UpdateExamPayload,
    ) -> Result<Exam> {
        let exam = self.owned_exam(course_id, exam_id, teacher_id).await?;
        self.assert_draft(&exam, "update a published exam")?;

        let passing_score = payload
            .passing_score
            .map(|s| to_decimal(s, "passing score"))
            .transpose()?;
        let total_points = payload
            .total_points
            .map(|p| to_decimal(p, "total points"))
            .transpose()?;

        let exam = sqlx::query_as::<_, Exam>(
            r#"
            UPDATE exams
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                time_limit_minutes = COALESCE($3, time_limit_minutes),
                passing_score = COALESCE($4, passing_score),
                total_points = COALESCE($5, total_points),
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(payload.title)
        .bind(payload.description)
        .bind(payload.time_limit_minutes)
        .bind(passing_score)
        .bind(total_points)
        .bind(exam_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exam)
    }

    pub async fn delete_exam(
        &self,
        course_id: Uuid,
        exam_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<()> {
        let exam = self.owned_exam(course_id, exam_id, teacher_id).await?;
        self.assert_draft(&exam, "delete a published exam")?;

        sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(exam_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// draft -> published, once. Re-publishing is a no-op so that retried
    /// or concurrent publish calls cannot fail each other; the conditional
    /// update is the actual guard.
    pub async fn publish_exam(
        &self,
        course_id: Uuid,
        exam_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<Exam> {
        let exam = self.owned_exam(course_id, exam_id, teacher_id).await?;

        if exam.status == ExamStatus::Published {
            return Ok(exam);
        }
        if !exam.status.can_transition_to(ExamStatus::Published) {
            return Err(Error::InvalidState(format!(
                "Exam in status '{}' cannot be published",
                exam.status.as_str()
            )));
        }

        let question_count = self.count_questions(exam_id).await?;
        if question_count == 0 {
            return Err(Error::InvalidState(
                "Cannot publish an exam without questions".to_string(),
            ));
        }

        let published = sqlx::query_as::<_, Exam>(
            r#"
            UPDATE exams
            SET status = 'published', published_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'draft'
            RETURNING *
            "#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;

        match published {
            Some(exam) => {
                tracing::info!(exam_id = %exam.id, "exam published");
                Ok(exam)
            }
            // Lost the race to another publish; the exam is published either way.
            None => self.owned_exam(course_id, exam_id, teacher_id).await,
        }
    }

    pub async fn add_question(
        &self,
        course_id: Uuid,
        exam_id: Uuid,
        teacher_id: Uuid,
        payload: CreateQuestionPayload,
    ) -> Result<Question> {
        let exam = self.owned_exam(course_id, exam_id, teacher_id).await?;
        self.assert_draft(&exam, "add questions to a published exam")?;
        validate_details(payload.question_type, &payload.details)?;

        let details_json = serde_json::to_string(&payload.details)?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO exam_questions (exam_id, order_index, question_text, question_type, points, details)
            SELECT $1, COALESCE(MAX(order_index), 0) + 1, $2, $3, $4, $5::json
            FROM exam_questions
            WHERE exam_id = $1
            RETURNING *
            "#,
        )
        .bind(exam_id)
        .bind(payload.question_text.trim())
        .bind(payload.question_type)
        .bind(payload.points)
        .bind(details_json)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    pub async fn update_question(
        &self,
        course_id: Uuid,
        exam_id: Uuid,
        teacher_id: Uuid,
        question_id: Uuid,
        payload: UpdateQuestionPayload,
    ) -> Result<Question> {
        let exam = self.owned_exam(course_id, exam_id, teacher_id).await?;
        self.assert_draft(&exam, "edit questions of a published exam")?;

        let current = self.question_in_exam(exam_id, question_id).await?;

        // The answer payload is replaced only together with an explicit type.
        let (question_type, details) = match payload.question_type {
            Some(question_type) => {
                let details = payload.details.ok_or_else(|| {
                    Error::Validation(field_error(
                        "type",
                        "missing_details",
                        "Changing the question type requires the matching answer payload",
                    ))
                })?;
                (question_type, details)
            }
            None => (current.question_type, current.typed_details()?),
        };
        validate_details(question_type, &details)?;

        let details_json = serde_json::to_string(&details)?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE exam_questions
            SET question_text = COALESCE($1, question_text),
                points = COALESCE($2, points),
                question_type = $3,
                details = $4::json,
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(payload.question_text)
        .bind(payload.points)
        .bind(question_type)
        .bind(details_json)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    pub async fn delete_question(
        &self,
        course_id: Uuid,
        exam_id: Uuid,
        teacher_id: Uuid,
        question_id: Uuid,
    ) -> Result<()> {
        let exam = self.owned_exam(course_id, exam_id, teacher_id).await?;
        self.assert_draft(&exam, "remove questions from a published exam")?;
        self.question_in_exam(exam_id, question_id).await?;

        sqlx::query("DELETE FROM exam_questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Ownership gate for handlers that only need the check, not the exam.
    pub async fn assert_exam_owner(
        &self,
        course_id: Uuid,
        exam_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<()> {
        self.owned_exam(course_id, exam_id, teacher_id).await?;
        Ok(())
    }

    /// The student-facing catalogue: every published exam across courses.
    pub async fn list_published_exams(&self) -> Result<Vec<ExamOverview>> {
        let exams = sqlx::query_as::<_, ExamOverview>(
            r#"
            SELECT e.id, e.course_id, e.title, e.description, e.time_limit_minutes,
                   e.passing_score, e.total_points, e.status, e.created_at,
                   (SELECT COUNT(*) FROM exam_questions q WHERE q.exam_id = e.id) AS question_count
            FROM exams e
            WHERE e.status = 'published'
            ORDER BY e.published_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    pub async fn questions_for_exam(&self, exam_id: Uuid) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM exam_questions WHERE exam_id = $1 ORDER BY order_index",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn count_questions(&self, exam_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM exam_questions WHERE exam_id = $1")
                .bind(exam_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn question_in_exam(&self, exam_id: Uuid, question_id: Uuid) -> Result<Question> {
        sqlx::query_as::<_, Question>(
            "SELECT * FROM exam_questions WHERE id = $1 AND exam_id = $2",
        )
        .bind(question_id)
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Question not found".to_string()))
    }

    async fn owned_exam(
        &self,
        course_id: Uuid,
        exam_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<Exam> {
        sqlx::query_as::<_, Exam>(
            r#"
            SELECT e.*
            FROM exams e
            JOIN courses c ON c.id = e.course_id
            WHERE e.id = $1 AND e.course_id = $2 AND c.teacher_id = $3
            "#,
        )
        .bind(exam_id)
        .bind(course_id)
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    async fn assert_course_owner(&self, course_id: Uuid, teacher_id: Uuid) -> Result<Course> {
        sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE id = $1 AND teacher_id = $2",
        )
        .bind(course_id)
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Course not found".to_string()))
    }

    fn assert_draft(&self, exam: &Exam, action: &str) -> Result<()> {
        if exam.status != ExamStatus::Draft {
            return Err(Error::InvalidState(format!(
                "Cannot {}; author a new exam instead",
                action
            )));
        }
        Ok(())
    }
}

fn to_decimal(value: f64, what: &str) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| Error::BadRequest(format!("Invalid {}", what)))
}

/// Cross-field checks the derive macro cannot express. The declared type and
/// the payload must agree, and a multiple-choice key set has to be usable.
fn validate_details(question_type: QuestionType, details: &QuestionDetails) -> Result<()> {
    if details.question_type() != question_type {
        return Err(Error::Validation(field_error(
            "type",
            "type_mismatch",
            "Question payload does not match the declared type",
        )));
    }

    match details {
        QuestionDetails::MultipleChoice(mc) => {
            if mc.options.len() < 2 {
                return Err(Error::Validation(field_error(
                    "options",
                    "too_few_options",
                    "A multiple choice question needs at least two options",
                )));
            }
            if mc.options.values().any(|v| !v.is_string()) {
                return Err(Error::Validation(field_error(
                    "options",
                    "option_not_text",
                    "Option values must be text",
                )));
            }
            if !mc.options.contains_key(&mc.correct_answer) {
                return Err(Error::Validation(field_error(
                    "correct_answer",
                    "unknown_option_key",
                    "correct_answer must be one of the option keys",
                )));
            }
        }
        QuestionDetails::ShortAnswer(sa) => {
            if sa.correct_answer.trim().is_empty() {
                return Err(Error::Validation(field_error(
                    "correct_answer",
                    "empty_answer_key",
                    "A short answer question needs an expected answer",
                )));
            }
        }
        QuestionDetails::Essay(_) => {}
    }

    Ok(())
}
