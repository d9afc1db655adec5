use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::dto::student_dto::{
    AttemptView, SaveAnswerRequest, SaveAnswerResponse, StudentExamSummary,
    StudentExamsResponse, StudentQuestionView, SubmitExamRequest, SubmitExamResponse,
    TakeExamResponse,
};
use crate::dto::teacher_dto::AttemptOverview;
use crate::middleware::auth::Claims;
use crate::models::attempt::AttemptStatus;
use crate::AppState;

/// Published exams plus the caller's attempt history, with per-exam best
/// and latest score folded in for the dashboard.
#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    let student_id = claims.subject_id()?;
    let published = state.exam_service.list_published_exams().await?;
    let attempts = state
        .attempt_service
        .list_attempts_for_student(student_id)
        .await?;

    let outcomes = fold_outcomes(&attempts);
    let exams = published
        .into_iter()
        .map(|e| {
            let (best_score, latest_score) = outcomes.get(&e.id).copied().unwrap_or((None, None));
            StudentExamSummary {
                id: e.id,
                course_id: e.course_id,
                title: e.title,
                description: e.description,
                time_limit_minutes: e.time_limit_minutes,
                passing_score: e.passing_score,
                question_count: e.question_count,
                best_score,
                latest_score,
            }
        })
        .collect();

    Ok(Json(StudentExamsResponse { exams, attempts }).into_response())
}

/// Fetches an exam for taking and idempotently opens (or resumes) the
/// caller's attempt. Answer keys stay on the server.
#[axum::debug_handler]
pub async fn take_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let student_id = claims.subject_id()?;
    let exam = state.attempt_service.published_exam(exam_id).await?;
    let (attempt, resumed) = state
        .attempt_service
        .start_attempt(exam_id, student_id)
        .await?;

    let questions = state
        .exam_service
        .questions_for_exam(exam_id)
        .await?
        .into_iter()
        .map(StudentQuestionView::from_question)
        .collect::<crate::error::Result<Vec<_>>>()?;

    let response = TakeExamResponse {
        id: exam.id,
        course_id: exam.course_id,
        title: exam.title,
        description: exam.description,
        time_limit_minutes: exam.time_limit_minutes,
        passing_score: exam.passing_score,
        attempt: AttemptView::from(attempt),
        resumed,
        questions,
    };
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<SaveAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let student_id = claims.subject_id()?;
    let timestamp = state
        .attempt_service
        .record_answer(attempt_id, student_id, req.question_id, &req.answer)
        .await?;
    Ok(Json(SaveAnswerResponse {
        saved: true,
        question_id: req.question_id,
        timestamp,
    })
    .into_response())
}

/// Submits the caller's attempt against this exam. An open attempt is
/// finalized; with no open attempt a retried submit returns the stored
/// result of the newest submitted one; a submit without any prior fetch
/// opens and immediately finalizes an attempt.
#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
    Json(req): Json<SubmitExamRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let student_id = claims.subject_id()?;
    let svc = &state.attempt_service;

    let attempt_id = if let Some(open) = svc.open_attempt(exam_id, student_id).await? {
        open.id
    } else if let Some(submitted) = svc.latest_submitted_attempt(exam_id, student_id).await? {
        submitted.id
    } else {
        let (attempt, _resumed) = svc.start_attempt(exam_id, student_id).await?;
        attempt.id
    };

    let outcome = svc
        .submit_attempt(attempt_id, student_id, &req.answers)
        .await?;

    let message = if outcome.already_submitted {
        "Attempt was already submitted; returning the stored result".to_string()
    } else {
        "Exam submitted".to_string()
    };

    Ok(Json(SubmitExamResponse {
        attempt_id: outcome.attempt.id,
        status: outcome.attempt.status,
        score: outcome.result.score,
        passed: outcome.result.passed,
        message,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let student_id = claims.subject_id()?;
    let result = state
        .result_service
        .get_result_for_student(attempt_id, student_id)
        .await?;
    Ok(Json(result).into_response())
}

/// Best and latest submitted score per exam. Best is the maximum; latest
/// follows submission time.
fn fold_outcomes(attempts: &[AttemptOverview]) -> HashMap<Uuid, (Option<i32>, Option<i32>)> {
    let mut latest_at: HashMap<Uuid, chrono::DateTime<chrono::Utc>> = HashMap::new();
    let mut outcomes: HashMap<Uuid, (Option<i32>, Option<i32>)> = HashMap::new();

    for attempt in attempts {
        if attempt.status != AttemptStatus::Submitted {
            continue;
        }
        let (Some(score), Some(submitted_at)) = (attempt.score, attempt.submitted_at) else {
            continue;
        };

        let entry = outcomes.entry(attempt.exam_id).or_default();
        if entry.0.map_or(true, |best| score > best) {
            entry.0 = Some(score);
        }
        let newest = latest_at
            .get(&attempt.exam_id)
            .map_or(true, |at| submitted_at > *at);
        if newest {
            latest_at.insert(attempt.exam_id, submitted_at);
            entry.1 = Some(score);
        }
    }

    outcomes
}
