use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::teacher_dto::{
    CreateExamPayload, CreateQuestionPayload, ExamView, QuestionView, UpdateExamPayload,
    UpdateQuestionPayload,
};
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<CreateExamPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let teacher_id = claims.subject_id()?;
    let exam = state
        .exam_service
        .create_exam(course_id, teacher_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(exam)).into_response())
}

#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let teacher_id = claims.subject_id()?;
    let exams = state.exam_service.list_exams(course_id, teacher_id).await?;
    Ok(Json(exams).into_response())
}

#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, exam_id)): Path<(Uuid, Uuid)>,
) -> crate::error::Result<Response> {
    let teacher_id = claims.subject_id()?;
    let (exam, questions) = state
        .exam_service
        .get_exam(course_id, exam_id, teacher_id)
        .await?;
    let view = ExamView::from_parts(exam, questions)?;
    Ok(Json(view).into_response())
}

#[axum::debug_handler]
pub async fn update_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, exam_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateExamPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let teacher_id = claims.subject_id()?;
    let exam = state
        .exam_service
        .update_exam(course_id, exam_id, teacher_id, payload)
        .await?;
    Ok(Json(exam).into_response())
}

#[axum::debug_handler]
pub async fn delete_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, exam_id)): Path<(Uuid, Uuid)>,
) -> crate::error::Result<Response> {
    let teacher_id = claims.subject_id()?;
    state
        .exam_service
        .delete_exam(course_id, exam_id, teacher_id)
        .await?;
    Ok(Json(json!({"deleted": true})).into_response())
}

#[axum::debug_handler]
pub async fn publish_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, exam_id)): Path<(Uuid, Uuid)>,
) -> crate::error::Result<Response> {
    let teacher_id = claims.subject_id()?;
    let exam = state
        .exam_service
        .publish_exam(course_id, exam_id, teacher_id)
        .await?;
    Ok(Json(exam).into_response())
}

#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, exam_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CreateQuestionPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let teacher_id = claims.subject_id()?;
    let question = state
        .exam_service
        .add_question(course_id, exam_id, teacher_id, payload)
        .await?;
    let view = QuestionView::try_from(question)?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, exam_id, question_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let teacher_id = claims.subject_id()?;
    let question = state
        .exam_service
        .update_question(course_id, exam_id, teacher_id, question_id, payload)
        .await?;
    let view = QuestionView::try_from(question)?;
    Ok(Json(view).into_response())
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, exam_id, question_id)): Path<(Uuid, Uuid, Uuid)>,
) -> crate::error::Result<Response> {
    let teacher_id = claims.subject_id()?;
    state
        .exam_service
        .delete_question(course_id, exam_id, teacher_id, question_id)
        .await?;
    Ok(Json(json!({"deleted": true})).into_response())
}

#[axum::debug_handler]
pub async fn list_exam_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, exam_id)): Path<(Uuid, Uuid)>,
) -> crate::error::Result<Response> {
    let teacher_id = claims.subject_id()?;
    state
        .exam_service
        .assert_exam_owner(course_id, exam_id, teacher_id)
        .await?;
    let attempts = state
        .attempt_service
        .list_attempts_for_exam(exam_id)
        .await?;
    Ok(Json(attempts).into_response())
}

#[axum::debug_handler]
pub async fn get_attempt_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((_course_id, _exam_id, attempt_id)): Path<(Uuid, Uuid, Uuid)>,
) -> crate::error::Result<Response> {
    let teacher_id = claims.subject_id()?;
    let result = state
        .result_service
        .get_result_for_teacher(attempt_id, teacher_id)
        .await?;
    Ok(Json(result).into_response())
}
