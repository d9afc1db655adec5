pub mod health;
pub mod student_routes;
pub mod teacher_routes;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth, cors, rate_limit};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let config = crate::config::get_config();

    let teacher_api = Router::new()
        .route(
            "/api/teacher/courses/:course_id/exams",
            post(teacher_routes::create_exam).get(teacher_routes::list_exams),
        )
        .route(
            "/api/teacher/courses/:course_id/exams/:exam_id",
            get(teacher_routes::get_exam)
                .put(teacher_routes::update_exam)
                .delete(teacher_routes::delete_exam),
        )
        .route(
            "/api/teacher/courses/:course_id/exams/:exam_id/publish",
            post(teacher_routes::publish_exam),
        )
        .route(
            "/api/teacher/courses/:course_id/exams/:exam_id/questions",
            post(teacher_routes::add_question),
        )
        .route(
            "/api/teacher/courses/:course_id/exams/:exam_id/questions/:question_id",
            put(teacher_routes::update_question).delete(teacher_routes::delete_question),
        )
        .route(
            "/api/teacher/courses/:course_id/exams/:exam_id/attempts",
            get(teacher_routes::list_exam_attempts),
        )
        .route(
            "/api/teacher/courses/:course_id/exams/:exam_id/attempts/:attempt_id/result",
            get(teacher_routes::get_attempt_result),
        )
        .layer(axum_middleware::from_fn(auth::require_teacher))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(config.teacher_rps),
            rate_limit::rps_middleware,
        ));

    let student_api = Router::new()
        .route("/api/student/exams", get(student_routes::list_exams))
        .route(
            "/api/student/exams/:exam_id",
            get(student_routes::take_exam),
        )
        .route(
            "/api/student/exams/:exam_id/attempt",
            post(student_routes::submit_exam),
        )
        .route(
            "/api/student/exams/attempts/:attempt_id/answer",
            patch(student_routes::save_answer),
        )
        .route(
            "/api/student/exams/attempts/:attempt_id/result",
            get(student_routes::get_result),
        )
        .layer(axum_middleware::from_fn(auth::require_student))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(config.student_rps),
            rate_limit::rps_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(teacher_api)
        .merge(student_api)
        .with_state(state)
        .layer(cors::permissive_cors())
        .layer(TraceLayer::new_for_http())
}
