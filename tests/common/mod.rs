// Each test binary pulls in a different subset of these helpers.
#![allow(dead_code)]

use std::env;

use axum::Router;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test_secret_key";

pub fn init_test_config() {
    if env::var("SERVER_ADDRESS").is_err() {
        env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    }
    if env::var("DATABASE_URL").is_err() {
        // connect_lazy never dials this; it only has to parse.
        env::set_var("DATABASE_URL", "postgres://localhost:5432/assessment_test");
    }
    env::set_var("JWT_SECRET", TEST_JWT_SECRET);
    env::set_var("TEACHER_RPS", "1000");
    env::set_var("STUDENT_RPS", "1000");

    // Other tests in the same binary may have initialized it already.
    let _ = assessment_backend::config::init_config();
}

/// Router over a lazy pool: nothing touches the database until a query runs,
/// so auth and routing behavior is testable without Postgres.
pub fn lazy_app() -> Router {
    init_test_config();
    let pool = PgPoolOptions::new()
        .connect_lazy(&env::var("DATABASE_URL").expect("DATABASE_URL set by init_test_config"))
        .expect("lazy pool");
    routes_app(pool)
}

pub fn routes_app(pool: sqlx::PgPool) -> Router {
    let state = assessment_backend::AppState::new(pool);
    assessment_backend::routes::create_router(state)
}

pub fn bearer_token(subject: Uuid, role: &str) -> String {
    let claims = assessment_backend::middleware::auth::Claims {
        sub: subject.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        role: Some(role.to_string()),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("encode token");
    format!("Bearer {}", token)
}
