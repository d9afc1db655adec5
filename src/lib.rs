pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    attempt_service::AttemptService, exam_service::ExamService, result_service::ResultService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub exam_service: ExamService,
    pub attempt_service: AttemptService,
    pub result_service: ResultService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let exam_service = ExamService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone());
        let result_service = ResultService::new(pool.clone());

        Self {
            pool,
            exam_service,
            attempt_service,
            result_service,
        }
    }
}
