pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::middleware::{
    auth::require_bearer_auth,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::services::{
    attempt_service::AttemptService, indicator_service::IndicatorService,
    phase_average_service::PhaseAverageService, questionnaire_service::QuestionnaireService,
    student_service::StudentService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub attempt_service: AttemptService,
    pub phase_average_service: PhaseAverageService,
    pub questionnaire_service: QuestionnaireService,
    pub student_service: StudentService,
    pub indicator_service: IndicatorService,
    pub indicator_passing_score: Decimal,
}

impl AppState {
    pub fn new(pool: PgPool, indicator_passing_score: Decimal) -> Self {
        Self {
            attempt_service: AttemptService::new(pool.clone()),
            phase_average_service: PhaseAverageService::new(pool.clone()),
            questionnaire_service: QuestionnaireService::new(pool.clone()),
            student_service: StudentService::new(pool.clone()),
            indicator_service: IndicatorService::new(pool.clone()),
            indicator_passing_score,
            pool,
        }
    }
}

/// Every `/api` route requires a bearer token; `/health` is open.
pub fn build_router(state: AppState, api_rps: u32) -> Router {
    let api = Router::new()
        .route("/api/quiz/submit", post(routes::quiz::submit_quiz))
        .route(
            "/api/quiz/attempts/:student_id/:questionnaire_id",
            get(routes::quiz::list_attempts),
        )
        .route(
            "/api/quiz/questions/:questionnaire_id",
            get(routes::quiz::get_questions),
        )
        .route(
            "/api/quiz-attempts/:attempt_id",
            put(routes::quiz::override_attempt),
        )
        .route(
            "/api/students/:id/grades",
            get(routes::grades::get_grades).put(routes::grades::update_grades),
        )
        .route(
            "/api/recalculate-phase-averages/:student_id",
            post(routes::grades::recalculate_phase_averages),
        )
        .route(
            "/api/questionnaires",
            get(routes::questionnaires::list_questionnaires)
                .post(routes::questionnaires::create_questionnaire),
        )
        .route(
            "/api/questionnaires/:id/questions",
            post(routes::questionnaires::add_question),
        )
        .route(
            "/api/questions/:id",
            put(routes::questionnaires::update_question),
        )
        .route(
            "/api/indicators",
            get(routes::indicators::list_indicators).post(routes::indicators::create_indicator),
        )
        .route(
            "/api/students/:id/indicators",
            get(routes::indicators::list_student_indicators)
                .put(routes::indicators::assign_indicators),
        )
        .route(
            "/api/students/:id/indicators/evaluate",
            post(routes::indicators::evaluate_indicators),
        )
        .layer(from_fn(require_bearer_auth))
        .layer(from_fn_with_state(RateLimiter::new(api_rps), rps_middleware));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(api)
        .with_state(state)
}
