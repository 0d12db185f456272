use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension,
};

use crate::{
    dto::envelope::ApiResponse,
    dto::extract::{AppJson, AppPath, AppQuery},
    dto::indicator_dto::{
        AssignIndicatorsPayload, CreateIndicatorPayload, IndicatorEvaluationResponse,
        IndicatorFilter,
    },
    error::Result,
    middleware::auth::AuthUser,
    models::user::Role,
    services::student_service::StudentAccess,
    utils::validation::{require_id, validate},
    AppState,
};

#[axum::debug_handler]
pub async fn create_indicator(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(payload): AppJson<CreateIndicatorPayload>,
) -> Result<Response> {
    user.require_any(&[Role::Teacher])?;
    validate(&payload)?;
    let indicator = state.indicator_service.create(payload, user.id).await?;
    Ok(ApiResponse::ok(indicator)
        .with_message("Indicator created")
        .created())
}

#[axum::debug_handler]
pub async fn list_indicators(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<IndicatorFilter>,
) -> Result<Response> {
    let rows = state.indicator_service.list(filter).await?;
    Ok(ApiResponse::ok(rows).into_response())
}

#[axum::debug_handler]
pub async fn list_student_indicators(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(student_id): AppPath<i64>,
) -> Result<Response> {
    let student_id = require_id("studentId", student_id)?;
    state
        .student_service
        .authorize(&user, student_id, StudentAccess::View)
        .await?;
    let rows = state.indicator_service.list_for_student(student_id).await?;
    Ok(ApiResponse::ok(rows).into_response())
}

#[axum::debug_handler]
pub async fn assign_indicators(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(student_id): AppPath<i64>,
    AppJson(payload): AppJson<AssignIndicatorsPayload>,
) -> Result<Response> {
    let student_id = require_id("studentId", student_id)?;
    state
        .student_service
        .authorize(&user, student_id, StudentAccess::Manage)
        .await?;
    validate(&payload)?;

    let rows = state
        .indicator_service
        .assign(student_id, &payload.indicators, user.id)
        .await?;
    Ok(ApiResponse::ok(rows)
        .with_message("Indicators updated")
        .into_response())
}

/// Marks questionnaire-linked indicators from the student's best scores.
#[axum::debug_handler]
pub async fn evaluate_indicators(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(student_id): AppPath<i64>,
) -> Result<Response> {
    let student_id = require_id("studentId", student_id)?;
    state
        .student_service
        .authorize(&user, student_id, StudentAccess::Manage)
        .await?;

    let passing_score = state.indicator_passing_score;
    let summary = state
        .indicator_service
        .evaluate(student_id, passing_score, user.id)
        .await?;
    Ok(ApiResponse::ok(IndicatorEvaluationResponse {
        evaluated: summary.evaluated,
        achieved: summary.achieved,
        passing_score,
    })
    .into_response())
}
