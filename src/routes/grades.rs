use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension,
};

use crate::{
    dto::envelope::ApiResponse,
    dto::extract::{AppJson, AppPath},
    dto::grade_dto::{StudentGradesResponse, UpdateGradesRequest},
    error::{Error, Result},
    middleware::auth::AuthUser,
    services::student_service::StudentAccess,
    utils::validation::require_id,
    AppState,
};

/// Absent phases are kept, `null` clears a manual value, a number pins one.
#[axum::debug_handler]
pub async fn update_grades(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(student_id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateGradesRequest>,
) -> Result<Response> {
    let student_id = require_id("studentId", student_id)?;
    state
        .student_service
        .authorize(&user, student_id, StudentAccess::Manage)
        .await?;
    let overrides = payload.overrides().map_err(Error::BadRequest)?;
    if payload.average.is_some() {
        tracing::debug!(student_id, "ignoring client-supplied average");
    }

    let grade = state
        .phase_average_service
        .apply_overrides(student_id, overrides)
        .await?;
    tracing::info!(student_id, updated_by = %user.id, "phase grades edited");
    Ok(ApiResponse::ok(StudentGradesResponse::from_grade(&grade))
        .with_message("Grades updated")
        .into_response())
}

#[axum::debug_handler]
pub async fn get_grades(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(student_id): AppPath<i64>,
) -> Result<Response> {
    let student_id = require_id("studentId", student_id)?;
    state
        .student_service
        .authorize(&user, student_id, StudentAccess::View)
        .await?;

    let grades = match state.phase_average_service.get_grade(student_id).await? {
        Some(grade) => StudentGradesResponse::from_grade(&grade),
        None => StudentGradesResponse::empty(student_id),
    };
    let results = state.phase_average_service.list_results(student_id).await?;
    Ok(ApiResponse::ok(grades.with_results(results)).into_response())
}

#[axum::debug_handler]
pub async fn recalculate_phase_averages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(student_id): AppPath<i64>,
) -> Result<Response> {
    let student_id = require_id("studentId", student_id)?;
    state
        .student_service
        .authorize(&user, student_id, StudentAccess::Manage)
        .await?;

    let grade = state.phase_average_service.recalculate(student_id).await?;
    Ok(ApiResponse::ok(StudentGradesResponse::from_grade(&grade))
        .with_message("Phase averages recalculated")
        .into_response())
}
