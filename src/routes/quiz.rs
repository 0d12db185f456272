use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::json;

use crate::{
    dto::envelope::ApiResponse,
    dto::extract::{AppJson, AppPath},
    dto::grade_dto::StudentGradesResponse,
    dto::quiz_dto::{
        AttemptsResponse, OverrideAttemptRequest, QuestionView, QuestionnaireWithQuestions,
        SubmitQuizRequest, SubmitQuizResponse,
    },
    error::{Error, Result},
    middleware::auth::AuthUser,
    models::user::Role,
    services::attempt_service::{SubmitQuiz, MAX_ATTEMPTS},
    services::student_service::StudentAccess,
    utils::score::score_from_f64,
    utils::validation::{require_id, validate},
    AppState,
};

#[axum::debug_handler]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(payload): AppJson<SubmitQuizRequest>,
) -> Result<Response> {
    validate(&payload)?;
    state
        .student_service
        .authorize(&user, payload.student_id, StudentAccess::Submit)
        .await?;

    let outcome = state
        .attempt_service
        .submit(SubmitQuiz {
            student_id: payload.student_id,
            questionnaire_id: payload.questionnaire_id,
            answers: payload.answers,
        })
        .await?;

    let response = SubmitQuizResponse {
        attempt_id: outcome.attempt.id,
        attempt_number: outcome.attempt.attempt_number,
        attempts_remaining: outcome.attempts_remaining(),
        score: outcome.attempt.score,
        correct: outcome.grading.correct,
        total: outcome.grading.total,
        phase: outcome.attempt.phase,
        phase_average: outcome.phase_average(),
        overall_average: outcome.grade.average,
    };
    Ok(ApiResponse::ok(response)
        .with_message("Quiz submitted")
        .created())
}

#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath((student_id, questionnaire_id)): AppPath<(i64, i64)>,
) -> Result<Response> {
    let student_id = require_id("studentId", student_id)?;
    let questionnaire_id = require_id("questionnaireId", questionnaire_id)?;
    state
        .student_service
        .authorize(&user, student_id, StudentAccess::View)
        .await?;

    let attempts = state
        .attempt_service
        .list_attempts(student_id, questionnaire_id)
        .await?;
    let best_score = attempts.iter().map(|a| a.score).max();
    let response = AttemptsResponse {
        count: attempts.len(),
        max_attempts: MAX_ATTEMPTS,
        best_score,
        attempts,
    };
    Ok(ApiResponse::ok(response).into_response())
}

/// Students get the questions without the answer key.
#[axum::debug_handler]
pub async fn get_questions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(questionnaire_id): AppPath<i64>,
) -> Result<Response> {
    let questionnaire_id = require_id("questionnaireId", questionnaire_id)?;
    let (questionnaire, questions) = state
        .questionnaire_service
        .get_with_questions(questionnaire_id)
        .await?;

    let reveal = user.role != Role::Student;
    let response = QuestionnaireWithQuestions {
        questionnaire,
        questions: questions
            .into_iter()
            .map(|q| QuestionView::from_question(q, reveal))
            .collect(),
    };
    Ok(ApiResponse::ok(response).into_response())
}

#[axum::debug_handler]
pub async fn override_attempt(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(attempt_id): AppPath<i64>,
    AppJson(payload): AppJson<OverrideAttemptRequest>,
) -> Result<Response> {
    user.require_any(&[Role::Teacher])?;
    let attempt_id = require_id("attemptId", attempt_id)?;

    // Non-admins cannot tell a missing attempt from someone else's.
    let existing = match state.attempt_service.get_attempt(attempt_id).await {
        Ok(attempt) => attempt,
        Err(Error::NotFound(_)) if !user.is_admin() => {
            return Err(Error::Forbidden(format!(
                "Not allowed to edit attempt {}",
                attempt_id
            )))
        }
        Err(e) => return Err(e),
    };
    state
        .student_service
        .authorize(&user, existing.student_id, StudentAccess::Manage)
        .await?;

    validate(&payload)?;
    let score = score_from_f64(payload.score)
        .ok_or_else(|| Error::BadRequest("score must be a number between 0 and 5".to_string()))?;

    let (attempt, grade) = state
        .attempt_service
        .override_score(attempt_id, existing.student_id, score)
        .await?;
    let body = json!({
        "attempt": attempt,
        "grades": StudentGradesResponse::from_grade(&grade),
    });
    Ok(ApiResponse::ok(body)
        .with_message("Attempt score updated")
        .into_response())
}
