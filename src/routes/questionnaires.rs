use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension,
};

use crate::{
    dto::envelope::ApiResponse,
    dto::extract::{AppJson, AppPath, AppQuery},
    dto::questionnaire_dto::{
        CreateQuestionPayload, CreateQuestionnairePayload, QuestionnaireFilter,
        UpdateQuestionPayload,
    },
    dto::quiz_dto::{QuestionView, QuestionnaireWithQuestions},
    error::Result,
    middleware::auth::AuthUser,
    models::user::Role,
    services::questionnaire_service::ensure_owner,
    utils::validation::{require_id, validate},
    AppState,
};

#[axum::debug_handler]
pub async fn create_questionnaire(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(payload): AppJson<CreateQuestionnairePayload>,
) -> Result<Response> {
    user.require_any(&[Role::Teacher])?;
    validate(&payload)?;

    let (questionnaire, questions) = state.questionnaire_service.create(payload, user.id).await?;
    let response = QuestionnaireWithQuestions {
        questionnaire,
        questions: questions
            .into_iter()
            .map(|q| QuestionView::from_question(q, true))
            .collect(),
    };
    Ok(ApiResponse::ok(response)
        .with_message("Questionnaire created")
        .created())
}

#[axum::debug_handler]
pub async fn list_questionnaires(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<QuestionnaireFilter>,
) -> Result<Response> {
    let rows = state.questionnaire_service.list(filter).await?;
    Ok(ApiResponse::ok(rows).into_response())
}

#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(questionnaire_id): AppPath<i64>,
    AppJson(payload): AppJson<CreateQuestionPayload>,
) -> Result<Response> {
    user.require_any(&[Role::Teacher])?;
    let questionnaire_id = require_id("questionnaireId", questionnaire_id)?;
    let questionnaire = state.questionnaire_service.get(questionnaire_id).await?;
    ensure_owner(&user, &questionnaire)?;
    validate(&payload)?;

    let question = state
        .questionnaire_service
        .add_question(questionnaire_id, payload)
        .await?;
    Ok(ApiResponse::ok(QuestionView::from_question(question, true))
        .with_message("Question added")
        .created())
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(question_id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateQuestionPayload>,
) -> Result<Response> {
    user.require_any(&[Role::Teacher])?;
    let question_id = require_id("questionId", question_id)?;
    let current = state.questionnaire_service.get_question(question_id).await?;
    let questionnaire = state
        .questionnaire_service
        .get(current.questionnaire_id)
        .await?;
    ensure_owner(&user, &questionnaire)?;
    validate(&payload)?;

    let question = state
        .questionnaire_service
        .update_question(question_id, payload)
        .await?;
    Ok(ApiResponse::ok(QuestionView::from_question(question, true))
        .with_message("Question updated")
        .into_response())
}
