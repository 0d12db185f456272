use crate::models::question::Question;
use crate::models::questionnaire::Questionnaire;
use crate::models::quiz_attempt::QuizAttempt;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    #[validate(range(min = 1))]
    pub student_id: i64,
    #[validate(range(min = 1))]
    pub questionnaire_id: i64,
    /// question_id → selected option (1-4). JSON object keys are the ids.
    #[serde(default)]
    pub answers: HashMap<i64, i16>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub attempt_id: i64,
    pub attempt_number: i16,
    pub attempts_remaining: i64,
    pub score: Decimal,
    pub correct: i32,
    pub total: i32,
    pub phase: i16,
    pub phase_average: Option<Decimal>,
    pub overall_average: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptsResponse {
    pub attempts: Vec<QuizAttempt>,
    pub count: usize,
    pub max_attempts: i64,
    pub best_score: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OverrideAttemptRequest {
    #[validate(range(min = 0.0, max = 5.0))]
    pub score: f64,
}

/// Question as served to quiz takers; the answer key is only present for
/// staff.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: i64,
    pub position: i32,
    pub text: String,
    pub options: Vec<String>,
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<i16>,
    pub updated_at: DateTime<Utc>,
}

impl QuestionView {
    pub fn from_question(q: Question, reveal_answer: bool) -> Self {
        Self {
            id: q.id,
            position: q.position,
            options: q.options().iter().map(|o| o.to_string()).collect(),
            text: q.text,
            image_url: q.image_url,
            correct_answer: reveal_answer.then_some(q.correct_answer),
            updated_at: q.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionnaireWithQuestions {
    pub questionnaire: Questionnaire,
    pub questions: Vec<QuestionView>,
}
