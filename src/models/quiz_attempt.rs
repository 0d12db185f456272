use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizAttempt {
    pub id: i64,
    pub student_id: i64,
    pub questionnaire_id: i64,
    pub attempt_number: i16,
    pub score: Decimal,
    pub correct_count: i32,
    pub total_questions: i32,
    pub answers: JsonValue,
    pub phase: i16,
    pub manually_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
