use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationResult {
    pub student_id: i64,
    pub questionnaire_id: i64,
    pub best_score: Decimal,
    pub attempt_number: i16,
    pub recorded_at: DateTime<Utc>,
}

/// Evaluation result joined with the phase of its questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PhasedResult {
    pub questionnaire_id: i64,
    pub phase: i16,
    pub best_score: Decimal,
}
