use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Indicator {
    pub id: i64,
    pub description: String,
    pub subject: String,
    pub phase: i16,
    pub grade: String,
    pub questionnaire_id: Option<i64>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Assignment joined with its indicator text, as listed for a student.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentIndicatorView {
    pub indicator_id: i64,
    pub description: String,
    pub subject: String,
    pub phase: i16,
    pub achieved: bool,
    pub source: String,
    pub evaluated_at: DateTime<Utc>,
}
