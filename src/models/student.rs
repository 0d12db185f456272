use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub name: String,
    pub grade: String,
    pub created_at: DateTime<Utc>,
}
