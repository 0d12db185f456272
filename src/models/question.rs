use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const OPTION_COUNT: i16 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub questionnaire_id: i64,
    pub position: i32,
    pub text: String,
    pub option1: String,
    pub option2: String,
    pub option3: String,
    pub option4: String,
    pub correct_answer: i16,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn options(&self) -> [&str; 4] {
        [
            self.option1.as_str(),
            self.option2.as_str(),
            self.option3.as_str(),
            self.option4.as_str(),
        ]
    }
}

pub fn is_valid_option(option: i16) -> bool {
    (1..=OPTION_COUNT).contains(&option)
}
