use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    #[validate(length(min = 1))]
    pub text: String,
    #[validate(length(equal = 4))]
    pub options: Vec<String>,
    #[validate(range(min = 1, max = 4))]
    pub correct_answer: i16,
    #[validate(url)]
    pub image_url: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionnairePayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1, max = 4))]
    pub phase: i16,
    #[validate(length(min = 1))]
    pub grade: String,
    #[validate(length(min = 1))]
    pub category: String,
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<CreateQuestionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateQuestionPayload {
    #[validate(length(min = 1))]
    pub text: Option<String>,
    #[validate(length(equal = 4))]
    pub options: Option<Vec<String>>,
    #[validate(range(min = 1, max = 4))]
    pub correct_answer: Option<i16>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionnaireFilter {
    pub phase: Option<i16>,
    pub grade: Option<String>,
    pub category: Option<String>,
}
