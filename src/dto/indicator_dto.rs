use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateIndicatorPayload {
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1))]
    pub subject: String,
    #[validate(range(min = 1, max = 4))]
    pub phase: i16,
    #[validate(length(min = 1))]
    pub grade: String,
    pub questionnaire_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndicatorFilter {
    pub phase: Option<i16>,
    pub grade: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorAssignment {
    pub indicator_id: i64,
    pub achieved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignIndicatorsPayload {
    #[validate(length(min = 1, max = 500))]
    pub indicators: Vec<IndicatorAssignment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorEvaluationResponse {
    pub evaluated: usize,
    pub achieved: usize,
    pub passing_score: rust_decimal::Decimal,
}
