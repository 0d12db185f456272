pub mod envelope;
pub mod extract;
pub mod grade_dto;
pub mod indicator_dto;
pub mod questionnaire_dto;
pub mod quiz_dto;
