pub mod attempt_service;
pub mod grading_service;
pub mod indicator_service;
pub mod phase_average_service;
pub mod questionnaire_service;
pub mod student_service;
