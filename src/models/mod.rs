pub mod evaluation_result;
pub mod indicator;
pub mod question;
pub mod questionnaire;
pub mod quiz_attempt;
pub mod student;
pub mod student_grade;
pub mod user;
