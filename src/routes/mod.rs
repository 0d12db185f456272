pub mod grades;
pub mod health;
pub mod indicators;
pub mod questionnaires;
pub mod quiz;
