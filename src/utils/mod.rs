pub mod score;
pub mod token;
pub mod validation;
