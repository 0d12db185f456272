use crate::error::{Error, Result};
use crate::models::question::{is_valid_option, Question};
use crate::utils::score::{round_score, MAX_SCORE};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected: Option<i16>,
    pub correct_answer: i16,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct GradeOutcome {
    pub correct: i32,
    pub total: i32,
    pub score: Decimal,
    pub graded: Vec<GradedAnswer>,
}

impl GradeOutcome {
    /// What gets persisted on the attempt row, so a later question edit
    /// never changes how this attempt reads.
    pub fn answers_snapshot(&self) -> JsonValue {
        json!({
            "correct": self.correct,
            "total": self.total,
            "graded": self.graded,
        })
    }
}

pub struct GradingService;

impl GradingService {
    pub fn validate_answers(answers: &HashMap<i64, i16>) -> Result<()> {
        if let Some((question_id, option)) = answers.iter().find(|(_, o)| !is_valid_option(**o)) {
            return Err(Error::BadRequest(format!(
                "Answer for question {} must be an option between 1 and 4, got {}",
                question_id, option
            )));
        }
        Ok(())
    }

    /// Scores a submission on the 0-5 scale. Unanswered questions count as
    /// incorrect; answers for questions outside the questionnaire are ignored.
    pub fn grade(questions: &[Question], answers: &HashMap<i64, i16>) -> Result<GradeOutcome> {
        if questions.is_empty() {
            return Err(Error::BadRequest(
                "Questionnaire has no questions and cannot be graded".to_string(),
            ));
        }
        Self::validate_answers(answers)?;

        let graded: Vec<GradedAnswer> = questions
            .iter()
            .map(|q| {
                let selected = answers.get(&q.id).copied();
                GradedAnswer {
                    question_id: q.id,
                    selected,
                    correct_answer: q.correct_answer,
                    is_correct: selected == Some(q.correct_answer),
                }
            })
            .collect();

        let correct = graded.iter().filter(|g| g.is_correct).count() as i32;
        let total = questions.len() as i32;
        let score = scale_score(correct, total)?;

        Ok(GradeOutcome {
            correct,
            total,
            score,
            graded,
        })
    }
}

pub fn scale_score(correct: i32, total: i32) -> Result<Decimal> {
    if total <= 0 {
        return Err(Error::BadRequest(
            "Cannot score a questionnaire without questions".to_string(),
        ));
    }
    if correct < 0 || correct > total {
        return Err(Error::Internal(format!(
            "correct count {} outside 0..={}",
            correct, total
        )));
    }
    let raw = Decimal::from(correct) * Decimal::from(MAX_SCORE) / Decimal::from(total);
    Ok(round_score(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;
    use tokio_test::assert_err;

    fn question(id: i64, correct_answer: i16) -> Question {
        Question {
            id,
            questionnaire_id: 1,
            position: id as i32,
            text: format!("Question {}", id),
            option1: "a".into(),
            option2: "b".into(),
            option3: "c".into(),
            option4: "d".into(),
            correct_answer,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn three_of_four_scores_three_seventy_five() {
        let questions = vec![question(1, 1), question(2, 2), question(3, 3), question(4, 4)];
        let answers = HashMap::from([(1, 1), (2, 2), (3, 3), (4, 1)]);
        let outcome = GradingService::grade(&questions, &answers).unwrap();
        assert_eq!(outcome.correct, 3);
        assert_eq!(outcome.total, 4);
        assert_eq!(outcome.score, d("3.75"));
    }

    #[test]
    fn all_correct_scores_five() {
        let questions = vec![question(1, 1), question(2, 2), question(3, 3), question(4, 4)];
        let answers = HashMap::from([(1, 1), (2, 2), (3, 3), (4, 4)]);
        let outcome = GradingService::grade(&questions, &answers).unwrap();
        assert_eq!(outcome.score, d("5"));
    }

    #[test]
    fn unanswered_questions_count_as_incorrect() {
        let questions = vec![question(1, 2), question(2, 2), question(3, 2)];
        let answers = HashMap::from([(1, 2)]);
        let outcome = GradingService::grade(&questions, &answers).unwrap();
        assert_eq!(outcome.correct, 1);
        assert_eq!(outcome.score, d("1.67"));
        assert!(outcome.graded.iter().filter(|g| g.selected.is_none()).all(|g| !g.is_correct));
    }

    #[test]
    fn answers_for_foreign_questions_are_ignored() {
        let questions = vec![question(10, 4)];
        let answers = HashMap::from([(10, 4), (99, 1)]);
        let outcome = GradingService::grade(&questions, &answers).unwrap();
        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.score, d("5"));
    }

    #[test]
    fn empty_questionnaire_is_rejected() {
        let err = assert_err!(GradingService::grade(&[], &HashMap::new()));
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        let questions = vec![question(1, 1)];
        let err = assert_err!(GradingService::grade(&questions, &HashMap::from([(1, 5)])));
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn score_stays_on_scale_for_every_count() {
        for total in 1..=12 {
            for correct in 0..=total {
                let score = scale_score(correct, total).unwrap();
                assert!(score >= Decimal::ZERO && score <= Decimal::from(5));
                assert!(score.scale() <= 2);
            }
        }
        assert_eq!(scale_score(1, 8).unwrap(), d("0.63"));
    }

    #[test]
    fn snapshot_records_the_breakdown() {
        let questions = vec![question(1, 3)];
        let outcome = GradingService::grade(&questions, &HashMap::from([(1, 2)])).unwrap();
        let snapshot = outcome.answers_snapshot();
        assert_eq!(snapshot["correct"], 0);
        assert_eq!(snapshot["graded"][0]["selected"], 2);
        assert_eq!(snapshot["graded"][0]["correct_answer"], 3);
    }
}
