use crate::database::pool::{sqlstate, CHECK_VIOLATION, UNIQUE_VIOLATION};
use crate::error::{Error, Result};
use crate::models::quiz_attempt::QuizAttempt;
use crate::models::student_grade::StudentPhaseGrade;
use crate::services::grading_service::{GradeOutcome, GradingService};
use crate::services::phase_average_service::{PhaseAverageService, NO_OVERRIDES};
use crate::services::questionnaire_service::QuestionnaireService;
use crate::services::student_service::StudentService;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;

/// Attempts allowed per (student, questionnaire).
pub const MAX_ATTEMPTS: i64 = 2;

/// Number the next attempt gets, or `AttemptLimit` once the cap is used up.
pub fn next_attempt_number(prior_attempts: i64) -> Result<i16> {
    if prior_attempts >= MAX_ATTEMPTS {
        return Err(Error::AttemptLimit);
    }
    Ok((prior_attempts.max(0) + 1) as i16)
}

#[derive(Debug, Clone)]
pub struct SubmitQuiz {
    pub student_id: i64,
    pub questionnaire_id: i64,
    pub answers: HashMap<i64, i16>,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub attempt: QuizAttempt,
    pub grading: GradeOutcome,
    pub grade: StudentPhaseGrade,
}

impl SubmissionOutcome {
    pub fn phase_average(&self) -> Option<Decimal> {
        self.grade.phase(self.attempt.phase)
    }

    pub fn attempts_remaining(&self) -> i64 {
        (MAX_ATTEMPTS - i64::from(self.attempt.attempt_number)).max(0)
    }
}

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grades and stores one submission, then refreshes best scores and
    /// phase grades. Everything runs in one transaction; any failure leaves
    /// no attempt behind.
    pub async fn submit(&self, req: SubmitQuiz) -> Result<SubmissionOutcome> {
        GradingService::validate_answers(&req.answers)?;

        let mut tx = self.pool.begin().await?;
        StudentService::lock_student(&mut *tx, req.student_id).await?;

        let questionnaire =
            QuestionnaireService::find_questionnaire(&mut *tx, req.questionnaire_id).await?;

        let prior: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM quiz_attempts WHERE student_id = $1 AND questionnaire_id = $2"#,
        )
        .bind(req.student_id)
        .bind(req.questionnaire_id)
        .fetch_one(&mut *tx)
        .await?;

        let attempt_number = match next_attempt_number(prior) {
            Ok(n) => n,
            Err(e) => {
                tracing::info!(
                    student_id = req.student_id,
                    questionnaire_id = req.questionnaire_id,
                    prior,
                    "attempt limit reached"
                );
                return Err(e);
            }
        };

        let questions = QuestionnaireService::find_questions(&mut *tx, questionnaire.id).await?;
        let grading = GradingService::grade(&questions, &req.answers)?;

        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            INSERT INTO quiz_attempts (
                student_id, questionnaire_id, attempt_number, score,
                correct_count, total_questions, answers, phase
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(req.student_id)
        .bind(questionnaire.id)
        .bind(attempt_number)
        .bind(grading.score)
        .bind(grading.correct)
        .bind(grading.total)
        .bind(grading.answers_snapshot())
        .bind(questionnaire.phase)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        let grade =
            PhaseAverageService::recompute_in_tx(&mut *tx, req.student_id, &NO_OVERRIDES).await?;
        tx.commit().await?;

        tracing::info!(
            attempt_id = attempt.id,
            student_id = attempt.student_id,
            questionnaire_id = attempt.questionnaire_id,
            attempt_number = attempt.attempt_number,
            score = %attempt.score,
            "quiz attempt graded"
        );

        Ok(SubmissionOutcome {
            attempt,
            grading,
            grade,
        })
    }

    pub async fn list_attempts(
        &self,
        student_id: i64,
        questionnaire_id: i64,
    ) -> Result<Vec<QuizAttempt>> {
        let rows = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE student_id = $1 AND questionnaire_id = $2
            ORDER BY attempt_number
            "#,
        )
        .bind(student_id)
        .bind(questionnaire_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_attempt(&self, attempt_id: i64) -> Result<QuizAttempt> {
        sqlx::query_as::<_, QuizAttempt>(r#"SELECT * FROM quiz_attempts WHERE id = $1"#)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz attempt {} not found", attempt_id)))
    }

    /// Replaces an attempt's score by hand and recomputes the student's
    /// best scores and phase grades.
    pub async fn override_score(
        &self,
        attempt_id: i64,
        student_id: i64,
        score: Decimal,
    ) -> Result<(QuizAttempt, StudentPhaseGrade)> {
        let mut tx = self.pool.begin().await?;
        StudentService::lock_student(&mut *tx, student_id).await?;

        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            UPDATE quiz_attempts
            SET score = $2, manually_edited = TRUE, updated_at = NOW()
            WHERE id = $1 AND student_id = $3
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .bind(score)
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Quiz attempt {} not found", attempt_id)))?;

        let grade = PhaseAverageService::recompute_in_tx(&mut *tx, student_id, &NO_OVERRIDES).await?;
        tx.commit().await?;

        tracing::info!(attempt_id, student_id, score = %score, "attempt score overridden");
        Ok((attempt, grade))
    }
}

fn map_insert_error(err: sqlx::Error) -> Error {
    match sqlstate(&err).as_deref() {
        Some(UNIQUE_VIOLATION) => Error::Conflict(
            "Another submission for this questionnaire was recorded at the same time; reload and try again"
                .to_string(),
        ),
        Some(CHECK_VIOLATION) => Error::AttemptLimit,
        _ => err.into(),
    }
}
