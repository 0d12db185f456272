use crate::dto::indicator_dto::{CreateIndicatorPayload, IndicatorAssignment, IndicatorFilter};
use crate::error::{Error, Result};
use crate::models::indicator::{Indicator, StudentIndicatorView};
use crate::services::questionnaire_service::QuestionnaireService;
use crate::services::student_service::StudentService;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

pub fn indicator_achieved(best_score: Decimal, passing_score: Decimal) -> bool {
    best_score >= passing_score
}

/// Collapses repeated indicator ids; the last entry wins.
pub fn dedupe_assignments(assignments: &[IndicatorAssignment]) -> (Vec<i64>, Vec<bool>) {
    let merged: BTreeMap<i64, bool> = assignments
        .iter()
        .map(|a| (a.indicator_id, a.achieved))
        .collect();
    merged.into_iter().unzip()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub evaluated: usize,
    pub achieved: usize,
}

/// Tallies the `achieved` flags of the rows an evaluation wrote.
pub fn summarize(written: &[bool]) -> EvaluationSummary {
    EvaluationSummary {
        evaluated: written.len(),
        achieved: written.iter().filter(|a| **a).count(),
    }
}

#[derive(Clone)]
pub struct IndicatorService {
    pool: PgPool,
}

impl IndicatorService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, payload: CreateIndicatorPayload, created_by: Uuid) -> Result<Indicator> {
        if let Some(questionnaire_id) = payload.questionnaire_id {
            QuestionnaireService::find_questionnaire(&self.pool, questionnaire_id).await?;
        }

        let indicator = sqlx::query_as::<_, Indicator>(
            r#"
            INSERT INTO indicators (description, subject, phase, grade, questionnaire_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(payload.description.trim())
        .bind(payload.subject.trim())
        .bind(payload.phase)
        .bind(payload.grade.trim())
        .bind(payload.questionnaire_id)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(indicator)
    }

    pub async fn list(&self, filter: IndicatorFilter) -> Result<Vec<Indicator>> {
        let rows = sqlx::query_as::<_, Indicator>(
            r#"
            SELECT * FROM indicators
            WHERE ($1::smallint IS NULL OR phase = $1)
              AND ($2::text IS NULL OR grade = $2)
              AND ($3::text IS NULL OR subject = $3)
            ORDER BY phase, subject, id
            "#,
        )
        .bind(filter.phase)
        .bind(filter.grade)
        .bind(filter.subject)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_for_student(&self, student_id: i64) -> Result<Vec<StudentIndicatorView>> {
        Self::fetch_for_student(&self.pool, student_id).await
    }

    async fn fetch_for_student<'e, E>(exec: E, student_id: i64) -> Result<Vec<StudentIndicatorView>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, StudentIndicatorView>(
            r#"
            SELECT si.indicator_id, i.description, i.subject, i.phase,
                   si.achieved, si.source, si.evaluated_at
            FROM student_indicators si
            JOIN indicators i ON i.id = si.indicator_id
            WHERE si.student_id = $1
            ORDER BY i.phase, i.subject, i.id
            "#,
        )
        .bind(student_id)
        .fetch_all(exec)
        .await?;
        Ok(rows)
    }

    /// Upserts all assignments in one statement inside one transaction.
    pub async fn assign(
        &self,
        student_id: i64,
        assignments: &[IndicatorAssignment],
        evaluated_by: Uuid,
    ) -> Result<Vec<StudentIndicatorView>> {
        let (ids, achieved) = dedupe_assignments(assignments);

        let mut tx = self.pool.begin().await?;
        StudentService::lock_student(&mut *tx, student_id).await?;
        Self::ensure_indicators_exist(&mut *tx, &ids).await?;

        sqlx::query(
            r#"
            INSERT INTO student_indicators (student_id, indicator_id, achieved, source, evaluated_by, evaluated_at)
            SELECT $1, t.indicator_id, t.achieved, 'manual', $4, NOW()
            FROM UNNEST($2::bigint[], $3::bool[]) AS t(indicator_id, achieved)
            ON CONFLICT (student_id, indicator_id) DO UPDATE
            SET achieved = EXCLUDED.achieved,
                source = 'manual',
                evaluated_by = EXCLUDED.evaluated_by,
                evaluated_at = NOW()
            "#,
        )
        .bind(student_id)
        .bind(ids.as_slice())
        .bind(achieved.as_slice())
        .bind(evaluated_by)
        .execute(&mut *tx)
        .await?;

        let rows = Self::fetch_for_student(&mut *tx, student_id).await?;
        tx.commit().await?;

        tracing::info!(student_id, assigned = ids.len(), "indicators assigned");
        Ok(rows)
    }

    /// Marks questionnaire-linked indicators achieved when the student's best
    /// score reaches `passing_score`. Manual assignments are left alone.
    pub async fn evaluate(
        &self,
        student_id: i64,
        passing_score: Decimal,
        evaluated_by: Uuid,
    ) -> Result<EvaluationSummary> {
        let mut tx = self.pool.begin().await?;
        StudentService::lock_student(&mut *tx, student_id).await?;

        let candidates: Vec<(i64, Decimal)> = sqlx::query_as(
            r#"
            SELECT i.id, er.best_score
            FROM indicators i
            JOIN evaluation_results er
              ON er.questionnaire_id = i.questionnaire_id AND er.student_id = $1
            ORDER BY i.id
            "#,
        )
        .bind(student_id)
        .fetch_all(&mut *tx)
        .await?;

        let ids: Vec<i64> = candidates.iter().map(|(id, _)| *id).collect();
        let achieved: Vec<bool> = candidates
            .iter()
            .map(|(_, best)| indicator_achieved(*best, passing_score))
            .collect();

        // Rows held by a manual assignment are not written and not counted.
        let written: Vec<bool> = if ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_scalar(
                r#"
                INSERT INTO student_indicators (student_id, indicator_id, achieved, source, evaluated_by, evaluated_at)
                SELECT $1, t.indicator_id, t.achieved, 'system', $4, NOW()
                FROM UNNEST($2::bigint[], $3::bool[]) AS t(indicator_id, achieved)
                ON CONFLICT (student_id, indicator_id) DO UPDATE
                SET achieved = EXCLUDED.achieved,
                    evaluated_by = EXCLUDED.evaluated_by,
                    evaluated_at = NOW()
                WHERE student_indicators.source = 'system'
                RETURNING achieved
                "#,
            )
            .bind(student_id)
            .bind(ids.as_slice())
            .bind(achieved.as_slice())
            .bind(evaluated_by)
            .fetch_all(&mut *tx)
            .await?
        };
        tx.commit().await?;

        let summary = summarize(&written);
        tracing::info!(
            student_id,
            evaluated = summary.evaluated,
            achieved = summary.achieved,
            "indicators evaluated"
        );
        Ok(summary)
    }

    async fn ensure_indicators_exist(conn: &mut PgConnection, ids: &[i64]) -> Result<()> {
        let found: Vec<i64> = sqlx::query_scalar(r#"SELECT id FROM indicators WHERE id = ANY($1)"#)
            .bind(ids)
            .fetch_all(&mut *conn)
            .await?;
        let found: HashSet<i64> = found.into_iter().collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(*id))
            .map(|id| id.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::NotFound(format!(
                "Indicators not found: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn passing_threshold_is_inclusive() {
        let passing = Decimal::from_str("3.0").unwrap();
        assert!(indicator_achieved(Decimal::from_str("3.00").unwrap(), passing));
        assert!(indicator_achieved(Decimal::from(5), passing));
        assert!(!indicator_achieved(Decimal::from_str("2.99").unwrap(), passing));
    }

    #[test]
    fn summary_counts_only_written_rows() {
        assert_eq!(
            summarize(&[true, false, true]),
            EvaluationSummary { evaluated: 3, achieved: 2 }
        );
        assert_eq!(summarize(&[]), EvaluationSummary { evaluated: 0, achieved: 0 });
    }

    #[test]
    fn repeated_indicators_keep_the_last_entry() {
        let (ids, achieved) = dedupe_assignments(&[
            IndicatorAssignment { indicator_id: 4, achieved: true },
            IndicatorAssignment { indicator_id: 2, achieved: true },
            IndicatorAssignment { indicator_id: 4, achieved: false },
        ]);
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(achieved, vec![true, false]);
    }
}
