use crate::error::Result;
use crate::models::evaluation_result::{EvaluationResult, PhasedResult};
use crate::models::student_grade::{phase_index, StudentPhaseGrade, PHASE_COUNT};
use crate::services::student_service::StudentService;
use crate::utils::score::mean_of_present;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

/// Teacher-requested change to one phase slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseOverride {
    #[default]
    Keep,
    /// Drops the manual flag; the slot falls back to the computed value.
    Clear,
    Set(Decimal),
}

pub const NO_OVERRIDES: [PhaseOverride; PHASE_COUNT] = [PhaseOverride::Keep; PHASE_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseSlots {
    pub values: [Option<Decimal>; PHASE_COUNT],
    pub manual: [bool; PHASE_COUNT],
    pub average: Option<Decimal>,
}

impl PhaseSlots {
    pub fn new(values: [Option<Decimal>; PHASE_COUNT], manual: [bool; PHASE_COUNT]) -> Self {
        Self {
            values,
            manual,
            average: mean_of_present(values),
        }
    }

    pub fn from_row(row: &StudentPhaseGrade) -> Self {
        Self {
            values: row.values(),
            manual: row.manual_flags(),
            average: row.average,
        }
    }
}

/// Per-phase mean of best scores; a phase without results stays empty.
pub fn system_phase_values(results: &[PhasedResult]) -> [Option<Decimal>; PHASE_COUNT] {
    let mut buckets: [Vec<Decimal>; PHASE_COUNT] = Default::default();
    for r in results {
        match phase_index(r.phase) {
            Some(i) => buckets[i].push(r.best_score),
            None => tracing::warn!(
                questionnaire_id = r.questionnaire_id,
                phase = r.phase,
                "ignoring result with out-of-range phase"
            ),
        }
    }
    buckets.map(|scores| mean_of_present(scores.into_iter().map(Some)))
}

/// Merges computed phase values into the stored row. Manual slots win over
/// computed ones; overrides are applied before the merge.
pub fn compose(
    system: [Option<Decimal>; PHASE_COUNT],
    existing: Option<&PhaseSlots>,
    overrides: &[PhaseOverride; PHASE_COUNT],
) -> PhaseSlots {
    let base = existing.copied().unwrap_or_default();
    let mut values = [None; PHASE_COUNT];
    let mut manual = [false; PHASE_COUNT];

    for i in 0..PHASE_COUNT {
        match overrides[i] {
            PhaseOverride::Set(v) => {
                values[i] = Some(v);
                manual[i] = true;
            }
            PhaseOverride::Clear => {
                values[i] = system[i];
            }
            PhaseOverride::Keep if base.manual[i] => {
                values[i] = base.values[i];
                manual[i] = true;
            }
            PhaseOverride::Keep => {
                values[i] = system[i];
            }
        }
    }

    PhaseSlots::new(values, manual)
}

#[derive(Clone)]
pub struct PhaseAverageService {
    pool: PgPool,
}

impl PhaseAverageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// On-demand recalculation for one student.
    pub async fn recalculate(&self, student_id: i64) -> Result<StudentPhaseGrade> {
        self.apply_overrides(student_id, NO_OVERRIDES).await
    }

    pub async fn apply_overrides(
        &self,
        student_id: i64,
        overrides: [PhaseOverride; PHASE_COUNT],
    ) -> Result<StudentPhaseGrade> {
        let mut tx = self.pool.begin().await?;
        StudentService::lock_student(&mut *tx, student_id).await?;
        let grade = Self::recompute_in_tx(&mut *tx, student_id, &overrides).await?;
        tx.commit().await?;
        Ok(grade)
    }

    /// Refreshes best scores and the phase row inside the caller's
    /// transaction. The caller must hold the student row lock.
    pub async fn recompute_in_tx(
        conn: &mut PgConnection,
        student_id: i64,
        overrides: &[PhaseOverride; PHASE_COUNT],
    ) -> Result<StudentPhaseGrade> {
        Self::refresh_evaluation_results(&mut *conn, student_id).await?;

        let results = sqlx::query_as::<_, PhasedResult>(
            r#"
            SELECT er.questionnaire_id, q.phase, er.best_score
            FROM evaluation_results er
            JOIN questionnaires q ON q.id = er.questionnaire_id
            WHERE er.student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_all(&mut *conn)
        .await?;

        let existing = sqlx::query_as::<_, StudentPhaseGrade>(
            r#"SELECT * FROM student_grades WHERE student_id = $1 FOR UPDATE"#,
        )
        .bind(student_id)
        .fetch_optional(&mut *conn)
        .await?;

        let existing_slots = existing.as_ref().map(PhaseSlots::from_row);
        let next = compose(
            system_phase_values(&results),
            existing_slots.as_ref(),
            overrides,
        );

        if let Some(row) = existing {
            if existing_slots == Some(next) {
                tracing::debug!(student_id, "phase grades unchanged");
                return Ok(row);
            }
        }

        let stored = Self::store(&mut *conn, student_id, &next).await?;
        tracing::info!(
            student_id,
            average = ?stored.average,
            "phase grades recomputed"
        );
        Ok(stored)
    }

    async fn refresh_evaluation_results(conn: &mut PgConnection, student_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO evaluation_results (student_id, questionnaire_id, best_score, attempt_number, recorded_at)
            SELECT DISTINCT ON (questionnaire_id)
                student_id, questionnaire_id, score, attempt_number, NOW()
            FROM quiz_attempts
            WHERE student_id = $1
            ORDER BY questionnaire_id, score DESC, attempt_number ASC
            ON CONFLICT (student_id, questionnaire_id) DO UPDATE
            SET best_score = EXCLUDED.best_score,
                attempt_number = EXCLUDED.attempt_number,
                recorded_at = EXCLUDED.recorded_at
            WHERE evaluation_results.best_score IS DISTINCT FROM EXCLUDED.best_score
               OR evaluation_results.attempt_number IS DISTINCT FROM EXCLUDED.attempt_number
            "#,
        )
        .bind(student_id)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM evaluation_results er
            WHERE er.student_id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM quiz_attempts qa
                  WHERE qa.student_id = er.student_id
                    AND qa.questionnaire_id = er.questionnaire_id
              )
            "#,
        )
        .bind(student_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn store(
        conn: &mut PgConnection,
        student_id: i64,
        slots: &PhaseSlots,
    ) -> Result<StudentPhaseGrade> {
        let row = sqlx::query_as::<_, StudentPhaseGrade>(
            r#"
            INSERT INTO student_grades (
                student_id, phase1, phase2, phase3, phase4,
                phase1_manual, phase2_manual, phase3_manual, phase4_manual,
                average, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            ON CONFLICT (student_id) DO UPDATE
            SET phase1 = EXCLUDED.phase1,
                phase2 = EXCLUDED.phase2,
                phase3 = EXCLUDED.phase3,
                phase4 = EXCLUDED.phase4,
                phase1_manual = EXCLUDED.phase1_manual,
                phase2_manual = EXCLUDED.phase2_manual,
                phase3_manual = EXCLUDED.phase3_manual,
                phase4_manual = EXCLUDED.phase4_manual,
                average = EXCLUDED.average,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(slots.values[0])
        .bind(slots.values[1])
        .bind(slots.values[2])
        .bind(slots.values[3])
        .bind(slots.manual[0])
        .bind(slots.manual[1])
        .bind(slots.manual[2])
        .bind(slots.manual[3])
        .bind(slots.average)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn get_grade(&self, student_id: i64) -> Result<Option<StudentPhaseGrade>> {
        let row = sqlx::query_as::<_, StudentPhaseGrade>(
            r#"SELECT * FROM student_grades WHERE student_id = $1"#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_results(&self, student_id: i64) -> Result<Vec<EvaluationResult>> {
        let rows = sqlx::query_as::<_, EvaluationResult>(
            r#"
            SELECT * FROM evaluation_results
            WHERE student_id = $1
            ORDER BY questionnaire_id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
