use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const PHASE_COUNT: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentPhaseGrade {
    pub student_id: i64,
    pub phase1: Option<Decimal>,
    pub phase2: Option<Decimal>,
    pub phase3: Option<Decimal>,
    pub phase4: Option<Decimal>,
    pub phase1_manual: bool,
    pub phase2_manual: bool,
    pub phase3_manual: bool,
    pub phase4_manual: bool,
    pub average: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl StudentPhaseGrade {
    pub fn values(&self) -> [Option<Decimal>; PHASE_COUNT] {
        [self.phase1, self.phase2, self.phase3, self.phase4]
    }

    pub fn manual_flags(&self) -> [bool; PHASE_COUNT] {
        [
            self.phase1_manual,
            self.phase2_manual,
            self.phase3_manual,
            self.phase4_manual,
        ]
    }

    pub fn phase(&self, phase: i16) -> Option<Decimal> {
        phase_index(phase).and_then(|i| self.values()[i])
    }
}

/// Maps a 1-based phase number onto a slot index.
pub fn phase_index(phase: i16) -> Option<usize> {
    match phase {
        1..=4 => Some((phase - 1) as usize),
        _ => None,
    }
}
