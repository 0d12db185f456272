use crate::models::evaluation_result::EvaluationResult;
use crate::models::student_grade::{StudentPhaseGrade, PHASE_COUNT};
use crate::services::phase_average_service::PhaseOverride;
use crate::utils::score::score_from_f64;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGradesRequest {
    #[serde(default, deserialize_with = "explicit_null")]
    pub phase1: Option<Option<f64>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub phase2: Option<Option<f64>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub phase3: Option<Option<f64>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub phase4: Option<Option<f64>>,
    /// Accepted for compatibility; the stored average is always recomputed.
    #[serde(default)]
    pub average: Option<f64>,
}

impl UpdateGradesRequest {
    pub fn overrides(&self) -> std::result::Result<[PhaseOverride; PHASE_COUNT], String> {
        let fields = [self.phase1, self.phase2, self.phase3, self.phase4];
        let mut out = [PhaseOverride::Keep; PHASE_COUNT];
        for (i, field) in fields.into_iter().enumerate() {
            out[i] = match field {
                None => PhaseOverride::Keep,
                Some(None) => PhaseOverride::Clear,
                Some(Some(v)) => PhaseOverride::Set(score_from_f64(v).ok_or_else(|| {
                    format!("phase{} must be a number between 0 and 5", i + 1)
                })?),
            };
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseValue {
    pub phase: i16,
    pub value: Option<Decimal>,
    /// "M" for a teacher-entered value, "S" for a computed one.
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGradesResponse {
    pub student_id: i64,
    pub phase1: Option<Decimal>,
    pub phase2: Option<Decimal>,
    pub phase3: Option<Decimal>,
    pub phase4: Option<Decimal>,
    pub average: Option<Decimal>,
    pub phases: Vec<PhaseValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_results: Option<Vec<EvaluationResult>>,
}

impl StudentGradesResponse {
    pub fn from_grade(grade: &StudentPhaseGrade) -> Self {
        let values = grade.values();
        let manual = grade.manual_flags();
        let phases = (0..PHASE_COUNT)
            .map(|i| PhaseValue {
                phase: (i + 1) as i16,
                value: values[i],
                source: if manual[i] { "M" } else { "S" },
            })
            .collect();
        Self {
            student_id: grade.student_id,
            phase1: grade.phase1,
            phase2: grade.phase2,
            phase3: grade.phase3,
            phase4: grade.phase4,
            average: grade.average,
            phases,
            evaluation_results: None,
        }
    }

    pub fn empty(student_id: i64) -> Self {
        Self {
            student_id,
            phase1: None,
            phase2: None,
            phase3: None,
            phase4: None,
            average: None,
            phases: (1..=PHASE_COUNT as i16)
                .map(|phase| PhaseValue {
                    phase,
                    value: None,
                    source: "S",
                })
                .collect(),
            evaluation_results: None,
        }
    }

    pub fn with_results(mut self, results: Vec<EvaluationResult>) -> Self {
        self.evaluation_results = Some(results);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn absent_null_and_value_are_distinct() {
        let req: UpdateGradesRequest =
            serde_json::from_value(json!({"phase2": 4.5, "phase3": null, "average": 1.0})).unwrap();
        let overrides = req.overrides().unwrap();
        assert_eq!(overrides[0], PhaseOverride::Keep);
        assert_eq!(
            overrides[1],
            PhaseOverride::Set(Decimal::from_str("4.5").unwrap())
        );
        assert_eq!(overrides[2], PhaseOverride::Clear);
        assert_eq!(overrides[3], PhaseOverride::Keep);
    }

    #[test]
    fn out_of_scale_override_is_rejected() {
        let req: UpdateGradesRequest = serde_json::from_value(json!({"phase1": 7})).unwrap();
        assert!(req.overrides().is_err());
    }
}
