use rust_decimal::{Decimal, RoundingStrategy};

/// Upper bound of the grading scale.
pub const MAX_SCORE: i64 = 5;

/// Rounds to 2 decimals, halves away from zero.
pub fn round_score(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn is_within_scale(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::from(MAX_SCORE)
}

/// Rounded mean of the present values; `None` when nothing is present.
pub fn mean_of_present<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Option<Decimal>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((Decimal::ZERO, 0i64), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(round_score(sum / Decimal::from(count)))
    }
}

/// Converts a client-supplied float into a scale value, rejecting out-of-range input.
pub fn score_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    let dec = Decimal::from_f64_retain(value)?;
    let rounded = round_score(dec);
    is_within_scale(rounded).then_some(rounded)
}
