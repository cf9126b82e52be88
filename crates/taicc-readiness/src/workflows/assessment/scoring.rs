use super::domain::{AnswerSet, MaturityLevel, MATURITY_BANDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("no answers recorded; an average needs at least one rating")]
    EmptyAnswers,
}

/// Arithmetic mean of the recorded ratings, rounded to two decimals.
pub fn score(answers: &AnswerSet) -> Result<f64, ScoreError> {
    if answers.is_empty() {
        return Err(ScoreError::EmptyAnswers);
    }

    let total: u32 = answers.scores().map(u32::from).sum();
    let mean = f64::from(total) / answers.len() as f64;
    Ok(round_to_hundredths(mean))
}

pub(crate) fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Map an average onto the maturity bands.
///
/// Bands are checked in order and the first inclusive range wins. Values that land
/// in the 0.1-wide gaps between published ranges belong to the band below the gap.
/// Anything outside `[0, 5]` (or NaN) is `Undefined`.
pub fn classify(average: f64) -> MaturityLevel {
    if let Some(band) = MATURITY_BANDS.iter().find(|band| band.contains(average)) {
        return band.level;
    }

    let lowest = MATURITY_BANDS[0].lower;
    let highest = MATURITY_BANDS[MATURITY_BANDS.len() - 1].upper;
    if !(lowest..=highest).contains(&average) {
        return MaturityLevel::Undefined;
    }

    MATURITY_BANDS
        .iter()
        .rev()
        .find(|band| band.lower <= average)
        .map(|band| band.level)
        .unwrap_or(MaturityLevel::Undefined)
}

/// Whole-percent completion, truncated toward zero.
pub fn progress(answered: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (answered.min(total) * 100) / total;
    pct as u8
}
