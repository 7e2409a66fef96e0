//! Turning raw model output into a [`Prediction`].

use digitbot_common::{DIGIT_CLASSES, Prediction};

use crate::error::{Error, Result};

/// Tolerance when deciding whether an output row already sums to one.
const SUM_TOLERANCE: f32 = 1e-3;

/// Interpret one output row of the model.
///
/// A softmax head yields probabilities, which are kept as-is. Anything else
/// (a logits head) goes through a softmax first so the reported confidence is
/// a probability. The argmax is the same either way.
pub fn to_prediction(raw: &[f32]) -> Result<Prediction> {
    if raw.len() != DIGIT_CLASSES {
        return Err(Error::output(format!(
            "expected {DIGIT_CLASSES} scores, got {}",
            raw.len()
        )));
    }

    let mut probabilities = [0.0_f32; DIGIT_CLASSES];
    probabilities.copy_from_slice(raw);
    if !is_distribution(&probabilities) {
        softmax_in_place(&mut probabilities);
    }

    Prediction::from_probabilities(probabilities)
        .ok_or_else(|| Error::output("model produced only NaN scores"))
}

fn is_distribution(scores: &[f32]) -> bool {
    scores.iter().all(|p| (0.0..=1.0).contains(p))
        && (scores.iter().sum::<f32>() - 1.0).abs() <= SUM_TOLERANCE
}

fn softmax_in_place(scores: &mut [f32]) {
    let max = scores
        .iter()
        .copied()
        .filter(|s| !s.is_nan())
        .fold(f32::NEG_INFINITY, f32::max);
    if max == f32::INFINITY {
        // An infinite logit takes all the mass; the first one wins.
        let winner = scores.iter().position(|&s| s == f32::INFINITY);
        for (i, s) in scores.iter_mut().enumerate() {
            *s = if Some(i) == winner { 1.0 } else { 0.0 };
        }
        return;
    }
    if !max.is_finite() {
        return;
    }
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
    }
    let sum: f32 = scores.iter().filter(|s| !s.is_nan()).sum();
    if sum > 0.0 {
        for s in scores.iter_mut() {
            *s /= sum;
        }
    }
}
