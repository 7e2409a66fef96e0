use serde::Serialize;

/// Number of output classes of the digit model (`0` through `9`).
pub const DIGIT_CLASSES: usize = 10;

/// Result of classifying one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Index of the highest-probability class.
    pub digit: u8,
    /// Probability assigned to `digit`, in `[0, 1]`.
    pub confidence: f32,
    /// Full probability distribution, indexed by digit.
    pub probabilities: [f32; DIGIT_CLASSES],
}

impl Prediction {
    /// Build a prediction from a probability distribution.
    ///
    /// Picks the first maximum on ties. NaN entries never win. Returns `None`
    /// when every entry is NaN.
    pub fn from_probabilities(probabilities: [f32; DIGIT_CLASSES]) -> Option<Self> {
        let (digit, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| !p.is_nan())
            .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
                Some((_, best_p)) if best_p >= p => best,
                _ => Some((i, p)),
            })?;
        Some(Self {
            digit: digit as u8,
            confidence,
            probabilities,
        })
    }

    /// Confidence as a whole percentage, for display.
    #[must_use]
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}
