use rand::Rng;

use crate::error::{HdpError, Result};

/// Prevent the inner value from being verbosely / pretty printed during a debug.
pub(crate) struct NoPrettyPrint<T: std::fmt::Debug>(pub T);

impl<T: std::fmt::Debug> NoPrettyPrint<T> {
    pub const fn new(t: T) -> Self {
        Self(t)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for NoPrettyPrint<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Prevent "{:#?}" from being used.
        write!(f, "{:?}", self.0)
    }
}

/// Unnormalized discrete distribution stored as running prefix sums.
///
/// Draws use the inverse CDF with a linear scan: the selected index is the
/// first one whose cumulative weight is strictly greater than `u`, so entries
/// with zero weight can never be chosen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CumulativeWeights {
    cumulative: Vec<f64>,
}

impl CumulativeWeights {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cumulative: Vec::new(),
        }
    }

    /// Remove all entries, keeping the allocation.
    pub fn clear(&mut self) {
        self.cumulative.clear();
    }

    /// Append an entry with the given (non-negative) weight.
    pub fn push(&mut self, weight: f64) {
        debug_assert!(weight >= 0.0, "negative weight {weight}");
        let total = self.total();
        self.cumulative.push(total + weight);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.cumulative
    }

    /// Index of the first entry whose cumulative weight exceeds `u`.
    #[must_use]
    pub fn index_of(&self, u: f64) -> Option<usize> {
        self.cumulative.iter().position(|&c| u < c)
    }

    /// Draw an index with probability proportional to its weight.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Result<usize> {
        let total = self.total();
        if !(total.is_finite() && total > 0.0) {
            return Err(HdpError::DegenerateWeights { total });
        }
        let u = rng.random::<f64>() * total;
        // `u` can round up to `total`; fall back to the last entry.
        Ok(self.index_of(u).unwrap_or(self.cumulative.len() - 1))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn cumulative_sums_are_monotone() {
        let weights = [0.5, 0.0, 2.0, 0.25, 1.25];
        let mut cw = CumulativeWeights::new();
        weights.iter().for_each(|&w| cw.push(w));

        assert_eq!(cw.len(), weights.len());
        assert!(cw.as_slice().windows(2).all(|w| w[0] <= w[1]));
        assert::close(cw.total(), weights.iter().sum::<f64>(), 1E-12);
    }

    #[test]
    fn strict_comparison_skips_empty_entries() {
        let mut cw = CumulativeWeights::new();
        cw.push(0.0);
        cw.push(1.0);
        cw.push(0.0);
        cw.push(1.0);

        assert_eq!(cw.index_of(0.0), Some(1));
        assert_eq!(cw.index_of(0.999), Some(1));
        assert_eq!(cw.index_of(1.0), Some(3));
        assert_eq!(cw.index_of(2.0), None);
    }

    #[test]
    fn degenerate_total_is_an_error() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let mut cw = CumulativeWeights::new();
        assert!(matches!(
            cw.draw(&mut rng),
            Err(HdpError::DegenerateWeights { .. })
        ));

        cw.push(0.0);
        assert!(cw.draw(&mut rng).is_err());

        cw.clear();
        cw.push(f64::INFINITY);
        assert!(cw.draw(&mut rng).is_err());
    }

    #[allow(clippy::cast_precision_loss)]
    #[test]
    fn draw_frequencies_follow_weights() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let mut cw = CumulativeWeights::new();
        cw.push(1.0);
        cw.push(0.0);
        cw.push(3.0);

        let n = 20_000;
        let mut counts = [0_usize; 3];
        for _ in 0..n {
            counts[cw.draw(&mut rng).expect("valid weights")] += 1;
        }

        assert_eq!(counts[1], 0);
        assert::close(counts[0] as f64 / n as f64, 0.25, 0.02);
        assert::close(counts[2] as f64 / n as f64, 0.75, 0.02);
    }
}
