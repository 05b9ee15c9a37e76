use rand_distr::Normal;

use super::LatencyError;
use crate::Randomizer;

const JITTER_RATIO: f64 = 0.05;
// Normally distributed delays need a non-zero deviation.
const MIN_JITTER_MS: f64 = 0.01;

/// Normally distributed one-way delay centred on a matrix latency.
#[derive(Debug, Clone)]
pub struct DelayModel {
    mean_ms: f64,
    jitter_ms: f64,
    distr: Normal<f64>,
}

impl DelayModel {
    /// Deviation is 5% of the mean.
    pub fn for_latency(mean_ms: f64) -> Result<Self, LatencyError> {
        if !mean_ms.is_finite() || mean_ms <= 0.0 {
            return Err(LatencyError::InvalidDelay(mean_ms));
        }
        let jitter_ms = (mean_ms * JITTER_RATIO).max(MIN_JITTER_MS);
        let distr =
            Normal::new(mean_ms, jitter_ms).map_err(|_| LatencyError::InvalidDelay(mean_ms))?;
        Ok(Self {
            mean_ms,
            jitter_ms,
            distr,
        })
    }

    pub fn mean_ms(&self) -> f64 {
        self.mean_ms
    }

    pub fn jitter_ms(&self) -> f64 {
        self.jitter_ms
    }

    pub fn sample(&self, randomizer: &mut Randomizer) -> f64 {
        randomizer.sample(&self.distr).max(0.0)
    }
}

impl PartialEq for DelayModel {
    fn eq(&self, other: &Self) -> bool {
        (self.mean_ms, self.jitter_ms) == (other.mean_ms, other.jitter_ms)
    }
}
