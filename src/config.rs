use crate::error::{MotifError, Result};
use crate::posterior::Likelihood;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Laplace pseudocount added to every expected count in the M-step
pub const PSEUDOCOUNT: f64 = 1.0;

/// Stop when the data log-likelihood changes by at most this much
pub const EPSILON: f64 = 0.001;

/// E/M refinement iterations run on every seeding candidate
pub const STARTING_POINT_ITERATIONS: usize = 3;

/// Probability mass a seed subsequence puts on its own symbol in every column
pub const START_PARAM: f64 = 0.6;

/// Upper bound on main-loop iterations
pub const MAX_ITERATIONS: usize = 1000;

/// Tunables of the EM motif search.
///
/// # Examples
///
/// ```rust
/// use motif_em_rs::config::EmConfig;
/// use motif_em_rs::posterior::Likelihood;
///
/// let config = EmConfig {
///     likelihood: Likelihood::LogSpace,
///     max_iterations: 200,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmConfig {
    /// Pseudocount added to every count when re-estimating probabilities.
    ///
    /// **Default**: `1.0`
    pub pseudocount: f64,

    /// Convergence threshold on the absolute change of the data
    /// log-likelihood between two consecutive iterations.
    ///
    /// **Default**: `0.001`
    pub epsilon: f64,

    /// Number of E/M iterations used to score each seeding candidate.
    ///
    /// **Default**: `3`
    pub seed_iterations: usize,

    /// Probability given to the observed symbol in every column of a seeded
    /// model; the rest is spread evenly.
    ///
    /// **Default**: `0.6`
    pub seed_concentration: f64,

    /// Hard cap on main-loop iterations. Reaching it ends the run with
    /// `Convergence::MaxIterations`.
    ///
    /// **Default**: `1000`
    pub max_iterations: usize,

    /// Optional wall-clock budget for a run, measured from the start of
    /// seeding but checked only after each main-loop iteration. Seeding and
    /// the first iteration always complete. Exceeding it ends the run with
    /// `Convergence::TimeLimit`.
    ///
    /// **Default**: `None`
    pub max_wall_time: Option<Duration>,

    /// How sequence likelihoods are evaluated.
    ///
    /// **Default**: `Likelihood::Direct`
    pub likelihood: Likelihood,

    /// Seed of the random generators used for placeholder models.
    ///
    /// **Default**: `0`
    pub rng_seed: u64,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            pseudocount: PSEUDOCOUNT,
            epsilon: EPSILON,
            seed_iterations: STARTING_POINT_ITERATIONS,
            seed_concentration: START_PARAM,
            max_iterations: MAX_ITERATIONS,
            max_wall_time: None,
            likelihood: Likelihood::default(),
            rng_seed: 0,
        }
    }
}

impl EmConfig {
    /// # Errors
    /// * `MotifError::InvalidParameter` - for the first out-of-range field
    pub fn validate(&self) -> Result<()> {
        if !(self.pseudocount.is_finite() && self.pseudocount > 0.0) {
            return Err(MotifError::invalid_parameter(
                "pseudocount",
                self.pseudocount,
                "must be a positive number",
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(MotifError::invalid_parameter(
                "epsilon",
                self.epsilon,
                "must be a non-negative number",
            ));
        }
        if !(0.0..=1.0).contains(&self.seed_concentration) {
            return Err(MotifError::invalid_parameter(
                "seed_concentration",
                self.seed_concentration,
                "must lie in [0, 1]",
            ));
        }
        if self.max_iterations == 0 {
            return Err(MotifError::invalid_parameter(
                "max_iterations",
                self.max_iterations,
                "at least one iteration is required",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EmConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pseudocount, 1.0);
        assert_eq!(config.seed_iterations, 3);
        assert_eq!(config.likelihood, Likelihood::Direct);
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        let bad = [
            EmConfig {
                pseudocount: 0.0,
                ..Default::default()
            },
            EmConfig {
                epsilon: f64::NAN,
                ..Default::default()
            },
            EmConfig {
                seed_concentration: 1.2,
                ..Default::default()
            },
            EmConfig {
                max_iterations: 0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(MotifError::InvalidParameter { .. })
            ));
        }
    }
}
