//! Expectation-maximization for the OOPS motif model.
//!
//! A run seeds the model from the best observed subsequence, then alternates
//! E-steps and M-steps until the data log-likelihood settles.

use crate::config::EmConfig;
use crate::error::{MotifError, Result};
use crate::model::MotifModel;
use crate::posterior::{
    check_compatible, window_likelihoods, window_log_likelihoods, Likelihood, PositionPosterior,
};
use crate::sequence::{RealizedMotif, SequenceCollection};
use crate::statistics::SufficientStatistics;
use log::{debug, info, trace, warn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

/// Why the main loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Convergence {
    /// The data log-likelihood changed by at most `epsilon`.
    Converged,
    /// `max_iterations` was reached first.
    MaxIterations,
    /// `max_wall_time` elapsed first.
    TimeLimit,
}

/// Outcome of `EmEngine::run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmResult {
    pub model: MotifModel,
    pub posterior: PositionPosterior,
    /// Main-loop iterations, seeding excluded.
    pub iterations: usize,
    /// Data log-likelihood of the last iteration.
    pub log_likelihood: f64,
    pub status: Convergence,
}

impl EmResult {
    pub fn converged(&self) -> bool {
        self.status == Convergence::Converged
    }

    /// Most probable motif occurrence in every sequence.
    pub fn realized_motifs(&self, sequences: &SequenceCollection) -> Result<Vec<RealizedMotif>> {
        sequences.pick_out_motifs(self.model.width(), &self.posterior)
    }
}

/// Runs the EM motif search. Holds no state between runs.
#[derive(Debug, Clone, Default)]
pub struct EmEngine {
    config: EmConfig,
}

impl EmEngine {
    pub fn new(config: EmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmConfig {
        &self.config
    }

    /// Finds the motif of `width` shared by all `sequences`.
    ///
    /// # Errors
    /// * `MotifError::InvalidParameter` - invalid configuration
    /// * `MotifError::InvalidInput` / `MotifError::SequenceTooShort` - rejected
    ///   before any E-step runs
    /// * `MotifError::DegenerateNormalization` - a sequence likelihood underflowed
    pub fn run(&self, sequences: &SequenceCollection, width: usize) -> Result<EmResult> {
        self.config.validate()?;
        sequences.validate_width(width)?;
        let started = Instant::now();

        info!(
            "Seeding a width {} motif over {} sequences",
            width,
            sequences.len()
        );
        let mut model = self.seed(sequences, width, self.config.seed_iterations)?;

        info!(
            "Iterating from seed {}",
            String::from_utf8_lossy(&model.consensus())
        );
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(self.config.rng_seed);
        let mut previous: Option<f64> = None;
        let mut iterations = 0;
        let (posterior, log_likelihood, status) = loop {
            iterations += 1;
            let posterior = self.e_step(sequences, &model)?;
            model = self.m_step(sequences, &posterior, width, &mut rng)?;
            let log_likelihood = self.data_log_likelihood(sequences, &model, &posterior)?;
            debug!("Iteration {}\t{:.6}", iterations, log_likelihood);

            if previous.is_some_and(|prev| (log_likelihood - prev).abs() <= self.config.epsilon) {
                break (posterior, log_likelihood, Convergence::Converged);
            }
            if iterations >= self.config.max_iterations {
                break (posterior, log_likelihood, Convergence::MaxIterations);
            }
            if let Some(limit) = self.config.max_wall_time {
                if started.elapsed() >= limit {
                    break (posterior, log_likelihood, Convergence::TimeLimit);
                }
            }
            previous = Some(log_likelihood);
        };

        match status {
            Convergence::Converged => info!(
                "Converged after {} iterations to {} ({:.6})",
                iterations,
                String::from_utf8_lossy(&model.consensus()),
                log_likelihood
            ),
            _ => warn!(
                "Stopped without convergence ({:?}) after {} iterations",
                status, iterations
            ),
        }

        Ok(EmResult {
            model,
            posterior,
            iterations,
            log_likelihood,
            status,
        })
    }

    /// Multi-start search for the initial model.
    ///
    /// Every distinct substring of length `width` seeds a model that is
    /// refined for `refinement_iterations` E/M rounds and scored by its data
    /// log-likelihood. The seed (not its refinement) with the lowest score
    /// is returned; ties go to the earliest substring.
    pub fn seed(
        &self,
        sequences: &SequenceCollection,
        width: usize,
        refinement_iterations: usize,
    ) -> Result<MotifModel> {
        sequences.validate_width(width)?;
        let alphabet = sequences.alphabet();
        let concentration = self.config.seed_concentration;

        let mut seen = HashSet::new();
        let candidates: Vec<&[u8]> = sequences
            .iter()
            .flat_map(|seq| seq.residues().windows(width))
            .filter(|subsequence| seen.insert(*subsequence))
            .collect();
        debug!("{} distinct seed candidates", candidates.len());

        let scores = candidates
            .par_iter()
            .enumerate()
            .map(|(idx, subsequence)| {
                let seeded = MotifModel::from_seed_subsequence(subsequence, alphabet, concentration)?;
                let mut rng: Xoshiro256StarStar =
                    SeedableRng::seed_from_u64(self.config.rng_seed.wrapping_add(idx as u64));
                self.refined_score(sequences, seeded, refinement_iterations, &mut rng)
            })
            .collect::<Result<Vec<f64>>>()?;

        let mut best: Option<(usize, f64)> = None;
        for (idx, &score) in scores.iter().enumerate() {
            trace!("{}\t{}", String::from_utf8_lossy(candidates[idx]), score);
            if !score.is_nan() && best.map_or(true, |(_, best_score)| score < best_score) {
                best = Some((idx, score));
            }
        }
        let (idx, score) = best.ok_or_else(|| {
            MotifError::InvalidInput("no seed candidate produced a finite score".into())
        })?;
        debug!(
            "Best seed {} scored {:.6}",
            String::from_utf8_lossy(candidates[idx]),
            score
        );
        MotifModel::from_seed_subsequence(candidates[idx], alphabet, concentration)
    }

    fn refined_score<R: Rng>(
        &self,
        sequences: &SequenceCollection,
        seeded: MotifModel,
        iterations: usize,
        rng: &mut R,
    ) -> Result<f64> {
        let width = seeded.width();
        let mut model = seeded;
        let mut posterior = self.e_step(sequences, &model)?;
        for iteration in 0..iterations {
            if iteration > 0 {
                posterior = self.e_step(sequences, &model)?;
            }
            model = self.m_step(sequences, &posterior, width, rng)?;
        }
        self.data_log_likelihood(sequences, &model, &posterior)
    }

    /// E-step with the configured likelihood evaluation.
    pub fn e_step(
        &self,
        sequences: &SequenceCollection,
        model: &MotifModel,
    ) -> Result<PositionPosterior> {
        PositionPosterior::compute(sequences, model, self.config.likelihood)
    }

    /// M-step: re-estimates every column from the expected counts under
    /// `posterior`, smoothed by the pseudocount.
    ///
    /// A random model of the right shape is drawn first and every entry is
    /// then overwritten, so the result does not depend on `rng`.
    pub fn m_step<R: Rng>(
        &self,
        sequences: &SequenceCollection,
        posterior: &PositionPosterior,
        width: usize,
        rng: &mut R,
    ) -> Result<MotifModel> {
        let alphabet = sequences.alphabet();
        let mut model = MotifModel::from_uniform_random(width, alphabet, rng)?;
        let counts = SufficientStatistics::build(sequences, posterior, width)?;

        let pseudocount = self.config.pseudocount;
        let smoothing = alphabet.len() as f64 * pseudocount;
        let motif_denominator = posterior.sum_of_all_probabilities() + smoothing;
        let background_denominator = counts.sum_background_counts() + smoothing;

        for row in 0..alphabet.len() {
            for k in 1..=width {
                let numerator = counts.count_at_position(row, k) + pseudocount;
                model.set_probability_at(row, k, numerator / motif_denominator);
            }
            let numerator = counts.background_count(row) + pseudocount;
            model.set_probability_at(row, 0, numerator / background_denominator);
        }
        Ok(model)
    }

    /// Convergence signal: for every sequence, `-ln` of the posterior-weighted
    /// sum of its start-hypothesis likelihoods, summed over sequences.
    ///
    /// The main loop evaluates it against the freshly updated model and the
    /// posterior of the previous model, so it is not guaranteed to move
    /// monotonically between iterations.
    ///
    /// # Errors
    /// * `MotifError::InvalidInput` - model or posterior do not fit the sequences
    /// * `MotifError::DegenerateNormalization` - the weighted sum of a sequence is zero
    pub fn data_log_likelihood(
        &self,
        sequences: &SequenceCollection,
        model: &MotifModel,
        posterior: &PositionPosterior,
    ) -> Result<f64> {
        check_compatible(sequences, model)?;
        posterior.fits(sequences, model.width())?;

        let likelihood = self.config.likelihood;
        let per_sequence = sequences
            .sequences()
            .par_iter()
            .zip(posterior.rows())
            .enumerate()
            .map(|(idx, (seq, row))| {
                let value = match likelihood {
                    Likelihood::Direct => {
                        let weighted: f64 = window_likelihoods(seq, model)
                            .iter()
                            .zip(row)
                            .map(|(p, z)| p * z)
                            .sum();
                        -weighted.ln()
                    }
                    Likelihood::LogSpace => {
                        let terms: Vec<f64> = window_log_likelihoods(seq, model)
                            .iter()
                            .zip(row)
                            .map(|(ll, z)| ll + z.ln())
                            .collect();
                        let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                        let shifted: f64 = terms.iter().map(|t| (t - max).exp()).sum();
                        -(max + shifted.ln())
                    }
                };
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(MotifError::DegenerateNormalization { sequence: idx })
                }
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(per_sequence.iter().sum())
    }
}
