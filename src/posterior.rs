use crate::error::{MotifError, Result};
use crate::model::MotifModel;
use crate::sequence::{Sequence, SequenceCollection};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How sequence likelihoods are evaluated in the E-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Likelihood {
    /// Plain products of probabilities. Underflows to zero on long sequences,
    /// which is reported as `MotifError::DegenerateNormalization`.
    #[default]
    Direct,
    /// Sums of log-probabilities, normalized with the log-sum-exp shift.
    LogSpace,
}

/// Distribution of the motif start over the admissible offsets of every
/// sequence (the E-step estimate of the hidden start positions).
///
/// Row `i` belongs to sequence `i` of the collection it was computed from
/// and has `len - width + 1` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPosterior {
    width: usize,
    rows: Vec<Vec<f64>>,
}

impl PositionPosterior {
    /// An all-zero posterior shaped for `sequences` and a motif of `width`.
    pub fn zeros(sequences: &SequenceCollection, width: usize) -> Self {
        let rows = sequences
            .iter()
            .map(|seq| vec![0.0; seq.num_offsets(width)])
            .collect();
        Self { width, rows }
    }

    /// E-step: likelihood of every start hypothesis, normalized per sequence.
    ///
    /// # Errors
    /// * `MotifError::InvalidInput` - alphabet mismatch between model and sequences
    /// * `MotifError::SequenceTooShort` - a sequence is not longer than the motif
    /// * `MotifError::DegenerateNormalization` - the likelihoods of a sequence sum to zero
    pub fn compute(
        sequences: &SequenceCollection,
        model: &MotifModel,
        likelihood: Likelihood,
    ) -> Result<Self> {
        let mut posterior = match likelihood {
            Likelihood::Direct => Self::unnormalized(sequences, model)?,
            Likelihood::LogSpace => {
                check_compatible(sequences, model)?;
                let rows = sequences
                    .sequences()
                    .par_iter()
                    .map(|seq| {
                        let lls = window_log_likelihoods(seq, model);
                        let max = lls.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                        lls.iter().map(|ll| (ll - max).exp()).collect::<Vec<f64>>()
                    })
                    .collect();
                Self {
                    width: model.width(),
                    rows,
                }
            }
        };
        posterior.normalize()?;
        Ok(posterior)
    }

    /// Unnormalized sequence likelihoods for every start offset.
    pub fn unnormalized(sequences: &SequenceCollection, model: &MotifModel) -> Result<Self> {
        check_compatible(sequences, model)?;
        let rows = sequences
            .sequences()
            .par_iter()
            .map(|seq| window_likelihoods(seq, model))
            .collect();
        Ok(Self {
            width: model.width(),
            rows,
        })
    }

    /// Divides every row by its sum.
    ///
    /// Rows before the offending one are already normalized when an error
    /// is returned.
    ///
    /// # Errors
    /// * `MotifError::DegenerateNormalization` - a row sums to zero or to a non-finite value
    pub fn normalize(&mut self) -> Result<()> {
        for (sequence, row) in self.rows.iter_mut().enumerate() {
            let sum: f64 = row.iter().sum();
            if !(sum > 0.0 && sum.is_finite()) {
                return Err(MotifError::DegenerateNormalization { sequence });
            }
            row.iter_mut().for_each(|z| *z /= sum);
        }
        Ok(())
    }

    /// Checks that this posterior was shaped for `sequences` and a motif of
    /// `width`: one row per sequence, one entry per admissible offset.
    ///
    /// # Errors
    /// * `MotifError::InvalidInput` - for the first mismatch found
    pub fn fits(&self, sequences: &SequenceCollection, width: usize) -> Result<()> {
        if width == 0 || self.width != width || self.rows.len() != sequences.len() {
            return Err(MotifError::InvalidInput(format!(
                "posterior for width {} over {} sequences does not match width {} over {} sequences",
                self.width,
                self.rows.len(),
                width,
                sequences.len()
            )));
        }
        let mismatch = sequences
            .iter()
            .zip(&self.rows)
            .position(|(seq, row)| row.len() != seq.num_offsets(width));
        match mismatch {
            Some(sequence) => Err(MotifError::InvalidInput(format!(
                "posterior row {} has {} offsets, sequence {} admits {}",
                sequence,
                self.rows[sequence].len(),
                sequence,
                sequences.sequences()[sequence].num_offsets(width)
            ))),
            None => Ok(()),
        }
    }

    /// Motif width the offsets were computed for.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn num_sequences(&self) -> usize {
        self.rows.len()
    }

    /// Start probabilities of one sequence.
    ///
    /// # Panics
    /// * Panics if `sequence` is out of range
    pub fn row(&self, sequence: usize) -> &[f64] {
        &self.rows[sequence]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn probability(&self, sequence: usize, offset: usize) -> f64 {
        self.rows[sequence][offset]
    }

    pub fn set_probability(&mut self, sequence: usize, offset: usize, probability: f64) {
        self.rows[sequence][offset] = probability;
    }

    /// Total mass over all sequences; equals the number of sequences once
    /// normalized.
    pub fn sum_of_all_probabilities(&self) -> f64 {
        self.rows.iter().flatten().sum()
    }

    /// Offset with the strictly greatest probability, the earliest one on ties.
    /// `None` when no offset has positive probability.
    pub fn max_probability_start_position(&self, sequence: usize) -> Option<usize> {
        let mut max = 0.0;
        let mut location = None;
        for (offset, &z) in self.rows.get(sequence)?.iter().enumerate() {
            if z > max {
                max = z;
                location = Some(offset);
            }
        }
        location
    }
}

impl fmt::Display for PositionPosterior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows.iter() {
            let line = row
                .iter()
                .map(|z| z.to_string())
                .collect::<Vec<_>>()
                .join("\t");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Likelihood of the whole `residues` under the hypothesis that the motif
/// starts at `start`: background before and after the motif, motif columns
/// inside it.
///
/// # Errors
/// * `MotifError::InvalidParameter` - `start` leaves no room for the motif, or
///   a residue is not in the model's alphabet
pub fn probability_of_sequence(residues: &[u8], model: &MotifModel, start: usize) -> Result<f64> {
    let width = model.width();
    if start + width > residues.len() {
        return Err(MotifError::invalid_parameter(
            "start",
            start,
            format!(
                "a motif of width {} does not fit into a sequence of length {}",
                width,
                residues.len()
            ),
        ));
    }
    let mut probability = 1.0;
    for &symbol in &residues[..start] {
        probability *= model.probability(symbol, 0)?;
    }
    for (i, &symbol) in residues[start..start + width].iter().enumerate() {
        probability *= model.probability(symbol, i + 1)?;
    }
    for &symbol in &residues[start + width..] {
        probability *= model.probability(symbol, 0)?;
    }
    Ok(probability)
}

/// Sequence likelihood for every admissible start offset.
///
/// Background products before and after the window come from prefix and
/// suffix tables, so one offset costs `O(width)`.
pub(crate) fn window_likelihoods(seq: &Sequence, model: &MotifModel) -> Vec<f64> {
    let width = model.width();
    let codes = seq.codes();
    let background = |code: u8| model.probability_at(code as usize, 0);

    let mut prefix = Vec::with_capacity(codes.len() + 1);
    prefix.push(1.0);
    for &code in codes {
        let last = prefix[prefix.len() - 1];
        prefix.push(last * background(code));
    }
    let mut suffix = vec![1.0; codes.len() + 1];
    for i in (0..codes.len()).rev() {
        suffix[i] = suffix[i + 1] * background(codes[i]);
    }

    (0..seq.num_offsets(width))
        .map(|start| {
            let motif: f64 = codes[start..start + width]
                .iter()
                .enumerate()
                .map(|(k, &code)| model.probability_at(code as usize, k + 1))
                .product();
            prefix[start] * motif * suffix[start + width]
        })
        .collect()
}

/// Natural log of `window_likelihoods`, computed without leaving log space.
pub(crate) fn window_log_likelihoods(seq: &Sequence, model: &MotifModel) -> Vec<f64> {
    let width = model.width();
    let codes = seq.codes();
    let background = |code: u8| model.probability_at(code as usize, 0).ln();

    let mut prefix = Vec::with_capacity(codes.len() + 1);
    prefix.push(0.0);
    for &code in codes {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + background(code));
    }
    let total = prefix[codes.len()];

    (0..seq.num_offsets(width))
        .map(|start| {
            let motif: f64 = codes[start..start + width]
                .iter()
                .enumerate()
                .map(|(k, &code)| model.probability_at(code as usize, k + 1).ln())
                .sum();
            // background of everything outside [start, start + width)
            let outside = prefix[start] + (total - prefix[start + width]);
            outside + motif
        })
        .collect()
}

pub(crate) fn check_compatible(sequences: &SequenceCollection, model: &MotifModel) -> Result<()> {
    if sequences.alphabet() != model.alphabet() {
        return Err(MotifError::InvalidInput(format!(
            "model alphabet {} differs from sequence alphabet {}",
            model.alphabet(),
            sequences.alphabet()
        )));
    }
    sequences.validate_width(model.width())
}
