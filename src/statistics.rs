use crate::error::Result;
use crate::posterior::PositionPosterior;
use crate::sequence::SequenceCollection;
use ndarray::Array2;

/// Expected symbol counts under a posterior over motif starts.
///
/// `position_counts[[symbol, k]]` is the expected number of `symbol` at
/// motif position `k` (1-based); column 0 holds the background counts.
/// Built fresh for every M-step.
#[derive(Debug, Clone, PartialEq)]
pub struct SufficientStatistics {
    position_counts: Array2<f64>,
    motif_counts: Vec<f64>,
    background_counts: Vec<f64>,
}

impl SufficientStatistics {
    /// # Errors
    /// * `MotifError::InvalidInput` - the posterior was not computed for these
    ///   sequences and this width
    pub fn build(
        sequences: &SequenceCollection,
        posterior: &PositionPosterior,
        width: usize,
    ) -> Result<Self> {
        posterior.fits(sequences, width)?;

        let size = sequences.alphabet().len();
        let mut position_counts = Array2::zeros((size, width + 1));
        for (seq, row) in sequences.iter().zip(posterior.rows()) {
            let codes = seq.codes();
            for (start, &z) in row.iter().enumerate() {
                for (k, &code) in codes[start..start + width].iter().enumerate() {
                    position_counts[[code as usize, k + 1]] += z;
                }
            }
        }

        let motif_counts: Vec<f64> = position_counts
            .rows()
            .into_iter()
            .map(|counts| counts.iter().skip(1).sum::<f64>())
            .collect();
        let background_counts: Vec<f64> = sequences
            .symbol_totals()
            .iter()
            .zip(&motif_counts)
            .map(|(&total, motif)| total as f64 - motif)
            .collect();
        for (row, &count) in background_counts.iter().enumerate() {
            position_counts[[row, 0]] = count;
        }

        Ok(Self {
            position_counts,
            motif_counts,
            background_counts,
        })
    }

    /// Expected count of alphabet row `symbol` at motif position `position`
    /// (0 is the background).
    pub fn count_at_position(&self, symbol: usize, position: usize) -> f64 {
        self.position_counts[[symbol, position]]
    }

    /// Expected count of alphabet row `symbol` inside the motif, over all positions.
    pub fn motif_count(&self, symbol: usize) -> f64 {
        self.motif_counts[symbol]
    }

    /// Expected count of alphabet row `symbol` outside the motif.
    pub fn background_count(&self, symbol: usize) -> f64 {
        self.background_counts[symbol]
    }

    pub fn sum_background_counts(&self) -> f64 {
        self.background_counts.iter().sum()
    }

    pub fn position_counts(&self) -> &Array2<f64> {
        &self.position_counts
    }
}
