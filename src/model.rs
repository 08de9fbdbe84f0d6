use crate::alphabet::Alphabet;
use crate::error::{MotifError, Result};
use crate::types::PWM;
use ndarray::{Array2, ArrayView1};
use polars::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Uniform;
use std::fmt;

/// Tolerance used when checking that a column is a probability distribution
pub const COLUMN_SUM_TOLERANCE: f64 = 1e-9;

/// The OOPS motif model.
///
/// Row `i` holds the probabilities of `alphabet[i]`; column 0 is the shared
/// background distribution and columns `1..=width` are the motif positions.
/// Every column sums to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifModel {
    alphabet: Alphabet,
    probabilities: Array2<f64>,
}

impl MotifModel {
    /// Draws every column uniformly at random and normalizes it.
    ///
    /// # Errors
    /// * `MotifError::InvalidParameter` - if `width` is zero
    pub fn from_uniform_random<R: Rng>(
        width: usize,
        alphabet: &Alphabet,
        rng: &mut R,
    ) -> Result<Self> {
        check_width(width)?;
        let uniform = Uniform::new(0.0, 1.0).map_err(|e| MotifError::DataError(e.to_string()))?;
        let mut probabilities =
            Array2::from_shape_simple_fn((alphabet.len(), width + 1), || rng.sample(&uniform));
        for mut column in probabilities.columns_mut() {
            let sum = column.sum();
            column /= sum;
        }
        Ok(Self {
            alphabet: alphabet.clone(),
            probabilities,
        })
    }

    /// Seeds a model from an observed subsequence.
    ///
    /// Motif column `j` gives `concentration` to `subsequence[j - 1]` and
    /// spreads the remaining mass evenly over the other symbols. The
    /// background is uniform.
    ///
    /// # Errors
    /// * `MotifError::InvalidParameter` - empty subsequence or concentration outside `[0, 1]`
    /// * `MotifError::InvalidSequence` - a subsequence symbol is not in the alphabet
    pub fn from_seed_subsequence(
        subsequence: &[u8],
        alphabet: &Alphabet,
        concentration: f64,
    ) -> Result<Self> {
        check_width(subsequence.len())?;
        if !(0.0..=1.0).contains(&concentration) {
            return Err(MotifError::invalid_parameter(
                "concentration",
                concentration,
                "must lie in [0, 1]",
            ));
        }
        let size = alphabet.len();
        let rest = (1.0 - concentration) / (size - 1) as f64;
        let mut probabilities = Array2::from_elem((size, subsequence.len() + 1), rest);
        probabilities.column_mut(0).fill(1.0 / size as f64);
        for (j, &symbol) in subsequence.iter().enumerate() {
            let row = alphabet.index_of(symbol).ok_or_else(|| {
                MotifError::invalid_sequence(
                    0,
                    j,
                    format!(
                        "seed symbol '{}' is not in alphabet {}",
                        symbol as char, alphabet
                    ),
                )
            })?;
            probabilities[[row, j + 1]] = concentration;
        }
        Ok(Self {
            alphabet: alphabet.clone(),
            probabilities,
        })
    }

    /// Wraps an explicit `|alphabet| x (width + 1)` probability matrix.
    ///
    /// # Errors
    /// * `MotifError::InvalidParameter` - wrong shape, or a column that is not a distribution
    pub fn from_matrix(alphabet: &Alphabet, probabilities: Array2<f64>) -> Result<Self> {
        let (rows, cols) = probabilities.dim();
        if rows != alphabet.len() || cols < 2 {
            return Err(MotifError::invalid_parameter(
                "matrix",
                format!("{}x{}", rows, cols),
                format!(
                    "expected {} rows and at least 2 columns",
                    alphabet.len()
                ),
            ));
        }
        let model = Self {
            alphabet: alphabet.clone(),
            probabilities,
        };
        if let Some(column) = model.first_unnormalized_column(COLUMN_SUM_TOLERANCE) {
            return Err(MotifError::invalid_parameter(
                "matrix",
                format!("column {}", column),
                "probabilities must be non-negative and sum to 1",
            ));
        }
        Ok(model)
    }

    pub fn width(&self) -> usize {
        self.probabilities.ncols() - 1
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.probabilities
    }

    /// The distribution of one column (0 is the background).
    pub fn column(&self, column: usize) -> ArrayView1<'_, f64> {
        self.probabilities.column(column)
    }

    /// Probability of `symbol` at `column`.
    ///
    /// # Errors
    /// * `MotifError::InvalidParameter` - unknown symbol, or column outside `[0, width]`
    pub fn probability(&self, symbol: u8, column: usize) -> Result<f64> {
        let row = self.locate(symbol, column)?;
        Ok(self.probabilities[[row, column]])
    }

    /// Overwrites the probability of `symbol` at `column`.
    ///
    /// The caller is responsible for keeping the column normalized.
    pub fn set_probability(&mut self, symbol: u8, column: usize, value: f64) -> Result<()> {
        let row = self.locate(symbol, column)?;
        self.probabilities[[row, column]] = value;
        Ok(())
    }

    #[inline]
    pub(crate) fn probability_at(&self, row: usize, column: usize) -> f64 {
        self.probabilities[[row, column]]
    }

    pub(crate) fn set_probability_at(&mut self, row: usize, column: usize, value: f64) {
        self.probabilities[[row, column]] = value;
    }

    /// Most probable symbol of every motif column.
    pub fn consensus(&self) -> Vec<u8> {
        (1..=self.width())
            .map(|column| {
                let mut best = 0;
                for row in 1..self.alphabet.len() {
                    if self.probabilities[[row, column]] > self.probabilities[[best, column]] {
                        best = row;
                    }
                }
                self.alphabet.symbol(best)
            })
            .collect()
    }

    /// Whether every column is a probability distribution within `tolerance`.
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        self.first_unnormalized_column(tolerance).is_none()
    }

    fn first_unnormalized_column(&self, tolerance: f64) -> Option<usize> {
        self.probabilities
            .columns()
            .into_iter()
            .position(|column| {
                column.iter().any(|&p| !(p >= 0.0)) || (column.sum() - 1.0).abs() > tolerance
            })
    }

    fn locate(&self, symbol: u8, column: usize) -> Result<usize> {
        if column > self.width() {
            return Err(MotifError::invalid_parameter(
                "column",
                column,
                format!("must lie in [0, {}]", self.width()),
            ));
        }
        self.alphabet.index_of(symbol).ok_or_else(|| {
            MotifError::invalid_parameter(
                "symbol",
                symbol as char,
                format!("is not in alphabet {}", self.alphabet),
            )
        })
    }

    /// Converts the motif columns into a PWM DataFrame
    ///
    /// # Returns
    /// * `Result<PWM>` - one column per alphabet symbol, one row per motif position
    ///
    /// # Errors
    /// * Returns `MotifError::DataError` if DataFrame creation fails
    pub fn to_pwm(&self) -> Result<PWM> {
        let columns = self
            .alphabet
            .symbols()
            .iter()
            .enumerate()
            .map(|(row, &symbol)| {
                Column::new(
                    (symbol as char).to_string().into(),
                    self.probabilities
                        .row(row)
                        .iter()
                        .skip(1)
                        .copied()
                        .collect::<Vec<f64>>(),
                )
            })
            .collect::<Vec<_>>();
        let pwm = DataFrame::new(columns)?;
        Ok(pwm)
    }
}

fn check_width(width: usize) -> Result<()> {
    if width == 0 {
        return Err(MotifError::invalid_parameter(
            "width",
            width,
            "the motif must span at least one position",
        ));
    }
    Ok(())
}

impl fmt::Display for MotifModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.probabilities.rows() {
            let line = row
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join("\t");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_uniform_random_is_normalized() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(42);
        let model = MotifModel::from_uniform_random(5, &Alphabet::dna(), &mut rng).unwrap();
        assert_eq!(model.width(), 5);
        assert_eq!(model.matrix().dim(), (4, 6));
        assert!(model.is_normalized(COLUMN_SUM_TOLERANCE));
        assert!(model.matrix().iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_uniform_random_is_reproducible() {
        let dna = Alphabet::dna();
        let mut rng1: Xoshiro256StarStar = SeedableRng::seed_from_u64(7);
        let mut rng2: Xoshiro256StarStar = SeedableRng::seed_from_u64(7);
        let m1 = MotifModel::from_uniform_random(3, &dna, &mut rng1).unwrap();
        let m2 = MotifModel::from_uniform_random(3, &dna, &mut rng2).unwrap();
        assert_eq!(m1, m2);
    }

    #[test]
    fn test_seeded_model() {
        let model = MotifModel::from_seed_subsequence(b"GTAT", &Alphabet::dna(), 0.5).unwrap();
        assert_eq!(model.width(), 4);
        assert!(model.is_normalized(COLUMN_SUM_TOLERANCE));
        assert_eq!(model.probability(b'G', 1).unwrap(), 0.5);
        assert!((model.probability(b'A', 1).unwrap() - 0.5 / 3.0).abs() < 1e-12);
        assert_eq!(model.probability(b'T', 4).unwrap(), 0.5);
        for symbol in *b"ACGT" {
            assert_eq!(model.probability(symbol, 0).unwrap(), 0.25);
        }
        assert_eq!(model.consensus(), b"GTAT".to_vec());
    }

    #[test]
    fn test_seeded_model_is_deterministic() {
        let dna = Alphabet::dna();
        let m1 = MotifModel::from_seed_subsequence(b"ACCGT", &dna, 0.6).unwrap();
        let m2 = MotifModel::from_seed_subsequence(b"ACCGT", &dna, 0.6).unwrap();
        assert_eq!(m1, m2);
    }

    #[test]
    fn test_seeded_model_rejects_bad_input() {
        let dna = Alphabet::dna();
        assert!(MotifModel::from_seed_subsequence(b"ACN", &dna, 0.6).is_err());
        assert!(MotifModel::from_seed_subsequence(b"", &dna, 0.6).is_err());
        assert!(MotifModel::from_seed_subsequence(b"AC", &dna, 1.5).is_err());
    }

    #[test]
    fn test_lookup_bounds() {
        let mut model = MotifModel::from_seed_subsequence(b"ACG", &Alphabet::dna(), 0.6).unwrap();
        assert!(matches!(
            model.probability(b'N', 1),
            Err(MotifError::InvalidParameter { .. })
        ));
        assert!(matches!(
            model.probability(b'A', 4),
            Err(MotifError::InvalidParameter { .. })
        ));
        assert!(model.set_probability(b'A', 9, 0.1).is_err());
        model.set_probability(b'A', 3, 0.9).unwrap();
        assert_eq!(model.probability(b'A', 3).unwrap(), 0.9);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = MotifModel::from_seed_subsequence(b"ACG", &Alphabet::dna(), 0.6).unwrap();
        let mut copy = original.clone();
        copy.set_probability(b'A', 1, 0.0).unwrap();
        assert_eq!(original.probability(b'A', 1).unwrap(), 0.6);
    }

    #[test]
    fn test_from_matrix() {
        let ab = Alphabet::new("AB").unwrap();
        let model = MotifModel::from_matrix(&ab, array![[0.5, 0.9, 0.2], [0.5, 0.1, 0.8]]).unwrap();
        assert_eq!(model.width(), 2);
        assert_eq!(model.consensus(), b"AB".to_vec());
        assert!(MotifModel::from_matrix(&ab, array![[0.5, 0.9], [0.6, 0.1]]).is_err());
        assert!(MotifModel::from_matrix(&ab, array![[1.0], [0.0]]).is_err());
    }

    #[test]
    fn test_to_pwm() {
        let model = MotifModel::from_seed_subsequence(b"ACGTT", &Alphabet::dna(), 0.7).unwrap();
        let pwm = model.to_pwm().unwrap();
        assert_eq!(pwm.height(), 5);
        assert_eq!(pwm.width(), 4);
        for name in ["A", "C", "G", "T"] {
            assert_eq!(pwm.column(name).unwrap().len(), 5);
        }
        let a = pwm.column("A").unwrap().f64().unwrap();
        assert_eq!(a.get(0), Some(0.7));
    }

    #[test]
    fn test_display_has_one_row_per_symbol() {
        let model = MotifModel::from_seed_subsequence(b"AC", &Alphabet::dna(), 0.7).unwrap();
        let text = model.to_string();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.split('\t').count() == 3));
        assert!(rows[0].starts_with("0.25\t0.7"));
    }
}
