use crate::alphabet::Alphabet;
use crate::error::{MotifError, Result};
use crate::posterior::PositionPosterior;
use crate::types::SequenceId;
use serde::{Deserialize, Serialize};

/// A single input sequence together with its alphabet encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    residues: Vec<u8>,
    codes: Vec<u8>,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// The raw residues as read.
    pub fn residues(&self) -> &[u8] {
        &self.residues
    }

    /// Alphabet row index of every residue.
    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    /// Number of admissible motif start offsets for a motif of `width`.
    pub fn num_offsets(&self, width: usize) -> usize {
        (self.len() + 1).saturating_sub(width)
    }
}

/// The motif occurrence picked in one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizedMotif {
    pub sequence: SequenceId,
    pub start: usize,
    pub motif: String,
}

/// An ordered, read-only set of sequences over one alphabet.
///
/// The position of a sequence in the collection is its identifier; every
/// derived table (posterior, counts) is indexed the same way, so two
/// textually identical sequences stay distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceCollection {
    alphabet: Alphabet,
    sequences: Vec<Sequence>,
    symbol_totals: Vec<usize>,
}

impl SequenceCollection {
    /// Validates and encodes `sequences` against `alphabet`.
    ///
    /// # Errors
    /// * `MotifError::InvalidInput` - if no sequence is given
    /// * `MotifError::InvalidSequence` - if a residue is not in the alphabet
    pub fn new<I>(alphabet: Alphabet, sequences: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut symbol_totals = vec![0; alphabet.len()];
        let sequences = sequences
            .into_iter()
            .enumerate()
            .map(|(idx, seq)| {
                let residues = seq.as_ref().to_vec();
                let codes = residues
                    .iter()
                    .enumerate()
                    .map(|(pos, &symbol)| {
                        let code = alphabet.index_of(symbol).ok_or_else(|| {
                            MotifError::invalid_sequence(
                                idx,
                                pos,
                                format!(
                                    "symbol '{}' is not in alphabet {}",
                                    symbol as char, alphabet
                                ),
                            )
                        })?;
                        symbol_totals[code] += 1;
                        Ok(code as u8)
                    })
                    .collect::<Result<Vec<u8>>>()?;
                Ok(Sequence { residues, codes })
            })
            .collect::<Result<Vec<_>>>()?;

        if sequences.is_empty() {
            return Err(MotifError::InvalidInput(
                "the sequence collection is empty".into(),
            ));
        }

        Ok(Self {
            alphabet,
            sequences,
            symbol_totals,
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.sequences.iter()
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Total number of residues over all sequences.
    pub fn total_residues(&self) -> usize {
        self.sequences.iter().map(Sequence::len).sum()
    }

    /// Checks that a motif of `width` fits into every sequence with at least
    /// two admissible start offsets.
    ///
    /// # Errors
    /// * `MotifError::InvalidInput` - if `width` is zero
    /// * `MotifError::SequenceTooShort` - for the first sequence not longer than `width`
    pub fn validate_width(&self, width: usize) -> Result<()> {
        if width == 0 {
            return Err(MotifError::InvalidInput(
                "the motif width must be at least 1".into(),
            ));
        }
        match self.sequences.iter().position(|seq| seq.len() <= width) {
            Some(sequence) => Err(MotifError::SequenceTooShort {
                sequence,
                length: self.sequences[sequence].len(),
                width,
            }),
            None => Ok(()),
        }
    }

    /// Number of occurrences of `symbol` over all sequences (0 if the symbol
    /// is not in the alphabet).
    pub fn count_symbol(&self, symbol: u8) -> usize {
        self.alphabet
            .index_of(symbol)
            .map_or(0, |row| self.symbol_totals[row])
    }

    /// Occurrences of every alphabet row, in alphabet order.
    pub fn symbol_totals(&self) -> &[usize] {
        &self.symbol_totals
    }

    /// Picks the most probable motif occurrence of every sequence.
    ///
    /// # Errors
    /// * `MotifError::InvalidInput` - the posterior was not computed for these
    ///   sequences and this width
    /// * `MotifError::DegenerateNormalization` - if a sequence has no strictly
    ///   positive start probability
    pub fn pick_out_motifs(
        &self,
        width: usize,
        posterior: &PositionPosterior,
    ) -> Result<Vec<RealizedMotif>> {
        posterior.fits(self, width)?;
        self.sequences
            .iter()
            .enumerate()
            .map(|(idx, seq)| {
                let start = posterior
                    .max_probability_start_position(idx)
                    .ok_or(MotifError::DegenerateNormalization { sequence: idx })?;
                let motif =
                    String::from_utf8_lossy(&seq.residues[start..start + width]).into_owned();
                Ok(RealizedMotif {
                    sequence: idx,
                    start,
                    motif,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy() -> SequenceCollection {
        SequenceCollection::new(Alphabet::dna(), ["ACGTAC", "GGGTTT", "ACGTAC"]).unwrap()
    }

    #[test]
    fn test_count_symbol() {
        let seqs = dummy();
        assert_eq!(seqs.count_symbol(b'A'), 4);
        assert_eq!(seqs.count_symbol(b'G'), 5);
        assert_eq!(seqs.count_symbol(b'N'), 0);
        assert_eq!(seqs.total_residues(), 18);
        assert_eq!(seqs.symbol_totals().iter().sum::<usize>(), 18);
    }

    #[test]
    fn test_identical_sequences_stay_distinct() {
        let seqs = dummy();
        assert_eq!(seqs.len(), 3);
        assert_eq!(seqs.get(0), seqs.get(2));
        assert_eq!(seqs.get(0).unwrap().codes(), &[0, 1, 2, 3, 0, 1]);
    }

    #[test]
    fn test_rejects_unknown_symbol() {
        let err = SequenceCollection::new(Alphabet::dna(), ["ACGT", "ACNT"]).unwrap_err();
        match err {
            MotifError::InvalidSequence {
                sequence, position, ..
            } => {
                assert_eq!(sequence, 1);
                assert_eq!(position, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_empty_collection() {
        let err = SequenceCollection::new(Alphabet::dna(), Vec::<&str>::new()).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_validate_width() {
        let seqs = dummy();
        assert!(seqs.validate_width(5).is_ok());
        assert!(matches!(
            seqs.validate_width(6),
            Err(MotifError::SequenceTooShort { sequence: 0, .. })
        ));
        assert!(seqs.validate_width(0).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_pick_out_motifs() {
        let seqs = dummy();
        let mut z = PositionPosterior::zeros(&seqs, 3);
        z.set_probability(0, 2, 0.7);
        z.set_probability(0, 0, 0.3);
        z.set_probability(1, 3, 1.0);
        z.set_probability(2, 0, 1.0);
        let picked = seqs.pick_out_motifs(3, &z).unwrap();
        assert_eq!(picked[0].start, 2);
        assert_eq!(picked[0].motif, "GTA");
        assert_eq!(picked[1].motif, "TTT");
        assert_eq!(picked[2].motif, "ACG");
    }

    #[test]
    fn test_pick_out_motifs_rejects_posterior_of_longer_sequences() {
        let short = SequenceCollection::new(Alphabet::dna(), ["ACGTA"]).unwrap();
        let long = SequenceCollection::new(Alphabet::dna(), ["ACGTACGTAC"]).unwrap();
        let mut z = PositionPosterior::zeros(&long, 3);
        z.set_probability(0, 7, 1.0);
        let err = short.pick_out_motifs(3, &z).unwrap_err();
        assert!(matches!(err, MotifError::InvalidInput(_)));
    }
}
