use crate::error::{MotifError, Result};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbols of the alphabets that can be requested by name
static NAMED_ALPHABETS: phf::Map<&'static str, &'static str> = phf_map! {
    "dna" => "ACGT",
    "rna" => "ACGU",
    "protein" => "ACDEFGHIKLMNPQRSTVWY",
};

/// A finite, ordered set of sequence symbols.
///
/// The position of a symbol in the alphabet is its row in every
/// probability or count table of the crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alphabet {
    symbols: Vec<u8>,
}

impl Alphabet {
    /// Builds an alphabet from its symbols, in table order. Symbols are
    /// uppercased, like the residues of every sequence file.
    ///
    /// # Errors
    /// * `MotifError::InvalidParameter` - fewer than two symbols or a repeated symbol
    pub fn new(symbols: impl AsRef<[u8]>) -> Result<Self> {
        let symbols = symbols.as_ref().to_ascii_uppercase();
        if symbols.len() < 2 {
            return Err(MotifError::invalid_parameter(
                "alphabet",
                String::from_utf8_lossy(&symbols),
                "must contain at least two symbols",
            ));
        }
        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                return Err(MotifError::invalid_parameter(
                    "alphabet",
                    String::from_utf8_lossy(&symbols),
                    format!("symbol '{}' appears more than once", *symbol as char),
                ));
            }
        }
        Ok(Self { symbols })
    }

    /// The four-letter DNA alphabet `ACGT`.
    pub fn dna() -> Self {
        Self {
            symbols: b"ACGT".to_vec(),
        }
    }

    /// Looks up a named alphabet (`dna`, `rna`, `protein`), falling back to
    /// interpreting `name` as the literal list of symbols.
    pub fn from_name(name: &str) -> Result<Self> {
        match NAMED_ALPHABETS.get(name.to_ascii_lowercase().as_str()) {
            Some(symbols) => Self::new(*symbols),
            None => Self::new(name),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Row index of `symbol`, if it belongs to the alphabet.
    pub fn index_of(&self, symbol: u8) -> Option<usize> {
        self.symbols.iter().position(|&s| s == symbol)
    }

    /// Symbol stored at row `index`.
    ///
    /// # Panics
    /// * Panics if `index` is not smaller than the alphabet length
    pub fn symbol(&self, index: usize) -> u8 {
        self.symbols[index]
    }

    pub fn contains(&self, symbol: u8) -> bool {
        self.index_of(symbol).is_some()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::dna()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.symbols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dna_order() {
        let dna = Alphabet::dna();
        assert_eq!(dna.len(), 4);
        assert_eq!(dna.index_of(b'A'), Some(0));
        assert_eq!(dna.index_of(b'T'), Some(3));
        assert_eq!(dna.index_of(b'N'), None);
        assert_eq!(dna.symbol(2), b'G');
    }

    #[test]
    fn test_named_alphabets() {
        assert_eq!(Alphabet::from_name("DNA").unwrap(), Alphabet::dna());
        assert_eq!(Alphabet::from_name("rna").unwrap().symbols(), b"ACGU");
        assert_eq!(Alphabet::from_name("protein").unwrap().len(), 20);
        // anything else is taken literally
        assert_eq!(Alphabet::from_name("ab").unwrap().symbols(), b"AB");
    }

    #[test]
    fn test_rejects_degenerate_alphabets() {
        assert!(Alphabet::new("A").is_err());
        assert!(Alphabet::new("").is_err());
        assert!(Alphabet::new("ACGA").is_err());
        // case folds before the duplicate check
        assert!(Alphabet::new("aA").is_err());
    }

    #[test]
    fn test_symbols_are_uppercased() {
        let ab = Alphabet::new("ab").unwrap();
        assert_eq!(ab.symbols(), b"AB");
        assert_eq!(ab, Alphabet::new("AB").unwrap());
        assert_eq!(Alphabet::new("acgt").unwrap(), Alphabet::dna());
    }
}
