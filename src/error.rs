use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotifError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid symbol in sequence {sequence} at position {position}: {message}")]
    InvalidSequence {
        sequence: usize,
        position: usize,
        message: String,
    },

    #[error("Sequence {sequence} has length {length}, but the motif width is {width}")]
    SequenceTooShort {
        sequence: usize,
        length: usize,
        width: usize,
    },

    #[error("Invalid parameter: {name} = {value}, {message}")]
    InvalidParameter {
        name: String,
        value: String,
        message: String,
    },

    #[error("Likelihoods of sequence {sequence} sum to zero; the posterior cannot be normalized")]
    DegenerateNormalization { sequence: usize },

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Data error: {0}")]
    DataError(String),
}

/// Type alias for Result with MotifError
pub type Result<T> = std::result::Result<T, MotifError>;

impl MotifError {
    /// Create a new InvalidSequence error
    pub fn invalid_sequence(sequence: usize, position: usize, message: impl Into<String>) -> Self {
        MotifError::InvalidSequence {
            sequence,
            position,
            message: message.into(),
        }
    }

    /// Create a new InvalidParameter error
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        MotifError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error rejects the caller's input before any computation ran
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            MotifError::InvalidInput(_)
                | MotifError::InvalidSequence { .. }
                | MotifError::SequenceTooShort { .. }
        )
    }
}

impl From<polars::prelude::PolarsError> for MotifError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        MotifError::DataError(e.to_string())
    }
}
