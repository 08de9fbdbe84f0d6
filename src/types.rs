use polars::prelude::*;

/// Represents a Position Weight Matrix (PWM)
/// Stored as a DataFrame with one column per alphabet symbol and one row per motif position
pub type PWM = DataFrame;

/// Index of a sequence in its collection
pub type SequenceId = usize;
