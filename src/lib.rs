//! Motif discovery with expectation-maximization under the one-occurrence-per-sequence model

pub mod alphabet;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod model;
pub mod posterior;
pub mod sequence;
pub mod statistics;
pub mod types;
