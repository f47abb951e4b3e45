//! Error types for TLE parsing, propagation, and track generation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrbitError {
    #[error("invalid TLE format: {0}")]
    InvalidFormat(String),

    #[error("TLE line {line} too short: {length} chars, need {expected}")]
    LineTooShort {
        line: u8,
        length: usize,
        expected: usize,
    },

    #[error("TLE line {line} starts with {found:?}, expected {expected:?}")]
    InvalidLineNumber { line: u8, found: char, expected: char },

    #[error("invalid TLE checksum on line {line}")]
    InvalidChecksum { line: u8 },

    #[error("catalog number mismatch between lines: {line1} vs {line2}")]
    CatalogNumberMismatch { line1: u32, line2: u32 },

    #[error("invalid Alpha-5 catalog number {0:?}")]
    InvalidAlpha5(String),

    #[error("invalid numeric field {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("TLE is missing line 1 or line 2")]
    MissingLines,

    #[error("SGP4 initialization failed: {0}")]
    KernelInit(String),

    #[error("propagation failed (orbital decay or invalid elements): {0}")]
    DecayedOrInvalid(String),

    #[error("invalid time range: start equals end")]
    InvalidRange,

    #[error("step must be positive")]
    InvalidStep,
}

pub type Result<T> = std::result::Result<T, OrbitError>;
