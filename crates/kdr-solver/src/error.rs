//! Error types for kdr-solver

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RodError>;

/// Construction and load-classification errors.
///
/// Numerical degeneracies during relaxation are never reported here; they
/// are handled in place with fallback formulas.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RodError {
    #[error("Rod requires at least one input frame")]
    EmptyInput,

    #[error("Rod requires at least {required} input frames, got {actual}")]
    TooFewNodes { required: usize, actual: usize },

    #[error("Mismatched configuration lengths: {rest} rest frames, {initial} initial frames")]
    MismatchedLength { rest: usize, initial: usize },

    #[error("Node index {index} out of range (rod has {count} input nodes)")]
    NodeOutOfRange { index: usize, count: usize },

    #[error("Edge index {index} out of range (rod has {count} input edges)")]
    EdgeOutOfRange { index: usize, count: usize },

    #[error("Element index {index} out of range ({count} elements)")]
    ElementOutOfRange { index: usize, count: usize },

    #[error("Load value is not finite: {0}")]
    NonFiniteLoad(String),

    #[error("Invalid section: {0}")]
    InvalidSection(String),
}
