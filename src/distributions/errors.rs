//! Errors for distribution construction and evaluation.
//!
//! Follows the crate convention: one enum with struct-variant payloads,
//! manual `Display`, and `From` conversions for the statrs constructor
//! errors that back several of the concrete distributions.

use statrs::distribution::{GammaError, LogNormalError, NormalError, UniformError};

/// Result alias for distribution operations that may produce
/// [`DistributionError`].
pub type DistResult<T> = Result<T, DistributionError>;

/// Unified error type for the distribution layer.
#[derive(Debug, Clone, PartialEq)]
pub enum DistributionError {
    // ---- Parameter validation ----
    /// A scalar parameter is non-finite or outside its domain.
    InvalidParameter { name: &'static str, value: f64 },

    /// A vector parameter entry is non-finite or outside its domain.
    InvalidParameterEntry { name: &'static str, index: usize, value: f64 },

    /// Two related vectors (or a vector and an expected size) disagree.
    LengthMismatch { what: &'static str, expected: usize, actual: usize },

    /// Interpolation knots must be strictly increasing.
    KnotsNotIncreasing { index: usize },

    // ---- Family construction ----
    /// A required constructor argument is absent.
    MissingArgument { arg: String },

    /// A constructor argument has the wrong kind (scalar vs vector).
    ArgumentKind { arg: String, expected: &'static str },

    // ---- Evaluation ----
    /// The trailing (event) axis of the input has the wrong size.
    EventSizeMismatch { expected: usize, actual: usize },

    /// A conditional input required at call time was not supplied.
    MissingConditional { arg: String },

    /// A conditional input's length disagrees with the evaluation batch.
    ConditionalLengthMismatch { arg: String, expected: usize, actual: usize },

    // ---- Sampling ----
    /// The distribution does not support sampling.
    SamplingUnsupported { distribution: &'static str },

    // ---- Composition ----
    /// A concatenation or mixture was declared with no members.
    EmptyComposite { what: &'static str },

    // ---- statrs constructor errors ----
    /// Wrapper for `statrs::distribution::NormalError`.
    InvalidNormal,

    /// Wrapper for `statrs::distribution::UniformError`.
    InvalidUniform,

    /// Wrapper for `statrs::distribution::GammaError`.
    InvalidGamma,

    /// Wrapper for `statrs::distribution::LogNormalError`.
    InvalidLogNormal,
}

impl std::error::Error for DistributionError {}

impl std::fmt::Display for DistributionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionError::InvalidParameter { name, value } => {
                write!(f, "Parameter {name:?} must be finite and in its domain; got: {value}")
            }
            DistributionError::InvalidParameterEntry { name, index, value } => {
                write!(
                    f,
                    "Parameter {name:?} entry at index {index} must be finite and in its domain; got: {value}"
                )
            }
            DistributionError::LengthMismatch { what, expected, actual } => {
                write!(f, "Length mismatch for {what}: expected {expected}, got {actual}")
            }
            DistributionError::KnotsNotIncreasing { index } => {
                write!(f, "Knots must be strictly increasing; violation at index {index}")
            }
            DistributionError::MissingArgument { arg } => {
                write!(f, "Required constructor argument {arg:?} was not supplied.")
            }
            DistributionError::ArgumentKind { arg, expected } => {
                write!(f, "Constructor argument {arg:?} must be a {expected}.")
            }
            DistributionError::EventSizeMismatch { expected, actual } => {
                write!(f, "Event axis size mismatch: expected {expected}, got {actual}")
            }
            DistributionError::MissingConditional { arg } => {
                write!(f, "Conditional input {arg:?} is required but was not supplied.")
            }
            DistributionError::ConditionalLengthMismatch { arg, expected, actual } => {
                write!(
                    f,
                    "Conditional input {arg:?} has length {actual}, but the batch has length {expected}"
                )
            }
            DistributionError::SamplingUnsupported { distribution } => {
                write!(f, "Sampling is not implemented for {distribution}.")
            }
            DistributionError::EmptyComposite { what } => {
                write!(f, "A {what} needs at least one member distribution.")
            }
            DistributionError::InvalidNormal => {
                write!(f, "Normal distribution requires a finite mean and standard deviation > 0.")
            }
            DistributionError::InvalidUniform => {
                write!(f, "Uniform distribution requires finite bounds with low < high.")
            }
            DistributionError::InvalidGamma => {
                write!(f, "Gamma distribution requires shape > 0 and rate > 0.")
            }
            DistributionError::InvalidLogNormal => {
                write!(f, "Log-normal distribution requires a finite location and scale > 0.")
            }
        }
    }
}

impl From<NormalError> for DistributionError {
    fn from(_: NormalError) -> DistributionError {
        DistributionError::InvalidNormal
    }
}

impl From<UniformError> for DistributionError {
    fn from(_: UniformError) -> DistributionError {
        DistributionError::InvalidUniform
    }
}

impl From<GammaError> for DistributionError {
    fn from(_: GammaError) -> DistributionError {
        DistributionError::InvalidGamma
    }
}

impl From<LogNormalError> for DistributionError {
    fn from(_: LogNormalError) -> DistributionError {
        DistributionError::InvalidLogNormal
    }
}
