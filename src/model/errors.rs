//! Errors for model declaration, composition, and evaluation.
//!
//! This module defines [`ModelError`], the unified error type of the
//! model layer, covering declaration validation, the naming codec,
//! dependency resolution, grid evaluation, registration, and mixture
//! composition. Errors from the distribution and substrate layers are
//! carried through dedicated wrapper variants so callers see one error
//! type at the model surface.
//!
//! ## Conventions
//! - Coordinate keys appear in payloads as their codec labels (joint
//!   tuples joined by `-`).
//! - Construction-time failures are fatal: a component or mixture either
//!   satisfies all of its invariants or is never built.

use crate::distributions::DistributionError;
use crate::probability::TraceError;

/// Result alias for model operations that may produce [`ModelError`].
pub type ModelResult<T> = Result<T, ModelError>;

/// Unified error type for the model layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    // ---- Declaration validation ----
    /// `coord_distributions` and `coord_parameters` disagree on keys.
    CoordKeyMismatch {
        missing_in_parameters: Vec<String>,
        missing_in_distributions: Vec<String>,
    },

    /// A coordinate name appears in more than one key (or twice in one).
    DuplicateCoordinate { name: String },

    /// A component, coordinate, or argument name contains a reserved
    /// separator character.
    ReservedCharacter { name: String, character: char },

    /// A flat parameter name does not decode as
    /// `component:coordinate:argument`.
    MalformedName { name: String, reason: &'static str },

    /// A referenced coordinate is not declared by the component.
    UnknownCoordinate { name: String },

    /// A joint key spans more than two coordinates where a 2-D operation
    /// was requested.
    UnsupportedJointDimension { key: String, dims: usize },

    // ---- Dependency resolution ----
    /// The conditional-data graph contains a cycle among these keys.
    CircularDependency { keys: Vec<String> },

    // ---- Grid evaluation ----
    /// A requested grid pair does not lead with the independent
    /// coordinate.
    GridAxisMismatch { expected: String, found: String },

    /// A grid pair names the same coordinate twice.
    DegeneratePair { name: String },

    /// No 1-D grid was supplied for a coordinate that needs one.
    MissingGrid { name: String },

    /// A 1-D grid is malformed (too short, non-finite, or unsorted).
    InvalidGrid { name: String, reason: &'static str },

    /// The coordinate only exists inside a joint key, so it has no
    /// standalone marginal distribution to evaluate.
    JointOnlyCoordinate { name: String },

    // ---- Parameter resolution ----
    /// A drawable parameter had to be drawn but no trace was supplied.
    TraceRequired { site: String },

    /// A prior hyperparameter is outside its domain.
    InvalidPrior { name: &'static str, value: f64 },

    /// A parameter value has the wrong kind for its use.
    ParamKind { name: String, expected: &'static str },

    /// A required parameter is absent from the supplied values.
    MissingParameter { name: String },

    // ---- Registration ----
    /// Observation data lacks a declared coordinate.
    MissingData { name: String },

    /// Observation columns disagree in length.
    DataLengthMismatch { name: String, expected: usize, actual: usize },

    /// Per-point uncertainty was declared for a jointly-modeled
    /// coordinate, which has no per-coordinate error model.
    JointUncertaintyUnsupported { coord: String },

    // ---- Mixture composition ----
    /// The mixing distribution's size differs from the component count.
    MixtureSizeMismatch { weights: usize, components: usize },

    /// Two mixture components share a name.
    DuplicateComponentName { name: String },

    /// A component's coordinate names differ from the first component's.
    ComponentCoordMismatch { component: String },

    /// A mixing weight is negative, non-finite, or the weights sum to
    /// zero.
    InvalidMixingWeight { index: usize, value: f64 },

    // ---- Wrapped lower layers ----
    /// Error from the distribution layer.
    Distribution(DistributionError),

    /// Error from the probabilistic-site substrate.
    Trace(TraceError),
}

impl std::error::Error for ModelError {}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::CoordKeyMismatch { missing_in_parameters, missing_in_distributions } => {
                write!(
                    f,
                    "coord_distributions and coord_parameters must have identical keys; \
                     missing in parameters: {missing_in_parameters:?}, \
                     missing in distributions: {missing_in_distributions:?}"
                )
            }
            ModelError::DuplicateCoordinate { name } => {
                write!(f, "Coordinate {name:?} is declared more than once.")
            }
            ModelError::ReservedCharacter { name, character } => {
                write!(f, "Name {name:?} contains the reserved character {character:?}.")
            }
            ModelError::MalformedName { name, reason } => {
                write!(f, "Flat parameter name {name:?} is malformed: {reason}")
            }
            ModelError::UnknownCoordinate { name } => {
                write!(f, "{name:?} is not a valid coordinate name for this component.")
            }
            ModelError::UnsupportedJointDimension { key, dims } => {
                write!(f, "Joint key {key:?} spans {dims} coordinates; 2-D evaluation supports two.")
            }
            ModelError::CircularDependency { keys } => {
                write!(f, "Circular dependency in conditional_data among: {keys:?}")
            }
            ModelError::GridAxisMismatch { expected, found } => {
                write!(
                    f,
                    "All grid pairs must share the independent coordinate {expected:?}; found {found:?}"
                )
            }
            ModelError::DegeneratePair { name } => {
                write!(f, "Grid pair names the coordinate {name:?} twice.")
            }
            ModelError::MissingGrid { name } => {
                write!(f, "A 1-D grid for coordinate {name:?} is required but was not supplied.")
            }
            ModelError::InvalidGrid { name, reason } => {
                write!(f, "Grid for coordinate {name:?} is invalid: {reason}")
            }
            ModelError::JointOnlyCoordinate { name } => {
                write!(
                    f,
                    "Coordinate {name:?} is only modeled jointly and has no standalone marginal."
                )
            }
            ModelError::TraceRequired { site } => {
                write!(
                    f,
                    "Parameter site {site:?} is drawable but no trace was supplied; \
                     pass explicit values for deterministic evaluation."
                )
            }
            ModelError::InvalidPrior { name, value } => {
                write!(f, "Prior hyperparameter {name:?} is outside its domain; got: {value}")
            }
            ModelError::ParamKind { name, expected } => {
                write!(f, "Parameter {name:?} must be a {expected}.")
            }
            ModelError::MissingParameter { name } => {
                write!(f, "Required parameter {name:?} was not supplied.")
            }
            ModelError::MissingData { name } => {
                write!(f, "Observation data for coordinate {name:?} is missing.")
            }
            ModelError::DataLengthMismatch { name, expected, actual } => {
                write!(f, "Data column {name:?} has length {actual}; expected {expected}.")
            }
            ModelError::JointUncertaintyUnsupported { coord } => {
                write!(
                    f,
                    "Per-point uncertainty for {coord:?} is unsupported: the coordinate is \
                     modeled jointly."
                )
            }
            ModelError::MixtureSizeMismatch { weights, components } => {
                write!(
                    f,
                    "The mixing distribution has size {weights}, but the mixture has \
                     {components} components."
                )
            }
            ModelError::DuplicateComponentName { name } => {
                write!(f, "Mixture components must have unique names; {name:?} repeats.")
            }
            ModelError::ComponentCoordMismatch { component } => {
                write!(
                    f,
                    "Component {component:?} declares different coordinate names than the \
                     first component."
                )
            }
            ModelError::InvalidMixingWeight { index, value } => {
                write!(f, "Mixing weight at index {index} is invalid: {value}")
            }
            ModelError::Distribution(err) => write!(f, "{err}"),
            ModelError::Trace(err) => write!(f, "{err}"),
        }
    }
}

impl From<DistributionError> for ModelError {
    fn from(err: DistributionError) -> ModelError {
        ModelError::Distribution(err)
    }
}

impl From<TraceError> for ModelError {
    fn from(err: TraceError) -> ModelError {
        ModelError::Trace(err)
    }
}
