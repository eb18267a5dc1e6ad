//! Contracts for pluggable coordinate distributions.
//!
//! Purpose
//! -------
//! Define the two seams the model layer composes against:
//! [`CoordinateDistribution`], the runtime contract every per-coordinate
//! distribution satisfies, and [`DistributionFamily`], the declarative
//! constructor invoked with named, possibly-drawn arguments.
//!
//! Conventions
//! -----------
//! - Batched values are `Array2<f64>` with shape `(batch, event)`; a
//!   univariate distribution has event size 1 and sees an `(n, 1)` input.
//! - `log_prob` returns one value per batch row; there is never a
//!   trailing event dimension in the output.
//! - Conditional inputs are runtime per-batch-element values (e.g. the
//!   coordinate another coordinate's parameters are a function of),
//!   passed as named 1-D arrays aligned with the batch axis.
//! - A distribution whose parameters are fixed by conditional inputs
//!   derives its batch size from them and ignores the requested sample
//!   count (the conditioning already fixes the batch).

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView2};

use crate::distributions::constraints::Constraint;
use crate::distributions::errors::{DistResult, DistributionError};
use crate::probability::RandomKey;

/// Named runtime inputs for conditional distributions, aligned with the
/// evaluation batch.
pub type ConditionalValues = BTreeMap<String, Array1<f64>>;

/// A resolved constructor argument: a scalar or a vector.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(f64),
    Vector(Array1<f64>),
}

impl ParamValue {
    /// View this value as a scalar.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ParamValue::Scalar(v) => Some(*v),
            ParamValue::Vector(_) => None,
        }
    }

    /// View this value as a vector.
    pub fn as_vector(&self) -> Option<&Array1<f64>> {
        match self {
            ParamValue::Scalar(_) => None,
            ParamValue::Vector(v) => Some(v),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Scalar(v)
    }
}

impl From<Array1<f64>> for ParamValue {
    fn from(v: Array1<f64>) -> Self {
        ParamValue::Vector(v)
    }
}

/// Named constructor arguments for a [`DistributionFamily`].
pub type FamilyArgs = BTreeMap<String, ParamValue>;

/// Runtime contract for a distribution over one coordinate or one joint
/// tuple of coordinates.
pub trait CoordinateDistribution: Send + Sync + std::fmt::Debug {
    /// Size of the trailing event axis (1 for univariate).
    fn event_size(&self) -> usize;

    /// The region of event space this distribution assigns mass to.
    fn support(&self) -> Constraint;

    /// Log-density of each batch row of `value`, shape `(batch,)`.
    fn log_prob(&self, value: ArrayView2<'_, f64>, cond: &ConditionalValues) -> DistResult<Array1<f64>>;

    /// Draw `n` events as an `(n, event_size)` array.
    ///
    /// Distributions bound to conditional inputs take their batch size
    /// from those inputs instead of `n`.
    fn sample(&self, key: RandomKey, n: usize, cond: &ConditionalValues) -> DistResult<Array2<f64>>;
}

/// A declarative distribution constructor: maps named argument values
/// (literal, drawn from priors, or wrapped) to a ready distribution.
pub trait DistributionFamily: Send + Sync {
    /// Short name used in error payloads and diagnostics.
    fn family_name(&self) -> &'static str;

    /// Build a distribution from resolved arguments.
    fn construct(&self, args: &FamilyArgs) -> DistResult<Box<dyn CoordinateDistribution>>;
}

/// Fetch a required scalar argument from a family's argument map.
pub fn scalar_arg(args: &FamilyArgs, arg: &str) -> DistResult<f64> {
    match args.get(arg) {
        None => Err(DistributionError::MissingArgument { arg: arg.to_string() }),
        Some(ParamValue::Scalar(v)) => Ok(*v),
        Some(ParamValue::Vector(_)) => {
            Err(DistributionError::ArgumentKind { arg: arg.to_string(), expected: "scalar" })
        }
    }
}

/// Fetch a required vector argument from a family's argument map.
pub fn vector_arg<'a>(args: &'a FamilyArgs, arg: &str) -> DistResult<&'a Array1<f64>> {
    match args.get(arg) {
        None => Err(DistributionError::MissingArgument { arg: arg.to_string() }),
        Some(ParamValue::Vector(v)) => Ok(v),
        Some(ParamValue::Scalar(_)) => {
            Err(DistributionError::ArgumentKind { arg: arg.to_string(), expected: "vector" })
        }
    }
}

/// Reject inputs whose trailing axis is not the expected event size.
pub fn check_event_size(value: &ArrayView2<'_, f64>, expected: usize) -> DistResult<()> {
    let actual = value.ncols();
    if actual != expected {
        return Err(DistributionError::EventSizeMismatch { expected, actual });
    }
    Ok(())
}

/// Fetch a required conditional input and check it against the batch size.
pub fn conditional_input<'a>(
    cond: &'a ConditionalValues, arg: &str, batch: Option<usize>,
) -> DistResult<&'a Array1<f64>> {
    let values = cond
        .get(arg)
        .ok_or_else(|| DistributionError::MissingConditional { arg: arg.to_string() })?;
    if let Some(expected) = batch {
        if values.len() != expected {
            return Err(DistributionError::ConditionalLengthMismatch {
                arg: arg.to_string(),
                expected,
                actual: values.len(),
            });
        }
    }
    Ok(values)
}
