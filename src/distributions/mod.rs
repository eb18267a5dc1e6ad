//! Coordinate distributions, supports, and bijectors.
//!
//! The distribution layer supplies everything the model layer composes:
//! the [`CoordinateDistribution`] runtime contract and the
//! [`DistributionFamily`] declarative-constructor seam, concrete
//! univariate and multivariate families, the truncated grid Gaussian
//! mixture, concatenation over joint event spaces, general categorical
//! mixtures, and the constraint/transform pairs that describe supports.

pub mod concatenated;
pub mod constraints;
pub mod errors;
pub mod mixture;
pub mod multivariate;
pub mod traits;
pub mod transforms;
pub mod truncated_grid_gmm;
pub mod univariate;

pub use concatenated::ConcatenatedDistributions;
pub use constraints::Constraint;
pub use errors::{DistResult, DistributionError};
pub use mixture::GeneralMixture;
pub use multivariate::{DiagonalNormal, DiagonalNormalFamily};
pub use traits::{
    ConditionalValues, CoordinateDistribution, DistributionFamily, FamilyArgs, ParamValue,
};
pub use transforms::{biject_to, Transform};
pub use truncated_grid_gmm::{TruncatedGridGmm, TruncatedGridGmmFamily};
pub use univariate::{
    HeteroscedasticNormal, InterpNormal, InterpNormalFamily, NormalDist, NormalFamily, UniformDist,
    UniformFamily, COND_X_ARG,
};
