//! Core building blocks of the model layer: coordinate keys, the flat
//! site-name codec, dependency-ordered scheduling, parameter
//! specification/resolution, and grid handling.

pub mod coords;
pub mod grids;
pub mod naming;
pub mod order;
pub mod params;

pub use coords::CoordKey;
pub use grids::GridEvaluation;
pub use params::{ComponentParams, ParamPrior, ParamSpec, ParamWrapper};
