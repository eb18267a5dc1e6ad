//! Declarative model composition: components, mixtures, and their
//! supporting machinery.

pub mod component;
pub mod core;
pub mod errors;
pub mod mixture;
pub mod stacked;

pub use component::{ComponentOptions, DataMap, ModelComponent, SampleSet, ERR_SUFFIX};
pub use self::core::{ComponentParams, CoordKey, GridEvaluation, ParamPrior, ParamSpec};
pub use errors::{ModelError, ModelResult};
pub use mixture::{
    ComponentMixtureModel, ExpandedMixtureParams, MixingSpec, MIXTURE_OBS_SITE, MIXTURE_PROBS_SITE,
};
pub use stacked::StackedComponent;
