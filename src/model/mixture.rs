//! Weighted mixtures of model components.
//!
//! Purpose
//! -------
//! [`ComponentMixtureModel`] composes several [`ModelComponent`]s — e.g.
//! a "stream" and a "background" population sharing one observation
//! space — under a categorical mixing distribution. It unifies the
//! components' parameter namespaces behind component-name prefixes,
//! registers one mixture observation site over the column-stacked data,
//! and aggregates per-component grid evaluations with a weighted
//! log-sum-exp.
//!
//! Invariants & assumptions
//! ------------------------
//! - The mixing spec's size equals the component count.
//! - Components have unique names and declare the same coordinate-name
//!   sequence, so their stacked event spaces align column-for-column.
//! - Observation columns stack in the first component's declared
//!   coordinate order.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};

use crate::distributions::{ConditionalValues, CoordinateDistribution, GeneralMixture, ParamValue};
use crate::model::component::{DataMap, ModelComponent};
use crate::model::core::grids::GridEvaluation;
use crate::model::core::params::{to_site_value, ComponentParams, ParamPrior};
use crate::model::errors::{ModelError, ModelResult};
use crate::model::stacked::StackedComponent;
use crate::numerics::logsumexp_weighted_stack;
use crate::probability::{SiteValue, Trace};

/// Site name under which the mixing probabilities are registered.
pub const MIXTURE_PROBS_SITE: &str = "mixture-probs";

/// Site name of the mixture observation over the stacked data.
pub const MIXTURE_OBS_SITE: &str = "mixture";

/// The mixing distribution over components: fixed probabilities or a
/// drawable Dirichlet prior.
#[derive(Debug, Clone)]
pub enum MixingSpec {
    /// Fixed probabilities, normalized at construction.
    Fixed(Array1<f64>),
    /// Dirichlet prior with the given concentration.
    Dirichlet(Array1<f64>),
}

impl MixingSpec {
    /// Fixed mixing probabilities (normalized internally).
    ///
    /// # Errors
    /// - [`ModelError::InvalidMixingWeight`] on negative or non-finite
    ///   entries, or weights summing to zero.
    pub fn fixed(weights: Array1<f64>) -> ModelResult<Self> {
        for (i, &w) in weights.iter().enumerate() {
            if !w.is_finite() || w < 0.0 {
                return Err(ModelError::InvalidMixingWeight { index: i, value: w });
            }
        }
        let total = weights.sum();
        if total <= 0.0 {
            return Err(ModelError::InvalidMixingWeight { index: 0, value: total });
        }
        Ok(MixingSpec::Fixed(weights / total))
    }

    /// Drawable Dirichlet prior over the mixing probabilities.
    ///
    /// # Errors
    /// - [`ModelError::InvalidPrior`] on an invalid concentration.
    pub fn dirichlet(concentration: Array1<f64>) -> ModelResult<Self> {
        // Validation through the prior constructor keeps one source of
        // truth for concentration invariants.
        ParamPrior::dirichlet(concentration.clone())?;
        Ok(MixingSpec::Dirichlet(concentration))
    }

    /// Number of mixture components this spec describes.
    pub fn event_size(&self) -> usize {
        match self {
            MixingSpec::Fixed(weights) => weights.len(),
            MixingSpec::Dirichlet(concentration) => concentration.len(),
        }
    }
}

/// A mixture's flat parameter map, expanded: per-component nested
/// parameters plus any un-prefixed leftovers (e.g. the mixing weights).
#[derive(Debug, Clone, Default)]
pub struct ExpandedMixtureParams {
    pub components: BTreeMap<String, ComponentParams>,
    pub extra: BTreeMap<String, ParamValue>,
}

/// Several model components under one categorical mixing distribution.
#[derive(Debug)]
pub struct ComponentMixtureModel {
    mixing: MixingSpec,
    components: Vec<ModelComponent>,
}

impl ComponentMixtureModel {
    /// Compose `components` under `mixing`.
    ///
    /// # Errors
    /// - [`ModelError::MixtureSizeMismatch`] if the mixing size differs
    ///   from the component count.
    /// - [`ModelError::DuplicateComponentName`] on repeated names.
    /// - [`ModelError::ComponentCoordMismatch`] if any component's
    ///   coordinate-name sequence differs from the first component's.
    pub fn new(mixing: MixingSpec, components: Vec<ModelComponent>) -> ModelResult<Self> {
        if mixing.event_size() != components.len() {
            return Err(ModelError::MixtureSizeMismatch {
                weights: mixing.event_size(),
                components: components.len(),
            });
        }
        for (i, component) in components.iter().enumerate() {
            if components[..i].iter().any(|c| c.name() == component.name()) {
                return Err(ModelError::DuplicateComponentName {
                    name: component.name().to_string(),
                });
            }
            if component.coord_names() != components[0].coord_names() {
                return Err(ModelError::ComponentCoordMismatch {
                    component: component.name().to_string(),
                });
            }
        }
        Ok(ComponentMixtureModel { mixing, components })
    }

    /// The mixture's components, in declaration order.
    pub fn components(&self) -> &[ModelComponent] {
        &self.components
    }

    /// Register the mixture against observed data.
    ///
    /// Draws the mixing probabilities (or records the fixed vector),
    /// builds every component's distributions — registering their
    /// parameter sites under component-name prefixes — and conditions
    /// one categorical-mixture observation site on the column-stacked
    /// data, stacked in the first component's declared coordinate order.
    pub fn register(&self, data: &DataMap, trace: &mut Trace) -> ModelResult<()> {
        let probs = match &self.mixing {
            MixingSpec::Fixed(weights) => {
                trace.record_sample(MIXTURE_PROBS_SITE, SiteValue::Vector(weights.clone()), 0.0)?;
                weights.clone()
            }
            MixingSpec::Dirichlet(concentration) => {
                let prior = ParamPrior::dirichlet(concentration.clone())?;
                let sub_key = trace.draw_key();
                let value = prior.sample(sub_key)?;
                let log_prob = prior.log_prob(&value)?;
                trace.record_sample(MIXTURE_PROBS_SITE, to_site_value(&value), log_prob)?;
                value.as_vector().expect("dirichlet draws are vectors").clone()
            }
        };

        let mut members: Vec<Box<dyn CoordinateDistribution>> =
            Vec::with_capacity(self.components.len());
        for component in &self.components {
            let (dists, resolved) = component.make_dists(&ComponentParams::new(), Some(trace))?;
            if let Some(prior_fn) = component.extra_log_prior() {
                trace.record_factor(&format!("{}-extra-prior", component.name()), prior_fn(&resolved))?;
            }
            members.push(Box::new(StackedComponent::new(component, dists)?));
        }

        let names = self.components[0].coord_names();
        let n = data
            .get(&names[0])
            .ok_or_else(|| ModelError::MissingData { name: names[0].clone() })?
            .len();
        let mut stacked = Array2::zeros((n, names.len()));
        for (j, name) in names.iter().enumerate() {
            let column =
                data.get(name).ok_or_else(|| ModelError::MissingData { name: name.clone() })?;
            if column.len() != n {
                return Err(ModelError::DataLengthMismatch {
                    name: name.clone(),
                    expected: n,
                    actual: column.len(),
                });
            }
            stacked.column_mut(j).assign(column);
        }

        let mixture = GeneralMixture::new(probs, members)?;
        let log_prob = mixture.log_prob(stacked.view(), &ConditionalValues::new())?.sum();
        trace.record_observed(MIXTURE_OBS_SITE, SiteValue::Matrix(stacked), log_prob)?;
        Ok(())
    }

    /// Partition a flat parameter map by component-name prefix, expand
    /// each partition, and keep un-prefixed keys at the top level.
    pub fn expand_params(
        &self, flat: &BTreeMap<String, ParamValue>,
    ) -> ModelResult<ExpandedMixtureParams> {
        let mut remaining = flat.clone();
        let mut expanded = ExpandedMixtureParams::default();
        for component in &self.components {
            let prefix = format!("{}:", component.name());
            let mut partition = BTreeMap::new();
            let keys: Vec<String> =
                remaining.keys().filter(|k| k.starts_with(&prefix)).cloned().collect();
            for key in keys {
                let value = remaining.remove(&key).expect("key came from the map");
                partition.insert(key, value);
            }
            expanded
                .components
                .insert(component.name().to_string(), component.expand_params(&partition)?);
        }
        expanded.extra = remaining;
        Ok(expanded)
    }

    /// Evaluate the mixture's log-density on 2-D grids.
    ///
    /// Delegates to every component with its own expanded parameter
    /// slice, then combines same-pair surfaces with a weighted
    /// log-sum-exp using the supplied `mixture-probs` as weights; a
    /// zero-weight component drops out exactly.
    pub fn evaluate_on_2d_grids(
        &self, flat: &BTreeMap<String, ParamValue>, grids: &BTreeMap<String, Array1<f64>>,
        pairs: Option<&[(String, String)]>, x_coord: Option<&str>,
    ) -> ModelResult<GridEvaluation> {
        let expanded = self.expand_params(flat)?;
        let probs = expanded
            .extra
            .get(MIXTURE_PROBS_SITE)
            .ok_or_else(|| ModelError::MissingParameter { name: MIXTURE_PROBS_SITE.to_string() })?
            .as_vector()
            .ok_or_else(|| ModelError::ParamKind {
                name: MIXTURE_PROBS_SITE.to_string(),
                expected: "vector",
            })?
            .clone();
        if probs.len() != self.components.len() {
            return Err(ModelError::MixtureSizeMismatch {
                weights: probs.len(),
                components: self.components.len(),
            });
        }

        let empty = ComponentParams::new();
        let mut meshes = None;
        let mut per_pair: BTreeMap<(String, String), Vec<Array2<f64>>> = BTreeMap::new();
        for component in &self.components {
            let values = expanded.components.get(component.name()).unwrap_or(&empty);
            let evaluation = component.evaluate_on_2d_grids(values, grids, pairs, x_coord)?;
            for (pair, surface) in evaluation.log_densities {
                per_pair.entry(pair).or_default().push(surface);
            }
            meshes = Some(evaluation.meshes);
        }

        let log_densities = per_pair
            .into_iter()
            .map(|(pair, surfaces)| (pair, logsumexp_weighted_stack(&surfaces, probs.view())))
            .collect();

        Ok(GridEvaluation { meshes: meshes.expect("at least one component"), log_densities })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ndarray::array;

    use crate::distributions::univariate::NormalFamily;
    use crate::model::component::ComponentOptions;
    use crate::model::core::coords::CoordKey;
    use crate::model::core::params::ParamSpec;
    use crate::probability::RandomKey;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Mixture construction invariants (size, name, coordinate checks).
    // - Namespace partitioning in `expand_params`.
    // - Registration site accounting with fixed and Dirichlet mixing.
    // - Degenerate-weight grid evaluation reproducing a single component.
    // -------------------------------------------------------------------------

    fn normal_params(loc: f64, scale: f64) -> std::collections::BTreeMap<String, ParamSpec> {
        let mut params = std::collections::BTreeMap::new();
        params.insert("loc".to_string(), ParamSpec::literal(loc));
        params.insert("scale".to_string(), ParamSpec::literal(scale));
        params
    }

    fn component(name: &str, x_loc: f64, y_loc: f64) -> ModelComponent {
        ModelComponent::new(
            name,
            vec![
                (CoordKey::single("x"), Arc::new(NormalFamily) as _),
                (CoordKey::single("y"), Arc::new(NormalFamily) as _),
            ],
            vec![
                (CoordKey::single("x"), normal_params(x_loc, 1.0)),
                (CoordKey::single("y"), normal_params(y_loc, 0.5)),
            ],
            ComponentOptions::default(),
        )
        .expect("component declaration is valid")
    }

    fn two_component_mixture(weights: Array1<f64>) -> ComponentMixtureModel {
        ComponentMixtureModel::new(
            MixingSpec::fixed(weights).unwrap(),
            vec![component("stream", 0.0, 1.0), component("bg", 3.0, -1.0)],
        )
        .unwrap()
    }

    #[test]
    fn mixing_size_must_match_the_component_count() {
        let err = ComponentMixtureModel::new(
            MixingSpec::fixed(array![0.5, 0.3, 0.2]).unwrap(),
            vec![component("stream", 0.0, 1.0), component("bg", 3.0, -1.0)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ModelError::MixtureSizeMismatch { weights: 3, components: 2 }
        ));
    }

    #[test]
    fn component_names_must_be_unique() {
        let err = ComponentMixtureModel::new(
            MixingSpec::fixed(array![0.5, 0.5]).unwrap(),
            vec![component("stream", 0.0, 1.0), component("stream", 3.0, -1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateComponentName { .. }));
    }

    #[test]
    fn expand_params_partitions_by_prefix_and_keeps_the_rest() {
        let mixture = two_component_mixture(array![0.5, 0.5]);
        let mut flat = BTreeMap::new();
        flat.insert("stream:x:loc".to_string(), ParamValue::Scalar(0.1));
        flat.insert("bg:y:scale".to_string(), ParamValue::Scalar(0.4));
        flat.insert(MIXTURE_PROBS_SITE.to_string(), ParamValue::Vector(array![0.7, 0.3]));

        let expanded = mixture.expand_params(&flat).unwrap();
        assert_eq!(
            expanded.components["stream"][&CoordKey::single("x")]["loc"],
            ParamValue::Scalar(0.1)
        );
        assert_eq!(
            expanded.components["bg"][&CoordKey::single("y")]["scale"],
            ParamValue::Scalar(0.4)
        );
        assert_eq!(expanded.extra[MIXTURE_PROBS_SITE], ParamValue::Vector(array![0.7, 0.3]));
    }

    #[test]
    fn register_creates_the_probs_and_mixture_sites() {
        let mixture = two_component_mixture(array![0.5, 0.5]);
        let mut data = DataMap::new();
        data.insert("x".to_string(), array![0.0, 0.5, 3.0]);
        data.insert("y".to_string(), array![1.0, 0.9, -1.1]);

        let mut trace = Trace::new(RandomKey::new(0));
        mixture.register(&data, &mut trace).unwrap();
        assert_eq!(trace.len(), 2);
        assert!(trace.site(MIXTURE_PROBS_SITE).is_some());
        assert!(trace.site(MIXTURE_OBS_SITE).is_some());
        assert!(trace.log_density().is_finite());
    }

    #[test]
    fn dirichlet_mixing_draws_probabilities_on_the_simplex() {
        let mixture = ComponentMixtureModel::new(
            MixingSpec::dirichlet(array![2.0, 2.0]).unwrap(),
            vec![component("stream", 0.0, 1.0), component("bg", 3.0, -1.0)],
        )
        .unwrap();
        let mut data = DataMap::new();
        data.insert("x".to_string(), array![0.0, 0.5]);
        data.insert("y".to_string(), array![1.0, 0.9]);

        let mut trace = Trace::new(RandomKey::new(9));
        mixture.register(&data, &mut trace).unwrap();
        let site = trace.site(MIXTURE_PROBS_SITE).unwrap();
        match &site.value {
            crate::probability::SiteValue::Vector(probs) => {
                assert_eq!(probs.len(), 2);
                assert!((probs.sum() - 1.0).abs() < 1e-12);
            }
            other => panic!("expected a probability vector, got {other:?}"),
        }
    }

    #[test]
    fn degenerate_weights_reproduce_the_live_component_exactly() {
        let mixture = two_component_mixture(array![0.5, 0.5]);
        let mut grids = BTreeMap::new();
        grids.insert("x".to_string(), Array1::linspace(-2.0, 2.0, 9));
        grids.insert("y".to_string(), Array1::linspace(-3.0, 3.0, 7));

        let mut flat = BTreeMap::new();
        flat.insert(MIXTURE_PROBS_SITE.to_string(), ParamValue::Vector(array![1.0, 0.0]));
        let mixture_eval = mixture.evaluate_on_2d_grids(&flat, &grids, None, None).unwrap();

        let stream_eval = mixture.components()[0]
            .evaluate_on_2d_grids(&ComponentParams::new(), &grids, None, None)
            .unwrap();

        let pair = ("x".to_string(), "y".to_string());
        // log-sum-exp degenerates to the single live term, bit for bit.
        assert_eq!(mixture_eval.log_densities[&pair], stream_eval.log_densities[&pair]);
    }

    #[test]
    fn evaluation_requires_the_mixing_probabilities() {
        let mixture = two_component_mixture(array![0.5, 0.5]);
        let mut grids = BTreeMap::new();
        grids.insert("x".to_string(), Array1::linspace(-2.0, 2.0, 9));
        grids.insert("y".to_string(), Array1::linspace(-3.0, 3.0, 7));

        let err = mixture.evaluate_on_2d_grids(&BTreeMap::new(), &grids, None, None).unwrap_err();
        assert!(matches!(err, ModelError::MissingParameter { .. }));
    }
}
