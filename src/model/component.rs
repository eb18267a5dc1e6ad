//! Declarative model components over named coordinates.
//!
//! Purpose
//! -------
//! [`ModelComponent`] owns one named set of coordinate distributions —
//! each responsible for a single coordinate or a fixed tuple of
//! jointly-modeled coordinates — together with their parameter
//! specifications and the conditional-data wiring between coordinates.
//! From that declaration it derives every runtime operation: building
//! concrete distributions with drawn or supplied parameters, evaluating
//! log-densities on 2-D grids with marginalization, dependency-ordered
//! sampling, and registration of observations against a trace.
//!
//! Key behaviors
//! -------------
//! - All declaration invariants are enforced once at construction;
//!   operations afterwards assume them.
//! - Parameter sites are registered under codec names in a fixed order
//!   (declared coordinate order, then sorted argument order), so the
//!   site ↔ draw correspondence is deterministic across repeated calls.
//! - Grid evaluation happens at bin centers of the supplied edge grids,
//!   with the independent coordinate's marginal obtained by log-domain
//!   quadrature when it is only modeled jointly.
//!
//! Invariants & assumptions
//! ------------------------
//! - `coord_distributions` and `coord_parameters` have identical key
//!   sets; coordinate names are unique across keys and free of reserved
//!   characters.
//! - The conditional-data graph has no direct 2-cycle (checked here);
//!   longer cycles surface when an evaluation order is first requested.
//! - The component is immutable after construction; all runtime values
//!   arrive as call arguments.

use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::{Array1, Array2, Axis};

use crate::distributions::univariate::HeteroscedasticNormal;
use crate::distributions::{
    ConditionalValues, CoordinateDistribution, DistributionFamily, FamilyArgs, ParamValue,
};
use crate::model::core::coords::CoordKey;
use crate::model::core::grids::{
    bin_centers, flatten_mesh, meshgrid_xy, validate_grid, GridEvaluation,
};
use crate::model::core::naming::{self, coord_label};
use crate::model::core::order::{check_two_cycles, resolve_order, ConditionalWiring};
use crate::model::core::params::{resolve, to_site_value, ComponentParams, ParamPrior, ParamSpec};
use crate::model::errors::{ModelError, ModelResult};
use crate::numerics::integrate::ln_simpson_axis;
use crate::probability::{RandomKey, SiteValue, Trace};

/// Observation data: one column per coordinate name, plus optional
/// `"<name>_err"` columns carrying per-point uncertainties.
pub type DataMap = BTreeMap<String, Array1<f64>>;

/// Built distributions per coordinate key, in declared order.
pub type CoordDists = Vec<(CoordKey, Box<dyn CoordinateDistribution>)>;

/// Optional scalar log-prior hook evaluated on the resolved parameters.
pub type ExtraLogPrior = Arc<dyn Fn(&ComponentParams) -> f64 + Send + Sync>;

/// Suffix marking a per-point uncertainty column in a [`DataMap`].
pub const ERR_SUFFIX: &str = "_err";

/// Optional pieces of a component declaration.
#[derive(Clone, Default)]
pub struct ComponentOptions {
    /// Designated independent coordinate; defaults to the first declared
    /// coordinate name.
    pub default_x_coord: Option<String>,
    /// Per dependent key: argument name → source coordinate name.
    pub conditional_data: ConditionalWiring,
    /// Extra scalar log-prior added once per registration.
    pub extra_log_prior: Option<ExtraLogPrior>,
}

/// Samples drawn from a component, keyed by declared coordinate key.
#[derive(Debug, Clone)]
pub struct SampleSet {
    entries: Vec<(CoordKey, Array2<f64>)>,
}

impl SampleSet {
    /// Samples for a declared key: shape `(n, key.len())`.
    pub fn get(&self, key: &CoordKey) -> Option<&Array2<f64>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The sample column of one coordinate name.
    pub fn column(&self, name: &str) -> Option<Array1<f64>> {
        self.entries.iter().find(|(k, _)| k.contains(name)).map(|(k, v)| {
            let j = k.names().iter().position(|n| n == name).expect("key contains the name");
            v.column(j).to_owned()
        })
    }

    /// Entries in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &(CoordKey, Array2<f64>)> {
        self.entries.iter()
    }

    /// Number of coordinate keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Wire conditional inputs for `key` from whatever source columns are
/// available; missing sources are simply omitted (the distribution
/// errors if a required input is absent).
pub(crate) fn conditional_slice(
    wiring: &ConditionalWiring, key: &CoordKey, available: &BTreeMap<String, Array1<f64>>,
) -> ConditionalValues {
    let mut out = ConditionalValues::new();
    if let Some(args) = wiring.get(key) {
        for (arg, source) in args {
            if let Some(values) = available.get(source) {
                out.insert(arg.clone(), values.clone());
            }
        }
    }
    out
}

/// One named set of coordinate distributions with parameter specs and
/// conditional wiring.
pub struct ModelComponent {
    name: String,
    coord_distributions: Vec<(CoordKey, Arc<dyn DistributionFamily>)>,
    coord_parameters: Vec<(CoordKey, BTreeMap<String, ParamSpec>)>,
    default_x_coord: String,
    conditional_data: ConditionalWiring,
    extra_log_prior: Option<ExtraLogPrior>,
    coord_names: Vec<String>,
    flat_param_names: Vec<String>,
}

impl std::fmt::Debug for ModelComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelComponent")
            .field("name", &self.name)
            .field("default_x_coord", &self.default_x_coord)
            .field("conditional_data", &self.conditional_data)
            .field("extra_log_prior", &self.extra_log_prior.as_ref().map(|_| "<closure>"))
            .field("coord_names", &self.coord_names)
            .field("flat_param_names", &self.flat_param_names)
            .finish_non_exhaustive()
    }
}

impl ModelComponent {
    /// Construct and validate a component declaration.
    ///
    /// # Errors
    /// - [`ModelError::ReservedCharacter`] if any component, coordinate,
    ///   or argument name contains a codec separator.
    /// - [`ModelError::CoordKeyMismatch`] if the distribution and
    ///   parameter maps disagree on keys.
    /// - [`ModelError::DuplicateCoordinate`] on repeated keys or names.
    /// - [`ModelError::UnknownCoordinate`] if `default_x_coord` or a
    ///   conditional key/source is undeclared.
    /// - [`ModelError::CircularDependency`] on a direct 2-cycle in the
    ///   conditional wiring.
    pub fn new(
        name: &str, coord_distributions: Vec<(CoordKey, Arc<dyn DistributionFamily>)>,
        coord_parameters: Vec<(CoordKey, BTreeMap<String, ParamSpec>)>, options: ComponentOptions,
    ) -> ModelResult<Self> {
        naming::validate_name(name)?;

        // Key-level checks: no repeats, identical key sets.
        let mut dist_keys: Vec<&CoordKey> = Vec::new();
        for (key, _) in &coord_distributions {
            if dist_keys.contains(&key) {
                return Err(ModelError::DuplicateCoordinate { name: coord_label(key) });
            }
            dist_keys.push(key);
        }
        let param_keys: Vec<&CoordKey> = coord_parameters.iter().map(|(k, _)| k).collect();
        let missing_in_parameters: Vec<String> = dist_keys
            .iter()
            .filter(|k| !param_keys.contains(k))
            .map(|k| coord_label(k))
            .collect();
        let missing_in_distributions: Vec<String> = param_keys
            .iter()
            .filter(|k| !dist_keys.contains(k))
            .map(|k| coord_label(k))
            .collect();
        if !missing_in_parameters.is_empty() || !missing_in_distributions.is_empty() {
            return Err(ModelError::CoordKeyMismatch {
                missing_in_parameters,
                missing_in_distributions,
            });
        }

        // Name-level checks: valid, unique coordinate names.
        let mut coord_names: Vec<String> = Vec::new();
        for (key, _) in &coord_distributions {
            for coord in key.names() {
                naming::validate_name(coord)?;
                if coord_names.contains(coord) {
                    return Err(ModelError::DuplicateCoordinate { name: coord.clone() });
                }
                coord_names.push(coord.clone());
            }
        }
        for (_, specs) in &coord_parameters {
            for arg in specs.keys() {
                naming::validate_name(arg)?;
            }
        }

        let default_x_coord = match options.default_x_coord {
            Some(x) => {
                if !coord_names.contains(&x) {
                    return Err(ModelError::UnknownCoordinate { name: x });
                }
                x
            }
            None => coord_names[0].clone(),
        };

        // Conditional wiring must reference declared keys and coordinates.
        for (key, args) in &options.conditional_data {
            if !dist_keys.contains(&key) {
                return Err(ModelError::UnknownCoordinate { name: coord_label(key) });
            }
            for source in args.values() {
                if !coord_names.contains(source) {
                    return Err(ModelError::UnknownCoordinate { name: source.clone() });
                }
            }
        }
        let keys: Vec<CoordKey> = coord_distributions.iter().map(|(k, _)| k.clone()).collect();
        check_two_cycles(&keys, &options.conditional_data)?;

        let flat_param_names = coord_distributions
            .iter()
            .flat_map(|(key, _)| {
                let specs = coord_parameters
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, s)| s)
                    .expect("key sets validated above");
                specs.keys().map(|arg| naming::encode(name, key, Some(arg))).collect::<Vec<_>>()
            })
            .collect();

        Ok(ModelComponent {
            name: name.to_string(),
            coord_distributions,
            coord_parameters,
            default_x_coord,
            conditional_data: options.conditional_data,
            extra_log_prior: options.extra_log_prior,
            coord_names,
            flat_param_names,
        })
    }

    /// The component's name (its parameter namespace prefix).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flattened coordinate names across all keys, in declared order.
    pub fn coord_names(&self) -> &[String] {
        &self.coord_names
    }

    /// The designated independent coordinate.
    pub fn default_x_coord(&self) -> &str {
        &self.default_x_coord
    }

    /// Declared coordinate keys, in order.
    pub fn coordinate_keys(&self) -> Vec<&CoordKey> {
        self.coord_distributions.iter().map(|(k, _)| k).collect()
    }

    /// Encoded names of every declared parameter site.
    pub fn flat_param_names(&self) -> &[String] {
        &self.flat_param_names
    }

    /// The conditional-data wiring.
    pub fn conditional_data(&self) -> &ConditionalWiring {
        &self.conditional_data
    }

    pub(crate) fn extra_log_prior(&self) -> Option<&ExtraLogPrior> {
        self.extra_log_prior.as_ref()
    }

    /// Regroup this component's flat parameter map into
    /// `coordinate key → argument → value`.
    pub fn expand_params(&self, flat: &BTreeMap<String, ParamValue>) -> ModelResult<ComponentParams> {
        naming::expand(flat)
    }

    /// Build one distribution per coordinate key.
    ///
    /// Each declared argument resolves by priority: an explicit entry in
    /// `values` wins; otherwise a drawable spec is drawn from its prior
    /// and registered with `trace` under its codec name (exactly once
    /// per call); otherwise the literal value is used. Wrappers apply to
    /// the resolved value before it reaches the family constructor.
    ///
    /// Returns the built distributions and the fully resolved parameter
    /// values that produced them.
    ///
    /// # Errors
    /// - [`ModelError::TraceRequired`] if a drawable argument must be
    ///   drawn but `trace` is `None`.
    /// - Any distribution-constructor error, wrapped.
    pub fn make_dists(
        &self, values: &ComponentParams, mut trace: Option<&mut Trace>,
    ) -> ModelResult<(CoordDists, ComponentParams)> {
        let mut dists: CoordDists = Vec::with_capacity(self.coord_distributions.len());
        let mut resolved_all = ComponentParams::new();

        for (key, family) in &self.coord_distributions {
            let specs = self
                .coord_parameters
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, s)| s)
                .expect("key sets validated at construction");

            let mut args = FamilyArgs::new();
            for (arg, spec) in specs {
                let override_value = values.get(key).and_then(|m| m.get(arg));
                let site = naming::encode(&self.name, key, Some(arg));
                let mut draw = |prior: &ParamPrior| {
                    let t = trace
                        .as_deref_mut()
                        .ok_or_else(|| ModelError::TraceRequired { site: site.clone() })?;
                    let sub_key = t.draw_key();
                    let value = prior.sample(sub_key)?;
                    let log_prob = prior.log_prob(&value)?;
                    t.record_sample(&site, to_site_value(&value), log_prob)?;
                    Ok(value)
                };
                let value = resolve(spec, override_value, &mut draw)?;
                args.insert(arg.clone(), value);
            }

            let dist = family.construct(&args)?;
            resolved_all.insert(key.clone(), args);
            dists.push((key.clone(), dist));
        }

        Ok((dists, resolved_all))
    }

    fn dist_for<'a>(dists: &'a CoordDists, key: &CoordKey) -> &'a dyn CoordinateDistribution {
        dists.iter().find(|(k, _)| k == key).expect("built from declared keys").1.as_ref()
    }

    /// Evaluate the component's log-density on 2-D grids sharing one
    /// independent (x) coordinate.
    ///
    /// `grids` maps coordinate names to 1-D **edge** grids; evaluation
    /// happens at bin centers. `pairs` defaults to pairing the x
    /// coordinate with every other coordinate in declared order. If the
    /// x coordinate is only modeled jointly, its marginal is obtained by
    /// integrating the joint density over the partner axis with
    /// log-domain Simpson quadrature.
    ///
    /// All validation happens before any evaluation work. Because no
    /// trace is passed internally, every drawable parameter must be
    /// supplied through `values`.
    pub fn evaluate_on_2d_grids(
        &self, values: &ComponentParams, grids: &BTreeMap<String, Array1<f64>>,
        pairs: Option<&[(String, String)]>, x_coord: Option<&str>,
    ) -> ModelResult<GridEvaluation> {
        let x = x_coord.unwrap_or(&self.default_x_coord);
        if !self.coord_names.contains(&x.to_string()) {
            return Err(ModelError::UnknownCoordinate { name: x.to_string() });
        }

        let default_pairs: Vec<(String, String)>;
        let pairs: &[(String, String)] = match pairs {
            Some(p) => p,
            None => {
                default_pairs = self
                    .coord_names
                    .iter()
                    .filter(|n| n.as_str() != x)
                    .map(|n| (x.to_string(), n.clone()))
                    .collect();
                &default_pairs
            }
        };

        // Reject bad requests before touching any distribution.
        for (a, b) in pairs {
            if a != x {
                return Err(ModelError::GridAxisMismatch { expected: x.to_string(), found: a.clone() });
            }
            if a == b {
                return Err(ModelError::DegeneratePair { name: a.clone() });
            }
            for name in [a.as_str(), b.as_str()] {
                if !self.coord_names.iter().any(|n| n == name) {
                    return Err(ModelError::UnknownCoordinate { name: name.to_string() });
                }
                let edges = grids
                    .get(name)
                    .ok_or_else(|| ModelError::MissingGrid { name: name.to_string() })?;
                validate_grid(name, edges)?;
            }
        }
        let x_edges = grids.get(x).ok_or_else(|| ModelError::MissingGrid { name: x.to_string() })?;
        validate_grid(x, x_edges)?;

        // The key modeling x, and — when x is joint-only — its partner.
        let x_key = self
            .coordinate_keys()
            .into_iter()
            .find(|k| k.contains(x))
            .expect("x is a declared coordinate")
            .clone();
        if x_key.is_joint() {
            if x_key.len() != 2 {
                return Err(ModelError::UnsupportedJointDimension {
                    key: coord_label(&x_key),
                    dims: x_key.len(),
                });
            }
            let partner = x_key.names().iter().find(|n| n.as_str() != x).expect("joint of two");
            let edges = grids
                .get(partner)
                .ok_or_else(|| ModelError::MissingGrid { name: partner.clone() })?;
            validate_grid(partner, edges)?;
        }

        let (dists, _) = self.make_dists(values, None)?;

        // Marginal log-density over the x bin centers.
        let x_centers = bin_centers(x_edges);
        let ln_p_x: Array1<f64> = if x_key.is_joint() {
            let partner =
                x_key.names().iter().find(|n| n.as_str() != x).expect("joint of two").clone();
            let partner_centers = bin_centers(&grids[&partner]);
            let (xs, ps) = meshgrid_xy(&x_centers, &partner_centers);
            let flat_x = flatten_mesh(&xs);
            let flat_p = flatten_mesh(&ps);
            let mut columns: BTreeMap<String, Array1<f64>> = BTreeMap::new();
            columns.insert(x.to_string(), flat_x);
            columns.insert(partner.clone(), flat_p);

            // Event columns in the declared joint order.
            let stacked = stack_columns(
                x_key.names().iter().map(|n| &columns[n]).collect::<Vec<_>>().as_slice(),
            );
            let cond = conditional_slice(&self.conditional_data, &x_key, &columns);
            let flat_lp = Self::dist_for(&dists, &x_key).log_prob(stacked.view(), &cond)?;
            let surface = reshape_surface(flat_lp, partner_centers.len(), x_centers.len());
            ln_simpson_axis(surface.view(), partner_centers.view(), Axis(0))
        } else {
            let mut columns: BTreeMap<String, Array1<f64>> = BTreeMap::new();
            columns.insert(x.to_string(), x_centers.clone());
            let cond = conditional_slice(&self.conditional_data, &x_key, &columns);
            let value = x_centers.clone().insert_axis(Axis(1));
            Self::dist_for(&dists, &x_key).log_prob(value.view(), &cond)?
        };

        let mut result = GridEvaluation { meshes: BTreeMap::new(), log_densities: BTreeMap::new() };

        for (a, b) in pairs {
            let a_edges = &grids[a];
            let b_edges = &grids[b];
            result
                .meshes
                .insert((a.clone(), b.clone()), meshgrid_xy(a_edges, b_edges));

            let a_centers = bin_centers(a_edges);
            let b_centers = bin_centers(b_edges);
            let (ac_mesh, bc_mesh) = meshgrid_xy(&a_centers, &b_centers);
            let mut columns: BTreeMap<String, Array1<f64>> = BTreeMap::new();
            columns.insert(a.clone(), flatten_mesh(&ac_mesh));
            columns.insert(b.clone(), flatten_mesh(&bc_mesh));

            let joint_pair = self
                .coordinate_keys()
                .into_iter()
                .find(|k| k.len() == 2 && k.contains(a) && k.contains(b))
                .cloned();

            let surface = match joint_pair {
                Some(key) => {
                    // Joint pair: evaluate the 2-D density directly, with
                    // event columns in the declared joint order.
                    let stacked = stack_columns(
                        key.names().iter().map(|n| &columns[n]).collect::<Vec<_>>().as_slice(),
                    );
                    let cond = conditional_slice(&self.conditional_data, &key, &columns);
                    let flat_lp = Self::dist_for(&dists, &key).log_prob(stacked.view(), &cond)?;
                    reshape_surface(flat_lp, b_centers.len(), a_centers.len())
                }
                None => {
                    // Independent pair: the product of the x marginal and
                    // the other coordinate's own marginal, in log domain.
                    let b_key = CoordKey::single(b.clone());
                    if !self.coordinate_keys().iter().any(|k| **k == b_key) {
                        return Err(ModelError::JointOnlyCoordinate { name: b.clone() });
                    }
                    let cond = conditional_slice(&self.conditional_data, &b_key, &columns);
                    let value = columns[b].clone().insert_axis(Axis(1));
                    let flat_lp = Self::dist_for(&dists, &b_key).log_prob(value.view(), &cond)?;
                    let mut surface = reshape_surface(flat_lp, b_centers.len(), a_centers.len());
                    for mut row in surface.rows_mut() {
                        row += &ln_p_x;
                    }
                    surface
                }
            };
            result.log_densities.insert((a.clone(), b.clone()), surface);
        }

        Ok(result)
    }

    /// Draw samples for every coordinate in dependency order.
    ///
    /// With `values` supplied, parameters resolve deterministically; with
    /// `None`, undetermined parameters are drawn from their priors first.
    /// Coordinates without conditional inputs receive the requested
    /// count `n`; coordinates conditioned on already-drawn coordinates
    /// inherit their batch size from the conditioning values. The result
    /// is keyed in declared order regardless of sampling order.
    pub fn sample(
        &self, key: RandomKey, n: usize, values: Option<&ComponentParams>,
    ) -> ModelResult<SampleSet> {
        let (dists, _) = match values {
            Some(v) => self.make_dists(v, None)?,
            None => {
                let mut trace = Trace::new(key.derive(0));
                self.make_dists(&ComponentParams::new(), Some(&mut trace))?
            }
        };

        let keys: Vec<CoordKey> = self.coordinate_keys().into_iter().cloned().collect();
        let order = resolve_order(&keys, &self.conditional_data)?;
        let sample_keys = key.derive(1).split(order.len());

        let mut columns: BTreeMap<String, Array1<f64>> = BTreeMap::new();
        let mut by_key: BTreeMap<CoordKey, Array2<f64>> = BTreeMap::new();
        for (coord_key, sub_key) in order.iter().zip(sample_keys) {
            let cond = conditional_slice(&self.conditional_data, coord_key, &columns);
            let draws = Self::dist_for(&dists, coord_key).sample(sub_key, n, &cond)?;
            for (j, name) in coord_key.names().iter().enumerate() {
                columns.insert(name.clone(), draws.column(j).to_owned());
            }
            by_key.insert(coord_key.clone(), draws);
        }

        Ok(SampleSet {
            entries: keys
                .into_iter()
                .map(|k| {
                    let draws = by_key.remove(&k).expect("every key was sampled");
                    (k, draws)
                })
                .collect(),
        })
    }

    /// Register observation sites for every coordinate against `trace`.
    ///
    /// Undetermined parameters are drawn from their priors (registering
    /// parameter sites) and each coordinate's data is conditioned under
    /// its codec observation name. A coordinate with a per-point
    /// uncertainty column (`"<name>_err"`) instead registers a latent
    /// truth drawn from the model distribution plus an observation site
    /// modeling the data as that truth perturbed by zero-mean Gaussian
    /// noise of the supplied per-point scale. The extra log-prior, when
    /// declared, is added once as a factor site.
    ///
    /// # Errors
    /// - [`ModelError::MissingData`] / [`ModelError::DataLengthMismatch`]
    ///   on incomplete or ragged data.
    /// - [`ModelError::JointUncertaintyUnsupported`] if an uncertainty
    ///   column targets a jointly-modeled coordinate.
    pub fn register(&self, data: &DataMap, trace: &mut Trace) -> ModelResult<()> {
        // Validate data completeness before registering anything.
        let n = data
            .get(&self.coord_names[0])
            .ok_or_else(|| ModelError::MissingData { name: self.coord_names[0].clone() })?
            .len();
        for name in &self.coord_names {
            let column =
                data.get(name).ok_or_else(|| ModelError::MissingData { name: name.clone() })?;
            if column.len() != n {
                return Err(ModelError::DataLengthMismatch {
                    name: name.clone(),
                    expected: n,
                    actual: column.len(),
                });
            }
        }
        for key in self.coordinate_keys() {
            if key.is_joint() {
                for name in key.names() {
                    if data.contains_key(&format!("{name}{ERR_SUFFIX}")) {
                        return Err(ModelError::JointUncertaintyUnsupported { coord: name.clone() });
                    }
                }
            }
        }

        let (dists, resolved) = self.make_dists(&ComponentParams::new(), Some(trace))?;

        for (key, dist) in &dists {
            let observed = stack_columns(
                key.names().iter().map(|name| &data[name]).collect::<Vec<_>>().as_slice(),
            );
            let cond = conditional_slice(&self.conditional_data, key, data);
            let site = naming::encode(&self.name, key, None);
            let obs_site = naming::obs_site_name(&self.name, key);

            let err_column = if key.is_joint() {
                None
            } else {
                data.get(&format!("{}{ERR_SUFFIX}", key.first_name()))
            };

            match err_column {
                Some(err) => {
                    if err.len() != n {
                        return Err(ModelError::DataLengthMismatch {
                            name: format!("{}{ERR_SUFFIX}", key.first_name()),
                            expected: n,
                            actual: err.len(),
                        });
                    }
                    // Latent truth from the model, observed value from a
                    // per-point Gaussian noise kernel around it.
                    let latent_key = trace.draw_key();
                    let latent = dist.sample(latent_key, n, &cond)?;
                    let latent_lp = dist.log_prob(latent.view(), &cond)?.sum();
                    trace.record_sample(&site, SiteValue::Matrix(latent.clone()), latent_lp)?;

                    let noise = HeteroscedasticNormal::new(latent.column(0).to_owned(), err.clone())?;
                    let obs_lp = noise.log_prob(observed.view(), &ConditionalValues::new())?.sum();
                    trace.record_observed(&obs_site, SiteValue::Matrix(observed), obs_lp)?;
                }
                None => {
                    let obs_lp = dist.log_prob(observed.view(), &cond)?.sum();
                    trace.record_observed(&obs_site, SiteValue::Matrix(observed), obs_lp)?;
                }
            }
        }

        if let Some(prior_fn) = &self.extra_log_prior {
            trace.record_factor(&format!("{}-extra-prior", self.name), prior_fn(&resolved))?;
        }

        Ok(())
    }
}

/// Stack 1-D columns into an `(n, k)` matrix.
fn stack_columns(columns: &[&Array1<f64>]) -> Array2<f64> {
    let n = columns.first().map(|c| c.len()).unwrap_or(0);
    let mut out = Array2::zeros((n, columns.len()));
    for (j, column) in columns.iter().enumerate() {
        out.column_mut(j).assign(column);
    }
    out
}

/// Reshape a flat row-major batch back into its `(ny, nx)` surface.
fn reshape_surface(flat: Array1<f64>, ny: usize, nx: usize) -> Array2<f64> {
    Array2::from_shape_vec((ny, nx), flat.to_vec())
        .expect("surface length equals the mesh size by construction")
}
