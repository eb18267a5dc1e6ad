//! Univariate coordinate distributions and their declarative families.
//!
//! The workhorse distributions for per-coordinate modeling: `Normal` and
//! `Uniform` delegate density evaluation to statrs; `InterpNormal` is a
//! Normal whose location and scale are curves sampled at knots and
//! evaluated at a conditioning coordinate's runtime values (the typical
//! "track width varies along the stream" component); and
//! `HeteroscedasticNormal` carries one scale per batch element — the
//! measurement-error kernel used when observations come with per-point
//! uncertainties.
//!
//! Each user-declarable distribution has a paired [`DistributionFamily`]
//! so it can be named in a component specification and constructed from
//! drawn or literal arguments.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::distributions::Distribution as RandDistribution;
use statrs::distribution::{Continuous, Normal, Uniform};

use crate::distributions::constraints::Constraint;
use crate::distributions::errors::{DistResult, DistributionError};
use crate::distributions::traits::{
    check_event_size, conditional_input, scalar_arg, vector_arg, ConditionalValues,
    CoordinateDistribution, DistributionFamily, FamilyArgs,
};
use crate::numerics::normal_ln_pdf;
use crate::probability::RandomKey;

/// Argument name under which conditional distributions receive the
/// independent coordinate's runtime values.
pub const COND_X_ARG: &str = "x";

// ---------------------------------------------------------------------------
// Normal
// ---------------------------------------------------------------------------

/// Univariate Normal distribution.
#[derive(Debug, Clone)]
pub struct NormalDist {
    inner: Normal,
}

impl NormalDist {
    /// Construct a Normal with mean `loc` and standard deviation `scale`.
    ///
    /// # Errors
    /// - [`DistributionError::InvalidParameter`] if `loc` is non-finite.
    /// - [`DistributionError::InvalidNormal`] if `scale` is rejected by the
    ///   underlying constructor (non-finite or ≤ 0).
    pub fn new(loc: f64, scale: f64) -> DistResult<Self> {
        if !loc.is_finite() {
            return Err(DistributionError::InvalidParameter { name: "loc", value: loc });
        }
        Ok(NormalDist { inner: Normal::new(loc, scale)? })
    }
}

impl CoordinateDistribution for NormalDist {
    fn event_size(&self) -> usize {
        1
    }

    fn support(&self) -> Constraint {
        Constraint::Real
    }

    fn log_prob(&self, value: ArrayView2<'_, f64>, _cond: &ConditionalValues) -> DistResult<Array1<f64>> {
        check_event_size(&value, 1)?;
        Ok(value.column(0).mapv(|v| self.inner.ln_pdf(v)))
    }

    fn sample(&self, key: RandomKey, n: usize, _cond: &ConditionalValues) -> DistResult<Array2<f64>> {
        let mut rng = key.rng();
        let draws = Array1::from_iter((0..n).map(|_| self.inner.sample(&mut rng)));
        Ok(draws.insert_axis(ndarray::Axis(1)))
    }
}

/// Family constructor for [`NormalDist`]; arguments `loc`, `scale`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalFamily;

impl DistributionFamily for NormalFamily {
    fn family_name(&self) -> &'static str {
        "normal"
    }

    fn construct(&self, args: &FamilyArgs) -> DistResult<Box<dyn CoordinateDistribution>> {
        let loc = scalar_arg(args, "loc")?;
        let scale = scalar_arg(args, "scale")?;
        Ok(Box::new(NormalDist::new(loc, scale)?))
    }
}

// ---------------------------------------------------------------------------
// Uniform
// ---------------------------------------------------------------------------

/// Univariate Uniform distribution on `[low, high]`.
#[derive(Debug, Clone)]
pub struct UniformDist {
    inner: Uniform,
    low: f64,
    high: f64,
}

impl UniformDist {
    /// Construct a Uniform on `[low, high]`.
    ///
    /// # Errors
    /// - [`DistributionError::InvalidUniform`] if the bounds are rejected
    ///   by the underlying constructor (non-finite or `low >= high`).
    pub fn new(low: f64, high: f64) -> DistResult<Self> {
        Ok(UniformDist { inner: Uniform::new(low, high)?, low, high })
    }
}

impl CoordinateDistribution for UniformDist {
    fn event_size(&self) -> usize {
        1
    }

    fn support(&self) -> Constraint {
        Constraint::Interval { low: self.low, high: self.high }
    }

    fn log_prob(&self, value: ArrayView2<'_, f64>, _cond: &ConditionalValues) -> DistResult<Array1<f64>> {
        check_event_size(&value, 1)?;
        Ok(value.column(0).mapv(|v| self.inner.ln_pdf(v)))
    }

    fn sample(&self, key: RandomKey, n: usize, _cond: &ConditionalValues) -> DistResult<Array2<f64>> {
        let mut rng = key.rng();
        let draws = Array1::from_iter((0..n).map(|_| self.inner.sample(&mut rng)));
        Ok(draws.insert_axis(ndarray::Axis(1)))
    }
}

/// Family constructor for [`UniformDist`]; arguments `low`, `high`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformFamily;

impl DistributionFamily for UniformFamily {
    fn family_name(&self) -> &'static str {
        "uniform"
    }

    fn construct(&self, args: &FamilyArgs) -> DistResult<Box<dyn CoordinateDistribution>> {
        let low = scalar_arg(args, "low")?;
        let high = scalar_arg(args, "high")?;
        Ok(Box::new(UniformDist::new(low, high)?))
    }
}

// ---------------------------------------------------------------------------
// InterpNormal
// ---------------------------------------------------------------------------

/// Piecewise-linear interpolation of `vals` over `knots`, clamped to the
/// end values outside the knot range.
fn linear_interp(knots: &Array1<f64>, vals: &Array1<f64>, x: f64) -> f64 {
    let n = knots.len();
    if x <= knots[0] {
        return vals[0];
    }
    if x >= knots[n - 1] {
        return vals[n - 1];
    }
    // First knot strictly greater than x; x lies in (knots[hi-1], knots[hi]).
    let hi = knots.iter().position(|&k| k > x).expect("x is below the last knot");
    let lo = hi - 1;
    let t = (x - knots[lo]) / (knots[hi] - knots[lo]);
    vals[lo] + t * (vals[hi] - vals[lo])
}

/// A Normal whose location and scale are knot-sampled curves evaluated
/// at the conditioning coordinate's values.
///
/// Purpose
/// -------
/// Model a coordinate whose distribution drifts along another coordinate:
/// `y | x ~ Normal(loc(x), scale(x))`, with `loc` and `scale` given by
/// their values at `knots` and interpolated linearly in between. The `x`
/// values arrive at call time as the conditional input [`COND_X_ARG`],
/// so the same distribution object serves any batch.
///
/// Invariants
/// ----------
/// - `knots` are strictly increasing and finite; `loc_vals` and
///   `scale_vals` have the same length as `knots`.
/// - Every `scale_vals` entry is finite and > 0, which keeps every
///   interpolated scale > 0 (convex combinations of positives).
/// - The batch size of `log_prob` inputs must match the conditioning
///   values; `sample` takes its batch size from them.
#[derive(Debug, Clone)]
pub struct InterpNormal {
    knots: Array1<f64>,
    loc_vals: Array1<f64>,
    scale_vals: Array1<f64>,
}

impl InterpNormal {
    /// Construct from knot positions and per-knot location/scale values.
    ///
    /// # Errors
    /// - [`DistributionError::LengthMismatch`] on length disagreements.
    /// - [`DistributionError::KnotsNotIncreasing`] if `knots` are not
    ///   strictly increasing.
    /// - [`DistributionError::InvalidParameterEntry`] on non-finite
    ///   entries or non-positive scales.
    pub fn new(knots: Array1<f64>, loc_vals: Array1<f64>, scale_vals: Array1<f64>) -> DistResult<Self> {
        if knots.len() < 2 {
            return Err(DistributionError::LengthMismatch {
                what: "interpolation knots",
                expected: 2,
                actual: knots.len(),
            });
        }
        if loc_vals.len() != knots.len() {
            return Err(DistributionError::LengthMismatch {
                what: "loc_vals",
                expected: knots.len(),
                actual: loc_vals.len(),
            });
        }
        if scale_vals.len() != knots.len() {
            return Err(DistributionError::LengthMismatch {
                what: "scale_vals",
                expected: knots.len(),
                actual: scale_vals.len(),
            });
        }
        for (i, &k) in knots.iter().enumerate() {
            if !k.is_finite() {
                return Err(DistributionError::InvalidParameterEntry { name: "knots", index: i, value: k });
            }
            if i > 0 && k <= knots[i - 1] {
                return Err(DistributionError::KnotsNotIncreasing { index: i });
            }
        }
        for (i, &v) in loc_vals.iter().enumerate() {
            if !v.is_finite() {
                return Err(DistributionError::InvalidParameterEntry {
                    name: "loc_vals",
                    index: i,
                    value: v,
                });
            }
        }
        for (i, &v) in scale_vals.iter().enumerate() {
            if !v.is_finite() || v <= 0.0 {
                return Err(DistributionError::InvalidParameterEntry {
                    name: "scale_vals",
                    index: i,
                    value: v,
                });
            }
        }
        Ok(InterpNormal { knots, loc_vals, scale_vals })
    }

    fn loc_at(&self, x: f64) -> f64 {
        linear_interp(&self.knots, &self.loc_vals, x)
    }

    fn scale_at(&self, x: f64) -> f64 {
        linear_interp(&self.knots, &self.scale_vals, x)
    }
}

impl CoordinateDistribution for InterpNormal {
    fn event_size(&self) -> usize {
        1
    }

    fn support(&self) -> Constraint {
        Constraint::Real
    }

    fn log_prob(&self, value: ArrayView2<'_, f64>, cond: &ConditionalValues) -> DistResult<Array1<f64>> {
        check_event_size(&value, 1)?;
        let x = conditional_input(cond, COND_X_ARG, Some(value.nrows()))?;
        let column = value.column(0);
        Ok(Array1::from_iter(
            column
                .iter()
                .zip(x.iter())
                .map(|(&v, &xi)| normal_ln_pdf(v, self.loc_at(xi), self.scale_at(xi))),
        ))
    }

    fn sample(&self, key: RandomKey, _n: usize, cond: &ConditionalValues) -> DistResult<Array2<f64>> {
        // The conditioning values fix the batch; the requested count is
        // intentionally ignored.
        let x = conditional_input(cond, COND_X_ARG, None)?;
        let standard = Normal::new(0.0, 1.0)?;
        let mut rng = key.rng();
        let draws = Array1::from_iter(
            x.iter().map(|&xi| self.loc_at(xi) + self.scale_at(xi) * standard.sample(&mut rng)),
        );
        Ok(draws.insert_axis(ndarray::Axis(1)))
    }
}

/// Family constructor for [`InterpNormal`]; vector arguments `knots`,
/// `loc_vals`, `scale_vals`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpNormalFamily;

impl DistributionFamily for InterpNormalFamily {
    fn family_name(&self) -> &'static str {
        "interp_normal"
    }

    fn construct(&self, args: &FamilyArgs) -> DistResult<Box<dyn CoordinateDistribution>> {
        let knots = vector_arg(args, "knots")?.clone();
        let loc_vals = vector_arg(args, "loc_vals")?.clone();
        let scale_vals = vector_arg(args, "scale_vals")?.clone();
        Ok(Box::new(InterpNormal::new(knots, loc_vals, scale_vals)?))
    }
}

// ---------------------------------------------------------------------------
// HeteroscedasticNormal
// ---------------------------------------------------------------------------

/// A Normal with one `(loc, scale)` pair per batch element.
///
/// This is the measurement-error kernel: observed values are modeled as
/// latent truths (`loc`) perturbed by zero-mean noise with per-point
/// standard deviations (`scale`). The batch size is pinned by the
/// parameter vectors, so `sample` ignores the requested count.
#[derive(Debug, Clone)]
pub struct HeteroscedasticNormal {
    loc: Array1<f64>,
    scale: Array1<f64>,
}

impl HeteroscedasticNormal {
    /// Construct from aligned per-point locations and scales.
    ///
    /// # Errors
    /// - [`DistributionError::LengthMismatch`] if the vectors disagree.
    /// - [`DistributionError::InvalidParameterEntry`] on non-finite
    ///   locations or non-positive scales.
    pub fn new(loc: Array1<f64>, scale: Array1<f64>) -> DistResult<Self> {
        if loc.len() != scale.len() {
            return Err(DistributionError::LengthMismatch {
                what: "per-point scales",
                expected: loc.len(),
                actual: scale.len(),
            });
        }
        for (i, &v) in loc.iter().enumerate() {
            if !v.is_finite() {
                return Err(DistributionError::InvalidParameterEntry { name: "loc", index: i, value: v });
            }
        }
        for (i, &v) in scale.iter().enumerate() {
            if !v.is_finite() || v <= 0.0 {
                return Err(DistributionError::InvalidParameterEntry { name: "scale", index: i, value: v });
            }
        }
        Ok(HeteroscedasticNormal { loc, scale })
    }
}

impl CoordinateDistribution for HeteroscedasticNormal {
    fn event_size(&self) -> usize {
        1
    }

    fn support(&self) -> Constraint {
        Constraint::Real
    }

    fn log_prob(&self, value: ArrayView2<'_, f64>, _cond: &ConditionalValues) -> DistResult<Array1<f64>> {
        check_event_size(&value, 1)?;
        if value.nrows() != self.loc.len() {
            return Err(DistributionError::LengthMismatch {
                what: "observation batch",
                expected: self.loc.len(),
                actual: value.nrows(),
            });
        }
        let column = value.column(0);
        Ok(Array1::from_iter(
            column
                .iter()
                .zip(self.loc.iter().zip(self.scale.iter()))
                .map(|(&v, (&loc, &scale))| normal_ln_pdf(v, loc, scale)),
        ))
    }

    fn sample(&self, key: RandomKey, _n: usize, _cond: &ConditionalValues) -> DistResult<Array2<f64>> {
        let standard = Normal::new(0.0, 1.0)?;
        let mut rng = key.rng();
        let draws = Array1::from_iter(
            self.loc
                .iter()
                .zip(self.scale.iter())
                .map(|(&loc, &scale)| loc + scale * standard.sample(&mut rng)),
        );
        Ok(draws.insert_axis(ndarray::Axis(1)))
    }
}

/// Helper used across tests: evaluate a univariate distribution on a
/// plain 1-D batch.
#[cfg(test)]
pub(crate) fn log_prob_1d(
    dist: &dyn CoordinateDistribution, values: ArrayView1<'_, f64>, cond: &ConditionalValues,
) -> DistResult<Array1<f64>> {
    dist.log_prob(values.to_owned().insert_axis(ndarray::Axis(1)).view(), cond)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    use crate::distributions::traits::ParamValue;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Density values and sample shapes of the univariate distributions.
    // - Conditional-input handling of `InterpNormal` (required input,
    //   batch-pinned sampling, interpolated parameters).
    // - Family constructors: argument presence and kind checking.
    //
    // They intentionally DO NOT cover:
    // - Model-level wiring of conditional data (model layer tests).
    // -------------------------------------------------------------------------

    #[test]
    fn normal_log_prob_matches_closed_form() {
        let dist = NormalDist::new(1.0, 2.0).unwrap();
        let lp = log_prob_1d(&dist, array![1.0, 3.0].view(), &ConditionalValues::new()).unwrap();
        assert_relative_eq!(lp[0], normal_ln_pdf(1.0, 1.0, 2.0), max_relative = 1e-12);
        assert_relative_eq!(lp[1], normal_ln_pdf(3.0, 1.0, 2.0), max_relative = 1e-12);
    }

    #[test]
    fn normal_rejects_invalid_scale() {
        assert!(matches!(NormalDist::new(0.0, 0.0), Err(DistributionError::InvalidNormal)));
        assert!(matches!(
            NormalDist::new(f64::NAN, 1.0),
            Err(DistributionError::InvalidParameter { name: "loc", .. })
        ));
    }

    #[test]
    fn normal_sample_has_requested_batch_shape() {
        let dist = NormalDist::new(0.0, 1.0).unwrap();
        let draws = dist.sample(RandomKey::new(0), 100, &ConditionalValues::new()).unwrap();
        assert_eq!(draws.dim(), (100, 1));
        // Samples from the prior must receive finite density.
        let lp = dist.log_prob(draws.view(), &ConditionalValues::new()).unwrap();
        assert!(lp.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn uniform_density_is_flat_inside_and_zero_outside() {
        let dist = UniformDist::new(-1.0, 3.0).unwrap();
        let lp = log_prob_1d(&dist, array![0.0, 2.0, 5.0].view(), &ConditionalValues::new()).unwrap();
        assert_relative_eq!(lp[0], -(4.0f64.ln()), max_relative = 1e-12);
        assert_relative_eq!(lp[1], -(4.0f64.ln()), max_relative = 1e-12);
        assert_eq!(lp[2], f64::NEG_INFINITY);
        assert_eq!(dist.support(), Constraint::Interval { low: -1.0, high: 3.0 });
    }

    #[test]
    fn interp_normal_requires_its_conditioning_input() {
        let dist = InterpNormal::new(array![0.0, 1.0], array![0.0, 2.0], array![1.0, 1.0]).unwrap();
        let err = log_prob_1d(&dist, array![0.5].view(), &ConditionalValues::new()).unwrap_err();
        assert!(matches!(err, DistributionError::MissingConditional { .. }));
    }

    #[test]
    fn interp_normal_interpolates_location_linearly() {
        let dist =
            InterpNormal::new(array![0.0, 1.0, 2.0], array![0.0, 2.0, 2.0], array![1.0, 1.0, 3.0])
                .unwrap();
        let mut cond = ConditionalValues::new();
        cond.insert(COND_X_ARG.into(), array![0.5, 1.5]);
        let lp = log_prob_1d(&dist, array![1.0, 2.0].view(), &cond).unwrap();
        // At x = 0.5 the interpolated loc is 1.0, scale 1.0; at x = 1.5 the
        // loc is 2.0, scale 2.0.
        assert_relative_eq!(lp[0], normal_ln_pdf(1.0, 1.0, 1.0), max_relative = 1e-12);
        assert_relative_eq!(lp[1], normal_ln_pdf(2.0, 2.0, 2.0), max_relative = 1e-12);
    }

    #[test]
    fn interp_normal_sample_batch_follows_conditioning_values() {
        let dist = InterpNormal::new(array![0.0, 1.0], array![0.0, 2.0], array![1.0, 1.0]).unwrap();
        let mut cond = ConditionalValues::new();
        cond.insert(COND_X_ARG.into(), Array1::linspace(0.0, 1.0, 7));
        // The requested count (999) is ignored; conditioning pins the batch.
        let draws = dist.sample(RandomKey::new(3), 999, &cond).unwrap();
        assert_eq!(draws.dim(), (7, 1));
    }

    #[test]
    fn interp_normal_rejects_unsorted_knots() {
        let err = InterpNormal::new(array![0.0, 0.0], array![0.0, 1.0], array![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, DistributionError::KnotsNotIncreasing { index: 1 }));
    }

    #[test]
    fn heteroscedastic_normal_evaluates_per_point_pairs() {
        let dist = HeteroscedasticNormal::new(array![0.0, 10.0], array![1.0, 2.0]).unwrap();
        let lp = log_prob_1d(&dist, array![0.0, 12.0].view(), &ConditionalValues::new()).unwrap();
        assert_relative_eq!(lp[0], normal_ln_pdf(0.0, 0.0, 1.0), max_relative = 1e-12);
        assert_relative_eq!(lp[1], normal_ln_pdf(12.0, 10.0, 2.0), max_relative = 1e-12);
        // Batch size is pinned by the parameter vectors.
        let err = log_prob_1d(&dist, array![0.0].view(), &ConditionalValues::new()).unwrap_err();
        assert!(matches!(err, DistributionError::LengthMismatch { .. }));
    }

    #[test]
    fn families_check_argument_presence_and_kind() {
        let mut args = FamilyArgs::new();
        args.insert("loc".into(), ParamValue::Scalar(0.0));
        let err = NormalFamily.construct(&args).unwrap_err();
        assert!(matches!(err, DistributionError::MissingArgument { .. }));

        args.insert("scale".into(), ParamValue::Vector(array![1.0]));
        let err = NormalFamily.construct(&args).unwrap_err();
        assert!(matches!(err, DistributionError::ArgumentKind { .. }));
    }
}
