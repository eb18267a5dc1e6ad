//! Gaussian mixture on a fixed grid of locations, truncated to a box.
//!
//! Purpose
//! -------
//! [`TruncatedGridGmm`] is a mixture of `K` diagonal-covariance Gaussians
//! at caller-fixed locations, each axis independently truncated to a
//! shared interval `[low_d, high_d]`. Only the mixing weights are free,
//! which makes the distribution a flexible non-parametric density over a
//! bounded survey footprint: place components on a grid, learn weights.
//!
//! Key behaviors
//! -------------
//! - Construction precomputes, per component and dimension, the fraction
//!   of the unbounded Gaussian mass retained inside `[low_d, high_d]`, as
//!   a sign-corrected difference of tail CDFs: with
//!   `s = sign(loc - low)`, both bounds are reflected through the mean
//!   (`loc - s·(loc - bound)`) before the CDF difference is taken, so the
//!   same expression is well-conditioned whether the mean sits inside,
//!   left, or right of the interval. The per-dimension log-masses sum to
//!   the component's total log-normalization offset.
//! - `component_log_probs` returns truncation-corrected, weight-adjusted
//!   per-component log-densities; their log-sum-exp is the mixture
//!   log-density.
//! - Sampling is intentionally unsupported and always fails with
//!   [`DistributionError::SamplingUnsupported`]; rejection and
//!   inverse-CDF schemes are future work.
//!
//! Invariants & assumptions
//! ------------------------
//! - Truncation bounds are shared across components, not per-component.
//! - A bound configuration that retains no mass on some axis produces a
//!   `-∞`/NaN normalization offset that propagates through evaluation;
//!   it is not detected at construction.
//! - `log_prob` does not mask points outside the box; callers that need
//!   support checking use [`CoordinateDistribution::support`].

use ndarray::{Array1, Array2, ArrayView2, Axis};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::distributions::constraints::Constraint;
use crate::distributions::errors::{DistResult, DistributionError};
use crate::distributions::traits::{
    check_event_size, vector_arg, ConditionalValues, CoordinateDistribution, DistributionFamily,
    FamilyArgs,
};
use crate::numerics::{log_softmax, logsumexp, normal_ln_pdf};
use crate::probability::RandomKey;

/// CDF evaluation tolerant of infinite arguments.
fn cdf_ext(normal: &Normal, x: f64) -> f64 {
    if x == f64::INFINITY {
        1.0
    } else if x == f64::NEG_INFINITY {
        0.0
    } else {
        normal.cdf(x)
    }
}

/// Mixture of fixed-location diagonal Gaussians truncated to a shared box.
#[derive(Debug, Clone)]
pub struct TruncatedGridGmm {
    locs: Array2<f64>,
    scales: Array2<f64>,
    low: Array1<f64>,
    high: Array1<f64>,
    /// Log-softmax-normalized mixing log-weights, length K.
    log_weights: Array1<f64>,
    /// Per-component log of the truncated mass retained inside the box.
    log_retained: Array1<f64>,
}

impl TruncatedGridGmm {
    /// Construct from mixing weights, component locations/scales of shape
    /// `(K, D)`, and shared per-dimension bounds of length `D`.
    ///
    /// Unbounded axes are expressed with `-∞`/`+∞` entries; passing the
    /// fully unbounded box recovers an ordinary grid GMM.
    ///
    /// # Errors
    /// - [`DistributionError::LengthMismatch`] on any shape disagreement
    ///   or empty component/dimension axes.
    /// - [`DistributionError::InvalidParameterEntry`] on non-finite
    ///   locations, non-positive scales, NaN bounds, or negative weights.
    pub fn new(
        weights: Array1<f64>, locs: Array2<f64>, scales: Array2<f64>, low: Array1<f64>,
        high: Array1<f64>,
    ) -> DistResult<Self> {
        let (k, d) = locs.dim();
        if k == 0 || d == 0 {
            return Err(DistributionError::LengthMismatch {
                what: "grid mixture components",
                expected: 1,
                actual: 0,
            });
        }
        if scales.dim() != (k, d) {
            return Err(DistributionError::LengthMismatch {
                what: "grid mixture scales",
                expected: k * d,
                actual: scales.len(),
            });
        }
        if weights.len() != k {
            return Err(DistributionError::LengthMismatch {
                what: "grid mixture weights",
                expected: k,
                actual: weights.len(),
            });
        }
        if low.len() != d || high.len() != d {
            return Err(DistributionError::LengthMismatch {
                what: "truncation bounds",
                expected: d,
                actual: low.len().min(high.len()),
            });
        }
        for (i, &v) in locs.iter().enumerate() {
            if !v.is_finite() {
                return Err(DistributionError::InvalidParameterEntry { name: "locs", index: i, value: v });
            }
        }
        for (i, &v) in scales.iter().enumerate() {
            if !v.is_finite() || v <= 0.0 {
                return Err(DistributionError::InvalidParameterEntry {
                    name: "scales",
                    index: i,
                    value: v,
                });
            }
        }
        for (i, &v) in weights.iter().enumerate() {
            if v.is_nan() || v < 0.0 {
                return Err(DistributionError::InvalidParameterEntry {
                    name: "weights",
                    index: i,
                    value: v,
                });
            }
        }
        for (i, (&lo, &hi)) in low.iter().zip(high.iter()).enumerate() {
            if lo.is_nan() {
                return Err(DistributionError::InvalidParameterEntry { name: "low", index: i, value: lo });
            }
            if hi.is_nan() {
                return Err(DistributionError::InvalidParameterEntry { name: "high", index: i, value: hi });
            }
        }

        let log_weights = log_softmax(weights.mapv(f64::ln).view());

        // Retained mass per component: product over dimensions of the
        // sign-corrected tail-CDF difference.
        let mut log_retained = Array1::zeros(k);
        for ki in 0..k {
            for di in 0..d {
                let loc = locs[(ki, di)];
                let scale = scales[(ki, di)];
                let normal = Normal::new(loc, scale)?;
                let sign = if loc >= low[di] { 1.0 } else { -1.0 };
                let tail_at_low = cdf_ext(&normal, loc - sign * (loc - low[di]));
                let tail_at_high = cdf_ext(&normal, loc - sign * (loc - high[di]));
                log_retained[ki] += (sign * (tail_at_high - tail_at_low)).ln();
            }
        }

        Ok(TruncatedGridGmm { locs, scales, low, high, log_weights, log_retained })
    }

    /// Number of mixture components.
    pub fn n_components(&self) -> usize {
        self.locs.nrows()
    }

    /// Truncation-corrected, weight-adjusted log-density of each
    /// component at each row of `value`: shape `(batch, K)`. The
    /// log-sum-exp over the component axis is the mixture log-density.
    pub fn component_log_probs(&self, value: ArrayView2<'_, f64>) -> DistResult<Array2<f64>> {
        let (k, d) = self.locs.dim();
        check_event_size(&value, d)?;
        let mut out = Array2::zeros((value.nrows(), k));
        for (i, row) in value.rows().into_iter().enumerate() {
            for ki in 0..k {
                let mut lp = 0.0;
                for di in 0..d {
                    lp += normal_ln_pdf(row[di], self.locs[(ki, di)], self.scales[(ki, di)]);
                }
                out[(i, ki)] = self.log_weights[ki] + lp - self.log_retained[ki];
            }
        }
        Ok(out)
    }
}

impl CoordinateDistribution for TruncatedGridGmm {
    fn event_size(&self) -> usize {
        self.locs.ncols()
    }

    fn support(&self) -> Constraint {
        Constraint::IntervalVector { low: self.low.clone(), high: self.high.clone() }
    }

    fn log_prob(&self, value: ArrayView2<'_, f64>, _cond: &ConditionalValues) -> DistResult<Array1<f64>> {
        let per_component = self.component_log_probs(value)?;
        Ok(Array1::from_iter(per_component.axis_iter(Axis(0)).map(|row| logsumexp(row))))
    }

    fn sample(&self, _key: RandomKey, _n: usize, _cond: &ConditionalValues) -> DistResult<Array2<f64>> {
        Err(DistributionError::SamplingUnsupported { distribution: "TruncatedGridGmm" })
    }
}

/// Family constructor for [`TruncatedGridGmm`] with structural locations,
/// scales, and bounds fixed at family declaration; the single free
/// argument is the weight vector `probs`.
#[derive(Debug, Clone)]
pub struct TruncatedGridGmmFamily {
    pub locs: Array2<f64>,
    pub scales: Array2<f64>,
    pub low: Array1<f64>,
    pub high: Array1<f64>,
}

impl DistributionFamily for TruncatedGridGmmFamily {
    fn family_name(&self) -> &'static str {
        "truncated_grid_gmm"
    }

    fn construct(&self, args: &FamilyArgs) -> DistResult<Box<dyn CoordinateDistribution>> {
        let probs = vector_arg(args, "probs")?.clone();
        Ok(Box::new(TruncatedGridGmm::new(
            probs,
            self.locs.clone(),
            self.scales.clone(),
            self.low.clone(),
            self.high.clone(),
        )?))
    }
}
