//! Numerically stable building blocks shared across the crate.
//!
//! Provides guarded implementations of transforms and reductions that are
//! prone to overflow/underflow in naïve form: log-sum-exp and its weighted
//! variant, log-softmax, softplus and its inverse, and the logistic pair.
//! The functions here follow guarded strategies with explicit cutoffs
//! (`x > 20.0`) that keep `f64` arithmetic in a well-conditioned regime.
//!
//! # Provided items
//! - [`logsumexp`] / [`logsumexp_weighted`]: stable `ln Σ exp` reductions,
//!   the latter with non-negative probability-domain weights where a zero
//!   weight drops its term exactly.
//! - [`log_softmax`]: shift-invariant normalization of log-weights.
//! - [`safe_softplus`] / [`safe_softplus_inv`]: stable `ln(1 + exp(x))`
//!   and its inverse on `(0, ∞)`.
//! - [`safe_logistic`] / [`safe_logit`]: stable sigmoid and its inverse.
//! - [`integrate::ln_simpson`]: log-domain Simpson quadrature.

pub mod integrate;

use ndarray::{Array1, Array2, ArrayView1};

/// `ln(2π) / 2`, the additive constant of the Gaussian log-density.
pub const HALF_LN_TWO_PI: f64 = 0.918_938_533_204_672_74;

/// Cutoff above which `softplus(x) ≈ x` to machine precision for `f64`.
const SOFTPLUS_CUTOFF: f64 = 20.0;

/// Log-density of a Normal with mean `loc` and standard deviation `scale`,
/// evaluated element-wise without constructing a distribution object.
///
/// The caller is responsible for `scale > 0`; a non-positive scale yields
/// NaN, which propagates to the total like any other invalid input.
#[inline]
pub fn normal_ln_pdf(x: f64, loc: f64, scale: f64) -> f64 {
    let z = (x - loc) / scale;
    -0.5 * z * z - scale.ln() - HALF_LN_TWO_PI
}

/// Stable `ln Σ_i exp(v_i)`.
///
/// Returns `-∞` for an empty input or when every term is `-∞`. The usual
/// max-shift is applied so no intermediate `exp` overflows.
pub fn logsumexp(values: ArrayView1<'_, f64>) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        // Either empty, all -inf (a legitimate zero-mass result), or a NaN
        // crept in; in every case the max already is the right answer.
        return max;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Stable `ln Σ_i w_i exp(v_i)` with probability-domain weights `w_i ≥ 0`.
///
/// Terms with `w_i == 0.0` are skipped entirely rather than entering as
/// `ln(0) = -∞`, so a one-hot weight vector reproduces the single live
/// term exactly, bit for bit.
pub fn logsumexp_weighted(values: ArrayView1<'_, f64>, weights: ArrayView1<'_, f64>) -> f64 {
    debug_assert_eq!(values.len(), weights.len());
    let max = values
        .iter()
        .zip(weights.iter())
        .filter(|(_, &w)| w > 0.0)
        .map(|(&v, _)| v)
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let mut sum = 0.0;
    let mut live = 0usize;
    for (&v, &w) in values.iter().zip(weights.iter()) {
        if w > 0.0 {
            sum += w * (v - max).exp();
            live += 1;
        }
    }
    if live == 1 {
        // Exact degeneration: ln(w) + v for the single live term.
        let (v, w) = values
            .iter()
            .zip(weights.iter())
            .find(|(_, &w)| w > 0.0)
            .map(|(&v, &w)| (v, w))
            .expect("a live term exists when max is finite");
        return if w == 1.0 { v } else { w.ln() + v };
    }
    max + sum.ln()
}

/// Element-wise weighted log-sum-exp across a stack of equally shaped
/// surfaces: `out[ij] = ln Σ_k w_k exp(s_k[ij])`.
pub fn logsumexp_weighted_stack(surfaces: &[Array2<f64>], weights: ArrayView1<'_, f64>) -> Array2<f64> {
    debug_assert_eq!(surfaces.len(), weights.len());
    debug_assert!(!surfaces.is_empty());
    let dim = surfaces[0].raw_dim();
    Array2::from_shape_fn(dim, |idx| {
        let column = Array1::from_iter(surfaces.iter().map(|s| s[idx]));
        logsumexp_weighted(column.view(), weights)
    })
}

/// Shift-invariant log-softmax: `x_i - ln Σ_j exp(x_j)`.
pub fn log_softmax(logits: ArrayView1<'_, f64>) -> Array1<f64> {
    let norm = logsumexp(logits);
    logits.mapv(|v| v - norm)
}

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// For `x` beyond the cutoff, `softplus(x) ≈ x + ln1p(exp(-x)) ≈ x`;
/// otherwise it falls back to `ln1p(exp(x))`.
#[inline]
pub fn safe_softplus(x: f64) -> f64 {
    if x > SOFTPLUS_CUTOFF {
        x
    } else {
        x.exp().ln_1p()
    }
}

/// Stable inverse of softplus on `(0, ∞)`: solves `softplus(t) = x` as
/// `t = ln(exp(x) - 1)` without overflow or catastrophic cancellation.
#[inline]
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > SOFTPLUS_CUTOFF {
        x
    } else {
        x.exp_m1().ln()
    }
}

/// Stable logistic sigmoid mapping ℝ → (0, 1).
///
/// Evaluated through `exp` of a non-positive argument on both branches so
/// neither tail overflows.
#[inline]
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Inverse of [`safe_logistic`] on (0, 1): `logit(p) = ln(p / (1 - p))`.
#[inline]
pub fn safe_logit(p: f64) -> f64 {
    p.ln() - (-p).ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - logsumexp and its weighted variant, including exact dropout of
    //   zero-weight terms and all -inf inputs.
    // - The softplus / logistic pairs and their inverses across magnitudes,
    //   including the large-argument linear regime.
    //
    // They intentionally DO NOT cover:
    // - Quadrature (tested in `integrate`).
    // - Uses of these reductions inside model evaluation (integration suite).
    // -------------------------------------------------------------------------

    #[test]
    fn logsumexp_matches_naive_sum_for_moderate_inputs() {
        let v = array![0.1, -0.4, 1.3, 0.0];
        let naive: f64 = v.iter().map(|x: &f64| x.exp()).sum::<f64>().ln();
        assert_relative_eq!(logsumexp(v.view()), naive, max_relative = 1e-12);
    }

    #[test]
    fn logsumexp_is_stable_for_large_magnitudes() {
        let v = array![1000.0, 999.0];
        let expected = 1000.0 + (1.0 + (-1.0f64).exp()).ln();
        assert_relative_eq!(logsumexp(v.view()), expected, max_relative = 1e-12);
    }

    #[test]
    fn logsumexp_of_all_neg_infinity_is_neg_infinity() {
        let v = array![f64::NEG_INFINITY, f64::NEG_INFINITY];
        assert_eq!(logsumexp(v.view()), f64::NEG_INFINITY);
    }

    #[test]
    fn weighted_logsumexp_with_one_hot_weights_returns_live_term_exactly() {
        let v = array![-3.2, -7.5];
        let w = array![1.0, 0.0];
        // Exact equality: the dead term must not perturb the result at all.
        assert_eq!(logsumexp_weighted(v.view(), w.view()), -3.2);
    }

    #[test]
    fn weighted_logsumexp_matches_naive_weighted_sum() {
        let v = array![0.3, -1.0, 0.7];
        let w = array![0.2, 0.5, 0.3];
        let naive: f64 = v
            .iter()
            .zip(w.iter())
            .map(|(x, b): (&f64, &f64)| b * x.exp())
            .sum::<f64>()
            .ln();
        assert_relative_eq!(logsumexp_weighted(v.view(), w.view()), naive, max_relative = 1e-12);
    }

    #[test]
    fn log_softmax_normalizes_to_unit_mass() {
        let out = log_softmax(array![0.2, 1.4, -0.8].view());
        let total: f64 = out.iter().map(|v| v.exp()).sum();
        assert_relative_eq!(total, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn softplus_inverse_round_trips_across_magnitudes() {
        for &x in &[-15.0, -1.0, 0.0, 0.5, 3.0, 25.0, 300.0] {
            let y = safe_softplus(x);
            assert_relative_eq!(safe_softplus_inv(y), x, max_relative = 1e-9, epsilon = 1e-9);
        }
    }

    #[test]
    fn logistic_inverse_round_trips_without_overflow() {
        for &x in &[-30.0, -2.0, 0.0, 2.0, 30.0] {
            let p = safe_logistic(x);
            assert!(p > 0.0 && p < 1.0);
            assert_relative_eq!(safe_logit(p), x, max_relative = 1e-9, epsilon = 1e-9);
        }
    }

    #[test]
    fn normal_ln_pdf_matches_known_standard_normal_value() {
        // ln N(0; 0, 1) = -0.5 ln(2π)
        assert_relative_eq!(normal_ln_pdf(0.0, 0.0, 1.0), -HALF_LN_TWO_PI, max_relative = 1e-12);
    }
}
