//! Log-domain quadrature over sampled log-densities.
//!
//! Marginalizing a joint log-density over one axis requires
//! `ln ∫ exp(f(x)) dx` for tabulated `f`. Exponentiating first would
//! underflow for strongly negative log-densities, so the composite
//! Simpson rule is folded into a single weighted log-sum-exp:
//! `ln Σ_i w_i exp(f_i)` with the Simpson weights `w_i > 0`.
//!
//! The abscissae are assumed uniformly spaced (the spacing of the first
//! interval is used). Odd-length inputs use pure composite Simpson;
//! even-length inputs apply Simpson to the leading odd-length run and a
//! trapezoid correction on the final interval.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::numerics::logsumexp;

/// Composite Simpson weights for `n` uniformly spaced points `h` apart.
///
/// For even `n` the last interval is closed with trapezoid weights, so the
/// returned vector always has length `n`.
fn simpson_weights(n: usize, h: f64) -> Array1<f64> {
    debug_assert!(n >= 2);
    let mut w = Array1::zeros(n);
    if n == 2 {
        w[0] = 0.5 * h;
        w[1] = 0.5 * h;
        return w;
    }
    // Largest odd point count covered by Simpson proper.
    let m = if n % 2 == 1 { n } else { n - 1 };
    let third = h / 3.0;
    w[0] += third;
    w[m - 1] += third;
    for i in 1..m - 1 {
        w[i] += if i % 2 == 1 { 4.0 * third } else { 2.0 * third };
    }
    if n % 2 == 0 {
        w[n - 2] += 0.5 * h;
        w[n - 1] += 0.5 * h;
    }
    w
}

/// `ln ∫ exp(f) dx` for log-density samples `f` on the uniform grid `x`.
///
/// Requires `values.len() == x.len() >= 2`; violations are programming
/// errors at the call sites inside this crate and are asserted rather
/// than surfaced as recoverable errors.
pub fn ln_simpson(values: ArrayView1<'_, f64>, x: ArrayView1<'_, f64>) -> f64 {
    assert_eq!(values.len(), x.len(), "quadrature values and grid lengths differ");
    assert!(x.len() >= 2, "quadrature needs at least two abscissae");
    let h = x[1] - x[0];
    let weights = simpson_weights(x.len(), h);
    let shifted = &values + &weights.mapv(f64::ln);
    logsumexp(shifted.view())
}

/// Axis-wise [`ln_simpson`]: integrates out `axis` of a 2-D log-density
/// surface, returning the marginal over the remaining axis.
pub fn ln_simpson_axis(values: ArrayView2<'_, f64>, x: ArrayView1<'_, f64>, axis: Axis) -> Array1<f64> {
    let kept = values.len_of(Axis(1 - axis.index()));
    let mut out = Array1::zeros(kept);
    for (lane, slot) in values.lanes(axis).into_iter().zip(out.iter_mut()) {
        *slot = ln_simpson(lane, x);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2};

    use crate::numerics::normal_ln_pdf;

    #[test]
    fn ln_simpson_of_log_constant_recovers_interval_measure() {
        // ∫_0^2 c dx = 2c, with c = 0.7 over an odd-length grid.
        let x = Array1::linspace(0.0, 2.0, 41);
        let f = Array1::from_elem(41, 0.7f64.ln());
        assert_relative_eq!(ln_simpson(f.view(), x.view()), (2.0 * 0.7f64).ln(), max_relative = 1e-10);
    }

    #[test]
    fn ln_simpson_handles_even_length_grids() {
        let x = Array1::linspace(0.0, 1.0, 40);
        let f = Array1::from_elem(40, 0.0);
        // ∫_0^1 1 dx = 1, so the log-integral is 0 up to the trapezoid tail.
        assert_relative_eq!(ln_simpson(f.view(), x.view()), 0.0, epsilon = 1e-8);
    }

    #[test]
    fn ln_simpson_of_gaussian_log_density_is_near_zero() {
        let x = Array1::linspace(-8.0, 8.0, 161);
        let f = x.mapv(|v| normal_ln_pdf(v, 0.0, 1.0));
        assert_relative_eq!(ln_simpson(f.view(), x.view()), 0.0, epsilon = 1e-8);
    }

    #[test]
    fn ln_simpson_axis_marginalizes_a_separable_surface() {
        // f(x, y) = ln N(y; 0, 1) + ln g(x); integrating out y leaves ln g(x).
        let y = Array1::linspace(-8.0, 8.0, 81);
        let g = [0.3f64.ln(), 0.9f64.ln(), 0.1f64.ln()];
        let surface = Array2::from_shape_fn((81, 3), |(i, j)| normal_ln_pdf(y[i], 0.0, 1.0) + g[j]);
        let marginal = ln_simpson_axis(surface.view(), y.view(), Axis(0));
        for (got, want) in marginal.iter().zip(g.iter()) {
            assert_relative_eq!(got, want, epsilon = 1e-7);
        }
    }
}
