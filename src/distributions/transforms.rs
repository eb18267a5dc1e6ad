//! Bijective transforms between unconstrained space and supports.
//!
//! Each [`Transform`] maps the whole real line (element-wise) onto the
//! interior of a constraint's support, with an exact inverse. The
//! concatenated variant applies member transforms to consecutive slices
//! of the event axis, mirroring [`Constraint::Concatenated`], and
//! [`biject_to`] picks the canonical transform for a given constraint.
//!
//! All scalar maps use the guarded softplus/logistic implementations from
//! [`crate::numerics`], so forward and inverse stay finite across the
//! magnitudes optimization code feeds through them.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::distributions::constraints::Constraint;
use crate::numerics::{safe_logistic, safe_logit, safe_softplus, safe_softplus_inv};

/// An element-wise bijection from unconstrained reals onto a support.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// The identity map (real support).
    Identity,
    /// `x ↦ softplus(x)`, onto `(0, ∞)`.
    Softplus,
    /// `x ↦ low + softplus(x)`, onto `(low, ∞)`.
    LowerBounded { low: f64 },
    /// `x ↦ high - softplus(x)`, onto `(-∞, high)`.
    UpperBounded { high: f64 },
    /// `x ↦ low + (high - low) · logistic(x)`, onto `(low, high)`.
    ScaledLogistic { low: f64, high: f64 },
    /// Member transforms applied to consecutive slices of the event axis.
    Concatenated(Vec<(Transform, usize)>),
}

impl Transform {
    fn forward_scalar(&self, x: f64) -> f64 {
        match self {
            Transform::Identity => x,
            Transform::Softplus => safe_softplus(x),
            Transform::LowerBounded { low } => low + safe_softplus(x),
            Transform::UpperBounded { high } => high - safe_softplus(x),
            Transform::ScaledLogistic { low, high } => low + (high - low) * safe_logistic(x),
            Transform::Concatenated(_) => unreachable!("concatenated transforms operate on slices"),
        }
    }

    fn inverse_scalar(&self, y: f64) -> f64 {
        match self {
            Transform::Identity => y,
            Transform::Softplus => safe_softplus_inv(y),
            Transform::LowerBounded { low } => safe_softplus_inv(y - low),
            Transform::UpperBounded { high } => safe_softplus_inv(high - y),
            Transform::ScaledLogistic { low, high } => safe_logit((y - low) / (high - low)),
            Transform::Concatenated(_) => unreachable!("concatenated transforms operate on slices"),
        }
    }

    /// Map one unconstrained event vector into the support.
    pub fn forward(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        match self {
            Transform::Concatenated(members) => {
                let mut out = Array1::zeros(x.len());
                let mut offset = 0;
                for (member, size) in members {
                    let slice = x.slice(ndarray::s![offset..offset + size]);
                    out.slice_mut(ndarray::s![offset..offset + size]).assign(&member.forward(slice));
                    offset += size;
                }
                out
            }
            _ => x.mapv(|v| self.forward_scalar(v)),
        }
    }

    /// Exact inverse of [`Transform::forward`].
    pub fn inverse(&self, y: ArrayView1<'_, f64>) -> Array1<f64> {
        match self {
            Transform::Concatenated(members) => {
                let mut out = Array1::zeros(y.len());
                let mut offset = 0;
                for (member, size) in members {
                    let slice = y.slice(ndarray::s![offset..offset + size]);
                    out.slice_mut(ndarray::s![offset..offset + size]).assign(&member.inverse(slice));
                    offset += size;
                }
                out
            }
            _ => y.mapv(|v| self.inverse_scalar(v)),
        }
    }

    /// Row-wise [`Transform::forward`] over a batch.
    pub fn forward_batch(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = Array2::zeros(x.raw_dim());
        for (row, mut slot) in x.rows().into_iter().zip(out.rows_mut()) {
            slot.assign(&self.forward(row));
        }
        out
    }

    /// Row-wise [`Transform::inverse`] over a batch.
    pub fn inverse_batch(&self, y: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = Array2::zeros(y.raw_dim());
        for (row, mut slot) in y.rows().into_iter().zip(out.rows_mut()) {
            slot.assign(&self.inverse(row));
        }
        out
    }
}

/// Canonical transform onto the interior of `constraint`'s support.
pub fn biject_to(constraint: &Constraint) -> Transform {
    match constraint {
        Constraint::Real => Transform::Identity,
        Constraint::Positive => Transform::Softplus,
        Constraint::Interval { low, high } => interval_transform(*low, *high),
        Constraint::IntervalVector { low, high } => Transform::Concatenated(
            low.iter().zip(high.iter()).map(|(&lo, &hi)| (interval_transform(lo, hi), 1)).collect(),
        ),
        Constraint::Concatenated(members) => Transform::Concatenated(
            members.iter().map(|(member, size)| (biject_to(member), *size)).collect(),
        ),
    }
}

fn interval_transform(low: f64, high: f64) -> Transform {
    match (low.is_finite(), high.is_finite()) {
        (true, true) => Transform::ScaledLogistic { low, high },
        (true, false) => {
            if low == 0.0 {
                Transform::Softplus
            } else {
                Transform::LowerBounded { low }
            }
        }
        (false, true) => Transform::UpperBounded { high },
        (false, false) => Transform::Identity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn assert_round_trip(t: &Transform, x: ArrayView1<'_, f64>) {
        let back = t.inverse(t.forward(x).view());
        for (a, b) in back.iter().zip(x.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-8, epsilon = 1e-8);
        }
    }

    #[test]
    fn scalar_transforms_are_bijections() {
        let inputs = array![-4.0, -0.5, 0.0, 0.5, 4.0];
        for t in [
            Transform::Identity,
            Transform::Softplus,
            Transform::LowerBounded { low: -2.0 },
            Transform::UpperBounded { high: 3.0 },
            Transform::ScaledLogistic { low: 0.0, high: 1.0 },
        ] {
            assert_round_trip(&t, inputs.view());
        }
    }

    #[test]
    fn forward_lands_inside_the_target_support() {
        let x = array![-10.0, 0.0, 10.0];
        let pos = Transform::Softplus.forward(x.view());
        assert!(pos.iter().all(|v| *v > 0.0));
        let unit = Transform::ScaledLogistic { low: 0.0, high: 1.0 }.forward(x.view());
        assert!(unit.iter().all(|v| *v > 0.0 && *v < 1.0));
    }

    #[test]
    fn biject_to_concatenated_round_trips_slice_wise() {
        // The support layout from the concatenated-distribution suite:
        // positive(1) + real(2) + interval(0,1)(1) + box(2).
        let c = Constraint::concatenated(
            vec![
                Constraint::Positive,
                Constraint::Real,
                Constraint::Interval { low: 0.0, high: 1.0 },
                Constraint::IntervalVector { low: array![0.0, 2.0], high: array![1.0, 100.0] },
            ],
            vec![1, 2, 1, 2],
        )
        .unwrap();
        let t = biject_to(&c);

        let x = array![0.5, 0.5, 0.5, 0.5, 0.5, 0.5];
        assert_eq!(t.forward(x.view()).len(), 6);
        assert_round_trip(&t, x.view());

        let mixed = array![1.0, 0.0, 0.0, 0.5, 1.0, 10.0];
        let pulled_back = t.inverse(mixed.view());
        let pushed = t.forward(pulled_back.view());
        for (a, b) in pushed.iter().zip(mixed.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-8, epsilon = 1e-8);
        }
    }

    #[test]
    fn batched_forward_inverse_agree_with_row_wise_application() {
        let t = biject_to(&Constraint::Positive);
        let batch = ndarray::Array2::from_shape_vec((2, 3), vec![-1.0, 0.0, 2.0, 3.0, -2.0, 0.5]).unwrap();
        let forward = t.forward_batch(batch.view());
        let back = t.inverse_batch(forward.view());
        for (a, b) in back.iter().zip(batch.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-8, epsilon = 1e-8);
        }
    }
}
