//! Support constraints for distributions.
//!
//! A [`Constraint`] describes the region of event space a distribution
//! assigns mass to. Scalar constraints (`Real`, `Positive`, `Interval`)
//! apply element-wise to every entry of their slice; `IntervalVector`
//! carries per-dimension bounds for box supports; `Concatenated` composes
//! member constraints over the direct sum of their event slices, and is
//! satisfied iff every member is satisfied on its own slice.
//!
//! Interval ends may be infinite independently, so the half-open supports
//! of left/right-extended reals are expressed as `Interval` with a `-∞`
//! or `+∞` end.

use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::distributions::errors::{DistResult, DistributionError};

/// Region of event space a distribution is supported on.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// All finite reals.
    Real,
    /// Strictly positive finite reals.
    Positive,
    /// The interval `[low, high]`; either end may be infinite.
    Interval { low: f64, high: f64 },
    /// An axis-aligned box with per-dimension bounds.
    IntervalVector { low: Array1<f64>, high: Array1<f64> },
    /// Member constraints applied to consecutive slices of the event
    /// axis; each entry pairs a constraint with its slice width.
    Concatenated(Vec<(Constraint, usize)>),
}

impl Constraint {
    /// Compose member constraints over consecutive event slices.
    ///
    /// # Errors
    /// - [`DistributionError::LengthMismatch`] if `members` and `sizes`
    ///   differ in length.
    /// - [`DistributionError::EmptyComposite`] if no members are given.
    pub fn concatenated(members: Vec<Constraint>, sizes: Vec<usize>) -> DistResult<Constraint> {
        if members.is_empty() {
            return Err(DistributionError::EmptyComposite { what: "concatenated constraint" });
        }
        if members.len() != sizes.len() {
            return Err(DistributionError::LengthMismatch {
                what: "constraint sizes",
                expected: members.len(),
                actual: sizes.len(),
            });
        }
        Ok(Constraint::Concatenated(members.into_iter().zip(sizes).collect()))
    }

    /// Total width of the event slice this constraint describes, when the
    /// constraint itself pins it down (`None` for element-wise scalar
    /// constraints, which take their width from the surrounding slice).
    pub fn event_size(&self) -> Option<usize> {
        match self {
            Constraint::Real | Constraint::Positive | Constraint::Interval { .. } => None,
            Constraint::IntervalVector { low, .. } => Some(low.len()),
            Constraint::Concatenated(members) => Some(members.iter().map(|(_, n)| n).sum()),
        }
    }

    /// Whether one event vector satisfies the constraint.
    ///
    /// NaN never satisfies any constraint.
    pub fn contains(&self, x: ArrayView1<'_, f64>) -> bool {
        match self {
            Constraint::Real => x.iter().all(|v| v.is_finite()),
            Constraint::Positive => x.iter().all(|v| v.is_finite() && *v > 0.0),
            Constraint::Interval { low, high } => {
                x.iter().all(|v| !v.is_nan() && *v >= *low && *v <= *high)
            }
            Constraint::IntervalVector { low, high } => {
                x.len() == low.len()
                    && x.iter()
                        .zip(low.iter().zip(high.iter()))
                        .all(|(v, (lo, hi))| !v.is_nan() && *v >= *lo && *v <= *hi)
            }
            Constraint::Concatenated(members) => {
                let mut offset = 0;
                for (member, size) in members {
                    let slice = x.slice(ndarray::s![offset..offset + size]);
                    if !member.contains(slice) {
                        return false;
                    }
                    offset += size;
                }
                offset == x.len()
            }
        }
    }

    /// Element-wise batched check: one boolean per row of `value`.
    pub fn check(&self, value: ArrayView2<'_, f64>) -> Vec<bool> {
        value.rows().into_iter().map(|row| self.contains(row)).collect()
    }
}
