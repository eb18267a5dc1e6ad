//! Categorical mixture over heterogeneous member distributions.
//!
//! [`GeneralMixture`] weights member distributions sharing one event size
//! by a categorical distribution over component indices. Its log-density
//! is the weighted log-sum-exp of the member log-densities, with
//! zero-weight members dropping out exactly; sampling draws a component
//! index per event by inverse-transform sampling of the weights and then
//! delegates to the chosen member.

use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;

use crate::distributions::constraints::Constraint;
use crate::distributions::errors::{DistResult, DistributionError};
use crate::distributions::traits::{
    check_event_size, ConditionalValues, CoordinateDistribution,
};
use crate::numerics::logsumexp_weighted;
use crate::probability::RandomKey;

/// Weighted mixture of member distributions over one event space.
#[derive(Debug)]
pub struct GeneralMixture {
    weights: Array1<f64>,
    members: Vec<Box<dyn CoordinateDistribution>>,
    event_size: usize,
}

impl GeneralMixture {
    /// Construct from non-negative weights (normalized internally) and
    /// members of equal event size.
    ///
    /// # Errors
    /// - [`DistributionError::EmptyComposite`] if no members are given.
    /// - [`DistributionError::LengthMismatch`] if the weight count
    ///   differs from the member count.
    /// - [`DistributionError::InvalidParameterEntry`] on negative or
    ///   non-finite weights, or if the weights sum to zero.
    /// - [`DistributionError::EventSizeMismatch`] if members disagree on
    ///   event size.
    pub fn new(weights: Array1<f64>, members: Vec<Box<dyn CoordinateDistribution>>) -> DistResult<Self> {
        if members.is_empty() {
            return Err(DistributionError::EmptyComposite { what: "mixture" });
        }
        if weights.len() != members.len() {
            return Err(DistributionError::LengthMismatch {
                what: "mixture weights",
                expected: members.len(),
                actual: weights.len(),
            });
        }
        for (i, &w) in weights.iter().enumerate() {
            if !w.is_finite() || w < 0.0 {
                return Err(DistributionError::InvalidParameterEntry {
                    name: "weights",
                    index: i,
                    value: w,
                });
            }
        }
        let total: f64 = weights.sum();
        if total <= 0.0 {
            return Err(DistributionError::InvalidParameterEntry {
                name: "weights",
                index: 0,
                value: total,
            });
        }
        let event_size = members[0].event_size();
        for member in &members[1..] {
            if member.event_size() != event_size {
                return Err(DistributionError::EventSizeMismatch {
                    expected: event_size,
                    actual: member.event_size(),
                });
            }
        }
        Ok(GeneralMixture { weights: weights / total, members, event_size })
    }

    /// Normalized mixing weights.
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }
}

impl CoordinateDistribution for GeneralMixture {
    fn event_size(&self) -> usize {
        self.event_size
    }

    fn support(&self) -> Constraint {
        // Members may have differing supports; the mixture reports the
        // first member's, matching the convention of general mixtures
        // whose support checking is delegated to callers.
        self.members[0].support()
    }

    fn log_prob(&self, value: ArrayView2<'_, f64>, cond: &ConditionalValues) -> DistResult<Array1<f64>> {
        check_event_size(&value, self.event_size)?;
        let per_member: Vec<Array1<f64>> =
            self.members.iter().map(|m| m.log_prob(value, cond)).collect::<DistResult<_>>()?;
        let n = value.nrows();
        let mut out = Array1::zeros(n);
        let mut scratch = Array1::zeros(self.members.len());
        for i in 0..n {
            for (k, lp) in per_member.iter().enumerate() {
                scratch[k] = lp[i];
            }
            out[i] = logsumexp_weighted(scratch.view(), self.weights.view());
        }
        Ok(out)
    }

    fn sample(&self, key: RandomKey, n: usize, cond: &ConditionalValues) -> DistResult<Array2<f64>> {
        // One batch per member under its own sub-key, then per-event
        // selection by a categorical draw over the weights.
        let member_keys = key.derive(0).split(self.members.len());
        let drawn: Vec<Array2<f64>> = self
            .members
            .iter()
            .zip(member_keys)
            .map(|(m, k)| m.sample(k, n, cond))
            .collect::<DistResult<_>>()?;
        let mut rng = key.derive(1).rng();
        let mut out = Array2::zeros((n, self.event_size));
        for i in 0..n {
            let mut u: f64 = rng.gen();
            let mut choice = self.members.len() - 1;
            for (k, &w) in self.weights.iter().enumerate() {
                if u < w {
                    choice = k;
                    break;
                }
                u -= w;
            }
            out.row_mut(i).assign(&drawn[choice].row(i));
        }
        Ok(out)
    }
}
