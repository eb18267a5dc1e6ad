//! Concatenation of independent distributions into one joint event space.
//!
//! [`ConcatenatedDistributions`] combines members (univariate and
//! multivariate, freely mixed) into a single distribution over the direct
//! sum of their event spaces, in declaration order. `log_prob` slices the
//! trailing axis per member and sums the member log-densities; `sample`
//! draws each member with an independent derived sub-key and concatenates
//! along the trailing axis. Support and bijector composition follow the
//! same slicing discipline through [`Constraint::Concatenated`] and
//! [`Transform::Concatenated`].

use ndarray::{Array1, Array2, ArrayView2};

use crate::distributions::constraints::Constraint;
use crate::distributions::errors::{DistResult, DistributionError};
use crate::distributions::traits::{
    check_event_size, ConditionalValues, CoordinateDistribution,
};
use crate::probability::RandomKey;

/// Joint distribution over the concatenation of member event spaces.
#[derive(Debug)]
pub struct ConcatenatedDistributions {
    members: Vec<Box<dyn CoordinateDistribution>>,
    sizes: Vec<usize>,
    event_size: usize,
}

impl ConcatenatedDistributions {
    /// Combine `members` in declaration order.
    ///
    /// # Errors
    /// - [`DistributionError::EmptyComposite`] if no members are given.
    pub fn new(members: Vec<Box<dyn CoordinateDistribution>>) -> DistResult<Self> {
        if members.is_empty() {
            return Err(DistributionError::EmptyComposite { what: "concatenated distribution" });
        }
        let sizes: Vec<usize> = members.iter().map(|m| m.event_size()).collect();
        let event_size = sizes.iter().sum();
        Ok(ConcatenatedDistributions { members, sizes, event_size })
    }

    /// Event sizes of the members, in declaration order.
    pub fn member_sizes(&self) -> &[usize] {
        &self.sizes
    }
}

impl CoordinateDistribution for ConcatenatedDistributions {
    fn event_size(&self) -> usize {
        self.event_size
    }

    fn support(&self) -> Constraint {
        Constraint::Concatenated(
            self.members.iter().zip(self.sizes.iter()).map(|(m, &n)| (m.support(), n)).collect(),
        )
    }

    fn log_prob(&self, value: ArrayView2<'_, f64>, cond: &ConditionalValues) -> DistResult<Array1<f64>> {
        check_event_size(&value, self.event_size)?;
        let mut total = Array1::zeros(value.nrows());
        let mut offset = 0;
        for (member, &size) in self.members.iter().zip(self.sizes.iter()) {
            let slice = value.slice(ndarray::s![.., offset..offset + size]);
            total += &member.log_prob(slice, cond)?;
            offset += size;
        }
        Ok(total)
    }

    fn sample(&self, key: RandomKey, n: usize, cond: &ConditionalValues) -> DistResult<Array2<f64>> {
        let keys = key.split(self.members.len());
        let mut out = Array2::zeros((n, self.event_size));
        let mut offset = 0;
        for ((member, &size), sub_key) in self.members.iter().zip(self.sizes.iter()).zip(keys) {
            let draws = member.sample(sub_key, n, cond)?;
            if draws.nrows() != n {
                return Err(DistributionError::LengthMismatch {
                    what: "member sample batch",
                    expected: n,
                    actual: draws.nrows(),
                });
            }
            out.slice_mut(ndarray::s![.., offset..offset + size]).assign(&draws);
            offset += size;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    use crate::distributions::multivariate::DiagonalNormal;
    use crate::distributions::transforms::biject_to;
    use crate::distributions::univariate::{NormalDist, UniformDist};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests port the behavioral contract of the concatenated
    // distribution: event size, log-prob output shapes (batch only, no
    // trailing event axis), sample shapes, additivity across members, and
    // the constraint/transform composition round trip.
    // -------------------------------------------------------------------------

    fn all_univariate() -> ConcatenatedDistributions {
        ConcatenatedDistributions::new(vec![
            Box::new(NormalDist::new(0.0, 1.0).unwrap()),
            Box::new(NormalDist::new(2.0, 0.5).unwrap()),
            Box::new(NormalDist::new(1.0, 0.25).unwrap()),
        ])
        .unwrap()
    }

    fn univariate_and_multivariate() -> ConcatenatedDistributions {
        ConcatenatedDistributions::new(vec![
            Box::new(NormalDist::new(0.0, 1.0).unwrap()),
            Box::new(DiagonalNormal::new(array![1.0, 2.0], array![1.0, 0.5]).unwrap()),
        ])
        .unwrap()
    }

    #[test]
    fn event_size_is_the_sum_of_member_sizes() {
        assert_eq!(all_univariate().event_size(), 3);
        assert_eq!(univariate_and_multivariate().event_size(), 3);
        assert_eq!(univariate_and_multivariate().member_sizes(), &[1, 2]);
    }

    #[test]
    fn log_prob_has_batch_shape_only() {
        for dist in [all_univariate(), univariate_and_multivariate()] {
            let single = Array2::from_shape_vec((1, 3), vec![0.0, 1.0, 2.0]).unwrap();
            assert_eq!(dist.log_prob(single.view(), &ConditionalValues::new()).unwrap().len(), 1);

            let batch = Array2::from_shape_vec(
                (3, 3),
                vec![0.0, 1.0, 2.0, 1.0, 2.0, 3.0, 2.0, 3.0, 4.0],
            )
            .unwrap();
            assert_eq!(dist.log_prob(batch.view(), &ConditionalValues::new()).unwrap().len(), 3);
        }
    }

    #[test]
    fn log_prob_sums_member_log_probs_on_their_slices() {
        let dist = univariate_and_multivariate();
        let value = Array2::from_shape_vec((1, 3), vec![0.3, 1.5, 2.5]).unwrap();
        let total = dist.log_prob(value.view(), &ConditionalValues::new()).unwrap()[0];

        let first = NormalDist::new(0.0, 1.0).unwrap();
        let second = DiagonalNormal::new(array![1.0, 2.0], array![1.0, 0.5]).unwrap();
        let lp1 = first
            .log_prob(value.slice(ndarray::s![.., 0..1]), &ConditionalValues::new())
            .unwrap()[0];
        let lp2 = second
            .log_prob(value.slice(ndarray::s![.., 1..3]), &ConditionalValues::new())
            .unwrap()[0];
        assert_relative_eq!(total, lp1 + lp2, max_relative = 1e-12);
    }

    #[test]
    fn sample_concatenates_along_the_trailing_axis() {
        for dist in [all_univariate(), univariate_and_multivariate()] {
            for &n in &[1usize, 4, 20] {
                let draws = dist.sample(RandomKey::new(0), n, &ConditionalValues::new()).unwrap();
                assert_eq!(draws.dim(), (n, 3));
                // Round trip: samples must receive finite density.
                let lp = dist.log_prob(draws.view(), &ConditionalValues::new()).unwrap();
                assert!(lp.iter().all(|v| v.is_finite()));
            }
        }
    }

    #[test]
    fn member_sub_keys_are_independent() {
        let dist = all_univariate();
        let draws = dist.sample(RandomKey::new(5), 50, &ConditionalValues::new()).unwrap();
        // Members share loc 0/2/1 but distinct keys: columns must differ.
        let c0 = draws.column(0);
        let c1 = draws.column(1);
        assert!(c0.iter().zip(c1.iter()).any(|(a, b)| (a - b).abs() > 1e-12));
    }

    #[test]
    fn support_composes_member_constraints_slice_wise() {
        let dist = ConcatenatedDistributions::new(vec![
            Box::new(UniformDist::new(0.0, 1.0).unwrap()),
            Box::new(NormalDist::new(0.0, 1.0).unwrap()),
        ])
        .unwrap();
        let support = dist.support();
        assert!(support.contains(array![0.5, -10.0].view()));
        assert!(!support.contains(array![1.5, 0.0].view()));

        // The composed bijector round-trips through the composed support.
        let transform = biject_to(&support);
        let x = array![0.3, -1.2];
        let back = transform.inverse(transform.forward(x.view()).view());
        for (a, b) in back.iter().zip(x.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-8, epsilon = 1e-8);
        }
    }

    #[test]
    fn empty_member_list_is_rejected() {
        let err = ConcatenatedDistributions::new(Vec::new()).unwrap_err();
        assert!(matches!(err, DistributionError::EmptyComposite { .. }));
    }
}
