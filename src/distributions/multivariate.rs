//! Multivariate distributions for jointly-modeled coordinate tuples.
//!
//! `DiagonalNormal` is the joint analogue of the univariate Normal: an
//! axis-aligned Gaussian over a fixed tuple of coordinates, with one
//! location and one scale per dimension and no cross-covariances. Its
//! log-density is the per-dimension sum, which keeps evaluation free of
//! dense linear algebra.

use ndarray::{Array1, Array2, ArrayView2};
use rand::distributions::Distribution as RandDistribution;
use statrs::distribution::Normal;

use crate::distributions::constraints::Constraint;
use crate::distributions::errors::{DistResult, DistributionError};
use crate::distributions::traits::{
    check_event_size, vector_arg, ConditionalValues, CoordinateDistribution, DistributionFamily,
    FamilyArgs,
};
use crate::numerics::normal_ln_pdf;
use crate::probability::RandomKey;

/// Axis-aligned multivariate Normal with per-dimension scales.
#[derive(Debug, Clone)]
pub struct DiagonalNormal {
    loc: Array1<f64>,
    scale: Array1<f64>,
}

impl DiagonalNormal {
    /// Construct from per-dimension locations and scales.
    ///
    /// # Errors
    /// - [`DistributionError::LengthMismatch`] if the vectors disagree or
    ///   are empty.
    /// - [`DistributionError::InvalidParameterEntry`] on non-finite
    ///   locations or non-positive scales.
    pub fn new(loc: Array1<f64>, scale: Array1<f64>) -> DistResult<Self> {
        if loc.is_empty() {
            return Err(DistributionError::LengthMismatch {
                what: "diagonal normal dimensions",
                expected: 1,
                actual: 0,
            });
        }
        if loc.len() != scale.len() {
            return Err(DistributionError::LengthMismatch {
                what: "diagonal normal scales",
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
        Ok(DiagonalNormal { loc, scale })
    }
}

impl CoordinateDistribution for DiagonalNormal {
    fn event_size(&self) -> usize {
        self.loc.len()
    }

    fn support(&self) -> Constraint {
        Constraint::IntervalVector {
            low: Array1::from_elem(self.loc.len(), f64::NEG_INFINITY),
            high: Array1::from_elem(self.loc.len(), f64::INFINITY),
        }
    }

    fn log_prob(&self, value: ArrayView2<'_, f64>, _cond: &ConditionalValues) -> DistResult<Array1<f64>> {
        check_event_size(&value, self.loc.len())?;
        Ok(Array1::from_iter(value.rows().into_iter().map(|row| {
            row.iter()
                .zip(self.loc.iter().zip(self.scale.iter()))
                .map(|(&v, (&loc, &scale))| normal_ln_pdf(v, loc, scale))
                .sum()
        })))
    }

    fn sample(&self, key: RandomKey, n: usize, _cond: &ConditionalValues) -> DistResult<Array2<f64>> {
        let standard = Normal::new(0.0, 1.0)?;
        let mut rng = key.rng();
        let d = self.loc.len();
        Ok(Array2::from_shape_fn((n, d), |(_, j)| {
            self.loc[j] + self.scale[j] * standard.sample(&mut rng)
        }))
    }
}

/// Family constructor for [`DiagonalNormal`]; vector arguments `loc`,
/// `scale`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagonalNormalFamily;

impl DistributionFamily for DiagonalNormalFamily {
    fn family_name(&self) -> &'static str {
        "diagonal_normal"
    }

    fn construct(&self, args: &FamilyArgs) -> DistResult<Box<dyn CoordinateDistribution>> {
        let loc = vector_arg(args, "loc")?.clone();
        let scale = vector_arg(args, "scale")?.clone();
        Ok(Box::new(DiagonalNormal::new(loc, scale)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn log_prob_is_the_sum_of_per_dimension_terms() {
        let dist = DiagonalNormal::new(array![0.0, 1.0], array![1.0, 2.0]).unwrap();
        let value = Array2::from_shape_vec((1, 2), vec![0.5, 2.0]).unwrap();
        let lp = dist.log_prob(value.view(), &ConditionalValues::new()).unwrap();
        let expected = normal_ln_pdf(0.5, 0.0, 1.0) + normal_ln_pdf(2.0, 1.0, 2.0);
        assert_relative_eq!(lp[0], expected, max_relative = 1e-12);
    }

    #[test]
    fn sample_shape_carries_the_event_dimension() {
        let dist = DiagonalNormal::new(array![0.0, 0.0, 0.0], array![1.0, 1.0, 1.0]).unwrap();
        let draws = dist.sample(RandomKey::new(11), 20, &ConditionalValues::new()).unwrap();
        assert_eq!(draws.dim(), (20, 3));
        let lp = dist.log_prob(draws.view(), &ConditionalValues::new()).unwrap();
        assert!(lp.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn mismatched_event_size_is_rejected() {
        let dist = DiagonalNormal::new(array![0.0, 0.0], array![1.0, 1.0]).unwrap();
        let value = Array2::zeros((4, 3));
        let err = dist.log_prob(value.view(), &ConditionalValues::new()).unwrap_err();
        assert!(matches!(err, DistributionError::EventSizeMismatch { expected: 2, actual: 3 }));
    }
}
