//! A model component viewed as one joint distribution.
//!
//! Mixture registration needs each component to behave as a single
//! distribution over the concatenation of its coordinates, so that a
//! categorical mixture can weigh whole components against each other.
//! [`StackedComponent`] adapts a [`ModelComponent`] plus its built
//! per-coordinate distributions into that shape: `log_prob` slices the
//! event axis per coordinate key (declared order), rebuilds each key's
//! conditional inputs from the value columns themselves, and sums;
//! `sample` draws keys in dependency order and assembles the columns
//! back into declared positions.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView2};

use crate::distributions::constraints::Constraint;
use crate::distributions::errors::{DistResult, DistributionError};
use crate::distributions::traits::{check_event_size, ConditionalValues, CoordinateDistribution};
use crate::model::component::{conditional_slice, CoordDists, ModelComponent};
use crate::model::core::coords::CoordKey;
use crate::model::core::order::{resolve_order, ConditionalWiring};
use crate::model::errors::ModelResult;
use crate::probability::RandomKey;

/// One component's coordinate distributions as a single joint
/// distribution over the concatenation of its coordinates.
#[derive(Debug)]
pub struct StackedComponent {
    coords: CoordDists,
    wiring: ConditionalWiring,
    /// Sampling order as indices into `coords`.
    order: Vec<usize>,
    /// Column offset of each entry of `coords` in the stacked event axis.
    offsets: Vec<usize>,
    event_size: usize,
}

impl StackedComponent {
    /// Adapt `component` with its built distributions (as returned by
    /// [`ModelComponent::make_dists`], in declared order).
    ///
    /// # Errors
    /// - [`crate::model::errors::ModelError::CircularDependency`] if the
    ///   component's conditional wiring cannot be ordered.
    /// - A wrapped [`DistributionError::EventSizeMismatch`] if a built
    ///   distribution's event size differs from its key's width.
    pub fn new(component: &ModelComponent, dists: CoordDists) -> ModelResult<Self> {
        for (key, dist) in &dists {
            if dist.event_size() != key.len() {
                return Err(DistributionError::EventSizeMismatch {
                    expected: key.len(),
                    actual: dist.event_size(),
                }
                .into());
            }
        }

        let keys: Vec<CoordKey> = dists.iter().map(|(k, _)| k.clone()).collect();
        let wiring = component.conditional_data().clone();
        let ordered = resolve_order(&keys, &wiring)?;
        let order = ordered
            .iter()
            .map(|key| keys.iter().position(|k| k == key).expect("order is a permutation"))
            .collect();

        let mut offsets = Vec::with_capacity(dists.len());
        let mut event_size = 0;
        for (key, _) in &dists {
            offsets.push(event_size);
            event_size += key.len();
        }

        Ok(StackedComponent { coords: dists, wiring, order, offsets, event_size })
    }

    /// Extract per-coordinate-name columns from a stacked value batch.
    fn name_columns(&self, value: ArrayView2<'_, f64>) -> BTreeMap<String, Array1<f64>> {
        let mut columns = BTreeMap::new();
        for ((key, _), &offset) in self.coords.iter().zip(self.offsets.iter()) {
            for (j, name) in key.names().iter().enumerate() {
                columns.insert(name.clone(), value.column(offset + j).to_owned());
            }
        }
        columns
    }
}

impl CoordinateDistribution for StackedComponent {
    fn event_size(&self) -> usize {
        self.event_size
    }

    fn support(&self) -> Constraint {
        Constraint::Concatenated(
            self.coords.iter().map(|(key, dist)| (dist.support(), key.len())).collect(),
        )
    }

    fn log_prob(&self, value: ArrayView2<'_, f64>, _cond: &ConditionalValues) -> DistResult<Array1<f64>> {
        check_event_size(&value, self.event_size)?;
        let columns = self.name_columns(value);
        let mut total = Array1::zeros(value.nrows());
        for ((key, dist), &offset) in self.coords.iter().zip(self.offsets.iter()) {
            let slice = value.slice(ndarray::s![.., offset..offset + key.len()]);
            let cond = conditional_slice(&self.wiring, key, &columns);
            total += &dist.log_prob(slice, &cond)?;
        }
        Ok(total)
    }

    fn sample(&self, key: RandomKey, n: usize, _cond: &ConditionalValues) -> DistResult<Array2<f64>> {
        let sample_keys = key.split(self.order.len());
        let mut columns: BTreeMap<String, Array1<f64>> = BTreeMap::new();
        let mut out = Array2::zeros((n, self.event_size));
        for (&idx, sub_key) in self.order.iter().zip(sample_keys) {
            let (coord_key, dist) = &self.coords[idx];
            let cond = conditional_slice(&self.wiring, coord_key, &columns);
            let draws = dist.sample(sub_key, n, &cond)?;
            if draws.nrows() != n {
                return Err(DistributionError::LengthMismatch {
                    what: "stacked sample batch",
                    expected: n,
                    actual: draws.nrows(),
                });
            }
            let offset = self.offsets[idx];
            out.slice_mut(ndarray::s![.., offset..offset + coord_key.len()]).assign(&draws);
            for (j, name) in coord_key.names().iter().enumerate() {
                columns.insert(name.clone(), draws.column(j).to_owned());
            }
        }
        Ok(out)
    }
}
