//! 1-D grid handling and 2-D mesh construction for model evaluation.
//!
//! Grids are supplied as bin **edges**; densities are always evaluated at
//! bin **centers** (the midpoint of successive edges). Meshes follow the
//! row-major convention of matrix indexing over an (x, y) pair: for an x
//! grid of length `nx` and a y grid of length `ny`, both mesh arrays have
//! shape `(ny, nx)`, with x varying along columns and y along rows.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};

use crate::model::errors::{ModelError, ModelResult};

/// Validate a 1-D grid of bin edges: at least two finite, strictly
/// increasing values.
pub fn validate_grid(name: &str, edges: &Array1<f64>) -> ModelResult<()> {
    if edges.len() < 2 {
        return Err(ModelError::InvalidGrid {
            name: name.to_string(),
            reason: "a grid needs at least two edges",
        });
    }
    for (i, &e) in edges.iter().enumerate() {
        if !e.is_finite() {
            return Err(ModelError::InvalidGrid {
                name: name.to_string(),
                reason: "grid edges must be finite",
            });
        }
        if i > 0 && e <= edges[i - 1] {
            return Err(ModelError::InvalidGrid {
                name: name.to_string(),
                reason: "grid edges must be strictly increasing",
            });
        }
    }
    Ok(())
}

/// Bin centers of an edge grid: `0.5 * (edges[:-1] + edges[1:])`.
pub fn bin_centers(edges: &Array1<f64>) -> Array1<f64> {
    Array1::from_iter(edges.windows(2).into_iter().map(|w| 0.5 * (w[0] + w[1])))
}

/// Pair of coordinate meshes for an (x, y) grid pair, shape `(ny, nx)`:
/// the first carries x values (constant down columns), the second y
/// values (constant along rows).
pub fn meshgrid_xy(x: &Array1<f64>, y: &Array1<f64>) -> (Array2<f64>, Array2<f64>) {
    let (ny, nx) = (y.len(), x.len());
    let xs = Array2::from_shape_fn((ny, nx), |(_, j)| x[j]);
    let ys = Array2::from_shape_fn((ny, nx), |(i, _)| y[i]);
    (xs, ys)
}

/// Flatten a mesh row-major into a 1-D batch axis.
pub fn flatten_mesh(mesh: &Array2<f64>) -> Array1<f64> {
    Array1::from_iter(mesh.iter().copied())
}

/// Result of a 2-D grid evaluation: per requested pair, the edge meshes
/// and the log-density surface at bin centers.
#[derive(Debug, Clone)]
pub struct GridEvaluation {
    /// Edge meshes per pair, each of shape `(ny, nx)`.
    pub meshes: BTreeMap<(String, String), (Array2<f64>, Array2<f64>)>,
    /// Log-density surfaces per pair at bin centers, shape
    /// `(ny - 1, nx - 1)`.
    pub log_densities: BTreeMap<(String, String), Array2<f64>>,
}
