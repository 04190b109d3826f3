use rayon::prelude::*;
use terrasift_core::{containers::PointSet, layout::dimensions};

use crate::spatial_index::SpatialIndex2D;

/// Regular 2D grid over the XY extent of a point set. Cells are stored row-major, with row 0 at the
/// minimum Y coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    min_x: f64,
    min_y: f64,
    cell_size: f64,
    cols: usize,
    rows: usize,
}

impl Grid {
    /// Creates a grid that covers all points in `points`. The grid has `ceil(extent / cell_size) + 1`
    /// cells along each axis. Returns `None` if `points` is empty, has no X, Y and Z dimensions, or if
    /// `cell_size` is not a positive number.
    pub fn covering(points: &PointSet, cell_size: f64) -> Option<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return None;
        }
        let bounds = points.bounds()?;
        let extent = bounds.extent();
        Some(Self {
            min_x: bounds.min().x,
            min_y: bounds.min().y,
            cell_size,
            cols: (extent.x / cell_size).ceil() as usize + 1,
            rows: (extent.y / cell_size).ceil() as usize + 1,
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major index of the cell that contains the given position. Positions outside of the grid are
    /// clamped to the closest border cell.
    pub fn cell_index(&self, x: f64, y: f64) -> usize {
        let clamp = |value: f64, cells: usize| (value.max(0.0) as usize).min(cells - 1);
        let col = clamp(((x - self.min_x) / self.cell_size).floor(), self.cols);
        let row = clamp(((y - self.min_y) / self.cell_size).floor(), self.rows);
        row * self.cols + col
    }

    /// XY position of the center of the cell with the given row-major index
    pub fn cell_center(&self, index: usize) -> [f64; 2] {
        let col = index % self.cols;
        let row = index / self.cols;
        [
            self.min_x + (col as f64 + 0.5) * self.cell_size,
            self.min_y + (row as f64 + 0.5) * self.cell_size,
        ]
    }

    /// The lowest Z value of all points per cell, `None` for cells without points
    pub fn minimum_surface(&self, points: &PointSet) -> Vec<Option<f64>> {
        let mut surface = vec![None; self.len()];
        for id in 0..points.len() {
            let cell = self.cell_index(
                points.get_field(dimensions::X.id(), id),
                points.get_field(dimensions::Y.id(), id),
            );
            let z = points.get_field(dimensions::Z.id(), id);
            surface[cell] = Some(match surface[cell] {
                Some(current) if current <= z => current,
                _ => z,
            });
        }
        surface
    }

    /// Turns `surface` into a dense surface: every empty cell takes the value of the populated cell whose
    /// center is closest to its own center. If no cell is populated at all, every value is NaN.
    pub fn fill_gaps(&self, surface: &[Option<f64>]) -> Vec<f64> {
        let (populated_cells, populated_values): (Vec<_>, Vec<_>) = surface
            .iter()
            .enumerate()
            .filter_map(|(cell, value)| value.map(|value| (self.cell_center(cell), value)))
            .unzip();
        let index = SpatialIndex2D::from_coordinates(populated_cells);

        surface
            .par_iter()
            .enumerate()
            .map(|(cell, value)| match value {
                Some(value) => *value,
                None => index
                    .nearest(self.cell_center(cell))
                    .map(|nearest| populated_values[nearest])
                    .unwrap_or(f64::NAN),
            })
            .collect()
    }
}
