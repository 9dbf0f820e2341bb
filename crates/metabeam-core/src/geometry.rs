//! Planar array geometry
//!
//! Builds the centred element-position grids `X`, `Y` (shape `Ny × Nx`) from
//! the element counts and pitch. Axis positions run from `-(N-1)/2·pitch` to
//! `+(N-1)/2·pitch` in unit steps, so the grid is symmetric about the origin
//! for either parity of `N`, and `N = 1` puts its single element at zero.
//!
//! ```rust
//! use metabeam_core::geometry::ArrayGeometry;
//!
//! let geom = ArrayGeometry::new(4, 2, 0.5);
//! assert_eq!(geom.num_elements(), 8);
//! assert_eq!(geom.x_positions(), vec![-0.75, -0.25, 0.25, 0.75]);
//! assert_eq!(geom.y_positions(), vec![-0.25, 0.25]);
//! ```

use crate::config::PhysicsConfig;
use crate::types::Grid;

/// Rectangular, centred element lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayGeometry {
    /// Elements along x (columns)
    pub nx: usize,
    /// Elements along y (rows)
    pub ny: usize,
    /// Pitch along x in metres
    pub dx: f64,
    /// Pitch along y in metres
    pub dy: f64,
    x: Grid<f64>,
    y: Grid<f64>,
}

/// Centred 1-D axis positions.
fn axis_positions(n: usize, pitch: f64) -> Vec<f64> {
    let centre = (n as f64 - 1.0) / 2.0;
    (0..n).map(|i| (i as f64 - centre) * pitch).collect()
}

impl ArrayGeometry {
    /// Square-pitch lattice of `nx × ny` elements.
    pub fn new(nx: usize, ny: usize, pitch: f64) -> Self {
        Self::with_pitch(nx, ny, pitch, pitch)
    }

    /// Lattice with independent pitch per axis.
    pub fn with_pitch(nx: usize, ny: usize, dx: f64, dy: f64) -> Self {
        let xs = axis_positions(nx, dx);
        let ys = axis_positions(ny, dy);
        let x = Grid::from_fn(ny, nx, |_, col| xs[col]);
        let y = Grid::from_fn(ny, nx, |row, _| ys[row]);
        Self { nx, ny, dx, dy, x, y }
    }

    /// Half-wavelength lattice for the configured carrier.
    pub fn half_wavelength(nx: usize, ny: usize, physics: &PhysicsConfig) -> Self {
        Self::new(nx, ny, physics.element_pitch())
    }

    pub fn num_elements(&self) -> usize {
        self.nx * self.ny
    }

    /// X coordinate of every element, `Ny × Nx`.
    pub fn x(&self) -> &Grid<f64> {
        &self.x
    }

    /// Y coordinate of every element, `Ny × Nx`.
    pub fn y(&self) -> &Grid<f64> {
        &self.y
    }

    /// 1-D x axis (one entry per column).
    pub fn x_positions(&self) -> Vec<f64> {
        axis_positions(self.nx, self.dx)
    }

    /// 1-D y axis (one entry per row).
    pub fn y_positions(&self) -> Vec<f64> {
        axis_positions(self.ny, self.dy)
    }

    /// `(x, y)` of element `(row, col)`.
    pub fn position(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        Some((*self.x.get(row, col)?, *self.y.get(row, col)?))
    }

    /// Row-major iterator over `(x, y)` pairs.
    pub fn positions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_shape_is_ny_by_nx() {
        let g = ArrayGeometry::new(5, 3, 1.0);
        assert_eq!(g.x().rows(), 3);
        assert_eq!(g.x().cols(), 5);
        assert_eq!(g.y().rows(), 3);
        assert_eq!(g.num_elements(), 15);
    }

    #[test]
    fn test_positions_symmetric_even_and_odd() {
        for n in [1usize, 2, 3, 4, 7, 16] {
            let xs = axis_positions(n, 0.5);
            assert_eq!(xs.len(), n);
            for i in 0..n {
                assert!((xs[i] + xs[n - 1 - i]).abs() < 1e-12, "n={} i={}", n, i);
            }
            if n > 1 {
                assert!((xs[1] - xs[0] - 0.5).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_single_element_at_origin() {
        let g = ArrayGeometry::new(1, 1, 0.015);
        assert_eq!(g.position(0, 0), Some((0.0, 0.0)));
        assert_eq!(g.position(0, 1), None);
    }

    #[test]
    fn test_degenerate_row_array() {
        let g = ArrayGeometry::new(4, 1, 1.0);
        assert_eq!(g.x().as_slice(), &[-1.5, -0.5, 0.5, 1.5]);
        assert!(g.y().iter().all(|&y| y == 0.0));
    }

    #[test]
    fn test_meshgrid_layout() {
        let g = ArrayGeometry::new(2, 3, 1.0);
        // X varies along columns, Y along rows
        assert_eq!(g.position(0, 0), Some((-0.5, -1.0)));
        assert_eq!(g.position(0, 1), Some((0.5, -1.0)));
        assert_eq!(g.position(2, 0), Some((-0.5, 1.0)));
    }

    #[test]
    fn test_half_wavelength_pitch() {
        let g = ArrayGeometry::half_wavelength(2, 2, &PhysicsConfig::default());
        assert!((g.dx - 0.015).abs() < 1e-15);
        assert!((g.dy - 0.015).abs() < 1e-15);
    }
}
