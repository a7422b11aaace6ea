//! Voxel classification of a mesh.
//!
//! A grid of `n x n x n` cells over a bounding box. Each cell is
//! [`Cell::Boundary`] if any triangle touches it, otherwise inside or outside
//! by a ray-parity test from its center.

use cncsim_math::{Point3, Vec3};
use rayon::prelude::*;
use serde::Serialize;

use crate::aabb::Aabb;
use crate::error::{Result, StockError};
use crate::mesh::Mesh;
use crate::tribox::tri_box_overlap;

/// Slack on the per-cell broadphase so it never rejects a touching triangle.
const BROADPHASE_SLACK: f64 = 1e-9;

/// Classification of one voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    /// Entirely inside the solid.
    Inside,
    /// Entirely outside the solid.
    Outside,
    /// Touched by the surface.
    Boundary,
}

/// Number of cells in each class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoxelCounts {
    /// Cells inside the solid.
    pub inside: usize,
    /// Cells outside the solid.
    pub outside: usize,
    /// Cells on the surface.
    pub boundary: usize,
}

/// A cubic grid of classified cells.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    bounds: Aabb,
    size: usize,
    cells: Vec<Cell>,
}

impl VoxelGrid {
    /// Classify `mesh` on an `n`-per-axis grid over its own bounds.
    pub fn build(mesh: &Mesh, n: usize) -> Result<Self> {
        Self::with_bounds(mesh, *mesh.bounds(), n)
    }

    /// Classify `mesh` on an `n`-per-axis grid over `bounds`.
    pub fn with_bounds(mesh: &Mesh, bounds: Aabb, n: usize) -> Result<Self> {
        if mesh.is_empty() {
            return Err(StockError::GeometryDegeneracy(
                "cannot voxelize an empty mesh".into(),
            ));
        }
        if n == 0 {
            return Err(StockError::GeometryDegeneracy(
                "voxel grid needs at least one cell per axis".into(),
            ));
        }
        let extent = bounds.size();
        if !(0..3).all(|axis| extent[axis] > 0.0 && extent[axis].is_finite()) {
            return Err(StockError::InvalidBounds(format!(
                "voxel bounds {:?}..{:?} have no volume",
                bounds.min, bounds.max
            )));
        }

        let cell = extent / n as f64;
        let half = cell / 2.0;
        let cells = (0..n * n * n)
            .into_par_iter()
            .map(|index| {
                let (x, y, z) = (index / (n * n), (index / n) % n, index % n);
                let lo = Point3::new(
                    bounds.min.x + x as f64 * cell.x,
                    bounds.min.y + y as f64 * cell.y,
                    bounds.min.z + z as f64 * cell.z,
                );
                classify(mesh, &(lo + half), &half)
            })
            .collect();

        Ok(Self {
            bounds,
            size: n,
            cells,
        })
    }

    /// Cells per axis.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Region covered by the grid.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// All cells, x-major then y then z.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at grid coordinates, if in range.
    pub fn cell(&self, x: usize, y: usize, z: usize) -> Option<Cell> {
        let n = self.size;
        if x >= n || y >= n || z >= n {
            return None;
        }
        self.cells.get((x * n + y) * n + z).copied()
    }

    /// Box covered by the cell at grid coordinates, if in range.
    pub fn cell_bounds(&self, x: usize, y: usize, z: usize) -> Option<Aabb> {
        let n = self.size;
        if x >= n || y >= n || z >= n {
            return None;
        }
        let cell = self.bounds.size() / n as f64;
        let lo = Point3::new(
            self.bounds.min.x + x as f64 * cell.x,
            self.bounds.min.y + y as f64 * cell.y,
            self.bounds.min.z + z as f64 * cell.z,
        );
        Some(Aabb::new(lo, lo + cell))
    }

    /// Tally of each class.
    pub fn counts(&self) -> VoxelCounts {
        let mut counts = VoxelCounts::default();
        for cell in &self.cells {
            match cell {
                Cell::Inside => counts.inside += 1,
                Cell::Outside => counts.outside += 1,
                Cell::Boundary => counts.boundary += 1,
            }
        }
        counts
    }
}

fn classify(mesh: &Mesh, center: &Point3, half: &Vec3) -> Cell {
    let broad = Aabb::new(center - half, center + half).expanded(BROADPHASE_SLACK);
    let touched = mesh
        .triangles()
        .iter()
        .any(|t| broad.overlaps(&t.bounds()) && tri_box_overlap(center, half, &t.vertices));
    if touched {
        Cell::Boundary
    } else if mesh.contains_point(center) {
        Cell::Inside
    } else {
        Cell::Outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_box() -> Mesh {
        Mesh::from_box(Point3::origin(), Point3::new(10.0, 10.0, 10.0)).unwrap()
    }

    fn span(min: f64, max: f64) -> Aabb {
        Aabb::new(Point3::new(min, min, min), Point3::new(max, max, max))
    }

    fn counts(inside: usize, outside: usize, boundary: usize) -> VoxelCounts {
        VoxelCounts {
            inside,
            outside,
            boundary,
        }
    }

    #[test]
    fn test_grid_over_own_bounds() {
        let grid = VoxelGrid::build(&ten_box(), 4).unwrap();
        assert_eq!(grid.size(), 4);
        assert_eq!(grid.cells().len(), 64);
        assert_eq!(grid.counts(), counts(8, 0, 56));
        assert_eq!(grid.cell(0, 0, 0), Some(Cell::Boundary));
        assert_eq!(grid.cell(1, 2, 1), Some(Cell::Inside));
        assert_eq!(grid.cell(4, 0, 0), None);
        let b = grid.cell_bounds(1, 2, 3).unwrap();
        assert_eq!(b.min, Point3::new(2.5, 5.0, 7.5));
        assert_eq!(b.max, Point3::new(5.0, 7.5, 10.0));
        assert!(grid.cell_bounds(0, 4, 0).is_none());
    }

    #[test]
    fn test_grid_larger_than_mesh() {
        let grid = VoxelGrid::with_bounds(&ten_box(), span(-10.0, 20.0), 6).unwrap();
        assert_eq!(grid.counts(), counts(0, 152, 64));
        assert_eq!(grid.cell(0, 0, 0), Some(Cell::Outside));

        let grid = VoxelGrid::with_bounds(&ten_box(), span(-10.5, 20.5), 3).unwrap();
        assert_eq!(grid.counts(), counts(0, 26, 1));
        assert_eq!(grid.cell(1, 1, 1), Some(Cell::Boundary));
    }

    #[test]
    fn test_grid_with_margin() {
        let grid = VoxelGrid::with_bounds(&ten_box(), span(-2.0, 12.0), 7).unwrap();
        assert_eq!(grid.counts(), counts(27, 0, 316));
    }

    #[test]
    fn test_grid_strictly_inside() {
        let grid = VoxelGrid::with_bounds(&ten_box(), span(1.0, 9.0), 2).unwrap();
        assert_eq!(grid.counts(), counts(8, 0, 0));
    }

    #[test]
    fn test_cavity_cells_are_not_inside() {
        let cavity = Mesh::from_box(Point3::new(4.0, 4.0, 4.0), Point3::new(6.0, 6.0, 6.0)).unwrap();
        let carved = ten_box().subtract(&cavity);
        let grid = VoxelGrid::build(&carved, 10).unwrap();
        assert_eq!(grid.counts(), counts(448, 0, 552));
        assert_eq!(grid.cell(4, 4, 4), Some(Cell::Boundary));
        assert_eq!(grid.cell(2, 2, 2), Some(Cell::Inside));
    }

    #[test]
    fn test_rejects_degenerate_input() {
        assert!(matches!(
            VoxelGrid::build(&Mesh::new(), 4),
            Err(StockError::GeometryDegeneracy(_))
        ));
        assert!(matches!(
            VoxelGrid::build(&ten_box(), 0),
            Err(StockError::GeometryDegeneracy(_))
        ));
        let flat = Aabb::new(Point3::origin(), Point3::new(10.0, 10.0, 0.0));
        assert!(matches!(
            VoxelGrid::with_bounds(&ten_box(), flat, 2),
            Err(StockError::InvalidBounds(_))
        ));
    }
}
