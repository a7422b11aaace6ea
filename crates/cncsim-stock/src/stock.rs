//! The workpiece and material removal along a tool path.

use std::collections::BTreeMap;

use cncsim_math::Point3;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::cutter::{Cutter, DEFAULT_SEGMENTS};
use crate::error::{Result, StockError};
use crate::mesh::Mesh;
use crate::voxel::{VoxelCounts, VoxelGrid};

/// Stock and carving settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    /// Minimum corner of the stock block (mm).
    pub min: [f64; 3],
    /// Maximum corner of the stock block (mm).
    pub max: [f64; 3],
    /// Carve the stock at all.
    pub enabled: bool,
    /// Minimum head travel between successive subtractions (mm).
    pub subtract_spacing: f64,
    /// Cells per axis of the report grid.
    pub voxel_resolution: usize,
    /// Facets around each cutter.
    pub segments: usize,
    /// Cutter for tools missing from the tool table.
    pub default_tool: Cutter,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            min: [-50.0, -50.0, -20.0],
            max: [50.0, 50.0, 0.0],
            enabled: true,
            subtract_spacing: 1.0,
            voxel_resolution: 32,
            segments: DEFAULT_SEGMENTS,
            default_tool: Cutter::default(),
        }
    }
}

impl StockConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        for axis in 0..3 {
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if hi <= lo || !lo.is_finite() || !hi.is_finite() {
                return Err(StockError::InvalidBounds(format!(
                    "min {:?} must be below max {:?} on every axis",
                    self.min, self.max
                )));
            }
        }
        if self.subtract_spacing < 0.0 || !self.subtract_spacing.is_finite() {
            return Err(StockError::GeometryDegeneracy(
                "subtract_spacing must be zero or positive".into(),
            ));
        }
        if self.voxel_resolution == 0 {
            return Err(StockError::GeometryDegeneracy(
                "voxel_resolution must be at least 1".into(),
            ));
        }
        if self.segments < 3 {
            return Err(StockError::InvalidCutter(
                "segments must be at least 3".into(),
            ));
        }
        self.default_tool.validate()
    }
}

/// A tool table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Tool number as used by `T` words.
    pub id: u32,
    /// The cutter mounted under that number.
    #[serde(flatten)]
    pub cutter: Cutter,
}

/// Counts from one carving pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CarveStats {
    /// Subtractions that overlapped the stock.
    pub cuts: usize,
    /// Cutter placements that missed the stock.
    pub air: usize,
    /// Path points skipped for being too close to the previous placement.
    pub skipped: usize,
}

/// Summary of the stock after carving.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockReport {
    /// Triangles in the stock mesh.
    pub triangles: usize,
    /// Volume before any cut (mm³).
    pub initial_volume: f64,
    /// Current volume (mm³).
    pub volume: f64,
    /// Material removed so far (mm³).
    pub removed_volume: f64,
    /// Voxel classification over the original block.
    pub voxels: Option<VoxelCounts>,
}

/// The workpiece: a closed mesh carved by cutter solids.
#[derive(Debug, Clone)]
pub struct Stock {
    config: StockConfig,
    mesh: Mesh,
    initial_volume: f64,
    /// Cutter meshes at the origin, keyed by tool number.
    tools: BTreeMap<u32, Mesh>,
    default_tool: Mesh,
}

impl Stock {
    /// Build the stock block and mesh every cutter in the tool table.
    pub fn new(config: StockConfig, tools: &[ToolEntry]) -> Result<Self> {
        config.validate()?;
        let [x0, y0, z0] = config.min;
        let [x1, y1, z1] = config.max;
        let mesh = Mesh::from_box(Point3::new(x0, y0, z0), Point3::new(x1, y1, z1))?;
        let default_tool = config.default_tool.mesh(config.segments)?;
        let mut table = BTreeMap::new();
        for entry in tools {
            let cutter = entry.cutter.mesh(config.segments).map_err(|e| {
                StockError::InvalidCutter(format!("tool {}: {e}", entry.id))
            })?;
            if table.insert(entry.id, cutter).is_some() {
                return Err(StockError::InvalidCutter(format!(
                    "tool {} is listed twice",
                    entry.id
                )));
            }
        }
        Ok(Self {
            initial_volume: mesh.volume(),
            config,
            mesh,
            tools: table,
            default_tool,
        })
    }

    /// Current stock mesh.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Settings in use.
    pub fn config(&self) -> &StockConfig {
        &self.config
    }

    /// Current volume.
    pub fn volume(&self) -> f64 {
        self.mesh.volume()
    }

    fn cutter(&self, tool: Option<u32>) -> &Mesh {
        tool.and_then(|id| self.tools.get(&id))
            .unwrap_or(&self.default_tool)
    }

    /// Subtract the cutter solid at every point of `path`.
    ///
    /// `changes` holds `(path_index, tool)` pairs in path order: `tool` cuts
    /// every point after `path_index`. Points closer than `subtract_spacing`
    /// to the previous placement are skipped, except the last point and the
    /// first point after a tool change.
    pub fn machine_path(&mut self, path: &[Point3], changes: &[(usize, u32)]) -> Result<CarveStats> {
        let mut stats = CarveStats::default();
        let mut changes = changes.iter().peekable();
        let mut tool = None;
        let mut last: Option<Point3> = None;

        for (i, point) in path.iter().enumerate() {
            let mut swapped = false;
            while let Some(&&(index, id)) = changes.peek() {
                if index >= i {
                    break;
                }
                tool = Some(id);
                swapped = true;
                changes.next();
            }

            let is_last = i + 1 == path.len();
            if let Some(prev) = last {
                if !swapped && !is_last && (point - prev).norm() < self.config.subtract_spacing {
                    stats.skipped += 1;
                    continue;
                }
            }
            last = Some(*point);

            let solid = self.cutter(tool).translated(&point.coords);
            if !solid.bounds().overlaps(self.mesh.bounds()) {
                stats.air += 1;
                continue;
            }
            self.mesh = self.mesh.subtract(&solid);
            stats.cuts += 1;
            if stats.cuts % 100 == 0 {
                debug!(
                    "carved {} cuts, stock has {} triangles",
                    stats.cuts,
                    self.mesh.len()
                );
            }
        }

        if self.mesh.is_empty() {
            return Err(StockError::GeometryDegeneracy(
                "stock was carved away completely".into(),
            ));
        }
        info!(
            "carving done: {} cuts, {} in air, {} skipped",
            stats.cuts, stats.air, stats.skipped
        );
        Ok(stats)
    }

    /// Classify the stock on the configured grid over the original block.
    pub fn voxelize(&self) -> Result<VoxelGrid> {
        let [x0, y0, z0] = self.config.min;
        let [x1, y1, z1] = self.config.max;
        let bounds = Aabb::new(Point3::new(x0, y0, z0), Point3::new(x1, y1, z1));
        VoxelGrid::with_bounds(&self.mesh, bounds, self.config.voxel_resolution)
    }

    /// Volumes and, if the mesh is non-empty, voxel counts.
    pub fn report(&self) -> Result<StockReport> {
        let volume = self.volume();
        let voxels = if self.mesh.is_empty() {
            None
        } else {
            Some(self.voxelize()?.counts())
        };
        Ok(StockReport {
            triangles: self.mesh.len(),
            initial_volume: self.initial_volume,
            volume,
            removed_volume: self.initial_volume - volume,
            voxels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn block_config() -> StockConfig {
        StockConfig {
            min: [0.0, 0.0, 0.0],
            max: [10.0, 10.0, 10.0],
            subtract_spacing: 0.0,
            voxel_resolution: 4,
            default_tool: Cutter::FlatEndMill {
                diameter: 3.0,
                flute_length: 10.0,
            },
            ..Default::default()
        }
    }

    fn prism_area(r: f64) -> f64 {
        0.5 * 16.0 * r * r * (std::f64::consts::TAU / 16.0).sin()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(StockConfig::default().validate().is_ok());
        let stock = Stock::new(StockConfig::default(), &[]).unwrap();
        assert_abs_diff_eq!(stock.volume(), 100.0 * 100.0 * 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_config() {
        let flat = StockConfig {
            max: [10.0, 10.0, 0.0],
            ..block_config()
        };
        assert!(matches!(
            Stock::new(flat, &[]),
            Err(StockError::InvalidBounds(_))
        ));
        let spacing = StockConfig {
            subtract_spacing: -1.0,
            ..block_config()
        };
        assert!(spacing.validate().is_err());
        let duplicate = [
            ToolEntry {
                id: 1,
                cutter: Cutter::default(),
            },
            ToolEntry {
                id: 1,
                cutter: Cutter::default(),
            },
        ];
        assert!(matches!(
            Stock::new(block_config(), &duplicate),
            Err(StockError::InvalidCutter(_))
        ));
    }

    #[test]
    fn test_plunge_removes_prism() {
        let mut stock = Stock::new(block_config(), &[]).unwrap();
        let path: Vec<Point3> = [9.0, 8.0, 7.0, 6.0]
            .iter()
            .map(|&z| Point3::new(5.0, 2.0, z))
            .collect();
        let stats = stock.machine_path(&path, &[]).unwrap();
        assert_eq!(stats.cuts, 4);
        assert_abs_diff_eq!(stock.volume(), 1000.0 - 4.0 * prism_area(1.5), epsilon = 1e-6);
        let report = stock.report().unwrap();
        assert_abs_diff_eq!(report.removed_volume, 4.0 * prism_area(1.5), epsilon = 1e-6);
        assert_eq!(report.voxels.map(|v| v.inside + v.outside + v.boundary), Some(64));
    }

    #[test]
    fn test_points_in_air_do_not_cut() {
        let mut stock = Stock::new(block_config(), &[]).unwrap();
        let path = [Point3::new(5.0, 5.0, 20.0), Point3::new(50.0, 5.0, 5.0)];
        let stats = stock.machine_path(&path, &[]).unwrap();
        assert_eq!(stats.air, 2);
        assert_eq!(stats.cuts, 0);
        assert_eq!(stock.mesh().len(), 12);
    }

    #[test]
    fn test_spacing_skips_close_points() {
        let config = StockConfig {
            subtract_spacing: 1.0,
            ..block_config()
        };
        let mut stock = Stock::new(config, &[]).unwrap();
        let path: Vec<Point3> = (0..=10)
            .map(|k| Point3::new(2.0 + 0.25 * k as f64, 5.0, 9.0))
            .collect();
        let stats = stock.machine_path(&path, &[]).unwrap();
        // 2.0, 3.0, 4.0 and the final 4.5.
        assert_eq!(stats.cuts, 4);
        assert_eq!(stats.skipped, 7);
    }

    #[test]
    fn test_tool_change_switches_cutter() {
        let tools = [ToolEntry {
            id: 2,
            cutter: Cutter::FlatEndMill {
                diameter: 1.0,
                flute_length: 10.0,
            },
        }];
        let mut stock = Stock::new(block_config(), &tools).unwrap();
        let path = [Point3::new(3.0, 3.0, 9.0), Point3::new(7.0, 7.0, 9.0)];
        stock.machine_path(&path, &[(0, 2)]).unwrap();
        let removed = 1000.0 - stock.volume();
        assert_abs_diff_eq!(removed, prism_area(1.5) + prism_area(0.5), epsilon = 1e-6);
    }

    #[test]
    fn test_unknown_tool_uses_default() {
        let mut stock = Stock::new(block_config(), &[]).unwrap();
        stock.machine_path(&[Point3::new(5.0, 5.0, 9.0)], &[]).unwrap();
        let with_default = stock.volume();
        let mut other = Stock::new(block_config(), &[]).unwrap();
        other
            .machine_path(&[Point3::new(0.0, 0.0, 0.0), Point3::new(5.0, 5.0, 9.0)], &[(0, 42)])
            .unwrap();
        let corner = prism_area(1.5) * 10.0 / 4.0;
        assert_abs_diff_eq!(other.volume(), with_default - corner, epsilon = 1e-6);
    }

    #[test]
    fn test_tool_table_from_toml() {
        #[derive(Deserialize)]
        struct Tables {
            tools: Vec<ToolEntry>,
        }
        let text = r#"
[[tools]]
id = 1
type = "FlatEndMill"
diameter = 6.0
flute_length = 20.0

[[tools]]
id = 7
type = "Drill"
diameter = 3.0
point_angle = 118.0
flute_length = 15.0
"#;
        let tables: Tables = toml::from_str(text).unwrap();
        assert_eq!(tables.tools.len(), 2);
        assert_eq!(tables.tools[1].id, 7);
        assert!(matches!(tables.tools[1].cutter, Cutter::Drill { .. }));
        assert!(Stock::new(block_config(), &tables.tools).is_ok());
    }
}
