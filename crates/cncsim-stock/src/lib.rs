#![warn(missing_docs)]

//! Stock material model for cncsim.
//!
//! The workpiece is a closed triangle mesh. Each sampled tool position
//! places a faceted [`Cutter`] solid there and subtracts it with a BSP
//! boolean, restricted to the stock triangles near the cutter. A
//! [`VoxelGrid`] classifies the result into inside, outside and boundary
//! cells using a separating-axis triangle/box test.
//!
//! # Example
//!
//! ```
//! use cncsim_math::Point3;
//! use cncsim_stock::{Cutter, Stock, StockConfig};
//!
//! let config = StockConfig {
//!     min: [0.0, 0.0, 0.0],
//!     max: [10.0, 10.0, 10.0],
//!     default_tool: Cutter::FlatEndMill { diameter: 2.0, flute_length: 5.0 },
//!     ..Default::default()
//! };
//! let mut stock = Stock::new(config, &[]).unwrap();
//! stock.machine_path(&[Point3::new(5.0, 5.0, 9.0)], &[]).unwrap();
//! assert!(stock.volume() < 1000.0);
//! ```

mod aabb;
mod csg;
mod cutter;
mod error;
mod mesh;
mod stock;
mod tribox;
mod voxel;

pub use aabb::Aabb;
pub use csg::{subtract, EPSILON};
pub use cutter::{Cutter, DEFAULT_SEGMENTS};
pub use error::{Result, StockError};
pub use mesh::{Mesh, Triangle};
pub use stock::{CarveStats, Stock, StockConfig, StockReport, ToolEntry};
pub use tribox::tri_box_overlap;
pub use voxel::{Cell, VoxelCounts, VoxelGrid};
