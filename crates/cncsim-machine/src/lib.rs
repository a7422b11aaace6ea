#![warn(missing_docs)]

//! Machine state and motion simulation for cncsim.
//!
//! A [`Simulator`] walks a parsed [`Program`](cncsim_gcode::Program) one
//! command at a time, updating the modal state of a [`Machine`] and
//! recording every sampled head position. Straight moves advance by a fixed
//! translation per time slice; arcs are sampled at an angular step chosen so
//! the chord never strays further than the configured tolerance from the
//! true circle.
//!
//! # Example
//!
//! ```
//! use cncsim_gcode::{parse_program, ParseOptions};
//! use cncsim_machine::{SimConfig, Simulator};
//!
//! let program = parse_program("G90\nG1 X10 Y0 F100\n", &ParseOptions::default()).unwrap();
//! let mut sim = Simulator::new(SimConfig::default()).unwrap();
//! let report = sim.run(&program).unwrap();
//! assert_eq!(report.final_position, [10.0, 0.0, 0.0]);
//! ```

mod arc;
mod config;
mod error;
mod head;
mod linear;
mod machine;
mod runner;

pub use arc::{angular_step, arc_move, ArcDirection, ArcGeometry, MAX_STEP_ITERATIONS};
pub use config::{SimConfig, DEFAULT_RAPID_FEED_RATE};
pub use error::{Result, SimError};
pub use head::ToolHead;
pub use linear::linear_move;
pub use machine::{Machine, Simple3Axis, SpindleDirection};
pub use runner::{Flow, SimReport, Simulator, ToolChange};
