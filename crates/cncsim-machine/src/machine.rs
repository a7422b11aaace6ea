//! Machine modal state.
//!
//! [`Machine`] is the contract the dispatch loop and the motion engine rely
//! on; [`Simple3Axis`] is the Cartesian three-axis mill. Other kinematic
//! models can implement the same trait.

use cncsim_gcode::{FeedMode, Plane, Units};
use cncsim_math::Point3;
use serde::{Deserialize, Serialize};

use crate::head::ToolHead;

/// Spindle rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpindleDirection {
    /// Not turning.
    #[default]
    Stopped,
    /// M3.
    Clockwise,
    /// M4.
    CounterClockwise,
}

/// Persistent modal state of a machine tool.
pub trait Machine {
    /// Programmed feed rate, in millimetres (or inverse minutes for G93).
    fn feed_rate(&self) -> f64;

    /// Set the programmed feed rate.
    fn set_feed_rate(&mut self, rate: f64);

    /// Rapid traverse rate (mm/min).
    fn rapid_feed_rate(&self) -> f64;

    /// Active feed mode.
    fn feed_mode(&self) -> FeedMode;

    /// Select a feed mode.
    fn set_feed_mode(&mut self, mode: FeedMode);

    /// Spindle speed (rev/min).
    fn spindle_speed(&self) -> i64;

    /// Set the spindle speed.
    fn set_spindle_speed(&mut self, speed: i64);

    /// Spindle rotation direction.
    fn spindle_direction(&self) -> SpindleDirection;

    /// Start or stop the spindle.
    fn set_spindle_direction(&mut self, direction: SpindleDirection);

    /// Tool chosen by the last `T` word.
    fn selected_tool(&self) -> u32;

    /// Choose the tool for the next change.
    fn select_tool(&mut self, tool: u32);

    /// Tool currently in the spindle.
    fn active_tool(&self) -> u32;

    /// Put the selected tool in the spindle.
    fn change_tool(&mut self);

    /// Active arc plane; `None` before the first reset.
    fn plane(&self) -> Option<Plane>;

    /// Select the arc plane.
    fn select_plane(&mut self, plane: Plane);

    /// Active unit system; `None` before the first reset.
    fn units(&self) -> Option<Units>;

    /// Select the unit system.
    fn set_units(&mut self, units: Units);

    /// Position the head returns to on reset.
    fn zero_point(&self) -> Point3;

    /// The tool head.
    fn head(&self) -> &ToolHead;

    /// Mutable access to the tool head.
    fn head_mut(&mut self) -> &mut ToolHead;

    /// Return to power-on state: head at zero, XY plane, spindle stopped,
    /// per-minute feed at the rapid rate, millimetre units.
    fn reset(&mut self);
}

/// A three-axis Cartesian mill.
#[derive(Debug, Clone)]
pub struct Simple3Axis {
    head: ToolHead,
    zero: Point3,
    rapid_feed_rate: f64,
    feed: f64,
    feed_mode: FeedMode,
    spindle_speed: i64,
    spindle_direction: SpindleDirection,
    selected_tool: u32,
    active_tool: u32,
    plane: Option<Plane>,
    units: Option<Units>,
}

impl Simple3Axis {
    /// Create a machine with the given rapid rate (mm/min). Call
    /// [`Machine::reset`] before use.
    pub fn new(rapid_feed_rate: f64) -> Self {
        Self {
            head: ToolHead::new(),
            zero: Point3::origin(),
            rapid_feed_rate,
            feed: 0.0,
            feed_mode: FeedMode::PerMinute,
            spindle_speed: 0,
            spindle_direction: SpindleDirection::Stopped,
            selected_tool: 0,
            active_tool: 0,
            plane: None,
            units: None,
        }
    }

    /// Move the reset position.
    pub fn with_zero_point(mut self, zero: Point3) -> Self {
        self.zero = zero;
        self
    }
}

impl Machine for Simple3Axis {
    fn feed_rate(&self) -> f64 {
        self.feed
    }

    fn set_feed_rate(&mut self, rate: f64) {
        self.feed = rate;
    }

    fn rapid_feed_rate(&self) -> f64 {
        self.rapid_feed_rate
    }

    fn feed_mode(&self) -> FeedMode {
        self.feed_mode
    }

    fn set_feed_mode(&mut self, mode: FeedMode) {
        self.feed_mode = mode;
    }

    fn spindle_speed(&self) -> i64 {
        self.spindle_speed
    }

    fn set_spindle_speed(&mut self, speed: i64) {
        self.spindle_speed = speed;
    }

    fn spindle_direction(&self) -> SpindleDirection {
        self.spindle_direction
    }

    fn set_spindle_direction(&mut self, direction: SpindleDirection) {
        self.spindle_direction = direction;
    }

    fn selected_tool(&self) -> u32 {
        self.selected_tool
    }

    fn select_tool(&mut self, tool: u32) {
        self.selected_tool = tool;
    }

    fn active_tool(&self) -> u32 {
        self.active_tool
    }

    fn change_tool(&mut self) {
        self.active_tool = self.selected_tool;
    }

    fn plane(&self) -> Option<Plane> {
        self.plane
    }

    fn select_plane(&mut self, plane: Plane) {
        self.plane = Some(plane);
    }

    fn units(&self) -> Option<Units> {
        self.units
    }

    fn set_units(&mut self, units: Units) {
        self.units = Some(units);
    }

    fn zero_point(&self) -> Point3 {
        self.zero
    }

    fn head(&self) -> &ToolHead {
        &self.head
    }

    fn head_mut(&mut self) -> &mut ToolHead {
        &mut self.head
    }

    fn reset(&mut self) {
        self.plane = Some(Plane::Xy);
        self.spindle_speed = 0;
        self.spindle_direction = SpindleDirection::Stopped;
        self.feed_mode = FeedMode::PerMinute;
        self.feed = self.rapid_feed_rate;
        self.units = Some(Units::Millimeter);
        self.head.reset(self.zero);
    }
}
