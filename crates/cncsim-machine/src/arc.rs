//! Circular moves in the active plane.
//!
//! Angles are measured clockwise, viewed from the positive end of the axis
//! normal to the plane, so a clockwise arc walks with increasing angle and a
//! counterclockwise arc with decreasing angle.
//!
//! | Plane | First axis | Second axis | Constant |
//! |-------|------------|-------------|----------|
//! | XY    | X          | Y           | Z        |
//! | XZ    | Z          | X           | Y        |
//! | YZ    | Y          | Z           | X        |

use std::f64::consts::TAU;

use cncsim_gcode::Plane;
use cncsim_math::{Point3, Tolerance};
use log::warn;

use crate::error::{Result, SimError};
use crate::head::ToolHead;

/// Bisection limit for [`angular_step`].
pub const MAX_STEP_ITERATIONS: usize = 1000;

/// Travel direction around the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    /// G2.
    Clockwise,
    /// G3.
    CounterClockwise,
}

impl ArcDirection {
    /// Angle sign: +1 clockwise, -1 counterclockwise.
    pub fn sign(self) -> f64 {
        match self {
            ArcDirection::Clockwise => 1.0,
            ArcDirection::CounterClockwise => -1.0,
        }
    }
}

/// Indices of the (first, second, constant) axes of a plane.
fn plane_axes(plane: Plane) -> (usize, usize, usize) {
    match plane {
        Plane::Xy => (0, 1, 2),
        Plane::Xz => (2, 0, 1),
        Plane::Yz => (1, 2, 0),
    }
}

/// A resolved arc: center, radius and swept angle in the active plane.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcGeometry {
    /// Arc plane.
    pub plane: Plane,
    /// Travel direction.
    pub direction: ArcDirection,
    /// Center, on the start point's constant-axis level.
    pub center: Point3,
    /// Radius (distance from start to center).
    pub radius: f64,
    /// Clockwise angle of the start point.
    pub start_angle: f64,
    /// Unsigned swept angle in `(0, 2π]`.
    pub sweep: f64,
    /// End point, on the start point's constant-axis level.
    pub end: Point3,
}

impl ArcGeometry {
    /// Arc from a center point (I/J/K form). The constant-axis coordinates
    /// of `end` and `center` are replaced by the start's. Coincident start
    /// and end give a full circle.
    pub fn from_center(
        start: Point3,
        end: Point3,
        center: Point3,
        plane: Plane,
        direction: ArcDirection,
        tol: &Tolerance,
    ) -> Result<Self> {
        let (u, v, w) = plane_axes(plane);
        let mut end = end;
        let mut center = center;
        end[w] = start[w];
        center[w] = start[w];

        let radius = (start - center).norm();
        if tol.is_zero(radius) {
            return Err(SimError::degenerate(format!(
                "arc start {start:?} coincides with its center"
            )));
        }
        let end_radius = (end - center).norm();
        if (end_radius - radius).abs() > radius * 1e-3 + tol.linear {
            warn!("arc end radius {end_radius} differs from start radius {radius}");
        }

        let angle_of = |p: &Point3| (-(p[v] - center[v])).atan2(p[u] - center[u]);
        let start_angle = angle_of(&start);
        let end_angle = angle_of(&end);
        let raw = match direction {
            ArcDirection::Clockwise => end_angle - start_angle,
            ArcDirection::CounterClockwise => start_angle - end_angle,
        };
        let mut sweep = raw.rem_euclid(TAU);
        if sweep <= tol.angular || tol.points_equal(&start, &end) {
            sweep = TAU;
        }

        Ok(Self {
            plane,
            direction,
            center,
            radius,
            start_angle,
            sweep,
            end,
        })
    }

    /// Arc from a signed radius (R form). A positive radius takes the short
    /// way round (at most half a turn), a negative one the long way.
    pub fn from_radius(
        start: Point3,
        end: Point3,
        radius: f64,
        plane: Plane,
        direction: ArcDirection,
        tol: &Tolerance,
    ) -> Result<Self> {
        let (u, v, w) = plane_axes(plane);
        if tol.is_zero(radius) {
            return Err(SimError::degenerate("arc radius is zero"));
        }
        let (du, dv) = (end[u] - start[u], end[v] - start[v]);
        let chord = du.hypot(dv);
        if tol.is_zero(chord) {
            return Err(SimError::degenerate(
                "radius-form arc with coincident start and end",
            ));
        }
        let half = chord / 2.0;
        let r = radius.abs();
        if r < half - tol.linear {
            return Err(SimError::degenerate(format!(
                "arc radius {r} is shorter than half the chord {half}"
            )));
        }
        let h = (r * r - half * half).max(0.0).sqrt();

        // Unit normal to the left of the chord, in plane coordinates.
        let (nu, nv) = (-dv / chord, du / chord);
        // Short clockwise arcs have their center to the right of travel.
        let mut side = match direction {
            ArcDirection::Clockwise => -1.0,
            ArcDirection::CounterClockwise => 1.0,
        };
        if radius < 0.0 {
            side = -side;
        }
        let mut center = start;
        center[u] = start[u] + du / 2.0 + side * h * nu;
        center[v] = start[v] + dv / 2.0 + side * h * nv;
        center[w] = start[w];

        Self::from_center(start, end, center, plane, direction, tol)
    }

    /// Point at a clockwise angle, on the constant-axis level.
    pub fn point_at(&self, angle: f64) -> Point3 {
        let (u, v, _) = plane_axes(self.plane);
        let mut p = self.center;
        p[u] = self.center[u] + self.radius * angle.cos();
        p[v] = self.center[v] - self.radius * angle.sin();
        p
    }

    /// Arc length.
    pub fn length(&self) -> f64 {
        self.radius * self.sweep
    }
}

/// Largest angular step, found by halving from `sweep`, whose chord stays
/// within `tolerance` of the arc.
///
/// Fails if the step does not converge within [`MAX_STEP_ITERATIONS`].
pub fn angular_step(radius: f64, sweep: f64, tolerance: f64) -> Result<f64> {
    if tolerance.is_nan() || tolerance <= 0.0 {
        return Err(SimError::degenerate(format!(
            "arc tolerance {tolerance} is not positive"
        )));
    }
    let mut step = sweep;
    for _ in 0..MAX_STEP_ITERATIONS {
        if chord_deviation(radius, step) <= tolerance {
            return Ok(step);
        }
        step /= 2.0;
    }
    Err(SimError::degenerate(format!(
        "arc step did not converge for radius {radius}, sweep {sweep}, tolerance {tolerance}"
    )))
}

/// Distance from the arc midpoint to the chord spanning `step`
/// (the sagitta, or twice the radius for a full turn).
fn chord_deviation(radius: f64, step: f64) -> f64 {
    let s = (step / 4.0).sin();
    2.0 * radius * s * s
}

/// Walk an arc, recording a point each time the distance covered since the
/// last recorded point exceeds `dist_per_slice`. The exact end point is
/// always recorded last.
///
/// Returns the number of points appended to the path.
pub fn arc_move(
    head: &mut ToolHead,
    arc: &ArcGeometry,
    dist_per_slice: f64,
    tolerance: f64,
) -> Result<usize> {
    let step = angular_step(arc.radius, arc.sweep, tolerance)?;
    let n = ((arc.sweep / step).ceil() as usize).max(1);
    let increment = arc.direction.sign() * arc.sweep / n as f64;

    let before = head.point_count();
    let mut last = head.position();
    let mut travelled = 0.0;
    for k in 1..n {
        let p = arc.point_at(arc.start_angle + increment * k as f64);
        travelled += (p - last).norm();
        last = p;
        if travelled > dist_per_slice {
            head.move_to(p);
            travelled = 0.0;
        }
    }
    head.move_to(arc.end);
    Ok(head.point_count() - before)
}
