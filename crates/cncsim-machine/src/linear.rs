//! Time-sliced straight-line moves.

use cncsim_math::{Affine, Point3, Vec3};

use crate::error::Result;
use crate::head::ToolHead;

/// True while the head is more than one step away from `target` on some axis.
fn not_clipped(position: &Point3, target: &Point3, step: &Vec3) -> bool {
    (target.x - position.x).abs() > step.x.abs()
        || (target.y - position.y).abs() > step.y.abs()
        || (target.z - position.z).abs() > step.z.abs()
}

/// Move the head in a straight line to `target` at `rate` mm/s.
///
/// The head advances by one fixed translation per time slice and then snaps
/// onto `target`, so it always finishes exactly there. A zero-length move
/// records nothing. `rate` and `time_slice` must be positive.
///
/// Returns the number of points appended to the path.
pub fn linear_move(head: &mut ToolHead, target: Point3, rate: f64, time_slice: f64) -> Result<usize> {
    let start = head.position();
    let diff = target - start;
    let dist = diff.norm();
    if dist == 0.0 {
        return Ok(0);
    }

    let steps = dist / (rate * time_slice);
    let step = diff / steps;
    let translate = Affine::translation_vec(&step);

    // Bounded in case the step is lost to rounding at large coordinates.
    let max_steps = steps.ceil() as usize + 1;
    let before = head.point_count();
    for _ in 0..max_steps {
        if !not_clipped(&head.position(), &target, &step) {
            break;
        }
        head.move_by(&translate)?;
    }
    head.move_to(target);
    Ok(head.point_count() - before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_arrives_exactly() {
        for (rate, slice) in [(1.0, 0.01), (100.0 / 60.0, 0.001), (7.3, 0.37), (1e6, 1.0)] {
            let mut head = ToolHead::new();
            let target = Point3::new(10.0, 1.0 / 3.0, -2.7);
            linear_move(&mut head, target, rate, slice).unwrap();
            assert_eq!(head.position(), target);
        }
    }

    #[test]
    fn test_step_count_follows_rate() {
        let mut head = ToolHead::new();
        // 10 mm at 10 mm/s with 0.1 s slices: nine steps of 1 mm, then the snap.
        let added = linear_move(&mut head, Point3::new(10.0, 0.0, 0.0), 10.0, 0.1).unwrap();
        assert_eq!(added, 10);
        assert_abs_diff_eq!(head.path()[0].x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(head.path()[4].x, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_short_move_snaps() {
        let mut head = ToolHead::new();
        let added = linear_move(&mut head, Point3::new(0.001, 0.0, 0.0), 100.0, 1.0).unwrap();
        assert_eq!(added, 1);
        assert_eq!(head.position(), Point3::new(0.001, 0.0, 0.0));
    }

    #[test]
    fn test_zero_distance_is_noop() {
        let mut head = ToolHead::new();
        head.move_to(Point3::new(1.0, 1.0, 1.0));
        let added = linear_move(&mut head, Point3::new(1.0, 1.0, 1.0), 5.0, 0.1).unwrap();
        assert_eq!(added, 0);
        assert_eq!(head.point_count(), 1);
    }

    #[test]
    fn test_distance_is_relative_to_start() {
        // Far from the origin, the step count depends only on the move length.
        let mut head = ToolHead::new();
        head.move_to(Point3::new(1000.0, 1000.0, 0.0));
        let added = linear_move(&mut head, Point3::new(1001.0, 1000.0, 0.0), 1.0, 0.5).unwrap();
        assert_eq!(added, 2);
    }
}
