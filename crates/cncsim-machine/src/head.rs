//! The moving tool head and its recorded path.

use cncsim_math::{Affine, Point3, Vec3};

use crate::error::{Result, SimError};

/// Tool head position, append-only path and last displacement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolHead {
    position: Point3,
    path: Vec<Point3>,
    velocity: Vec3,
}

impl ToolHead {
    /// A head at the origin with an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position.
    pub fn position(&self) -> Point3 {
        self.position
    }

    /// Every recorded position, oldest first.
    pub fn path(&self) -> &[Point3] {
        &self.path
    }

    /// Number of recorded positions.
    pub fn point_count(&self) -> usize {
        self.path.len()
    }

    /// Displacement of the most recent step.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Move to `p`, recording it.
    pub fn move_to(&mut self, p: Point3) {
        self.velocity = p - self.position;
        self.position = p;
        self.path.push(p);
    }

    /// Apply a transform to the current position and move there.
    pub fn move_by(&mut self, transform: &Affine) -> Result<()> {
        let p = transform.apply_point(&self.position).ok_or_else(|| {
            SimError::degenerate(format!(
                "transform maps {:?} to infinity",
                self.position
            ))
        })?;
        self.move_to(p);
        Ok(())
    }

    /// Return to `zero`. The move is recorded; earlier points are kept.
    pub fn reset(&mut self, zero: Point3) {
        self.move_to(zero);
        self.velocity = Vec3::zeros();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;

    #[test]
    fn test_move_records_path_and_velocity() {
        let mut head = ToolHead::new();
        head.move_to(Point3::new(1.0, 2.0, 0.0));
        head.move_to(Point3::new(1.5, 2.0, -1.0));
        assert_eq!(head.point_count(), 2);
        assert_eq!(head.velocity(), Vec3::new(0.5, 0.0, -1.0));
        assert_eq!(head.position(), Point3::new(1.5, 2.0, -1.0));
    }

    #[test]
    fn test_move_by_translation() {
        let mut head = ToolHead::new();
        head.move_by(&Affine::translation(1.0, 0.0, 2.0)).unwrap();
        head.move_by(&Affine::translation(1.0, 0.0, 2.0)).unwrap();
        assert_eq!(head.position(), Point3::new(2.0, 0.0, 4.0));
    }

    #[test]
    fn test_move_by_rejects_zero_w() {
        let mut m = Matrix4::identity();
        m[(3, 3)] = 0.0;
        let mut head = ToolHead::new();
        assert!(head.move_by(&Affine::from_matrix(m)).is_err());
        assert_eq!(head.point_count(), 0);
    }

    #[test]
    fn test_reset_keeps_history() {
        let mut head = ToolHead::new();
        head.move_to(Point3::new(3.0, 3.0, 3.0));
        head.reset(Point3::origin());
        assert_eq!(head.point_count(), 2);
        assert_eq!(head.position(), Point3::origin());
        assert_eq!(head.velocity(), Vec3::zeros());
    }
}
