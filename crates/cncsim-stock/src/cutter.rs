//! Cutter definitions and their solids.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use cncsim_math::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StockError};
use crate::mesh::{Mesh, Triangle};

/// Default number of facets around a cutter.
pub const DEFAULT_SEGMENTS: usize = 16;

/// A rotating cutter, modelled as a solid of revolution whose tip sits at
/// the controlled point and whose body extends up along +Z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Cutter {
    /// Flat-bottomed end mill.
    FlatEndMill {
        /// Tool diameter in mm.
        diameter: f64,
        /// Flute length in mm.
        flute_length: f64,
    },
    /// Hemispherical tip.
    BallEndMill {
        /// Tool diameter in mm.
        diameter: f64,
        /// Flute length in mm, including the ball.
        flute_length: f64,
    },
    /// Conical point.
    Drill {
        /// Drill diameter in mm.
        diameter: f64,
        /// Included point angle in degrees (typically 118 or 135).
        point_angle: f64,
        /// Flute length in mm, including the point.
        flute_length: f64,
    },
}

impl Default for Cutter {
    fn default() -> Self {
        Cutter::FlatEndMill {
            diameter: 6.0,
            flute_length: 20.0,
        }
    }
}

impl Cutter {
    /// Cutting diameter.
    pub fn diameter(&self) -> f64 {
        match self {
            Cutter::FlatEndMill { diameter, .. }
            | Cutter::BallEndMill { diameter, .. }
            | Cutter::Drill { diameter, .. } => *diameter,
        }
    }

    /// Cutting radius.
    pub fn radius(&self) -> f64 {
        self.diameter() / 2.0
    }

    /// Length of the cutting body.
    pub fn flute_length(&self) -> f64 {
        match self {
            Cutter::FlatEndMill { flute_length, .. }
            | Cutter::BallEndMill { flute_length, .. }
            | Cutter::Drill { flute_length, .. } => *flute_length,
        }
    }

    /// Check dimensions.
    pub fn validate(&self) -> Result<()> {
        let d = self.diameter();
        let len = self.flute_length();
        if d <= 0.0 || !d.is_finite() {
            return Err(StockError::InvalidCutter(format!(
                "diameter must be positive, got {d}"
            )));
        }
        if len <= 0.0 || !len.is_finite() {
            return Err(StockError::InvalidCutter(format!(
                "flute length must be positive, got {len}"
            )));
        }
        match self {
            Cutter::FlatEndMill { .. } => {}
            Cutter::BallEndMill { .. } => {
                if len < self.radius() {
                    return Err(StockError::InvalidCutter(format!(
                        "ball end mill flute length {len} is shorter than its radius"
                    )));
                }
            }
            Cutter::Drill { point_angle, .. } => {
                if *point_angle <= 0.0 || *point_angle >= 180.0 || point_angle.is_nan() {
                    return Err(StockError::InvalidCutter(format!(
                        "drill point angle must be between 0 and 180 degrees, got {point_angle}"
                    )));
                }
                if self.point_height() >= len {
                    return Err(StockError::InvalidCutter(format!(
                        "drill point is taller than flute length {len}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Height of a drill's conical point (zero for other cutters).
    fn point_height(&self) -> f64 {
        match self {
            Cutter::Drill { point_angle, .. } => {
                self.radius() / (point_angle.to_radians() / 2.0).tan()
            }
            _ => 0.0,
        }
    }

    /// Outline as `(radius, height)` pairs from tip to top, both ends on
    /// the axis.
    fn profile(&self, segments: usize) -> Vec<(f64, f64)> {
        let r = self.radius();
        let len = self.flute_length();
        let mut profile = vec![(0.0, 0.0)];
        match self {
            Cutter::FlatEndMill { .. } => profile.push((r, 0.0)),
            Cutter::BallEndMill { .. } => {
                let rings = (segments / 4).max(2);
                for k in 1..=rings {
                    let phi = PI - FRAC_PI_2 * k as f64 / rings as f64;
                    profile.push((r * phi.sin(), r + r * phi.cos()));
                }
            }
            Cutter::Drill { .. } => profile.push((r, self.point_height())),
        }
        if profile.last().is_some_and(|&(_, z)| z < len) {
            profile.push((r, len));
        }
        profile.push((0.0, len));
        profile
    }

    /// Closed solid with the tip at the origin, `segments` facets around.
    pub fn mesh(&self, segments: usize) -> Result<Mesh> {
        self.validate()?;
        if segments < 3 {
            return Err(StockError::InvalidCutter(format!(
                "need at least 3 segments, got {segments}"
            )));
        }
        let ring = |rho: f64, z: f64, i: usize| {
            let theta = TAU * (i % segments) as f64 / segments as f64;
            Point3::new(rho * theta.cos(), rho * theta.sin(), z)
        };

        let mut mesh = Mesh::new();
        let profile = self.profile(segments);
        for pair in profile.windows(2) {
            let ((r0, z0), (r1, z1)) = (pair[0], pair[1]);
            for i in 0..segments {
                let p00 = ring(r0, z0, i);
                let p01 = ring(r0, z0, i + 1);
                let p10 = ring(r1, z1, i);
                let p11 = ring(r1, z1, i + 1);
                if r0 != 0.0 {
                    mesh.add_triangle(Triangle::new(p00, p01, p11));
                }
                if r1 != 0.0 {
                    mesh.add_triangle(Triangle::new(p00, p11, p10));
                }
            }
        }
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cncsim_math::Vec3;

    #[test]
    fn test_flat_end_mill_volume() {
        let tool = Cutter::FlatEndMill {
            diameter: 3.0,
            flute_length: 10.0,
        };
        let mesh = tool.mesh(16).unwrap();
        assert_eq!(mesh.len(), 64);
        // Regular 16-gon prism.
        let expected = 0.5 * 16.0 * 2.25 * (TAU / 16.0).sin() * 10.0;
        assert_relative_eq!(mesh.volume(), expected, epsilon = 1e-9);
        assert_eq!(mesh.bounds().min.z, 0.0);
        assert_eq!(mesh.bounds().max.z, 10.0);
    }

    #[test]
    fn test_ball_end_mill_approaches_analytic_volume() {
        let tool = Cutter::BallEndMill {
            diameter: 6.0,
            flute_length: 20.0,
        };
        let mesh = tool.mesh(64).unwrap();
        let exact = PI * 9.0 * 17.0 + 2.0 / 3.0 * PI * 27.0;
        let v = mesh.volume();
        assert!(v < exact && v > 0.99 * exact, "volume {v}");
        assert_relative_eq!(mesh.bounds().min.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ball_only() {
        let tool = Cutter::BallEndMill {
            diameter: 6.0,
            flute_length: 3.0,
        };
        let v = tool.mesh(16).unwrap().volume();
        assert!(v > 0.9 * 2.0 / 3.0 * PI * 27.0 && v < 2.0 / 3.0 * PI * 27.0);
    }

    #[test]
    fn test_drill_volume() {
        let tool = Cutter::Drill {
            diameter: 6.0,
            point_angle: 90.0,
            flute_length: 20.0,
        };
        // Cylinder of 17 plus a cone of 3.
        let exact = PI * 9.0 * 17.0 + PI * 9.0 * 3.0 / 3.0;
        let v = tool.mesh(32).unwrap().volume();
        assert!(v < exact && v > 0.99 * exact, "volume {v}");
    }

    #[test]
    fn test_translated_mesh_places_tip() {
        let tool = Cutter::default();
        let mesh = tool.mesh(8).unwrap().translated(&Vec3::new(5.0, -2.0, 1.0));
        assert_relative_eq!(mesh.bounds().min.z, 1.0);
        assert_relative_eq!(mesh.bounds().max.z, 21.0);
        assert_relative_eq!(mesh.bounds().max.x, 8.0);
    }

    #[test]
    fn test_invalid_cutters() {
        let bad = [
            Cutter::FlatEndMill {
                diameter: 0.0,
                flute_length: 10.0,
            },
            Cutter::FlatEndMill {
                diameter: 3.0,
                flute_length: f64::NAN,
            },
            Cutter::BallEndMill {
                diameter: 10.0,
                flute_length: 4.0,
            },
            Cutter::Drill {
                diameter: 6.0,
                point_angle: 180.0,
                flute_length: 20.0,
            },
            Cutter::Drill {
                diameter: 6.0,
                point_angle: 10.0,
                flute_length: 20.0,
            },
        ];
        for tool in bad {
            assert!(matches!(tool.validate(), Err(StockError::InvalidCutter(_))), "{tool:?}");
            assert!(tool.mesh(16).is_err());
        }
        assert!(Cutter::default().mesh(2).is_err());
    }

    #[test]
    fn test_tagged_toml() {
        let tool: Cutter =
            toml::from_str("type = \"BallEndMill\"\ndiameter = 4.0\nflute_length = 12.0\n").unwrap();
        assert_eq!(
            tool,
            Cutter::BallEndMill {
                diameter: 4.0,
                flute_length: 12.0
            }
        );
        assert_eq!(tool.radius(), 2.0);
    }
}
