//! Triangle soup meshes.
//!
//! Triangles are wound counter-clockwise seen from outside, so the right-hand
//! normal points out of the solid and the signed volume is positive.

use cncsim_math::{Point3, Vec3};

use crate::aabb::Aabb;
use crate::error::{Result, StockError};

/// Minimum `|a|` in the ray/triangle test before the ray counts as parallel.
const PARALLEL_EPSILON: f64 = 1e-12;
/// Hits closer than this to the ray origin are ignored.
const HIT_EPSILON: f64 = 1e-10;
/// Tilted ray direction for inside tests, off the axes to miss edges.
const RAY_DIR: [f64; 3] = [1.0, 1e-7, 1.3e-7];

/// A single triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Corners in counter-clockwise order seen from outside.
    pub vertices: [Point3; 3],
}

impl Triangle {
    /// Create a triangle from three corners.
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Unnormalized normal; its length is twice the area.
    pub fn normal(&self) -> Vec3 {
        let [a, b, c] = &self.vertices;
        (b - a).cross(&(c - a))
    }

    /// Triangle area.
    pub fn area(&self) -> f64 {
        self.normal().norm() / 2.0
    }

    /// Same triangle with opposite winding.
    pub fn flipped(&self) -> Self {
        let [a, b, c] = self.vertices;
        Self::new(a, c, b)
    }

    /// Bounding box of the corners.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Signed volume of the tetrahedron spanned with the origin.
    fn signed_volume(&self) -> f64 {
        let [a, b, c] = &self.vertices;
        a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
    }

    /// Möller–Trumbore intersection with the ray `origin + t * dir`, `t > 0`.
    fn ray_hit(&self, origin: &Point3, dir: &Vec3) -> bool {
        let [v0, v1, v2] = &self.vertices;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let h = dir.cross(&edge2);
        let a = edge1.dot(&h);
        if a.abs() < PARALLEL_EPSILON {
            return false;
        }
        let f = 1.0 / a;
        let s = origin - v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }
        let q = s.cross(&edge1);
        let v = f * dir.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }
        f * edge2.dot(&q) > HIT_EPSILON
    }
}

/// A closed triangle mesh with cached bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    triangles: Vec<Triangle>,
    bounds: Aabb,
}

impl Mesh {
    /// Empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh from a list of triangles.
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let mut bounds = Aabb::empty();
        for tri in &triangles {
            for p in &tri.vertices {
                bounds.include_point(p);
            }
        }
        Self { triangles, bounds }
    }

    /// Axis-aligned box solid with twelve outward-facing triangles.
    pub fn from_box(min: Point3, max: Point3) -> Result<Self> {
        for axis in 0..3 {
            if max[axis] <= min[axis] || !min[axis].is_finite() || !max[axis].is_finite() {
                return Err(StockError::InvalidBounds(format!(
                    "min {:?} must be below max {:?} on every axis",
                    min, max
                )));
            }
        }
        let (x0, y0, z0) = (min.x, min.y, min.z);
        let (x1, y1, z1) = (max.x, max.y, max.z);
        let c = [
            Point3::new(x0, y0, z0),
            Point3::new(x1, y0, z0),
            Point3::new(x1, y1, z0),
            Point3::new(x0, y1, z0),
            Point3::new(x0, y0, z1),
            Point3::new(x1, y0, z1),
            Point3::new(x1, y1, z1),
            Point3::new(x0, y1, z1),
        ];
        const QUADS: [[usize; 4]; 6] = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [2, 3, 7, 6],
            [1, 2, 6, 5],
            [0, 4, 7, 3],
        ];
        let mut triangles = Vec::with_capacity(12);
        for [a, b, cc, d] in QUADS {
            triangles.push(Triangle::new(c[a], c[b], c[cc]));
            triangles.push(Triangle::new(c[a], c[cc], c[d]));
        }
        Ok(Self::from_triangles(triangles))
    }

    /// Append a triangle.
    pub fn add_triangle(&mut self, tri: Triangle) {
        for p in &tri.vertices {
            self.bounds.include_point(p);
        }
        self.triangles.push(tri);
    }

    /// All triangles.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Bounding box (empty for an empty mesh).
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// True if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Copy moved by `offset`.
    pub fn translated(&self, offset: &Vec3) -> Mesh {
        let triangles = self
            .triangles
            .iter()
            .map(|t| Triangle {
                vertices: t.vertices.map(|p| p + offset),
            })
            .collect();
        Mesh {
            triangles,
            bounds: Aabb::new(self.bounds.min + offset, self.bounds.max + offset),
        }
    }

    /// Enclosed volume by the divergence theorem.
    pub fn volume(&self) -> f64 {
        self.triangles.iter().map(Triangle::signed_volume).sum()
    }

    /// Ray-parity inside test.
    ///
    /// Casts a slightly tilted ray and counts crossings: odd means inside.
    /// Points exactly on the surface may go either way.
    pub fn contains_point(&self, point: &Point3) -> bool {
        if !self.bounds.contains(point) {
            return false;
        }
        let dir = Vec3::new(RAY_DIR[0], RAY_DIR[1], RAY_DIR[2]);
        let crossings = self
            .triangles
            .iter()
            .filter(|t| t.ray_hit(point, &dir))
            .count();
        crossings % 2 == 1
    }

    /// Remove `tool` from this solid.
    pub fn subtract(&self, tool: &Mesh) -> Mesh {
        crate::csg::subtract(self, tool)
    }
}
