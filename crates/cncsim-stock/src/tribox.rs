//! Triangle / axis-aligned box overlap test.
//!
//! Separating-axis test over 13 axes: the three box face normals, the nine
//! cross products of box axes with triangle edges, and the triangle plane.
//! Touching counts as overlap.

use cncsim_math::{Point3, Vec3};

/// Projection interval of the triangle does not reach `[-r, r]`.
#[inline]
fn separated(p: [f64; 3], r: f64) -> bool {
    let min = p[0].min(p[1]).min(p[2]);
    let max = p[0].max(p[1]).max(p[2]);
    min > r || max < -r
}

/// Test whether a triangle overlaps the box with the given center and half
/// extents.
///
/// Degenerate triangles are handled: a triangle collapsed to a point
/// overlaps exactly when that point lies in the box.
pub fn tri_box_overlap(center: &Point3, half: &Vec3, tri: &[Point3; 3]) -> bool {
    let v = [tri[0] - center, tri[1] - center, tri[2] - center];

    // Box face normals.
    for axis in 0..3 {
        if separated([v[0][axis], v[1][axis], v[2][axis]], half[axis]) {
            return false;
        }
    }

    // Box axis x triangle edge.
    let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];
    for edge in &edges {
        for unit in [Vec3::x(), Vec3::y(), Vec3::z()] {
            let a = unit.cross(edge);
            let p = [a.dot(&v[0]), a.dot(&v[1]), a.dot(&v[2])];
            let r = half.x * a.x.abs() + half.y * a.y.abs() + half.z * a.z.abs();
            if separated(p, r) {
                return false;
            }
        }
    }

    plane_box_overlap(&edges[0].cross(&edges[1]), &v[0], half)
}

/// Plane through `vert` with normal `normal` against a box centered on the
/// origin.
fn plane_box_overlap(normal: &Vec3, vert: &Vec3, half: &Vec3) -> bool {
    let mut vmin = Vec3::zeros();
    let mut vmax = Vec3::zeros();
    for q in 0..3 {
        if normal[q] > 0.0 {
            vmin[q] = -half[q] - vert[q];
            vmax[q] = half[q] - vert[q];
        } else {
            vmin[q] = half[q] - vert[q];
            vmax[q] = -half[q] - vert[q];
        }
    }
    if normal.dot(&vmin) > 0.0 {
        return false;
    }
    normal.dot(&vmax) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(tri: [[f64; 3]; 3]) -> bool {
        let tri = tri.map(|p| Point3::new(p[0], p[1], p[2]));
        tri_box_overlap(&Point3::origin(), &Vec3::new(1.0, 1.0, 1.0), &tri)
    }

    #[test]
    fn test_crossing_triangle() {
        assert!(check([[0.5, 0.5, 0.5], [-0.5, -0.5, 0.5], [0.5, -0.5, -0.5]]));
        assert!(check([[1.5, 0.5, 0.5], [0.5, -0.5, -0.5], [-0.5, 0.5, -0.5]]));
    }

    #[test]
    fn test_triangle_inside() {
        assert!(check([[0.1, 0.1, 0.1], [-0.1, -0.1, 0.1], [0.1, -0.1, -0.1]]));
    }

    #[test]
    fn test_triangle_outside() {
        assert!(!check([[2.0, 2.0, 2.0], [2.5, 2.5, 2.0], [2.0, 2.5, 2.5]]));
    }

    #[test]
    fn test_touching_counts() {
        // Lying on a face.
        assert!(check([[-1.0, 0.5, 0.5], [-1.0, -0.5, -0.5], [-1.0, 0.5, -0.5]]));
        assert!(check([[1.0, 0.5, 0.5], [1.0, -0.5, -0.5], [1.0, 0.5, -0.5]]));
        // One vertex inside, the rest far away.
        assert!(check([[0.5, 0.5, 0.5], [2.0, 2.0, 2.0], [2.5, 2.5, 2.5]]));
    }

    #[test]
    fn test_degenerate_point() {
        assert!(check([[0.5; 3]; 3]));
        assert!(!check([[1.1; 3]; 3]));
    }

    #[test]
    fn test_triangle_larger_than_box() {
        assert!(check([[-2.0, -2.0, 0.0], [2.0, -2.0, 0.0], [0.0, 2.0, 0.0]]));
        assert!(check([[-5.0, -5.0, -5.0], [5.0, 0.0, 0.0], [0.0, 5.0, 0.0]]));
    }

    #[test]
    fn test_separated_by_edge_axis_only() {
        // Passes the face and plane tests; only an edge cross axis separates.
        let tri = [[3.0, 1.5, 0.0], [0.0, 3.0, -0.5], [2.0, -0.5, 0.0]];
        assert!(!check(tri));
    }

    #[test]
    fn test_separated_by_plane() {
        assert!(!check([[3.0, -3.0, 1.5], [-3.0, 3.0, 1.5], [0.0, 0.0, 1.5]]));
    }

    #[test]
    fn test_offset_box() {
        let tri = [
            Point3::new(10.0, 10.0, 10.0),
            Point3::new(11.0, 10.0, 10.0),
            Point3::new(10.0, 11.0, 10.0),
        ];
        let half = Vec3::new(0.5, 0.5, 0.5);
        assert!(tri_box_overlap(&Point3::new(10.2, 10.2, 10.4), &half, &tri));
        assert!(!tri_box_overlap(&Point3::new(10.2, 10.2, 11.0), &half, &tri));
    }
}
