//! Solid subtraction with BSP trees.
//!
//! Classic polygon BSP clipping: each solid becomes a tree of splitting
//! planes, and polygons of one tree are clipped against the other. Only the
//! stock triangles near the tool take part, so the cost of a cut stays
//! proportional to the tool, not to the whole stock.

use cncsim_math::{Point3, Vec3};
use log::trace;

use crate::mesh::{Mesh, Triangle};
use crate::tribox::tri_box_overlap;

/// Plane thickness for front/back classification.
pub const EPSILON: f64 = 1e-5;

/// Triangles smaller than this are dropped after triangulation.
const MIN_AREA: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vec3,
    w: f64,
}

/// Where a polygon ended up relative to a plane.
enum Split {
    CoplanarFront(Polygon),
    CoplanarBack(Polygon),
    Front(Polygon),
    Back(Polygon),
    Spanning {
        front: Option<Polygon>,
        back: Option<Polygon>,
    },
}

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

impl Plane {
    fn from_points(a: &Point3, b: &Point3, c: &Point3) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len < MIN_AREA {
            return None;
        }
        let normal = n / len;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    fn classify(&self, p: &Point3) -> u8 {
        let t = self.normal.dot(&p.coords) - self.w;
        if t < -EPSILON {
            BACK
        } else if t > EPSILON {
            FRONT
        } else {
            COPLANAR
        }
    }

    fn split(&self, polygon: Polygon) -> Split {
        let types: Vec<u8> = polygon.vertices.iter().map(|v| self.classify(v)).collect();
        let kind = types.iter().fold(COPLANAR, |acc, t| acc | t);
        match kind {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    Split::CoplanarFront(polygon)
                } else {
                    Split::CoplanarBack(polygon)
                }
            }
            FRONT => Split::Front(polygon),
            BACK => Split::Back(polygon),
            _ => {
                let n = polygon.vertices.len();
                let mut f = Vec::with_capacity(n + 1);
                let mut b = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (ti, tj) = (types[i], types[j]);
                    let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                    if ti != BACK {
                        f.push(vi);
                    }
                    if ti != FRONT {
                        b.push(vi);
                    }
                    if ti | tj == SPANNING {
                        let d = vj - vi;
                        let t = (self.w - self.normal.dot(&vi.coords)) / self.normal.dot(&d);
                        let v = vi + d * t;
                        f.push(v);
                        b.push(v);
                    }
                }
                let plane = polygon.plane;
                Split::Spanning {
                    front: (f.len() >= 3).then(|| Polygon { vertices: f, plane }),
                    back: (b.len() >= 3).then(|| Polygon { vertices: b, plane }),
                }
            }
        }
    }
}

/// Convex planar polygon.
#[derive(Debug, Clone)]
struct Polygon {
    vertices: Vec<Point3>,
    plane: Plane,
}

impl Polygon {
    fn from_triangle(tri: &Triangle) -> Option<Self> {
        let [a, b, c] = &tri.vertices;
        Plane::from_points(a, b, c).map(|plane| Self {
            vertices: tri.vertices.to_vec(),
            plane,
        })
    }

    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }

    /// Fan triangulation, skipping slivers.
    fn triangulate(&self, out: &mut Mesh) {
        let v = &self.vertices;
        for i in 1..v.len().saturating_sub(1) {
            let tri = Triangle::new(v[0], v[i], v[i + 1]);
            if tri.area() > MIN_AREA {
                out.add_triangle(tri);
            }
        }
    }
}

/// BSP tree node. Front and back subtrees are optional.
#[derive(Debug, Default)]
struct Node {
    plane: Option<Plane>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
    polygons: Vec<Polygon>,
}

impl Node {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Self::default();
        node.build(polygons);
        node
    }

    /// Swap solid and empty space.
    fn invert(&mut self) {
        for p in &mut self.polygons {
            p.flip();
        }
        if let Some(plane) = &mut self.plane {
            plane.flip();
        }
        if let Some(front) = &mut self.front {
            front.invert();
        }
        if let Some(back) = &mut self.back {
            back.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Remove the parts of `polygons` inside this tree.
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = &self.plane else {
            return polygons;
        };
        let mut front = Vec::new();
        let mut back = Vec::new();
        for polygon in polygons {
            match plane.split(polygon) {
                Split::CoplanarFront(p) | Split::Front(p) => front.push(p),
                Split::CoplanarBack(p) | Split::Back(p) => back.push(p),
                Split::Spanning { front: f, back: b } => {
                    front.extend(f);
                    back.extend(b);
                }
            }
        }
        let mut front = match &self.front {
            Some(node) => node.clip_polygons(front),
            None => front,
        };
        if let Some(node) = &self.back {
            front.extend(node.clip_polygons(back));
        }
        front
    }

    /// Remove the parts of this tree's polygons inside `bsp`.
    fn clip_to(&mut self, bsp: &Node) {
        self.polygons = bsp.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(front) = &mut self.front {
            front.clip_to(bsp);
        }
        if let Some(back) = &mut self.back {
            back.clip_to(bsp);
        }
    }

    fn all_polygons(&self, out: &mut Vec<Polygon>) {
        out.extend(self.polygons.iter().cloned());
        if let Some(front) = &self.front {
            front.all_polygons(out);
        }
        if let Some(back) = &self.back {
            back.all_polygons(out);
        }
    }

    fn build(&mut self, polygons: Vec<Polygon>) {
        let Some(first) = polygons.first() else {
            return;
        };
        let plane = *self.plane.get_or_insert(first.plane);
        let mut front = Vec::new();
        let mut back = Vec::new();
        for polygon in polygons {
            match plane.split(polygon) {
                Split::CoplanarFront(p) | Split::CoplanarBack(p) => self.polygons.push(p),
                Split::Front(p) => front.push(p),
                Split::Back(p) => back.push(p),
                Split::Spanning { front: f, back: b } => {
                    front.extend(f);
                    back.extend(b);
                }
            }
        }
        if !front.is_empty() {
            self.front.get_or_insert_with(Box::default).build(front);
        }
        if !back.is_empty() {
            self.back.get_or_insert_with(Box::default).build(back);
        }
    }
}

fn to_polygons<'a>(triangles: impl IntoIterator<Item = &'a Triangle>) -> Vec<Polygon> {
    triangles.into_iter().filter_map(Polygon::from_triangle).collect()
}

/// `a - b` over full polygon sets.
fn subtract_polygons(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = Node::new(a);
    let mut b = Node::new(b);
    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    let mut rest = Vec::new();
    b.all_polygons(&mut rest);
    a.build(rest);
    a.invert();
    let mut out = Vec::new();
    a.all_polygons(&mut out);
    out
}

/// Remove `tool` from `stock`.
///
/// Stock triangles that miss the tool's bounds (grown by `10 * EPSILON`) are
/// kept unchanged; only the rest go through the BSP. A tool that touches no
/// stock triangle is either entirely outside, leaving the stock as is, or
/// entirely inside, leaving a sealed cavity.
pub fn subtract(stock: &Mesh, tool: &Mesh) -> Mesh {
    if stock.is_empty() || tool.is_empty() || !stock.bounds().overlaps(tool.bounds()) {
        return stock.clone();
    }

    let region = tool.bounds().expanded(10.0 * EPSILON);
    let (center, half) = (region.center(), region.half_extents());
    let (local, kept): (Vec<&Triangle>, Vec<&Triangle>) = stock
        .triangles()
        .iter()
        .partition(|t| tri_box_overlap(&center, &half, &t.vertices));
    trace!(
        "subtract: {} local, {} kept, {} tool triangles",
        local.len(),
        kept.len(),
        tool.len()
    );

    if local.is_empty() {
        if !stock.contains_point(&tool.bounds().center()) {
            return stock.clone();
        }
        let mut out = stock.clone();
        for t in tool.triangles() {
            out.add_triangle(t.flipped());
        }
        return out;
    }

    let carved = subtract_polygons(to_polygons(local), to_polygons(tool.triangles()));
    let mut out = Mesh::from_triangles(kept.into_iter().copied().collect());
    for polygon in &carved {
        polygon.triangulate(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cube(min: f64, max: f64) -> Mesh {
        Mesh::from_box(Point3::new(min, min, min), Point3::new(max, max, max)).unwrap()
    }

    fn block(min: [f64; 3], max: [f64; 3]) -> Mesh {
        Mesh::from_box(
            Point3::new(min[0], min[1], min[2]),
            Point3::new(max[0], max[1], max[2]),
        )
        .unwrap()
    }

    #[test]
    fn test_corner_cut() {
        let out = subtract(&cube(0.0, 10.0), &cube(8.0, 12.0));
        assert_abs_diff_eq!(out.volume(), 992.0, epsilon = 1e-9);
        assert_eq!(out.bounds().max, Point3::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn test_disjoint_tool_is_noop() {
        let stock = cube(0.0, 10.0);
        let out = subtract(&stock, &cube(20.0, 21.0));
        assert_eq!(out, stock);
        assert_eq!(out.len(), 12);
    }

    #[test]
    fn test_enclosed_tool_leaves_cavity() {
        let out = subtract(&cube(0.0, 10.0), &cube(4.0, 6.0));
        assert_eq!(out.len(), 24);
        assert_abs_diff_eq!(out.volume(), 992.0, epsilon = 1e-9);
        assert!(!out.contains_point(&Point3::new(5.0, 5.0, 5.0)));
        assert!(out.contains_point(&Point3::new(2.0, 5.0, 5.0)));
    }

    #[test]
    fn test_slot_across_top() {
        let out = subtract(&cube(0.0, 10.0), &block([-1.0, 4.0, 8.0], [11.0, 6.0, 12.0]));
        assert_abs_diff_eq!(out.volume(), 960.0, epsilon = 1e-9);
        assert!(!out.contains_point(&Point3::new(5.0, 5.0, 9.0)));
        assert!(out.contains_point(&Point3::new(5.0, 5.0, 7.0)));
        assert!(out.contains_point(&Point3::new(5.0, 2.0, 9.0)));
    }

    #[test]
    fn test_through_hole() {
        let out = subtract(&cube(0.0, 10.0), &block([4.0, 4.0, -1.0], [6.0, 6.0, 11.0]));
        assert_abs_diff_eq!(out.volume(), 960.0, epsilon = 1e-9);
        assert!(!out.contains_point(&Point3::new(5.0, 5.0, 5.0)));
    }

    #[test]
    fn test_repeated_cuts_accumulate() {
        let mut stock = cube(0.0, 10.0);
        for z in [9.0, 8.0, 7.0, 6.0] {
            let tool = block([4.0, 4.0, z], [6.0, 6.0, z + 10.0]);
            stock = subtract(&stock, &tool);
        }
        // Pocket 2 x 2 x 4.
        assert_abs_diff_eq!(stock.volume(), 984.0, epsilon = 1e-9);
        assert!(!stock.contains_point(&Point3::new(5.0, 5.0, 7.0)));
        assert!(stock.contains_point(&Point3::new(5.0, 5.0, 5.0)));
    }

    #[test]
    fn test_empty_inputs() {
        let stock = cube(0.0, 1.0);
        assert_eq!(subtract(&stock, &Mesh::new()), stock);
        assert!(subtract(&Mesh::new(), &stock).is_empty());
    }
}
