//! This module defines the mesh [`Triangle`], its [`Vertex`] data and the
//! [`BvhTriangle`] record the hierarchy partitions.

use crate::aabb::{Aabb, Bounded};
use crate::ray::{Intersection, Ray};
use crate::{Point3, Vector2, Vector3};

/// One corner of a mesh triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    /// Object space position.
    pub position: Point3,
    /// Shading normal.
    pub normal: Vector3,
    /// Texture coordinate.
    pub uv: Vector2,
}

impl Vertex {
    /// Creates a new vertex.
    pub fn new(position: Point3, normal: Vector3, uv: Vector2) -> Vertex {
        Vertex {
            position,
            normal,
            uv,
        }
    }

    /// Creates a vertex with a zero normal and zero texture coordinates.
    pub fn from_position(position: Point3) -> Vertex {
        Vertex::new(position, Vector3::zeros(), Vector2::zeros())
    }
}

/// A mesh triangle. Instance of a more complex [`Bounded`] primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle {
    /// The three corners, counter clockwise.
    pub vertices: [Vertex; 3],
}

impl Triangle {
    /// Creates a new triangle given a counter clockwise set of vertices.
    pub fn new(a: Vertex, b: Vertex, c: Vertex) -> Triangle {
        Triangle {
            vertices: [a, b, c],
        }
    }

    /// Creates a new triangle from positions only. The normal of every vertex is set to the
    /// face normal.
    pub fn from_positions(a: Point3, b: Point3, c: Point3) -> Triangle {
        let normal = (b - a).cross(&(c - a)).try_normalize(0.0).unwrap_or_else(Vector3::zeros);
        let vertex = |position| Vertex::new(position, normal, Vector2::zeros());
        Triangle::new(vertex(a), vertex(b), vertex(c))
    }

    /// Returns the three corner positions.
    pub fn positions(&self) -> [Point3; 3] {
        self.vertices.map(|vertex| vertex.position)
    }
}

impl Bounded for Triangle {
    fn aabb(&self) -> Aabb {
        let [a, b, c] = self.positions();
        Aabb::empty().grow(&a).grow(&b).grow(&c)
    }
}

/// The per-triangle record the builder partitions. It caches the centroid and the bounds
/// and remembers where the triangle sits in the mesh's triangle order.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BvhTriangle {
    /// First corner.
    pub v0: Point3,
    /// Second corner.
    pub v1: Point3,
    /// Third corner.
    pub v2: Point3,
    /// Arithmetic mean of the corners.
    pub center: Point3,
    /// Componentwise min/max of the corners.
    pub aabb: Aabb,
    /// Index of the triangle in the mesh it was built from.
    pub source_index: usize,
}

impl BvhTriangle {
    /// Derives the build record of `triangle`, which is the `source_index`-th triangle of
    /// its mesh.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::shapes::{BvhTriangle, Triangle};
    /// use mesh_bvh::Point3;
    ///
    /// let triangle = Triangle::from_positions(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(3.0, 0.0, 0.0),
    ///     Point3::new(0.0, 3.0, 3.0),
    /// );
    /// let record = BvhTriangle::new(&triangle, 7);
    ///
    /// assert_eq!(record.center, Point3::new(1.0, 1.0, 1.0));
    /// assert_eq!(record.aabb.max, Point3::new(3.0, 3.0, 3.0));
    /// assert_eq!(record.source_index, 7);
    /// ```
    pub fn new(triangle: &Triangle, source_index: usize) -> BvhTriangle {
        let [v0, v1, v2] = triangle.positions();
        let center = Point3::from((v0.coords + v1.coords + v2.coords) / 3.0);
        BvhTriangle {
            v0,
            v1,
            v2,
            center,
            aabb: triangle.aabb(),
            source_index,
        }
    }

    /// Intersects the triangle with `ray`.
    pub fn intersect(&self, ray: &Ray) -> Intersection {
        ray.intersects_triangle(&self.v0, &self.v1, &self.v2)
    }
}

impl Bounded for BvhTriangle {
    fn aabb(&self) -> Aabb {
        self.aabb
    }
}
