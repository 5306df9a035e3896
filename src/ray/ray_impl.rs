//! This module defines a Ray structure and intersection algorithms
//! for axis aligned bounding boxes and triangles.

use crate::aabb::Aabb;
use crate::utils::{fast_max, fast_min};
use crate::{Matrix4, Point3, Real, Vector3};

/// A struct which defines a ray and some of its cached values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The ray origin.
    pub origin: Point3,

    /// The ray direction.
    pub direction: Vector3,

    /// Inverse (1/x) ray direction. Cached for use in [`Aabb`] intersections.
    pub inv_direction: Vector3,
}

/// A struct which is returned by the [`Ray::intersects_triangle()`] method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Distance from the ray origin to the intersection point, in units of the
    /// ray's direction. Positive infinity if there is no intersection.
    pub distance: Real,

    /// U coordinate of the intersection.
    pub u: Real,

    /// V coordinate of the intersection.
    pub v: Real,
}

impl Intersection {
    /// Constructs an [`Intersection`]. `distance` should be set to positive infinity,
    /// if the intersection does not occur.
    pub fn new(distance: Real, u: Real, v: Real) -> Intersection {
        Intersection { distance, u, v }
    }

    /// Returns true if the intersection occurred.
    pub fn is_hit(&self) -> bool {
        self.distance < Real::INFINITY
    }
}

impl Ray {
    /// Creates a new [`Ray`] from an `origin` and a `direction`.
    /// `direction` will be normalized, so distances along the ray are world distances.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::ray::Ray;
    /// use mesh_bvh::{Point3, Vector3};
    ///
    /// let origin = Point3::new(0.0, 0.0, 0.0);
    /// let direction = Vector3::new(2.0, 0.0, 0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// assert_eq!(ray.origin, origin);
    /// assert_eq!(ray.direction, Vector3::new(1.0, 0.0, 0.0));
    /// ```
    pub fn new(origin: Point3, direction: Vector3) -> Ray {
        Ray::with_direction(origin, direction.normalize())
    }

    /// Creates a new [`Ray`] whose `direction` is used as given. Distances reported for
    /// this ray are measured in multiples of `direction`.
    pub fn with_direction(origin: Point3, direction: Vector3) -> Ray {
        Ray {
            origin,
            direction,
            inv_direction: direction.map(|x| 1.0 / x),
        }
    }

    /// Returns the point at parameter `t` along the ray.
    pub fn at(&self, t: Real) -> Point3 {
        self.origin + self.direction * t
    }

    /// Transforms the ray by an affine matrix. The direction is not renormalized, so a
    /// distance measured along the transformed ray equals the distance along this one.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::ray::Ray;
    /// use mesh_bvh::{Matrix4, Point3, Vector3};
    ///
    /// let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
    /// let local = ray.transform(&Matrix4::new_scaling(0.5));
    ///
    /// assert_eq!(local.origin, Point3::new(0.0, 0.0, 2.5));
    /// assert_eq!(local.at(5.0), Point3::new(0.0, 0.0, 0.0));
    /// ```
    pub fn transform(&self, matrix: &Matrix4) -> Ray {
        Ray::with_direction(
            matrix.transform_point(&self.origin),
            matrix.transform_vector(&self.direction),
        )
    }

    /// Tests the intersection of a [`Ray`] with an [`Aabb`] using the slab method.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::aabb::Aabb;
    /// use mesh_bvh::ray::Ray;
    /// use mesh_bvh::{Point3, Vector3};
    ///
    /// let origin = Point3::new(0.0, 0.0, 0.0);
    /// let direction = Vector3::new(1.0, 0.0, 0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// let point1 = Point3::new(99.9, -1.0, -1.0);
    /// let point2 = Point3::new(100.1, 1.0, 1.0);
    /// let aabb = Aabb::with_bounds(point1, point2);
    ///
    /// assert!(ray.intersects_aabb(&aabb));
    /// ```
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.intersection_slice_for_aabb(aabb).is_some()
    }

    /// Intersects an [`Aabb`] with the ray.
    /// Returns the distance to the entry point (zero if the origin is inside the box) and
    /// the distance to the exit point, or `None` if the ray misses the box or the box lies
    /// behind the ray.
    pub fn intersection_slice_for_aabb(&self, aabb: &Aabb) -> Option<(Real, Real)> {
        if aabb.is_empty() {
            return None;
        }

        let mut entry_distance = Real::NEG_INFINITY;
        let mut exit_distance = Real::INFINITY;
        for i in 0..3 {
            // Parallel to the slab: the ray stays inside it or never enters it.
            if self.direction[i] == 0.0 {
                if self.origin[i] < aabb.min[i] || self.origin[i] > aabb.max[i] {
                    return None;
                }
                continue;
            }

            let t1 = (aabb.min[i] - self.origin[i]) * self.inv_direction[i];
            let t2 = (aabb.max[i] - self.origin[i]) * self.inv_direction[i];

            entry_distance = fast_max(fast_min(t1, t2), entry_distance);
            exit_distance = fast_min(fast_max(t1, t2), exit_distance);
        }

        let entry_distance = fast_max(entry_distance, 0.0);
        if exit_distance >= entry_distance {
            Some((entry_distance, exit_distance))
        } else {
            None
        }
    }

    /// Implementation of the
    /// [Möller-Trumbore triangle/ray intersection algorithm](https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm).
    /// Returns the distance to the intersection, as well as
    /// the u and v coordinates of the intersection.
    /// Both faces are hit; the distance is set to +INFINITY if the ray does not intersect
    /// the triangle, runs parallel to it or hits it behind its origin.
    #[allow(clippy::many_single_char_names)]
    pub fn intersects_triangle(&self, a: &Point3, b: &Point3, c: &Point3) -> Intersection {
        let a_to_b = *b - *a;
        let a_to_c = *c - *a;

        // Begin calculating determinant - also used to calculate u parameter
        // u_vec lies in view plane
        // length of a_to_c in view_plane = |u_vec| = |a_to_c|*sin(a_to_c, dir)
        let u_vec = self.direction.cross(&a_to_c);

        // If determinant is near zero, ray lies in plane of triangle
        // The determinant corresponds to the parallelepiped volume:
        // det = 0 => [dir, a_to_b, a_to_c] not linearly independant
        let det = a_to_b.dot(&u_vec);
        if det.abs() < Real::EPSILON {
            return Intersection::new(Real::INFINITY, 0.0, 0.0);
        }

        let inv_det = 1.0 / det;

        // Vector from point a to ray origin
        let a_to_origin = self.origin - *a;

        // Calculate u parameter
        let u = a_to_origin.dot(&u_vec) * inv_det;

        // Test bounds: u < 0 || u > 1 => outside of triangle
        if !(0.0..=1.0).contains(&u) {
            return Intersection::new(Real::INFINITY, u, 0.0);
        }

        // Prepare to test v parameter
        let v_vec = a_to_origin.cross(&a_to_b);

        // Calculate v parameter and test bound
        let v = self.direction.dot(&v_vec) * inv_det;
        // The intersection lies outside of the triangle
        if v < 0.0 || u + v > 1.0 {
            return Intersection::new(Real::INFINITY, u, v);
        }

        let dist = a_to_c.dot(&v_vec) * inv_det;

        if dist > Real::EPSILON {
            Intersection::new(dist, u, v)
        } else {
            Intersection::new(Real::INFINITY, u, v)
        }
    }
}
