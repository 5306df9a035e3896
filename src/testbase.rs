//! Common utilities shared by unit tests.
#![cfg(test)]

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::aabb::Aabb;
use crate::mesh::{Mesh, Vertex};
use crate::ray::Ray;
use crate::shapes::Triangle;
use crate::{Point3, Real, Vector3};

/// A vector represented as a tuple
pub type TupleVec = (f32, f32, f32);

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -10e10 to 10e10
/// A small enough range to prevent most fp32 errors from breaking certain tests
pub fn tuplevec_small_strategy() -> impl Strategy<Value = TupleVec> {
    (
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
    )
}

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -10 to 10.
/// Used where intersection distances are compared against a tolerance.
pub fn tuplevec_unit_strategy() -> impl Strategy<Value = TupleVec> {
    (-10.0_f32..10.0_f32, -10.0_f32..10.0_f32, -10.0_f32..10.0_f32)
}

/// Convert a `TupleVec` to a [`Point3`].
pub fn tuple_to_point(tpl: &TupleVec) -> Point3 {
    Point3::new(tpl.0, tpl.1, tpl.2)
}

/// Corner positions of an axis aligned cube, in the corner order of [`Aabb::corners`].
fn cube_corners(min: Point3, size: Real) -> [Point3; 8] {
    Aabb::with_bounds(min, min + Vector3::new(size, size, size)).corners()
}

/// Index triples of the twelve faces of a cube over the corners of [`cube_corners`].
const CUBE_INDICES: [u32; 36] = [
    // -z
    0, 2, 3, 3, 1, 0, //
    // +z
    4, 5, 7, 7, 6, 4, //
    // -x
    0, 4, 6, 6, 2, 0, //
    // +x
    1, 3, 7, 7, 5, 1, //
    // -y
    0, 1, 5, 5, 4, 0, //
    // +y
    2, 6, 7, 7, 3, 2,
];

/// Pushes the twelve surface triangles of the cube with minimum corner `min` to `shapes`.
pub fn push_cube(min: Point3, size: Real, shapes: &mut Vec<Triangle>) {
    let corners = cube_corners(min, size);
    for face in CUBE_INDICES.chunks_exact(3) {
        shapes.push(Triangle::from_positions(
            corners[face[0] as usize],
            corners[face[1] as usize],
            corners[face[2] as usize],
        ));
    }
}

/// The twelve triangles of the cube spanning `[-0.5, 0.5]` on every axis.
pub fn unit_cube() -> Vec<Triangle> {
    let mut shapes = Vec::new();
    push_cube(Point3::new(-0.5, -0.5, -0.5), 1.0, &mut shapes);
    shapes
}

/// An indexed cube mesh with eight shared vertices, minimum corner `min` and edge `size`.
pub fn cube_mesh(min: Point3, size: Real) -> Mesh {
    let vertices = cube_corners(min, size)
        .iter()
        .map(|corner| Vertex::from_position(*corner))
        .collect();
    Mesh::new(vertices, CUBE_INDICES.to_vec()).unwrap()
}

/// `n * n * n` unit cubes whose minimum corners are the integer points of `[0, n)^3`.
pub fn voxel_grid(n: usize) -> Vec<Triangle> {
    let mut shapes = Vec::with_capacity(n * n * n * 12);
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                push_cube(Point3::new(i as f32, j as f32, k as f32), 1.0, &mut shapes);
            }
        }
    }
    shapes
}

/// Vertices and indices of the unit square in the z = 0 plane, split along its diagonal.
pub fn quad_data() -> (Vec<Vertex>, Vec<u32>) {
    let vertices = vec![
        Vertex::from_position(Point3::new(0.0, 0.0, 0.0)),
        Vertex::from_position(Point3::new(1.0, 0.0, 0.0)),
        Vertex::from_position(Point3::new(1.0, 1.0, 0.0)),
        Vertex::from_position(Point3::new(0.0, 1.0, 0.0)),
    ];
    (vertices, vec![0, 1, 2, 0, 2, 3])
}

/// Returns a point inside `bounds`.
pub fn random_point(rng: &mut StdRng, bounds: &Aabb) -> Point3 {
    Point3::new(
        rng.random_range(bounds.min.x..bounds.max.x),
        rng.random_range(bounds.min.y..bounds.max.y),
        rng.random_range(bounds.min.z..bounds.max.z),
    )
}

/// Returns the testing space bounds of [`random_soup`].
pub fn default_bounds() -> Aabb {
    Aabb::with_bounds(
        Point3::new(-100.0, -100.0, -100.0),
        Point3::new(100.0, 100.0, 100.0),
    )
}

/// Creates `n` deterministic random triangles of moderate size inside [`default_bounds`].
pub fn random_soup(n: usize, seed: u64) -> Vec<Triangle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let bounds = default_bounds();
    (0..n)
        .map(|_| {
            let a = random_point(&mut rng, &bounds);
            let mut corner = || {
                a + Vector3::new(
                    rng.random_range(-5.0..5.0),
                    rng.random_range(-5.0..5.0),
                    rng.random_range(-5.0..5.0),
                )
            };
            let b = corner();
            let c = corner();
            Triangle::from_positions(a, b, c)
        })
        .collect()
}

/// Creates a ray between two random points of [`default_bounds`].
pub fn random_ray(rng: &mut StdRng) -> Ray {
    let bounds = default_bounds();
    let origin = random_point(rng, &bounds);
    let target = random_point(rng, &bounds);
    Ray::new(origin, target - origin)
}

/// Nearest hit of `ray` among `triangles` by testing every triangle.
pub fn brute_force_nearest(triangles: &[Triangle], ray: &Ray) -> Option<Real> {
    triangles
        .iter()
        .map(|triangle| {
            let [a, b, c] = triangle.positions();
            ray.intersects_triangle(&a, &b, &c).distance
        })
        .filter(|distance| distance.is_finite())
        .min_by(|a, b| a.total_cmp(b))
}
