#![no_main]
use std::fmt::{self, Debug, Formatter};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mesh_bvh::ray::Ray;
use mesh_bvh::shapes::Triangle;
use mesh_bvh::{BuildConfig, Bvh, Point3, FULL_DEPTH};
use ordered_float::NotNan;

type Float = f32;
const LIMIT: Float = 1_000_000.0;

fuzz_target!(|workload: Workload| {
    workload.fuzz();
});

#[derive(Arbitrary)]
struct ArbitraryPoint {
    coordinates: [NotNan<Float>; 3],
}

impl ArbitraryPoint {
    fn point(&self) -> Point3 {
        let [x, y, z] = self
            .coordinates
            .map(|f| f.into_inner().clamp(-LIMIT, LIMIT));
        Point3::new(x, y, z)
    }
}

#[derive(Arbitrary)]
struct ArbitraryTriangle {
    corners: [ArbitraryPoint; 3],
}

impl Debug for ArbitraryTriangle {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.triangle().positions(), f)
    }
}

impl ArbitraryTriangle {
    fn triangle(&self) -> Triangle {
        let [a, b, c] = &self.corners;
        Triangle::from_positions(a.point(), b.point(), c.point())
    }
}

#[derive(Arbitrary)]
struct ArbitraryRay {
    origin: ArbitraryPoint,
    destination: ArbitraryPoint,
}

impl Debug for ArbitraryRay {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.ray(), f)
    }
}

impl ArbitraryRay {
    fn ray(&self) -> Ray {
        let mut direction = self.destination.point() - self.origin.point();
        // Ensure no degenerate direction.
        if direction.norm() < 1e-3 {
            direction = nalgebra::Vector3::new(1.0, 1.0, 1.0);
        }
        Ray::new(self.origin.point(), direction)
    }
}

#[derive(Debug, Arbitrary)]
struct Workload {
    triangles: Vec<ArbitraryTriangle>,
    ray: ArbitraryRay,
    max_depth: u8,
    bin_count: u8,
    node_offset: u16,
}

impl Workload {
    fn fuzz(self) {
        let triangles: Vec<Triangle> = self.triangles.iter().map(|t| t.triangle()).collect();
        let config = BuildConfig {
            max_depth: self.max_depth as usize % 40,
            bin_count: (self.bin_count as usize % 31) + 2,
            ..BuildConfig::default()
        };
        let bvh = Bvh::build_with_config(&triangles, config).unwrap();
        bvh.assert_consistent();
        assert!(bvh.depth() <= config.max_depth);

        // The flattened tree mirrors the node store.
        let offset = self.node_offset as usize;
        let flat = bvh.flatten(offset).unwrap();
        assert_eq!(flat.len(), bvh.nodes().len());
        for (node, flat) in bvh.nodes().iter().zip(&flat) {
            match node.children() {
                Some((left, _)) => assert_eq!(flat.start_index as usize, left + offset),
                None => assert!(flat.is_leaf()),
            }
        }

        // Reordering an identity index buffer yields the triangle order.
        let indices: Vec<u32> = (0..triangles.len() as u32 * 3).collect();
        let reordered = bvh.reordered_indices(&indices).unwrap();
        for (face, source) in reordered.chunks_exact(3).zip(bvh.triangle_order()) {
            assert_eq!(face[0] as usize, 3 * source);
        }

        if !bvh.is_empty() {
            assert_eq!(bvh.wireframe_geometry(FULL_DEPTH).count, 24 * bvh.leaf_count());
        }

        // The tree reports the nearest triangle hit, and nothing when no triangle is hit.
        let ray = self.ray.ray();
        let brute_force = triangles
            .iter()
            .map(|triangle| {
                let [a, b, c] = triangle.positions();
                ray.intersects_triangle(&a, &b, &c).distance
            })
            .fold(Float::INFINITY, Float::min);
        match bvh.nearest_hit(&ray, FULL_DEPTH) {
            Some(distance) => {
                assert!(brute_force <= distance, "{} > {}", brute_force, distance);
                let tolerance = 1e-3 * brute_force.abs().max(1.0);
                assert!(
                    distance - brute_force <= tolerance,
                    "tree {} but brute force {}",
                    distance,
                    brute_force
                );
            }
            None => assert!(
                brute_force.is_infinite(),
                "tree misses but brute force hits at {}",
                brute_force
            ),
        }
    }
}
