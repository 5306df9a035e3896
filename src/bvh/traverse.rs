//! Nearest hit queries against a [`Bvh`].

use crate::bvh::{Bvh, NodeKind};
use crate::ray::Ray;
use crate::{Real, NO_HIT};

impl Bvh {
    /// Returns the distance to the closest triangle hit by `ray`, or `None` if it hits
    /// nothing. The ray is given in the space the tree was built in.
    ///
    /// Interior nodes at depth `max_depth` are not descended into. The ray reports the
    /// distance to their box instead, which makes the boxes drawn by
    /// [`Bvh::wireframe_geometry`] with the same depth the pick targets.
    /// [`FULL_DEPTH`](crate::FULL_DEPTH) always tests triangles.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::ray::Ray;
    /// use mesh_bvh::shapes::Triangle;
    /// use mesh_bvh::{Bvh, Point3, Vector3, FULL_DEPTH};
    ///
    /// let triangles = vec![Triangle::from_positions(
    ///     Point3::new(-1.0, -1.0, 0.0),
    ///     Point3::new(1.0, -1.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// )];
    /// let bvh = Bvh::build(&triangles);
    ///
    /// let ray = Ray::new(Point3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 0.0, -1.0));
    /// assert_eq!(bvh.nearest_hit(&ray, FULL_DEPTH), Some(3.0));
    ///
    /// let away = Ray::new(Point3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 0.0, 1.0));
    /// assert_eq!(bvh.nearest_hit(&away, FULL_DEPTH), None);
    /// ```
    pub fn nearest_hit(&self, ray: &Ray, max_depth: usize) -> Option<Real> {
        let (root_entry, _) = ray.intersection_slice_for_aabb(&self.nodes()[0].aabb)?;

        let mut best = Real::INFINITY;
        // (node, depth, distance to the node's box)
        let mut stack = vec![(0, 0, root_entry)];
        while let Some((node_index, depth, entry)) = stack.pop() {
            if entry >= best {
                continue;
            }

            match self.nodes()[node_index].kind {
                NodeKind::Leaf {
                    start_index,
                    triangle_count,
                } => {
                    for triangle in &self.triangles()[start_index..start_index + triangle_count] {
                        let distance = triangle.intersect(ray).distance;
                        if distance < best {
                            best = distance;
                        }
                    }
                }
                NodeKind::Interior { .. } if depth >= max_depth => {
                    best = entry;
                }
                NodeKind::Interior { left_child } => {
                    let right_child = left_child + 1;
                    let entry_of = |child: usize| {
                        ray.intersection_slice_for_aabb(&self.nodes()[child].aabb)
                            .map(|(entry, _)| entry)
                    };

                    // The nearer child is pushed last so it is visited first.
                    match (entry_of(left_child), entry_of(right_child)) {
                        (Some(left), Some(right)) if left <= right => {
                            stack.push((right_child, depth + 1, right));
                            stack.push((left_child, depth + 1, left));
                        }
                        (Some(left), Some(right)) => {
                            stack.push((left_child, depth + 1, left));
                            stack.push((right_child, depth + 1, right));
                        }
                        (Some(left), None) => stack.push((left_child, depth + 1, left)),
                        (None, Some(right)) => stack.push((right_child, depth + 1, right)),
                        (None, None) => {}
                    }
                }
            }
        }

        if best < Real::INFINITY {
            Some(best)
        } else {
            None
        }
    }

    /// Like [`Bvh::nearest_hit`], but reports a miss as [`NO_HIT`].
    pub fn traverse(&self, ray: &Ray, max_depth: usize) -> Real {
        self.nearest_hit(ray, max_depth).unwrap_or(NO_HIT)
    }
}

#[cfg(test)]
mod tests {
    use crate::bvh::Bvh;
    use crate::ray::Ray;
    use crate::shapes::Triangle;
    use crate::testbase::{
        brute_force_nearest, random_ray, random_soup, tuple_to_point, tuplevec_unit_strategy,
        unit_cube, voxel_grid,
    };
    use crate::{Point3, Vector3, FULL_DEPTH, NO_HIT};
    use float_eq::assert_float_eq;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// One triangle over `x in [0, 1]` at height 5 and one over `x in [10, 11]` at height 0.
    fn two_separated_triangles() -> Vec<Triangle> {
        vec![
            Triangle::from_positions(
                Point3::new(0.0, 0.0, 5.0),
                Point3::new(1.0, 0.0, 5.0),
                Point3::new(0.0, 1.0, 5.0),
            ),
            Triangle::from_positions(
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(11.0, 0.0, 0.0),
                Point3::new(10.0, 1.0, 0.0),
            ),
        ]
    }

    #[test]
    fn test_miss_reports_no_hit() {
        let bvh = Bvh::build(&unit_cube());
        let ray = Ray::new(Point3::new(5.0, 5.0, 5.0), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(bvh.nearest_hit(&ray, FULL_DEPTH), None);
        assert_eq!(bvh.traverse(&ray, FULL_DEPTH), NO_HIT);
    }

    #[test]
    fn test_empty_tree_never_hits() {
        let bvh = Bvh::default();
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(bvh.traverse(&ray, FULL_DEPTH), NO_HIT);
        assert_eq!(bvh.traverse(&ray, 0), NO_HIT);
    }

    #[test]
    fn test_hits_cube_face() {
        let bvh = Bvh::build(&unit_cube());
        let ray = Ray::new(Point3::new(0.1, 0.2, 3.0), Vector3::new(0.0, 0.0, -1.0));
        assert_float_eq!(bvh.traverse(&ray, FULL_DEPTH), 2.5, abs <= 1e-5);
    }

    #[test]
    fn test_origin_inside_hits_far_face() {
        let bvh = Bvh::build(&unit_cube());
        let ray = Ray::new(Point3::new(0.0, 0.1, 0.2), Vector3::new(1.0, 0.0, 0.0));
        assert_float_eq!(bvh.traverse(&ray, FULL_DEPTH), 0.5, abs <= 1e-5);
    }

    #[test]
    fn test_depth_cutoff_reports_box_distance() {
        let bvh = Bvh::build(&two_separated_triangles());
        assert_eq!(bvh.nodes().len(), 3);

        let ray = Ray::new(Point3::new(10.2, 0.2, 10.0), Vector3::new(0.0, 0.0, -1.0));
        // At the root the visible box is hit at its top, z = 5.
        assert_float_eq!(bvh.traverse(&ray, 0), 5.0, abs <= 1e-5);
        // One level down the flat leaf box is tested triangle by triangle.
        assert_float_eq!(bvh.traverse(&ray, 1), 10.0, abs <= 1e-5);
        assert_float_eq!(bvh.traverse(&ray, FULL_DEPTH), 10.0, abs <= 1e-5);
    }

    #[test]
    fn test_voxel_grid_analytic_distance() {
        let bvh = Bvh::build(&voxel_grid(8));
        let direction = Vector3::new(1.0, 0.2, -0.1);
        // Aimed at the center of the cube at the origin corner of the x = 0 layer,
        // entering through its -x face away from the face diagonal.
        let origin = Point3::new(0.5, 3.5, 3.5) - direction * 5.5;
        let ray = Ray::new(origin, direction);

        let expected = 5.0 * 1.05f32.sqrt();
        assert_float_eq!(bvh.traverse(&ray, FULL_DEPTH), expected, abs <= 1e-4);
    }

    #[test]
    fn test_axis_aligned_rays_on_grid_boundary_planes() {
        let triangles = voxel_grid(8);
        let bvh = Bvh::build(&triangles);

        let mut origins = Vec::new();
        for i in 0..8 {
            let along = i as f32 + 0.5;
            for plane in [0.0, 8.0] {
                origins.push(Point3::new(-3.0, plane, along));
                origins.push(Point3::new(-3.0, along, plane));
            }
        }
        origins.push(Point3::new(-3.0, 0.0, 0.0));
        origins.push(Point3::new(-3.0, 8.0, 8.0));

        for origin in origins {
            let ray = Ray::new(origin, Vector3::new(1.0, 0.0, 0.0));
            let expected = brute_force_nearest(&triangles, &ray);
            let actual = bvh.nearest_hit(&ray, FULL_DEPTH);
            assert!(actual.is_some(), "tree misses from {:?}", origin);
            assert_float_eq!(expected.unwrap_or(NO_HIT), 3.0, abs <= 1e-5);
            assert_float_eq!(actual.unwrap_or(NO_HIT), 3.0, abs <= 1e-5);
        }
    }

    #[test]
    fn test_random_soup_matches_brute_force() {
        let triangles = random_soup(300, 7);
        let bvh = Bvh::build(&triangles);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let ray = random_ray(&mut rng);
            let expected = brute_force_nearest(&triangles, &ray);
            let actual = bvh.nearest_hit(&ray, FULL_DEPTH);
            match (expected, actual) {
                (Some(expected), Some(actual)) => assert_float_eq!(actual, expected, abs <= 1e-3),
                (None, None) => {}
                _ => panic!("brute force {:?} but tree {:?}", expected, actual),
            }
        }
    }

    proptest! {
        // Rays from anywhere around the unit cube towards a point inside it.
        #[test]
        fn test_unit_cube_matches_brute_force(
            origin in tuplevec_unit_strategy(),
            target in (-0.4f32..0.4, -0.4f32..0.4, -0.4f32..0.4),
        ) {
            let origin = tuple_to_point(&origin);
            let target = tuple_to_point(&target);
            prop_assume!((target - origin).norm() > 1e-3);

            let triangles = unit_cube();
            let bvh = Bvh::build(&triangles);
            let ray = Ray::new(origin, target - origin);

            let expected = brute_force_nearest(&triangles, &ray).unwrap();
            let actual = bvh.nearest_hit(&ray, FULL_DEPTH).unwrap();
            prop_assert!((actual - expected).abs() < 1e-4);
        }
    }
}
