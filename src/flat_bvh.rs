//! This module exports methods to flatten a [`Bvh`] into the buffers a GPU intersector
//! reads, and to traverse such buffers on the CPU.

use bytemuck::{Pod, Zeroable};

use crate::aabb::Aabb;
use crate::bvh::{Bvh, NodeKind};
use crate::error::{BvhError, Result};
use crate::ray::Ray;
use crate::shapes::{Triangle, Vertex};
use crate::utils::to_gpu_index;
use crate::{Point3, Real};

/// Value of [`FlatNode::triangle_count`] marking an interior node. Bit-identical to `-1i32`.
pub const INTERIOR_FLAG: u32 = u32::MAX;

/// A node of a flattened [`Bvh`], laid out for a storage buffer.
///
/// For a leaf, `start_index` and `triangle_count` select the leaf's triangles from the
/// mesh's reordered triangles. For an interior node `triangle_count` is
/// [`INTERIOR_FLAG`] and `start_index` is the buffer position of the left child; the
/// right child follows it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatNode {
    /// Minimum corner of the node's box.
    pub min_bounds: [f32; 3],

    /// Maximum corner of the node's box.
    pub max_bounds: [f32; 3],

    /// First triangle of a leaf, or the left child of an interior node.
    pub start_index: u32,

    /// Triangle count of a leaf, or [`INTERIOR_FLAG`].
    pub triangle_count: u32,
}

impl FlatNode {
    /// Returns `true` if the node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.triangle_count != INTERIOR_FLAG
    }

    /// The node's box.
    pub fn aabb(&self) -> Aabb {
        Aabb::with_bounds(Point3::from(self.min_bounds), Point3::from(self.max_bounds))
    }
}

/// The byte buffer of a flattened [`Bvh`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedBvh {
    /// Packed [`FlatNode`]s.
    pub data: Vec<u8>,

    /// Number of nodes in `data`.
    pub num_nodes: usize,
}

impl FlattenedBvh {
    /// Reads the nodes back from the bytes.
    pub fn nodes(&self) -> Vec<FlatNode> {
        self.data
            .chunks_exact(std::mem::size_of::<FlatNode>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

/// A vertex of a [`FlatTriangle`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatVertex {
    /// Object space position.
    pub position: [f32; 3],
    /// Shading normal.
    pub normal: [f32; 3],
    /// Texture coordinate.
    pub uv: [f32; 2],
}

impl From<&Vertex> for FlatVertex {
    fn from(vertex: &Vertex) -> FlatVertex {
        FlatVertex {
            position: vertex.position.coords.into(),
            normal: vertex.normal.into(),
            uv: vertex.uv.into(),
        }
    }
}

/// A triangle laid out for a storage buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatTriangle {
    /// The three corners.
    pub vertices: [FlatVertex; 3],
}

impl From<&Triangle> for FlatTriangle {
    fn from(triangle: &Triangle) -> FlatTriangle {
        FlatTriangle {
            vertices: triangle.vertices.each_ref().map(FlatVertex::from),
        }
    }
}

impl FlatTriangle {
    fn position(&self, corner: usize) -> Point3 {
        Point3::from(self.vertices[corner].position)
    }
}

impl Bvh {
    /// Flattens the [`Bvh`] so that it can be uploaded behind `node_offset` other nodes.
    /// Child links are shifted by `node_offset`, leaf triangle ranges are not.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::flat_bvh::INTERIOR_FLAG;
    /// use mesh_bvh::shapes::Triangle;
    /// use mesh_bvh::{Bvh, Point3};
    ///
    /// let triangles = vec![
    ///     Triangle::from_positions(
    ///         Point3::new(0.0, 0.0, 0.0),
    ///         Point3::new(1.0, 0.0, 0.0),
    ///         Point3::new(0.0, 1.0, 0.0),
    ///     ),
    ///     Triangle::from_positions(
    ///         Point3::new(10.0, 0.0, 0.0),
    ///         Point3::new(11.0, 0.0, 0.0),
    ///         Point3::new(10.0, 1.0, 0.0),
    ///     ),
    /// ];
    /// let bvh = Bvh::build(&triangles);
    /// let flat = bvh.flatten(100).unwrap();
    ///
    /// assert_eq!(flat.len(), 3);
    /// assert_eq!(flat[0].triangle_count, INTERIOR_FLAG);
    /// assert_eq!(flat[0].start_index, 101);
    /// assert_eq!(flat[1].triangle_count, 1);
    /// ```
    pub fn flatten(&self, node_offset: usize) -> Result<Vec<FlatNode>> {
        let overflow = || BvhError::OffsetOverflow {
            what: "node",
            offset: node_offset,
            count: self.nodes().len(),
        };
        node_offset
            .checked_add(self.nodes().len())
            .and_then(to_gpu_index)
            .ok_or_else(overflow)?;
        to_gpu_index(self.triangles().len()).ok_or(BvhError::OffsetOverflow {
            what: "triangle",
            offset: 0,
            count: self.triangles().len(),
        })?;

        // Both checks above bound every value cast below.
        let flat = self
            .nodes()
            .iter()
            .map(|node| {
                let (start_index, triangle_count) = match node.kind {
                    NodeKind::Leaf {
                        start_index,
                        triangle_count,
                    } => (start_index as u32, triangle_count as u32),
                    NodeKind::Interior { left_child } => {
                        ((left_child + node_offset) as u32, INTERIOR_FLAG)
                    }
                };
                FlatNode {
                    min_bounds: node.aabb.min.coords.into(),
                    max_bounds: node.aabb.max.coords.into(),
                    start_index,
                    triangle_count,
                }
            })
            .collect();
        Ok(flat)
    }

    /// Flattens the [`Bvh`] into a byte buffer. See [`Bvh::flatten`].
    pub fn flattened_bvh_data(&self, node_offset: usize) -> Result<FlattenedBvh> {
        let nodes = self.flatten(node_offset)?;
        Ok(FlattenedBvh {
            num_nodes: nodes.len(),
            data: bytemuck::cast_slice(&nodes).to_vec(),
        })
    }

    /// Permutes an index buffer with three indices per triangle into leaf order, so that
    /// the triangle ranges of the leaves address it directly.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::shapes::Triangle;
    /// use mesh_bvh::{Bvh, Point3};
    ///
    /// let far = Triangle::from_positions(
    ///     Point3::new(10.0, 0.0, 0.0),
    ///     Point3::new(11.0, 0.0, 0.0),
    ///     Point3::new(10.0, 1.0, 0.0),
    /// );
    /// let near = Triangle::from_positions(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// );
    /// let bvh = Bvh::build(&vec![far, near]);
    ///
    /// assert_eq!(bvh.reordered_indices(&[0, 1, 2, 3, 4, 5]).unwrap(), vec![3, 4, 5, 0, 1, 2]);
    /// ```
    pub fn reordered_indices(&self, indices: &[u32]) -> Result<Vec<u32>> {
        if indices.len() % 3 != 0 {
            return Err(BvhError::PartialTriangle(indices.len()));
        }
        self.check_triangle_count(indices.len() / 3)?;
        Ok(self
            .triangle_order()
            .flat_map(|source| indices[3 * source..3 * source + 3].iter().copied())
            .collect())
    }

    /// Packs `triangles`, the mesh the tree was built over, in leaf order.
    pub fn flatten_triangles(&self, triangles: &[Triangle]) -> Result<Vec<FlatTriangle>> {
        self.check_triangle_count(triangles.len())?;
        Ok(self
            .triangle_order()
            .map(|source| FlatTriangle::from(&triangles[source]))
            .collect())
    }

    fn check_triangle_count(&self, actual: usize) -> Result<()> {
        if actual != self.triangles().len() {
            return Err(BvhError::TriangleCountMismatch {
                expected: self.triangles().len(),
                actual,
            });
        }
        Ok(())
    }
}

/// Traverses flattened buffers the way a GPU intersector does and returns the distance to
/// the closest hit triangle.
///
/// `root` is the buffer position of the tree's root in `flat_nodes`, and `triangles` are
/// the tree's triangles in leaf order. Panics if the buffers do not describe a tree.
pub fn traverse_flat_bvh(
    ray: &Ray,
    flat_nodes: &[FlatNode],
    root: usize,
    triangles: &[FlatTriangle],
) -> Option<Real> {
    let mut best = Real::INFINITY;
    let mut stack = vec![root];
    while let Some(index) = stack.pop() {
        let node = &flat_nodes[index];
        match ray.intersection_slice_for_aabb(&node.aabb()) {
            Some((entry, _)) if entry < best => {}
            _ => continue,
        }

        if node.is_leaf() {
            let start = node.start_index as usize;
            for triangle in &triangles[start..start + node.triangle_count as usize] {
                let distance = ray
                    .intersects_triangle(
                        &triangle.position(0),
                        &triangle.position(1),
                        &triangle.position(2),
                    )
                    .distance;
                if distance < best {
                    best = distance;
                }
            }
        } else {
            let left = node.start_index as usize;
            stack.push(left + 1);
            stack.push(left);
        }
    }

    if best < Real::INFINITY {
        Some(best)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use crate::bvh::{Bvh, NodeKind};
    use crate::error::BvhError;
    use crate::flat_bvh::{
        traverse_flat_bvh, FlatNode, FlatTriangle, FlatVertex, INTERIOR_FLAG,
    };
    use crate::testbase::{random_ray, random_soup, unit_cube, voxel_grid};
    use crate::FULL_DEPTH;
    use bytemuck::Zeroable;
    use float_eq::assert_float_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_record_sizes() {
        assert_eq!(size_of::<FlatNode>(), 32);
        assert_eq!(size_of::<FlatVertex>(), 32);
        assert_eq!(size_of::<FlatTriangle>(), 96);
        assert_eq!(INTERIOR_FLAG, -1i32 as u32);
    }

    #[test]
    fn test_flatten_mirrors_nodes() {
        let bvh = Bvh::build(&voxel_grid(3));
        let offset = 17;
        let flat = bvh.flatten(offset).unwrap();
        assert_eq!(flat.len(), bvh.nodes().len());

        for (node, flat) in bvh.nodes().iter().zip(flat.iter()) {
            assert_eq!(flat.aabb(), node.aabb);
            match node.kind {
                NodeKind::Leaf {
                    start_index,
                    triangle_count,
                } => {
                    assert!(flat.is_leaf());
                    assert_eq!(flat.start_index as usize, start_index);
                    assert_eq!(flat.triangle_count as usize, triangle_count);
                }
                NodeKind::Interior { left_child } => {
                    assert!(!flat.is_leaf());
                    assert_eq!(flat.start_index as usize, left_child + offset);
                }
            }
        }
    }

    #[test]
    fn test_flattened_data_is_packed_nodes() {
        let bvh = Bvh::build(&unit_cube());
        let data = bvh.flattened_bvh_data(0).unwrap();
        assert_eq!(data.num_nodes, bvh.nodes().len());
        assert_eq!(data.data.len(), 32 * data.num_nodes);
        assert_eq!(data.nodes(), bvh.flatten(0).unwrap());
    }

    #[test]
    fn test_offset_overflow_is_an_error() {
        let bvh = Bvh::build(&unit_cube());
        let result = bvh.flatten(u32::MAX as usize);
        assert!(matches!(
            result,
            Err(BvhError::OffsetOverflow { what: "node", .. })
        ));
        assert!(bvh.flatten(usize::MAX).is_err());
    }

    #[test]
    fn test_reordered_indices_follow_leaves() {
        let triangles = voxel_grid(2);
        let bvh = Bvh::build(&triangles);
        let indices: Vec<u32> = (0..triangles.len() as u32 * 3).collect();
        let reordered = bvh.reordered_indices(&indices).unwrap();

        assert_eq!(reordered.len(), indices.len());
        for (face, source) in reordered.chunks_exact(3).zip(bvh.triangle_order()) {
            let source = source as u32;
            assert_eq!(face, &[3 * source, 3 * source + 1, 3 * source + 2]);
        }
    }

    #[test]
    fn test_reorder_rejects_wrong_sizes() {
        let bvh = Bvh::build(&unit_cube());
        assert_eq!(
            bvh.reordered_indices(&[0, 1, 2, 3]),
            Err(BvhError::PartialTriangle(4))
        );
        assert_eq!(
            bvh.reordered_indices(&[0, 1, 2]),
            Err(BvhError::TriangleCountMismatch {
                expected: 12,
                actual: 1
            })
        );
    }

    #[test]
    fn test_flat_triangles_follow_leaves() {
        let triangles = unit_cube();
        let bvh = Bvh::build(&triangles);
        let flat = bvh.flatten_triangles(&triangles).unwrap();
        for (flat, built) in flat.iter().zip(bvh.triangles()) {
            assert_eq!(flat.position(0), built.v0);
            assert_eq!(flat.position(1), built.v1);
            assert_eq!(flat.position(2), built.v2);
        }
    }

    #[test]
    fn test_flat_traversal_matches_tree() {
        let triangles = random_soup(250, 3);
        let bvh = Bvh::build(&triangles);
        let offset = 5;
        let mut nodes = vec![FlatNode::zeroed(); offset];
        nodes.extend(bvh.flatten(offset).unwrap());
        let flat_triangles = bvh.flatten_triangles(&triangles).unwrap();

        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..100 {
            let ray = random_ray(&mut rng);
            let expected = bvh.nearest_hit(&ray, FULL_DEPTH);
            let actual = traverse_flat_bvh(&ray, &nodes, offset, &flat_triangles);
            match (expected, actual) {
                (Some(expected), Some(actual)) => assert_float_eq!(actual, expected, rmax <= 1e-5),
                (None, None) => {}
                _ => panic!("tree {:?} but flat buffers {:?}", expected, actual),
            }
        }
    }
}
