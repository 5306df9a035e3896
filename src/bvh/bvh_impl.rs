//! This module defines [`Bvh`] and the binned surface area heuristic build over triangle
//! meshes.

use std::fmt;

use log::{debug, trace, warn};

use crate::aabb::{Aabb, Bounded};
use crate::axis::Axis;
use crate::bvh::bucket::best_split;
use crate::bvh::{BvhNode, NodeKind};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::shapes::{BvhTriangle, Triangle};
use crate::{Real, EPSILON};

/// Anything a [`Bvh`] can be built over: an ordered collection of triangles.
///
/// The position of a triangle in [`TriangleMesh::triangles`] is its source index, the
/// number the built tree reports through [`Bvh::triangle_order`].
pub trait TriangleMesh {
    /// Number of triangles of the mesh.
    fn num_triangles(&self) -> usize;

    /// Iterates over the triangles of the mesh in source order.
    fn triangles(&self) -> impl Iterator<Item = Triangle> + '_;
}

impl TriangleMesh for [Triangle] {
    fn num_triangles(&self) -> usize {
        self.len()
    }

    fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.iter().copied()
    }
}

impl TriangleMesh for Vec<Triangle> {
    fn num_triangles(&self) -> usize {
        self.len()
    }

    fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.iter().copied()
    }
}

/// The [`Bvh`] data structure. Contains the list of [`BvhNode`]s and the built triangles.
///
/// The root is node `0`. The children of an interior node are stored next to each other,
/// and every leaf owns a contiguous range of [`Bvh::triangles`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    triangles: Vec<BvhTriangle>,
    config: BuildConfig,
}

impl Default for Bvh {
    /// The tree of a mesh without triangles: a single empty leaf.
    fn default() -> Bvh {
        Bvh {
            nodes: vec![BvhNode::leaf(Aabb::empty(), 0, 0)],
            triangles: Vec::new(),
            config: BuildConfig::default(),
        }
    }
}

impl Bvh {
    /// Creates a new [`Bvh`] from the triangles of `mesh` with the default [`BuildConfig`].
    ///
    /// # Examples
    /// ```
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
    ///
    /// assert_eq!(bvh.nodes().len(), 3);
    /// assert_eq!(bvh.leaf_count(), 2);
    /// assert_eq!(bvh.depth(), 1);
    /// ```
    pub fn build<M: TriangleMesh + ?Sized>(mesh: &M) -> Bvh {
        Bvh::build_validated(mesh, BuildConfig::default())
    }

    /// Creates a new [`Bvh`] from the triangles of `mesh` with the given parameters.
    /// Fails if `config` does not pass [`BuildConfig::validate`].
    pub fn build_with_config<M: TriangleMesh + ?Sized>(
        mesh: &M,
        config: BuildConfig,
    ) -> Result<Bvh> {
        config.validate()?;
        Ok(Bvh::build_validated(mesh, config))
    }

    /// Replaces the tree with one built over `mesh`, keeping the build parameters.
    pub fn rebuild<M: TriangleMesh + ?Sized>(&mut self, mesh: &M) {
        *self = Bvh::build_validated(mesh, self.config);
    }

    fn build_validated<M: TriangleMesh + ?Sized>(mesh: &M, config: BuildConfig) -> Bvh {
        let triangles: Vec<BvhTriangle> = mesh
            .triangles()
            .enumerate()
            .map(|(index, triangle)| BvhTriangle::new(&triangle, index))
            .collect();
        let aabb = triangles
            .iter()
            .fold(Aabb::empty(), |aabb, triangle| aabb.join(&triangle.aabb()));
        let triangle_count = triangles.len();

        // A binary tree over n leaves has at most 2n - 1 nodes.
        let mut nodes = Vec::with_capacity((2 * triangle_count).max(2) - 1);
        nodes.push(BvhNode::leaf(aabb, 0, triangle_count));

        let mut bvh = Bvh {
            nodes,
            triangles,
            config,
        };
        if triangle_count == 0 {
            warn!("building a bvh over a mesh without triangles");
            return bvh;
        }

        bvh.build_tree(0, 0, triangle_count, 0);
        debug!(
            "built bvh over {} triangles: {} nodes, {} leaves, depth {}",
            triangle_count,
            bvh.nodes.len(),
            bvh.leaf_count(),
            bvh.depth()
        );
        bvh
    }

    /// Splits the leaf `node_index` over `triangles[start..start + count]` while the
    /// surface area heuristic says that is cheaper than keeping it.
    fn build_tree(&mut self, node_index: usize, start: usize, count: usize, depth: usize) {
        if depth >= self.config.max_depth {
            if count > 1 {
                trace!(
                    "node {} forced to a leaf of {} triangles at depth {}",
                    node_index,
                    count,
                    depth
                );
            }
            return;
        }

        let aabb = self.nodes[node_index].aabb;
        let parent_cost = aabb.surface_heuristic() * count as Real;
        let triangles = &mut self.triangles[start..start + count];

        let split = match best_split(triangles, &aabb, &self.config) {
            Some(split) if split.cost < parent_cost => split,
            _ => return,
        };

        let (num_left, left_aabb, right_aabb) = partition(triangles, split.axis, split.position);
        if num_left == 0 || num_left == count {
            trace!(
                "node {} kept as a leaf, {} split at {} puts all {} triangles on one side",
                node_index,
                split.axis,
                split.position,
                count
            );
            return;
        }

        let left_child = self.nodes.len();
        self.nodes.push(BvhNode::leaf(left_aabb, start, num_left));
        self.nodes
            .push(BvhNode::leaf(right_aabb, start + num_left, count - num_left));
        self.nodes[node_index].kind = NodeKind::Interior { left_child };

        self.build_tree(left_child, start, num_left, depth + 1);
        self.build_tree(left_child + 1, start + num_left, count - num_left, depth + 1);
    }

    /// The nodes of the tree. The root is at index `0`.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// The built triangles, in leaf order.
    pub fn triangles(&self) -> &[BvhTriangle] {
        &self.triangles
    }

    /// The parameters the tree was built with.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Returns `true` if the tree was built over no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Source index of every built triangle, in leaf order.
    pub fn triangle_order(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.triangles.iter().map(|triangle| triangle.source_index)
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Depth of the deepest leaf. A tree consisting of only the root has depth `0`.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0, 0)];
        while let Some((node_index, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some((left, right)) = self.nodes[node_index].children() {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        max_depth
    }

    /// Prints the [`Bvh`] in a tree-like visualization.
    pub fn pretty_print(&self) {
        println!("{}", self);
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, node_index: usize, depth: usize) -> fmt::Result {
        let node = &self.nodes[node_index];
        let padding = " ".repeat(depth);
        match node.kind {
            NodeKind::Interior { left_child } => {
                writeln!(f, "{}node={} {}", padding, node_index, node.aabb)?;
                self.fmt_node(f, left_child, depth + 1)?;
                self.fmt_node(f, left_child + 1, depth + 1)
            }
            NodeKind::Leaf {
                start_index,
                triangle_count,
            } => writeln!(
                f,
                "{}leaf={} triangles={}..{} {}",
                padding,
                node_index,
                start_index,
                start_index + triangle_count,
                node.aabb
            ),
        }
    }

    /// Checks the structural invariants of the tree and panics if one is violated:
    /// every interior box contains its children's boxes and every leaf box its triangles,
    /// the leaves partition the built triangles into contiguous ranges, the right child of
    /// a split continues where the left one ends, and no leaf is deeper than the
    /// configured maximum depth.
    pub fn assert_consistent(&self) {
        let mut covered = vec![false; self.triangles.len()];
        // (node, depth, first triangle, triangle count) as owned by the parent.
        let mut stack = vec![(0, 0, 0, self.triangles.len())];
        while let Some((node_index, depth, start, count)) = stack.pop() {
            assert!(depth <= self.config.max_depth, "node {} is too deep", node_index);
            let node = &self.nodes[node_index];
            match node.kind {
                NodeKind::Interior { left_child } => {
                    let right_child = left_child + 1;
                    assert!(left_child > node_index && right_child < self.nodes.len());
                    let child_count = |child: usize| self.subtree_triangle_count(child);
                    let left_count = child_count(left_child);
                    assert_eq!(left_count + child_count(right_child), count);
                    for child in [left_child, right_child] {
                        assert!(
                            node.aabb.approx_contains_aabb_eps(&self.nodes[child].aabb, EPSILON),
                            "node {} does not contain child {}",
                            node_index,
                            child
                        );
                    }
                    stack.push((left_child, depth + 1, start, left_count));
                    stack.push((right_child, depth + 1, start + left_count, count - left_count));
                }
                NodeKind::Leaf {
                    start_index,
                    triangle_count,
                } => {
                    assert_eq!(start_index, start, "leaf {} starts at the wrong triangle", node_index);
                    assert_eq!(triangle_count, count);
                    for index in start_index..start_index + triangle_count {
                        assert!(!covered[index], "triangle {} is in two leaves", index);
                        covered[index] = true;
                        assert!(node
                            .aabb
                            .approx_contains_aabb_eps(&self.triangles[index].aabb, EPSILON));
                    }
                }
            }
        }
        assert!(covered.iter().all(|&covered| covered));

        let mut sources: Vec<usize> = self.triangle_order().collect();
        sources.sort_unstable();
        assert!(sources.iter().copied().eq(0..self.triangles.len()));
    }

    fn subtree_triangle_count(&self, node_index: usize) -> usize {
        match self.nodes[node_index].kind {
            NodeKind::Leaf { triangle_count, .. } => triangle_count,
            NodeKind::Interior { left_child } => {
                self.subtree_triangle_count(left_child) + self.subtree_triangle_count(left_child + 1)
            }
        }
    }
}

impl fmt::Display for Bvh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, 0, 0)
    }
}

impl Bounded for Bvh {
    fn aabb(&self) -> Aabb {
        self.nodes[0].aabb
    }
}

/// Moves the triangles whose centroid lies below `position` on `axis` to the front.
/// Returns the number of such triangles and the bounds of both halves.
fn partition(triangles: &mut [BvhTriangle], axis: Axis, position: Real) -> (usize, Aabb, Aabb) {
    let mut left_aabb = Aabb::empty();
    let mut right_aabb = Aabb::empty();
    let mut num_left = 0;
    for index in 0..triangles.len() {
        if triangles[index].center[axis] < position {
            left_aabb.join_mut(&triangles[index].aabb);
            triangles.swap(index, num_left);
            num_left += 1;
        } else {
            right_aabb.join_mut(&triangles[index].aabb);
        }
    }
    (num_left, left_aabb, right_aabb)
}
