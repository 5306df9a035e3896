use crate::aabb::{Aabb, Bounded};

/// What a [`BvhNode`] points at.
///
/// Interior nodes only store the index of their left child. The right child always
/// follows it directly in the node array.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// Leaf node owning the triangles `start_index..start_index + triangle_count` of the
    /// built triangle array.
    Leaf {
        /// First triangle of the leaf.
        start_index: usize,

        /// Number of triangles in the leaf.
        triangle_count: usize,
    },
    /// Interior node with two children.
    Interior {
        /// Index of the left child. The right child is at `left_child + 1`.
        left_child: usize,
    },
}

/// A node of a [`Bvh`]: the box enclosing every triangle below it and what it points at.
///
/// [`Bvh`]: crate::bvh::Bvh
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BvhNode {
    /// Bounds of all triangles in the subtree.
    pub aabb: Aabb,

    /// Leaf range or child link.
    pub kind: NodeKind,
}

impl BvhNode {
    /// Creates a leaf node over `triangle_count` triangles starting at `start_index`.
    pub fn leaf(aabb: Aabb, start_index: usize, triangle_count: usize) -> BvhNode {
        BvhNode {
            aabb,
            kind: NodeKind::Leaf {
                start_index,
                triangle_count,
            },
        }
    }

    /// Returns `true` if the node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Returns the indices of the two children, or `None` for a leaf.
    pub fn children(&self) -> Option<(usize, usize)> {
        match self.kind {
            NodeKind::Interior { left_child } => Some((left_child, left_child + 1)),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Returns the triangle range of a leaf, or `None` for an interior node.
    pub fn triangle_range(&self) -> Option<std::ops::Range<usize>> {
        match self.kind {
            NodeKind::Leaf {
                start_index,
                triangle_count,
            } => Some(start_index..start_index + triangle_count),
            NodeKind::Interior { .. } => None,
        }
    }
}

impl Bounded for BvhNode {
    fn aabb(&self) -> Aabb {
        self.aabb
    }
}
