//! Debug line geometry of the boxes of a [`Bvh`].

use crate::aabb::Aabb;
use crate::bvh::{Bvh, NodeKind};

/// A line list: every pair of consecutive vertices is one line segment.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireframeGeometry {
    /// Three floats per vertex.
    pub vertex_data: Vec<f32>,

    /// Number of vertices in `vertex_data`.
    pub count: usize,
}

impl WireframeGeometry {
    /// Appends the twelve edges of `aabb`. Empty boxes are skipped.
    fn push_aabb(&mut self, aabb: &Aabb) {
        if aabb.is_empty() {
            return;
        }
        for (start, end) in aabb.edges() {
            self.vertex_data.extend_from_slice(start.coords.as_slice());
            self.vertex_data.extend_from_slice(end.coords.as_slice());
            self.count += 2;
        }
    }
}

impl Bvh {
    /// Returns the edges of the boxes visible at `max_depth` as a line list.
    ///
    /// Leaves at or above `max_depth` are drawn, as are interior nodes sitting exactly at
    /// `max_depth`, whose subtrees are cut off. `0` draws only the root box and
    /// [`FULL_DEPTH`](crate::FULL_DEPTH) draws every leaf.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::shapes::Triangle;
    /// use mesh_bvh::{Bvh, Point3, FULL_DEPTH};
    ///
    /// let triangles = vec![Triangle::from_positions(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 1.0),
    /// )];
    /// let bvh = Bvh::build(&triangles);
    /// let lines = bvh.wireframe_geometry(FULL_DEPTH);
    ///
    /// assert_eq!(lines.count, 24);
    /// assert_eq!(lines.vertex_data.len(), 72);
    /// ```
    pub fn wireframe_geometry(&self, max_depth: usize) -> WireframeGeometry {
        let mut geometry = WireframeGeometry::default();
        let mut stack = vec![(0, 0)];
        while let Some((node_index, depth)) = stack.pop() {
            let node = &self.nodes()[node_index];
            match node.kind {
                NodeKind::Interior { left_child } if depth < max_depth => {
                    stack.push((left_child + 1, depth + 1));
                    stack.push((left_child, depth + 1));
                }
                _ => geometry.push_aabb(&node.aabb),
            }
        }
        geometry
    }
}
