//! An indexed triangle mesh with a world transform and its [`Bvh`].

use log::warn;

use crate::bvh::{Bvh, TriangleMesh, WireframeGeometry};
use crate::config::BuildConfig;
use crate::error::{BvhError, Result};
use crate::flat_bvh::{FlatTriangle, FlattenedBvh};
use crate::ray::Ray;
use crate::shapes::Triangle;
use crate::{Matrix4, Quat, Real, Vector3, NO_HIT};

pub use crate::shapes::Vertex;

/// Placement of a mesh in the world: scale first, then rotation, then translation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    /// Offset of the object space origin.
    pub translation: Vector3,
    /// Orientation.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vector3,
}

impl Default for Transform {
    fn default() -> Transform {
        Transform {
            translation: Vector3::zeros(),
            rotation: Quat::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// The object to world matrix `T * R * S`.
    pub fn matrix(&self) -> Matrix4 {
        Matrix4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

/// Validates an index buffer against `vertex_count` vertices.
fn check_indices(indices: &[u32], vertex_count: usize) -> Result<()> {
    if indices.len() % 3 != 0 {
        return Err(BvhError::PartialTriangle(indices.len()));
    }
    match indices
        .iter()
        .position(|&index| index as usize >= vertex_count)
    {
        Some(position) => Err(BvhError::IndexOutOfRange {
            position,
            index: indices[position],
            vertex_count,
        }),
        None => Ok(()),
    }
}

/// A triangle mesh given by vertices and a `u32` index buffer with three indices per
/// triangle. The mesh owns one [`Bvh`], which is empty until [`Mesh::compute_bvh`] is
/// called.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    transform: Transform,
    bvh: Bvh,
}

impl Mesh {
    /// Creates a mesh at the world origin. Fails if `indices` does not describe whole
    /// triangles or references a vertex outside `vertices`.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::mesh::{Mesh, Vertex};
    /// use mesh_bvh::{BvhError, Point3};
    ///
    /// let vertices = vec![
    ///     Vertex::from_position(Point3::new(0.0, 0.0, 0.0)),
    ///     Vertex::from_position(Point3::new(1.0, 0.0, 0.0)),
    ///     Vertex::from_position(Point3::new(0.0, 1.0, 0.0)),
    /// ];
    /// assert!(Mesh::new(vertices.clone(), vec![0, 1, 2]).is_ok());
    /// assert_eq!(
    ///     Mesh::new(vertices, vec![0, 1, 3]),
    ///     Err(BvhError::IndexOutOfRange { position: 2, index: 3, vertex_count: 3 })
    /// );
    /// ```
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Mesh> {
        check_indices(&indices, vertices.len())?;
        Ok(Mesh {
            vertices,
            indices,
            transform: Transform::default(),
            bvh: Bvh::default(),
        })
    }

    /// Replaces the geometry. The [`Bvh`] is reset to the empty tree.
    pub fn set_geometry(&mut self, vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<()> {
        check_indices(&indices, vertices.len())?;
        self.vertices = vertices;
        self.indices = indices;
        self.bvh = Bvh::default();
        Ok(())
    }

    /// The vertices.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The index buffer in its original order.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// The current [`Bvh`].
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Builds the [`Bvh`] with the default [`BuildConfig`], replacing the previous one.
    pub fn compute_bvh(&mut self) {
        self.bvh = Bvh::build(&*self);
    }

    /// Builds the [`Bvh`] with `config`, replacing the previous one.
    pub fn compute_bvh_with(&mut self, config: BuildConfig) -> Result<()> {
        self.bvh = Bvh::build_with_config(&*self, config)?;
        Ok(())
    }

    /// Line list of the [`Bvh`] boxes visible at `depth`.
    /// See [`Bvh::wireframe_geometry`].
    pub fn bvh_geometry(&self, depth: usize) -> WireframeGeometry {
        self.bvh.wireframe_geometry(depth)
    }

    /// The flattened [`Bvh`], with child links shifted by `node_offset`.
    pub fn flattened_bvh_data(&self, node_offset: usize) -> Result<FlattenedBvh> {
        self.bvh.flattened_bvh_data(node_offset)
    }

    /// The index buffer in leaf order. Fails if the [`Bvh`] is out of date.
    pub fn reordered_index_data_32(&self) -> Result<Vec<u32>> {
        self.bvh.reordered_indices(&self.indices)
    }

    /// The triangles in leaf order, packed for upload. Fails if the [`Bvh`] is out of date.
    pub fn flattened_triangle_data(&self) -> Result<Vec<FlatTriangle>> {
        let triangles: Vec<Triangle> = self.triangles().collect();
        self.bvh.flatten_triangles(&triangles)
    }

    /// Distance along `world_ray` to the closest triangle, or [`NO_HIT`].
    ///
    /// The ray is moved into object space with the inverse world matrix, so the distance
    /// is measured in units of `world_ray`'s direction. See [`Bvh::nearest_hit`] for the
    /// meaning of `depth`.
    pub fn intersect_with_ray(&self, world_ray: &Ray, depth: usize) -> Real {
        match self.inverse_world_matrix() {
            Some(inverse) => self.bvh.traverse(&world_ray.transform(&inverse), depth),
            None => {
                warn!("mesh transform is not invertible, ray cannot hit it");
                NO_HIT
            }
        }
    }

    /// The object to world matrix.
    pub fn world_matrix(&self) -> Matrix4 {
        self.transform.matrix()
    }

    /// The world to object matrix, or `None` if the world matrix is singular.
    pub fn inverse_world_matrix(&self) -> Option<Matrix4> {
        self.world_matrix().try_inverse()
    }

    /// The placement of the mesh.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Replaces the placement of the mesh.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Moves the mesh.
    pub fn set_translation(&mut self, translation: Vector3) {
        self.transform.translation = translation;
    }

    /// Orients the mesh.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    /// Scales the mesh.
    pub fn set_scale(&mut self, scale: Vector3) {
        self.transform.scale = scale;
    }
}

impl TriangleMesh for Mesh {
    fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.chunks_exact(3).map(|face| {
            Triangle::new(
                self.vertices[face[0] as usize],
                self.vertices[face[1] as usize],
                self.vertices[face[2] as usize],
            )
        })
    }
}
