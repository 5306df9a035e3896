//! A crate which builds binary bounding volume hierarchies over triangle meshes,
//! flattens them for GPU consumption and answers picking queries against them.
//!
//! ## About
//!
//! A [`Bvh`] is built over the triangle soup of a mesh with a binned surface area
//! heuristic. The nodes live in one array (the root is node `0`, the children of an
//! interior node are stored next to each other) and the triangles are partitioned in
//! place, so every leaf owns a contiguous range of the built triangle array. That layout
//! is what a compute or fragment shader wants: the tree can be uploaded as a flat
//! buffer of [`FlatNode`]s, and the mesh's index buffer can be reordered so that a
//! leaf's `(start_index, triangle_count)` pair directly slices the uploaded geometry.
//!
//! On the CPU the same tree answers nearest-hit queries for mouse picking and emits
//! line-list wireframes of its boxes for debug drawing.
//!
//! ## Example
//!
//! ```
//! use mesh_bvh::mesh::{Mesh, Vertex};
//! use mesh_bvh::ray::Ray;
//! use mesh_bvh::{Point3, Vector3, FULL_DEPTH};
//!
//! let vertices = vec![
//!     Vertex::from_position(Point3::new(0.0, 0.0, 0.0)),
//!     Vertex::from_position(Point3::new(1.0, 0.0, 0.0)),
//!     Vertex::from_position(Point3::new(1.0, 1.0, 0.0)),
//!     Vertex::from_position(Point3::new(0.0, 1.0, 0.0)),
//! ];
//! let mut mesh = Mesh::new(vertices, vec![0, 1, 2, 0, 2, 3]).unwrap();
//! mesh.compute_bvh();
//!
//! let ray = Ray::new(Point3::new(0.25, 0.5, 2.0), Vector3::new(0.0, 0.0, -1.0));
//! let distance = mesh.intersect_with_ray(&ray, FULL_DEPTH);
//! assert!((distance - 2.0).abs() < 1e-5);
//!
//! let nodes = mesh.flattened_bvh_data(0).unwrap();
//! assert_eq!(nodes.num_nodes, 1);
//! ```
//!
//! ## Features
//!
//! - `serde` (default **disabled**) - adds `Serialize` and `Deserialize` implementations for
//!   the configuration and the data model.
//!

/// Point math type used by this crate.
pub type Point3 = nalgebra::Point3<f32>;

/// Vector math type used by this crate.
pub type Vector3 = nalgebra::Vector3<f32>;

/// Texture coordinate type used by this crate.
pub type Vector2 = nalgebra::Vector2<f32>;

/// Matrix math type used by this crate.
pub type Matrix4 = nalgebra::Matrix4<f32>;

/// Rotation type used by this crate.
pub type Quat = nalgebra::UnitQuaternion<f32>;

/// Float type used by this crate.
pub type Real = f32;

/// A minimal floating value used as a lower bound.
pub const EPSILON: Real = 0.00001;

/// Depth limit that never prunes anything. Pass it to the traversal and wireframe
/// queries to get the full detail of the tree.
pub const FULL_DEPTH: usize = usize::MAX;

/// Distance reported by [`Bvh::traverse`] and [`mesh::Mesh::intersect_with_ray`]
/// when the ray hits nothing.
pub const NO_HIT: Real = -1.0;

pub mod aabb;
pub mod axis;
pub mod bvh;
pub mod config;
pub mod error;
pub mod flat_bvh;
pub mod mesh;
pub mod ray;
pub mod scene;
pub mod shapes;
mod utils;

#[cfg(test)]
mod testbase;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

pub use crate::bvh::{Bvh, BvhNode, NodeKind, TriangleMesh};
pub use crate::config::BuildConfig;
pub use crate::error::{BvhError, Result};
pub use crate::flat_bvh::{FlatNode, FlattenedBvh};
