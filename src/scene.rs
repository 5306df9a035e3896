//! Packs the hierarchies of many meshes into shared GPU buffers and picks among meshes.

use bytemuck::{Pod, Zeroable};
use log::{debug, warn};

use crate::error::{BvhError, Result};
use crate::flat_bvh::{traverse_flat_bvh, FlatNode, FlatTriangle};
use crate::mesh::Mesh;
use crate::ray::Ray;
use crate::utils::to_gpu_index;
use crate::{Matrix4, Real};

/// Per-mesh record of the instance buffer.
///
/// Matrices are column major. The mesh's root node is at `bvh_node_offset` of the node
/// buffer, and its leaf triangle ranges are relative to `triangle_offset` of the triangle
/// buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshInstance {
    /// Object to world matrix.
    pub world: [[f32; 4]; 4],
    /// World to object matrix.
    pub inverse_world: [[f32; 4]; 4],
    /// Position of the mesh's root node in the node buffer.
    pub bvh_node_offset: u32,
    /// Position of the mesh's first triangle in the triangle buffer.
    pub triangle_offset: u32,
    /// Number of triangles of the mesh.
    pub triangle_count: u32,
    /// Material of the mesh.
    pub material_index: u32,
}

/// What picking needs to know about every mesh of a scene, indexed like the meshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPickingInfo {
    /// Object to world matrices.
    pub transforms: Vec<Matrix4>,
    /// Material indices.
    pub material_indices: Vec<u32>,
}

impl MeshPickingInfo {
    /// Collects the transforms of `meshes`. Mesh `i` uses material `i`.
    pub fn new(meshes: &[Mesh]) -> MeshPickingInfo {
        MeshPickingInfo {
            transforms: meshes.iter().map(Mesh::world_matrix).collect(),
            material_indices: (0..meshes.len() as u32).collect(),
        }
    }

    /// Collects the transforms of `meshes` and pairs them with `material_indices`.
    pub fn with_materials(meshes: &[Mesh], material_indices: Vec<u32>) -> Result<MeshPickingInfo> {
        if material_indices.len() != meshes.len() {
            return Err(BvhError::MaterialCountMismatch {
                expected: meshes.len(),
                actual: material_indices.len(),
            });
        }
        Ok(MeshPickingInfo {
            transforms: meshes.iter().map(Mesh::world_matrix).collect(),
            material_indices,
        })
    }
}

/// The closest mesh hit by a picking ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Index of the mesh in the slice it was picked from.
    pub mesh_index: usize,
    /// Distance along the ray.
    pub distance: Real,
}

/// The node, triangle and instance buffers of a scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneBuffers {
    nodes: Vec<FlatNode>,
    triangles: Vec<FlatTriangle>,
    instances: Vec<MeshInstance>,
}

impl SceneBuffers {
    /// Packs `meshes`, whose hierarchies must be current. Mesh `i` uses material `i`.
    pub fn from_meshes(meshes: &[Mesh]) -> Result<SceneBuffers> {
        SceneBuffers::from_meshes_with_info(meshes, &MeshPickingInfo::new(meshes))
    }

    /// Packs `meshes` with the transforms and materials of `info`.
    pub fn from_meshes_with_info(meshes: &[Mesh], info: &MeshPickingInfo) -> Result<SceneBuffers> {
        if info.transforms.len() != meshes.len() {
            return Err(BvhError::TransformCountMismatch {
                expected: meshes.len(),
                actual: info.transforms.len(),
            });
        }
        if info.material_indices.len() != meshes.len() {
            return Err(BvhError::MaterialCountMismatch {
                expected: meshes.len(),
                actual: info.material_indices.len(),
            });
        }

        let mut scene = SceneBuffers::default();
        for (index, mesh) in meshes.iter().enumerate() {
            let node_offset = scene.nodes.len();
            let triangle_offset = scene.triangles.len();
            scene.nodes.extend(mesh.bvh().flatten(node_offset)?);
            scene.triangles.extend(mesh.flattened_triangle_data()?);

            let world = info.transforms[index];
            let inverse_world = world.try_inverse().unwrap_or_else(|| {
                warn!("mesh {} has a singular transform", index);
                Matrix4::zeros()
            });
            let triangle_count = scene.triangles.len() - triangle_offset;
            let overflow = |what, offset, count| BvhError::OffsetOverflow {
                what,
                offset,
                count,
            };
            scene.instances.push(MeshInstance {
                world: world.into(),
                inverse_world: inverse_world.into(),
                bvh_node_offset: to_gpu_index(node_offset).ok_or_else(|| {
                    overflow("node", node_offset, scene.nodes.len() - node_offset)
                })?,
                triangle_offset: to_gpu_index(triangle_offset)
                    .ok_or_else(|| overflow("triangle", triangle_offset, triangle_count))?,
                triangle_count: to_gpu_index(triangle_count)
                    .ok_or_else(|| overflow("triangle", triangle_offset, triangle_count))?,
                material_index: info.material_indices[index],
            });
        }

        debug!(
            "packed {} meshes: {} nodes, {} triangles",
            scene.instances.len(),
            scene.nodes.len(),
            scene.triangles.len()
        );
        Ok(scene)
    }

    /// All flattened nodes.
    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    /// All triangles, each mesh's in leaf order.
    pub fn triangles(&self) -> &[FlatTriangle] {
        &self.triangles
    }

    /// One record per mesh.
    pub fn instances(&self) -> &[MeshInstance] {
        &self.instances
    }

    /// The node buffer as bytes.
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// The triangle buffer as bytes.
    pub fn triangle_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// The instance buffer as bytes.
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Intersects `ray` with the packed buffers the way the GPU does: every instance moves
    /// the ray into object space and walks its tree from `bvh_node_offset`.
    pub fn nearest_hit(&self, ray: &Ray) -> Option<PickHit> {
        let mut best: Option<PickHit> = None;
        for (mesh_index, instance) in self.instances.iter().enumerate() {
            let local = ray.transform(&Matrix4::from(instance.inverse_world));
            let start = instance.triangle_offset as usize;
            let triangles = &self.triangles[start..start + instance.triangle_count as usize];
            let hit = traverse_flat_bvh(
                &local,
                &self.nodes,
                instance.bvh_node_offset as usize,
                triangles,
            );
            if let Some(distance) = hit {
                if best.map_or(true, |best| distance < best.distance) {
                    best = Some(PickHit {
                        mesh_index,
                        distance,
                    });
                }
            }
        }
        best
    }
}

/// Returns the mesh closest along the world space `ray`, with the depth cutoff of
/// [`Mesh::intersect_with_ray`].
pub fn pick(meshes: &[Mesh], ray: &Ray, depth: usize) -> Option<PickHit> {
    meshes
        .iter()
        .enumerate()
        .filter_map(|(mesh_index, mesh)| {
            let distance = mesh.intersect_with_ray(ray, depth);
            (distance >= 0.0).then_some(PickHit {
                mesh_index,
                distance,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use crate::error::BvhError;
    use crate::flat_bvh::INTERIOR_FLAG;
    use crate::mesh::Mesh;
    use crate::ray::Ray;
    use crate::scene::{pick, MeshInstance, MeshPickingInfo, SceneBuffers};
    use crate::testbase::cube_mesh;
    use crate::{Point3, Vector3, FULL_DEPTH};
    use float_eq::assert_float_eq;

    /// A unit cube at the origin and a twice as large one moved to `x = 5`.
    fn two_cubes() -> Vec<Mesh> {
        let mut near = cube_mesh(Point3::new(0.0, 0.0, 0.0), 1.0);
        near.compute_bvh();
        let mut far = cube_mesh(Point3::new(0.0, 0.0, 0.0), 1.0);
        far.compute_bvh();
        far.set_scale(Vector3::new(2.0, 2.0, 2.0));
        far.set_translation(Vector3::new(5.0, 0.0, 0.0));
        vec![near, far]
    }

    fn along_x(y: f32, z: f32) -> Ray {
        Ray::new(Point3::new(-10.0, y, z), Vector3::new(1.0, 0.0, 0.0))
    }

    #[test]
    fn test_instance_size() {
        assert_eq!(size_of::<MeshInstance>(), 144);
    }

    #[test]
    fn test_offsets_address_each_mesh() {
        let meshes = two_cubes();
        let scene = SceneBuffers::from_meshes(&meshes).unwrap();
        let instances = scene.instances();
        assert_eq!(instances.len(), 2);

        let first_nodes = meshes[0].bvh().nodes().len();
        assert_eq!(instances[0].bvh_node_offset, 0);
        assert_eq!(instances[1].bvh_node_offset as usize, first_nodes);
        assert_eq!(instances[0].triangle_offset, 0);
        assert_eq!(instances[1].triangle_offset, 12);
        assert_eq!(instances[1].triangle_count, 12);
        assert_eq!(instances[1].material_index, 1);

        for node in &scene.nodes()[first_nodes..] {
            if node.triangle_count == INTERIOR_FLAG {
                assert!(node.start_index as usize > first_nodes);
            }
        }

        assert_eq!(scene.node_bytes().len(), 32 * scene.nodes().len());
        assert_eq!(scene.triangle_bytes().len(), 96 * 24);
        assert_eq!(scene.instance_bytes().len(), 144 * 2);
    }

    #[test]
    fn test_pick_returns_nearest_mesh() {
        let meshes = two_cubes();
        let hit = pick(&meshes, &along_x(0.3, 0.6), FULL_DEPTH).unwrap();
        assert_eq!(hit.mesh_index, 0);
        assert_float_eq!(hit.distance, 10.0, abs <= 1e-5);

        // Above the unit cube, still inside the scaled one.
        let hit = pick(&meshes, &along_x(1.5, 0.6), FULL_DEPTH).unwrap();
        assert_eq!(hit.mesh_index, 1);
        assert_float_eq!(hit.distance, 15.0, abs <= 1e-5);

        assert_eq!(pick(&meshes, &along_x(3.0, 0.6), FULL_DEPTH), None);
    }

    #[test]
    fn test_packed_buffers_agree_with_pick() {
        let meshes = two_cubes();
        let scene = SceneBuffers::from_meshes(&meshes).unwrap();
        for (y, z) in [(0.3, 0.6), (1.5, 0.6), (1.2, 1.7), (3.0, 0.6)] {
            let ray = along_x(y, z);
            let expected = pick(&meshes, &ray, FULL_DEPTH);
            let actual = scene.nearest_hit(&ray);
            assert_eq!(expected.map(|hit| hit.mesh_index), actual.map(|hit| hit.mesh_index));
            if let (Some(expected), Some(actual)) = (expected, actual) {
                assert_float_eq!(expected.distance, actual.distance, abs <= 1e-4);
            }
        }
    }

    #[test]
    fn test_stale_bvh_is_an_error() {
        let mut meshes = two_cubes();
        meshes.push(cube_mesh(Point3::new(0.0, 0.0, 0.0), 1.0));
        assert!(matches!(
            SceneBuffers::from_meshes(&meshes),
            Err(BvhError::TriangleCountMismatch { .. })
        ));
    }

    #[test]
    fn test_scene_info_must_match_meshes() {
        let meshes = two_cubes();
        assert_eq!(
            MeshPickingInfo::with_materials(&meshes, vec![4]),
            Err(BvhError::MaterialCountMismatch {
                expected: 2,
                actual: 1
            })
        );

        let mut info = MeshPickingInfo::new(&meshes);
        info.transforms.pop();
        assert_eq!(
            SceneBuffers::from_meshes_with_info(&meshes, &info),
            Err(BvhError::TransformCountMismatch {
                expected: 2,
                actual: 1
            })
        );
        let mut info = MeshPickingInfo::new(&meshes);
        info.material_indices.push(2);
        assert_eq!(
            SceneBuffers::from_meshes_with_info(&meshes, &info),
            Err(BvhError::MaterialCountMismatch {
                expected: 2,
                actual: 3
            })
        );

        let info = MeshPickingInfo::with_materials(&meshes, vec![7, 3]).unwrap();
        let scene = SceneBuffers::from_meshes_with_info(&meshes, &info).unwrap();
        assert_eq!(scene.instances()[0].material_index, 7);
        assert_eq!(scene.instances()[1].material_index, 3);
    }
}
