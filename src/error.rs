//! Error types for mesh validation and buffer packing.

use thiserror::Error;

/// Errors that can occur while preparing meshes and hierarchy buffers.
///
/// Building and traversing a hierarchy never fails; these errors come from malformed
/// input buffers and from buffers too large for 32-bit GPU addressing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BvhError {
    /// Index buffer length is not a multiple of three.
    #[error("index buffer of length {0} does not describe whole triangles")]
    PartialTriangle(usize),

    /// Index buffer references a vertex that does not exist.
    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Position of the offending entry in the index buffer.
        position: usize,
        /// The offending index.
        index: u32,
        /// Number of vertices of the mesh.
        vertex_count: usize,
    },

    /// A buffer to reorder does not hold as many triangles as the hierarchy was built over.
    #[error("buffer holds {actual} triangles but the hierarchy was built over {expected}")]
    TriangleCountMismatch {
        /// Triangle count of the hierarchy.
        expected: usize,
        /// Triangle count of the buffer.
        actual: usize,
    },

    /// A node or triangle offset does not fit the 32-bit indices of the GPU layout.
    #[error("{what} offset {offset} plus {count} entries exceeds the 32-bit index range")]
    OffsetOverflow {
        /// Which buffer overflowed.
        what: &'static str,
        /// The base offset.
        offset: usize,
        /// Number of entries placed after the offset.
        count: usize,
    },

    /// Per-mesh scene data does not have one entry per mesh.
    #[error("scene has {expected} meshes but {actual} material indices")]
    MaterialCountMismatch {
        /// Number of meshes.
        expected: usize,
        /// Number of material indices.
        actual: usize,
    },

    /// Per-mesh scene data does not have one transform per mesh.
    #[error("scene has {expected} meshes but {actual} transforms")]
    TransformCountMismatch {
        /// Number of meshes.
        expected: usize,
        /// Number of transforms.
        actual: usize,
    },

    /// The build configuration cannot produce a hierarchy.
    #[error("invalid build configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for hierarchy operations.
pub type Result<T> = std::result::Result<T, BvhError>;
