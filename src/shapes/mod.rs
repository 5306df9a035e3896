//! Geometric primitives the hierarchy is built over.
pub mod triangle;

pub use self::triangle::*;
