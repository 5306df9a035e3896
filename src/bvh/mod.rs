//! This module defines a [`Bvh`], its nodes and the queries it answers.

mod bucket;
mod bvh_impl;
mod bvh_node;
mod traverse;
mod wireframe;

pub use self::bucket::{Bin, Split};
pub use self::bvh_impl::*;
pub use self::bvh_node::*;
pub use self::wireframe::*;
