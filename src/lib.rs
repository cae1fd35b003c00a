#![allow(incomplete_features)]
#![feature(generic_const_exprs)]

pub mod axis;
pub use axis::*;

pub mod aabb;
pub use aabb::*;

pub mod triangle;
pub use triangle::*;

pub mod obb;
pub use obb::*;

pub mod bvh;
pub use bvh::*;

pub mod obb_bvh;
pub use obb_bvh::*;

pub mod wbvh;
pub use wbvh::*;

pub mod gpu;
pub use gpu::*;
