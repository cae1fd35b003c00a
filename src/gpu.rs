use bytemuck::{Pod, Zeroable};

use crate::{BVHNode, Triangle, BVH};

/// GPU-buffer mirror of a [`BVHNode`]: 48 bytes, the two box corners packed
/// against the range fields so a traversal kernel loads each as one vec4.
/// `hit`/`miss` drive the stackless walk, `parent` rides along for kernels
/// that need ancestor access.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuNode {
    pub min: [f32; 3],
    pub start: u32,
    pub max: [f32; 3],
    pub size: u32,
    pub hit: i32,
    pub miss: i32,
    pub parent: i32,
    pub _pad: u32,
}

impl From<&BVHNode> for GpuNode {
    fn from(node: &BVHNode) -> Self {
        Self {
            min: node.aabb.min.to_array(),
            start: node.start,
            max: node.aabb.max.to_array(),
            size: node.size,
            hit: node.hit,
            miss: node.miss,
            parent: node.parent,
            _pad: 0,
        }
    }
}

/// GPU-buffer mirror of a [`Triangle`]: three vec4-strided vertex positions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuTriangle {
    pub vertex0: [f32; 3],
    pub _pad0: u32,
    pub vertex1: [f32; 3],
    pub _pad1: u32,
    pub vertex2: [f32; 3],
    pub _pad2: u32,
}

impl From<&Triangle> for GpuTriangle {
    fn from(tri: &Triangle) -> Self {
        Self {
            vertex0: tri.vertex0.to_array(),
            _pad0: 0,
            vertex1: tri.vertex1.to_array(),
            _pad1: 0,
            vertex2: tri.vertex2.to_array(),
            _pad2: 0,
        }
    }
}

impl BVH {
    /// Nodes re-encoded for upload; `bytemuck::cast_slice` turns the result
    /// into the raw bytes a buffer write expects.
    pub fn pack_nodes(&self) -> Vec<GpuNode> {
        self.nodes().iter().map(GpuNode::from).collect()
    }

    /// Reordered triangles re-encoded for upload, matching the packed nodes'
    /// leaf ranges.
    pub fn pack_triangles(&self) -> Vec<GpuTriangle> {
        self.triangles().iter().map(GpuTriangle::from).collect()
    }
}
