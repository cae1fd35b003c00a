extern crate glam;
use glam::Vec3A;

use strum::IntoEnumIterator;

use crate::{partition_by_centroid, Axis, Triangle, EXTENT_EPSILON, NUM_BUCKETS, OBB};

/// A node of the oriented hierarchy. Same range/child layout as
/// [`crate::BVHNode`] but bounded by an [`OBB`]; this variant is not threaded
/// for stackless traversal, so it carries no hit/miss links.
#[derive(Debug, Clone, Copy)]
pub struct OBBBVHNode {
    pub obb: OBB,
    pub start: u32,
    pub size: u32,
    pub left: u32,
    pub right: u32,
    pub parent: i32,
}

impl OBBBVHNode {
    fn new(obb: OBB, start: u32, size: u32) -> Self {
        Self {
            obb,
            start,
            size,
            left: 0,
            right: 0,
            parent: -1,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left == self.right
    }
}

struct SplitCandidate {
    axis: Axis,
    position: f32,
    l_obb: OBB,
    r_obb: OBB,
}

/// BVH variant that bounds each node with a PCA-fit oriented box instead of
/// an axis-aligned one. The split search mirrors [`crate::BVH`] — same bucket
/// scheme, same cost formula, same fallback — but every candidate is costed
/// by fitting fresh oriented boxes over the vertex sets of its two sides.
///
/// Bucketing projects centroids against the axis-aligned box of the node's
/// OBB rather than the OBB's local frame, matching the behavior of the
/// axis-aligned builder bucket for bucket.
#[derive(Debug, Default)]
pub struct OBBBVH {
    triangles: Vec<Triangle>,
    nodes: Vec<OBBBVHNode>,
}

impl OBBBVH {
    /// Rebuild from a vertex array and index triples, discarding any prior
    /// tree. The root box is fit by PCA over every triangle vertex.
    pub fn build(&mut self, vertices: &[Vec3A], indices: &[u32], max_leaf_size: u32) {
        self.triangles.clear();
        self.nodes.clear();

        self.triangles.reserve(indices.len() / 3);
        for tri in indices.chunks_exact(3) {
            self.triangles.push(Triangle::new(
                vertices[tri[0] as usize],
                vertices[tri[1] as usize],
                vertices[tri[2] as usize],
            ));
        }

        if self.triangles.is_empty() {
            return;
        }

        let points: Vec<Vec3A> = self
            .triangles
            .iter()
            .flat_map(|tri| [tri.vertex0, tri.vertex1, tri.vertex2])
            .collect();
        let obb = OBB::fit_pca(&points);

        self.nodes
            .push(OBBBVHNode::new(obb, 0, self.triangles.len() as u32));
        self.build_rec(0, max_leaf_size.max(1));
        self.build_parents(0);
    }

    fn build_rec(&mut self, n: usize, max_leaf_size: u32) {
        let node = self.nodes[n];
        if node.size <= max_leaf_size {
            return;
        }

        let range = node.start as usize..(node.start + node.size) as usize;
        let (l_obb, r_obb, l_size) = match self.find_split(&node) {
            Some(split) => {
                let l_size =
                    partition_by_centroid(&mut self.triangles[range], split.axis, split.position);
                if l_size > 0 && l_size < node.size {
                    (split.l_obb, split.r_obb, l_size)
                } else {
                    (node.obb, node.obb, node.size / 2)
                }
            }
            None => (node.obb, node.obb, node.size / 2),
        };

        let left = self.nodes.len();
        self.nodes.push(OBBBVHNode::new(l_obb, node.start, l_size));
        let right = self.nodes.len();
        self.nodes
            .push(OBBBVHNode::new(r_obb, node.start + l_size, node.size - l_size));

        self.nodes[n].left = left as u32;
        self.nodes[n].right = right as u32;

        self.build_rec(left, max_leaf_size);
        self.build_rec(right, max_leaf_size);
    }

    /// Scan all three axes for the cheapest split, fitting candidate oriented
    /// boxes over the concatenated per-bucket vertex sets. Candidates whose
    /// fit comes back invalid are discarded.
    fn find_split(&self, node: &OBBBVHNode) -> Option<SplitCandidate> {
        let num_buckets = NUM_BUCKETS.min(node.size as usize);
        let start = node.start as usize;
        let end = start + node.size as usize;

        let bounds = node.obb.aabb();
        let mut best: Option<SplitCandidate> = None;
        let mut best_cost = node.obb.surface_area() * node.size as f32;

        for axis in Axis::iter() {
            let axis_min = bounds.min[axis];
            let axis_extent = bounds.extent()[axis];
            if axis_extent < EXTENT_EPSILON {
                continue;
            }

            let mut counts = [0u32; NUM_BUCKETS];
            let mut points: [Vec<Vec3A>; NUM_BUCKETS] = std::array::from_fn(|_| Vec::new());
            let scale = num_buckets as f32 / axis_extent;
            for tri in &self.triangles[start..end] {
                let slot =
                    (((tri.centroid[axis] - axis_min) * scale) as usize).min(num_buckets - 1);
                counts[slot] += 1;
                points[slot].extend([tri.vertex0, tri.vertex1, tri.vertex2]);
            }

            for boundary in 1..num_buckets {
                let l_points = points[..boundary].concat();
                let r_points = points[boundary..num_buckets].concat();
                let l_obb = OBB::fit_pca(&l_points);
                let r_obb = OBB::fit_pca(&r_points);
                if !l_obb.valid() || !r_obb.valid() {
                    continue;
                }

                let l_count: u32 = counts[..boundary].iter().sum();
                let r_count: u32 = counts[boundary..num_buckets].iter().sum();
                let cost =
                    l_count as f32 * l_obb.surface_area() + r_count as f32 * r_obb.surface_area();
                if cost < best_cost {
                    best_cost = cost;
                    best = Some(SplitCandidate {
                        axis,
                        position: axis_min + boundary as f32 * (axis_extent / num_buckets as f32),
                        l_obb,
                        r_obb,
                    });
                }
            }
        }

        best
    }

    /// Write `parent` on every node below `n`; the root keeps -1.
    fn build_parents(&mut self, n: usize) {
        let node = self.nodes[n];
        if !node.is_leaf() {
            self.nodes[node.left as usize].parent = n as i32;
            self.nodes[node.right as usize].parent = n as i32;
            self.build_parents(node.left as usize);
            self.build_parents(node.right as usize);
        }
    }

    /// Nodes in build order, node 0 being the root
    #[inline]
    pub fn nodes(&self) -> &[OBBBVHNode] {
        &self.nodes
    }

    /// Triangles reordered to match the leaf ranges
    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Root bounding volume; the invalid fit when no triangles were built
    #[inline]
    pub fn bounds(&self) -> OBB {
        self.nodes
            .first()
            .map(|node| node.obb)
            .unwrap_or(OBB::INVALID)
    }
}
