extern crate glam;
use glam::Vec3A;

use strum::IntoEnumIterator;

use crate::{Axis, Triangle, AABB, EXTENT_EPSILON};

/// Maximum number of SAH candidate buckets per axis. Nodes with fewer
/// primitives than this use one bucket per primitive.
pub const NUM_BUCKETS: usize = 24;

/// A node of the binary hierarchy. `start`/`size` address the owning
/// [`BVH`]'s triangle array; `left`/`right` are node indices and a node is a
/// leaf iff `left == right` (both stay 0 when no children are created).
/// `hit`/`miss`/`parent` are backfilled by the link and parent passes and
/// use -1 as the "no node" sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BVHNode {
    pub aabb: AABB,
    pub start: u32,
    pub size: u32,
    pub left: u32,
    pub right: u32,
    pub hit: i32,
    pub miss: i32,
    pub parent: i32,
}

impl BVHNode {
    fn new(aabb: AABB, start: u32, size: u32) -> Self {
        Self {
            aabb,
            start,
            size,
            left: 0,
            right: 0,
            hit: -1,
            miss: -1,
            parent: -1,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left == self.right
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    bounds: AABB,
    count: u32,
}

struct SplitCandidate {
    axis: Axis,
    position: f32,
    l_aabb: AABB,
    r_aabb: AABB,
}

/// Binary BVH over a triangle mesh, built with binned SAH partitioning.
///
/// The builder owns its triangle array exclusively and reorders it in place
/// while splitting, so leaf ranges index the reordered array directly. Node 0
/// is always the root; an empty mesh leaves both arrays empty and callers
/// must check the node count before touching the root.
#[derive(Debug, Default)]
pub struct BVH {
    triangles: Vec<Triangle>,
    nodes: Vec<BVHNode>,
}

impl BVH {
    /// Rebuild the hierarchy from a vertex array and index triples. Any prior
    /// tree is discarded. `max_leaf_size` of 0 behaves as 1: a single
    /// remaining primitive always terminates in a leaf.
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

        let mut aabb = AABB::default();
        for tri in &self.triangles {
            aabb.grow_aabb(&tri.aabb());
        }

        self.nodes
            .push(BVHNode::new(aabb, 0, self.triangles.len() as u32));
        self.build_rec(0, max_leaf_size.max(1));
        self.build_links(0, -1);
        self.build_parents(0);
    }

    fn build_rec(&mut self, n: usize, max_leaf_size: u32) {
        let node = self.nodes[n];
        if node.size <= max_leaf_size {
            return;
        }

        let range = node.start as usize..(node.start + node.size) as usize;
        let (l_aabb, r_aabb, l_size) = match self.find_split(&node) {
            Some(split) => {
                let l_size =
                    partition_by_centroid(&mut self.triangles[range], split.axis, split.position);
                if l_size > 0 && l_size < node.size {
                    (split.l_aabb, split.r_aabb, l_size)
                } else {
                    // SAH predicted both sides non-empty but the partition
                    // disagreed; fall back to the positional half split
                    (node.aabb, node.aabb, node.size / 2)
                }
            }
            // No profitable split on any axis; the positional half split
            // keeps the recursion terminating on degenerate input
            None => (node.aabb, node.aabb, node.size / 2),
        };

        let left = self.nodes.len();
        self.nodes.push(BVHNode::new(l_aabb, node.start, l_size));
        let right = self.nodes.len();
        self.nodes
            .push(BVHNode::new(r_aabb, node.start + l_size, node.size - l_size));

        self.nodes[n].left = left as u32;
        self.nodes[n].right = right as u32;

        self.build_rec(left, max_leaf_size);
        self.build_rec(right, max_leaf_size);
    }

    /// Scan all three axes for the cheapest bucketed SAH split. Returns
    /// `None` when every candidate costs at least as much as not splitting.
    fn find_split(&self, node: &BVHNode) -> Option<SplitCandidate> {
        let num_buckets = NUM_BUCKETS.min(node.size as usize);
        let start = node.start as usize;
        let end = start + node.size as usize;

        let mut best: Option<SplitCandidate> = None;
        let mut best_cost = node.aabb.surface_area() * node.size as f32;

        for axis in Axis::iter() {
            let axis_min = node.aabb.min[axis];
            let axis_extent = node.aabb.extent()[axis];
            if axis_extent < EXTENT_EPSILON {
                continue;
            }

            let mut buckets = [Bucket::default(); NUM_BUCKETS];
            let scale = num_buckets as f32 / axis_extent;
            for tri in &self.triangles[start..end] {
                let slot =
                    (((tri.centroid[axis] - axis_min) * scale) as usize).min(num_buckets - 1);
                buckets[slot].count += 1;
                buckets[slot].bounds.grow_aabb(&tri.aabb());
            }

            let mut left_bounds = [AABB::default(); NUM_BUCKETS];
            let mut left_count = [0u32; NUM_BUCKETS];
            let mut right_bounds = [AABB::default(); NUM_BUCKETS];
            let mut right_count = [0u32; NUM_BUCKETS];

            let mut bounds = AABB::default();
            let mut count = 0;
            for i in 0..num_buckets {
                count += buckets[i].count;
                bounds.grow_aabb(&buckets[i].bounds);
                left_count[i] = count;
                left_bounds[i] = bounds;
            }

            bounds = AABB::default();
            count = 0;
            for i in (0..num_buckets).rev() {
                count += buckets[i].count;
                bounds.grow_aabb(&buckets[i].bounds);
                right_count[i] = count;
                right_bounds[i] = bounds;
            }

            for boundary in 1..num_buckets {
                if left_count[boundary - 1] == 0 || right_count[boundary] == 0 {
                    continue;
                }
                let cost = left_count[boundary - 1] as f32
                    * left_bounds[boundary - 1].surface_area()
                    + right_count[boundary] as f32 * right_bounds[boundary].surface_area();
                if cost < best_cost {
                    best_cost = cost;
                    best = Some(SplitCandidate {
                        axis,
                        position: axis_min + boundary as f32 * (axis_extent / num_buckets as f32),
                        l_aabb: left_bounds[boundary - 1],
                        r_aabb: right_bounds[boundary],
                    });
                }
            }
        }

        best
    }

    /// Thread the tree for stackless traversal: `hit` continues inside the
    /// subtree, `miss` skips it. A leaf continues at the same successor
    /// either way. The root call passes `next_right = -1`.
    fn build_links(&mut self, n: usize, next_right: i32) {
        let node = self.nodes[n];
        if node.is_leaf() {
            self.nodes[n].hit = next_right;
            self.nodes[n].miss = next_right;
        } else {
            self.nodes[n].hit = node.left as i32;
            self.nodes[n].miss = next_right;
            self.build_links(node.left as usize, node.right as i32);
            self.build_links(node.right as usize, next_right);
        }
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
    pub fn nodes(&self) -> &[BVHNode] {
        &self.nodes
    }

    /// Triangles reordered to match the leaf ranges
    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Root bounding box; the empty box when no triangles were built
    #[inline]
    pub fn bounds(&self) -> AABB {
        self.nodes.first().map(|node| node.aabb).unwrap_or_default()
    }
}

/// Two-pointer in-place partition of a triangle range: centroids left of
/// `position` on `axis` move to the front. Returns the left-side count. Both
/// builders route their winning splits through this, it is a range partition,
/// not a sort.
pub(crate) fn partition_by_centroid(triangles: &mut [Triangle], axis: Axis, position: f32) -> u32 {
    // j might go below 0 in the case i == 0
    let mut i = 0isize;
    let mut j = triangles.len() as isize - 1;
    while i <= j {
        if triangles[i as usize].centroid[axis] < position {
            i += 1;
        } else {
            triangles.swap(i as usize, j as usize);
            j -= 1;
        }
    }

    i as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    use glam::Vec3A;

    use rand::{thread_rng, Rng};

    fn random_mesh(triangle_count: usize) -> (Vec<Vec3A>, Vec<u32>) {
        let mut rng = thread_rng();
        let vertices: Vec<Vec3A> = (0..triangle_count * 3)
            .map(|_| rng.gen::<Vec3A>() * 10.0 - Vec3A::splat(5.0))
            .collect();
        let indices: Vec<u32> = (0..vertices.len() as u32).collect();
        (vertices, indices)
    }

    fn leaf_ranges_of(bvh: &BVH) -> Vec<(u32, u32)> {
        let mut ranges: Vec<(u32, u32)> = bvh
            .nodes()
            .iter()
            .filter(|node| node.is_leaf())
            .map(|node| (node.start, node.size))
            .collect();
        ranges.sort_unstable();
        ranges
    }

    fn assert_covers_all(bvh: &BVH) {
        let mut next = 0;
        for (start, size) in leaf_ranges_of(bvh) {
            assert_eq!(start, next, "gap or overlap in leaf ranges");
            assert!(size >= 1);
            next = start + size;
        }
        assert_eq!(next as usize, bvh.triangles().len());
    }

    #[test]
    fn empty_mesh_builds_empty_tree() {
        let mut bvh = BVH::default();
        bvh.build(&[], &[], 1);
        assert!(bvh.nodes().is_empty());
        assert!(bvh.triangles().is_empty());
        assert!(!bvh.bounds().is_valid());
    }

    #[test]
    fn single_triangle_is_a_leaf_root() {
        let (vertices, indices) = random_mesh(1);
        let mut bvh = BVH::default();
        bvh.build(&vertices, &indices, 1);

        assert_eq!(bvh.nodes().len(), 1);
        let root = &bvh.nodes()[0];
        assert!(root.is_leaf());
        assert_eq!((root.left, root.right), (0, 0));
        assert_eq!((root.start, root.size), (0, 1));
        assert_eq!((root.hit, root.miss), (-1, -1));
        assert_eq!(root.parent, -1);
    }

    #[test]
    fn leaf_ranges_cover_all_triangles() {
        let (vertices, indices) = random_mesh(257);
        let mut bvh = BVH::default();
        bvh.build(&vertices, &indices, 1);
        assert_covers_all(&bvh);
    }

    #[test]
    fn nodes_contain_their_triangles_and_children() {
        let (vertices, indices) = random_mesh(128);
        let mut bvh = BVH::default();
        bvh.build(&vertices, &indices, 2);

        let slack = Vec3A::splat(1e-4);
        for node in bvh.nodes() {
            let start = node.start as usize;
            let end = start + node.size as usize;
            for tri in &bvh.triangles()[start..end] {
                let t = tri.aabb();
                assert!((node.aabb.min - slack).cmple(t.min).all());
                assert!((node.aabb.max + slack).cmpge(t.max).all());
            }
            if !node.is_leaf() {
                assert!(node.aabb.contains_aabb(&bvh.nodes()[node.left as usize].aabb));
                assert!(node.aabb.contains_aabb(&bvh.nodes()[node.right as usize].aabb));
            }
        }
    }

    #[test]
    fn leaves_respect_max_leaf_size() {
        let (vertices, indices) = random_mesh(200);
        for max_leaf_size in [1, 4, 16] {
            let mut bvh = BVH::default();
            bvh.build(&vertices, &indices, max_leaf_size);
            for node in bvh.nodes() {
                if node.is_leaf() {
                    assert!(node.size <= max_leaf_size);
                }
            }
        }
    }

    #[test]
    fn max_leaf_size_zero_still_terminates() {
        let (vertices, indices) = random_mesh(33);
        let mut bvh = BVH::default();
        bvh.build(&vertices, &indices, 0);
        assert_covers_all(&bvh);
        for node in bvh.nodes() {
            if node.is_leaf() {
                assert_eq!(node.size, 1);
            }
        }
    }

    #[test]
    fn hit_links_order_every_node() {
        let (vertices, indices) = random_mesh(100);
        let mut bvh = BVH::default();
        bvh.build(&vertices, &indices, 3);

        // Following `hit` everywhere walks the whole tree in depth-first
        // order, each node exactly once, ending at the -1 sentinel.
        let mut visited = vec![false; bvh.nodes().len()];
        let mut current = 0i32;
        while current != -1 {
            let node = &bvh.nodes()[current as usize];
            assert!(!visited[current as usize], "node revisited");
            visited[current as usize] = true;
            current = node.hit;
        }
        assert!(visited.iter().all(|&v| v));
    }

    #[test]
    fn miss_links_skip_subtrees() {
        let (vertices, indices) = random_mesh(64);
        let mut bvh = BVH::default();
        bvh.build(&vertices, &indices, 1);

        let mut rng = thread_rng();
        for _ in 0..32 {
            // Any mix of hit/miss decisions terminates without revisiting
            let mut visited = vec![false; bvh.nodes().len()];
            let mut current = 0i32;
            while current != -1 {
                let node = &bvh.nodes()[current as usize];
                assert!(!visited[current as usize]);
                visited[current as usize] = true;
                current = if node.is_leaf() {
                    assert_eq!(node.hit, node.miss);
                    node.miss
                } else if rng.gen() {
                    node.hit
                } else {
                    node.miss
                };
            }
        }
    }

    #[test]
    fn parents_link_back_to_ancestors() {
        let (vertices, indices) = random_mesh(77);
        let mut bvh = BVH::default();
        bvh.build(&vertices, &indices, 1);

        assert_eq!(bvh.nodes()[0].parent, -1);
        for (i, node) in bvh.nodes().iter().enumerate() {
            if !node.is_leaf() {
                assert_eq!(bvh.nodes()[node.left as usize].parent, i as i32);
                assert_eq!(bvh.nodes()[node.right as usize].parent, i as i32);
            }
        }
    }

    #[test]
    fn rebuild_is_deterministic() {
        let (vertices, indices) = random_mesh(150);

        let mut first = BVH::default();
        first.build(&vertices, &indices, 2);
        let mut second = BVH::default();
        second.build(&vertices, &indices, 2);

        assert_eq!(first.nodes().len(), second.nodes().len());
        for (a, b) in first.nodes().iter().zip(second.nodes()) {
            assert_eq!(a, b);
        }
        for (a, b) in first.triangles().iter().zip(second.triangles()) {
            assert_eq!(a.centroid, b.centroid);
        }
    }

    #[test]
    fn coincident_centroids_fall_back_to_half_splits() {
        // Stacked copies of one degenerate triangle: SAH can never find a
        // profitable split, only the positional fallback applies.
        let point = Vec3A::new(0.5, -1.0, 2.0);
        let vertices = vec![point; 3];
        let indices: Vec<u32> = std::iter::repeat([0u32, 1, 2]).take(33).flatten().collect();

        let mut bvh = BVH::default();
        bvh.build(&vertices, &indices, 1);

        assert_eq!(bvh.triangles().len(), 33);
        assert_eq!(bvh.nodes().len(), 2 * 33 - 1);
        assert_covers_all(&bvh);
        for node in bvh.nodes() {
            assert!(node.size >= 1);
        }
    }
}
