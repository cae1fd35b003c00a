extern crate glam;
use glam::Vec3A;

use smallvec::SmallVec;

use crate::BVH;

/// A node of the wide hierarchy, holding up to `2^W` children in struct-of-
/// array slots so a traversal kernel can test several child boxes per
/// iteration.
///
/// Slot encoding lives entirely in `next`: a positive value is the index of
/// a child wide node, a negative value marks a leaf slot holding
/// `-(triangle count)` with the range start in `leaf`, and 0 marks an unused
/// slot. Slots fill left to right, so the first unused slot terminates the
/// valid-slot scan. `leaf` is -1 everywhere except leaf slots.
#[derive(Debug, Clone, Copy)]
pub struct WBVHNode<const W: usize>
where
    [(); 1 << W]: Sized,
{
    pub bmin: [Vec3A; 1 << W],
    pub bmax: [Vec3A; 1 << W],
    pub next: [i32; 1 << W],
    pub leaf: [i32; 1 << W],
}

impl<const W: usize> WBVHNode<W>
where
    [(); 1 << W]: Sized,
{
    fn empty() -> Self {
        Self {
            bmin: [Vec3A::splat(f32::INFINITY); 1 << W],
            bmax: [Vec3A::splat(-f32::INFINITY); 1 << W],
            next: [0; 1 << W],
            leaf: [-1; 1 << W],
        }
    }

    #[inline]
    pub fn slot_used(&self, slot: usize) -> bool {
        self.next[slot] != 0
    }

    #[inline]
    pub fn slot_is_leaf(&self, slot: usize) -> bool {
        self.next[slot] < 0
    }

    /// Triangle range of a leaf slot
    #[inline]
    pub fn slot_range(&self, slot: usize) -> (u32, u32) {
        debug_assert!(self.slot_is_leaf(slot));
        (self.leaf[slot] as u32, (-self.next[slot]) as u32)
    }
}

/// The binary hierarchy re-expressed with branching factor `2^W`: every wide
/// node covers a `W`-level frontier of the binary tree, trading traversal
/// depth for per-node width. Built by reading a finished [`BVH`], never by
/// mutating one. Wide node 0 is the root.
#[derive(Debug, Default)]
pub struct WBVH<const W: usize>
where
    [(); 1 << W]: Sized,
{
    nodes: Vec<WBVHNode<W>>,
}

impl<const W: usize> WBVH<W>
where
    [(); 1 << W]: Sized,
{
    #[inline]
    pub fn nodes(&self) -> &[WBVHNode<W>] {
        &self.nodes
    }

    /// Walk the binary tree `depth` levels down from `n`, appending the
    /// frontier (binary leaves, plus whatever interior nodes sit at the depth
    /// limit) into consecutive child slots. Interior slots park the binary
    /// node index in `next` until `build_wide` patches them.
    fn gather(bvh: &BVH, n: usize, depth: usize, node: &mut WBVHNode<W>, slot: &mut usize) {
        let bnode = &bvh.nodes()[n];
        if bnode.is_leaf() || depth == 0 {
            node.bmin[*slot] = bnode.aabb.min;
            node.bmax[*slot] = bnode.aabb.max;
            if bnode.is_leaf() {
                node.next[*slot] = -(bnode.size as i32);
                node.leaf[*slot] = bnode.start as i32;
            } else {
                node.next[*slot] = n as i32;
            }
            *slot += 1;
        } else {
            Self::gather(bvh, bnode.left as usize, depth - 1, node, slot);
            Self::gather(bvh, bnode.right as usize, depth - 1, node, slot);
        }
    }

    /// Gather the wide node for binary node `n`, then expand every interior
    /// slot into its own wide node. Returns the wide node's index.
    fn build_wide(&mut self, bvh: &BVH, n: usize) -> usize {
        let mut node = WBVHNode::empty();
        let mut slot = 0;
        Self::gather(bvh, n, W, &mut node, &mut slot);

        let index = self.nodes.len();
        self.nodes.push(node);

        for i in 0..slot {
            let next = self.nodes[index].next[i];
            if next > 0 {
                let child = self.build_wide(bvh, next as usize);
                self.nodes[index].next[i] = child as i32;
            }
        }

        index
    }

    /// All `(start, size)` triangle ranges reachable from the wide root, in
    /// no particular order. Matches the binary tree's leaf ranges exactly.
    pub fn leaf_ranges(&self) -> Vec<(u32, u32)> {
        let mut ranges = Vec::new();
        if self.nodes.is_empty() {
            return ranges;
        }

        let mut stack: SmallVec<[usize; 64]> = SmallVec::new();
        stack.push(0);
        while let Some(n) = stack.pop() {
            let node = &self.nodes[n];
            for slot in 0..(1 << W) {
                if !node.slot_used(slot) {
                    break;
                }
                if node.slot_is_leaf(slot) {
                    ranges.push(node.slot_range(slot));
                } else {
                    stack.push(node.next[slot] as usize);
                }
            }
        }

        ranges
    }
}

impl BVH {
    /// Flatten the binary tree into a [`WBVH`] with up to `2^W` children per
    /// node. `W` must be at least 1. An empty tree flattens to an empty wide
    /// tree.
    pub fn make_wide<const W: usize>(&self) -> WBVH<W>
    where
        [(); 1 << W]: Sized,
    {
        assert!(W >= 1, "wide nodes need a branching factor of at least 2");

        let mut wide = WBVH { nodes: Vec::new() };
        if !self.nodes().is_empty() {
            wide.build_wide(self, 0);
        }
        wide
    }
}
