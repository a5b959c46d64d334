use crate::{AllocPtr, Point3, EMPTY_PTR};

use bitvec::boxed::BitBox;
use bitvec::slice::BitSlice;
use bitvec::vec::BitVec;

/// Whether every cell covered by a node holds the same value.
///
/// A branch with any materialised child is always [`Mixed`](Uniformity::Mixed): children only
/// exist while their cells disagree, so their mere presence disproves uniformity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Uniformity {
    Mixed,
    AllActive,
    AllInactive,
}

impl Uniformity {
    fn of_bits(bits: &BitSlice) -> Self {
        if bits.all() {
            Self::AllActive
        } else if bits.not_any() {
            Self::AllInactive
        } else {
            Self::Mixed
        }
    }

    /// The single value covering the node, or `None` when mixed.
    #[inline]
    pub fn uniform_value(self) -> Option<bool> {
        match self {
            Self::Mixed => None,
            Self::AllActive => Some(true),
            Self::AllInactive => Some(false),
        }
    }
}

/// A level 0 node: one bit per cell of its cube, packed `z | y << L | x << 2L`.
#[derive(Clone, Debug)]
pub struct LeafNode {
    base: Point3,
    cells: BitBox,
}

impl LeafNode {
    /// A leaf with every cell set to `value`, covering the cube at `base`.
    pub fn filled(base: Point3, value: bool, num_cells: usize) -> Self {
        Self {
            base,
            cells: BitVec::repeat(value, num_cells).into_boxed_bitslice(),
        }
    }

    /// The base coordinate of this leaf's cube.
    #[inline]
    pub fn base(&self) -> Point3 {
        self.base
    }

    #[inline]
    pub fn get(&self, cell: usize) -> bool {
        self.cells[cell]
    }

    #[inline]
    pub fn set(&mut self, cell: usize, value: bool) {
        self.cells.set(cell, value);
    }

    #[inline]
    pub fn uniformity(&self) -> Uniformity {
        Uniformity::of_bits(&self.cells)
    }
}

/// A level ≥ 1 node: per child slot, a uniform tile bit, a child-present bit, and a pointer into
/// the next level's allocator.
///
/// Invariant: `child_mask` set ⇔ the pointer is not [`EMPTY_PTR`]. The tile bit of a slot with a
/// materialised child is meaningless until the child collapses back into it.
#[derive(Clone, Debug)]
pub struct BranchNode {
    base: Point3,
    /// The uniform value of each slot that has no materialised child.
    active: BitBox,
    /// Which slots have a materialised child.
    child_mask: BitBox,
    children: Box<[AllocPtr]>,
}

impl BranchNode {
    /// A branch whose every slot is a uniform tile of `value`, covering the cube at `base`.
    pub fn filled(base: Point3, value: bool, fan_out: usize) -> Self {
        Self {
            base,
            active: BitVec::repeat(value, fan_out).into_boxed_bitslice(),
            child_mask: BitVec::repeat(false, fan_out).into_boxed_bitslice(),
            children: vec![EMPTY_PTR; fan_out].into_boxed_slice(),
        }
    }

    /// The base coordinate of this branch's cube.
    #[inline]
    pub fn base(&self) -> Point3 {
        self.base
    }

    #[inline]
    pub fn has_child(&self, slot: usize) -> bool {
        self.child_mask[slot]
    }

    /// The raw child pointer of `slot`; [`EMPTY_PTR`] when no child is materialised.
    #[inline]
    pub fn child(&self, slot: usize) -> AllocPtr {
        self.children[slot]
    }

    /// The uniform tile value of `slot`. Only meaningful while `slot` has no child.
    #[inline]
    pub fn tile(&self, slot: usize) -> bool {
        self.active[slot]
    }

    /// Materialise `slot`: record the child pointer and flag the slot as subdivided.
    #[inline]
    pub fn link_child(&mut self, slot: usize, child: AllocPtr) {
        self.children[slot] = child;
        self.child_mask.set(slot, true);
    }

    /// Collapse `slot` back into a uniform tile of `value`, forgetting the child pointer.
    #[inline]
    pub fn collapse_child(&mut self, slot: usize, value: bool) {
        self.children[slot] = EMPTY_PTR;
        self.child_mask.set(slot, false);
        self.active.set(slot, value);
    }

    #[inline]
    pub fn uniformity(&self) -> Uniformity {
        if self.child_mask.any() {
            return Uniformity::Mixed;
        }
        Uniformity::of_bits(&self.active)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn leaf_uniformity_tracks_cells() {
        let mut leaf = LeafNode::filled(Point3::ZERO, false, 8);
        assert_eq!(leaf.uniformity(), Uniformity::AllInactive);

        leaf.set(3, true);
        assert!(leaf.get(3));
        assert!(!leaf.get(2));
        assert_eq!(leaf.uniformity(), Uniformity::Mixed);

        for cell in 0..8 {
            leaf.set(cell, true);
        }
        assert_eq!(leaf.uniformity(), Uniformity::AllActive);
    }

    #[test]
    fn branch_with_child_is_never_uniform() {
        let mut branch = BranchNode::filled(Point3::ZERO, true, 8);
        assert_eq!(branch.uniformity(), Uniformity::AllActive);

        branch.link_child(5, 17);
        assert!(branch.has_child(5));
        assert_eq!(branch.child(5), 17);
        assert_eq!(branch.uniformity(), Uniformity::Mixed);

        branch.collapse_child(5, false);
        assert!(!branch.has_child(5));
        assert_eq!(branch.child(5), EMPTY_PTR);
        assert!(!branch.tile(5));
        assert_eq!(branch.uniformity(), Uniformity::Mixed);

        branch.collapse_child(5, true);
        assert_eq!(branch.uniformity(), Uniformity::AllActive);
    }
}
