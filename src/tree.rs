use crate::cache::PathCache;
use crate::{
    AllocPtr, BranchNode, LeafNode, Level, NodeAllocator, Point3, SmallKeyHashMap, TreeShape,
    Uniformity, EMPTY_PTR,
};

/// One record of the root directory: an optional top-level subtree, and the uniform tile value
/// covering the whole cube while no subtree is materialised.
#[derive(Clone, Copy, Debug)]
struct RootData {
    child: AllocPtr,
    active: bool,
}

impl Default for RootData {
    fn default() -> Self {
        Self {
            child: EMPTY_PTR,
            active: false,
        }
    }
}

/// What the root directory currently holds for a cube. See [`Tree::root_slot`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RootSlot {
    /// The whole cube is uniform with this value.
    Tile(bool),
    /// The cube is heterogeneous and a subtree is materialised for it.
    Subtree,
}

/// Either the materialised child of a slot or the uniform tile value standing in for one.
enum Slot {
    Child(AllocPtr),
    Tile(bool),
}

/// A sparse boolean volume over the signed 64-bit integer lattice.
///
/// The tree is a fixed-height hierarchy of power-of-two cubes described by its [`TreeShape`].
/// Every node either materialises a child for a slot or covers that slot with a one-bit uniform
/// tile; the root level is a hash map from cube base coordinates to the same kind of record.
///
/// Mutations maintain *canonical form*: a subtree whose cells all agree is collapsed back into a
/// tile the moment that happens, so no materialised node is ever uniform, reads over uniform
/// regions never touch a leaf, and logically equal trees are structurally equal no matter the
/// edit order that produced them.
///
/// All operations take `&mut self` — even [`get`](Self::get) refreshes the last-path cache — which
/// also makes the single-actor requirement a compile-time fact.
#[derive(Clone, Debug)]
pub struct Tree {
    shape: TreeShape,
    root_nodes: SmallKeyHashMap<Point3, RootData>,
    leaves: NodeAllocator<LeafNode>,
    /// Branch allocators for levels `1..height`, indexed by `level - 1`.
    branches: Vec<NodeAllocator<BranchNode>>,
    cache: PathCache,
}

impl Tree {
    /// Construct an empty tree. Misconfigured shapes are rejected by
    /// [`TreeShape::new`](crate::TreeShape::new), so construction from a shape cannot fail.
    pub fn new(shape: TreeShape) -> Self {
        let height = shape.height();
        Self {
            root_nodes: Default::default(),
            leaves: Default::default(),
            branches: (1..height).map(|_| Default::default()).collect(),
            cache: PathCache::new(height),
            shape,
        }
    }

    #[inline]
    pub fn shape(&self) -> &TreeShape {
        &self.shape
    }

    /// The number of levels below the root directory.
    #[inline]
    pub fn height(&self) -> Level {
        self.shape.height()
    }

    /// Write one cell. Infallible for every representable coordinate.
    ///
    /// Writes that diverge from the enclosing tile materialise nodes down to a leaf; writes that
    /// make a subtree uniform collapse it back into a tile.
    pub fn set(&mut self, p: Point3, v: bool) {
        if let Some((level, ptr)) = self.cache.find(&self.shape, p) {
            if self.set_in_node(level, ptr, p, v) == Uniformity::Mixed {
                return;
            }
            // The dispatched subtree just became uniform, but its ancestors were skipped and
            // still hold a pointer to it. Rerunning the write from the root performs the pending
            // collapses; the cell states are already correct, so the rerun only restructures.
        }
        self.set_from_root(p, v);
    }

    /// Write one cell inactive. Equivalent to `set(p, false)`.
    #[inline]
    pub fn reset(&mut self, p: Point3) {
        self.set(p, false);
    }

    /// Read one cell. Total: coordinates never touched read as inactive.
    ///
    /// Takes `&mut self` because a read refreshes the last-path cache.
    pub fn get(&mut self, p: Point3) -> bool {
        if let Some((level, ptr)) = self.cache.find(&self.shape, p) {
            return self.get_in_node(level, ptr, p);
        }
        match self.root_nodes.get(&self.root_key(p)).copied() {
            None => false,
            Some(data) if data.child == EMPTY_PTR => data.active,
            Some(data) => self.get_in_node(self.shape.top_level(), data.child, p),
        }
    }

    /// Drop every node, empty the root directory and reset the last-path cache.
    pub fn clear(&mut self) {
        self.root_nodes.clear();
        self.leaves.clear();
        for alloc in &mut self.branches {
            alloc.clear();
        }
        self.cache.clear();
    }

    /// The number of root directory records, including uniformly-inactive ones left behind by
    /// writes that never diverged from the default.
    #[inline]
    pub fn root_len(&self) -> usize {
        self.root_nodes.len()
    }

    /// Whether a root record exists for the top-level cube containing `p`.
    #[inline]
    pub fn contains_root(&self, p: Point3) -> bool {
        self.root_nodes.contains_key(&self.root_key(p))
    }

    /// The state of the root record covering `p`, or `None` when no record exists (the cube reads
    /// as all-inactive either way).
    pub fn root_slot(&self, p: Point3) -> Option<RootSlot> {
        self.root_nodes.get(&self.root_key(p)).map(|data| {
            if data.child == EMPTY_PTR {
                RootSlot::Tile(data.active)
            } else {
                RootSlot::Subtree
            }
        })
    }

    /// The total number of materialised nodes across all levels.
    pub fn node_count(&self) -> usize {
        self.leaves.len() + self.branches.iter().map(NodeAllocator::len).sum::<usize>()
    }

    #[inline]
    fn root_key(&self, p: Point3) -> Point3 {
        self.shape.cube_base(self.shape.top_level(), p)
    }

    fn set_from_root(&mut self, p: Point3, v: bool) {
        let top = self.shape.top_level();
        let key = self.root_key(p);
        let data = *self.root_nodes.entry(key).or_default();

        if data.child == EMPTY_PTR {
            if v != data.active {
                let child = self.alloc_filled(top, key, data.active);
                let uniformity = self.set_in_node(top, child, p, v);
                debug_assert_eq!(uniformity, Uniformity::Mixed);
                self.root_nodes.get_mut(&key).unwrap().child = child;
            }
        } else if let Some(value) = self.set_in_node(top, data.child, p, v).uniform_value() {
            self.free_node(top, data.child);
            self.cache.purge_collapsed(top, key, &self.shape);
            let data = self.root_nodes.get_mut(&key).unwrap();
            data.child = EMPTY_PTR;
            data.active = value;
        }
    }

    /// Write `v` at `p` inside the `level` node at `ptr`, collapsing any descendant that becomes
    /// uniform, and report the node's own uniformity afterwards so the caller can do the same.
    fn set_in_node(&mut self, level: Level, ptr: AllocPtr, p: Point3, v: bool) -> Uniformity {
        self.cache.record(level, self.shape.cube_base(level, p), ptr);

        if level == 0 {
            let cell = self.shape.bit_index(0, p);
            let leaf = self.leaves.get_mut(ptr).unwrap();
            leaf.set(cell, v);
            return leaf.uniformity();
        }

        let slot = self.shape.bit_index(level, p);
        match self.branch_slot(level, ptr, slot) {
            Slot::Tile(tile) => {
                if v == tile {
                    // The tile already covers this write.
                    return self.branch(level).get(ptr).unwrap().uniformity();
                }
                let child_base = self.shape.cube_base(level - 1, p);
                let child = self.alloc_filled(level - 1, child_base, tile);
                let uniformity = self.set_in_node(level - 1, child, p, v);
                debug_assert_eq!(uniformity, Uniformity::Mixed);
                self.branch_mut(level)
                    .get_mut(ptr)
                    .unwrap()
                    .link_child(slot, child);
                Uniformity::Mixed
            }
            Slot::Child(child) => {
                match self.set_in_node(level - 1, child, p, v).uniform_value() {
                    None => Uniformity::Mixed,
                    Some(value) => {
                        // Canonical form guarantees a uniform child has no descendants, so
                        // dropping the one node frees the whole subtree.
                        self.free_node(level - 1, child);
                        let child_base = self.shape.cube_base(level - 1, p);
                        self.cache.purge_collapsed(level - 1, child_base, &self.shape);
                        let branch = self.branch_mut(level).get_mut(ptr).unwrap();
                        branch.collapse_child(slot, value);
                        branch.uniformity()
                    }
                }
            }
        }
    }

    fn get_in_node(&mut self, level: Level, ptr: AllocPtr, p: Point3) -> bool {
        self.cache.record(level, self.shape.cube_base(level, p), ptr);

        if level == 0 {
            let cell = self.shape.bit_index(0, p);
            return self.leaves.get(ptr).unwrap().get(cell);
        }

        let slot = self.shape.bit_index(level, p);
        match self.branch_slot(level, ptr, slot) {
            Slot::Child(child) => self.get_in_node(level - 1, child, p),
            Slot::Tile(tile) => tile,
        }
    }

    fn branch_slot(&self, level: Level, ptr: AllocPtr, slot: usize) -> Slot {
        let branch = self.branch(level).get(ptr).unwrap();
        if branch.has_child(slot) {
            Slot::Child(branch.child(slot))
        } else {
            Slot::Tile(branch.tile(slot))
        }
    }

    /// Allocate a `level` node covering the cube at `base` with every cell equal to `value`.
    fn alloc_filled(&mut self, level: Level, base: Point3, value: bool) -> AllocPtr {
        let fan_out = self.shape.fan_out(level);
        if level == 0 {
            self.leaves.insert(LeafNode::filled(base, value, fan_out))
        } else {
            self.branch_mut(level)
                .insert(BranchNode::filled(base, value, fan_out))
        }
    }

    fn free_node(&mut self, level: Level, ptr: AllocPtr) {
        let removed = if level == 0 {
            self.leaves.remove(ptr).is_some()
        } else {
            self.branch_mut(level).remove(ptr).is_some()
        };
        debug_assert!(removed);
    }

    fn branch(&self, level: Level) -> &NodeAllocator<BranchNode> {
        &self.branches[level as usize - 1]
    }

    fn branch_mut(&mut self, level: Level) -> &mut NodeAllocator<BranchNode> {
        &mut self.branches[level as usize - 1]
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
impl Tree {
    /// Walk every materialised node and panic unless the tree is in canonical form: child masks
    /// agree with child pointers, recorded bases match the routing arithmetic, and no materialised
    /// node is uniform.
    fn assert_canonical(&self) {
        let top = self.shape.top_level();
        for (&key, data) in self.root_nodes.iter() {
            assert_eq!(data.child == EMPTY_PTR, !self.subtree_exists(top, data.child));
            if data.child != EMPTY_PTR {
                self.assert_canonical_node(top, data.child, key);
            }
        }
    }

    fn subtree_exists(&self, level: Level, ptr: AllocPtr) -> bool {
        if ptr == EMPTY_PTR {
            return false;
        }
        if level == 0 {
            self.leaves.contains(ptr)
        } else {
            self.branch(level).contains(ptr)
        }
    }

    fn assert_canonical_node(&self, level: Level, ptr: AllocPtr, base: Point3) {
        if level == 0 {
            let leaf = self.leaves.get(ptr).expect("dangling leaf pointer");
            assert_eq!(leaf.base(), base);
            assert_eq!(
                leaf.uniformity(),
                Uniformity::Mixed,
                "uniform leaf at {base:?} should have collapsed"
            );
            return;
        }

        let branch = self.branch(level).get(ptr).expect("dangling branch pointer");
        assert_eq!(branch.base(), base);
        assert_eq!(
            branch.uniformity(),
            Uniformity::Mixed,
            "uniform branch at {base:?} should have collapsed"
        );
        for slot in 0..self.shape.fan_out(level) {
            assert_eq!(branch.has_child(slot), branch.child(slot) != EMPTY_PTR);
            if branch.has_child(slot) {
                let child_base = self.slot_base(level, base, slot);
                self.assert_canonical_node(level - 1, branch.child(slot), child_base);
            }
        }
    }

    /// Invert `bit_index`: the base coordinate of a branch slot's child cube.
    fn slot_base(&self, level: Level, parent_base: Point3, slot: usize) -> Point3 {
        let l = self.shape.level_log2(level);
        let child_log2 = self.shape.cube_log2(level - 1);
        let axis_mask = (1usize << l) - 1;
        let z = ((slot & axis_mask) as i64) << child_log2;
        let y = (((slot >> l) & axis_mask) as i64) << child_log2;
        let x = (((slot >> (2 * l)) & axis_mask) as i64) << child_log2;
        Point3::new(parent_base.x + x, parent_base.y + y, parent_base.z + z)
    }
}
