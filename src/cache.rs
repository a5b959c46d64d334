use crate::{AllocPtr, Level, Point3, TreeShape};

/// The most recently traversed node of one level.
#[derive(Clone, Copy, Debug)]
struct CacheSlot {
    /// Base coordinate of the remembered node's cube.
    base: Point3,
    node: AllocPtr,
}

/// The last path taken from the root, one slot per level.
///
/// Consecutive operations tend to land in the same cube, so before descending from the root the
/// tree scans these slots deepest-first and dispatches directly into the first remembered node
/// whose cube still contains the query point, skipping the hash lookup and every level above it.
///
/// Slots are purged whenever the subtree they point into collapses; allocators reuse pointers of
/// freed nodes, so a slot that survived a collapse could otherwise dispatch into an unrelated
/// node. [`Tree::clear`](crate::Tree::clear) resets every slot for the same reason.
#[derive(Clone, Debug)]
pub(crate) struct PathCache {
    slots: Vec<Option<CacheSlot>>,
}

impl PathCache {
    pub fn new(height: Level) -> Self {
        Self {
            slots: vec![None; height as usize],
        }
    }

    /// Remember the node just traversed at `level`.
    #[inline]
    pub fn record(&mut self, level: Level, base: Point3, node: AllocPtr) {
        self.slots[level as usize] = Some(CacheSlot { base, node });
    }

    /// The deepest remembered node whose cube contains `p`, if any.
    #[inline]
    pub fn find(&self, shape: &TreeShape, p: Point3) -> Option<(Level, AllocPtr)> {
        for (level, slot) in self.slots.iter().enumerate() {
            let level = level as Level;
            if let Some(slot) = slot {
                if slot.base == shape.cube_base(level, p) {
                    return Some((level, slot.node));
                }
            }
        }
        None
    }

    /// Drop every slot pointing into the cube of the `level` node at `base`, which has just been
    /// collapsed into a tile.
    pub fn purge_collapsed(&mut self, level: Level, base: Point3, shape: &TreeShape) {
        for slot in self.slots[..=level as usize].iter_mut() {
            if let Some(s) = *slot {
                if shape.cube_base(level, s.base) == base {
                    *slot = None;
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.fill(None);
    }
}
