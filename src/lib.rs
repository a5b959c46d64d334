//! Sparse boolean voxel volumes stored as VDB-style tile trees.
//!
//! A [`Tree`](crate::Tree) maps every point of the signed 64-bit integer lattice to a single bit
//! ("active" or "inactive"). The representation is sparse in both directions: untouched space costs
//! nothing, and large uniform regions — all-active or all-inactive — are stored as one-bit *tiles*
//! rather than materialised subtrees. Memory is only spent along the surface where the two states
//! meet.
//!
//! The tree has a fixed height chosen at construction through a [`TreeShape`](crate::TreeShape): an
//! ordered list of log₂ side lengths, one per level. Every interior node covers a power-of-two cube
//! and holds a dense array of child slots; only the root level is a hash map, keyed by the base
//! coordinate of each top-level cube.
//!
//! ```
//! use tile_tree::{Point3, Tree, TreeShape};
//!
//! // 8x8x8 leaves under one 8x8x8 layer of branches.
//! let mut tree = Tree::new(TreeShape::new(&[3, 3]).unwrap());
//!
//! tree.set(Point3::new(1, 2, 3), true);
//! assert!(tree.get(Point3::new(1, 2, 3)));
//! assert!(!tree.get(Point3::new(1, 2, 4)));
//! assert!(!tree.get(Point3::new(-1000, 0, 1000)));
//! ```
//!
//! # Design Advantages
//!
//! - By using a hash map of root cubes, the addressable space is not limited by the height of the
//!   tree, and it is not necessary to "translate" the tree as it follows a focal point.
//! - Since each level has its own internal allocator, child pointers are plain `u32` indices that
//!   are completely local to the data structure, and dropping the tree frees every node at once.
//! - Mutations keep the tree in *canonical form*: no materialised subtree is ever uniform. Two
//!   trees that reach the same logical state through different edit orders are structurally
//!   identical, and a region that becomes uniform gives its memory back immediately.
//!
//! # Performance
//!
//! - random access: O(height) hash lookup plus one array index per level
//! - spatially local access: the tree remembers the last path taken from the root and dispatches
//!   directly into the deepest cube that still contains the query point, so scanline-like
//!   traversals skip the hash map and the upper levels entirely
//! - memory per branch node: three bits plus one `u32` per child slot
//! - memory per leaf node: one bit per cell

mod allocator;
mod cache;
mod key;
mod node;
mod shape;
mod tree;

pub use allocator::{AllocPtr, NodeAllocator, EMPTY_PTR};
pub use key::Point3;
pub use node::{BranchNode, LeafNode, Uniformity};
pub use shape::{ShapeError, TreeShape, MAX_CUBE_LOG2, MAX_LEVEL_LOG2};
pub use tree::{RootSlot, Tree};

/// A level of the [`Tree`]. Leaves live at level 0.
pub type Level = u8;

use ahash::AHashMap;

type SmallKeyHashMap<K, V> = AHashMap<K, V>;
