use crate::{Level, Point3};

use thiserror::Error;

/// Upper bound on the cumulative log₂ side length of the whole tree, so that cube masks fit in an
/// `i64` without overflow.
pub const MAX_CUBE_LOG2: u32 = 62;

/// Upper bound on a single level's log₂ side length, so that the level's fan-out exponent
/// (three times the log side) fits in a `usize` index.
pub const MAX_LEVEL_LOG2: u8 = 20;

/// A misconfigured [`TreeShape`]. This is the only fallible part of the API; every runtime
/// operation on a constructed tree is total.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ShapeError {
    #[error("a tree shape needs at least one level")]
    Empty,
    #[error("level {level} has log2 side 0; the smallest usable side is 2")]
    ZeroLevel { level: Level },
    #[error("log2 side {log2_side} at level {level} exceeds the maximum of 20")]
    LevelTooLarge { level: Level, log2_side: u8 },
    #[error("cumulative log2 side {total} exceeds the 62 bits addressable per axis")]
    TooLarge { total: u32 },
}

/// The static shape of a [`Tree`](crate::Tree): how many levels it has and how coarsely each level
/// subdivides its cube.
///
/// Constructed from the per-level log₂ side lengths ordered root first, leaf last. A node at level
/// `k` covers a cube whose side is the product of every side length from the leaf up to and
/// including level `k`; its children subdivide that cube `2^log2_side` ways per axis. The shape is
/// fixed for the life of the tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TreeShape {
    /// Per-level log₂ side lengths, leaf first.
    level_log2: Box<[u8]>,
    /// Cumulative log₂ side lengths, leaf first: `cube_log2[k] = L₀ + … + Lₖ`.
    cube_log2: Box<[u8]>,
}

impl TreeShape {
    /// Validates and builds a shape from log₂ side lengths ordered root first, e.g. `&[3, 3]` for
    /// an 8×8×8 layer of branches over 8×8×8 leaves (a 64³ cube per root entry).
    pub fn new(root_first_log2: &[u8]) -> Result<Self, ShapeError> {
        if root_first_log2.is_empty() {
            return Err(ShapeError::Empty);
        }

        let level_log2: Box<[u8]> = root_first_log2.iter().rev().copied().collect();
        let mut cube_log2 = Vec::with_capacity(level_log2.len());
        let mut total = 0u32;
        for (level, &log2_side) in level_log2.iter().enumerate() {
            let level = level as Level;
            if log2_side == 0 {
                return Err(ShapeError::ZeroLevel { level });
            }
            if log2_side > MAX_LEVEL_LOG2 {
                return Err(ShapeError::LevelTooLarge { level, log2_side });
            }
            total += u32::from(log2_side);
            if total > MAX_CUBE_LOG2 {
                return Err(ShapeError::TooLarge { total });
            }
            cube_log2.push(total as u8);
        }

        Ok(Self {
            level_log2,
            cube_log2: cube_log2.into_boxed_slice(),
        })
    }

    /// The number of levels, including the leaf level.
    #[inline]
    pub fn height(&self) -> Level {
        self.level_log2.len() as Level
    }

    /// The level of the root directory's direct children.
    #[inline]
    pub fn top_level(&self) -> Level {
        self.height() - 1
    }

    /// The log₂ side length of a single level's subdivision.
    #[inline]
    pub fn level_log2(&self, level: Level) -> u32 {
        u32::from(self.level_log2[level as usize])
    }

    /// The cumulative log₂ side length of a node's cube at `level`.
    #[inline]
    pub fn cube_log2(&self, level: Level) -> u32 {
        u32::from(self.cube_log2[level as usize])
    }

    /// Mask selecting the coordinate bits local to a `level` node's cube.
    #[inline]
    pub fn cube_mask(&self, level: Level) -> i64 {
        (1i64 << self.cube_log2(level)) - 1
    }

    /// The number of child slots of a node at `level`; for level 0 this is the number of cells in
    /// a leaf.
    #[inline]
    pub fn fan_out(&self, level: Level) -> usize {
        1usize << (3 * self.level_log2(level))
    }

    /// The linear child-slot index of `p` within the `level` node that contains it.
    ///
    /// Packs the per-axis child coordinates as `z | y << L | x << 2L`, z in the least significant
    /// bits. The point is masked to the node's own cube before shifting, so negative coordinates
    /// route identically to positive ones.
    #[inline]
    pub fn bit_index(&self, level: Level, p: Point3) -> usize {
        let mask = self.cube_mask(level);
        let child_log2 = if level == 0 {
            0
        } else {
            self.cube_log2(level - 1)
        };
        let l = self.level_log2(level);
        let z = ((p.z & mask) >> child_log2) as usize;
        let y = ((p.y & mask) >> child_log2) as usize;
        let x = ((p.x & mask) >> child_log2) as usize;
        z | y << l | x << (2 * l)
    }

    /// The base coordinate of the `level` cube that contains `p`.
    #[inline]
    pub fn cube_base(&self, level: Level, p: Point3) -> Point3 {
        p & !self.cube_mask(level)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_bad_shapes() {
        assert_eq!(TreeShape::new(&[]), Err(ShapeError::Empty));
        assert_eq!(
            TreeShape::new(&[3, 0]),
            Err(ShapeError::ZeroLevel { level: 0 })
        );
        assert_eq!(
            TreeShape::new(&[21]),
            Err(ShapeError::LevelTooLarge {
                level: 0,
                log2_side: 21
            })
        );
        assert_eq!(
            TreeShape::new(&[20, 20, 20, 3]),
            Err(ShapeError::TooLarge { total: 63 })
        );
    }

    #[test]
    fn cumulative_sides_root_first_input() {
        let shape = TreeShape::new(&[2, 4, 3]).unwrap();
        assert_eq!(shape.height(), 3);
        // Leaf first internally.
        assert_eq!(shape.level_log2(0), 3);
        assert_eq!(shape.level_log2(1), 4);
        assert_eq!(shape.level_log2(2), 2);
        assert_eq!(shape.cube_log2(0), 3);
        assert_eq!(shape.cube_log2(1), 7);
        assert_eq!(shape.cube_log2(2), 9);
        assert_eq!(shape.fan_out(0), 512);
        assert_eq!(shape.fan_out(1), 4096);
        assert_eq!(shape.fan_out(2), 64);
    }

    #[test]
    fn bit_index_packs_z_least_significant() {
        let shape = TreeShape::new(&[3]).unwrap();
        assert_eq!(shape.bit_index(0, Point3::new(0, 0, 1)), 1);
        assert_eq!(shape.bit_index(0, Point3::new(0, 1, 0)), 1 << 3);
        assert_eq!(shape.bit_index(0, Point3::new(1, 0, 0)), 1 << 6);
        assert_eq!(shape.bit_index(0, Point3::new(7, 7, 7)), 511);
        // Only the cube-local bits participate.
        assert_eq!(
            shape.bit_index(0, Point3::new(8, 16, 24)),
            shape.bit_index(0, Point3::ZERO)
        );
    }

    #[test]
    fn bit_index_strips_child_bits_in_branches() {
        let shape = TreeShape::new(&[3, 3]).unwrap();
        // Both points fall in the same leaf, so the branch index matches.
        assert_eq!(
            shape.bit_index(1, Point3::new(0, 0, 8)),
            shape.bit_index(1, Point3::new(0, 0, 15))
        );
        assert_eq!(shape.bit_index(1, Point3::new(0, 0, 8)), 1);
        assert_eq!(shape.bit_index(1, Point3::new(8, 0, 0)), 1 << 6);
    }

    #[test]
    fn negative_coordinates_route_like_positive_ones() {
        let shape = TreeShape::new(&[3, 3]).unwrap();
        let p = Point3::new(-1, -64, -9);
        assert_eq!(shape.cube_base(1, p), Point3::new(-64, -64, -64));
        assert_eq!(shape.cube_base(0, p), Point3::new(-8, -64, -16));
        // -1 & 0b111 == 7, (-9 & 0b111111) >> 3 == 6.
        assert_eq!(shape.bit_index(0, p), (7 << 6) | 7);
        assert_eq!(shape.bit_index(1, p), (7 << 6) | 6);
    }
}
