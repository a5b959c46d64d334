use std::ops::BitAnd;

/// A point on the signed 64-bit integer lattice.
///
/// Doubles as the key of the root directory: a root key is a point masked down to the base
/// coordinate of the top-level cube that contains it. Keys hash all three components through the
/// map's 64-bit hasher, which spreads the axis-aligned patterns typical of voxel workloads better
/// than folding the axes together first.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Point3 {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Point3 {
    pub const ZERO: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

impl From<[i64; 3]> for Point3 {
    #[inline]
    fn from([x, y, z]: [i64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<(i64, i64, i64)> for Point3 {
    #[inline]
    fn from((x, y, z): (i64, i64, i64)) -> Self {
        Self::new(x, y, z)
    }
}

impl BitAnd<i64> for Point3 {
    type Output = Self;

    /// Componentwise mask. Two's complement makes this behave identically for negative
    /// coordinates, which is what keeps cube bases correct everywhere on the lattice.
    #[inline]
    fn bitand(self, rhs: i64) -> Self {
        Self::new(self.x & rhs, self.y & rhs, self.z & rhs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mask_rounds_down_toward_negative_infinity() {
        let mask = !((1i64 << 3) - 1);
        assert_eq!(Point3::new(9, 0, 7) & mask, Point3::new(8, 0, 0));
        assert_eq!(Point3::new(-1, -8, -9) & mask, Point3::new(-8, -8, -16));
    }
}
