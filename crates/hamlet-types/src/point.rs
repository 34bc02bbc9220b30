//! Map coordinates.

use serde::{Deserialize, Serialize};

/// A node position on the map (a flag or building entrance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MapPoint {
    /// Column.
    pub x: u16,
    /// Row.
    pub y: u16,
}

impl MapPoint {
    /// Sentinel for "no position", e.g. a player without a headquarters.
    pub const INVALID: Self = Self {
        x: u16::MAX,
        y: u16::MAX,
    };

    /// Create a point.
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Whether this is a real map position.
    pub const fn is_valid(self) -> bool {
        self.x != u16::MAX || self.y != u16::MAX
    }

    /// Chebyshev distance to `other` (diagonal steps cost one).
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx as u32 } else { dy as u32 }
    }
}

impl Default for MapPoint {
    fn default() -> Self {
        Self::INVALID
    }
}

impl core::fmt::Display for MapPoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_point_is_invalid() {
        assert!(!MapPoint::default().is_valid());
        assert!(MapPoint::new(0, 0).is_valid());
    }

    #[test]
    fn chebyshev_takes_the_longer_axis() {
        assert_eq!(MapPoint::new(2, 3).chebyshev(MapPoint::new(7, 1)), 5);
        assert_eq!(MapPoint::new(4, 4).chebyshev(MapPoint::new(4, 4)), 0);
    }
}
