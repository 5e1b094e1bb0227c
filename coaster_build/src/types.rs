// Core types shared across the construction core.
//
// Defines spatial coordinates (`VoxelCoord`, `TileRect`), the track piece
// attribute enums the narrowing selector works over (`Banking`,
// `TrackSlope`, `TrackBend`), build directions (`TileEdge`), connector
// codes, segment identifiers, and cursor markers. All types derive
// `Serialize` and `Deserialize` so catalogs, layouts and replay scripts can
// be stored as JSON.
//
// The attribute enums have a fixed declaration order. Their `index()` is
// the bit position used by `ValueMask` in `selector.rs`, so reordering
// variants changes every availability mask.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position in the 3D voxel grid, in voxel units.
///
/// X and Y span the ground plane (a tile is one `(x, y)` column); Z is the
/// height above the bottom of the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl Add for VoxelCoord {
    type Output = VoxelCoord;

    fn add(self, rhs: VoxelCoord) -> VoxelCoord {
        VoxelCoord::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl fmt::Display for VoxelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Axis-aligned rectangle of tiles. `width` runs along X, `height` along Y.
/// A rectangle with a zero dimension contains no tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    pub base_x: i32,
    pub base_y: i32,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    pub const fn new(base_x: i32, base_y: i32, width: u32, height: u32) -> Self {
        Self {
            base_x,
            base_y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether tile `(x, y)` lies inside the rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.base_x
            && y >= self.base_y
            && ((x - self.base_x) as i64) < self.width as i64
            && ((y - self.base_y) as i64) < self.height as i64
    }

    /// Smallest rectangle covering the ground-plane projection of `voxels`.
    /// Returns an empty rectangle at the origin when there are no voxels.
    pub fn covering<'a>(voxels: impl IntoIterator<Item = &'a VoxelCoord>) -> Self {
        let mut iter = voxels.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for v in iter {
            min_x = min_x.min(v.x);
            max_x = max_x.max(v.x);
            min_y = min_y.min(v.y);
            max_y = max_y.max(v.y);
        }
        Self::new(
            min_x,
            min_y,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        )
    }

    /// The same rectangle moved by `(dx, dy)` tiles.
    pub fn translated(self, dx: i32, dy: i32) -> Self {
        Self {
            base_x: self.base_x + dx,
            base_y: self.base_y + dy,
            ..self
        }
    }
}

// ---------------------------------------------------------------------------
// Build direction
// ---------------------------------------------------------------------------

/// Edge of a tile, used as the direction a starting piece is built in.
/// Declaration order is the rotation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileEdge {
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

/// Direction of a rotate input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateDirection {
    Positive,
    Negative,
}

impl TileEdge {
    pub const ALL: [TileEdge; 4] = [
        TileEdge::NorthEast,
        TileEdge::SouthEast,
        TileEdge::SouthWest,
        TileEdge::NorthWest,
    ];

    /// Next edge in the given rotation direction. Negative steps forward
    /// through the declaration order, positive steps backward.
    pub fn rotated(self, direction: RotateDirection) -> Self {
        let step = match direction {
            RotateDirection::Negative => 1,
            RotateDirection::Positive => 3,
        };
        Self::ALL[(self as usize + step) % 4]
    }
}

// ---------------------------------------------------------------------------
// Track piece attributes
// ---------------------------------------------------------------------------

/// Banking of a track piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Banking {
    None,
    Left,
    Right,
}

impl Banking {
    pub const ALL: [Banking; 3] = [Banking::None, Banking::Left, Banking::Right];
}

/// Slope of a track piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackSlope {
    Down,
    Flat,
    Up,
    SteepDown,
    SteepUp,
    VerticalDown,
    VerticalUp,
}

impl TrackSlope {
    pub const ALL: [TrackSlope; 7] = [
        TrackSlope::Down,
        TrackSlope::Flat,
        TrackSlope::Up,
        TrackSlope::SteepDown,
        TrackSlope::SteepUp,
        TrackSlope::VerticalDown,
        TrackSlope::VerticalUp,
    ];
}

/// Horizontal bend of a track piece, ordered from widest left to widest right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackBend {
    WideLeft,
    NormalLeft,
    TightLeft,
    Straight,
    TightRight,
    NormalRight,
    WideRight,
}

impl TrackBend {
    pub const ALL: [TrackBend; 7] = [
        TrackBend::WideLeft,
        TrackBend::NormalLeft,
        TrackBend::TightLeft,
        TrackBend::Straight,
        TrackBend::TightRight,
        TrackBend::NormalRight,
        TrackBend::WideRight,
    ];
}

/// Identifies how a piece's entry or exit mates with its neighbours. Two
/// pieces connect when one's exit code equals the other's entry code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectorCode(pub u8);

// ---------------------------------------------------------------------------
// Identifiers and markers
// ---------------------------------------------------------------------------

/// Stable index of a placed segment in the track layout's slot arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentId({})", self.0)
    }
}

/// Cursor sprite requested from the renderer for a highlighted voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorType {
    North,
    East,
    South,
    West,
    Tile,
    ArrowNorthEast,
    ArrowSouthEast,
    ArrowSouthWest,
    ArrowNorthWest,
    EdgeNorthEast,
    EdgeSouthEast,
    EdgeSouthWest,
    EdgeNorthWest,
}
