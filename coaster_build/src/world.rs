// World-facing interfaces of the construction core, plus a dense reference
// world that implements them.
//
// The construction core never owns the persistent world. It talks to it
// through three narrow traits:
// - `WorldQuery`: ground height, tile ownership and grid extents. Read by
//   the overlay (cursor heights, tile enablement).
// - `StagingOverlay`: a transactional buffer for track voxel writes. Every
//   placement or removal is issued as a `clear` → write/erase → `commit`
//   triple. No partial-write recovery exists; the triple runs synchronously.
// - `PlacementCheck`: the authoritative yes/no on whether a piece fits at a
//   position. The controller never overrides a negative answer.
// `BuildWorld` bundles all three for the controller.
//
// `VoxelWorld` is a dense tile grid (ground height + ownership per tile)
// with a set of occupied track voxels. Staged writes are held in a buffer
// and applied only on `commit`. The replay tool and the tests use it; game
// hosts implement the traits on their own world store.
//
// See also: `overlay.rs` (reads `WorldQuery`), `controller.rs` (drives
// `StagingOverlay` and `PlacementCheck`).

use crate::catalog::PieceTemplate;
use crate::types::VoxelCoord;
use rustc_hash::FxHashSet;

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

/// Read-only queries against the world store.
pub trait WorldQuery {
    /// Grid size as `(x, y, z)` in voxels.
    fn extents(&self) -> (u32, u32, u32);

    /// Top-of-ground height at tile `(x, y)`, or `None` outside the grid.
    fn ground_height(&self, x: i32, y: i32) -> Option<i32>;

    /// Whether the park owns tile `(x, y)`. Tiles outside the grid are never
    /// owned.
    fn is_owned(&self, x: i32, y: i32) -> bool;

    /// Whether tile `(x, y)` lies inside the grid.
    fn tile_in_grid(&self, x: i32, y: i32) -> bool {
        let (sx, sy, _) = self.extents();
        x >= 0 && y >= 0 && (x as u32) < sx && (y as u32) < sy
    }
}

/// Transactional buffer for track voxel writes.
pub trait StagingOverlay {
    /// Discard anything staged but not committed.
    fn clear(&mut self);
    /// Stage the voxels of `piece` placed at `position`.
    fn write_footprint(&mut self, piece: &PieceTemplate, position: VoxelCoord);
    /// Stage removal of the voxels of `piece` placed at `position`.
    fn erase_footprint(&mut self, piece: &PieceTemplate, position: VoxelCoord);
    /// Apply everything staged since the last `clear`.
    fn commit(&mut self);
}

/// Authoritative placement validity check.
pub trait PlacementCheck {
    fn can_place(&self, piece: &PieceTemplate, position: VoxelCoord) -> bool;
}

/// Everything the controller needs from the world in one bound.
pub trait BuildWorld: WorldQuery + StagingOverlay + PlacementCheck {}

impl<T: WorldQuery + StagingOverlay + PlacementCheck> BuildWorld for T {}

// ---------------------------------------------------------------------------
// Dense reference world
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StagedWrite {
    Place(VoxelCoord),
    Erase(VoxelCoord),
}

/// Dense tile grid with per-tile ground height and ownership, and a set of
/// voxels occupied by committed track.
#[derive(Clone, Debug, Default)]
pub struct VoxelWorld {
    /// Flat per-tile storage: index = x + y * size_x.
    ground: Vec<i32>,
    owned: Vec<bool>,
    occupied: FxHashSet<VoxelCoord>,
    staged: Vec<StagedWrite>,
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
}

impl VoxelWorld {
    /// Create a world with flat ground at `ground_height`, every tile owned.
    pub fn new(size_x: u32, size_y: u32, size_z: u32, ground_height: i32) -> Self {
        let tiles = (size_x as usize) * (size_y as usize);
        Self {
            ground: vec![ground_height; tiles],
            owned: vec![true; tiles],
            occupied: FxHashSet::default(),
            staged: Vec::new(),
            size_x,
            size_y,
            size_z,
        }
    }

    fn tile_index(&self, x: i32, y: i32) -> Option<usize> {
        if self.tile_in_grid(x, y) {
            Some(x as usize + y as usize * self.size_x as usize)
        } else {
            None
        }
    }

    /// Change the ground height of one tile. No-op outside the grid.
    pub fn set_ground_height(&mut self, x: i32, y: i32, height: i32) {
        if let Some(i) = self.tile_index(x, y) {
            self.ground[i] = height;
        }
    }

    /// Change ownership of one tile. No-op outside the grid.
    pub fn set_owned(&mut self, x: i32, y: i32, owned: bool) {
        if let Some(i) = self.tile_index(x, y) {
            self.owned[i] = owned;
        }
    }

    /// Whether committed track occupies `voxel`.
    pub fn is_occupied(&self, voxel: VoxelCoord) -> bool {
        self.occupied.contains(&voxel)
    }

    /// Number of voxels occupied by committed track.
    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    /// Number of writes staged but not yet committed.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    fn voxel_in_grid(&self, voxel: VoxelCoord) -> bool {
        self.tile_in_grid(voxel.x, voxel.y) && voxel.z >= 0 && (voxel.z as u32) < self.size_z
    }
}

impl WorldQuery for VoxelWorld {
    fn extents(&self) -> (u32, u32, u32) {
        (self.size_x, self.size_y, self.size_z)
    }

    fn ground_height(&self, x: i32, y: i32) -> Option<i32> {
        self.tile_index(x, y).map(|i| self.ground[i])
    }

    fn is_owned(&self, x: i32, y: i32) -> bool {
        self.tile_index(x, y).is_some_and(|i| self.owned[i])
    }
}

impl StagingOverlay for VoxelWorld {
    fn clear(&mut self) {
        self.staged.clear();
    }

    fn write_footprint(&mut self, piece: &PieceTemplate, position: VoxelCoord) {
        self.staged
            .extend(piece.footprint.iter().map(|&v| StagedWrite::Place(position + v)));
    }

    fn erase_footprint(&mut self, piece: &PieceTemplate, position: VoxelCoord) {
        self.staged
            .extend(piece.footprint.iter().map(|&v| StagedWrite::Erase(position + v)));
    }

    fn commit(&mut self) {
        for write in self.staged.drain(..) {
            match write {
                StagedWrite::Place(v) => {
                    self.occupied.insert(v);
                }
                StagedWrite::Erase(v) => {
                    self.occupied.remove(&v);
                }
            }
        }
    }
}

impl PlacementCheck for VoxelWorld {
    /// A piece fits when every footprint voxel is inside the grid, on an
    /// owned tile, not below ground, and not already occupied.
    fn can_place(&self, piece: &PieceTemplate, position: VoxelCoord) -> bool {
        piece.footprint.iter().all(|&offset| {
            let v = position + offset;
            self.voxel_in_grid(v)
                && self.is_owned(v.x, v.y)
                && self.ground_height(v.x, v.y).is_some_and(|g| v.z >= g)
                && !self.occupied.contains(&v)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Banking, ConnectorCode, TrackBend, TrackSlope};
    use smallvec::smallvec;

    fn two_voxel_piece() -> PieceTemplate {
        PieceTemplate {
            name: "straight".into(),
            entry: ConnectorCode(1),
            exit: ConnectorCode(1),
            start_direction: None,
            banking: Banking::None,
            slope: TrackSlope::Flat,
            bend: TrackBend::Straight,
            platform: false,
            powered: false,
            footprint: smallvec![VoxelCoord::new(0, 0, 0), VoxelCoord::new(1, 0, 0)],
            exit_offset: VoxelCoord::new(2, 0, 0),
        }
    }

    #[test]
    fn new_world_is_flat_and_owned() {
        let world = VoxelWorld::new(4, 3, 8, 2);
        assert_eq!(world.extents(), (4, 3, 8));
        for x in 0..4 {
            for y in 0..3 {
                assert_eq!(world.ground_height(x, y), Some(2));
                assert!(world.is_owned(x, y));
            }
        }
    }

    #[test]
    fn out_of_grid_tiles_have_no_height_or_owner() {
        let world = VoxelWorld::new(4, 4, 4, 0);
        assert_eq!(world.ground_height(-1, 0), None);
        assert_eq!(world.ground_height(0, 4), None);
        assert!(!world.is_owned(4, 0));
        assert!(!world.tile_in_grid(0, -1));
    }

    #[test]
    fn staged_writes_apply_only_on_commit() {
        let mut world = VoxelWorld::new(8, 8, 8, 0);
        let piece = two_voxel_piece();
        let pos = VoxelCoord::new(2, 2, 1);

        world.clear();
        world.write_footprint(&piece, pos);
        assert_eq!(world.staged_count(), 2);
        assert_eq!(world.occupied_count(), 0);

        world.commit();
        assert_eq!(world.staged_count(), 0);
        assert!(world.is_occupied(VoxelCoord::new(2, 2, 1)));
        assert!(world.is_occupied(VoxelCoord::new(3, 2, 1)));
    }

    #[test]
    fn clear_discards_uncommitted_writes() {
        let mut world = VoxelWorld::new(8, 8, 8, 0);
        world.write_footprint(&two_voxel_piece(), VoxelCoord::new(0, 0, 0));
        world.clear();
        world.commit();
        assert_eq!(world.occupied_count(), 0);
    }

    #[test]
    fn erase_removes_committed_voxels() {
        let mut world = VoxelWorld::new(8, 8, 8, 0);
        let piece = two_voxel_piece();
        let pos = VoxelCoord::new(1, 1, 0);
        world.clear();
        world.write_footprint(&piece, pos);
        world.commit();

        world.clear();
        world.erase_footprint(&piece, pos);
        world.commit();
        assert_eq!(world.occupied_count(), 0);
    }

    #[test]
    fn placement_rejects_overlap_and_bounds() {
        let mut world = VoxelWorld::new(4, 4, 4, 1);
        let piece = two_voxel_piece();

        assert!(world.can_place(&piece, VoxelCoord::new(0, 0, 1)));
        // Second voxel leaves the grid.
        assert!(!world.can_place(&piece, VoxelCoord::new(3, 0, 1)));
        // Below ground.
        assert!(!world.can_place(&piece, VoxelCoord::new(0, 0, 0)));
        // Above the top of the world.
        assert!(!world.can_place(&piece, VoxelCoord::new(0, 0, 4)));

        world.clear();
        world.write_footprint(&piece, VoxelCoord::new(0, 0, 1));
        world.commit();
        assert!(!world.can_place(&piece, VoxelCoord::new(1, 0, 1)));
        assert!(world.can_place(&piece, VoxelCoord::new(0, 1, 1)));
    }

    #[test]
    fn placement_requires_ownership() {
        let mut world = VoxelWorld::new(4, 4, 4, 0);
        world.set_owned(1, 0, false);
        assert!(!world.can_place(&two_voxel_piece(), VoxelCoord::new(0, 0, 0)));
        assert!(world.can_place(&two_voxel_piece(), VoxelCoord::new(2, 0, 0)));
    }

    #[test]
    fn ground_height_edit_is_visible() {
        let mut world = VoxelWorld::new(4, 4, 4, 0);
        world.set_ground_height(2, 3, 3);
        assert_eq!(world.ground_height(2, 3), Some(3));
        assert_eq!(world.ground_height(3, 2), Some(0));
        // Out of grid is ignored.
        world.set_ground_height(9, 9, 3);
    }
}
