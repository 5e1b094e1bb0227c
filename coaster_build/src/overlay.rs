// Spatial selection overlay: the tile window that drives cursor highlights.
//
// `TileCursor` keeps a rectangle of tiles (at most `max_extent` on a side)
// and, per tile, whether a cursor is shown there, a lazily cached ground
// height, and the vertical span of preview content on that tile. Tiles are
// stored column-major: index = dx * height + dy.
//
// Resizing or moving the window is always a full flush. Enablement is
// re-derived from grid bounds and ownership, and every cached ground height
// is dropped, because terrain and ownership may have changed since the last
// call. Heights are then fetched again on first use.
//
// `TrackPiecePreview` wraps a `TileCursor` and fits its window around a
// track piece's footprint: the window becomes the smallest rectangle
// containing every footprint tile, only footprint tiles show a cursor, and
// each records the heights the piece occupies there. Both types implement
// `CursorSelector`, which is what the renderer talks to.
//
// Redraw requests go to a `RedrawSink`. `mark_dirty` requests the ground
// voxel of each enabled tile, plus the piece's vertical span there when it
// reaches beyond the ground voxel. Reassigning a piece marks the old
// footprint before the new one, so stale highlights are always repainted.
//
// See also: `world.rs` for `WorldQuery`, `controller.rs` which assigns the
// current pick to the preview, `config.rs` for `max_overlay_extent`.
//
// **Critical constraint:** a footprint voxel outside the preview window is a
// bounding-rectangle bug and panics. The only exception is a window that was
// clamped to `max_extent`, where voxels past the clamp are skipped.

use crate::catalog::PieceTemplate;
use crate::types::{CursorType, TileRect, VoxelCoord};
use crate::world::WorldQuery;
use log::debug;
use rustc_hash::FxHashSet;

// ---------------------------------------------------------------------------
// Redraw requests
// ---------------------------------------------------------------------------

/// Receiver of redraw requests.
pub trait RedrawSink {
    /// Request redraw of `height` voxels stacked upward from `base`.
    fn mark_voxels_dirty(&mut self, base: VoxelCoord, height: i32);
}

/// A `RedrawSink` that collects every requested voxel.
#[derive(Clone, Debug, Default)]
pub struct DirtyVoxels {
    voxels: FxHashSet<VoxelCoord>,
}

impl DirtyVoxels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, voxel: VoxelCoord) -> bool {
        self.voxels.contains(&voxel)
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn clear(&mut self) {
        self.voxels.clear();
    }

    /// Requested voxels in ascending coordinate order.
    pub fn sorted(&self) -> Vec<VoxelCoord> {
        let mut voxels: Vec<_> = self.voxels.iter().copied().collect();
        voxels.sort();
        voxels
    }
}

impl RedrawSink for DirtyVoxels {
    fn mark_voxels_dirty(&mut self, base: VoxelCoord, height: i32) {
        for dz in 0..height {
            self.voxels.insert(VoxelCoord::new(base.x, base.y, base.z + dz));
        }
    }
}

// ---------------------------------------------------------------------------
// Tile window
// ---------------------------------------------------------------------------

/// Per-tile overlay state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileData {
    pub cursor_enabled: bool,
    /// Cached ground height; `None` until first queried.
    pub ground: Option<i32>,
    /// Lowest and highest voxel z covered by preview content.
    pub span: Option<(i32, i32)>,
}

impl TileData {
    fn add_voxel(&mut self, z: i32) {
        self.span = Some(match self.span {
            Some((lo, hi)) => (lo.min(z), hi.max(z)),
            None => (z, z),
        });
    }
}

/// Common interface of the overlay variants, as seen by the renderer.
pub trait CursorSelector {
    /// The window, in world tile coordinates.
    fn area(&self) -> TileRect;

    /// Cheap over-approximation: whether this selector may draw anything
    /// in the voxel column at `(x, y)`.
    fn is_inside_area(&self, x: i32, y: i32) -> bool {
        self.area().contains(x, y)
    }

    /// Cursor to draw at `voxel`, if any.
    fn cursor_at(&mut self, world: &dyn WorldQuery, voxel: VoxelCoord) -> Option<CursorType>;

    /// Request redraw of every voxel this selector currently affects.
    fn mark_dirty(&mut self, world: &dyn WorldQuery, sink: &mut dyn RedrawSink);
}

/// A window of tiles showing a cursor at ground level.
#[derive(Clone, Debug)]
pub struct TileCursor {
    area: TileRect,
    tiles: Vec<TileData>,
    cursor: CursorType,
    max_extent: u32,
}

impl TileCursor {
    pub fn new(cursor: CursorType, max_extent: u32) -> Self {
        Self {
            area: TileRect::default(),
            tiles: Vec::new(),
            cursor,
            max_extent,
        }
    }

    /// Change the window size, clamped to the maximum extent. Flushes all
    /// cached tile state.
    pub fn set_size(&mut self, world: &dyn WorldQuery, width: u32, height: u32) {
        let clamped_w = width.min(self.max_extent);
        let clamped_h = height.min(self.max_extent);
        if (clamped_w, clamped_h) != (width, height) {
            debug!("overlay window {width}x{height} clamped to {clamped_w}x{clamped_h}");
        }
        self.area.width = clamped_w;
        self.area.height = clamped_h;
        self.init_tile_data(world);
    }

    /// Move the window origin. Flushes all cached tile state.
    pub fn set_position(&mut self, world: &dyn WorldQuery, x: i32, y: i32) {
        self.area.base_x = x;
        self.area.base_y = y;
        self.init_tile_data(world);
    }

    pub fn max_extent(&self) -> u32 {
        self.max_extent
    }

    fn init_tile_data(&mut self, world: &dyn WorldQuery) {
        let (w, h) = (self.area.width as i32, self.area.height as i32);
        self.tiles.clear();
        self.tiles.reserve((w * h) as usize);
        for dx in 0..w {
            for dy in 0..h {
                let (x, y) = (self.area.base_x + dx, self.area.base_y + dy);
                self.tiles.push(TileData {
                    cursor_enabled: world.tile_in_grid(x, y) && world.is_owned(x, y),
                    ground: None,
                    span: None,
                });
            }
        }
    }

    fn tile_index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.area.contains(x, y) {
            return None;
        }
        let dx = (x - self.area.base_x) as usize;
        let dy = (y - self.area.base_y) as usize;
        Some(dx * self.area.height as usize + dy)
    }

    fn tile_coords(&self, index: usize) -> (i32, i32) {
        let h = self.area.height as usize;
        (
            self.area.base_x + (index / h) as i32,
            self.area.base_y + (index % h) as i32,
        )
    }

    /// Tile state at world tile `(x, y)`, if inside the window.
    pub fn tile(&self, x: i32, y: i32) -> Option<&TileData> {
        self.tile_index(x, y).map(|i| &self.tiles[i])
    }

    fn tile_mut(&mut self, x: i32, y: i32) -> Option<&mut TileData> {
        self.tile_index(x, y).map(|i| &mut self.tiles[i])
    }

    fn ground_at_index(&mut self, world: &dyn WorldQuery, index: usize) -> Option<i32> {
        if let Some(g) = self.tiles[index].ground {
            return Some(g);
        }
        let (x, y) = self.tile_coords(index);
        let g = world.ground_height(x, y)?;
        self.tiles[index].ground = Some(g);
        Some(g)
    }

    /// Ground height of a tile in the window, memoized until the next
    /// resize or move.
    pub fn ground_height(&mut self, world: &dyn WorldQuery, x: i32, y: i32) -> Option<i32> {
        let index = self.tile_index(x, y)?;
        self.ground_at_index(world, index)
    }
}

impl CursorSelector for TileCursor {
    fn area(&self) -> TileRect {
        self.area
    }

    fn cursor_at(&mut self, world: &dyn WorldQuery, voxel: VoxelCoord) -> Option<CursorType> {
        let index = self.tile_index(voxel.x, voxel.y)?;
        if !self.tiles[index].cursor_enabled {
            return None;
        }
        (self.ground_at_index(world, index)? == voxel.z).then_some(self.cursor)
    }

    fn mark_dirty(&mut self, world: &dyn WorldQuery, sink: &mut dyn RedrawSink) {
        for index in 0..self.tiles.len() {
            if !self.tiles[index].cursor_enabled {
                continue;
            }
            let (x, y) = self.tile_coords(index);
            let ground = self.ground_at_index(world, index);
            if let Some(g) = ground {
                sink.mark_voxels_dirty(VoxelCoord::new(x, y, g), 1);
            }
            if let Some((lo, hi)) = self.tiles[index].span {
                if ground != Some(lo) || ground != Some(hi) {
                    sink.mark_voxels_dirty(VoxelCoord::new(x, y, lo), hi - lo + 1);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Track piece preview
// ---------------------------------------------------------------------------

/// The piece currently shown by a `TrackPiecePreview`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewPiece {
    /// Catalog index of the template.
    pub template: usize,
    pub position: VoxelCoord,
}

/// A `TileCursor` fitted around the footprint of one track piece.
#[derive(Clone, Debug)]
pub struct TrackPiecePreview {
    cursor: TileCursor,
    piece: Option<PreviewPiece>,
}

impl TrackPiecePreview {
    pub fn new(cursor: CursorType, max_extent: u32) -> Self {
        Self {
            cursor: TileCursor::new(cursor, max_extent),
            piece: None,
        }
    }

    pub fn piece(&self) -> Option<PreviewPiece> {
        self.piece
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&TileData> {
        self.cursor.tile(x, y)
    }

    /// Show `piece` (catalog index and template) based at `position`, or
    /// nothing. The old footprint is marked dirty first, the new one after.
    pub fn assign_piece(
        &mut self,
        world: &dyn WorldQuery,
        sink: &mut dyn RedrawSink,
        position: VoxelCoord,
        piece: Option<(usize, &PieceTemplate)>,
    ) {
        if self.piece.is_some() {
            self.cursor.mark_dirty(world, sink);
        }

        let Some((index, template)) = piece else {
            self.piece = None;
            self.cursor.set_size(world, 0, 0);
            return;
        };

        let rect = template.area().translated(position.x, position.y);
        let truncated =
            rect.width > self.cursor.max_extent() || rect.height > self.cursor.max_extent();
        self.cursor.area.base_x = rect.base_x;
        self.cursor.area.base_y = rect.base_y;
        self.cursor.set_size(world, rect.width, rect.height);

        let area = self.cursor.area;
        for tile in &mut self.cursor.tiles {
            tile.cursor_enabled = false;
        }
        for offset in &template.footprint {
            let voxel = position + *offset;
            match self.cursor.tile_mut(voxel.x, voxel.y) {
                Some(tile) => {
                    tile.cursor_enabled = true;
                    tile.add_voxel(voxel.z);
                }
                None => assert!(
                    truncated,
                    "footprint voxel {voxel} outside preview window {area:?}"
                ),
            }
        }

        self.piece = Some(PreviewPiece {
            template: index,
            position,
        });
        self.cursor.mark_dirty(world, sink);
    }

    /// Show the same piece at a new base position. No-op without a piece.
    pub fn move_to(
        &mut self,
        world: &dyn WorldQuery,
        sink: &mut dyn RedrawSink,
        catalog: &[PieceTemplate],
        position: VoxelCoord,
    ) {
        let Some(current) = self.piece else {
            return;
        };
        let template = catalog.get(current.template);
        self.assign_piece(
            world,
            sink,
            position,
            template.map(|t| (current.template, t)),
        );
    }
}

impl CursorSelector for TrackPiecePreview {
    fn area(&self) -> TileRect {
        self.cursor.area()
    }

    fn cursor_at(&mut self, world: &dyn WorldQuery, voxel: VoxelCoord) -> Option<CursorType> {
        self.cursor.cursor_at(world, voxel)
    }

    fn mark_dirty(&mut self, world: &dyn WorldQuery, sink: &mut dyn RedrawSink) {
        self.cursor.mark_dirty(world, sink);
    }
}
