// Track piece templates and the per-coaster-type catalog.
//
// A `PieceTemplate` is an immutable description of one connectable track
// piece: its entry/exit connector codes, whether (and in which direction)
// it can start a new track, its banking/slope/bend classes, the platform
// and power flags, the voxels it occupies relative to its base position,
// and the offset from its base to the base of the piece that follows it.
//
// `TrackCatalog` is the ordered list of templates supplied by game content.
// Order matters: the narrowing selector picks the first surviving template
// in catalog order, so the catalog is never re-sorted. Catalogs load from
// JSON so content can be edited without recompiling.
//
// See also: `selector.rs` for the narrowing rounds over the catalog,
// `layout.rs` for `PlacedSegment` which binds a template index to a
// position, `overlay.rs` which previews a template's footprint.

use crate::types::{Banking, ConnectorCode, TileEdge, TileRect, TrackBend, TrackSlope, VoxelCoord};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Voxels occupied by a piece, relative to its base position. Nearly every
/// piece fits inline.
pub type Footprint = SmallVec<[VoxelCoord; 8]>;

/// One connectable track piece definition. Never mutated after loading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceTemplate {
    /// Human-readable name, for logs and tooling only.
    #[serde(default)]
    pub name: String,
    pub entry: ConnectorCode,
    pub exit: ConnectorCode,
    /// `Some(direction)` for pieces that may start a new track.
    #[serde(default)]
    pub start_direction: Option<TileEdge>,
    pub banking: Banking,
    pub slope: TrackSlope,
    pub bend: TrackBend,
    #[serde(default)]
    pub platform: bool,
    #[serde(default)]
    pub powered: bool,
    pub footprint: Footprint,
    /// Offset from this piece's base to the base of its successor.
    pub exit_offset: VoxelCoord,
}

impl PieceTemplate {
    pub fn is_starting_piece(&self) -> bool {
        self.start_direction.is_some()
    }

    /// Smallest tile rectangle covering the footprint, relative to the
    /// piece's base. The origin is negative when the piece extends behind
    /// or to the side of its base.
    pub fn area(&self) -> TileRect {
        TileRect::covering(&self.footprint)
    }
}

/// Ordered, indexable list of piece templates for one coaster type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackCatalog {
    pieces: Vec<PieceTemplate>,
}

impl TrackCatalog {
    pub fn new(pieces: Vec<PieceTemplate>) -> Self {
        Self { pieces }
    }

    pub fn pieces(&self) -> &[PieceTemplate] {
        &self.pieces
    }

    pub fn get(&self, index: usize) -> Option<&PieceTemplate> {
        self.pieces.get(index)
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Load a catalog from a JSON array of templates.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
