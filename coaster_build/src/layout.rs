// Placed track segments of one coaster.
//
// A `PlacedSegment` binds a catalog template (by index) to a base voxel.
// Segments are pooled in a `SlotArena`, so a `SegmentId` stays valid until
// that segment is removed. There are no explicit next/previous pointers:
// the chain is derived from geometry and connector codes. B follows A when
// B's base equals A's end (`A.base + A.exit_offset`) and B's entry code
// equals A's exit code. The predecessor relation is the mirror image.
//
// The layout saves to JSON as a list of `(id, segment)` pairs so ids
// survive a save/load cycle. Loading refuses ids at or above
// `MAX_SEGMENTS` and repeated ids.
//
// See also: `arena.rs` for the slot/bitmap allocator, `controller.rs`
// which adds and removes segments on commit/remove, `catalog.rs` for the
// templates segments refer to.

use crate::arena::SlotArena;
use crate::catalog::TrackCatalog;
use crate::types::{SegmentId, VoxelCoord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest segment id a saved layout may use, exclusive. The arena grows to
/// the largest id on load, so this also bounds the memory a load can take.
pub const MAX_SEGMENTS: u32 = 1 << 16;

/// A catalog template placed at a concrete base position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedSegment {
    /// Index into the coaster's `TrackCatalog`.
    pub template: usize,
    pub base: VoxelCoord,
}

impl PlacedSegment {
    /// Base position of the piece that would follow this one, or `None` if
    /// the template index is not in `catalog`.
    pub fn end(&self, catalog: &TrackCatalog) -> Option<VoxelCoord> {
        catalog.get(self.template).map(|t| self.base + t.exit_offset)
    }
}

/// All placed segments of one coaster.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "SavedLayout", into = "SavedLayout")]
pub struct TrackLayout {
    segments: SlotArena<PlacedSegment>,
}

#[derive(Serialize, Deserialize)]
struct SavedLayout {
    segments: Vec<(SegmentId, PlacedSegment)>,
}

impl From<TrackLayout> for SavedLayout {
    fn from(layout: TrackLayout) -> Self {
        Self {
            segments: layout.iter().map(|(id, seg)| (id, *seg)).collect(),
        }
    }
}

impl TryFrom<SavedLayout> for TrackLayout {
    type Error = LayoutError;

    fn try_from(saved: SavedLayout) -> Result<Self, LayoutError> {
        let mut segments = SlotArena::new();
        for (id, seg) in saved.segments {
            if id.0 >= MAX_SEGMENTS {
                return Err(LayoutError::IdOutOfRange(id));
            }
            if segments.is_active(id.0) {
                return Err(LayoutError::DuplicateId(id));
            }
            segments.insert_at(id.0, seg);
        }
        Ok(Self { segments })
    }
}

/// Why a saved layout was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutError {
    IdOutOfRange(SegmentId),
    DuplicateId(SegmentId),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::IdOutOfRange(id) => {
                write!(f, "{id} is beyond the {MAX_SEGMENTS} segment limit")
            }
            LayoutError::DuplicateId(id) => write!(f, "{id} appears more than once"),
        }
    }
}

impl std::error::Error for LayoutError {}

impl TrackLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, segment: PlacedSegment) -> SegmentId {
        SegmentId(self.segments.allocate(segment))
    }

    pub fn remove(&mut self, id: SegmentId) -> Option<PlacedSegment> {
        self.segments.release(id.0)
    }

    pub fn get(&self, id: SegmentId) -> Option<&PlacedSegment> {
        self.segments.get(id.0)
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.segments.is_active(id.0)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &PlacedSegment)> {
        self.segments.iter().map(|(i, seg)| (SegmentId(i), seg))
    }

    /// Lowest-id placed segment, where an editing session starts.
    pub fn first_placed(&self) -> Option<SegmentId> {
        self.iter().next().map(|(id, _)| id)
    }

    /// The segment attached after `id`, if any.
    pub fn find_successor(&self, catalog: &TrackCatalog, id: SegmentId) -> Option<SegmentId> {
        let seg = self.get(id)?;
        let exit = catalog.get(seg.template)?.exit;
        let end = seg.end(catalog)?;
        self.iter()
            .filter(|(other, _)| *other != id)
            .find(|(_, other)| {
                other.base == end
                    && catalog
                        .get(other.template)
                        .is_some_and(|t| t.entry == exit)
            })
            .map(|(other, _)| other)
    }

    /// The segment attached before `id`, if any.
    pub fn find_predecessor(&self, catalog: &TrackCatalog, id: SegmentId) -> Option<SegmentId> {
        let seg = self.get(id)?;
        let entry = catalog.get(seg.template)?.entry;
        self.iter()
            .filter(|(other, _)| *other != id)
            .find(|(_, other)| {
                other.end(catalog) == Some(seg.base)
                    && catalog
                        .get(other.template)
                        .is_some_and(|t| t.exit == entry)
            })
            .map(|(other, _)| other)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PieceTemplate;
    use crate::types::{Banking, ConnectorCode, TileEdge, TrackBend, TrackSlope};
    use smallvec::smallvec;

    fn piece(entry: u8, exit: u8, exit_offset: VoxelCoord) -> PieceTemplate {
        PieceTemplate {
            name: String::new(),
            entry: ConnectorCode(entry),
            exit: ConnectorCode(exit),
            start_direction: Some(TileEdge::NorthEast),
            banking: Banking::None,
            slope: TrackSlope::Flat,
            bend: TrackBend::Straight,
            platform: false,
            powered: false,
            footprint: smallvec![VoxelCoord::new(0, 0, 0)],
            exit_offset,
        }
    }

    /// Template 0 runs 1 -> 1 one tile along +x; template 1 runs 1 -> 2.
    fn catalog() -> TrackCatalog {
        TrackCatalog::new(vec![
            piece(1, 1, VoxelCoord::new(1, 0, 0)),
            piece(1, 2, VoxelCoord::new(1, 0, 0)),
        ])
    }

    fn seg(template: usize, x: i32) -> PlacedSegment {
        PlacedSegment {
            template,
            base: VoxelCoord::new(x, 0, 0),
        }
    }

    #[test]
    fn chain_is_derived_from_positions_and_connectors() {
        let catalog = catalog();
        let mut layout = TrackLayout::new();
        let a = layout.add(seg(0, 0));
        let b = layout.add(seg(0, 1));
        let c = layout.add(seg(1, 2));

        assert_eq!(layout.find_successor(&catalog, a), Some(b));
        assert_eq!(layout.find_successor(&catalog, b), Some(c));
        assert_eq!(layout.find_successor(&catalog, c), None);

        assert_eq!(layout.find_predecessor(&catalog, c), Some(b));
        assert_eq!(layout.find_predecessor(&catalog, b), Some(a));
        assert_eq!(layout.find_predecessor(&catalog, a), None);
    }

    #[test]
    fn connector_mismatch_breaks_the_chain() {
        let catalog = catalog();
        let mut layout = TrackLayout::new();
        // Template 1 exits with code 2; template 0 enters with code 1.
        let a = layout.add(seg(1, 0));
        let b = layout.add(seg(0, 1));
        assert_eq!(layout.find_successor(&catalog, a), None);
        assert_eq!(layout.find_predecessor(&catalog, b), None);
    }

    #[test]
    fn removed_segment_id_is_reused() {
        let mut layout = TrackLayout::new();
        let a = layout.add(seg(0, 0));
        let b = layout.add(seg(0, 1));
        assert_eq!(layout.remove(a), Some(seg(0, 0)));
        assert!(!layout.contains(a));
        assert_eq!(layout.first_placed(), Some(b));
        assert_eq!(layout.add(seg(0, 5)), a);
        assert_eq!(layout.first_placed(), Some(a));
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn end_needs_known_template() {
        let catalog = catalog();
        assert_eq!(seg(0, 3).end(&catalog), Some(VoxelCoord::new(4, 0, 0)));
        assert_eq!(seg(7, 3).end(&catalog), None);
    }

    #[test]
    fn json_keeps_segment_ids() {
        let catalog = catalog();
        let mut layout = TrackLayout::new();
        let a = layout.add(seg(0, 0));
        let b = layout.add(seg(0, 1));
        let c = layout.add(seg(0, 2));
        layout.remove(b);

        let restored = TrackLayout::from_json(&layout.to_json().unwrap()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get(a), Some(&seg(0, 0)));
        assert_eq!(restored.get(c), Some(&seg(0, 2)));
        assert_eq!(restored.get(b), None);
        assert_eq!(restored.find_successor(&catalog, a), None);
    }

    #[test]
    fn load_refuses_huge_or_repeated_ids() {
        let seg = r#"{"template": 0, "base": {"x": 0, "y": 0, "z": 0}}"#;

        let huge = format!(r#"{{"segments": [[20000000, {seg}]]}}"#);
        let err = TrackLayout::from_json(&huge).unwrap_err();
        assert!(err.to_string().contains("SegmentId(20000000)"), "{err}");

        let last_ok = format!(r#"{{"segments": [[{}, {seg}]]}}"#, MAX_SEGMENTS - 1);
        let layout = TrackLayout::from_json(&last_ok).unwrap();
        assert!(layout.contains(SegmentId(MAX_SEGMENTS - 1)));

        let repeated = format!(r#"{{"segments": [[3, {seg}], [3, {seg}]]}}"#);
        let err = TrackLayout::from_json(&repeated).unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err}");
    }

    #[test]
    fn empty_layout_has_no_first_piece() {
        let layout = TrackLayout::new();
        assert!(layout.is_empty());
        assert_eq!(layout.first_placed(), None);
    }
}
