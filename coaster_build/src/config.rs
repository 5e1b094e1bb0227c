// Data-driven construction configuration.
//
// All tunable limits of the construction core live in `BuildConfig`, loaded
// from JSON. The selector and overlay never hard-code their safety ceilings;
// they read them from here. Missing fields fall back to the defaults below,
// so a partial (or empty) JSON object is a valid config.
//
// See also: `controller.rs` which owns a `BuildConfig`, `selector.rs` for
// the catalog ceiling, `overlay.rs` for the window extent ceiling.

use crate::types::{CursorType, TileEdge};
use serde::{Deserialize, Serialize};

/// Tunable parameters for a construction session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Only the first `max_catalog_pieces` templates of a catalog take part
    /// in narrowing. Larger catalogs are truncated, not rejected.
    pub max_catalog_pieces: usize,
    /// Maximum width and height (in tiles) of the preview overlay window.
    pub max_overlay_extent: u32,
    /// Cursor returned by the overlay for highlighted ground voxels.
    pub cursor: CursorType,
    /// Build direction when a session starts without any placed track.
    pub initial_build_direction: TileEdge,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_catalog_pieces: 1024,
            max_overlay_extent: 128,
            cursor: CursorType::Tile,
            initial_build_direction: TileEdge::NorthEast,
        }
    }
}

impl BuildConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
