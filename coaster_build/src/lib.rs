// coaster_build: roller coaster track construction core.
//
// Everything behind the coaster build window that is not widgets or
// rendering: narrowing the piece catalog down to one piece from the user's
// attribute choices, previewing that piece on the voxel grid with minimal
// redraws, and the small state machine that places, removes and navigates
// placed track. The UI layer sends `BuildAction`s and reads back
// `ControlState` and cursor queries; the world store is reached only
// through the traits in `world.rs`.
//
// Module overview:
// - `types.rs`:      VoxelCoord, TileRect, attribute enums, connector codes, ids.
// - `catalog.rs`:    PieceTemplate + TrackCatalog (JSON-loadable content).
// - `config.rs`:     BuildConfig: catalog and overlay ceilings, cursor, start direction.
// - `selector.rs`:   Attribute narrowing rounds, value masks, candidate sets.
// - `overlay.rs`:    TileCursor / TrackPiecePreview tile windows + RedrawSink.
// - `arena.rs`:      SlotArena: block-allocated slots with occupancy bitmaps.
// - `layout.rs`:     TrackLayout: placed segments, successor/predecessor lookup.
// - `world.rs`:      World traits (queries, staging overlay, placement check) + VoxelWorld.
// - `controller.rs`: ConstructionController: modes, commit/remove/navigation, errors.
// - `command.rs`:    BuildAction: every user input.
// - `event.rs`:      BuildEvent: what an input caused.
// - `replay.rs`:     Scripted sessions, used by the `replay` binary.
//
// **Critical constraint:** single-threaded and synchronous. Nothing here
// blocks, spawns, or holds world state across calls.

pub mod arena;
pub mod catalog;
pub mod command;
pub mod config;
pub mod controller;
pub mod event;
pub mod layout;
pub mod overlay;
pub mod replay;
pub mod selector;
pub mod types;
pub mod world;
