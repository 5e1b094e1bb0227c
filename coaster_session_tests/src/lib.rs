// Test-only construction session for integration tests.
//
// Wires a real `TrackCatalog`, `TrackLayout`, `VoxelWorld`, `DirtyVoxels`
// redraw sink and `ConstructionController` together behind a small
// synchronous API, so scenarios read as a sequence of user inputs followed
// by checks on the layout, the world and the preview overlay.
//
// The only test-specific code here is the plumbing that borrows the
// session's parts into a `BuildContext` for each call. Narrowing, preview
// and placement all run through the same code paths as the game.
//
// See also: `tests/full_session.rs` for the scenarios.

use coaster_build::catalog::TrackCatalog;
use coaster_build::command::BuildAction;
use coaster_build::config::BuildConfig;
use coaster_build::controller::{BuildContext, BuildError, ConstructionController};
use coaster_build::event::BuildEvent;
use coaster_build::layout::TrackLayout;
use coaster_build::overlay::{CursorSelector, DirtyVoxels};
use coaster_build::selector::AttributeChoice;
use coaster_build::types::{CursorType, TileRect, VoxelCoord};
use coaster_build::world::VoxelWorld;

/// The sample catalog shipped with the `replay` tool.
pub const SAMPLE_CATALOG_JSON: &str = include_str!("../../coaster_build/data/sample_catalog.json");

/// The sample replay script shipped with the `replay` tool.
pub const SAMPLE_SCRIPT_JSON: &str = include_str!("../../coaster_build/data/sample_script.json");

pub fn sample_catalog() -> TrackCatalog {
    TrackCatalog::from_json(SAMPLE_CATALOG_JSON).expect("sample catalog must parse")
}

/// 32x32x16 world with flat ground at height 1, every tile owned.
pub fn flat_world() -> VoxelWorld {
    VoxelWorld::new(32, 32, 16, 1)
}

/// A construction session over owned parts.
pub struct TestSession {
    pub catalog: TrackCatalog,
    pub layout: TrackLayout,
    pub world: VoxelWorld,
    pub redraw: DirtyVoxels,
    pub controller: ConstructionController,
}

impl TestSession {
    /// Open a session with default config on an empty layout.
    pub fn new(catalog: TrackCatalog, world: VoxelWorld) -> Self {
        Self::with_layout(BuildConfig::default(), catalog, world, TrackLayout::new())
    }

    /// Open a session on existing track.
    pub fn with_layout(
        config: BuildConfig,
        catalog: TrackCatalog,
        mut world: VoxelWorld,
        mut layout: TrackLayout,
    ) -> Self {
        let mut redraw = DirtyVoxels::new();
        let controller = ConstructionController::open(
            config,
            &mut BuildContext {
                catalog: &catalog,
                layout: &mut layout,
                world: &mut world,
                redraw: &mut redraw,
            },
        );
        Self {
            catalog,
            layout,
            world,
            redraw,
            controller,
        }
    }

    fn ctx(&mut self) -> BuildContext<'_, VoxelWorld> {
        BuildContext {
            catalog: &self.catalog,
            layout: &mut self.layout,
            world: &mut self.world,
            redraw: &mut self.redraw,
        }
    }

    pub fn apply(&mut self, action: BuildAction) -> Result<Vec<BuildEvent>, BuildError> {
        let mut ctx = BuildContext {
            catalog: &self.catalog,
            layout: &mut self.layout,
            world: &mut self.world,
            redraw: &mut self.redraw,
        };
        self.controller.apply(&mut ctx, action)
    }

    /// Apply an action that must succeed.
    pub fn apply_ok(&mut self, action: BuildAction) -> Vec<BuildEvent> {
        self.apply(action)
            .unwrap_or_else(|err| panic!("{action:?} was rejected: {err}"))
    }

    pub fn select(&mut self, choice: AttributeChoice) {
        self.apply_ok(BuildAction::SelectAttribute { choice });
    }

    pub fn drag_to(&mut self, x: i32, y: i32, z: i32) {
        self.apply_ok(BuildAction::DragTo {
            position: VoxelCoord::new(x, y, z),
        });
    }

    /// Close the session and open a fresh one on the same layout.
    pub fn reopen(&mut self) {
        let config = self.controller.config().clone();
        let fresh = ConstructionController::open(config, &mut self.ctx());
        let old = std::mem::replace(&mut self.controller, fresh);
        old.close(&mut self.ctx());
    }

    /// Cursor the renderer would draw at `voxel`.
    pub fn cursor_at(&mut self, voxel: VoxelCoord) -> Option<CursorType> {
        self.controller.overlay().cursor_at(&self.world, voxel)
    }

    pub fn overlay_area(&mut self) -> TileRect {
        self.controller.overlay().area()
    }
}
