// Scripted construction sessions.
//
// A `ReplayScript` describes a world (size, flat ground height, tiles the
// park does not own) and a list of `BuildAction`s. `run_script` opens a
// controller on an empty layout, feeds it every action in order, and
// reports the events and rejections along with the final layout. Rejected
// actions are recorded and skipped, as the UI would ignore them.
//
// See also: `main.rs` for the `replay` binary that loads scripts from disk,
// `controller.rs` for the controller being driven.

use crate::catalog::TrackCatalog;
use crate::command::BuildAction;
use crate::config::BuildConfig;
use crate::controller::{BuildContext, BuildError, ConstructionController};
use crate::event::BuildEvent;
use crate::layout::TrackLayout;
use crate::overlay::DirtyVoxels;
use crate::world::VoxelWorld;
use serde::{Deserialize, Serialize};

/// The world a script runs in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSpec {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    #[serde(default)]
    pub ground_height: i32,
    /// Tiles `(x, y)` not owned by the park.
    #[serde(default)]
    pub unowned: Vec<(i32, i32)>,
}

impl WorldSpec {
    pub fn build(&self) -> VoxelWorld {
        let mut world = VoxelWorld::new(self.size_x, self.size_y, self.size_z, self.ground_height);
        for &(x, y) in &self.unowned {
            world.set_owned(x, y, false);
        }
        world
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub world: WorldSpec,
    pub actions: Vec<BuildAction>,
}

impl ReplayScript {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// What a script run produced.
#[derive(Debug)]
pub struct ReplayReport {
    pub layout: TrackLayout,
    pub world: VoxelWorld,
    pub events: Vec<BuildEvent>,
    /// Index into the script's actions, and why it was ignored.
    pub rejected: Vec<(usize, BuildError)>,
}

pub fn run_script(
    config: &BuildConfig,
    catalog: &TrackCatalog,
    script: &ReplayScript,
) -> ReplayReport {
    let mut layout = TrackLayout::new();
    let mut world = script.world.build();
    let mut redraw = DirtyVoxels::new();
    let mut events = Vec::new();
    let mut rejected = Vec::new();

    let mut ctx = BuildContext {
        catalog,
        layout: &mut layout,
        world: &mut world,
        redraw: &mut redraw,
    };
    let mut controller = ConstructionController::open(config.clone(), &mut ctx);
    for (i, action) in script.actions.iter().enumerate() {
        match controller.apply(&mut ctx, *action) {
            Ok(produced) => events.extend(produced),
            Err(err) => rejected.push((i, err)),
        }
    }
    controller.close(&mut ctx);

    ReplayReport {
        layout,
        world,
        events,
        rejected,
    }
}
