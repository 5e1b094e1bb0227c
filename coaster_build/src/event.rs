// Outputs of the construction controller.
//
// A successful `ConstructionController::apply` returns the `BuildEvent`s it
// caused, in the order they happened. Rejected inputs return an error and
// no events. Pure selection changes (attribute buttons, drags) produce no
// events; the UI reads `ControlState` for those.
//
// See also: `controller.rs` which emits these, `command.rs` for the inputs.

use crate::controller::BuildMode;
use crate::types::{SegmentId, TileEdge, VoxelCoord};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildEvent {
    /// A piece was added to the layout and committed to the world.
    PiecePlaced {
        segment: SegmentId,
        template: usize,
        position: VoxelCoord,
    },
    /// A piece was removed from the layout and erased from the world.
    PieceRemoved {
        segment: SegmentId,
        template: usize,
        position: VoxelCoord,
    },
    /// The anchor changed. `None` means back to placing a first piece.
    AnchorMoved { anchor: Option<SegmentId> },
    BuildDirectionChanged { direction: TileEdge },
    ModeChanged { mode: BuildMode },
}
