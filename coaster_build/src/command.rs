// Inputs to the construction controller.
//
// Every user interaction with the construction UI arrives as a
// `BuildAction`. The UI layer translates button presses, rotate keys and
// mouse drags into these; the controller never sees widgets. Actions are
// serde types so a session can be scripted and replayed (see `main.rs`).
//
// - `SelectAttribute` / `ClearAttribute`: change one narrowing dimension.
//   Platform and power choices toggle (see `AttributeSelection::apply`).
// - `Commit`: place the previewed piece.
// - `Remove`: delete the anchor piece and step back to its predecessor.
// - `Rotate`: cycle the build direction of a starting piece.
// - `DragTo`: move a starting piece's preview before it is placed.
// - `Forward` / `Backward`: walk the anchor along already-placed track.
//
// See also: `controller.rs` for `ConstructionController::apply`, which
// dispatches these, `event.rs` for what it emits.

use crate::selector::{AttributeChoice, Dimension};
use crate::types::{RotateDirection, VoxelCoord};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildAction {
    SelectAttribute { choice: AttributeChoice },
    ClearAttribute { dimension: Dimension },
    Commit,
    Remove,
    Rotate { direction: RotateDirection },
    /// Only allowed while placing the first piece.
    DragTo { position: VoxelCoord },
    Forward,
    Backward,
}
