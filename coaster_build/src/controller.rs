// Construction controller: the state machine behind the coaster build UI.
//
// Holds where the next piece attaches (`AttachState`), the user's attribute
// selection, the latest narrowing result, and the piece preview overlay.
// Every input arrives as a `BuildAction` through `apply`, which validates,
// mutates, then reruns narrowing and refreshes the preview.
//
// Modes, derived from `AttachState`:
// - `PlacingInitial`: no anchor. Candidates are starting pieces facing the
//   build direction; the preview sits at a position the user drags around.
// - `Appending`: a piece is added after the anchor, at the anchor's end.
// - `InsertingBefore`: a piece would go before the anchor. Narrowing runs,
//   but preview and commit report `BuildError::UnsupportedMode`.
//
// The "obstruction" is the piece already attached after the anchor. While
// one exists the slot is taken: nothing narrows, nothing can be committed,
// and the user can only navigate. Commit and remove each issue exactly one
// `clear` → write/erase → `commit` sequence against the world's staging
// overlay, and only after the layout change and placement check succeeded.
//
// World, catalog, layout and redraw sink are borrowed per call through
// `BuildContext`; the controller owns none of them.
//
// See also: `selector.rs` for narrowing, `overlay.rs` for the preview,
// `layout.rs` for successor/predecessor lookup, `command.rs` and `event.rs`
// for the input and output types.
//
// **Critical constraint:** a rejected input changes nothing. Every handler
// checks all of its preconditions before its first mutation.

use crate::catalog::TrackCatalog;
use crate::command::BuildAction;
use crate::config::BuildConfig;
use crate::event::BuildEvent;
use crate::layout::{PlacedSegment, TrackLayout};
use crate::overlay::{PreviewPiece, RedrawSink, TrackPiecePreview};
use crate::selector::{Attachment, AttributeSelection, NarrowingOutcome, ValueMask, narrow};
use crate::types::{
    Banking, RotateDirection, SegmentId, TileEdge, TrackBend, TrackSlope, VoxelCoord,
};
use crate::world::{BuildWorld, WorldQuery};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildMode {
    PlacingInitial,
    Appending,
    InsertingBefore,
}

/// Where the next piece attaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachState {
    pub anchor: Option<SegmentId>,
    /// Attach after the anchor (`true`) or before it.
    pub after: bool,
    /// Build direction of a starting piece. Only used without an anchor.
    pub direction: TileEdge,
}

impl AttachState {
    pub fn mode(&self) -> BuildMode {
        match (self.anchor, self.after) {
            (None, _) => BuildMode::PlacingInitial,
            (Some(_), true) => BuildMode::Appending,
            (Some(_), false) => BuildMode::InsertingBefore,
        }
    }
}

/// What the UI should show after an input: which buttons are available,
/// which are pressed, and which controls are enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlState {
    pub mode: BuildMode,
    pub direction: TileEdge,
    pub selection: AttributeSelection,
    pub direction_mask: ValueMask<TileEdge>,
    pub banking_mask: ValueMask<Banking>,
    pub slope_mask: ValueMask<TrackSlope>,
    pub bend_mask: ValueMask<TrackBend>,
    pub platform_mask: ValueMask<bool>,
    pub power_mask: ValueMask<bool>,
    pub can_rotate: bool,
    pub can_backward: bool,
    pub can_forward: bool,
    pub can_commit: bool,
    pub can_remove: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an input was ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    NoAnchor,
    NotUnambiguous,
    SlotObstructed,
    InvalidPlacement,
    NoPredecessorToReturnTo,
    NothingToNavigate,
    AnchorFixesDirection,
    PositionFixedByAnchor,
    NothingToRemove,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::NoAnchor => "no anchor piece",
            RejectReason::NotUnambiguous => "more than one candidate piece",
            RejectReason::SlotObstructed => "a piece already occupies the slot",
            RejectReason::InvalidPlacement => "piece cannot be placed there",
            RejectReason::NoPredecessorToReturnTo => "already before the first piece",
            RejectReason::NothingToNavigate => "no placed piece ahead",
            RejectReason::AnchorFixesDirection => "direction is fixed by the anchor",
            RejectReason::PositionFixedByAnchor => "position is fixed by the anchor",
            RejectReason::NothingToRemove => "no piece to remove",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildError {
    Rejected(RejectReason),
    UnsupportedMode(BuildMode),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Rejected(reason) => write!(f, "input rejected: {reason}"),
            BuildError::UnsupportedMode(mode) => write!(f, "not supported in mode {mode:?}"),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<RejectReason> for BuildError {
    fn from(reason: RejectReason) -> Self {
        BuildError::Rejected(reason)
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Borrowed collaborators for one controller call.
pub struct BuildContext<'a, W> {
    pub catalog: &'a TrackCatalog,
    pub layout: &'a mut TrackLayout,
    pub world: &'a mut W,
    pub redraw: &'a mut dyn RedrawSink,
}

pub struct ConstructionController {
    config: BuildConfig,
    attach: AttachState,
    /// Piece already attached after the anchor, if any.
    obstruction: Option<SegmentId>,
    selection: AttributeSelection,
    outcome: NarrowingOutcome,
    preview: TrackPiecePreview,
    /// Base of a starting piece, set by dragging.
    initial_position: VoxelCoord,
}

impl ConstructionController {
    /// Start a session on `ctx.layout`. With placed track, the session
    /// anchors on the first placed piece.
    pub fn open<W: BuildWorld>(config: BuildConfig, ctx: &mut BuildContext<'_, W>) -> Self {
        let anchor = ctx.layout.first_placed();
        let obstruction = anchor.and_then(|a| ctx.layout.find_successor(ctx.catalog, a));
        let attach = AttachState {
            anchor,
            after: true,
            direction: config.initial_build_direction,
        };
        let selection = AttributeSelection::default();
        let outcome = run_narrowing(
            &config,
            &attach,
            obstruction,
            &selection,
            ctx.catalog,
            &*ctx.layout,
        );
        let preview = TrackPiecePreview::new(config.cursor, config.max_overlay_extent);
        let mut controller = Self {
            config,
            attach,
            obstruction,
            selection,
            outcome,
            preview,
            initial_position: VoxelCoord::default(),
        };
        controller.refresh(ctx);
        controller
    }

    /// End the session. Repaints the preview area; placed track is untouched.
    pub fn close<W: BuildWorld>(mut self, ctx: &mut BuildContext<'_, W>) {
        let world: &dyn WorldQuery = &*ctx.world;
        self.preview
            .assign_piece(world, &mut *ctx.redraw, self.initial_position, None);
    }

    pub fn mode(&self) -> BuildMode {
        self.attach.mode()
    }

    pub fn attach_state(&self) -> AttachState {
        self.attach
    }

    pub fn obstruction(&self) -> Option<SegmentId> {
        self.obstruction
    }

    pub fn selection(&self) -> AttributeSelection {
        self.selection
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Result of the latest narrowing pass.
    pub fn outcome(&self) -> &NarrowingOutcome {
        &self.outcome
    }

    /// The previewed piece, if any.
    pub fn preview(&self) -> Result<Option<PreviewPiece>, BuildError> {
        match self.mode() {
            BuildMode::InsertingBefore => Err(BuildError::UnsupportedMode(self.mode())),
            _ => Ok(self.preview.piece()),
        }
    }

    /// The preview overlay, for cursor queries by the renderer.
    pub fn overlay(&mut self) -> &mut TrackPiecePreview {
        &mut self.preview
    }

    pub fn control_state(&self) -> ControlState {
        let mode = self.mode();
        let o = &self.outcome;
        ControlState {
            mode,
            direction: self.attach.direction,
            selection: self.selection,
            direction_mask: o.direction_mask,
            banking_mask: o.banking_mask,
            slope_mask: o.slope_mask,
            bend_mask: o.bend_mask,
            platform_mask: o.platform_mask,
            power_mask: o.power_mask,
            can_rotate: self.attach.anchor.is_none() && o.direction_mask.count() > 1,
            can_backward: mode == BuildMode::Appending,
            can_forward: self.obstruction.is_some() || mode == BuildMode::InsertingBefore,
            can_commit: mode != BuildMode::InsertingBefore
                && self.obstruction.is_none()
                && o.unambiguous().is_some(),
            can_remove: mode == BuildMode::Appending && self.obstruction.is_none(),
        }
    }

    /// Handle one input. On error nothing changed.
    pub fn apply<W: BuildWorld>(
        &mut self,
        ctx: &mut BuildContext<'_, W>,
        action: BuildAction,
    ) -> Result<Vec<BuildEvent>, BuildError> {
        self.dispatch(ctx, action)
            .inspect_err(|err| debug!("{action:?} ignored: {err}"))
    }

    fn dispatch<W: BuildWorld>(
        &mut self,
        ctx: &mut BuildContext<'_, W>,
        action: BuildAction,
    ) -> Result<Vec<BuildEvent>, BuildError> {
        let mode_before = self.mode();
        let mut events = Vec::new();
        match action {
            BuildAction::SelectAttribute { choice } => self.selection.apply(choice),
            BuildAction::ClearAttribute { dimension } => self.selection.clear(dimension),
            BuildAction::Commit => self.commit(ctx, &mut events)?,
            BuildAction::Remove => self.remove(ctx, &mut events)?,
            BuildAction::Rotate { direction } => self.rotate(direction, &mut events)?,
            BuildAction::DragTo { position } => {
                // Only the preview moves; candidates are unaffected.
                self.drag_to(ctx, position)?;
                return Ok(events);
            }
            BuildAction::Forward => self.forward(ctx, &mut events)?,
            BuildAction::Backward => self.backward(ctx, &mut events)?,
        }

        self.refresh(ctx);
        let mode = self.mode();
        if mode != mode_before {
            events.push(BuildEvent::ModeChanged { mode });
        }
        Ok(events)
    }

    fn commit<W: BuildWorld>(
        &mut self,
        ctx: &mut BuildContext<'_, W>,
        events: &mut Vec<BuildEvent>,
    ) -> Result<(), BuildError> {
        let mode = self.mode();
        if mode == BuildMode::InsertingBefore {
            return Err(BuildError::UnsupportedMode(mode));
        }
        if self.obstruction.is_some() {
            return Err(RejectReason::SlotObstructed.into());
        }
        let index = self
            .outcome
            .unambiguous()
            .ok_or(RejectReason::NotUnambiguous)?;
        let template = ctx
            .catalog
            .get(index)
            .ok_or(RejectReason::InvalidPlacement)?;
        let position = self
            .build_position(ctx.catalog, &*ctx.layout)
            .ok_or(RejectReason::InvalidPlacement)?;
        if !ctx.world.can_place(template, position) {
            return Err(RejectReason::InvalidPlacement.into());
        }

        let segment = ctx.layout.add(PlacedSegment {
            template: index,
            base: position,
        });
        ctx.world.clear();
        ctx.world.write_footprint(template, position);
        ctx.world.commit();
        info!(
            "placed {segment} ({:?}, template {index}) at {position}",
            template.name
        );

        self.attach.anchor = Some(segment);
        self.attach.after = true;
        self.obstruction = ctx.layout.find_successor(ctx.catalog, segment);
        events.push(BuildEvent::PiecePlaced {
            segment,
            template: index,
            position,
        });
        events.push(BuildEvent::AnchorMoved {
            anchor: Some(segment),
        });
        Ok(())
    }

    fn remove<W: BuildWorld>(
        &mut self,
        ctx: &mut BuildContext<'_, W>,
        events: &mut Vec<BuildEvent>,
    ) -> Result<(), BuildError> {
        let anchor = self.attach.anchor.ok_or(RejectReason::NothingToRemove)?;
        let mode = self.mode();
        if mode == BuildMode::InsertingBefore {
            // The anchor still leads the rest of the track.
            return Err(BuildError::UnsupportedMode(mode));
        }
        if self.obstruction.is_some() {
            return Err(RejectReason::SlotObstructed.into());
        }
        let segment = *ctx
            .layout
            .get(anchor)
            .ok_or(RejectReason::NothingToRemove)?;
        let template = ctx
            .catalog
            .get(segment.template)
            .ok_or(RejectReason::NothingToRemove)?;
        let predecessor = ctx.layout.find_predecessor(ctx.catalog, anchor);

        ctx.layout.remove(anchor);
        ctx.world.clear();
        ctx.world.erase_footprint(template, segment.base);
        ctx.world.commit();
        info!("removed {anchor} (template {})", segment.template);

        self.attach.anchor = predecessor;
        self.attach.after = true;
        self.obstruction = predecessor.and_then(|p| ctx.layout.find_successor(ctx.catalog, p));
        events.push(BuildEvent::PieceRemoved {
            segment: anchor,
            template: segment.template,
            position: segment.base,
        });
        events.push(BuildEvent::AnchorMoved {
            anchor: predecessor,
        });
        Ok(())
    }

    fn rotate(
        &mut self,
        direction: RotateDirection,
        events: &mut Vec<BuildEvent>,
    ) -> Result<(), BuildError> {
        if self.attach.anchor.is_some() {
            return Err(RejectReason::AnchorFixesDirection.into());
        }
        self.attach.direction = self.attach.direction.rotated(direction);
        info!("build direction now {:?}", self.attach.direction);
        events.push(BuildEvent::BuildDirectionChanged {
            direction: self.attach.direction,
        });
        Ok(())
    }

    fn drag_to<W: BuildWorld>(
        &mut self,
        ctx: &mut BuildContext<'_, W>,
        position: VoxelCoord,
    ) -> Result<(), BuildError> {
        if self.attach.anchor.is_some() {
            return Err(RejectReason::PositionFixedByAnchor.into());
        }
        if position == self.initial_position {
            return Ok(());
        }
        self.initial_position = position;
        let world: &dyn WorldQuery = &*ctx.world;
        self.preview
            .move_to(world, &mut *ctx.redraw, ctx.catalog.pieces(), position);
        Ok(())
    }

    fn forward<W: BuildWorld>(
        &mut self,
        ctx: &mut BuildContext<'_, W>,
        events: &mut Vec<BuildEvent>,
    ) -> Result<(), BuildError> {
        match self.mode() {
            BuildMode::InsertingBefore => {
                // Back to appending on the same anchor.
                self.attach.after = true;
                self.obstruction = self
                    .attach
                    .anchor
                    .and_then(|a| ctx.layout.find_successor(ctx.catalog, a));
            }
            BuildMode::Appending | BuildMode::PlacingInitial => {
                let next = self.obstruction.ok_or(RejectReason::NothingToNavigate)?;
                self.attach.anchor = Some(next);
                self.obstruction = ctx.layout.find_successor(ctx.catalog, next);
                events.push(BuildEvent::AnchorMoved { anchor: Some(next) });
            }
        }
        Ok(())
    }

    fn backward<W: BuildWorld>(
        &mut self,
        ctx: &mut BuildContext<'_, W>,
        events: &mut Vec<BuildEvent>,
    ) -> Result<(), BuildError> {
        let anchor = self.attach.anchor.ok_or(RejectReason::NoAnchor)?;
        if !self.attach.after {
            return Err(RejectReason::NoPredecessorToReturnTo.into());
        }
        match ctx.layout.find_predecessor(ctx.catalog, anchor) {
            Some(previous) => {
                self.attach.anchor = Some(previous);
                self.obstruction = Some(anchor);
                events.push(BuildEvent::AnchorMoved {
                    anchor: Some(previous),
                });
            }
            None => {
                self.attach.after = false;
                self.obstruction = None;
            }
        }
        Ok(())
    }

    /// Base position for the next piece.
    fn build_position(&self, catalog: &TrackCatalog, layout: &TrackLayout) -> Option<VoxelCoord> {
        match self.attach.anchor {
            None => Some(self.initial_position),
            Some(anchor) => layout.get(anchor)?.end(catalog),
        }
    }

    /// Rerun narrowing and point the preview at the new pick.
    fn refresh<W: BuildWorld>(&mut self, ctx: &mut BuildContext<'_, W>) {
        self.outcome = run_narrowing(
            &self.config,
            &self.attach,
            self.obstruction,
            &self.selection,
            ctx.catalog,
            &*ctx.layout,
        );
        self.selection = self.outcome.selection;

        let piece = match self.mode() {
            BuildMode::InsertingBefore => None,
            BuildMode::PlacingInitial | BuildMode::Appending => self
                .outcome
                .pick
                .and_then(|i| ctx.catalog.get(i).map(|t| (i, t))),
        };
        let position = self
            .build_position(ctx.catalog, &*ctx.layout)
            .unwrap_or(self.initial_position);
        let world: &dyn WorldQuery = &*ctx.world;
        self.preview
            .assign_piece(world, &mut *ctx.redraw, position, piece);
    }
}

/// Narrow the catalog for the current attach state. An obstructed slot (or
/// an anchor whose template vanished) narrows over nothing.
fn run_narrowing(
    config: &BuildConfig,
    attach: &AttachState,
    obstruction: Option<SegmentId>,
    selection: &AttributeSelection,
    catalog: &TrackCatalog,
    layout: &TrackLayout,
) -> NarrowingOutcome {
    let attachment = match attach.anchor {
        None => Some(Attachment::Initial {
            direction: attach.direction,
        }),
        Some(anchor) => layout
            .get(anchor)
            .and_then(|seg| catalog.get(seg.template))
            .map(|t| {
                if attach.after {
                    Attachment::After { exit: t.exit }
                } else {
                    Attachment::Before { entry: t.entry }
                }
            }),
    };
    match attachment {
        Some(attachment) if obstruction.is_none() => narrow(
            catalog.pieces(),
            &attachment,
            selection,
            config.max_catalog_pieces,
        ),
        _ => narrow(
            &[],
            &Attachment::Initial {
                direction: attach.direction,
            },
            selection,
            config.max_catalog_pieces,
        ),
    }
}
