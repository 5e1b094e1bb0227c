// End-to-end construction session tests.
//
// Each test drives a `TestSession` (real catalog, layout, voxel world and
// controller) through a sequence of user inputs and checks what the player
// would see: placed track, the candidate set behind the build buttons, and
// the cursor the preview overlay draws. The sample catalog and script are
// the same files the `replay` binary ships with.
//
// See also: `src/lib.rs` for the harness.

use coaster_build::catalog::{Footprint, PieceTemplate, TrackCatalog};
use coaster_build::command::BuildAction;
use coaster_build::config::BuildConfig;
use coaster_build::controller::{BuildError, BuildMode, RejectReason};
use coaster_build::event::BuildEvent;
use coaster_build::layout::TrackLayout;
use coaster_build::overlay::PreviewPiece;
use coaster_build::replay::{ReplayReport, ReplayScript, run_script};
use coaster_build::selector::{AttributeChoice, AttributeSelection};
use coaster_build::types::{
    Banking, ConnectorCode, CursorType, RotateDirection, SegmentId, TileEdge, TileRect,
    TrackBend, TrackSlope, VoxelCoord,
};
use coaster_build::world::{VoxelWorld, WorldQuery};
use coaster_session_tests::{SAMPLE_SCRIPT_JSON, TestSession, flat_world, sample_catalog};
// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Footprint from `(x, y, z)` offsets.
fn footprint(voxels: &[(i32, i32, i32)]) -> Footprint {
    voxels
        .iter()
        .map(|&(x, y, z)| VoxelCoord::new(x, y, z))
        .collect()
}

/// Flat, unpowered, straight starting piece facing north-east.
fn station(entry: u8, exit: u8) -> PieceTemplate {
    PieceTemplate {
        name: "station".into(),
        entry: ConnectorCode(entry),
        exit: ConnectorCode(exit),
        start_direction: Some(TileEdge::NorthEast),
        banking: Banking::None,
        slope: TrackSlope::Flat,
        bend: TrackBend::Straight,
        platform: true,
        powered: false,
        footprint: footprint(&[(0, 0, 0)]),
        exit_offset: VoxelCoord::new(1, 0, 0),
    }
}

fn placed_count(events: &[BuildEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, BuildEvent::PiecePlaced { .. }))
        .count()
}

/// Replay the shipped sample script.
fn sample_report() -> ReplayReport {
    let script = ReplayScript::from_json(SAMPLE_SCRIPT_JSON).expect("sample script must parse");
    run_script(&BuildConfig::default(), &sample_catalog(), &script)
}

// ---- Test scenarios ----

#[test]
fn banking_choice_separates_two_starting_pieces() {
    let mut banked = station(0, 1);
    banked.banking = Banking::Left;
    let catalog = TrackCatalog::new(vec![station(0, 1), banked]);
    let mut session = TestSession::new(catalog, flat_world());

    let state = session.controller.control_state();
    assert_eq!(session.controller.outcome().candidates.as_slice(), &[0, 1]);
    assert!(state.banking_mask.contains(Banking::None));
    assert!(state.banking_mask.contains(Banking::Left));
    assert!(!state.banking_mask.contains(Banking::Right));
    assert!(!state.can_commit, "two candidates remain");
    assert_eq!(
        session.apply(BuildAction::Commit),
        Err(BuildError::Rejected(RejectReason::NotUnambiguous))
    );

    session.select(AttributeChoice::Banking(Banking::Left));
    assert_eq!(session.controller.outcome().candidates.as_slice(), &[1]);
    assert!(session.controller.control_state().can_commit);

    session.drag_to(3, 3, 1);
    let events = session.apply_ok(BuildAction::Commit);
    assert_eq!(
        events[0],
        BuildEvent::PiecePlaced {
            segment: SegmentId(0),
            template: 1,
            position: VoxelCoord::new(3, 3, 1),
        }
    );
    assert!(session.world.is_occupied(VoxelCoord::new(3, 3, 1)));
}

#[test]
fn lone_connecting_piece_overrides_every_selection() {
    let start = station(0, 7);
    let special = PieceTemplate {
        name: "banked climb".into(),
        entry: ConnectorCode(7),
        exit: ConnectorCode(1),
        start_direction: None,
        banking: Banking::Right,
        slope: TrackSlope::Up,
        bend: TrackBend::TightRight,
        platform: false,
        powered: true,
        footprint: footprint(&[(0, 0, 0), (0, 0, 1)]),
        exit_offset: VoxelCoord::new(1, 0, 1),
    };
    let mut session = TestSession::new(TrackCatalog::new(vec![start, special]), flat_world());

    // Choices the only connecting piece contradicts.
    session.select(AttributeChoice::Banking(Banking::Left));
    session.select(AttributeChoice::Power(false));
    session.drag_to(2, 2, 1);
    session.apply_ok(BuildAction::Commit);

    let outcome = session.controller.outcome();
    assert_eq!(outcome.candidates.as_slice(), &[1]);
    assert_eq!(outcome.unambiguous(), Some(1));
    assert_eq!(
        session.controller.selection(),
        AttributeSelection {
            banking: Some(Banking::Right),
            slope: Some(TrackSlope::Up),
            bend: Some(TrackBend::TightRight),
            platform: Some(false),
            power: Some(true),
        }
    );

    let events = session.apply_ok(BuildAction::Commit);
    assert_eq!(placed_count(&events), 1);
    assert!(session.world.is_occupied(VoxelCoord::new(3, 2, 2)));
}

#[test]
fn preview_cursor_follows_ground_under_footprint() {
    let mut wide = station(0, 1);
    wide.footprint = footprint(&[(0, 0, 0), (1, 0, 0)]);
    wide.exit_offset = VoxelCoord::new(2, 0, 0);
    let mut session = TestSession::new(
        TrackCatalog::new(vec![wide]),
        VoxelWorld::new(16, 16, 8, 2),
    );

    session.drag_to(5, 5, 2);
    assert_eq!(session.overlay_area(), TileRect::new(5, 5, 2, 1));
    assert_eq!(
        session.cursor_at(VoxelCoord::new(5, 5, 2)),
        Some(CursorType::Tile)
    );
    assert_eq!(
        session.cursor_at(VoxelCoord::new(6, 5, 2)),
        Some(CursorType::Tile)
    );
    assert_eq!(session.cursor_at(VoxelCoord::new(5, 5, 3)), None);
    assert_eq!(session.cursor_at(VoxelCoord::new(7, 5, 2)), None);
    assert!(session.redraw.contains(VoxelCoord::new(5, 5, 2)));
    assert!(session.redraw.contains(VoxelCoord::new(6, 5, 2)));

    // Terrain edits show up once the window is re-initialised.
    session.world.set_ground_height(6, 5, 3);
    session.drag_to(8, 8, 2);
    session.drag_to(5, 5, 2);
    assert_eq!(session.cursor_at(VoxelCoord::new(6, 5, 2)), None);
    assert_eq!(
        session.cursor_at(VoxelCoord::new(6, 5, 3)),
        Some(CursorType::Tile)
    );
}

#[test]
fn commit_repaints_old_and_new_preview() {
    let mut session = TestSession::new(sample_catalog(), flat_world());
    session.drag_to(4, 4, 1);
    session.redraw.clear();

    session.apply_ok(BuildAction::Commit);
    assert!(session.redraw.contains(VoxelCoord::new(4, 4, 1)));
    assert!(session.redraw.contains(VoxelCoord::new(5, 4, 1)));
    assert_eq!(
        session.controller.preview(),
        Ok(Some(PreviewPiece {
            template: 2,
            position: VoxelCoord::new(5, 4, 1),
        }))
    );
}

#[test]
fn sample_script_builds_six_pieces() {
    let report = sample_report();

    assert_eq!(report.layout.len(), 6);
    assert_eq!(
        report.rejected,
        vec![
            (8, BuildError::Rejected(RejectReason::AnchorFixesDirection)),
            (14, BuildError::Rejected(RejectReason::InvalidPlacement)),
        ]
    );
    assert_eq!(placed_count(&report.events), 6);
    assert_eq!(report.world.occupied_count(), 9);
    assert!(report.world.is_occupied(VoxelCoord::new(4, 4, 1)));
    assert!(report.world.is_occupied(VoxelCoord::new(7, 4, 2)));
    assert!(report.world.is_occupied(VoxelCoord::new(10, 3, 2)));
    assert!(!report.world.is_occupied(VoxelCoord::new(10, 2, 2)));
    assert!(!report.world.is_owned(11, 1));
}

#[test]
fn saved_layout_reopens_on_first_piece() {
    let report = sample_report();
    let json = report.layout.to_json().expect("layout serializes");

    let value: serde_json::Value = serde_json::from_str(&json).expect("layout JSON is valid");
    assert_eq!(value["segments"].as_array().map(Vec::len), Some(6));

    let layout = TrackLayout::from_json(&json).expect("layout reloads");
    let mut session = TestSession::with_layout(
        BuildConfig::default(),
        sample_catalog(),
        report.world,
        layout,
    );
    assert_eq!(session.controller.mode(), BuildMode::Appending);
    assert_eq!(
        session.controller.attach_state().anchor,
        Some(SegmentId(0))
    );
    assert_eq!(session.controller.obstruction(), Some(SegmentId(1)));
    assert_eq!(session.controller.preview(), Ok(None));

    let state = session.controller.control_state();
    assert!(state.can_forward);
    assert!(!state.can_commit);
    assert!(!state.can_remove);

    // Walk to the open end and take the last two pieces off again.
    for _ in 0..5 {
        session.apply_ok(BuildAction::Forward);
    }
    assert_eq!(
        session.controller.attach_state().anchor,
        Some(SegmentId(5))
    );
    assert_eq!(session.controller.obstruction(), None);
    assert_eq!(session.controller.outcome().candidates.as_slice(), &[2, 3, 4, 5]);

    session.apply_ok(BuildAction::Remove);
    session.apply_ok(BuildAction::Remove);
    assert_eq!(session.layout.len(), 4);
    assert_eq!(
        session.controller.attach_state().anchor,
        Some(SegmentId(3))
    );
    assert!(!session.world.is_occupied(VoxelCoord::new(9, 4, 2)));
    assert!(!session.world.is_occupied(VoxelCoord::new(8, 4, 2)));
    assert_eq!(session.controller.outcome().candidates.as_slice(), &[6]);
}

#[test]
fn inserting_before_first_piece_is_unsupported() {
    let report = sample_report();
    let mut session = TestSession::with_layout(
        BuildConfig::default(),
        sample_catalog(),
        report.world,
        report.layout,
    );

    let events = session.apply_ok(BuildAction::Backward);
    assert_eq!(
        events,
        vec![BuildEvent::ModeChanged {
            mode: BuildMode::InsertingBefore
        }]
    );
    assert_eq!(
        session.controller.preview(),
        Err(BuildError::UnsupportedMode(BuildMode::InsertingBefore))
    );
    assert_eq!(
        session.apply(BuildAction::Commit),
        Err(BuildError::UnsupportedMode(BuildMode::InsertingBefore))
    );
    assert_eq!(
        session.apply(BuildAction::Backward),
        Err(BuildError::Rejected(RejectReason::NoPredecessorToReturnTo))
    );

    session.apply_ok(BuildAction::Forward);
    assert_eq!(session.controller.mode(), BuildMode::Appending);
    assert_eq!(session.controller.obstruction(), Some(SegmentId(1)));
}

#[test]
fn remove_is_refused_while_inserting_before_the_first_piece() {
    let report = sample_report();
    let mut session = TestSession::with_layout(
        BuildConfig::default(),
        sample_catalog(),
        report.world,
        report.layout,
    );
    session.apply_ok(BuildAction::Backward);
    assert_eq!(session.controller.mode(), BuildMode::InsertingBefore);
    assert!(!session.controller.control_state().can_remove);

    assert_eq!(
        session.apply(BuildAction::Remove),
        Err(BuildError::UnsupportedMode(BuildMode::InsertingBefore))
    );
    assert_eq!(session.layout.len(), 6);
    assert!(session.layout.contains(SegmentId(0)));
    assert!(session.world.is_occupied(VoxelCoord::new(4, 4, 1)));
    assert_eq!(session.controller.mode(), BuildMode::InsertingBefore);
    assert_eq!(
        session.controller.attach_state().anchor,
        Some(SegmentId(0))
    );
}

#[test]
fn removing_every_piece_returns_to_initial_placement() {
    let mut session = TestSession::new(sample_catalog(), flat_world());
    session.drag_to(4, 4, 1);
    for _ in 0..3 {
        session.apply_ok(BuildAction::Commit);
    }
    assert_eq!(session.world.occupied_count(), 3);

    let mut last = Vec::new();
    for _ in 0..3 {
        last = session.apply_ok(BuildAction::Remove);
    }
    assert!(session.layout.is_empty());
    assert_eq!(session.world.occupied_count(), 0);
    assert_eq!(session.controller.mode(), BuildMode::PlacingInitial);
    assert!(last.contains(&BuildEvent::ModeChanged {
        mode: BuildMode::PlacingInitial
    }));
    assert_eq!(
        session.apply(BuildAction::Remove),
        Err(BuildError::Rejected(RejectReason::NothingToRemove))
    );

    // The preview returns to the dragged start position.
    assert_eq!(
        session.controller.preview(),
        Ok(Some(PreviewPiece {
            template: 0,
            position: VoxelCoord::new(4, 4, 1),
        }))
    );
}

#[test]
fn truncated_catalog_hides_later_pieces() {
    let config = BuildConfig {
        max_catalog_pieces: 1,
        ..BuildConfig::default()
    };
    let mut session =
        TestSession::with_layout(config, sample_catalog(), flat_world(), TrackLayout::new());

    assert_eq!(session.controller.outcome().candidates.as_slice(), &[0]);
    assert!(!session.controller.control_state().can_rotate);

    let events = session.apply_ok(BuildAction::Rotate {
        direction: RotateDirection::Negative,
    });
    assert_eq!(
        events,
        vec![BuildEvent::BuildDirectionChanged {
            direction: TileEdge::SouthEast
        }]
    );
    assert!(session.controller.outcome().candidates.is_empty());
    assert_eq!(session.controller.preview(), Ok(None));
    assert_eq!(
        session.apply(BuildAction::Commit),
        Err(BuildError::Rejected(RejectReason::NotUnambiguous))
    );
}

#[test]
fn reopening_after_close_keeps_placed_track() {
    let mut session = TestSession::new(sample_catalog(), flat_world());
    session.drag_to(4, 4, 1);
    session.apply_ok(BuildAction::Commit);
    session.apply_ok(BuildAction::Commit);

    session.reopen();
    assert_eq!(session.layout.len(), 2);
    assert_eq!(
        session.controller.attach_state().anchor,
        Some(SegmentId(0))
    );
    assert_eq!(session.controller.obstruction(), Some(SegmentId(1)));
    assert_eq!(session.world.occupied_count(), 2);
}
