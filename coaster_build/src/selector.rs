// Attribute narrowing selector.
//
// Given the catalog, where the next piece attaches, and the user's current
// `AttributeSelection`, narrows the catalog to the pieces that still fit and
// reports, for every attribute dimension, which values remain reachable.
//
// Narrowing is a fixed sequence of rounds, each a pure function over the
// previous round's candidates:
//
// 1. Connectivity (`narrow_connectivity`): with an anchor, keep pieces whose
//    entry matches the anchor's exit (attach after) or whose exit matches
//    the anchor's entry (attach before). Without an anchor, keep starting
//    pieces facing the current build direction, and collect the union of
//    start directions over every starting piece for the rotate control.
// 2. Banking, slope, bend, platform, power (`narrow_dimension`), in that
//    order. Each round computes the value mask of its dimension over the
//    surviving candidates, resets a selection that fell out of the mask,
//    pins the selection when the mask holds exactly one value, and then
//    drops candidates that disagree with the (possibly pinned) selection.
//
// The final pick is the first survivor in catalog order whose power flag
// matches the power selection. Nothing is cached between calls: every input
// change reruns all rounds from the full catalog, so narrowing twice with the
// same inputs yields the same result.
//
// See also: `controller.rs` which calls `narrow` on every input and feeds
// the pick to the preview, `catalog.rs` for `PieceTemplate`.
//
// **Critical constraint:** a selection value that is not in its
// dimension's mask never survives a round.

use crate::catalog::PieceTemplate;
use crate::types::{Banking, ConnectorCode, TileEdge, TrackBend, TrackSlope};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

// ---------------------------------------------------------------------------
// Value masks
// ---------------------------------------------------------------------------

/// A value that can be stored as a bit in a `ValueMask`.
pub trait MaskValue: Copy + Eq + fmt::Debug {
    /// Bit position, below 16.
    fn index(self) -> u32;
    fn from_index(index: u32) -> Option<Self>;
}

macro_rules! enum_mask_value {
    ($($ty:ty),*) => {
        $(
            impl MaskValue for $ty {
                fn index(self) -> u32 {
                    self as u32
                }

                fn from_index(index: u32) -> Option<Self> {
                    Self::ALL.get(index as usize).copied()
                }
            }
        )*
    };
}

enum_mask_value!(Banking, TrackSlope, TrackBend, TileEdge);

impl MaskValue for bool {
    fn index(self) -> u32 {
        self as u32
    }

    fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }
}

/// Set of values of one attribute dimension, one bit per value.
pub struct ValueMask<T> {
    bits: u16,
    _marker: PhantomData<T>,
}

// Manual impls: derives would demand the same traits of `T`.
impl<T> Clone for ValueMask<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ValueMask<T> {}

impl<T> PartialEq for ValueMask<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T> Eq for ValueMask<T> {}

impl<T> Default for ValueMask<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: MaskValue> fmt::Debug for ValueMask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T> ValueMask<T> {
    pub const fn empty() -> Self {
        Self {
            bits: 0,
            _marker: PhantomData,
        }
    }

    pub fn count(&self) -> u32 {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl<T: MaskValue> ValueMask<T> {
    pub fn insert(&mut self, value: T) {
        self.bits |= 1 << value.index();
    }

    pub fn contains(&self, value: T) -> bool {
        self.bits & (1 << value.index()) != 0
    }

    /// The only value in the mask, if it holds exactly one.
    pub fn single(&self) -> Option<T> {
        if self.count() == 1 {
            T::from_index(self.bits.trailing_zeros())
        } else {
            None
        }
    }

    /// Values in ascending bit order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..16)
            .filter(|i| self.bits & (1 << i) != 0)
            .filter_map(T::from_index)
    }
}

impl<T: MaskValue> FromIterator<T> for ValueMask<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut mask = Self::empty();
        for value in iter {
            mask.insert(value);
        }
        mask
    }
}

// ---------------------------------------------------------------------------
// Candidates and selection
// ---------------------------------------------------------------------------

/// Catalog indices still in play, in ascending (catalog) order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateSet {
    indices: Vec<usize>,
}

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn first(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    pub fn is_subset_of(&self, other: &CandidateSet) -> bool {
        self.iter().all(|i| other.contains(i))
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }
}

impl FromIterator<usize> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut indices: Vec<usize> = iter.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }
}

/// Where the next piece attaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attachment {
    /// No anchor: a starting piece built in `direction`.
    Initial { direction: TileEdge },
    /// After an anchor whose exit connector is `exit`.
    After { exit: ConnectorCode },
    /// Before an anchor whose entry connector is `entry`.
    Before { entry: ConnectorCode },
}

/// An attribute dimension narrowed by one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Banking,
    Slope,
    Bend,
    Platform,
    Power,
}

/// A concrete value for one dimension, as chosen by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeChoice {
    Banking(Banking),
    Slope(TrackSlope),
    Bend(TrackBend),
    Platform(bool),
    Power(bool),
}

/// The user's choices per dimension. `None` means unset: the dimension does
/// not filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSelection {
    pub banking: Option<Banking>,
    pub slope: Option<TrackSlope>,
    pub bend: Option<TrackBend>,
    pub platform: Option<bool>,
    pub power: Option<bool>,
}

impl AttributeSelection {
    /// Record a choice. Platform and power toggle: choosing the value that
    /// is already selected unsets it.
    pub fn apply(&mut self, choice: AttributeChoice) {
        match choice {
            AttributeChoice::Banking(v) => self.banking = Some(v),
            AttributeChoice::Slope(v) => self.slope = Some(v),
            AttributeChoice::Bend(v) => self.bend = Some(v),
            AttributeChoice::Platform(v) => self.platform = toggled(self.platform, v),
            AttributeChoice::Power(v) => self.power = toggled(self.power, v),
        }
    }

    pub fn clear(&mut self, dimension: Dimension) {
        match dimension {
            Dimension::Banking => self.banking = None,
            Dimension::Slope => self.slope = None,
            Dimension::Bend => self.bend = None,
            Dimension::Platform => self.platform = None,
            Dimension::Power => self.power = None,
        }
    }
}

fn toggled(current: Option<bool>, chosen: bool) -> Option<bool> {
    if current == Some(chosen) {
        None
    } else {
        Some(chosen)
    }
}

// ---------------------------------------------------------------------------
// Rounds
// ---------------------------------------------------------------------------

/// Result of one attribute round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round<T: MaskValue> {
    pub candidates: CandidateSet,
    pub selection: Option<T>,
    pub mask: ValueMask<T>,
}

/// Round 0. Returns the connected candidates and the union of start
/// directions over all starting pieces (empty when attaching to an anchor).
pub fn narrow_connectivity(
    pieces: &[PieceTemplate],
    attachment: &Attachment,
) -> (CandidateSet, ValueMask<TileEdge>) {
    match *attachment {
        Attachment::Initial { direction } => {
            let directions = pieces.iter().filter_map(|p| p.start_direction).collect();
            let candidates = pieces
                .iter()
                .enumerate()
                .filter(|(_, p)| p.start_direction == Some(direction))
                .map(|(i, _)| i)
                .collect();
            (candidates, directions)
        }
        Attachment::After { exit } => {
            let candidates = pieces
                .iter()
                .enumerate()
                .filter(|(_, p)| p.entry == exit)
                .map(|(i, _)| i)
                .collect();
            (candidates, ValueMask::empty())
        }
        Attachment::Before { entry } => {
            let candidates = pieces
                .iter()
                .enumerate()
                .filter(|(_, p)| p.exit == entry)
                .map(|(i, _)| i)
                .collect();
            (candidates, ValueMask::empty())
        }
    }
}

/// One attribute round over `candidates`. `value_of` reads the dimension's
/// value from a template.
pub fn narrow_dimension<T: MaskValue>(
    pieces: &[PieceTemplate],
    candidates: &CandidateSet,
    dimension: Dimension,
    selection: Option<T>,
    value_of: impl Fn(&PieceTemplate) -> T,
) -> Round<T> {
    let mask: ValueMask<T> = candidates.iter().map(|i| value_of(&pieces[i])).collect();

    let mut selection = match selection {
        Some(value) if !mask.contains(value) => {
            debug!("{dimension:?} selection {value:?} no longer reachable, reset");
            None
        }
        other => other,
    };
    if let Some(only) = mask.single() {
        if selection != Some(only) {
            debug!("{dimension:?} pinned to {only:?}");
        }
        selection = Some(only);
    }

    let candidates = match selection {
        Some(want) => candidates
            .iter()
            .filter(|&i| value_of(&pieces[i]) == want)
            .collect(),
        None => candidates.clone(),
    };

    Round {
        candidates,
        selection,
        mask,
    }
}

/// Everything one narrowing pass produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarrowingOutcome {
    /// The selection after resets and pins.
    pub selection: AttributeSelection,
    pub direction_mask: ValueMask<TileEdge>,
    pub banking_mask: ValueMask<Banking>,
    pub slope_mask: ValueMask<TrackSlope>,
    pub bend_mask: ValueMask<TrackBend>,
    pub platform_mask: ValueMask<bool>,
    pub power_mask: ValueMask<bool>,
    /// Survivors of every round.
    pub candidates: CandidateSet,
    /// Catalog index of the piece to preview.
    pub pick: Option<usize>,
}

impl NarrowingOutcome {
    /// The pick, but only when it is the single surviving candidate.
    pub fn unambiguous(&self) -> Option<usize> {
        if self.candidates.len() == 1 {
            self.pick
        } else {
            None
        }
    }
}

/// Run all rounds. Only the first `max_pieces` templates take part.
pub fn narrow(
    pieces: &[PieceTemplate],
    attachment: &Attachment,
    selection: &AttributeSelection,
    max_pieces: usize,
) -> NarrowingOutcome {
    let pieces = if pieces.len() > max_pieces {
        debug!(
            "catalog of {} pieces truncated to {max_pieces}",
            pieces.len()
        );
        &pieces[..max_pieces]
    } else {
        pieces
    };

    let (connected, direction_mask) = narrow_connectivity(pieces, attachment);
    let banking = narrow_dimension(
        pieces,
        &connected,
        Dimension::Banking,
        selection.banking,
        |p| p.banking,
    );
    let slope = narrow_dimension(
        pieces,
        &banking.candidates,
        Dimension::Slope,
        selection.slope,
        |p| p.slope,
    );
    let bend = narrow_dimension(
        pieces,
        &slope.candidates,
        Dimension::Bend,
        selection.bend,
        |p| p.bend,
    );
    let platform = narrow_dimension(
        pieces,
        &bend.candidates,
        Dimension::Platform,
        selection.platform,
        |p| p.platform,
    );
    let power = narrow_dimension(
        pieces,
        &platform.candidates,
        Dimension::Power,
        selection.power,
        |p| p.powered,
    );

    let pick = match power.selection {
        Some(want) => power.candidates.iter().find(|&i| pieces[i].powered == want),
        None => power.candidates.first(),
    };

    NarrowingOutcome {
        selection: AttributeSelection {
            banking: banking.selection,
            slope: slope.selection,
            bend: bend.selection,
            platform: platform.selection,
            power: power.selection,
        },
        direction_mask,
        banking_mask: banking.mask,
        slope_mask: slope.mask,
        bend_mask: bend.mask,
        platform_mask: platform.mask,
        power_mask: power.mask,
        candidates: power.candidates,
        pick,
    }
}
