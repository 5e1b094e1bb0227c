// Block-allocated slot arena with an occupancy bitmap.
//
// Pooled entities (placed track segments) live in fixed-size blocks of
// slots. Each block carries a parallel bitmap of 32-bit words marking which
// slots are active. Indices are stable for the lifetime of an entity:
// releasing a slot never moves any other element, and a freed slot is
// reused by the next allocation (lowest free index first).
//
// Inactive slots hold `T::default()`; callers only ever observe active
// slots through `get` and `iter`.
//
// See also: `layout.rs`, which stores `PlacedSegment`s here and exposes the
// slot index as `SegmentId`.

const SLOTS_PER_BLOCK: usize = 256;
const WORDS_PER_BLOCK: usize = SLOTS_PER_BLOCK.div_ceil(32);

#[derive(Clone, Debug)]
struct Block<T> {
    elements: Vec<T>,
    actives: [u32; WORDS_PER_BLOCK],
}

impl<T: Default> Block<T> {
    fn new() -> Self {
        Self {
            elements: (0..SLOTS_PER_BLOCK).map(|_| T::default()).collect(),
            actives: [0; WORDS_PER_BLOCK],
        }
    }

    fn is_active(&self, slot: usize) -> bool {
        self.actives[slot / 32] & (1 << (slot % 32)) != 0
    }

    fn first_free(&self) -> Option<usize> {
        self.actives
            .iter()
            .enumerate()
            .find(|(_, word)| **word != u32::MAX)
            .map(|(word_idx, word)| word_idx * 32 + word.trailing_ones() as usize)
            .filter(|&slot| slot < SLOTS_PER_BLOCK)
    }

    fn activate(&mut self, slot: usize, value: T) {
        self.actives[slot / 32] |= 1 << (slot % 32);
        self.elements[slot] = value;
    }

    fn deactivate(&mut self, slot: usize) -> T {
        self.actives[slot / 32] &= !(1 << (slot % 32));
        std::mem::take(&mut self.elements[slot])
    }

    fn active_count(&self) -> usize {
        self.actives.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Arena of `T` with stable `u32` indices.
#[derive(Clone, Debug)]
pub struct SlotArena<T> {
    blocks: Vec<Block<T>>,
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self { blocks: Vec::new() }
    }
}

impl<T: Default> SlotArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn split(index: u32) -> (usize, usize) {
        let index = index as usize;
        (index / SLOTS_PER_BLOCK, index % SLOTS_PER_BLOCK)
    }

    /// Store `value` in the lowest free slot, growing by one block when all
    /// blocks are full. Returns the slot index.
    pub fn allocate(&mut self, value: T) -> u32 {
        let found = self
            .blocks
            .iter()
            .enumerate()
            .find_map(|(b, block)| block.first_free().map(|slot| (b, slot)));
        let (b, slot) = match found {
            Some(pos) => pos,
            None => {
                self.blocks.push(Block::new());
                (self.blocks.len() - 1, 0)
            }
        };
        self.blocks[b].activate(slot, value);
        (b * SLOTS_PER_BLOCK + slot) as u32
    }

    /// Store `value` at a specific index, growing blocks as needed.
    /// Overwrites any active element at that index.
    pub fn insert_at(&mut self, index: u32, value: T) {
        let (b, slot) = Self::split(index);
        while self.blocks.len() <= b {
            self.blocks.push(Block::new());
        }
        self.blocks[b].activate(slot, value);
    }

    /// Release the slot at `index`, returning its element if it was active.
    pub fn release(&mut self, index: u32) -> Option<T> {
        let (b, slot) = Self::split(index);
        let block = self.blocks.get_mut(b)?;
        if !block.is_active(slot) {
            return None;
        }
        Some(block.deactivate(slot))
    }

    pub fn is_active(&self, index: u32) -> bool {
        let (b, slot) = Self::split(index);
        self.blocks.get(b).is_some_and(|block| block.is_active(slot))
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        let (b, slot) = Self::split(index);
        let block = self.blocks.get(b)?;
        block.is_active(slot).then(|| &block.elements[slot])
    }

    /// Active elements in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.blocks.iter().enumerate().flat_map(|(b, block)| {
            block
                .elements
                .iter()
                .enumerate()
                .filter(move |(slot, _)| block.is_active(*slot))
                .map(move |(slot, element)| ((b * SLOTS_PER_BLOCK + slot) as u32, element))
        })
    }

    /// Number of active slots.
    pub fn len(&self) -> usize {
        self.blocks.iter().map(Block::active_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| block.active_count() == 0)
    }
}
