use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::fmt;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;

use tracing::{debug, trace};

use crate::{Error, PoolId, Result};

/// Generation value after which a slot is never handed out again.
///
/// A slot that is released while at this generation is retired instead of being returned to
/// the free region, so no generation value is ever observed twice for the same slot.
pub(crate) const GENERATION_LIMIT: u32 = u32::MAX;

/// Size of the block we aim for when the caller does not specify a capacity.
const DEFAULT_BLOCK_BYTES: usize = 4096;

/// One storage cell of a [`SlotBlock`].
///
/// The generation is always initialized. The item is only initialized while the slot is named
/// by the live prefix of the partition.
struct Slot<T> {
    /// Starts at 0 ("never allocated") and is incremented each time the slot is allocated.
    generation: u32,

    item: MaybeUninit<T>,
}

/// The single backing block of a `SlotPool`: a contiguous array of slots plus the index
/// partition that tracks which slots are live.
///
/// The partition is a permutation of all slot indices, logically split into three regions:
///
/// ```text
/// [ live (0..live) | free (live..usable) | retired (usable..capacity) ]
/// ```
///
/// Allocation takes the first free entry and moves the cursor forward. Removal swaps the removed
/// entry with the last live entry and moves the cursor back, keeping the live region dense.
///
/// The block also keeps a reverse map from slot index to its position in the partition, so both
/// liveness checks and removal are O(1).
///
/// # Out of band access
///
/// The block does not create or keep references to the items unless asked to, so it is valid to
/// access items via the pointers it hands out, as long as the block is not concurrently asked to
/// create a conflicting reference.
pub(crate) struct SlotBlock<T> {
    /// Stamped into every handle issued from this block. Each block gets a fresh identity.
    id: PoolId,

    capacity: NonZero<u32>,

    /// Layout of the slot array, needed again to deallocate it.
    layout: Layout,

    first_slot_ptr: NonNull<Slot<T>>,

    /// Permutation of all slot indices, split into live, free and retired regions.
    partition: Box<[u32]>,

    /// Reverse map of `partition`: `positions[slot]` is the position of `slot` in `partition`.
    positions: Box<[u32]>,

    /// Length of the live prefix of `partition`.
    live: u32,

    /// Length of the retired tail of `partition`.
    retired: u32,
}

/// The result of inserting a value into a [`SlotBlock`].
#[derive(Debug)]
pub(crate) struct SlotItem<T> {
    index: u32,

    /// Generation the slot was bumped to by the insertion.
    generation: u32,

    ptr: NonNull<T>,
}

impl<T> SlotItem<T> {
    #[must_use]
    pub(crate) fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns a pointer to the inserted value.
    #[must_use]
    pub(crate) fn ptr(&self) -> NonNull<T> {
        self.ptr
    }
}

impl<T> SlotBlock<T> {
    /// Allocates the slot array and the partition for `capacity` slots, with every slot free and
    /// at generation 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageTooLarge`] if the slot array does not fit into the address space.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is `u32::MAX`, which is reserved as the "no slot" index.
    pub(crate) fn new(capacity: NonZero<u32>) -> Result<Self> {
        assert!(
            capacity.get() < u32::MAX,
            "SlotBlock capacity must be less than u32::MAX"
        );

        let layout = Self::layout(capacity)?;

        // SAFETY: The layout is valid for the slot array and is never zero-sized because every
        // slot carries a generation counter, even when `T` is zero-sized.
        let first_slot_ptr = NonNull::new(unsafe { alloc(layout) }.cast::<Slot<T>>())
            .expect(
                "we do not intend to handle allocation failure as a real possibility - OOM is panic",
            );

        for index in 0..capacity.get() {
            // SAFETY: The layout has room for `capacity` slots and the loop stays below that.
            let slot_ptr = unsafe { first_slot_ptr.add(index as usize) };

            // SAFETY: The pointer is valid for writes and of the right type.
            unsafe {
                slot_ptr.as_ptr().write(Slot {
                    generation: 0,
                    item: MaybeUninit::uninit(),
                });
            }
        }

        // Identity permutation. Nothing is live, nothing is retired.
        let partition: Box<[u32]> = (0..capacity.get()).collect();
        let positions = partition.clone();

        Ok(Self {
            id: PoolId::next(),
            capacity,
            layout,
            first_slot_ptr,
            partition,
            positions,
            live: 0,
            retired: 0,
        })
    }

    /// The capacity used when the caller does not specify one: as many slots as fit into
    /// [`DEFAULT_BLOCK_BYTES`], but at least one.
    #[must_use]
    pub(crate) fn default_capacity() -> NonZero<u32> {
        let slots = DEFAULT_BLOCK_BYTES
            .checked_div(size_of::<Slot<T>>())
            .expect("a slot is never zero-sized because it carries a generation counter");

        u32::try_from(slots)
            .ok()
            .and_then(NonZero::new)
            .unwrap_or(NonZero::<u32>::MIN)
    }

    fn layout(capacity: NonZero<u32>) -> Result<Layout> {
        Layout::array::<Slot<T>>(capacity.get() as usize).map_err(|_| Error::StorageTooLarge {
            capacity: capacity.get(),
        })
    }

    #[must_use]
    pub(crate) fn id(&self) -> PoolId {
        self.id
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> u32 {
        self.capacity.get()
    }

    #[must_use]
    pub(crate) fn len(&self) -> u32 {
        self.live
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots that have reached the generation limit and will never be reused.
    #[must_use]
    pub(crate) fn retired(&self) -> u32 {
        self.retired
    }

    /// Number of slots that are not retired, i.e. the end of the free region.
    #[must_use]
    fn usable(&self) -> u32 {
        self.capacity
            .get()
            .checked_sub(self.retired)
            .expect("retired count can never exceed capacity")
    }

    #[must_use]
    pub(crate) fn is_full(&self) -> bool {
        self.live >= self.usable()
    }

    /// Returns the slot index stored at `position` in the partition.
    fn slot_at(&self, position: u32) -> u32 {
        *self
            .partition
            .get(position as usize)
            .expect("partition positions are bounded by capacity")
    }

    /// Returns the position of slot `index` in the partition.
    fn position_of(&self, index: u32) -> u32 {
        *self
            .positions
            .get(index as usize)
            .expect("callers bounds-check slot indexes against capacity")
    }

    /// Swaps two partition entries, keeping the reverse map in sync.
    fn swap_positions(&mut self, a: u32, b: u32) {
        if a == b {
            return;
        }

        let slot_a = self.slot_at(a);
        let slot_b = self.slot_at(b);

        self.partition.swap(a as usize, b as usize);

        *self
            .positions
            .get_mut(slot_a as usize)
            .expect("partition only holds in-range slot indexes") = b;
        *self
            .positions
            .get_mut(slot_b as usize)
            .expect("partition only holds in-range slot indexes") = a;
    }

    fn slot_ptr(&self, index: u32) -> NonNull<Slot<T>> {
        assert!(
            index < self.capacity.get(),
            "slot {index} index out of bounds in block of {}",
            type_name::<T>()
        );

        // SAFETY: Guarded by bounds check above, so we are guaranteed that the pointer is valid.
        unsafe { self.first_slot_ptr.add(index as usize) }
    }

    /// Returns a pointer to the storage of slot `index`, whether or not it holds a live item.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub(crate) fn item_ptr(&self, index: u32) -> NonNull<T> {
        let slot_ptr = self.slot_ptr(index);

        // SAFETY: The slot pointer is valid, so projecting to one of its fields stays in bounds.
        // We only compute an address here, no reference to the slot is created.
        let item_ptr = unsafe { &raw mut (*slot_ptr.as_ptr()).item };

        // SAFETY: Projected from a non-null pointer, so it cannot be null. `MaybeUninit<T>` has
        // the same layout as `T`.
        unsafe { NonNull::new_unchecked(item_ptr.cast::<T>()) }
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub(crate) fn generation(&self, index: u32) -> u32 {
        let slot_ptr = self.slot_ptr(index);

        // SAFETY: Every slot header was initialized in the ctor and only we write to it.
        unsafe { (*slot_ptr.as_ptr()).generation }
    }

    #[expect(clippy::needless_pass_by_ref_mut, reason = "false positive")]
    fn set_generation(&mut self, index: u32, generation: u32) {
        let slot_ptr = self.slot_ptr(index);

        // SAFETY: The slot header is initialized and we hold an exclusive reference to the block,
        // so nobody else is looking at it.
        unsafe {
            (*slot_ptr.as_ptr()).generation = generation;
        }
    }

    /// Whether slot `index` currently holds a live item. Out of range indexes are never live.
    #[must_use]
    pub(crate) fn is_live(&self, index: u32) -> bool {
        index < self.capacity.get() && self.position_of(index) < self.live
    }

    /// Returns the slot index at `position` of the live prefix, if there is one.
    #[must_use]
    pub(crate) fn live_slot_at(&self, position: u32) -> Option<u32> {
        (position < self.live).then(|| self.slot_at(position))
    }

    /// Verifies that slot `index` holds a live item. A `generation` of 0 skips the generation
    /// check, any other value must match the current generation of the slot.
    pub(crate) fn check(&self, index: u32, generation: u32) -> Result<()> {
        if index >= self.capacity.get() {
            return Err(Error::OutOfRange {
                index,
                capacity: self.capacity.get(),
            });
        }

        let actual = self.generation(index);

        if generation != 0 && generation != actual {
            return Err(Error::GenerationMismatch {
                index,
                expected: generation,
                actual,
            });
        }

        if !self.is_live(index) {
            return Err(Error::IndexNotLive { index });
        }

        Ok(())
    }

    pub(crate) fn get(&self, index: u32, generation: u32) -> Result<&T> {
        self.check(index, generation)?;

        // SAFETY: We just verified that the slot holds a live item.
        Ok(unsafe { self.item_ptr(index).as_ref() })
    }

    pub(crate) fn get_mut(&mut self, index: u32, generation: u32) -> Result<&mut T> {
        self.check(index, generation)?;

        // SAFETY: We just verified that the slot holds a live item, and we hold an exclusive
        // reference to the block so no other reference to the item can be created meanwhile.
        Ok(unsafe { self.item_ptr(index).as_mut() })
    }

    /// Takes the first free slot, bumps its generation and moves the value produced by `f` into
    /// it. `f` is not called if the block is full.
    pub(crate) fn insert_with(&mut self, f: impl FnOnce() -> T) -> Result<SlotItem<T>> {
        if self.is_full() {
            trace!(
                capacity = self.capacity.get(),
                retired = self.retired,
                "refused insert into full block"
            );

            return Err(Error::PoolFull {
                capacity: self.capacity.get(),
            });
        }

        let index = self.slot_at(self.live);

        let generation = self
            .generation(index)
            .checked_add(1)
            .expect("slots at the generation limit are retired when released, never left free");

        // A panicking constructor must leave the block untouched, so nothing is updated before
        // the value exists.
        let value = f();

        let ptr = self.item_ptr(index);

        // SAFETY: The slot is in the free region, so its storage holds no live item that could
        // be overwritten. The pointer is valid and aligned for `T`.
        unsafe {
            ptr.write(value);
        }

        self.set_generation(index, generation);

        #[cfg(debug_assertions)]
        let position = self.live;

        self.live = self
            .live
            .checked_add(1)
            .expect("guarded by is_full() check above");

        #[cfg(debug_assertions)]
        self.entry_integrity_check(position);

        Ok(SlotItem {
            index,
            generation,
            ptr,
        })
    }

    /// Moves the item out of slot `index` and returns the slot to the free region (or retires it
    /// if it has reached the generation limit). The generation of the slot is left unchanged.
    pub(crate) fn take(&mut self, index: u32, generation: u32) -> Result<T> {
        if self.live == 0 {
            return Err(Error::NothingToFree);
        }

        self.check(index, generation)?;

        let position = self.position_of(index);
        let last_live = self
            .live
            .checked_sub(1)
            .expect("guarded by emptiness check above");

        // Swap-remove: the last live entry fills the hole, the removed entry lands on the
        // boundary and becomes the first free entry once the cursor moves back.
        self.swap_positions(position, last_live);
        self.live = last_live;

        if self.generation(index) == GENERATION_LIMIT {
            let last_usable = self
                .usable()
                .checked_sub(1)
                .expect("the slot being retired is itself still usable");

            self.swap_positions(last_live, last_usable);
            self.retired = self
                .retired
                .checked_add(1)
                .expect("retired count can never exceed capacity");

            debug!(
                index,
                retired = self.retired,
                "slot reached its generation limit and was retired"
            );
        }

        // SAFETY: The slot held a live item until just now, so its storage is initialized. The
        // slot is no longer in the live prefix, so nothing will read the item again.
        let value = unsafe { self.item_ptr(index).read() };

        // Only the hole, the old boundary and the final position of the removed slot changed.
        #[cfg(debug_assertions)]
        {
            self.entry_integrity_check(position);
            self.entry_integrity_check(last_live);
            self.entry_integrity_check(self.position_of(index));
        }

        Ok(value)
    }

    /// Returns the item named by `partition[*cursor]` and advances the cursor, or returns `None`
    /// without touching the cursor once it reaches the end of the live prefix.
    pub(crate) fn enumerate(&self, cursor: &mut u32) -> Option<&T> {
        let index = self.live_slot_at(*cursor)?;

        *cursor = cursor
            .checked_add(1)
            .expect("cursor is below the live count, which is below u32::MAX");

        // SAFETY: Every slot named by the live prefix holds a live item.
        Some(unsafe { self.item_ptr(index).as_ref() })
    }

    /// Drops every live item, always releasing the last live entry first.
    pub(crate) fn drop_all(&mut self) {
        while let Some(last_live) = self.live.checked_sub(1) {
            let index = self.slot_at(last_live);

            drop(
                self.take(index, 0)
                    .expect("the last entry of the live prefix is always live"),
            );
        }
    }

    /// Sets the generation of a free slot, so tests can exercise the generation limit without
    /// allocating billions of times.
    #[cfg(test)]
    pub(crate) fn set_free_generation_for_test(&mut self, index: u32, generation: u32) {
        assert!(!self.is_live(index), "slot {index} is live");
        assert!(generation < GENERATION_LIMIT);
        self.set_generation(index, generation);
    }

    /// Verifies the partition entry at `position`: it names an in-range slot, the reverse map
    /// points back at it and the slot generation fits the region the entry is in.
    ///
    /// This touches a single entry, so it is cheap enough to run after every operation.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    fn entry_integrity_check(&self, position: u32) {
        assert!(
            self.live <= self.usable(),
            "live count {} exceeds usable slot count {} in block of {}",
            self.live,
            self.usable(),
            type_name::<T>()
        );

        let index = self.slot_at(position);

        assert!(
            index < self.capacity.get(),
            "partition position {position} names out of bounds slot {index} in block of {}",
            type_name::<T>()
        );

        assert!(
            self.position_of(index) == position,
            "reverse map says slot {index} is at position {} but it is at {position} in block of {}",
            self.position_of(index),
            type_name::<T>()
        );

        let generation = self.generation(index);

        if position < self.live {
            assert!(
                generation != 0,
                "live slot {index} has never been allocated in block of {}",
                type_name::<T>()
            );
        } else if position < self.usable() {
            assert!(
                generation < GENERATION_LIMIT,
                "free slot {index} is at the generation limit in block of {}",
                type_name::<T>()
            );
        } else {
            assert!(
                generation == GENERATION_LIMIT,
                "retired slot {index} is below the generation limit in block of {}",
                type_name::<T>()
            );
        }
    }

    /// Verifies every partition entry and that the partition is a permutation of all slots.
    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        let mut observed = vec![false; self.capacity.get() as usize];

        for position in 0..self.capacity.get() {
            let index = self.slot_at(position);

            let seen = observed.get_mut(index as usize).unwrap_or_else(|| {
                panic!(
                    "partition position {position} names out of bounds slot {index} in block of {}",
                    type_name::<T>()
                )
            });

            assert!(
                !*seen,
                "slot {index} appears more than once in the partition of block of {}",
                type_name::<T>()
            );
            *seen = true;

            #[cfg(debug_assertions)]
            self.entry_integrity_check(position);
        }
    }
}

impl<T> fmt::Debug for SlotBlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("live", &self.live)
            .field("retired", &self.retired)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for SlotBlock<T> {
    fn drop(&mut self) {
        self.drop_all();

        // SAFETY: The layout must match between alloc and dealloc. It does. Slots themselves
        // need no drop glue because the items were dropped above and the rest is plain data.
        unsafe {
            dealloc(self.first_slot_ptr.as_ptr().cast(), self.layout);
        }
    }
}

// SAFETY: Yes, there are raw pointers involved here but nothing inherently non-thread-mobile
// about it, so as long as T itself can move between threads, the block can do so, too.
unsafe impl<T: Send> Send for SlotBlock<T> {}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    use super::*;

    fn block<T>(capacity: u32) -> SlotBlock<T> {
        SlotBlock::new(NonZero::new(capacity).unwrap()).unwrap()
    }

    fn live_prefix<T>(block: &SlotBlock<T>) -> Vec<u32> {
        (0..block.len())
            .map(|position| block.live_slot_at(position).unwrap())
            .collect()
    }

    #[test]
    fn smoke_test() {
        let mut block = block::<u32>(3);

        let a = block.insert_with(|| 42).unwrap();
        let b = block.insert_with(|| 43).unwrap();
        let c = block.insert_with(|| 44).unwrap();

        assert_eq!(*block.get(a.index(), a.generation()).unwrap(), 42);
        assert_eq!(*block.get(b.index(), b.generation()).unwrap(), 43);
        assert_eq!(*block.get(c.index(), c.generation()).unwrap(), 44);

        assert_eq!(block.len(), 3);
        assert!(block.is_full());

        assert_eq!(block.take(b.index(), b.generation()).unwrap(), 43);

        assert_eq!(block.len(), 2);
        assert!(!block.is_full());

        let d = block.insert_with(|| 45).unwrap();

        // The freed slot is reused, at a newer generation.
        assert_eq!(d.index(), b.index());
        assert_eq!(d.generation(), 2);
        assert_eq!(*block.get(d.index(), 2).unwrap(), 45);
    }

    #[test]
    fn fresh_block_hands_out_slots_in_order() {
        let mut block = block::<u32>(4);

        for expected in 0..4 {
            let item = block.insert_with(|| expected * 10).unwrap();
            assert_eq!(item.index(), expected);
            assert_eq!(item.generation(), 1);
        }
    }

    #[test]
    fn full_block_does_not_call_constructor() {
        let mut block = block::<u32>(1);
        _ = block.insert_with(|| 1).unwrap();

        let result = block.insert_with(|| panic!("constructor must not be called"));

        assert_eq!(result.unwrap_err(), Error::PoolFull { capacity: 1 });
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn swap_remove_keeps_live_prefix_dense() {
        let mut block = block::<u32>(4);

        for value in 0..4 {
            _ = block.insert_with(|| value).unwrap();
        }

        assert_eq!(live_prefix(&block), [0, 1, 2, 3]);

        // The last live entry moves into the hole.
        drop(block.take(1, 0).unwrap());
        assert_eq!(live_prefix(&block), [0, 3, 2]);

        drop(block.take(0, 0).unwrap());
        assert_eq!(live_prefix(&block), [2, 3]);

        // Freed slots are reused most recently freed first.
        let item = block.insert_with(|| 99).unwrap();
        assert_eq!(item.index(), 0);
        assert_eq!(live_prefix(&block), [2, 3, 0]);
    }

    #[test]
    fn take_validates_before_changing_anything() {
        let mut block = block::<u32>(2);

        assert_eq!(block.take(0, 0).unwrap_err(), Error::NothingToFree);

        let item = block.insert_with(|| 5).unwrap();

        assert_eq!(
            block.take(2, 0).unwrap_err(),
            Error::OutOfRange {
                index: 2,
                capacity: 2
            }
        );
        assert_eq!(
            block.take(item.index(), 7).unwrap_err(),
            Error::GenerationMismatch {
                index: 0,
                expected: 7,
                actual: 1
            }
        );
        assert_eq!(block.take(1, 0).unwrap_err(), Error::IndexNotLive { index: 1 });

        assert_eq!(block.len(), 1);
        assert_eq!(block.take(item.index(), item.generation()).unwrap(), 5);
    }

    #[test]
    fn generation_survives_removal() {
        let mut block = block::<u32>(1);

        let item = block.insert_with(|| 1).unwrap();
        drop(block.take(item.index(), item.generation()).unwrap());

        assert_eq!(block.generation(item.index()), 1);
        assert_eq!(
            block.get(item.index(), item.generation()).unwrap_err(),
            Error::IndexNotLive { index: 0 }
        );
    }

    #[test]
    fn enumerate_walks_live_prefix_and_stops() {
        let mut block = block::<u32>(3);

        _ = block.insert_with(|| 10).unwrap();
        _ = block.insert_with(|| 11).unwrap();

        let mut cursor = 0;
        assert_eq!(block.enumerate(&mut cursor), Some(&10));
        assert_eq!(block.enumerate(&mut cursor), Some(&11));
        assert_eq!(cursor, 2);

        assert_eq!(block.enumerate(&mut cursor), None);
        assert_eq!(cursor, 2);
    }

    #[test]
    fn slot_at_generation_limit_is_retired() {
        let mut block = block::<u32>(2);

        block.set_free_generation_for_test(0, GENERATION_LIMIT - 1);

        let item = block.insert_with(|| 1).unwrap();
        assert_eq!(item.index(), 0);
        assert_eq!(item.generation(), GENERATION_LIMIT);

        drop(block.take(item.index(), item.generation()).unwrap());

        assert_eq!(block.retired(), 1);
        assert!(!block.is_live(0));

        // Only slot 1 remains usable.
        let other = block.insert_with(|| 2).unwrap();
        assert_eq!(other.index(), 1);
        assert!(block.is_full());
        assert_eq!(
            block.insert_with(|| 3).unwrap_err(),
            Error::PoolFull { capacity: 2 }
        );

        // The retired slot still rejects its last handle.
        assert_eq!(
            block.get(0, GENERATION_LIMIT).unwrap_err(),
            Error::IndexNotLive { index: 0 }
        );
    }

    #[test]
    fn panicking_constructor_leaves_block_untouched() {
        let mut block = block::<u32>(2);

        let result = catch_unwind(AssertUnwindSafe(|| {
            _ = block.insert_with(|| panic!("constructor failed"));
        }));

        assert!(result.is_err());
        assert_eq!(block.len(), 0);
        assert_eq!(block.generation(0), 0);

        let item = block.insert_with(|| 1).unwrap();
        assert_eq!(item.index(), 0);
        assert_eq!(item.generation(), 1);
    }

    #[test]
    fn drops_items_on_take_and_on_drop() {
        struct Droppable {
            drops: Rc<Cell<usize>>,
        }

        impl Drop for Droppable {
            fn drop(&mut self) {
                self.drops.set(self.drops.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));
        let mut block = block::<Droppable>(3);

        let a = block
            .insert_with(|| Droppable {
                drops: Rc::clone(&drops),
            })
            .unwrap();

        for _ in 0..2 {
            _ = block
                .insert_with(|| Droppable {
                    drops: Rc::clone(&drops),
                })
                .unwrap();
        }

        drop(block.take(a.index(), a.generation()).unwrap());
        assert_eq!(drops.get(), 1);

        drop(block);
        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn zero_sized_items_are_supported() {
        let mut block = block::<()>(2);

        let item = block.insert_with(|| ()).unwrap();
        block.get(item.index(), item.generation()).unwrap();
        block.take(item.index(), item.generation()).unwrap();
    }

    #[test]
    fn default_capacity_fills_default_block() {
        // 4 bytes of generation + 4 bytes of item.
        assert_eq!(SlotBlock::<u32>::default_capacity().get(), 512);

        // Items larger than the default block still get one slot.
        assert_eq!(SlotBlock::<[u8; 10_000]>::default_capacity().get(), 1);
    }

    #[test]
    fn partition_stays_consistent_through_churn() {
        let mut block = block::<u32>(8);
        let mut items = Vec::new();

        for round in 0..40_u32 {
            if round % 3 == 2 {
                let (item, value): (SlotItem<u32>, u32) =
                    items.remove(items.len() / 2);
                assert_eq!(block.take(item.index(), item.generation()).unwrap(), value);
            } else if !block.is_full() {
                items.push((block.insert_with(|| round).unwrap(), round));
            }

            block.integrity_check();
        }
    }

    #[test]
    fn large_block_churn() {
        // Every operation is checked in debug builds, so this only completes quickly if the
        // checks do not walk the whole block.
        let mut block = block::<u32>(1_000_000);

        for round in 0..20_000 {
            let item = block.insert_with(|| round).unwrap();
            drop(block.take(item.index(), item.generation()).unwrap());
        }

        assert!(block.is_empty());
        assert_eq!(block.generation(0), 20_000);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn corrupted_reverse_map_is_detected() {
        let mut block = block::<u32>(3);

        block.positions.swap(0, 1);

        let result = catch_unwind(AssertUnwindSafe(|| {
            _ = block.insert_with(|| 1);
        }));

        assert!(result.is_err());

        // Repair the block so that it can be dropped normally.
        block.positions.swap(0, 1);
        block.integrity_check();
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_storage_is_error() {
        let result = SlotBlock::<[u8; 1 << 40]>::new(NonZero::new(1 << 30).unwrap());

        assert_eq!(
            result.unwrap_err(),
            Error::StorageTooLarge { capacity: 1 << 30 }
        );
    }

    #[test]
    #[should_panic]
    fn max_capacity_is_panic() {
        drop(block::<u32>(u32::MAX));
    }

    #[test]
    #[should_panic]
    fn oob_item_ptr_is_panic() {
        let block = block::<u32>(2);
        _ = block.item_ptr(2);
    }
}
