use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::ptr::NonNull;
use std::thread;

use tracing::debug;

use crate::{DropPolicy, Error, Handle, Handles, Iter, IterMut, Result, SlotBlock, SlotPoolBuilder};

/// A fixed-capacity object pool that hands out generation-checked [`Handle`]s to its items.
///
/// The pool stores its items in a single contiguous block of slots that is reserved once, via
/// [`reserve()`][Self::reserve], and never grows. Inserting an item takes a free slot, moves the
/// item into it and returns a handle. Removing an item drops it and returns the slot to the free
/// set, ready for reuse.
///
/// Every slot carries a generation counter that is bumped each time the slot is allocated. A
/// handle remembers the generation it was issued at, so once its item is removed the handle
/// never resolves again, not even after the slot has been reused for a different item.
///
/// All operations are O(1), except [`teardown()`][Self::teardown] which drops every item.
///
/// # Iteration
///
/// Live items are kept densely packed at the front of an internal index array, so iterating
/// visits only live items. The iteration order is not insertion order: removing an item moves
/// the last live item into its place.
///
/// # Out of band access
///
/// The pool does not keep references to the items. Pointers obtained via
/// [`item_ptr()`][Self::item_ptr] or from references returned by the pool remain valid until the
/// item is removed or the pool storage is torn down. Items never move while in the pool.
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) if `T` is, but it is not thread-safe ([`Sync`]). To share
/// a pool between threads, wrap it in a mutex.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use slot_pool::{Error, SlotPool};
///
/// let mut pool = SlotPool::<String>::with_capacity(NonZero::new(2).unwrap());
/// pool.reserve().unwrap();
///
/// let alice = pool.insert("Alice".to_string()).unwrap();
/// let bob = pool.insert("Bob".to_string()).unwrap();
///
/// // The pool has a fixed capacity.
/// assert_eq!(
///     pool.insert("Charlie".to_string()),
///     Err(Error::PoolFull { capacity: 2 })
/// );
///
/// pool.remove(alice).unwrap();
///
/// // The slot of Alice is reused, the old handle does not see the new item.
/// let dave = pool.insert("Dave".to_string()).unwrap();
/// assert_eq!(dave.index(), alice.index());
/// assert!(pool.get(alice).is_none());
/// assert_eq!(pool.get(dave).map(String::as_str), Some("Dave"));
/// assert_eq!(pool.get(bob).map(String::as_str), Some("Bob"));
/// ```
pub struct SlotPool<T> {
    capacity: NonZero<u32>,

    drop_policy: DropPolicy,

    /// `None` until storage is reserved and again after teardown.
    block: Option<SlotBlock<T>>,
}

impl<T> SlotPool<T> {
    #[must_use]
    pub(crate) fn new_inner(capacity: NonZero<u32>, drop_policy: DropPolicy) -> Self {
        Self {
            capacity,
            drop_policy,
            block: None,
        }
    }

    /// Creates a new [`SlotPool`] with the default configuration.
    ///
    /// The pool starts without storage. Call [`reserve()`][Self::reserve] before inserting.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::new();
    /// assert!(!pool.is_reserved());
    ///
    /// pool.reserve().unwrap();
    /// assert!(pool.is_reserved());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new [`SlotPool`] with room for `capacity` items.
    ///
    /// The pool starts without storage. Call [`reserve()`][Self::reserve] before inserting.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is `u32::MAX`.
    #[must_use]
    pub fn with_capacity(capacity: NonZero<u32>) -> Self {
        Self::builder().capacity(capacity).build()
    }

    /// Starts building a new [`SlotPool`] with a custom configuration.
    #[inline]
    pub fn builder() -> SlotPoolBuilder<T> {
        SlotPoolBuilder::new()
    }

    /// The number of slots in the pool, whether or not storage is reserved.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity.get()
    }

    /// The number of live items in the pool.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.block.as_ref().map_or(0, SlotBlock::len)
    }

    /// Whether the pool holds no live items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block.as_ref().is_none_or(SlotBlock::is_empty)
    }

    /// Whether an insertion would fail with [`Error::PoolFull`].
    ///
    /// A pool without reserved storage is not full, insertion fails for a different reason.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.block.as_ref().is_some_and(SlotBlock::is_full)
    }

    /// Whether storage has been reserved (and not torn down since).
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.block.is_some()
    }

    /// The number of slots that have exhausted their generation counter and are permanently
    /// out of use. This is zero unless a single slot has been reused about four billion times.
    #[must_use]
    pub fn retired_slots(&self) -> u32 {
        self.block.as_ref().map_or(0, SlotBlock::retired)
    }

    fn block(&self) -> Result<&SlotBlock<T>> {
        self.block.as_ref().ok_or(Error::NotReserved)
    }

    fn block_mut(&mut self) -> Result<&mut SlotBlock<T>> {
        self.block.as_mut().ok_or(Error::NotReserved)
    }

    /// Reserves the storage for all slots of the pool. No items are created.
    ///
    /// This is the only operation that allocates memory. After a [`teardown()`][Self::teardown]
    /// storage can be reserved again, with handles from the previous reservation staying invalid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyReserved`] if storage is already reserved and
    /// [`Error::StorageTooLarge`] if the storage for `capacity` items of type `T` exceeds the
    /// maximum allocation size.
    pub fn reserve(&mut self) -> Result<()> {
        if self.block.is_some() {
            return Err(Error::AlreadyReserved);
        }

        let block = SlotBlock::new(self.capacity)?;

        debug!(
            capacity = self.capacity.get(),
            item_type = type_name::<T>(),
            "reserved pool storage"
        );

        self.block = Some(block);
        Ok(())
    }

    /// Inserts an item into the pool and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReserved`] if storage has not been reserved and [`Error::PoolFull`]
    /// if every slot is in use. The value is dropped in both cases; use
    /// [`insert_with()`][Self::insert_with] to avoid creating it in the first place.
    pub fn insert(&mut self, value: T) -> Result<Handle<T>> {
        self.insert_with(|| value)
    }

    /// Inserts an item into the pool and returns a handle to it together with an exclusive
    /// reference to the inserted item.
    ///
    /// # Errors
    ///
    /// Same as [`insert()`][Self::insert].
    pub fn insert_mut(&mut self, value: T) -> Result<(Handle<T>, &mut T)> {
        let block = self.block_mut()?;
        let item = block.insert_with(|| value)?;
        let handle = Handle::new(block.id(), item.index(), item.generation());

        // SAFETY: The item was just inserted and we hold an exclusive reference to the pool for
        // as long as the returned reference lives.
        let item = unsafe { item.ptr().as_mut() };

        Ok((handle, item))
    }

    /// Creates an item with `f` and inserts it into the pool, returning a handle to it.
    ///
    /// `f` is only called once a free slot has been secured, so a failed insertion never
    /// creates the item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReserved`] if storage has not been reserved and [`Error::PoolFull`]
    /// if every slot is in use.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<Vec<u8>>::builder().reserve().build();
    ///
    /// let handle = pool.insert_with(|| vec![0; 1024]).unwrap();
    /// assert_eq!(pool.get(handle).map(Vec::len), Some(1024));
    /// ```
    pub fn insert_with(&mut self, f: impl FnOnce() -> T) -> Result<Handle<T>> {
        let block = self.block_mut()?;
        let item = block.insert_with(f)?;

        Ok(Handle::new(block.id(), item.index(), item.generation()))
    }

    /// Resolves `handle` to the block it belongs to, or explains why it does not belong.
    fn owning_block(&self, handle: Handle<T>) -> Result<&SlotBlock<T>> {
        let block = self.block()?;

        if handle.pool_id() != block.id() {
            return Err(Error::ForeignHandle {
                index: handle.index(),
            });
        }

        Ok(block)
    }

    fn owning_block_mut(&mut self, handle: Handle<T>) -> Result<&mut SlotBlock<T>> {
        let block = self.block_mut()?;

        if handle.pool_id() != block.id() {
            return Err(Error::ForeignHandle {
                index: handle.index(),
            });
        }

        Ok(block)
    }

    /// Returns a shared reference to the item `handle` refers to, or `None` if the handle is
    /// stale, invalid or was issued by another pool.
    #[must_use]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.owning_block(handle)
            .and_then(|block| block.get(handle.index(), handle.generation()))
            .ok()
    }

    /// Returns an exclusive reference to the item `handle` refers to, or `None` if the handle
    /// is stale, invalid or was issued by another pool.
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.owning_block_mut(handle)
            .and_then(|block| block.get_mut(handle.index(), handle.generation()))
            .ok()
    }

    /// Whether `handle` currently refers to an item in this pool.
    #[must_use]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Returns a shared reference to the item in slot `index`.
    ///
    /// If `generation` is non-zero, the slot must be at that generation. A `generation` of 0
    /// skips the generation check but the slot must still hold a live item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReserved`], [`Error::OutOfRange`], [`Error::GenerationMismatch`] or
    /// [`Error::IndexNotLive`] if the slot cannot be resolved to a live item.
    pub fn get_at(&self, index: u32, generation: u32) -> Result<&T> {
        self.block()?.get(index, generation)
    }

    /// Returns an exclusive reference to the item in slot `index`.
    ///
    /// # Errors
    ///
    /// Same as [`get_at()`][Self::get_at].
    pub fn get_at_mut(&mut self, index: u32, generation: u32) -> Result<&mut T> {
        self.block_mut()?.get_mut(index, generation)
    }

    /// Returns a shared reference to the item in slot `index` without checking that the slot
    /// holds a live item.
    ///
    /// # Safety
    ///
    /// The slot must hold a live item and no exclusive reference to that item may exist.
    ///
    /// # Panics
    ///
    /// Panics if storage has not been reserved or `index` is out of range.
    #[must_use]
    pub unsafe fn get_unchecked(&self, index: u32) -> &T {
        let block = self
            .block
            .as_ref()
            .expect("get_unchecked() requires reserved storage");

        // SAFETY: Forwarding the liveness and aliasing requirements to the caller.
        unsafe { block.item_ptr(index).as_ref() }
    }

    /// Returns a pointer to the storage of slot `index`, whether or not it holds a live item.
    ///
    /// The pointer is valid for the lifetime of the reserved storage. It is only valid to read
    /// through it while the slot holds a live item; outside that window the storage contents
    /// are unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReserved`] or [`Error::OutOfRange`].
    pub fn item_ptr(&self, index: u32) -> Result<NonNull<T>> {
        let block = self.block()?;

        if index >= block.capacity() {
            return Err(Error::OutOfRange {
                index,
                capacity: block.capacity(),
            });
        }

        Ok(block.item_ptr(index))
    }

    /// Returns the current generation of slot `index`. A slot that has never held an item is
    /// at generation 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReserved`] or [`Error::OutOfRange`].
    pub fn generation_at(&self, index: u32) -> Result<u32> {
        let block = self.block()?;

        if index >= block.capacity() {
            return Err(Error::OutOfRange {
                index,
                capacity: block.capacity(),
            });
        }

        Ok(block.generation(index))
    }

    /// Removes the item `handle` refers to from the pool and drops it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReserved`], [`Error::ForeignHandle`], [`Error::NothingToFree`],
    /// [`Error::OutOfRange`], [`Error::GenerationMismatch`] or [`Error::IndexNotLive`] if the
    /// handle does not refer to a live item. The pool is unchanged in that case, so removing
    /// the same handle twice is harmless.
    pub fn remove(&mut self, handle: Handle<T>) -> Result<()> {
        self.take(handle).map(drop)
    }

    /// Removes the item `handle` refers to from the pool and returns it.
    ///
    /// # Errors
    ///
    /// Same as [`remove()`][Self::remove].
    pub fn take(&mut self, handle: Handle<T>) -> Result<T> {
        self.owning_block_mut(handle)?
            .take(handle.index(), handle.generation())
    }

    /// Removes the item in slot `index` from the pool and drops it.
    ///
    /// If `generation` is non-zero, the slot must be at that generation. A `generation` of 0
    /// skips the generation check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReserved`], [`Error::NothingToFree`], [`Error::OutOfRange`],
    /// [`Error::GenerationMismatch`] or [`Error::IndexNotLive`]. The pool is unchanged in
    /// that case.
    pub fn remove_at(&mut self, index: u32, generation: u32) -> Result<()> {
        self.take_at(index, generation).map(drop)
    }

    /// Removes the item in slot `index` from the pool and returns it.
    ///
    /// # Errors
    ///
    /// Same as [`remove_at()`][Self::remove_at].
    pub fn take_at(&mut self, index: u32, generation: u32) -> Result<T> {
        self.block_mut()?.take(index, generation)
    }

    /// Returns the next live item of an enumeration pass and advances `cursor`.
    ///
    /// Start a pass with a cursor of 0. Once every live item has been visited, this returns
    /// `None` and leaves the cursor unchanged. Inserting or removing items during a pass makes
    /// the pass skip or revisit items.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::builder().reserve().build();
    /// pool.insert(1).unwrap();
    /// pool.insert(2).unwrap();
    ///
    /// let mut cursor = 0;
    /// let mut sum = 0;
    ///
    /// while let Some(item) = pool.enumerate(&mut cursor) {
    ///     sum += item;
    /// }
    ///
    /// assert_eq!(sum, 3);
    /// ```
    pub fn enumerate(&self, cursor: &mut u32) -> Option<&T> {
        self.block.as_ref()?.enumerate(cursor)
    }

    /// Iterates over shared references to the live items.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.block.as_ref())
    }

    /// Iterates over exclusive references to the live items.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.block.as_mut())
    }

    /// Iterates over handles to the live items.
    pub fn handles(&self) -> Handles<'_, T> {
        Handles::new(self.block.as_ref())
    }

    /// Drops every live item and releases the pool storage.
    ///
    /// Every handle issued so far becomes permanently invalid, also if storage is reserved
    /// again afterwards. Does nothing if no storage is reserved.
    ///
    /// The drop policy of the pool does not apply here: an explicit teardown always drops items.
    pub fn teardown(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };

        let live = block.len();
        drop(block);

        debug!(
            capacity = self.capacity.get(),
            live,
            item_type = type_name::<T>(),
            "tore down pool storage"
        );
    }
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity)
            .field("drop_policy", &self.drop_policy)
            .field("block", &self.block)
            .finish()
    }
}

impl<T> Drop for SlotPool<T> {
    fn drop(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };

        let was_empty = block.is_empty();

        // Drop the items and release the memory first, so a policy violation does not leak.
        drop(block);

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                was_empty,
                "dropped a non-empty SlotPool of {} with a policy that says it must be empty when dropped",
                type_name::<T>()
            );
        }
    }
}

impl<'p, T> IntoIterator for &'p SlotPool<T> {
    type Item = &'p T;
    type IntoIter = Iter<'p, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'p, T> IntoIterator for &'p mut SlotPool<T> {
    type Item = &'p mut T;
    type IntoIter = IterMut<'p, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
