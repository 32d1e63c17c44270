use std::any::type_name;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::SlotPool;

/// Identifies one reservation of storage by one pool.
///
/// Handles carry this so they can only be resolved against the storage that issued them. The
/// value is unique for the lifetime of the process.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct PoolId(u64);

impl PoolId {
    /// Never assigned to any storage. Carried by invalid handles.
    pub(crate) const NONE: Self = Self(0);

    #[must_use]
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        // Relaxed is enough, we only need uniqueness, not ordering with other memory.
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A generation-checked reference to an item in a [`SlotPool`].
///
/// Handles are returned by [`SlotPool::insert()`] and related methods. They are small `Copy`
/// values that do not own the item and do not keep the pool alive. Any number of copies may exist.
///
/// A handle remembers the slot it names and the generation the slot was at when the item was
/// inserted. Resolving the handle succeeds only while that item is still in the pool:
///
/// * once the item is removed, the handle resolves to `None`,
/// * once the slot is reused for another item, the handle keeps resolving to `None` because the
///   generation of the slot has moved on,
/// * a handle resolved against a different pool, or against the same pool after
///   [`teardown()`][SlotPool::teardown], resolves to `None`.
///
/// # Example
///
/// ```rust
/// use slot_pool::SlotPool;
///
/// let mut pool = SlotPool::<String>::new();
/// pool.reserve().unwrap();
///
/// let handle = pool.insert("Hello".to_string()).unwrap();
/// let copy = handle;
///
/// assert_eq!(copy.get(&pool).map(String::as_str), Some("Hello"));
///
/// pool.remove(handle).unwrap();
///
/// // Every copy of the handle is now stale.
/// assert!(copy.get(&pool).is_none());
/// ```
pub struct Handle<T> {
    pool_id: PoolId,
    index: u32,
    generation: u32,

    _item: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The slot index carried by [`invalid()`][Self::invalid] handles.
    pub const INVALID_INDEX: u32 = u32::MAX;

    #[must_use]
    pub(crate) fn new(pool_id: PoolId, index: u32, generation: u32) -> Self {
        debug_assert!(generation != 0, "generation 0 is reserved for invalid handles");

        Self {
            pool_id,
            index,
            generation,
            _item: PhantomData,
        }
    }

    /// Returns a handle that never resolves to an item.
    ///
    /// It names no pool, carries the [`INVALID_INDEX`][Self::INVALID_INDEX] slot index and
    /// generation 0. This is also the [`Default`] value.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            pool_id: PoolId::NONE,
            index: Self::INVALID_INDEX,
            generation: 0,
            _item: PhantomData,
        }
    }

    /// Whether this handle is known not to name any item in any pool.
    ///
    /// A handle that is not invalid may still be stale. Use [`get()`][Self::get] or
    /// [`SlotPool::contains()`] to check whether it currently resolves.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.generation == 0
    }

    /// The slot index this handle names.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The generation the slot was at when the item was inserted.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[must_use]
    pub(crate) fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// Resolves the handle to a shared reference to its item in `pool`.
    ///
    /// Returns `None` if the item has been removed, the slot has been reused, the handle was
    /// issued by a different pool or the handle is [`invalid()`][Self::invalid].
    #[must_use]
    pub fn get<'p>(&self, pool: &'p SlotPool<T>) -> Option<&'p T> {
        pool.get(*self)
    }

    /// Resolves the handle to an exclusive reference to its item in `pool`.
    ///
    /// Returns `None` in the same situations as [`get()`][Self::get].
    #[must_use]
    pub fn get_mut<'p>(&self, pool: &'p mut SlotPool<T>) -> Option<&'p mut T> {
        pool.get_mut(*self)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.pool_id == other.pool_id
            && self.index == other.index
            && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pool_id.hash(state);
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("pool_id", &self.pool_id)
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;

    use static_assertions::assert_impl_all;

    use super::*;

    // Handles are plain data, whatever they point to.
    assert_impl_all!(Handle<Rc<Cell<u32>>>: Send, Sync, Copy, fmt::Debug);

    #[test]
    fn invalid_is_default() {
        let handle = Handle::<u32>::default();

        assert_eq!(handle, Handle::invalid());
        assert!(handle.is_invalid());
        assert_eq!(handle.index(), Handle::<u32>::INVALID_INDEX);
        assert_eq!(handle.generation(), 0);
        assert_eq!(handle.pool_id(), PoolId::NONE);
    }

    #[test]
    fn pool_ids_are_unique() {
        let a = PoolId::next();
        let b = PoolId::next();

        assert_ne!(a, b);
        assert_ne!(a, PoolId::NONE);
        assert_ne!(b, PoolId::NONE);
    }

    #[test]
    fn equality_covers_all_parts() {
        let pool_id = PoolId::next();
        let handle = Handle::<u32>::new(pool_id, 1, 1);

        assert_eq!(handle, Handle::new(pool_id, 1, 1));
        assert_ne!(handle, Handle::new(pool_id, 2, 1));
        assert_ne!(handle, Handle::new(pool_id, 1, 2));
        assert_ne!(handle, Handle::new(PoolId::next(), 1, 1));

        let set: HashSet<_> = [handle, handle, Handle::new(pool_id, 1, 2)].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn invalid_handle_resolves_to_nothing() {
        let mut pool = SlotPool::<u32>::new();
        pool.reserve().unwrap();
        _ = pool.insert(1).unwrap();

        let handle = Handle::<u32>::invalid();

        assert!(handle.get(&pool).is_none());
        assert!(handle.get_mut(&mut pool).is_none());
    }
}
