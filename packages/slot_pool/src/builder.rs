use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{DropPolicy, SlotBlock, SlotPool};

/// Builder for creating an instance of [`SlotPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`SlotPool::new()`][1] is sufficient for many use cases.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use slot_pool::{DropPolicy, SlotPool};
///
/// let pool = SlotPool::<u32>::builder()
///     .capacity(NonZero::new(64).unwrap())
///     .drop_policy(DropPolicy::MayDropItems)
///     .reserve()
///     .build();
///
/// assert_eq!(pool.capacity(), 64);
/// assert!(pool.is_reserved());
/// ```
///
/// [1]: SlotPool::new
#[must_use]
pub struct SlotPoolBuilder<T> {
    capacity: Option<NonZero<u32>>,
    drop_policy: DropPolicy,
    reserve: bool,

    _item: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for SlotPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity)
            .field("drop_policy", &self.drop_policy)
            .field("reserve", &self.reserve)
            .finish()
    }
}

impl<T> SlotPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: None,
            drop_policy: DropPolicy::default(),
            reserve: false,
            _item: PhantomData,
        }
    }

    /// Sets the number of slots in the pool. The capacity is fixed for the lifetime of the pool.
    ///
    /// If not set, the pool gets as many slots as fit into 4 KiB, but at least one.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is `u32::MAX`, which is reserved as the index of
    /// [invalid handles][crate::Handle::invalid].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::builder()
    ///     .capacity(NonZero::new(16).unwrap())
    ///     .build();
    ///
    /// assert_eq!(pool.capacity(), 16);
    /// ```
    pub fn capacity(mut self, capacity: NonZero<u32>) -> Self {
        assert!(
            capacity.get() < u32::MAX,
            "SlotPool capacity must be less than u32::MAX"
        );

        self.capacity = Some(capacity);
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat remaining items in the pool when the pool is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{DropPolicy, SlotPool};
    ///
    /// let pool = SlotPool::<u32>::builder()
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    /// ```
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Reserves the storage of the pool as part of [`build()`][Self::build], so the pool is
    /// ready for insertion right away.
    ///
    /// Without this, the caller must call [`SlotPool::reserve()`] before inserting.
    pub fn reserve(mut self) -> Self {
        self.reserve = true;
        self
    }

    /// Builds the slot pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if [`reserve()`][Self::reserve] was requested and the storage for the configured
    /// capacity exceeds the maximum allocation size. Call [`SlotPool::reserve()`] on the built
    /// pool to handle that case as an error instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::builder().build();
    ///
    /// assert!(!pool.is_reserved());
    /// ```
    #[must_use]
    pub fn build(self) -> SlotPool<T> {
        let capacity = self
            .capacity
            .unwrap_or_else(SlotBlock::<T>::default_capacity);

        let mut pool = SlotPool::new_inner(capacity, self.drop_policy);

        if self.reserve {
            if let Err(error) = pool.reserve() {
                panic!("failed to reserve storage of a freshly built pool: {error}");
            }
        }

        pool
    }
}
