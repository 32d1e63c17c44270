use thiserror::Error;

/// Errors that can occur when operating on a [`SlotPool`][crate::SlotPool].
///
/// Every failure is local and recoverable. The pool is left unchanged by a failed operation.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Storage was reserved a second time without an intervening teardown.
    #[error("pool storage is already reserved")]
    AlreadyReserved,

    /// The slot array for the configured capacity does not fit into the address space.
    #[error("storage for {capacity} slots exceeds the maximum allocation size")]
    StorageTooLarge {
        /// The configured capacity of the pool.
        capacity: u32,
    },

    /// The operation needs reserved storage but the pool has none.
    #[error("pool storage has not been reserved")]
    NotReserved,

    /// Every usable slot already holds a live item.
    #[error("pool is full: no free slot among {capacity} slots")]
    PoolFull {
        /// The configured capacity of the pool.
        capacity: u32,
    },

    /// The slot index is beyond the end of the pool.
    #[error("slot index {index} is out of range for a pool of capacity {capacity}")]
    OutOfRange {
        /// The requested slot index.
        index: u32,

        /// The configured capacity of the pool.
        capacity: u32,
    },

    /// The slot has been reused since the caller observed it. This is the stale-handle signal.
    #[error("slot {index} is at generation {actual} but generation {expected} was requested")]
    GenerationMismatch {
        /// The requested slot index.
        index: u32,

        /// The generation the caller expected the slot to be at.
        expected: u32,

        /// The generation the slot is actually at.
        actual: u32,
    },

    /// A removal was requested from a pool that holds no live items.
    #[error("pool holds no live items to free")]
    NothingToFree,

    /// The slot index is in range but the slot does not hold a live item.
    #[error("slot {index} does not hold a live item")]
    IndexNotLive {
        /// The requested slot index.
        index: u32,
    },

    /// The handle was issued by a different pool, or by an earlier reservation of this pool
    /// that has since been torn down.
    #[error("handle for slot {index} was not issued by the current storage of this pool")]
    ForeignHandle {
        /// The slot index named by the handle.
        index: u32,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
