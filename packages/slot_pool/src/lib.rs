//! A fixed-capacity object pool with generation-checked handles.
//!
//! This crate provides [`SlotPool`], a pool that stores items of one type in a single
//! pre-reserved block of slots and refers to them through small, copyable [`Handle`]s instead
//! of references or raw pointers. Insertion and removal never allocate, and a handle whose item
//! has been removed is reliably rejected, even after its slot has been reused for another item.
//!
//! # Key Features
//!
//! - **Fixed capacity**: storage for all slots is reserved once via [`SlotPool::reserve()`]
//! - **No per-item allocation**: items are moved into pre-reserved slots and never move again
//! - **Stale handle detection**: every slot carries a generation counter that is bumped on reuse,
//!   and a handle only resolves while its generation matches
//! - **O(1) operations**: insertion, lookup and removal take constant time
//! - **Dense iteration**: live items are tracked in a packed index array, so iteration never
//!   visits free slots
//! - **Pool identity**: handles from another pool, or from storage that has since been torn
//!   down, are rejected
//! - **Flexible drop policies**: configure behavior when the pool is dropped with remaining items
//!
//! # Handles
//!
//! A [`Handle`] is a `Copy` value naming a slot index and the generation the slot was at when
//! the item was inserted. It does not own the item and does not borrow the pool. Resolve it with
//! [`SlotPool::get()`] or [`Handle::get()`]; both return `None` once the item is gone.
//!
//! # Errors
//!
//! Fallible operations return [`Error`], describing why the pool could not satisfy the request.
//! A failed operation leaves the pool unchanged.
//!
//! # Examples
//!
//! ```rust
//! use std::num::NonZero;
//!
//! use slot_pool::{Error, SlotPool};
//!
//! let mut pool = SlotPool::<String>::builder()
//!     .capacity(NonZero::new(128).unwrap())
//!     .reserve()
//!     .build();
//!
//! let handle = pool.insert("Hello, World!".to_string()).unwrap();
//! assert_eq!(pool.get(handle).map(String::len), Some(13));
//!
//! pool.remove(handle).unwrap();
//!
//! // The handle is now stale and removing it again is a harmless error.
//! assert!(pool.get(handle).is_none());
//! assert_eq!(pool.remove(handle), Err(Error::NothingToFree));
//! ```

mod block;
mod builder;
mod drop_policy;
mod error;
mod handle;
mod iter;
mod pool;

pub(crate) use block::*;
pub use builder::*;
pub use drop_policy::*;
pub use error::*;
pub use handle::Handle;
pub(crate) use handle::PoolId;
pub use iter::*;
pub use pool::SlotPool;
