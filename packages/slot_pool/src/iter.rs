use std::any::type_name;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::{Handle, SlotBlock};

/// Iterator over shared references to the live items of a [`SlotPool`][crate::SlotPool].
///
/// Returned by [`SlotPool::iter()`][crate::SlotPool::iter]. Items are visited in the current
/// order of the live prefix, which is not insertion order once items have been removed.
pub struct Iter<'p, T> {
    block: Option<&'p SlotBlock<T>>,
    cursor: u32,
}

impl<'p, T> Iter<'p, T> {
    pub(crate) fn new(block: Option<&'p SlotBlock<T>>) -> Self {
        Self { block, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.block
            .map_or(0, |block| block.len().saturating_sub(self.cursor) as usize)
    }
}

impl<'p, T> Iterator for Iter<'p, T> {
    type Item = &'p T;

    fn next(&mut self) -> Option<Self::Item> {
        self.block?.enumerate(&mut self.cursor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("cursor", &self.cursor)
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// Iterator over exclusive references to the live items of a [`SlotPool`][crate::SlotPool].
///
/// Returned by [`SlotPool::iter_mut()`][crate::SlotPool::iter_mut].
pub struct IterMut<'p, T> {
    // Created from an exclusive borrow. We keep a shared one so we can hand out references to
    // distinct items while the iterator itself is still borrowed.
    block: Option<&'p SlotBlock<T>>,
    cursor: u32,

    _items: PhantomData<&'p mut T>,
}

impl<'p, T> IterMut<'p, T> {
    pub(crate) fn new(block: Option<&'p mut SlotBlock<T>>) -> Self {
        Self {
            block: block.map(|block| &*block),
            cursor: 0,
            _items: PhantomData,
        }
    }

    fn remaining(&self) -> usize {
        self.block
            .map_or(0, |block| block.len().saturating_sub(self.cursor) as usize)
    }
}

impl<'p, T> Iterator for IterMut<'p, T> {
    type Item = &'p mut T;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.block?;
        let index = block.live_slot_at(self.cursor)?;

        self.cursor = self
            .cursor
            .checked_add(1)
            .expect("cursor is below the live count, which is below u32::MAX");

        // SAFETY: The slot is in the live prefix so it holds a live item. We borrowed the block
        // exclusively for 'p and the partition names each slot exactly once, so every item is
        // handed out at most once and no other reference to it can exist.
        Some(unsafe { block.item_ptr(index).as_mut() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}

impl<T> fmt::Debug for IterMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("cursor", &self.cursor)
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// Iterator over handles to the live items of a [`SlotPool`][crate::SlotPool].
///
/// Returned by [`SlotPool::handles()`][crate::SlotPool::handles].
pub struct Handles<'p, T> {
    block: Option<&'p SlotBlock<T>>,
    cursor: u32,
}

impl<'p, T> Handles<'p, T> {
    pub(crate) fn new(block: Option<&'p SlotBlock<T>>) -> Self {
        Self { block, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.block
            .map_or(0, |block| block.len().saturating_sub(self.cursor) as usize)
    }
}

impl<T> Iterator for Handles<'_, T> {
    type Item = Handle<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.block?;
        let index = block.live_slot_at(self.cursor)?;

        self.cursor = self
            .cursor
            .checked_add(1)
            .expect("cursor is below the live count, which is below u32::MAX");

        Some(Handle::new(block.id(), index, block.generation(index)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Handles<'_, T> {}
impl<T> FusedIterator for Handles<'_, T> {}

impl<T> fmt::Debug for Handles<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("cursor", &self.cursor)
            .field("remaining", &self.remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use crate::SlotPool;

    fn pool_of(values: &[u32]) -> SlotPool<u32> {
        let mut pool = SlotPool::with_capacity(NonZero::new(8).unwrap());
        pool.reserve().unwrap();

        for &value in values {
            _ = pool.insert(value).unwrap();
        }

        pool
    }

    #[test]
    fn unreserved_pool_iterates_nothing() {
        let mut pool = SlotPool::<u32>::new();

        assert_eq!(pool.iter().len(), 0);
        assert_eq!(pool.iter().next(), None);
        assert_eq!(pool.iter_mut().next(), None);
        assert_eq!(pool.handles().next(), None);
    }

    #[test]
    fn iter_reports_exact_size() {
        let pool = pool_of(&[1, 2, 3]);
        let mut iter = pool.iter();

        assert_eq!(iter.len(), 3);
        _ = iter.next();
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.by_ref().count(), 2);

        // Fused.
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn iter_mut_modifies_every_item() {
        let mut pool = pool_of(&[1, 2, 3]);

        for item in pool.iter_mut() {
            *item *= 10;
        }

        let mut items: Vec<_> = pool.iter().copied().collect();
        items.sort_unstable();
        assert_eq!(items, [10, 20, 30]);
    }

    #[test]
    fn handles_resolve_to_iterated_items() {
        let mut pool = pool_of(&[5, 6, 7]);

        let first = pool.handles().next().unwrap();
        pool.remove(first).unwrap();

        let via_handles: Vec<_> = pool
            .handles()
            .map(|handle| *pool.get(handle).unwrap())
            .collect();
        let via_iter: Vec<_> = pool.iter().copied().collect();

        assert_eq!(via_handles, via_iter);
        assert_eq!(via_iter, [7, 6]);
    }
}
