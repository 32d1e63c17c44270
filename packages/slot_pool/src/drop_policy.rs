/// Determines item dropping behavior when the pool is dropped.
///
/// By default, the pool will drop its items when it is dropped.
///
/// An explicit [`SlotPool::teardown()`][1] always drops the remaining items, whatever the policy.
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
///
/// [1]: crate::SlotPool::teardown
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool will drop its items when the pool is dropped. This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if it still contains items when it is dropped.
    ///
    /// This may be valuable if the items must be handed back through some external protocol
    /// before they can be dropped, with the pool being dropped only afterwards.
    MustNotDropItems,
}
