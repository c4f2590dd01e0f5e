//! Identifiers for frame subscriptions.

use serde::{Deserialize, Serialize};

/// Opaque handle for one callback registered with a frame source.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u32);

/// Sequential allocator for SubscriptionId.
/// Wraps after `u32::MAX` allocations.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_subscription: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_subscription(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription = self.next_subscription.wrapping_add(1);
        id
    }
}
