use std::fmt;
use std::sync::Weak;

use tracing::trace;

/// Anything that can drop a listener by id.
pub(crate) trait ListenerRegistry: Send + Sync {
    fn remove_listener(&self, id: u64) -> bool;
    fn has_listener(&self, id: u64) -> bool;
}

/// Handle returned by [`Store::subscribe`](crate::Store::subscribe).
///
/// Holding it does not keep the listener alive or dead; the listener stays
/// registered until [`unsubscribe`](Self::unsubscribe) is called or the
/// store is destroyed. Use [`into_guard`](Self::into_guard) for
/// drop-to-unsubscribe.
pub struct Subscription {
    id: u64,
    registry: Weak<dyn ListenerRegistry>,
}

impl Subscription {
    pub(crate) fn new(id: u64, registry: Weak<dyn ListenerRegistry>) -> Self {
        Self { id, registry }
    }

    /// Remove this listener. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove_listener(self.id) {
                trace!(listener = self.id, "listener unsubscribed");
            }
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.has_listener(self.id))
    }

    /// Turn this handle into a guard that unsubscribes on drop.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { subscription: self }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// RAII guard for a store listener.
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Subscription,
}

impl SubscriptionGuard {
    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
