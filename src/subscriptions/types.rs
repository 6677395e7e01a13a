//! Subscription handle and registry entry types.

use crate::types::SubscriptionId;
use std::fmt;
use std::sync::Weak;

use super::registry::Registry;

/// Handler callback invoked once per delivered payload.
///
/// The handler receives its own [`Subscription`] so it can close itself.
pub type Handler<T> = dyn Fn(&Subscription<T>, &T) + Send + Sync;

/// Handle to a live registration.
///
/// The handle does not own the registration: it carries the subscription's
/// id and a weak back-reference to the registry, and its only job is to
/// request removal through [`close`](Self::close). Dropping the handle does
/// not unsubscribe.
pub struct Subscription<T> {
    pub(crate) id: SubscriptionId,
    pub(crate) registry: Weak<Registry<T>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove this subscription from its emitter.
    ///
    /// Emissions that already captured their snapshot still deliver to this
    /// handler; later emissions never do. Closing twice, or after the emitter
    /// has been dropped, is a no-op.
    pub fn close(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    /// Whether this subscription is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            registry: Weak::clone(&self.registry),
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// A registered handler together with the handle passed to it.
pub(crate) struct Entry<T> {
    pub handle: Subscription<T>,
    pub handler: Box<Handler<T>>,
}

impl<T> Entry<T> {
    pub fn id(&self) -> SubscriptionId {
        self.handle.id
    }

    pub fn call(&self, payload: &T) {
        (self.handler)(&self.handle, payload);
    }
}
