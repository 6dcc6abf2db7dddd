//! Subscription tokens, guards, and subscribe-time options.

use crate::delivery::DeliveryProxy;
use crate::hub::Registry;
use crate::types::{MessageType, ReferenceStrength, SubscriptionId};
use std::fmt;
use std::sync::{Arc, Weak};

use super::subscription::{Callback, Filter};

/// Owner of one or more weak subscriptions.
///
/// Weak subscriptions registered with a guard stay callable only while the
/// guard (or a clone of it) is alive. Once every clone is dropped, those
/// subscriptions are skipped at publish time but remain registered until
/// unsubscribed or pruned with [`Hub::prune_stale`](crate::Hub::prune_stale).
#[derive(Clone, Default)]
pub struct SubscriberGuard {
    alive: Arc<()>,
}

impl SubscriberGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn downgrade(&self) -> Weak<()> {
        Arc::downgrade(&self.alive)
    }
}

impl fmt::Debug for SubscriberGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberGuard")
            .field("clones", &Arc::strong_count(&self.alive))
            .finish()
    }
}

/// Configuration for a subscription to messages of type `S`.
///
/// `S` is either a concrete message type or a supertype messages declare
/// through [`Message::supertypes`](crate::Message::supertypes).
pub struct SubscribeOptions<S: ?Sized + 'static> {
    pub(crate) callback: Option<Callback<S>>,
    /// Accept-all when unset.
    pub(crate) filter: Option<Filter<S>>,
    pub(crate) strength: ReferenceStrength,
    pub(crate) guard: Option<Weak<()>>,
    /// Hub's default proxy when unset.
    pub(crate) proxy: Option<Arc<dyn DeliveryProxy>>,
}

impl<S: ?Sized + 'static> SubscribeOptions<S> {
    /// Empty options. A callback must be set before subscribing.
    pub fn new() -> Self {
        Self {
            callback: None,
            filter: None,
            strength: ReferenceStrength::Strong,
            guard: None,
            proxy: None,
        }
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Hold the callback weakly, tied to `guard`.
    pub fn weak(mut self, guard: &SubscriberGuard) -> Self {
        self.strength = ReferenceStrength::Weak;
        self.guard = Some(guard.downgrade());
        self
    }

    /// Set the strength directly. `Weak` without [`weak`](Self::weak) is rejected at subscribe.
    pub fn strength(mut self, strength: ReferenceStrength) -> Self {
        self.strength = strength;
        self
    }

    pub fn proxy(mut self, proxy: Arc<dyn DeliveryProxy>) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

impl<S: ?Sized + 'static> Default for SubscribeOptions<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one subscription. Dropping it unsubscribes.
#[must_use = "dropping a SubscriptionToken unsubscribes immediately"]
pub struct SubscriptionToken {
    pub(crate) id: SubscriptionId,
    pub(crate) message_type: MessageType,
    pub(crate) hub: Weak<Registry>,
    detached: bool,
}

impl SubscriptionToken {
    pub(crate) fn new(id: SubscriptionId, message_type: MessageType, hub: Weak<Registry>) -> Self {
        Self {
            id,
            message_type,
            hub,
            detached: false,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// True if this token was issued by the hub owning `registry`.
    pub(crate) fn belongs_to(&self, registry: &Arc<Registry>) -> bool {
        std::ptr::eq(self.hub.as_ptr(), Arc::as_ptr(registry))
    }

    /// Give up the token without unsubscribing.
    ///
    /// The subscription then lives as long as the hub does.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for SubscriptionToken {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        if let Some(registry) = self.hub.upgrade() {
            registry.remove(self.id, None);
        }
    }
}

impl fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionToken")
            .field("id", &self.id)
            .field("message_type", &self.message_type)
            .finish()
    }
}
