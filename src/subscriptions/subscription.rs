//! Strong and weak subscription variants.

use crate::error::{HubError, Result};
use crate::messages::Envelope;
use crate::types::{MessageType, ReferenceStrength, SubscriptionId};
use std::sync::{Arc, Weak};

pub(crate) type Callback<S> = Box<dyn Fn(&S) + Send + Sync>;
pub(crate) type Filter<S> = Box<dyn Fn(&S) -> bool + Send + Sync>;

/// A registered interest in one message type.
///
/// The hub only talks to subscriptions through this trait, so a delivery
/// proxy can call [`Subscription::deliver`] without knowing the bound type.
pub trait Subscription: Send + Sync {
    fn id(&self) -> SubscriptionId;

    /// The type this subscription was registered for. Fixed at construction.
    fn message_type(&self) -> MessageType;

    fn strength(&self) -> ReferenceStrength;

    /// False once a weak subscription's guard has been dropped.
    fn is_alive(&self) -> bool;

    /// Whether a publish of `envelope` should be delivered here.
    fn should_attempt_delivery(&self, envelope: &Envelope) -> bool;

    /// Invoke the callback with `envelope` viewed as the bound type.
    fn deliver(&self, envelope: &Envelope) -> Result<()>;
}

/// Callback and filter bound to `S`.
struct Handler<S: ?Sized + 'static> {
    callback: Callback<S>,
    filter: Filter<S>,
}

impl<S: ?Sized + 'static> Handler<S> {
    fn matches(&self, envelope: &Envelope) -> bool {
        match envelope.view::<S>() {
            Some(message) => (self.filter)(&**message),
            None => false,
        }
    }

    fn invoke(&self, envelope: &Envelope) -> Result<()> {
        let message = view_as::<S>(envelope)?;
        (self.callback)(&**message);
        Ok(())
    }
}

fn view_as<S: ?Sized + 'static>(envelope: &Envelope) -> Result<&Arc<S>> {
    envelope.view::<S>().ok_or_else(|| HubError::TypeMismatch {
        expected: std::any::type_name::<S>(),
        got: envelope.message_type().name(),
    })
}

/// Owns its callback and filter outright.
pub(crate) struct StrongSubscription<S: ?Sized + 'static> {
    id: SubscriptionId,
    handler: Handler<S>,
}

impl<S: ?Sized + 'static> StrongSubscription<S> {
    pub(crate) fn new(id: SubscriptionId, callback: Callback<S>, filter: Filter<S>) -> Self {
        Self {
            id,
            handler: Handler { callback, filter },
        }
    }
}

impl<S: ?Sized + 'static> Subscription for StrongSubscription<S> {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn message_type(&self) -> MessageType {
        MessageType::of::<S>()
    }

    fn strength(&self) -> ReferenceStrength {
        ReferenceStrength::Strong
    }

    fn is_alive(&self) -> bool {
        true
    }

    fn should_attempt_delivery(&self, envelope: &Envelope) -> bool {
        self.handler.matches(envelope)
    }

    fn deliver(&self, envelope: &Envelope) -> Result<()> {
        self.handler.invoke(envelope)
    }
}

/// Callable only while the subscriber's guard is alive.
pub(crate) struct WeakSubscription<S: ?Sized + 'static> {
    id: SubscriptionId,
    handler: Handler<S>,
    guard: Weak<()>,
}

impl<S: ?Sized + 'static> WeakSubscription<S> {
    pub(crate) fn new(
        id: SubscriptionId,
        callback: Callback<S>,
        filter: Filter<S>,
        guard: Weak<()>,
    ) -> Self {
        Self {
            id,
            handler: Handler { callback, filter },
            guard,
        }
    }
}

impl<S: ?Sized + 'static> Subscription for WeakSubscription<S> {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn message_type(&self) -> MessageType {
        MessageType::of::<S>()
    }

    fn strength(&self) -> ReferenceStrength {
        ReferenceStrength::Weak
    }

    fn is_alive(&self) -> bool {
        self.guard.strong_count() > 0
    }

    fn should_attempt_delivery(&self, envelope: &Envelope) -> bool {
        // Hold the guard so it can't die between liveness and filter.
        let Some(_alive) = self.guard.upgrade() else {
            return false;
        };
        self.handler.matches(envelope)
    }

    fn deliver(&self, envelope: &Envelope) -> Result<()> {
        view_as::<S>(envelope)?;
        // Guard dropped after the snapshot: skip silently.
        let Some(_alive) = self.guard.upgrade() else {
            return Ok(());
        };
        self.handler.invoke(envelope)
    }
}

/// Shared handle to a subscription, as stored in the registry.
pub(crate) type SubscriptionRef = Arc<dyn Subscription>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Message, Supertypes};
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Shape: Send + Sync {
        fn sides(&self) -> u32;
    }

    struct Square;
    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }
    impl Message for Square {
        fn supertypes(table: &mut Supertypes<Self>) {
            table.add::<dyn Shape>(|s| s);
        }
    }

    struct Other;
    impl Message for Other {}

    fn counting<S: ?Sized + 'static>(hits: &Arc<AtomicUsize>) -> Callback<S> {
        let hits = Arc::clone(hits);
        Box::new(move |_: &S| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn accept_all<S: ?Sized + 'static>() -> Filter<S> {
        Box::new(|_: &S| true)
    }

    fn filter<S, F>(f: F) -> Filter<S>
    where
        S: ?Sized + 'static,
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Box::new(f)
    }

    #[test]
    fn test_strong_matches_supertype_not_unrelated() {
        let hits = Arc::new(AtomicUsize::new(0));
        let sub = StrongSubscription::<dyn Shape>::new(
            SubscriptionId(1),
            counting(&hits),
            filter::<dyn Shape, _>(|s| s.sides() == 4),
        );

        let square = Envelope::new(Arc::new(Square));
        let other = Envelope::new(Arc::new(Other));

        assert!(sub.should_attempt_delivery(&square));
        assert!(!sub.should_attempt_delivery(&other));

        sub.deliver(&square).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deliver_rejects_wrong_type() {
        let hits = Arc::new(AtomicUsize::new(0));
        let sub = StrongSubscription::<Square>::new(SubscriptionId(2), counting(&hits), accept_all());

        let result = sub.deliver(&Envelope::new(Arc::new(Other)));
        assert!(matches!(result, Err(HubError::TypeMismatch { .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_weak_skips_after_guard_dropped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let guard = Arc::new(());
        let sub = WeakSubscription::<Square>::new(
            SubscriptionId(3),
            counting(&hits),
            accept_all(),
            Arc::downgrade(&guard),
        );
        let square = Envelope::new(Arc::new(Square));

        assert!(sub.is_alive());
        assert!(sub.should_attempt_delivery(&square));

        drop(guard);
        assert!(!sub.is_alive());
        assert!(!sub.should_attempt_delivery(&square));
        // Late delivery after the guard died is a silent no-op
        sub.deliver(&square).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        // Type check still comes first
        let result = sub.deliver(&Envelope::new(Arc::new(Other)));
        assert!(matches!(result, Err(HubError::TypeMismatch { .. })));
    }
}
