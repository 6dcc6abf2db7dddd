//! The hub: subscription registry and delivery engine.

use crate::delivery::{DeliveryProxy, DirectDelivery, ErrorHandler, LogErrorHandler};
use crate::dispatch::Dispatcher;
use crate::error::{HubError, Result};
use crate::messages::{Envelope, Message};
use crate::subscriptions::{
    StrongSubscription, SubscribeOptions, Subscription, SubscriptionRef, SubscriptionToken,
    WeakSubscription,
};
use crate::types::{MessageType, ReferenceStrength, SubscriptionId};
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hub configuration.
#[derive(Clone)]
pub struct HubConfig {
    /// Worker threads for asynchronous publishes. Started on first use.
    pub async_workers: usize,

    /// Name prefix for worker threads.
    pub thread_name: String,

    /// Proxy used by subscriptions that don't supply their own.
    pub default_proxy: Arc<dyn DeliveryProxy>,

    /// Receives every failed delivery.
    pub error_handler: Arc<dyn ErrorHandler>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            async_workers: 2,
            thread_name: "herald-worker".to_string(),
            default_proxy: Arc::new(DirectDelivery),
            error_handler: Arc::new(LogErrorHandler),
        }
    }
}

impl fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubConfig")
            .field("async_workers", &self.async_workers)
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

/// A registered subscription and the proxy that delivers to it.
#[derive(Clone)]
struct Entry {
    proxy: Arc<dyn DeliveryProxy>,
    subscription: SubscriptionRef,
}

/// Shared hub state. Tokens hold it weakly to unsubscribe on drop.
pub(crate) struct Registry {
    /// Entries in subscribe order.
    entries: Mutex<Vec<Entry>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    default_proxy: Arc<dyn DeliveryProxy>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl Registry {
    fn insert<S: ?Sized + 'static>(
        &self,
        options: SubscribeOptions<S>,
    ) -> Result<(SubscriptionId, ReferenceStrength)> {
        let SubscribeOptions {
            callback,
            filter,
            strength,
            guard,
            proxy,
        } = options;

        let callback = callback
            .ok_or_else(|| HubError::InvalidArgument("subscription callback is required".into()))?;
        let filter = filter.unwrap_or_else(|| Box::new(|_: &S| true));
        let guard = match (strength, guard) {
            (ReferenceStrength::Weak, None) => {
                return Err(HubError::InvalidArgument(
                    "weak subscription requires a guard".into(),
                ))
            }
            (ReferenceStrength::Weak, guard) => guard,
            (ReferenceStrength::Strong, _) => None,
        };
        let proxy = proxy.unwrap_or_else(|| Arc::clone(&self.default_proxy));

        let mut entries = self.entries.lock();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let subscription: SubscriptionRef = match guard {
            Some(guard) => Arc::new(WeakSubscription::new(id, callback, filter, guard)),
            None => Arc::new(StrongSubscription::new(id, callback, filter)),
        };
        entries.push(Entry {
            proxy,
            subscription,
        });

        Ok((id, strength))
    }

    /// Remove every entry with this id (and type, if given). Returns how many were removed.
    pub(crate) fn remove(&self, id: SubscriptionId, message_type: Option<MessageType>) -> usize {
        let removed = self.take_where(|sub| {
            sub.id() == id && message_type.map_or(true, |ty| sub.message_type() == ty)
        });

        if removed > 0 {
            tracing::debug!(subscription = %id, "unsubscribed");
        }
        removed
    }

    /// Remove matching entries and drop them after the lock is released.
    ///
    /// Callbacks may own tokens of other subscriptions; dropping those tokens
    /// re-enters the registry.
    fn take_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&dyn Subscription) -> bool,
    {
        let removed: Vec<Entry> = {
            let mut entries = self.entries.lock();
            let (gone, kept): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut *entries)
                .into_iter()
                .partition(|entry| predicate(entry.subscription.as_ref()));
            *entries = kept;
            gone
        };
        removed.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn prune_stale(&self) -> usize {
        let pruned = self.take_where(|sub| !sub.is_alive());

        if pruned > 0 {
            tracing::debug!(pruned, "pruned stale weak subscriptions");
        }
        pruned
    }

    /// Eligible entries for `envelope`, in subscribe order.
    ///
    /// Filters run under the lock; a panicking filter excludes its entry and is
    /// returned as a failure to report once the lock is released.
    fn snapshot(&self, envelope: &Envelope) -> (Vec<Entry>, Vec<HubError>) {
        let entries = self.entries.lock();
        let mut eligible = Vec::new();
        let mut failures = Vec::new();

        for entry in entries.iter() {
            let sub = &entry.subscription;
            match panic::catch_unwind(AssertUnwindSafe(|| sub.should_attempt_delivery(envelope))) {
                Ok(true) => eligible.push(entry.clone()),
                Ok(false) => {}
                Err(payload) => failures.push(HubError::from_panic(sub.id().0, payload)),
            }
        }

        (eligible, failures)
    }

    /// Snapshot, release the lock, then deliver to each snapshot entry.
    fn publish(&self, envelope: &Envelope) -> usize {
        let (snapshot, failures) = self.snapshot(envelope);

        for error in &failures {
            self.report(envelope, error);
        }

        for entry in &snapshot {
            let sub = entry.subscription.as_ref();
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| entry.proxy.deliver(envelope, sub)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => self.report(envelope, &error),
                Err(payload) => self.report(envelope, &HubError::from_panic(sub.id().0, payload)),
            }
        }

        tracing::trace!(
            message_type = %envelope.message_type(),
            delivered = snapshot.len(),
            "published"
        );
        snapshot.len()
    }

    fn report(&self, envelope: &Envelope, error: &HubError) {
        let handled =
            panic::catch_unwind(AssertUnwindSafe(|| self.error_handler.handle(envelope, error)));
        if handled.is_err() {
            tracing::error!(
                message_type = %envelope.message_type(),
                error = %error,
                "error handler panicked"
            );
        }
    }
}

/// In-process publish/subscribe hub.
///
/// Cloning is cheap and every clone shares the same registry.
///
/// # Concurrency
///
/// The registry sits behind one mutex that is held only while entries are
/// added, removed, or snapshotted. Callbacks run after the lock is released,
/// so they may subscribe, unsubscribe, or publish on the same hub. A
/// subscription removed after a publish took its snapshot can still receive
/// that one message.
///
/// Filters are evaluated while the snapshot is taken, under the lock, and
/// must not call back into the hub.
#[derive(Clone)]
pub struct Hub {
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
}

impl Hub {
    /// Create a hub with the default configuration.
    pub fn new() -> Self {
        Self::build(HubConfig::default())
    }

    /// Create a hub with a custom configuration.
    pub fn with_config(config: HubConfig) -> Result<Self> {
        if config.async_workers == 0 {
            return Err(HubError::InvalidArgument(
                "async_workers must be at least 1".into(),
            ));
        }
        Ok(Self::build(config))
    }

    fn build(config: HubConfig) -> Self {
        Self {
            registry: Arc::new(Registry {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                default_proxy: config.default_proxy,
                error_handler: config.error_handler,
            }),
            dispatcher: Arc::new(Dispatcher::new(config.async_workers, config.thread_name)),
        }
    }

    // --- Subscribing ---

    /// Subscribe a callback to messages of type `S` with default options.
    pub fn subscribe<S, F>(&self, callback: F) -> Result<SubscriptionToken>
    where
        S: ?Sized + 'static,
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.subscribe_with(SubscribeOptions::<S>::new().callback(callback))
    }

    /// Subscribe with explicit options.
    ///
    /// Fails with [`HubError::InvalidArgument`] if no callback was set, or if
    /// weak strength was requested without a guard. The registry is left
    /// unchanged on failure.
    pub fn subscribe_with<S>(&self, options: SubscribeOptions<S>) -> Result<SubscriptionToken>
    where
        S: ?Sized + 'static,
    {
        let (id, strength) = self.registry.insert(options)?;
        let message_type = MessageType::of::<S>();

        tracing::debug!(
            subscription = %id,
            message_type = %message_type,
            strength = ?strength,
            "subscribed"
        );
        Ok(SubscriptionToken::new(
            id,
            message_type,
            Arc::downgrade(&self.registry),
        ))
    }

    // --- Unsubscribing ---

    /// Remove the subscription behind `token`.
    ///
    /// Never fails: unknown, already removed, or foreign tokens are ignored.
    pub fn unsubscribe(&self, token: &SubscriptionToken) {
        if token.belongs_to(&self.registry) {
            self.registry.remove(token.id(), None);
        }
    }

    /// Like [`unsubscribe`](Self::unsubscribe), but only removes the entry if it
    /// was registered for `S`.
    pub fn unsubscribe_typed<S: ?Sized + 'static>(&self, token: &SubscriptionToken) {
        if token.belongs_to(&self.registry) {
            self.registry
                .remove(token.id(), Some(MessageType::of::<S>()));
        }
    }

    /// Remove weak subscriptions whose guard has been dropped.
    ///
    /// Stale entries are otherwise kept until unsubscribed.
    pub fn prune_stale(&self) -> usize {
        self.registry.prune_stale()
    }

    /// Number of registered subscriptions, including stale weak ones.
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    // --- Publishing ---

    /// Deliver `message` to every eligible subscription on this thread.
    ///
    /// Returns how many subscriptions were in the snapshot. Failures inside
    /// deliveries go to the error handler and never reach the caller.
    pub fn publish<M: Message>(&self, message: M) -> usize {
        self.publish_arc(Arc::new(message))
    }

    /// Publish a message that is already shared.
    pub fn publish_arc<M: Message>(&self, message: Arc<M>) -> usize {
        self.registry.publish(&Envelope::new(message))
    }

    /// Publish on a worker thread and return immediately.
    pub fn publish_async<M: Message>(&self, message: M) -> Result<()> {
        self.publish_async_with(message, || {})
    }

    /// Publish on a worker thread, then call `on_complete` after every
    /// snapshot entry has been attempted.
    ///
    /// `on_complete` runs even if some deliveries failed.
    pub fn publish_async_with<M, F>(&self, message: M, on_complete: F) -> Result<()>
    where
        M: Message,
        F: FnOnce() + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let message = Arc::new(message);

        self.dispatcher.submit(Box::new(move || {
            registry.publish(&Envelope::new(message));
            on_complete();
        }))
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("subscriptions", &self.registry.len())
            .field("dispatcher_started", &self.dispatcher.is_started())
            .finish()
    }
}
