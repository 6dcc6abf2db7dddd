//! Subscriptions: what a subscriber registered and how to cancel it.
//!
//! A subscription comes in two variants:
//! - **Strong**: the hub owns the callback and filter; they stay callable
//!   until the subscription is removed.
//! - **Weak**: callable only while a [`SubscriberGuard`] is alive. When the
//!   guard is dropped the subscription is skipped at publish time, but its
//!   registry entry stays until it is unsubscribed or pruned.
//!
//! # Example
//!
//! ```ignore
//! let hub = Hub::new();
//! let guard = SubscriberGuard::new();
//!
//! let token = hub.subscribe_with(
//!     SubscribeOptions::<Ping>::new()
//!         .callback(|ping| println!("ping {}", ping.id))
//!         .filter(|ping| ping.id > 0)
//!         .weak(&guard),
//! )?;
//!
//! hub.publish(Ping { id: 5 });
//! drop(guard); // no further deliveries
//! drop(token); // entry removed
//! ```

mod subscription;
mod types;

pub use subscription::Subscription;
pub use types::{SubscribeOptions, SubscriberGuard, SubscriptionToken};

pub(crate) use subscription::{StrongSubscription, SubscriptionRef, WeakSubscription};
