//! # Herald
//!
//! An in-process, typed publish/subscribe event aggregator.
//!
//! Components register interest in a message type, optionally filtered by a
//! predicate, and publishers broadcast instances of that type to every
//! matching, live subscription. Everything happens inside one process.
//!
//! ## Core Concepts
//!
//! - **Hub**: the registry of subscriptions and the delivery engine
//! - **Messages**: any `Send + Sync + 'static` type; may declare supertypes so
//!   general subscribers receive specific messages
//! - **Subscriptions**: strong (owned) or weak (tied to a guard's lifetime)
//! - **Tokens**: dropping one unsubscribes
//! - **Proxies and error handlers**: pluggable delivery and failure reporting
//!
//! ## Example
//!
//! ```ignore
//! use herald::{Hub, Message, SubscribeOptions};
//!
//! struct Ping { id: u32 }
//! impl Message for Ping {}
//!
//! let hub = Hub::new();
//!
//! let _all = hub.subscribe(|p: &Ping| println!("A got {}", p.id))?;
//! let _positive = hub.subscribe_with(
//!     SubscribeOptions::<Ping>::new()
//!         .callback(|p| println!("B got {}", p.id))
//!         .filter(|p| p.id > 0),
//! )?;
//!
//! hub.publish(Ping { id: 0 }); // A only
//! hub.publish(Ping { id: 5 }); // A, then B
//! hub.publish_async(Ping { id: 6 })?; // on a worker thread
//! ```

pub mod delivery;
mod dispatch;
pub mod error;
pub mod hub;
pub mod messages;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use delivery::{DeliveryProxy, DirectDelivery, ErrorHandler, LogErrorHandler};
pub use error::{HubError, Result};
pub use hub::{Hub, HubConfig};
pub use messages::{CancellableMessage, Envelope, GenericMessage, Message, SenderRef, Supertypes};
pub use subscriptions::{SubscribeOptions, SubscriberGuard, Subscription, SubscriptionToken};
pub use types::{MessageType, ReferenceStrength, SubscriptionId};
