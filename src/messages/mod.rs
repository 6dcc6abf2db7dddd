//! Message marker trait, type tables, and ready-made message types.
//!
//! A message is any `Send + Sync + 'static` value implementing [`Message`].
//! When published it is wrapped in an [`Envelope`] listing every type it can
//! be delivered as: its own type plus the supertypes it declares. A
//! subscription registered for a general type (often a trait object such as
//! `dyn Notification`) receives every message that declares that type.

mod envelope;
mod generic;

pub use envelope::{Envelope, Message, Supertypes};
pub use generic::{CancellableMessage, GenericMessage, SenderRef};
