//! Ready-made message types for payloads that don't need their own struct.

use super::envelope::Message;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// Shared, type-erased reference to whatever published a message.
pub type SenderRef = Arc<dyn Any + Send + Sync>;

/// A message carrying arbitrary content and an optional sender.
///
/// The sender is held weakly so a message in flight never keeps its
/// publisher alive.
pub struct GenericMessage<T> {
    content: T,
    sender: Option<Weak<dyn Any + Send + Sync>>,
}

impl<T: Send + Sync + 'static> GenericMessage<T> {
    pub fn new(content: T) -> Self {
        Self {
            content,
            sender: None,
        }
    }

    pub fn with_sender(content: T, sender: &SenderRef) -> Self {
        Self {
            content,
            sender: Some(Arc::downgrade(sender)),
        }
    }

    pub fn content(&self) -> &T {
        &self.content
    }

    /// The sender, if one was attached and it is still alive.
    pub fn sender(&self) -> Option<SenderRef> {
        self.sender.as_ref().and_then(Weak::upgrade)
    }
}

impl<T: Send + Sync + 'static> Message for GenericMessage<T> {}

impl<T: fmt::Debug> fmt::Debug for GenericMessage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericMessage")
            .field("content", &self.content)
            .field("has_sender", &self.sender.is_some())
            .finish()
    }
}

/// A message subscribers can veto by calling [`CancellableMessage::cancel`].
pub struct CancellableMessage<T> {
    inner: GenericMessage<T>,
    on_cancel: Box<dyn Fn() + Send + Sync>,
}

impl<T: Send + Sync + 'static> CancellableMessage<T> {
    pub fn new<F>(content: T, on_cancel: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: GenericMessage::new(content),
            on_cancel: Box::new(on_cancel),
        }
    }

    pub fn with_sender<F>(content: T, sender: &SenderRef, on_cancel: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: GenericMessage::with_sender(content, sender),
            on_cancel: Box::new(on_cancel),
        }
    }

    pub fn content(&self) -> &T {
        self.inner.content()
    }

    pub fn sender(&self) -> Option<SenderRef> {
        self.inner.sender()
    }

    /// Run the publisher's cancel action. May be called by any number of subscribers.
    pub fn cancel(&self) {
        (self.on_cancel)()
    }
}

impl<T: Send + Sync + 'static> Message for CancellableMessage<T> {}

impl<T: fmt::Debug> fmt::Debug for CancellableMessage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellableMessage")
            .field("content", &self.inner.content)
            .finish_non_exhaustive()
    }
}
