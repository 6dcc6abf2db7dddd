//! The message marker trait and the type table a published message carries.

use crate::types::MessageType;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Marker for values that can be published on a hub.
///
/// Any `Send + Sync + 'static` type qualifies. Override [`Message::supertypes`]
/// to make the message deliverable to subscribers of more general types:
///
/// ```ignore
/// trait Notification: Send + Sync {
///     fn text(&self) -> String;
/// }
///
/// impl Message for Ping {
///     fn supertypes(table: &mut Supertypes<Self>) {
///         table.add::<dyn Notification>(|ping| ping);
///     }
/// }
/// ```
pub trait Message: Send + Sync + 'static {
    /// Declare the types this message may also be delivered as.
    fn supertypes(_table: &mut Supertypes<Self>)
    where
        Self: Sized,
    {
    }
}

type View = Box<dyn Any + Send + Sync>;
type Cast<M> = Box<dyn Fn(Arc<M>) -> View>;

/// Declared supertypes of a message type `M`.
pub struct Supertypes<M> {
    casts: Vec<(MessageType, Cast<M>)>,
}

impl<M: Message> Supertypes<M> {
    fn new() -> Self {
        Self { casts: Vec::new() }
    }

    /// Register `S` as a supertype of `M`.
    ///
    /// `cast` is usually `|m| m`, relying on unsized coercion into `Arc<dyn Trait>`.
    /// Registering `M` itself or the same type twice has no effect.
    pub fn add<S>(&mut self, cast: fn(Arc<M>) -> Arc<S>) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let ty = MessageType::of::<S>();
        if ty.is::<M>() || self.casts.iter().any(|(t, _)| *t == ty) {
            return self;
        }
        self.casts.push((
            ty,
            Box::new(move |message: Arc<M>| Box::new(cast(message)) as View),
        ));
        self
    }

    pub fn len(&self) -> usize {
        self.casts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.casts.is_empty()
    }
}

struct EnvelopeInner {
    message_type: MessageType,
    /// `(type, Arc<type>)` pairs; the concrete type is always first.
    views: Vec<(MessageType, View)>,
}

/// A published message together with every type it can be viewed as.
///
/// Cheap to clone. Subscriptions match against the envelope instead of the raw
/// message so supertype delivery is a table lookup.
#[derive(Clone)]
pub struct Envelope {
    inner: Arc<EnvelopeInner>,
}

impl Envelope {
    /// Wrap a message, resolving its declared supertypes.
    pub fn new<M: Message>(message: Arc<M>) -> Self {
        let mut table = Supertypes::<M>::new();
        M::supertypes(&mut table);

        let mut views: Vec<(MessageType, View)> = Vec::with_capacity(table.len() + 1);
        for (ty, cast) in &table.casts {
            views.push((*ty, cast(Arc::clone(&message))));
        }
        views.insert(0, (MessageType::of::<M>(), Box::new(message)));

        Self {
            inner: Arc::new(EnvelopeInner {
                message_type: MessageType::of::<M>(),
                views,
            }),
        }
    }

    /// Runtime (concrete) type of the wrapped message.
    pub fn message_type(&self) -> MessageType {
        self.inner.message_type
    }

    /// True if the message is of type `ty` or declares it as a supertype.
    pub fn satisfies(&self, ty: MessageType) -> bool {
        self.inner.views.iter().any(|(t, _)| *t == ty)
    }

    /// The message viewed as `S`, if it satisfies `S`.
    pub fn view<S: ?Sized + 'static>(&self) -> Option<&Arc<S>> {
        let ty = MessageType::of::<S>();
        self.inner
            .views
            .iter()
            .find(|(t, _)| *t == ty)
            .and_then(|(_, view)| view.downcast_ref::<Arc<S>>())
    }

    /// All types this envelope can be delivered as, concrete type first.
    pub fn types(&self) -> impl Iterator<Item = MessageType> + '_ {
        self.inner.views.iter().map(|(t, _)| *t)
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("message_type", &self.inner.message_type)
            .field("views", &self.inner.views.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Plain(u32);
    impl Message for Plain {}

    struct Tagged(String);
    impl Named for Tagged {
        fn name(&self) -> &str {
            &self.0
        }
    }
    impl Message for Tagged {
        fn supertypes(table: &mut Supertypes<Self>) {
            table.add::<dyn Named>(|m| m).add::<dyn Named>(|m| m);
        }
    }

    #[test]
    fn test_plain_message_has_only_own_view() {
        let env = Envelope::new(Arc::new(Plain(7)));
        assert_eq!(env.message_type(), MessageType::of::<Plain>());
        assert_eq!(env.types().count(), 1);
        assert_eq!(env.view::<Plain>().map(|p| p.0), Some(7));
        assert!(env.view::<Tagged>().is_none());
    }

    #[test]
    fn test_supertype_view_resolves_to_trait_object() {
        let env = Envelope::new(Arc::new(Tagged("alpha".to_string())));
        assert!(env.satisfies(MessageType::of::<dyn Named>()));
        assert!(!env.satisfies(MessageType::of::<Plain>()));

        let named = env.view::<dyn Named>().unwrap();
        assert_eq!(named.name(), "alpha");

        // Duplicate registration is ignored
        assert_eq!(env.types().count(), 2);
        assert_eq!(env.types().next(), Some(MessageType::of::<Tagged>()));
    }
}
