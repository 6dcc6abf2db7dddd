//! Pluggable delivery strategy and error reporting.

use crate::error::{HubError, Result};
use crate::messages::Envelope;
use crate::subscriptions::Subscription;

/// Performs the actual invocation of a subscription for one publish.
///
/// Called once per snapshot entry, after the registry lock has been released.
/// Errors returned here (and panics raised by the callback) are reported to the
/// hub's [`ErrorHandler`] and never reach the publisher.
pub trait DeliveryProxy: Send + Sync {
    fn deliver(&self, envelope: &Envelope, subscription: &dyn Subscription) -> Result<()>;
}

/// Invokes the subscription directly on the publishing thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectDelivery;

impl DeliveryProxy for DirectDelivery {
    fn deliver(&self, envelope: &Envelope, subscription: &dyn Subscription) -> Result<()> {
        subscription.deliver(envelope)
    }
}

/// Receives one notification per failed delivery.
///
/// Implementations must not panic; a panicking handler is caught and logged.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, envelope: &Envelope, error: &HubError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&Envelope, &HubError) + Send + Sync,
{
    fn handle(&self, envelope: &Envelope, error: &HubError) {
        self(envelope, error)
    }
}

/// Logs failed deliveries at `warn` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle(&self, envelope: &Envelope, error: &HubError) {
        tracing::warn!(
            message_type = %envelope.message_type(),
            error = %error,
            "message delivery failed"
        );
    }
}
