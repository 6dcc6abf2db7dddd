//! Error types for the hub.

use thiserror::Error;

/// Main error type for hub operations.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("Subscription {subscription} panicked: {message}")]
    DeliveryPanicked { subscription: u64, message: String },

    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// No worker is left to receive an async publish. A `Hub` keeps its
    /// workers alive for as long as any handle exists.
    #[error("Async dispatcher is closed")]
    DispatcherClosed,
}

impl HubError {
    /// Build a `DeliveryPanicked` from a caught panic payload.
    pub(crate) fn from_panic(subscription: u64, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        HubError::DeliveryPanicked {
            subscription,
            message,
        }
    }
}

/// Result type for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;
