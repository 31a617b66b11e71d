//! Error types used by the registry, the event buses and the config store.
//!
//! - [`ServiceError`] - failures raised by service methods and by the registry
//!   while driving a startup cycle.
//! - [`StoreError`] - failures raised by the [`ConfigStore`](crate::ConfigStore).
//!
//! Both types provide `as_label` (stable snake_case, for logs) and `as_message`.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced by services and the registry.
///
/// `ServiceError` is `Clone` so that a settled startup result can be handed to
/// every caller of [`ServiceObject::wait_started`](crate::ServiceObject::wait_started).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A method implementation failed (synchronously or through its future).
    #[error("method failed: {reason}")]
    Failed {
        /// Human-readable failure message.
        reason: Arc<str>,
    },

    /// `call` was asked for a method that was never assigned.
    #[error("method {method:?} not implemented on service {service}")]
    UnknownMethod {
        /// Service name, or `<unnamed service>`.
        service: Arc<str>,
        /// The missing method.
        method: Arc<str>,
    },

    /// `wait_started` was called on a service that never joined a start cycle.
    #[error("service {service} has not been started")]
    NotStarted {
        /// Service name, or `<unnamed service>`.
        service: Arc<str>,
    },

    /// A service's `start` did not settle within the configured timeout.
    #[error("service {service} did not start within {timeout:?}")]
    StartTimeout {
        /// Service name.
        service: Arc<str>,
        /// The configured start timeout.
        timeout: Duration,
    },

    /// The deferred was dropped before anyone settled it.
    #[error("deferred dropped before it was settled")]
    Abandoned,
}

impl ServiceError {
    /// Shorthand for [`ServiceError::Failed`].
    ///
    /// # Example
    /// ```
    /// use registrar::ServiceError;
    ///
    /// let err = ServiceError::failed("socket closed");
    /// assert_eq!(err.to_string(), "method failed: socket closed");
    /// ```
    pub fn failed(reason: impl Into<Arc<str>>) -> Self {
        ServiceError::Failed {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Failed { .. } => "service_failed",
            ServiceError::UnknownMethod { .. } => "service_unknown_method",
            ServiceError::NotStarted { .. } => "service_not_started",
            ServiceError::StartTimeout { .. } => "service_start_timeout",
            ServiceError::Abandoned => "deferred_abandoned",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ServiceError::Failed { reason } => format!("failed: {reason}"),
            ServiceError::UnknownMethod { service, method } => {
                format!("unknown method: {service}.{method}")
            }
            ServiceError::NotStarted { service } => format!("not started: {service}"),
            ServiceError::StartTimeout { service, timeout } => {
                format!("start timeout: {service} after {timeout:?}")
            }
            ServiceError::Abandoned => "abandoned".to_string(),
        }
    }
}

/// # Errors produced by the config store.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// Only JSON objects can be merged into the store.
    #[error("only objects can be added to a config store (got {kind})")]
    NotAnObject {
        /// JSON kind of the rejected value.
        kind: &'static str,
    },

    /// The value at `key` could not be deserialized into the requested type.
    #[error("config key {key:?} has an unexpected shape: {source}")]
    Decode {
        /// Dotted key that was read.
        key: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::NotAnObject { .. } => "store_not_an_object",
            StoreError::Decode { .. } => "store_decode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(ServiceError::failed("x").as_label(), "service_failed");
        assert_eq!(ServiceError::Abandoned.as_label(), "deferred_abandoned");
        let timeout = ServiceError::StartTimeout {
            service: "db".into(),
            timeout: Duration::from_millis(5),
        };
        assert_eq!(timeout.as_label(), "service_start_timeout");
        assert_eq!(timeout.as_message(), "start timeout: db after 5ms");
    }

    #[test]
    fn store_error_label() {
        let err = StoreError::NotAnObject { kind: "array" };
        assert_eq!(err.as_label(), "store_not_an_object");
        assert!(err.to_string().contains("array"));
    }
}
