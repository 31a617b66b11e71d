//! # Externally settleable future.
//!
//! A [`Deferred`] lets one party create a pending result and another observe
//! it. The observing side is a [`Promise`]: cloneable, awaitable any number of
//! times, and every clone yields the same settled outcome.
//!
//! ## Rules
//! - Settles **at most once**: the first `resolve`/`reject` wins, later calls are no-ops.
//! - Dropping every `Deferred` handle before settling rejects with
//!   [`ServiceError::Abandoned`].
//!
//! ## Example
//! ```rust
//! use registrar::Deferred;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let deferred = Deferred::new();
//! let promise = deferred.promise();
//!
//! deferred.resolve(Some(json!("ok")));
//! deferred.reject(registrar::ServiceError::failed("ignored"));
//!
//! assert_eq!(promise.await.unwrap(), Some(json!("ok")));
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::Shared;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::ServiceError;
use crate::eventbus::{BoxCallFuture, CallResult};

/// Observable side of a [`Deferred`].
#[derive(Clone)]
pub struct Promise {
    inner: Shared<BoxCallFuture>,
}

impl Promise {
    /// Returns the outcome if the promise has already settled and been polled.
    pub fn peek(&self) -> Option<CallResult> {
        self.inner.peek().cloned()
    }
}

impl Future for Promise {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.peek())
            .finish()
    }
}

/// Externally resolvable/rejectable future.
///
/// Cheap to clone; all clones settle the same promise.
#[derive(Clone)]
pub struct Deferred {
    tx: Arc<Mutex<Option<oneshot::Sender<CallResult>>>>,
    promise: Promise,
}

impl Deferred {
    /// Creates a pending deferred.
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel::<CallResult>();
        let fut: BoxCallFuture = async move {
            match rx.await {
                Ok(result) => result,
                Err(_closed) => Err(ServiceError::Abandoned),
            }
        }
        .boxed();

        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            promise: Promise { inner: fut.shared() },
        }
    }

    /// Returns the observable side.
    pub fn promise(&self) -> Promise {
        self.promise.clone()
    }

    /// Fulfills the promise; no-op when already settled.
    pub fn resolve(&self, value: Option<Value>) {
        self.settle(Ok(value));
    }

    /// Rejects the promise; no-op when already settled.
    pub fn reject(&self, error: ServiceError) {
        self.settle(Err(error));
    }

    /// Settles with `result`; no-op when already settled.
    pub fn settle(&self, result: CallResult) {
        if let Some(tx) = self.tx.lock().take() {
            let _ = tx.send(result);
        }
    }

    /// Returns `true` once `resolve`/`reject`/`settle` has been called.
    pub fn is_settled(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("settled", &self.is_settled())
            .finish()
    }
}
