//! # Replies: the value-or-future union returned by listeners and by `fire`.
//!
//! A listener may answer synchronously ([`Reply::Value`]) or hand back work
//! still in flight ([`Reply::Pending`]). [`EventBus::fire`](crate::EventBus::fire)
//! returns the same union: a plain value when every listener answered
//! synchronously, a future otherwise.
//!
//! `None` stands for "no result" (JavaScript's `undefined`). `Some(Value::Null)`
//! is a defined result and wins precedence like any other value.
//!
//! `Reply` implements [`IntoFuture`], so callers that always `.await` are safe
//! whichever variant they get.
//!
//! ## Example
//! ```rust
//! use registrar::{Reply, listener};
//! use serde_json::json;
//!
//! let sync = listener(|_args| Ok(Reply::value(5)));
//! let lazy = listener(|_args| Ok(Reply::pending(async { Ok(Some(json!(7))) })));
//!
//! assert!(!sync(&[]).unwrap().is_pending());
//! assert!(lazy(&[]).unwrap().is_pending());
//! ```

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde_json::Value;

use crate::error::ServiceError;

/// Outcome of a settled call: a value (or none), or the failure.
pub type CallResult = Result<Option<Value>, ServiceError>;

/// Boxed future resolving to a [`CallResult`].
pub type BoxCallFuture = BoxFuture<'static, CallResult>;

/// A method implementation / event listener.
///
/// Returning `Err` models a synchronous failure: it aborts the `fire` in
/// progress and propagates to its caller.
pub type Listener = Arc<dyn Fn(&[Value]) -> Result<Reply, ServiceError> + Send + Sync>;

/// Wraps a closure into a shareable [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&[Value]) -> Result<Reply, ServiceError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Value-or-future union.
pub enum Reply {
    /// Synchronous answer; `None` means no result.
    Value(Option<Value>),
    /// Asynchronous answer.
    Pending(BoxCallFuture),
}

impl Reply {
    /// A synchronous reply with no result.
    #[inline]
    pub fn none() -> Self {
        Reply::Value(None)
    }

    /// A synchronous reply carrying `v`.
    #[inline]
    pub fn value(v: impl Into<Value>) -> Self {
        Reply::Value(Some(v.into()))
    }

    /// An asynchronous reply.
    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = CallResult> + Send + 'static,
    {
        Reply::Pending(fut.boxed())
    }

    /// Returns `true` for [`Reply::Pending`].
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Reply::Pending(_))
    }

    /// Returns the synchronous value, or `None` when the reply is pending.
    ///
    /// The outer `Option` distinguishes "pending" from "no result".
    pub fn ready(self) -> Option<Option<Value>> {
        match self {
            Reply::Value(v) => Some(v),
            Reply::Pending(_) => None,
        }
    }
}

impl IntoFuture for Reply {
    type Output = CallResult;
    type IntoFuture = BoxCallFuture;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Reply::Value(v) => future::ready(Ok(v)).boxed(),
            Reply::Pending(fut) => fut,
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Reply::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        Reply::Value(Some(v))
    }
}

impl From<Option<Value>> for Reply {
    fn from(v: Option<Value>) -> Self {
        Reply::Value(v)
    }
}
