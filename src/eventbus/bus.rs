//! # Namespaced publish/subscribe bus.
//!
//! [`EventBus`] keeps, per event name, an ordered list of listeners. Every name
//! is stored with the bus prefix prepended, so unrelated buses never collide.
//!
//! ## Fire semantics
//! ```text
//! fire(event, args)
//!   ├─► call every listener in registration order (synchronously)
//!   │     ├─ Value(Some(v)) → first_result = v  (only the first one counts)
//!   │     ├─ Value(None)    → ignored
//!   │     ├─ Pending(fut)   → pushed to `pending`
//!   │     └─ Err(e)         → abort, return Err(e)
//!   ├─ pending empty → Reply::Value(first_result)
//!   └─ otherwise     → Reply::Pending(join_all(pending))
//!                         ├─ rejections: warn!, never abort the aggregate
//!                         └─ first_result, else first fulfilled defined value
//! ```
//!
//! ## Rules
//! - Registration order is the only ordering guarantee.
//! - The listener table is snapshotted before listeners run, so listeners may
//!   `listen`/`unlisten`/`fire` on the same bus.
//! - `fire` on an event without listeners returns `Reply::Value(None)`.

use std::collections::HashMap;
use std::fmt;

use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use super::reply::{BoxCallFuture, CallResult, Listener, Reply, listener};
use crate::error::ServiceError;

/// Opaque token returned by [`EventBus::listen`], used only for removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Entry {
    id: ListenerId,
    callback: Listener,
}

/// How pending listener outcomes are folded into the aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Settle {
    /// Rejections are reported and skipped; the aggregate always fulfills.
    Lenient,
    /// Rejections are reported; the aggregate rejects with the first one
    /// (in registration order) after everything has settled.
    Strict,
}

/// Namespaced publish/subscribe bus.
pub struct EventBus {
    prefix: String,
    listeners: RwLock<HashMap<String, Vec<Entry>>>,
}

impl EventBus {
    /// Creates a bus whose event names are all prefixed with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the namespace prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn qualify(&self, event: &str) -> String {
        format!("{}{}", self.prefix, event)
    }

    /// Registers `callback` for `event` and returns its removal token.
    pub fn listen<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&[Value]) -> Result<Reply, ServiceError> + Send + Sync + 'static,
    {
        self.listen_with(event, listener(callback))
    }

    /// Registers an already shared [`Listener`].
    pub fn listen_with(&self, event: &str, callback: Listener) -> ListenerId {
        let id = ListenerId::generate();
        self.listeners
            .write()
            .entry(self.qualify(event))
            .or_default()
            .push(Entry { id, callback });
        id
    }

    /// Removes the listener registered under `id`; no-op if absent.
    pub fn unlisten(&self, event: &str, id: ListenerId) {
        let mut listeners = self.listeners.write();
        if let Some(entries) = listeners.get_mut(&self.qualify(event)) {
            if let Some(index) = entries.iter().position(|e| e.id == id) {
                entries.remove(index);
            }
        }
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .get(&self.qualify(event))
            .map_or(0, Vec::len)
    }

    /// Returns `true` if at least one listener is registered for `event`.
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }

    /// Fires `event`, calling every listener in registration order.
    ///
    /// Returns a plain [`Reply::Value`] when no listener answered with a future,
    /// otherwise a [`Reply::Pending`] that settles once all futures have
    /// settled. A synchronous listener error aborts the fire and is returned.
    pub fn fire(&self, event: &str, args: &[Value]) -> Result<Reply, ServiceError> {
        self.fire_with(event, args, Settle::Lenient)
    }

    /// Always-awaitable form of [`EventBus::fire`].
    pub async fn fire_async(&self, event: &str, args: &[Value]) -> CallResult {
        self.fire(event, args)?.await
    }

    pub(crate) fn fire_with(
        &self,
        event: &str,
        args: &[Value],
        settle: Settle,
    ) -> Result<Reply, ServiceError> {
        let name = self.qualify(event);
        let callbacks: Vec<Listener> = match self.listeners.read().get(&name) {
            Some(entries) => entries.iter().map(|e| e.callback.clone()).collect(),
            None => return Ok(Reply::Value(None)),
        };

        let mut first_result: Option<Value> = None;
        let mut pending: Vec<BoxCallFuture> = Vec::new();

        for callback in callbacks {
            match callback(args)? {
                Reply::Value(v) => {
                    if first_result.is_none() {
                        first_result = v;
                    }
                }
                Reply::Pending(fut) => pending.push(fut),
            }
        }

        if pending.is_empty() {
            return Ok(Reply::Value(first_result));
        }

        Ok(Reply::pending(async move {
            let results = join_all(pending).await;

            let mut found: Option<Value> = None;
            let mut first_error: Option<ServiceError> = None;
            for result in results {
                match result {
                    Ok(v) => {
                        if found.is_none() {
                            found = v;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(event = %name, error = %e, "listener rejected");
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }

            match (settle, first_error) {
                (Settle::Strict, Some(e)) => Err(e),
                _ => Ok(first_result.or(found)),
            }
        }))
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        f.debug_struct("EventBus")
            .field("prefix", &self.prefix)
            .field("events", &listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn rejected(reason: &'static str) -> Reply {
        Reply::pending(async move { Err(ServiceError::failed(reason)) })
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let bus = EventBus::new("test:");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = seen.clone();
            bus.listen("tick", move |_| {
                seen.lock().push(tag);
                Ok(Reply::none())
            });
        }

        bus.fire("tick", &[]).unwrap();
        assert_eq!(*seen.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn args_are_passed_through() {
        let bus = EventBus::new("");
        bus.listen("add", |args| {
            let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
            Ok(Reply::value(sum))
        });

        let reply = bus.fire("add", &[json!(2), json!(3)]).unwrap();
        assert_eq!(reply.ready(), Some(Some(json!(5))));
    }

    #[test]
    fn no_listeners_yields_plain_none() {
        let bus = EventBus::new("x:");
        let reply = bus.fire("nothing", &[]).unwrap();
        assert_eq!(reply.ready(), Some(None));
    }

    #[test]
    fn sync_only_returns_first_defined_value() {
        let bus = EventBus::new("");
        bus.listen("q", |_| Ok(Reply::none()));
        bus.listen("q", |_| Ok(Reply::value(5)));
        bus.listen("q", |_| Ok(Reply::value(6)));

        let reply = bus.fire("q", &[]).unwrap();
        assert!(!reply.is_pending());
        assert_eq!(reply.ready(), Some(Some(json!(5))));
    }

    #[test]
    fn null_counts_as_defined() {
        let bus = EventBus::new("");
        bus.listen("q", |_| Ok(Reply::Value(Some(Value::Null))));
        bus.listen("q", |_| Ok(Reply::value(1)));

        assert_eq!(bus.fire("q", &[]).unwrap().ready(), Some(Some(Value::Null)));
    }

    #[tokio::test]
    async fn sync_result_wins_over_async() {
        let bus = EventBus::new("");
        bus.listen("q", |_| Ok(Reply::none()));
        bus.listen("q", |_| Ok(Reply::value(5)));
        bus.listen("q", |_| Ok(Reply::pending(async { Ok(Some(json!(7))) })));

        let reply = bus.fire("q", &[]).unwrap();
        assert!(reply.is_pending());
        assert_eq!(reply.await.unwrap(), Some(json!(5)));
    }

    #[tokio::test]
    async fn async_result_used_when_no_sync_value() {
        let bus = EventBus::new("");
        bus.listen("q", |_| Ok(Reply::none()));
        bus.listen("q", |_| Ok(Reply::pending(async { Ok(None) })));
        bus.listen("q", |_| Ok(Reply::pending(async { Ok(Some(json!("late"))) })));

        assert_eq!(bus.fire_async("q", &[]).await.unwrap(), Some(json!("late")));
    }

    #[tokio::test]
    async fn rejected_listener_does_not_block_aggregate() {
        let bus = EventBus::new("");
        bus.listen("q", |_| Ok(rejected("boom")));
        bus.listen("q", |_| Ok(Reply::pending(async { Ok(Some(json!(9))) })));

        let reply = bus.fire("q", &[]).unwrap();
        assert_eq!(reply.await.unwrap(), Some(json!(9)));
    }

    #[tokio::test]
    async fn strict_settle_reports_first_rejection() {
        let bus = EventBus::new("");
        bus.listen("q", |_| Ok(Reply::pending(async { Ok(Some(json!(1))) })));
        bus.listen("q", |_| Ok(rejected("first")));
        bus.listen("q", |_| Ok(rejected("second")));

        let reply = bus.fire_with("q", &[], Settle::Strict).unwrap();
        assert_eq!(reply.await, Err(ServiceError::failed("first")));
    }

    #[test]
    fn sync_error_aborts_fire() {
        let bus = EventBus::new("");
        let later = Arc::new(Mutex::new(false));

        bus.listen("q", |_| Err(ServiceError::failed("sync")));
        let flag = later.clone();
        bus.listen("q", move |_| {
            *flag.lock() = true;
            Ok(Reply::none())
        });

        assert_eq!(bus.fire("q", &[]).unwrap_err(), ServiceError::failed("sync"));
        assert!(!*later.lock());
    }

    #[test]
    fn unlisten_removes_only_matching_listener() {
        let bus = EventBus::new("p:");
        let a = bus.listen("e", |_| Ok(Reply::value("a")));
        bus.listen("e", |_| Ok(Reply::value("b")));
        assert_eq!(bus.listener_count("e"), 2);

        bus.unlisten("e", a);
        bus.unlisten("e", a);
        bus.unlisten("missing", a);

        assert_eq!(bus.listener_count("e"), 1);
        assert_eq!(bus.fire("e", &[]).unwrap().ready(), Some(Some(json!("b"))));
    }

    #[test]
    fn prefixes_isolate_buses() {
        let bus = EventBus::new("one:");
        bus.listen("e", |_| Ok(Reply::value(1)));
        assert!(bus.has_listeners("e"));
        assert!(!bus.has_listeners("one:e"));
    }

    #[test]
    fn listener_may_reenter_the_bus() {
        let bus = Arc::new(EventBus::new(""));
        let inner = bus.clone();
        bus.listen("outer", move |_| {
            inner.listen("inner", |_| Ok(Reply::value("nested")));
            inner.fire("inner", &[])
        });

        assert_eq!(
            bus.fire("outer", &[]).unwrap().ready(),
            Some(Some(json!("nested")))
        );
    }
}
