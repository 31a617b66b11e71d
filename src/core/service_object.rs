//! # ServiceObject: a named event bus with method slots.
//!
//! Every service is represented by a [`ServiceObject`]. It is an [`EventBus`]
//! (in the `service:` namespace by default) plus a table of *method slots*:
//!
//! ```text
//! call(name, args)
//!   ├─ Slot::Direct(f) → f(args)                  (one implementation, fast path)
//!   └─ Slot::ViaBus    → invoke(name, args)       (fan-out to every listener)
//! ```
//!
//! ## Binding rules
//! - `implement` assigns a slot **and** registers the same function as a
//!   listener, so both paths reach the implementation.
//! - While the object is *bound*, or no listener exists yet for the name,
//!   `assign_method` installs a direct slot (a later assignment replaces it).
//! - Once unbound, a name that already has listeners gets a `ViaBus` slot.
//! - `unbind` is permanent: every assigned method is rewritten to `ViaBus`.
//!
//! Invariant: every name in `methods()` has exactly one slot.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::config::SERVICE_PREFIX;
use crate::core::deferred::Promise;
use crate::error::ServiceError;
use crate::eventbus::{CallResult, EventBus, Eventable, Listener, Reply, Settle};

/// Label used in logs and errors for anonymous services.
pub(crate) const UNNAMED: &str = "<unnamed service>";

/// Call target of a method name.
#[derive(Clone)]
enum Slot {
    /// Call the implementation directly.
    Direct(Listener),
    /// Fire the method's event and aggregate every listener.
    ViaBus,
}

struct MethodTable {
    bound: bool,
    methods: Vec<String>,
    slots: HashMap<String, Slot>,
}

/// Named event bus with direct/fan-out method slots and declared requirements.
pub struct ServiceObject {
    name: Option<String>,
    bus: EventBus,
    table: RwLock<MethodTable>,
    required: RwLock<IndexSet<String>>,
    started: Mutex<Option<Promise>>,
}

impl ServiceObject {
    /// Creates a service object in the default `service:` namespace.
    pub fn new(name: Option<&str>) -> Self {
        Self::with_prefix(name, SERVICE_PREFIX)
    }

    /// Creates a service object whose events use `prefix`.
    pub fn with_prefix(name: Option<&str>, prefix: &str) -> Self {
        Self {
            name: name.map(str::to_string),
            bus: EventBus::new(prefix),
            table: RwLock::new(MethodTable {
                bound: true,
                methods: Vec::new(),
                slots: HashMap::new(),
            }),
            required: RwLock::new(IndexSet::new()),
            started: Mutex::new(None),
        }
    }

    /// Registry key, if the object is named.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED)
    }

    /// Whether direct slots may still be installed.
    pub fn is_bound(&self) -> bool {
        self.table.read().bound
    }

    /// Every method name ever assigned, in assignment order.
    pub fn methods(&self) -> Vec<String> {
        self.table.read().methods.clone()
    }

    /// Returns `true` if `name` has a slot.
    pub fn has_method(&self, name: &str) -> bool {
        self.table.read().slots.contains_key(name)
    }

    /// Returns `true` if `name` is currently served by a direct slot.
    pub fn is_direct(&self, name: &str) -> bool {
        matches!(self.table.read().slots.get(name), Some(Slot::Direct(_)))
    }

    /// Installs `method` under `name`.
    ///
    /// Direct when the object is bound or nothing listens for `name` yet,
    /// otherwise a fan-out slot so existing listeners are not shadowed.
    pub fn assign_method(&self, name: &str, method: Listener) {
        let has_listeners = self.bus.has_listeners(name);
        let mut table = self.table.write();

        let slot = if table.bound || !has_listeners {
            Slot::Direct(method)
        } else {
            Slot::ViaBus
        };
        table.slots.insert(name.to_string(), slot);
        table.methods.push(name.to_string());
    }

    /// Routes `name` through the event bus.
    pub fn unbind_method(&self, name: &str) {
        self.table
            .write()
            .slots
            .insert(name.to_string(), Slot::ViaBus);
    }

    /// Permanently disables direct slots and rewrites every assigned method.
    pub fn unbind(&self) {
        let mut table = self.table.write();
        table.bound = false;

        let MethodTable { methods, slots, .. } = &mut *table;
        for name in methods.iter() {
            slots.insert(name.clone(), Slot::ViaBus);
        }
    }

    /// Assigns every `(name, implementation)` pair and registers each
    /// implementation as a listener for its name.
    pub fn implement<I, S>(&self, methods: I)
    where
        I: IntoIterator<Item = (S, Listener)>,
        S: AsRef<str>,
    {
        for (name, method) in methods {
            let name = name.as_ref();
            self.assign_method(name, method.clone());
            self.bus.listen_with(name, method);
        }
    }

    /// Fires `name` as an event; the method-call reading of [`EventBus::fire`].
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Reply, ServiceError> {
        self.bus.fire(name, args)
    }

    /// Like [`ServiceObject::invoke`], but the pending aggregate rejects with the
    /// first listener rejection instead of swallowing it.
    pub(crate) fn invoke_strict(&self, name: &str, args: &[Value]) -> Result<Reply, ServiceError> {
        self.bus.fire_with(name, args, Settle::Strict)
    }

    /// Calls the method slot for `name`.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Reply, ServiceError> {
        let slot = self.table.read().slots.get(name).cloned();
        match slot {
            Some(Slot::Direct(method)) => method(args),
            Some(Slot::ViaBus) => self.invoke(name, args),
            None => Err(ServiceError::UnknownMethod {
                service: self.label().into(),
                method: name.into(),
            }),
        }
    }

    /// Declares services this one depends on; duplicates are ignored.
    pub fn require<I, S>(&self, services: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required
            .write()
            .extend(services.into_iter().map(Into::into));
    }

    /// Declared requirements, in first-declaration order.
    pub fn required(&self) -> Vec<String> {
        self.required.read().iter().cloned().collect()
    }

    /// Awaits this service's `start` from the most recent start cycle.
    ///
    /// The promise is captured when this method is called; a later cycle does
    /// not affect a wait already in progress.
    pub async fn wait_started(&self) -> CallResult {
        let promise = self.started_promise().ok_or_else(|| ServiceError::NotStarted {
            service: self.label().into(),
        })?;
        promise.await
    }

    /// The startup promise of the most recent cycle, if any.
    pub fn started_promise(&self) -> Option<Promise> {
        self.started.lock().clone()
    }

    pub(crate) fn set_started(&self, promise: Promise) {
        *self.started.lock() = Some(promise);
    }
}

impl Eventable for ServiceObject {
    fn event_bus(&self) -> &EventBus {
        &self.bus
    }
}

impl fmt::Debug for ServiceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.read();
        f.debug_struct("ServiceObject")
            .field("name", &self.name)
            .field("bound", &table.bound)
            .field("methods", &table.methods)
            .field("required", &*self.required.read())
            .finish()
    }
}

/// Shared handle to a service object.
pub type ServiceRef = Arc<ServiceObject>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventbus::listener;
    use serde_json::json;

    fn constant(v: i64) -> Listener {
        listener(move |_| Ok(Reply::value(v)))
    }

    #[test]
    fn implement_binds_directly_and_listens() {
        let svc = ServiceObject::new(Some("math"));
        svc.implement([("answer", constant(42))]);

        assert!(svc.is_direct("answer"));
        assert_eq!(svc.listener_count_for("answer"), 1);
        assert_eq!(svc.call("answer", &[]).unwrap().ready(), Some(Some(json!(42))));
        assert_eq!(svc.invoke("answer", &[]).unwrap().ready(), Some(Some(json!(42))));
    }

    #[test]
    fn bound_reassignment_replaces_direct_slot_but_keeps_listeners() {
        let svc = ServiceObject::new(Some("s"));
        svc.implement([("v", constant(1))]);
        svc.implement([("v", constant(2))]);

        assert_eq!(svc.call("v", &[]).unwrap().ready(), Some(Some(json!(2))));
        // the event path still reaches both, first result wins
        assert_eq!(svc.invoke("v", &[]).unwrap().ready(), Some(Some(json!(1))));
        assert_eq!(svc.methods(), vec!["v".to_string(), "v".to_string()]);
    }

    #[test]
    fn unbind_routes_every_method_through_the_bus() {
        let svc = ServiceObject::new(None);
        svc.implement([("a", constant(1)), ("b", constant(2))]);
        svc.unbind();

        assert!(!svc.is_bound());
        assert!(!svc.is_direct("a"));
        assert!(!svc.is_direct("b"));
        assert_eq!(svc.call("b", &[]).unwrap().ready(), Some(Some(json!(2))));
    }

    #[test]
    fn unbound_object_fans_out_when_listeners_exist() {
        let svc = ServiceObject::new(Some("s"));
        svc.unbind();

        svc.implement([("first", constant(1))]);
        assert!(svc.is_direct("first"), "no listener yet, direct is allowed");

        svc.implement([("first", constant(2))]);
        assert!(!svc.is_direct("first"));
        assert_eq!(svc.call("first", &[]).unwrap().ready(), Some(Some(json!(1))));
    }

    #[test]
    fn unbind_method_is_unconditional() {
        let svc = ServiceObject::new(Some("s"));
        svc.implement([("x", constant(3))]);
        svc.unbind_method("x");
        svc.unbind_method("never-assigned");

        assert!(svc.is_bound());
        assert!(!svc.is_direct("x"));
        assert_eq!(svc.call("never-assigned", &[]).unwrap().ready(), Some(None));
    }

    #[test]
    fn unknown_method_is_an_error() {
        let svc = ServiceObject::new(None);
        let err = svc.call("missing", &[]).unwrap_err();
        assert_eq!(err.as_label(), "service_unknown_method");
        assert!(err.to_string().contains(UNNAMED));
    }

    #[test]
    fn require_deduplicates_and_keeps_order() {
        let svc = ServiceObject::new(Some("app"));
        svc.require(["db", "cache"]);
        svc.require(vec!["cache".to_string(), "auth".to_string()]);
        svc.require(["db"]);

        assert_eq!(svc.required(), vec!["db", "cache", "auth"]);
    }

    #[tokio::test]
    async fn wait_started_before_any_cycle_fails() {
        let svc = ServiceObject::new(Some("lonely"));
        let err = svc.wait_started().await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::NotStarted {
                service: "lonely".into()
            }
        );
    }

    impl ServiceObject {
        fn listener_count_for(&self, name: &str) -> usize {
            self.bus.listener_count(name)
        }
    }
}
