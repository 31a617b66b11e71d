//! # Delegated event access.
//!
//! Types that own an [`EventBus`] implement [`Eventable`] to expose
//! `listen`/`unlisten`/`fire` as their own methods, without inheriting from the
//! bus. [`make_eventable`] builds a bus in the `eventable:` namespace for hosts
//! that want to be observable.
//!
//! ## Example
//! ```rust
//! use registrar::{EventBus, Eventable, Reply, make_eventable};
//!
//! struct Clock {
//!     events: EventBus,
//! }
//!
//! impl Eventable for Clock {
//!     fn event_bus(&self) -> &EventBus {
//!         &self.events
//!     }
//! }
//!
//! let clock = Clock { events: make_eventable() };
//! clock.listen("tick", |_| Ok(Reply::value("tock")));
//! assert_eq!(clock.fire("tick", &[]).unwrap().ready(), Some(Some("tock".into())));
//! ```

use std::future::Future;

use serde_json::Value;

use super::bus::{EventBus, ListenerId};
use super::reply::{CallResult, Listener, Reply};
use crate::config::EVENTABLE_PREFIX;
use crate::error::ServiceError;

/// Builds a bus in the `eventable:` namespace.
pub fn make_eventable() -> EventBus {
    EventBus::new(EVENTABLE_PREFIX)
}

/// Delegates event operations to an owned [`EventBus`].
pub trait Eventable {
    /// The bus every delegated call operates on.
    fn event_bus(&self) -> &EventBus;

    /// See [`EventBus::listen`].
    fn listen<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&[Value]) -> Result<Reply, ServiceError> + Send + Sync + 'static,
    {
        self.event_bus().listen(event, callback)
    }

    /// See [`EventBus::listen_with`].
    fn listen_with(&self, event: &str, callback: Listener) -> ListenerId {
        self.event_bus().listen_with(event, callback)
    }

    /// See [`EventBus::unlisten`].
    fn unlisten(&self, event: &str, id: ListenerId) {
        self.event_bus().unlisten(event, id)
    }

    /// See [`EventBus::fire`].
    fn fire(&self, event: &str, args: &[Value]) -> Result<Reply, ServiceError> {
        self.event_bus().fire(event, args)
    }

    /// See [`EventBus::fire_async`].
    fn fire_async(
        &self,
        event: &str,
        args: &[Value],
    ) -> impl Future<Output = CallResult> + Send {
        self.event_bus().fire_async(event, args)
    }
}

impl Eventable for EventBus {
    fn event_bus(&self) -> &EventBus {
        self
    }
}
