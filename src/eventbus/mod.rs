//! In-process event dispatch: the namespaced bus and its reply type.
//!
//! ## Contents
//! - [`EventBus`], [`ListenerId`] listener table and `fire`
//! - [`Reply`], [`Listener`] value-or-future union and callback type
//! - [`Eventable`], [`make_eventable`] delegated access for host types
//!
//! This bus is synchronous at dispatch time: listeners run on the caller's
//! stack and only their returned futures are deferred. It is unrelated to the
//! lifecycle broadcast channel in `events`.

mod bus;
mod eventable;
mod reply;

pub(crate) use bus::Settle;
pub use bus::{EventBus, ListenerId};
pub use eventable::{Eventable, make_eventable};
pub use reply::{BoxCallFuture, CallResult, Listener, Reply, listener};
