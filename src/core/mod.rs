//! Registry core: service objects, deferreds and the startup protocol.
//!
//! Internal modules:
//! - [`deferred`]: externally settleable future observed through [`Promise`];
//! - [`service_object`]: named event bus with direct/fan-out method slots;
//! - [`service`]: host binding helper and the [`Service`] wrapper;
//! - [`startup`]: settles one service's `start` into its deferred (timeout, events);
//! - [`registry`]: discovery, requirement pruning and the two-phase `start`.

mod deferred;
mod registry;
mod service;
mod service_object;
mod startup;

pub use deferred::{Deferred, Promise};
pub use registry::Registry;
pub use service::{Service, ServiceHost};
pub use service_object::{ServiceObject, ServiceRef};
