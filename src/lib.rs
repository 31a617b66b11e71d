//! # registrar
//!
//! **Registrar** coordinates loosely-coupled services living in one long-running
//! process. Services register under a name, discover each other through the
//! registry, declare which peers they require, and start up in a two-phase,
//! dependency-checked sequence.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ ServiceHost  │   │ ServiceHost  │   │ ServiceHost  │
//!     │  (user #1)   │   │  (user #2)   │   │  (user #3)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ implement        ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ServiceObject │   │ServiceObject │   │ServiceObject │
//!     │ EventBus +   │   │ EventBus +   │   │ EventBus +   │
//!     │ method slots │   │ method slots │   │ method slots │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            └──────────────────┼──────────────────┘
//!                               ▼ register / subscribe
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Registry                                                         │
//! │  - services (insertion ordered)                                   │
//! │  - deferreds (one per service while its start is in flight)       │
//! │  - own EventBus ("ready" with the cohort prefix)                  │
//! │  - lifecycle Bus (broadcast of registration/startup events)       │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! registry.start(prefix)
//!   ├─► check_requirements()  → prune services with missing peers (fixed point)
//!   ├─► invoke "start" on every service of the cohort (registration order)
//!   ├─► wait until every start settled (failures stay per service)
//!   ├─► invoke "ready" on every service of the cohort
//!   └─► registry fires "ready"(prefix)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types                                  |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Event bus**     | Namespaced listeners, value-or-future `fire` aggregation.     | [`EventBus`], [`Reply`], [`Eventable`]     |
//! | **Services**      | Direct method slots with fan-out fallback, requirements.      | [`ServiceObject`], [`Service`]             |
//! | **Registry**      | Discovery and two-phase, dependency-checked startup.          | [`Registry`], [`Deferred`]                 |
//! | **Observability** | Lifecycle events on a broadcast channel, `tracing` logs.      | [`Event`], [`EventKind`]                   |
//! | **Errors**        | Typed errors with stable labels.                              | [`ServiceError`], [`StoreError`]           |
//! | **Configuration** | Registry settings and a deep-merged JSON settings store.      | [`Config`], [`ConfigStore`]                |
//!
//! ## Example
//! ```rust
//! use registrar::{Config, Registry, Reply, listener};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let registry = Registry::new(Config::default());
//!
//!     let db = registry.create_service_object(Some("db"));
//!     db.implement([(
//!         "start",
//!         listener(|_| Ok(Reply::pending(async { Ok(Some(json!("connected"))) }))),
//!     )]);
//!     registry.register("db", db.clone());
//!
//!     let api = registry.create_service_object(Some("api"));
//!     api.require(["db"]);
//!     registry.register("api", api);
//!
//!     registry.start("").await;
//!     assert_eq!(db.wait_started().await.unwrap(), Some(json!("connected")));
//! }
//! ```
mod config;
mod core;
mod error;
mod eventbus;
mod events;
mod store;

// ---- Public re-exports ----

pub use config::{Config, EVENTABLE_PREFIX, SERVICE_PREFIX};
pub use crate::core::{
    Deferred, Promise, Registry, Service, ServiceHost, ServiceObject, ServiceRef,
};
pub use error::{ServiceError, StoreError};
pub use eventbus::{
    BoxCallFuture, CallResult, EventBus, Eventable, Listener, ListenerId, Reply, listener,
    make_eventable,
};
pub use events::{Event, EventKind};
pub use store::ConfigStore;

/// JSON value used for method arguments and results.
pub use serde_json::Value;
