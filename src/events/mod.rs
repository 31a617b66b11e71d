//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** the registry
//! uses to report what happens during registration and startup cycles.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publisher**: `Registry` (register/unregister, pruning, start cycles).
//! - **Consumers**: anything holding a receiver from `Registry::lifecycle()`.

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};
