//! # Service registry - discovery and two-phase startup.
//!
//! The registry holds every named [`ServiceObject`], validates the
//! requirements services declare on each other, and drives startup cohorts.
//!
//! ## Startup cycle
//! ```text
//! start(prefix)
//!   ├─► check_requirements()            (fixed point; prunes missing-dependency services)
//!   ├─► cohort = names starting with prefix, in registration order
//!   ├─► for each service:
//!   │     ├─ fresh Deferred → deferreds[name], service.wait_started()
//!   │     └─ invoke("start")            (synchronously, in cohort order)
//!   ├─► join_all(settle_start(..))      (never short-circuits)
//!   ├─► for each service: invoke("ready")
//!   └─► fire own "ready" event with prefix
//! ```
//!
//! ## Rules
//! - No service sees `ready` before every `start` in its cohort has settled.
//! - A failing `start` rejects only that service's deferred; the cohort continues.
//! - `start(prefix)` itself never fails.
//! - Overlapping `start` calls on the same services replace each other's
//!   deferreds; an entry is removed only by the cycle that created it.
//! - The `ready` phase looks every cohort name up again: a service
//!   unregistered mid-cycle gets no `ready`, a replaced one reaches the new object.
//! - Dropping the `start` future clears its deferreds; waiters see
//!   [`ServiceError::Abandoned`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

use futures::future::join_all;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::core::deferred::Deferred;
use crate::core::service::{ServiceHost, bind_methods};
use crate::core::service_object::{ServiceObject, ServiceRef};
use crate::core::startup::settle_start;
use crate::error::ServiceError;
use crate::eventbus::{BoxCallFuture, EventBus, Eventable, Reply};
use crate::events::{Bus, Event, EventKind};

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

/// Registry of named service objects.
pub struct Registry {
    cfg: Config,
    services: RwLock<IndexMap<String, ServiceRef>>,
    /// Per-service startup deferreds, tagged with the cycle that created them.
    deferreds: Mutex<HashMap<String, (u64, Deferred)>>,
    cycles: AtomicU64,
    bus: EventBus,
    events: Bus,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new(cfg: Config) -> Arc<Self> {
        Arc::new(Self {
            bus: EventBus::new(cfg.eventable_prefix.clone()),
            events: Bus::new(cfg.events_capacity_clamped()),
            services: RwLock::new(IndexMap::new()),
            deferreds: Mutex::new(HashMap::new()),
            cycles: AtomicU64::new(0),
            cfg,
        })
    }

    /// The process-wide default registry, created on first use with
    /// [`Config::default`].
    pub fn global() -> Arc<Self> {
        GLOBAL.get_or_init(|| Registry::new(Config::default())).clone()
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Returns a receiver for lifecycle events published from now on.
    pub fn lifecycle(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Builds an unregistered service object in the configured namespace.
    pub fn create_service_object(&self, name: Option<&str>) -> ServiceRef {
        Arc::new(ServiceObject::with_prefix(name, &self.cfg.service_prefix))
    }

    /// Registers `service` under `name`; an existing entry is replaced in place.
    pub fn register(&self, name: &str, service: ServiceRef) {
        let replaced = self
            .services
            .write()
            .insert(name.to_string(), service)
            .is_some();
        if replaced {
            tracing::debug!(service = %name, "service replaced");
        }
        self.events
            .publish(Event::new(EventKind::ServiceRegistered).with_service(name));
    }

    /// Removes `name` from the registry. Existing handles stay usable.
    pub fn unregister(&self, name: &str) -> Option<ServiceRef> {
        let removed = self.services.write().shift_remove(name);
        if removed.is_some() {
            self.events
                .publish(Event::new(EventKind::ServiceUnregistered).with_service(name));
        }
        removed
    }

    /// Looks up a registered service.
    pub fn subscribe(&self, name: &str) -> Option<ServiceRef> {
        self.services.read().get(name).cloned()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }

    /// Names whose startup deferred belongs to a cycle still in progress.
    pub fn pending_starts(&self) -> Vec<String> {
        let mut names: Vec<String> = self.deferreds.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Creates a service object, registers it when named, and binds the listed
    /// methods of `host` onto it.
    pub fn make_service<H: ServiceHost>(
        &self,
        name: Option<&str>,
        host: &Arc<H>,
        methods: &[&str],
    ) -> ServiceRef {
        let service = self.create_service_object(name);
        if let Some(name) = name {
            self.register(name, service.clone());
        }
        service.implement(bind_methods(host, methods, name));
        service
    }

    /// Binds more methods of `host` onto the service registered as `name`.
    ///
    /// When no such service exists a new one is created but **not** registered.
    pub fn extend_service<H: ServiceHost>(
        &self,
        name: &str,
        host: &Arc<H>,
        methods: &[&str],
    ) -> ServiceRef {
        let service = self
            .subscribe(name)
            .unwrap_or_else(|| self.create_service_object(Some(name)));
        service.implement(bind_methods(host, methods, Some(name)));
        service
    }

    /// Invokes `method` on every listed service that is still registered.
    ///
    /// `on_result` sees each reply before it is collected; the returned vector
    /// holds the pending ones. A synchronous failure stops the walk and is returned.
    pub fn call_all<F>(
        &self,
        names: &[String],
        method: &str,
        args: &[Value],
        mut on_result: F,
    ) -> Result<Vec<BoxCallFuture>, ServiceError>
    where
        F: FnMut(&ServiceRef, &Reply),
    {
        let mut pending = Vec::new();
        for name in names {
            let Some(service) = self.subscribe(name) else {
                continue;
            };
            let reply = service.invoke(method, args)?;
            on_result(&service, &reply);
            if let Reply::Pending(fut) = reply {
                pending.push(fut);
            }
        }
        Ok(pending)
    }

    /// Removes every service with a missing requirement, repeating until a pass
    /// removes nothing. Returns the removed names in removal order.
    pub fn check_requirements(&self) -> Vec<String> {
        let mut removed = Vec::new();

        loop {
            let mut services = self.services.write();
            let mut to_remove: Vec<(String, Vec<String>)> = Vec::new();

            for (name, service) in services.iter() {
                let missing: Vec<String> = service
                    .required()
                    .into_iter()
                    .filter(|requirement| !services.contains_key(requirement))
                    .collect();
                if !missing.is_empty() {
                    to_remove.push((name.clone(), missing));
                }
            }

            if to_remove.is_empty() {
                break;
            }

            for (name, missing) in to_remove {
                services.shift_remove(&name);
                tracing::error!(
                    service = %name,
                    missing = ?missing,
                    "requirement missing, service removed"
                );
                self.events.publish(
                    Event::new(EventKind::ServicePruned)
                        .with_service(name.as_str())
                        .with_reason(missing.join(",")),
                );
                removed.push(name);
            }
        }

        removed
    }

    /// Runs a startup cycle for every service whose name starts with `prefix`
    /// (`""` selects all). Resolves once the registry has fired `ready`.
    pub async fn start(&self, prefix: &str) {
        self.check_requirements();

        let cohort: Vec<(String, ServiceRef)> = self
            .services
            .read()
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, service)| (name.clone(), service.clone()))
            .collect();
        let cycle = self.cycles.fetch_add(1, AtomicOrdering::Relaxed) + 1;
        let guard = CycleGuard {
            deferreds: &self.deferreds,
            cycle,
        };

        tracing::debug!(prefix, cycle, services = cohort.len(), "starting cohort");
        self.events
            .publish(Event::new(EventKind::CohortStarting).with_prefix(prefix));

        let mut starts = Vec::with_capacity(cohort.len());
        for (name, service) in &cohort {
            let deferred = Deferred::new();
            service.set_started(deferred.promise());
            self.deferreds
                .lock()
                .insert(name.clone(), (cycle, deferred.clone()));

            self.events
                .publish(Event::new(EventKind::ServiceStarting).with_service(name.as_str()));
            let outcome = service.invoke_strict("start", &[]);
            starts.push(settle_start(
                name.as_str().into(),
                outcome,
                deferred,
                self.cfg.start_timeout(),
                self.events.clone(),
            ));
        }
        join_all(starts).await;

        for (name, _) in &cohort {
            let Some(service) = self.subscribe(name) else {
                tracing::debug!(service = %name, "unregistered during start, ready skipped");
                continue;
            };
            match service.invoke("ready", &[]) {
                Ok(reply) => detach(name, "ready", reply),
                Err(e) => tracing::warn!(service = %name, error = %e, "ready failed"),
            }
            self.events
                .publish(Event::new(EventKind::ServiceReady).with_service(name.as_str()));
        }

        drop(guard);

        match self.bus.fire("ready", &[Value::from(prefix)]) {
            Ok(reply) => detach("registry", "ready", reply),
            Err(e) => tracing::warn!(prefix, error = %e, "registry ready listener failed"),
        }
        tracing::debug!(prefix, cycle, "cohort ready");
        self.events
            .publish(Event::new(EventKind::CohortReady).with_prefix(prefix));
    }
}

/// Removes the deferreds one cycle created, unless a newer cycle replaced them.
///
/// Runs on drop so a cancelled `start` does not leave waiters hanging.
struct CycleGuard<'a> {
    deferreds: &'a Mutex<HashMap<String, (u64, Deferred)>>,
    cycle: u64,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        let cycle = self.cycle;
        self.deferreds
            .lock()
            .retain(|_, (owner, _)| *owner != cycle);
    }
}

/// Lets a pending reply that nobody awaits run to completion on the ambient runtime.
fn detach(owner: &str, event: &str, reply: Reply) {
    let Reply::Pending(fut) = reply else {
        return;
    };
    let (owner, event) = (owner.to_string(), event.to_string());

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = fut.await {
                    tracing::warn!(service = %owner, event = %event, error = %e, "detached listener failed");
                }
            });
        }
        Err(_) => {
            tracing::warn!(service = %owner, event = %event, "no runtime to drive pending reply; dropped");
        }
    }
}

impl Eventable for Registry {
    fn event_bus(&self) -> &EventBus {
        &self.bus
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("services", &self.names())
            .field("pending_starts", &self.pending_starts())
            .finish()
    }
}
