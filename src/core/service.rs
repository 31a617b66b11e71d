//! # Service: convenience wrapper binding a host type to a service object.
//!
//! A host implements [`ServiceHost`] to expose its methods by name. [`Service`]
//! creates the [`ServiceObject`], registers it when named, and binds the
//! requested methods of the host onto it.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use registrar::{Config, Listener, Registry, Reply, Service, ServiceHost, listener};
//!
//! struct Greeter;
//!
//! impl ServiceHost for Greeter {
//!     fn method(self: Arc<Self>, name: &str) -> Option<Listener> {
//!         match name {
//!             "greet" => Some(listener(|_| Ok(Reply::value("hello")))),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let registry = Registry::new(Config::default());
//! let service = Service::new(Some("greeter"), &registry);
//! service.implement(&Arc::new(Greeter), &["greet", "wave"]); // "wave" is skipped with a warning
//!
//! let object = registry.subscribe("greeter").unwrap();
//! assert_eq!(object.call("greet", &[]).unwrap().ready(), Some(Some("hello".into())));
//! ```

use std::sync::Arc;

use crate::core::registry::Registry;
use crate::core::service_object::{ServiceObject, ServiceRef, UNNAMED};
use crate::eventbus::{EventBus, Eventable, Listener};

/// A type whose methods can be bound onto a service object by name.
pub trait ServiceHost: Send + Sync + 'static {
    /// Returns the implementation of `name`, or `None` if the host has no such method.
    fn method(self: Arc<Self>, name: &str) -> Option<Listener>;
}

/// Looks up every name on `host`; missing ones are skipped with a warning.
pub(crate) fn bind_methods<H: ServiceHost>(
    host: &Arc<H>,
    names: &[&str],
    service: Option<&str>,
) -> Vec<(String, Listener)> {
    names
        .iter()
        .filter_map(|name| match host.clone().method(name) {
            Some(method) => Some((name.to_string(), method)),
            None => {
                tracing::warn!(
                    method = %name,
                    service = service.unwrap_or(UNNAMED),
                    "method not implemented on service"
                );
                None
            }
        })
        .collect()
}

/// A service object owned by a host and registered with a registry.
#[derive(Debug, Clone)]
pub struct Service {
    object: ServiceRef,
    registry: Arc<Registry>,
}

impl Service {
    /// Creates the service object and registers it under `name` (anonymous
    /// services are not registered).
    pub fn new(name: Option<&str>, registry: &Arc<Registry>) -> Self {
        let object = registry.create_service_object(name);
        if let Some(name) = name {
            registry.register(name, object.clone());
        }
        Self {
            object,
            registry: registry.clone(),
        }
    }

    /// Same as [`Service::new`] against the process-wide [`Registry::global`].
    pub fn global(name: Option<&str>) -> Self {
        Self::new(name, &Registry::global())
    }

    /// Binds the listed methods of `host` onto the service object.
    pub fn implement<H: ServiceHost>(&self, host: &Arc<H>, names: &[&str]) {
        let methods = bind_methods(host, names, self.object.name());
        self.object.implement(methods);
    }

    /// Declares required peer services.
    pub fn require<I, S>(&self, services: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object.require(services);
    }

    /// Service name, if any.
    pub fn name(&self) -> Option<&str> {
        self.object.name()
    }

    /// The underlying service object.
    pub fn object(&self) -> &ServiceRef {
        &self.object
    }

    /// The registry this service was created against.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl Eventable for Service {
    fn event_bus(&self) -> &EventBus {
        self.object.event_bus()
    }
}

impl AsRef<ServiceObject> for Service {
    fn as_ref(&self) -> &ServiceObject {
        &self.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::eventbus::{Reply, listener};
    use parking_lot::Mutex;
    use serde_json::json;

    struct Counter {
        hits: Mutex<u32>,
    }

    impl ServiceHost for Counter {
        fn method(self: Arc<Self>, name: &str) -> Option<Listener> {
            match name {
                "hit" => Some(listener(move |_| {
                    let mut hits = self.hits.lock();
                    *hits += 1;
                    Ok(Reply::value(*hits))
                })),
                _ => None,
            }
        }
    }

    #[test]
    fn named_service_is_registered() {
        let registry = Registry::new(Config::default());
        let service = Service::new(Some("counter"), &registry);

        let found = registry.subscribe("counter").unwrap();
        assert!(Arc::ptr_eq(&found, service.object()));
    }

    #[test]
    fn anonymous_service_is_not_registered() {
        let registry = Registry::new(Config::default());
        let service = Service::new(None, &registry);

        assert!(service.name().is_none());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn implement_skips_missing_methods() {
        let registry = Registry::new(Config::default());
        let service = Service::new(Some("counter"), &registry);
        let host = Arc::new(Counter {
            hits: Mutex::new(0),
        });

        service.implement(&host, &["hit", "reset"]);

        let object = service.object();
        assert!(object.has_method("hit"));
        assert!(!object.has_method("reset"));
        assert_eq!(object.call("hit", &[]).unwrap().ready(), Some(Some(json!(1))));
        assert_eq!(service.fire("hit", &[]).unwrap().ready(), Some(Some(json!(2))));
    }

    #[test]
    fn require_is_forwarded() {
        let registry = Registry::new(Config::default());
        let service = Service::new(Some("app"), &registry);
        service.require(["db"]);
        assert_eq!(service.object().required(), vec!["db"]);
    }
}
