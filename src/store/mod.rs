//! # ConfigStore - deep-merged JSON settings with dotted lookups.
//!
//! Services commonly need shared settings contributed by several parties
//! (defaults, per-feature fragments, deployment overrides). The store merges
//! every fragment into one JSON object:
//!
//! - objects merge key by key (recursively)
//! - arrays concatenate (existing items first)
//! - any other value overwrites
//!
//! ## Example
//! ```rust
//! use registrar::ConfigStore;
//! use serde_json::json;
//!
//! let store = ConfigStore::new();
//! store.add(json!({ "api": { "host": "localhost", "port": 80 } })).unwrap();
//! store.add(json!({ "api": { "port": 8080 } })).unwrap();
//!
//! assert_eq!(store.get("api.host"), Some(json!("localhost")));
//! assert_eq!(store.get("api.port"), Some(json!(8080)));
//! assert_eq!(store.get("api.missing"), None);
//! ```

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Deep-merged JSON configuration.
#[derive(Debug, Default)]
pub struct ConfigStore {
    root: RwLock<Map<String, Value>>,
}

impl ConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep-merges `config` into the store. Only objects are accepted.
    pub fn add(&self, config: Value) -> Result<(), StoreError> {
        let kind = kind_of(&config);
        let Value::Object(fragment) = config else {
            tracing::warn!(kind, "only objects can be added to a config store");
            return Err(StoreError::NotAnObject { kind });
        };

        merge_into(&mut self.root.write(), fragment);
        Ok(())
    }

    /// Looks up a dotted path such as `"api.port"`.
    ///
    /// Returns `None` when a segment is missing or `null`, or when an
    /// intermediate value is not an object.
    pub fn get(&self, key: &str) -> Option<Value> {
        let root = self.root.read();
        let mut parts = key.split('.');
        let mut current = root.get(parts.next()?)?;

        for part in parts {
            current = current.as_object()?.get(part)?;
        }

        match current {
            Value::Null => None,
            v => Some(v.clone()),
        }
    }

    /// Looks up `key` and deserializes it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.get(key)
            .map(|v| {
                serde_json::from_value(v).map_err(|source| StoreError::Decode {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// A copy of the whole merged configuration.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.root.read().clone())
    }
}

fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, incoming) in source {
        let slot = target.entry(key).or_insert(Value::Null);
        match (slot, incoming) {
            (Value::Object(existing), Value::Object(incoming)) => merge_into(existing, incoming),
            (Value::Array(existing), Value::Array(incoming)) => existing.extend(incoming),
            (slot, incoming) => *slot = incoming,
        }
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn nested_objects_merge() {
        let store = ConfigStore::new();
        store
            .add(json!({ "ui": { "theme": "dark", "font": { "size": 12 } } }))
            .unwrap();
        store
            .add(json!({ "ui": { "font": { "family": "mono" } }, "debug": true }))
            .unwrap();

        assert_eq!(
            store.snapshot(),
            json!({
                "ui": { "theme": "dark", "font": { "size": 12, "family": "mono" } },
                "debug": true
            })
        );
    }

    #[test]
    fn arrays_concatenate_and_scalars_overwrite() {
        let store = ConfigStore::new();
        store.add(json!({ "plugins": ["a"], "level": 1 })).unwrap();
        store.add(json!({ "plugins": ["b"], "level": 2 })).unwrap();

        assert_eq!(store.get("plugins"), Some(json!(["a", "b"])));
        assert_eq!(store.get("level"), Some(json!(2)));
    }

    #[test]
    fn non_objects_are_rejected() {
        let store = ConfigStore::new();
        let err = store.add(json!([1, 2])).unwrap_err();
        assert_eq!(err.as_label(), "store_not_an_object");
        assert_eq!(store.snapshot(), json!({}));
    }

    #[test]
    fn lookups_stop_at_missing_or_null() {
        let store = ConfigStore::new();
        store
            .add(json!({ "a": { "b": null, "n": 0, "s": "x" } }))
            .unwrap();

        assert_eq!(store.get("a.b"), None);
        assert_eq!(store.get("a.b.c"), None);
        assert_eq!(store.get("a.s.deeper"), None);
        assert_eq!(store.get("a.n"), Some(json!(0)));
        assert_eq!(store.get(""), None);
    }

    #[test]
    fn typed_lookup_reads_registry_config() {
        let store = ConfigStore::new();
        store
            .add(json!({ "registry": { "start_timeout_ms": 250 } }))
            .unwrap();

        let cfg: Config = store.get_as("registry").unwrap().unwrap();
        assert_eq!(cfg.start_timeout(), Some(Duration::from_millis(250)));

        assert!(store.get_as::<Config>("absent").unwrap().is_none());
        let err = store.get_as::<u32>("registry").unwrap_err();
        assert_eq!(err.as_label(), "store_decode");
    }
}
