//! # Registry configuration.
//!
//! Provides [`Config`], the centralized settings for a [`Registry`](crate::Registry).
//!
//! ## Sentinel values
//! - `start_timeout = 0s` → no timeout (a `start` that never settles stalls its cohort)
//! - `events_capacity = 0` → clamped to 1 by the lifecycle bus
//!
//! `Config` is deserializable, so it can be read out of a
//! [`ConfigStore`](crate::ConfigStore) with `get_as::<Config>("registry")`.
//! The timeout is given in milliseconds (`start_timeout_ms`).

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Prefix used by service-object buses.
pub const SERVICE_PREFIX: &str = "service:";
/// Prefix used by buses created through [`make_eventable`](crate::make_eventable).
pub const EVENTABLE_PREFIX: &str = "eventable:";

/// Global configuration for a registry.
///
/// ## Field semantics
/// - `service_prefix`: event-name namespace for every service object the registry creates
/// - `eventable_prefix`: event-name namespace of the registry's own bus
/// - `start_timeout`: per-service limit on the `start` phase (`0s` = wait forever)
/// - `events_capacity`: ring buffer size of the lifecycle event stream (min 1)
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Namespace prepended to events of service objects.
    pub service_prefix: String,

    /// Namespace prepended to events of the registry's own bus.
    pub eventable_prefix: String,

    /// Maximum time a single service's `start` may take.
    ///
    /// When exceeded, that service's startup deferred is rejected with
    /// [`ServiceError::StartTimeout`](crate::ServiceError::StartTimeout) and the
    /// cohort carries on. Zero disables the limit.
    #[serde(rename = "start_timeout_ms", deserialize_with = "millis")]
    pub start_timeout: Duration,

    /// Capacity of the lifecycle broadcast channel.
    pub events_capacity: usize,
}

impl Config {
    /// Returns the start timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → applied to every service's `start` phase
    #[inline]
    pub fn start_timeout(&self) -> Option<Duration> {
        if self.start_timeout == Duration::ZERO {
            None
        } else {
            Some(self.start_timeout)
        }
    }

    /// Returns the lifecycle channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn events_capacity_clamped(&self) -> usize {
        self.events_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `service_prefix = "service:"`
    /// - `eventable_prefix = "eventable:"`
    /// - `start_timeout = 0s` (no timeout)
    /// - `events_capacity = 1024`
    fn default() -> Self {
        Self {
            service_prefix: SERVICE_PREFIX.to_string(),
            eventable_prefix: EVENTABLE_PREFIX.to_string(),
            start_timeout: Duration::ZERO,
            events_capacity: 1024,
        }
    }
}

fn millis<'de, D>(de: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(de).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_timeout_means_none() {
        let cfg = Config::default();
        assert_eq!(cfg.start_timeout(), None);

        let cfg = Config {
            start_timeout: Duration::from_millis(250),
            ..Config::default()
        };
        assert_eq!(cfg.start_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn capacity_is_clamped() {
        let cfg = Config {
            events_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.events_capacity_clamped(), 1);
    }

    #[test]
    fn deserializes_partial_json() {
        let cfg: Config = serde_json::from_value(json!({
            "start_timeout_ms": 1500,
            "events_capacity": 16
        }))
        .unwrap();

        assert_eq!(cfg.start_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.events_capacity, 16);
        assert_eq!(cfg.service_prefix, SERVICE_PREFIX);
    }
}
