//! # Settle a single service's `start` into its deferred.
//!
//! ```text
//! invoke_strict("start")
//!   ├─ Err(e)           → reject deferred, publish ServiceStartFailed
//!   └─ Ok(reply)
//!        ├─ timeout set → time::timeout(d, reply)
//!        │                  └─ elapsed → publish StartTimeoutHit, StartTimeout error
//!        └─ reply.await
//!             ├─ Ok(v)  → resolve deferred, publish ServiceStarted
//!             └─ Err(e) → warn!, reject deferred, publish ServiceStartFailed
//! ```
//!
//! ## Rules
//! - Always settles the deferred **exactly once** and publishes exactly one
//!   terminal event (`ServiceStarted` or `ServiceStartFailed`).
//! - Never returns an error: failures stay inside the service boundary.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::core::deferred::Deferred;
use crate::error::ServiceError;
use crate::eventbus::Reply;
use crate::events::{Bus, Event, EventKind};

/// Drives `outcome` to completion and settles `deferred` with it.
pub(crate) async fn settle_start(
    service: Arc<str>,
    outcome: Result<Reply, ServiceError>,
    deferred: Deferred,
    timeout: Option<Duration>,
    events: Bus,
) {
    let res = match outcome {
        Err(e) => Err(e),
        Ok(reply) => match timeout {
            Some(dur) => match time::timeout(dur, reply.into_future()).await {
                Ok(r) => r,
                Err(_elapsed) => {
                    events.publish(
                        Event::new(EventKind::StartTimeoutHit)
                            .with_service(service.clone())
                            .with_timeout(dur),
                    );
                    Err(ServiceError::StartTimeout {
                        service: service.clone(),
                        timeout: dur,
                    })
                }
            },
            None => reply.await,
        },
    };

    match res {
        Ok(value) => {
            tracing::debug!(service = %service, "service started");
            deferred.resolve(value);
            events.publish(Event::new(EventKind::ServiceStarted).with_service(service));
        }
        Err(e) => {
            tracing::warn!(service = %service, error = %e, "service failed to start");
            events.publish(
                Event::new(EventKind::ServiceStartFailed)
                    .with_service(service)
                    .with_reason(e.to_string()),
            );
            deferred.reject(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sync_value_resolves() {
        let events = Bus::new(8);
        let mut rx = events.subscribe();
        let deferred = Deferred::new();

        settle_start(
            "svc".into(),
            Ok(Reply::value("up")),
            deferred.clone(),
            None,
            events,
        )
        .await;

        assert_eq!(deferred.promise().await, Ok(Some(json!("up"))));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ServiceStarted);
    }

    #[tokio::test]
    async fn sync_error_rejects() {
        let deferred = Deferred::new();
        settle_start(
            "svc".into(),
            Err(ServiceError::failed("thrown")),
            deferred.clone(),
            None,
            Bus::new(8),
        )
        .await;

        assert_eq!(deferred.promise().await, Err(ServiceError::failed("thrown")));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_rejects_and_reports() {
        let events = Bus::new(8);
        let mut rx = events.subscribe();
        let deferred = Deferred::new();

        settle_start(
            "slow".into(),
            Ok(Reply::pending(futures::future::pending())),
            deferred.clone(),
            Some(Duration::from_millis(50)),
            events,
        )
        .await;

        let err = deferred.promise().await.unwrap_err();
        assert_eq!(err.as_label(), "service_start_timeout");
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::StartTimeoutHit);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ServiceStartFailed);
    }
}
