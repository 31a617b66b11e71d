use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use registrar::{
    Config, ConfigStore, Eventable, Listener, Registry, Reply, Service, ServiceError,
    ServiceHost, listener,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

struct Database {
    connects: AtomicU64,
}

impl ServiceHost for Database {
    fn method(self: Arc<Self>, name: &str) -> Option<Listener> {
        match name {
            "start" => Some(listener(move |_| {
                let me = self.clone();
                Ok(Reply::pending(async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    let n = me.connects.fetch_add(1, Ordering::Relaxed) + 1;
                    println!("database connected (#{n})");
                    Ok(Some(json!("connected")))
                }))
            })),
            "ready" => Some(listener(|_| {
                println!("database ready");
                Ok(Reply::none())
            })),
            _ => None,
        }
    }
}

struct Api;

impl ServiceHost for Api {
    fn method(self: Arc<Self>, name: &str) -> Option<Listener> {
        match name {
            "start" => Some(listener(|_| {
                println!("api starting");
                Ok(Reply::none())
            })),
            "ready" => Some(listener(|_| {
                println!("api ready");
                Ok(Reply::none())
            })),
            _ => None,
        }
    }
}

struct Flaky;

impl ServiceHost for Flaky {
    fn method(self: Arc<Self>, name: &str) -> Option<Listener> {
        match name {
            "start" => Some(listener(|_| {
                Ok(Reply::pending(async {
                    Err(ServiceError::failed("license server unreachable"))
                }))
            })),
            _ => None,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = ConfigStore::new();
    settings.add(json!({ "registry": { "start_timeout_ms": 2000 } }))?;
    let cfg: Config = settings.get_as("registry")?.unwrap_or_default();

    let registry = Registry::new(cfg);
    let mut lifecycle = registry.lifecycle();

    let db = Service::new(Some("db"), &registry);
    db.implement(
        &Arc::new(Database {
            connects: AtomicU64::new(0),
        }),
        &["start", "ready"],
    );

    let api = Service::new(Some("api"), &registry);
    api.require(["db"]);
    api.implement(&Arc::new(Api), &["start", "ready", "stop"]);

    let reports = Service::new(Some("reports"), &registry);
    reports.require(["warehouse"]);

    let licensing = Service::new(Some("licensing"), &registry);
    licensing.implement(&Arc::new(Flaky), &["start"]);

    registry.listen("ready", |args| {
        println!("cohort ready: {:?}", args.first());
        Ok(Reply::none())
    });

    registry.start("").await;

    println!("db started: {:?}", db.object().wait_started().await);
    println!("licensing started: {:?}", licensing.object().wait_started().await);
    println!("registered: {:?}", registry.names());

    while let Ok(ev) = lifecycle.try_recv() {
        println!(
            "[{}] {:?} service={:?} prefix={:?} reason={:?}",
            ev.seq, ev.kind, ev.service, ev.prefix, ev.reason
        );
    }

    Ok(())
}
