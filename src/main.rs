/// Demo host: a leftover pile that cleans itself up when left alone,
/// and a bell that rings a few times on a repeating call-out.
///
/// Usage: callout-demo [config.json]

use anyhow::Context;
use callout_lib::callout::{HostDriver, SharedState};
use callout_lib::core::MonotonicClock;
use callout_lib::{
    init_logging, CallOutEvent, CallOutRegistry, CallOutTarget, DriverState, EventBus, OwnerScope,
    RegistryConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::info;

const CLEANUP_DELAY: f64 = 1.5;
const BELL_RINGS: u32 = 3;

/// Items dropped here vanish once nobody has added anything for a while
struct LeftoverPile {
    items: Vec<String>,
}

impl CallOutTarget for LeftoverPile {
    fn label(&self) -> &str {
        "leftover pile"
    }

    fn invoke_named(
        &mut self,
        method: &str,
        arg: Option<&Value>,
        scope: &mut OwnerScope<'_>,
    ) -> callout_lib::Result<()> {
        match method {
            "add_item" => {
                let item = arg
                    .and_then(Value::as_str)
                    .unwrap_or("something")
                    .to_string();
                info!("{} lands on the pile", item);
                self.items.push(item);
                scope.restart_call_out("clean_up", CLEANUP_DELAY, None)?;
                Ok(())
            }
            "clean_up" => {
                info!("The pile crumbles to dust ({} item(s))", self.items.len());
                self.items.clear();
                Ok(())
            }
            other => Err(callout_lib::CalloutError::UnknownMethod {
                owner: self.label().to_string(),
                method: other.to_string(),
            }),
        }
    }
}

struct Bell {
    rings: u32,
}

impl CallOutTarget for Bell {
    fn label(&self) -> &str {
        "bell"
    }

    fn invoke_named(
        &mut self,
        method: &str,
        _arg: Option<&Value>,
        scope: &mut OwnerScope<'_>,
    ) -> callout_lib::Result<()> {
        if method != "ring" {
            return Err(callout_lib::CalloutError::UnknownMethod {
                owner: self.label().to_string(),
                method: method.to_string(),
            });
        }
        self.rings += 1;
        info!("Bong! ({})", self.rings);
        if self.rings >= BELL_RINGS {
            scope.remove_call_out("ring");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => RegistryConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => RegistryConfig::default(),
    };
    let period = config.tick_interval();

    let bus = Arc::new(EventBus::new());
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let CallOutEvent::CallbackFailed { method, error, .. } = &event {
                tracing::warn!("'{}' failed: {}", method, error);
            } else {
                tracing::debug!("event: {:?}", event);
            }
        }
    });

    let mut state = DriverState::new(CallOutRegistry::with_config(config).with_event_bus(bus));
    let pile = state.objects.insert(LeftoverPile { items: Vec::new() });
    let bell = state.objects.insert(Bell { rings: 0 });

    for (i, item) in ["a bent sword", "a mouldy loaf", "a torn map"].iter().enumerate() {
        state
            .registry
            .call_out(pile, "add_item", 0.4 * i as f64, Some(json!(item)))
            .context("scheduling add_item")?;
    }
    state
        .registry
        .call_out(bell, "ring", -0.5, None)
        .context("scheduling ring")?;

    let state: SharedState = Arc::new(Mutex::new(state));
    let (stop_tx, stop_rx) = watch::channel(false);
    let driver = HostDriver::new(MonotonicClock::new());
    let task = tokio::spawn(driver.run(state.clone(), period, stop_rx));

    tokio::time::sleep(Duration::from_secs(4)).await;
    stop_tx.send(true).context("stopping driver")?;
    let total = task.await.context("driver task panicked")?;

    let remaining = state.lock().await.registry.len();
    info!(
        "Done: {} call-out(s) fired, {} still pending",
        total.fired, remaining
    );
    Ok(())
}
