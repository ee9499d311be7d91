/// Host tick driver
///
/// Samples a `Clock` and advances the registry by the elapsed time.
/// `pump` does one step synchronously; `run` repeats it on a tokio
/// interval until told to stop, holding the shared state behind a
/// `tokio::sync::Mutex` so only one writer touches the registry at a time.

use crate::callout::registry::{CallOutRegistry, TickReport};
use crate::core::clock::Clock;
use crate::core::objects::{ObjectTable, OwnerId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Everything a tick touches: the registry and the objects it calls into
pub struct DriverState {
    pub registry: CallOutRegistry,
    pub objects: ObjectTable,
}

impl DriverState {
    pub fn new(registry: CallOutRegistry) -> Self {
        Self {
            registry,
            objects: ObjectTable::new(),
        }
    }

    /// Destroy an object and its pending call-outs
    pub fn destruct(&mut self, owner: OwnerId) -> bool {
        self.objects.destruct(owner, &mut self.registry)
    }

    pub fn tick(&mut self, elapsed: f64) -> TickReport {
        self.registry.tick(elapsed, &mut self.objects)
    }
}

/// Shared handle used by the async driver loop
pub type SharedState = Arc<Mutex<DriverState>>;

pub struct HostDriver<C: Clock> {
    clock: C,
    last: f64,
}

impl<C: Clock> HostDriver<C> {
    pub fn new(clock: C) -> Self {
        let last = clock.now();
        Self { clock, last }
    }

    /// Advance `state` by the time elapsed since the previous pump
    ///
    /// A clock that steps backwards advances nothing.
    pub fn pump(&mut self, state: &mut DriverState) -> TickReport {
        let now = self.clock.now();
        let elapsed = now - self.last;
        if elapsed <= 0.0 {
            return state.tick(0.0);
        }
        self.last = now;
        state.tick(elapsed)
    }

    /// Pump every `period` until `shutdown` turns true or its sender is dropped
    pub async fn run(
        mut self,
        state: SharedState,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> TickReport {
        info!("Host driver started, tick every {:?}", period);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut total = TickReport::default();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let mut guard = state.lock().await;
                    let report = self.pump(&mut guard);
                    if report != TickReport::default() {
                        debug!("Driver tick: {:?}", report);
                    }
                    total.merge(report);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            "Host driver stopped: fired {}, dropped {}, failed {}",
            total.fired, total.dropped, total.failed
        );
        total
    }
}
