/// Name-addressable call-out registry
///
/// Objects schedule deferred invocations of their own methods and later
/// find or cancel them by method name instead of keeping handles around.
/// Name lookups scan live entries in registration order and take the
/// first match, so with two `clean_up` call-outs pending the older one is
/// "the" `clean_up` call-out.
///
/// The registry is driven by the host: `tick`/`advance_to` move time
/// forward and dispatch everything that came due through the
/// `ObjectTable`.

use crate::callout::alarm::{Alarm, AlarmHandle, AlarmTable, FiredAlarm};
use crate::callout::entry::{CallOut, CallOutInfo, CallOutLookup, CallbackRef};
use crate::config::RegistryConfig;
use crate::core::events::{CallOutEvent, EventBus};
use crate::core::objects::{ObjectTable, OwnerId};
use crate::error::{CalloutError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Callbacks invoked (including ones that returned an error)
    pub fired: usize,
    /// Entries dropped because their owner was gone
    pub dropped: usize,
    /// Callbacks that returned an error
    pub failed: usize,
}

impl TickReport {
    pub fn merge(&mut self, other: TickReport) {
        self.fired += other.fired;
        self.dropped += other.dropped;
        self.failed += other.failed;
    }
}

/// Table of pending call-outs for every object
pub struct CallOutRegistry {
    alarms: AlarmTable<CallOut>,
    config: RegistryConfig,
    events: Option<Arc<EventBus>>,
}

impl CallOutRegistry {
    /// Create an unbounded registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        debug!("Creating new CallOutRegistry with {:?}", config);
        Self {
            alarms: AlarmTable::new(),
            config,
            events: None,
        }
    }

    /// Attach an event bus for lifecycle notifications
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Registry time in seconds
    pub fn now(&self) -> f64 {
        self.alarms.now()
    }

    /// Borrow the registry on behalf of one owner
    pub fn scope(&mut self, owner: OwnerId) -> OwnerScope<'_> {
        OwnerScope {
            registry: self,
            owner,
        }
    }

    // ========================================
    // Scheduling
    // ========================================

    /// Invoke `method` on `owner` once, `delay` seconds from now
    ///
    /// # Errors
    /// - `CalloutError::ValidationError`: empty method, negative or non-finite delay
    /// - `CalloutError::CapacityExceeded`: registry is at `max_call_outs`
    pub fn schedule_once(
        &mut self,
        owner: OwnerId,
        method: impl Into<String>,
        delay: f64,
        arg: Option<Value>,
    ) -> Result<AlarmHandle> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(CalloutError::validation(
                "delay",
                format!("must be a finite non-negative number, got {}", delay),
            ));
        }
        self.insert(owner, method.into(), delay, 0.0, arg)
    }

    /// Invoke `method` on `owner` every `interval` seconds, first after one interval
    ///
    /// # Errors
    /// - `CalloutError::ValidationError`: empty method, non-positive or non-finite interval
    /// - `CalloutError::CapacityExceeded`: registry is at `max_call_outs`
    pub fn schedule_repeating(
        &mut self,
        owner: OwnerId,
        method: impl Into<String>,
        interval: f64,
        arg: Option<Value>,
    ) -> Result<AlarmHandle> {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(CalloutError::validation(
                "interval",
                format!("must be a finite positive number, got {}", interval),
            ));
        }
        self.insert(owner, method.into(), interval, interval, arg)
    }

    /// Sign-overloaded form: a negative `delay` means "repeat every `-delay`"
    pub fn call_out(
        &mut self,
        owner: OwnerId,
        method: impl Into<String>,
        delay: f64,
        arg: Option<Value>,
    ) -> Result<AlarmHandle> {
        if delay < 0.0 {
            self.schedule_repeating(owner, method, -delay, arg)
        } else {
            self.schedule_once(owner, method, delay, arg)
        }
    }

    /// Cancel the first `method` call-out of `owner`, then schedule a fresh one
    pub fn restart_call_out(
        &mut self,
        owner: OwnerId,
        method: impl Into<String>,
        delay: f64,
        arg: Option<Value>,
    ) -> Result<AlarmHandle> {
        let method = method.into();
        let previous = self.remove_call_out(owner, &method);
        debug!(
            "Restarting '{}' for {} (previous remaining {})",
            method,
            owner,
            previous.as_legacy()
        );
        self.call_out(owner, method, delay, arg)
    }

    fn insert(
        &mut self,
        owner: OwnerId,
        method: String,
        delay: f64,
        repeat: f64,
        arg: Option<Value>,
    ) -> Result<AlarmHandle> {
        if method.trim().is_empty() {
            return Err(CalloutError::validation("method", "cannot be empty"));
        }

        if let Some(max) = self.config.max_call_outs {
            if self.alarms.len() >= max {
                warn!("Rejecting call-out '{}' for {}: table full", method, owner);
                return Err(CalloutError::CapacityExceeded { max });
            }
        }

        let handle = self.alarms.set(
            delay,
            repeat,
            CallOut {
                callback: CallbackRef::new(owner, method.clone()),
                arg,
            },
        );
        debug!(
            "Scheduled '{}' for {} as {} in {}s (repeat {}s)",
            method, owner, handle, delay, repeat
        );
        self.publish(CallOutEvent::Scheduled {
            handle,
            owner,
            method,
            delay,
            repeat,
        });
        Ok(handle)
    }

    // ========================================
    // Lookup and cancellation
    // ========================================

    /// First pending `method` call-out of `owner`, in registration order
    pub fn find_call_out(&self, owner: OwnerId, method: &str) -> CallOutLookup {
        self.find_where(|c| c.callback.owner == owner && c.callback.method == method)
    }

    /// First pending `method` call-out of any owner
    pub fn find_call_out_any(&self, method: &str) -> CallOutLookup {
        self.find_where(|c| c.callback.method == method)
    }

    fn find_where(&self, pred: impl Fn(&CallOut) -> bool) -> CallOutLookup {
        self.alarms
            .iter()
            .find(|a| pred(&a.payload))
            .map(|a| CallOutLookup::Found {
                handle: a.handle,
                remaining: self.alarms.remaining(a),
            })
            .unwrap_or(CallOutLookup::NotFound)
    }

    /// Cancel the first pending `method` call-out of `owner`
    ///
    /// Reports the time it had left. Calling again once nothing matches
    /// is harmless and reports `NotFound`.
    pub fn remove_call_out(&mut self, owner: OwnerId, method: &str) -> CallOutLookup {
        let removed = self
            .alarms
            .remove_first(|a| a.payload.callback.owner == owner && a.payload.callback.method == method);
        self.cancelled(removed)
    }

    /// Cancel by handle
    pub fn remove_alarm(&mut self, handle: AlarmHandle) -> CallOutLookup {
        let removed = self.alarms.remove(handle);
        self.cancelled(removed)
    }

    fn cancelled(&mut self, removed: Option<(Alarm<CallOut>, f64)>) -> CallOutLookup {
        match removed {
            Some((alarm, remaining)) => {
                let CallbackRef { owner, method } = alarm.payload.callback;
                debug!("Cancelled '{}' ({}) for {}, {}s left", method, alarm.handle, owner, remaining);
                self.publish(CallOutEvent::Cancelled {
                    handle: alarm.handle,
                    owner,
                    method,
                    remaining,
                });
                CallOutLookup::Found {
                    handle: alarm.handle,
                    remaining,
                }
            }
            None => CallOutLookup::NotFound,
        }
    }

    /// Snapshot of one call-out by handle
    pub fn get_alarm(&self, handle: AlarmHandle) -> Option<CallOutInfo> {
        self.alarms.get(handle).map(|a| self.info(a))
    }

    /// Snapshot of live call-outs in registration order, optionally for one owner
    pub fn call_out_info(&self, owner: Option<OwnerId>) -> Vec<CallOutInfo> {
        self.alarms
            .iter()
            .filter(|a| owner.map_or(true, |o| a.payload.callback.owner == o))
            .map(|a| self.info(a))
            .collect()
    }

    fn info(&self, alarm: &Alarm<CallOut>) -> CallOutInfo {
        CallOutInfo {
            handle: alarm.handle,
            owner: alarm.payload.callback.owner,
            method: alarm.payload.callback.method.clone(),
            remaining: self.alarms.remaining(alarm),
            repeat: alarm.repeat,
            arg: alarm.payload.arg.clone(),
        }
    }

    /// Cancel every call-out an owner holds
    pub fn remove_owner(&mut self, owner: OwnerId) -> usize {
        let removed = self.alarms.remove_all(|a| a.payload.callback.owner == owner);
        if removed > 0 {
            info!("Removed {} call-out(s) for destructed {}", removed, owner);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    /// Seconds until the next call-out is due
    pub fn next_due_in(&self) -> Option<f64> {
        self.alarms.next_due_in()
    }

    // ========================================
    // Firing
    // ========================================

    /// Advance time by `elapsed` seconds and fire whatever came due
    pub fn tick(&mut self, elapsed: f64, objects: &mut ObjectTable) -> TickReport {
        if !elapsed.is_finite() || elapsed < 0.0 {
            warn!("Ignoring invalid tick of {}s", elapsed);
            return TickReport::default();
        }
        let target = self.now() + elapsed;
        self.advance_to(target, objects)
    }

    /// Fire everything due at or before `time`, then move the clock to it
    ///
    /// Entries fire in due-time order, ties in registration order. Each
    /// entry is removed (one-shot) or re-armed (repeating) before its
    /// callback runs, so the callback sees the registry as it will be
    /// afterwards and may cancel or reschedule freely. Call-outs scheduled
    /// by those callbacks, and re-armed repeating ones, wait for the next
    /// tick; a repeating call-out fires at most once per tick.
    ///
    /// A non-finite `time`, or one before the registry's clock, is ignored.
    pub fn advance_to(&mut self, time: f64, objects: &mut ObjectTable) -> TickReport {
        let mut report = TickReport::default();
        if !time.is_finite() || time < self.now() {
            warn!("Ignoring advance to invalid time {}s (now {}s)", time, self.now());
            return report;
        }

        self.alarms.begin_pass();
        while let Some(fired) = self.alarms.pop_due(time) {
            self.dispatch(fired, objects, &mut report);
        }
        self.alarms.settle(time);

        if report != TickReport::default() {
            debug!(
                "Tick to {}s: fired {}, dropped {}, failed {}",
                time, report.fired, report.dropped, report.failed
            );
        }
        report
    }

    fn dispatch(&mut self, fired: FiredAlarm<CallOut>, objects: &mut ObjectTable, report: &mut TickReport) {
        let FiredAlarm {
            handle,
            rearmed,
            payload,
            ..
        } = fired;
        let CallOut { callback, arg } = payload;
        let CallbackRef { owner, method } = callback;

        let Some(target) = objects.get_mut(owner) else {
            if rearmed {
                self.alarms.remove(handle);
            }
            debug!("Owner {} of '{}' ({}) is gone, dropping", owner, method, handle);
            report.dropped += 1;
            self.publish(CallOutEvent::OwnerGone {
                handle,
                owner,
                method,
            });
            return;
        };

        debug!("Firing '{}' ({}) on '{}'", method, handle, target.label());
        report.fired += 1;

        let result = {
            let mut scope = self.scope(owner);
            target.invoke_named(&method, arg.as_ref(), &mut scope)
        };

        match result {
            Ok(()) => {
                self.publish(CallOutEvent::Fired {
                    handle,
                    owner,
                    method,
                });
            }
            Err(e) => {
                warn!("Call-out '{}' ({}) for {} failed: {}", method, handle, owner, e);
                report.failed += 1;
                self.publish(CallOutEvent::CallbackFailed {
                    handle,
                    owner,
                    method,
                    error: e.to_string(),
                });
            }
        }
    }

    fn publish(&self, event: CallOutEvent) {
        if !self.config.emit_events {
            return;
        }
        if let Some(bus) = &self.events {
            let _ = bus.publish(event);
        }
    }
}

impl Default for CallOutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The registry as seen by one owner object
///
/// Handed to `CallOutTarget::invoke_named` so a method can manage its
/// own call-outs while it runs.
pub struct OwnerScope<'a> {
    registry: &'a mut CallOutRegistry,
    owner: OwnerId,
}

impl OwnerScope<'_> {
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn now(&self) -> f64 {
        self.registry.now()
    }

    pub fn call_out(&mut self, method: impl Into<String>, delay: f64, arg: Option<Value>) -> Result<AlarmHandle> {
        self.registry.call_out(self.owner, method, delay, arg)
    }

    pub fn schedule_once(&mut self, method: impl Into<String>, delay: f64, arg: Option<Value>) -> Result<AlarmHandle> {
        self.registry.schedule_once(self.owner, method, delay, arg)
    }

    pub fn schedule_repeating(
        &mut self,
        method: impl Into<String>,
        interval: f64,
        arg: Option<Value>,
    ) -> Result<AlarmHandle> {
        self.registry.schedule_repeating(self.owner, method, interval, arg)
    }

    pub fn restart_call_out(
        &mut self,
        method: impl Into<String>,
        delay: f64,
        arg: Option<Value>,
    ) -> Result<AlarmHandle> {
        self.registry.restart_call_out(self.owner, method, delay, arg)
    }

    pub fn find_call_out(&self, method: &str) -> CallOutLookup {
        self.registry.find_call_out(self.owner, method)
    }

    pub fn remove_call_out(&mut self, method: &str) -> CallOutLookup {
        self.registry.remove_call_out(self.owner, method)
    }

    pub fn call_out_info(&self) -> Vec<CallOutInfo> {
        self.registry.call_out_info(Some(self.owner))
    }
}
