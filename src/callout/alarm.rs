/// Handle-addressable alarm table
///
/// This is the host primitive the named call-out layer is built on:
/// arm an alarm with a delay, an optional repeat interval and a payload,
/// get back a handle; cancel or inspect by handle; pop whatever is due.
///
/// Alarms are kept in registration order. Due alarms are popped in
/// non-decreasing due time, and alarms due at the same instant come out
/// in registration order.
///
/// Popping happens in passes opened by `begin_pass`. An alarm armed or
/// re-armed during a pass is not eligible until the next one, so a pass
/// always ends.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Opaque alarm identifier, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlarmHandle(pub u64);

impl fmt::Display for AlarmHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One armed alarm
#[derive(Debug, Clone)]
pub struct Alarm<P> {
    pub handle: AlarmHandle,
    /// Absolute due time
    pub due: f64,
    /// 0.0 for one-shot
    pub repeat: f64,
    pub payload: P,
    /// Pass in which this alarm was (re-)armed
    pass: u64,
}

impl<P> Alarm<P> {
    pub fn is_repeating(&self) -> bool {
        self.repeat > 0.0
    }
}

/// An alarm that came due
#[derive(Debug, Clone)]
pub struct FiredAlarm<P> {
    pub handle: AlarmHandle,
    /// The due time it fired for
    pub due: f64,
    /// Still armed for a later pass
    pub rearmed: bool,
    pub payload: P,
}

#[derive(Debug)]
pub struct AlarmTable<P> {
    alarms: Vec<Alarm<P>>,
    next_handle: u64,
    now: f64,
    pass: u64,
}

impl<P> Default for AlarmTable<P> {
    fn default() -> Self {
        Self {
            alarms: Vec::new(),
            next_handle: 1,
            now: 0.0,
            pass: 0,
        }
    }
}

impl<P: Clone> AlarmTable<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current table time
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Arm an alarm `delay` from now; `repeat > 0.0` makes it recurring
    ///
    /// Callers validate `delay` and `repeat`; they are assumed finite and
    /// non-negative here.
    pub fn set(&mut self, delay: f64, repeat: f64, payload: P) -> AlarmHandle {
        let handle = AlarmHandle(self.next_handle);
        self.next_handle += 1;

        self.alarms.push(Alarm {
            handle,
            due: self.now + delay,
            repeat,
            payload,
            pass: self.pass,
        });
        debug!("Alarm {} armed, due in {}s (repeat {}s)", handle, delay, repeat);
        handle
    }

    /// Cancel by handle, returning the alarm and its remaining time
    pub fn remove(&mut self, handle: AlarmHandle) -> Option<(Alarm<P>, f64)> {
        let index = self.alarms.iter().position(|a| a.handle == handle)?;
        Some(self.remove_at(index))
    }

    /// Cancel the first alarm (in registration order) matching `pred`
    pub fn remove_first(&mut self, pred: impl Fn(&Alarm<P>) -> bool) -> Option<(Alarm<P>, f64)> {
        let index = self.alarms.iter().position(pred)?;
        Some(self.remove_at(index))
    }

    /// Cancel every alarm matching `pred`, returning how many went
    pub fn remove_all(&mut self, pred: impl Fn(&Alarm<P>) -> bool) -> usize {
        let before = self.alarms.len();
        self.alarms.retain(|a| !pred(a));
        before - self.alarms.len()
    }

    fn remove_at(&mut self, index: usize) -> (Alarm<P>, f64) {
        let alarm = self.alarms.remove(index);
        let remaining = self.remaining(&alarm);
        debug!("Alarm {} removed with {}s remaining", alarm.handle, remaining);
        (alarm, remaining)
    }

    pub fn get(&self, handle: AlarmHandle) -> Option<&Alarm<P>> {
        self.alarms.iter().find(|a| a.handle == handle)
    }

    /// Time left before `alarm` fires, never negative
    pub fn remaining(&self, alarm: &Alarm<P>) -> f64 {
        (alarm.due - self.now).max(0.0)
    }

    /// Live alarms in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Alarm<P>> {
        self.alarms.iter()
    }

    /// Open a new popping pass; everything armed so far becomes eligible
    pub fn begin_pass(&mut self) {
        self.pass += 1;
    }

    /// Pop the earliest alarm of this pass due at or before `until`
    ///
    /// Table time moves to the alarm's due time, so anything armed while
    /// handling it is timed from the moment it fired. A repeating alarm
    /// stays in place and is re-armed at `due + repeat`; intervals that
    /// would already be due by `until` are skipped, so it fires at most
    /// once per pass.
    pub fn pop_due(&mut self, until: f64) -> Option<FiredAlarm<P>> {
        let mut best: Option<usize> = None;
        for (i, alarm) in self.alarms.iter().enumerate() {
            if alarm.pass >= self.pass || until.is_nan() || alarm.due > until {
                continue;
            }
            // ties keep the earlier-registered alarm
            match best {
                Some(b) if self.alarms[b].due <= alarm.due => {}
                _ => best = Some(i),
            }
        }

        let index = best?;
        let due = self.alarms[index].due;
        if due > self.now {
            self.now = due;
        }

        if self.alarms[index].is_repeating() {
            let pass = self.pass;
            let alarm = &mut self.alarms[index];
            let mut next = alarm.due + alarm.repeat;
            if next <= until {
                debug!(
                    "Alarm {} missed intervals up to {}s, skipping ahead",
                    alarm.handle, until
                );
                next = until + alarm.repeat;
            }
            alarm.due = next;
            alarm.pass = pass;
            Some(FiredAlarm {
                handle: alarm.handle,
                due,
                rearmed: true,
                payload: alarm.payload.clone(),
            })
        } else {
            let alarm = self.alarms.remove(index);
            Some(FiredAlarm {
                handle: alarm.handle,
                due,
                rearmed: false,
                payload: alarm.payload,
            })
        }
    }

    /// Move table time forward to `until` once nothing more is due
    pub fn settle(&mut self, until: f64) {
        if until > self.now {
            self.now = until;
        }
    }

    /// Time until the next alarm is due
    pub fn next_due_in(&self) -> Option<f64> {
        self.alarms
            .iter()
            .map(|a| self.remaining(a))
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }
}
