/// Call-outs: named, repeatable, cancellable deferred invocations
///
/// - Alarm: handle-addressable timer table (the host primitive)
/// - Entry: what a call-out stores and what lookups return
/// - Registry: name-addressable scheduling, lookup, cancellation and firing
/// - Driver: advances a registry from a clock

pub mod alarm;
pub mod driver;
pub mod entry;
pub mod registry;

// Re-export commonly used types
pub use alarm::{Alarm, AlarmHandle, AlarmTable, FiredAlarm};
pub use driver::{DriverState, HostDriver, SharedState};
pub use entry::{CallOut, CallOutInfo, CallOutLookup, CallbackRef};
pub use registry::{CallOutRegistry, OwnerScope, TickReport};
