/// Host-side pieces the call-out registry depends on
///
/// - Objects: owner identities and named-method dispatch
/// - Clock: time sources for the driver
/// - Events: lifecycle notifications

pub mod clock;
pub mod events;
pub mod objects;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use events::{CallOutEvent, EventBus};
pub use objects::{CallOutTarget, MethodTable, ObjectTable, OwnerId};
