/// callout - named, repeatable, cancellable call-outs
///
/// Deferred method invocations for MUD world objects, addressed by the
/// name of the method they will call. Objects schedule `clean_up` or
/// `heart_beat` style call-outs on themselves, look them up or cancel
/// them by name, and the host driver fires them as time advances.

// Module declarations
pub mod error;
pub mod config;
pub mod core;
pub mod callout;

// Re-export commonly used types
pub use crate::error::{CalloutError, Result};
pub use crate::config::RegistryConfig;
pub use crate::callout::{
    AlarmHandle, CallOutInfo, CallOutLookup, CallOutRegistry, DriverState, HostDriver, OwnerScope,
    TickReport,
};
pub use crate::core::{CallOutEvent, CallOutTarget, EventBus, MethodTable, ObjectTable, OwnerId};

/// Initialize logging infrastructure
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("callout starting...");
}
