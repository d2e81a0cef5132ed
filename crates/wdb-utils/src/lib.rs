//! # wdb Utilities
//!
//! Logging initialisation shared by the wdb binaries. The core library only
//! emits `tracing` events; installing a subscriber is left to whoever owns
//! `main`.

pub mod logging;

pub use logging::{init_logging, init_logging_with, LogFormat, LogLevel, LoggingError, LoggingGuard, LoggingOptions};
pub use tracing::{debug, error, info, trace, warn};
