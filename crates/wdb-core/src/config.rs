//! # Session Configuration
//!
//! Options recognised by the controller: how launched targets are created and
//! which diagnostic streams are raised to `info` level.
//!
//! The verbosity toggles are purely additive logging. Each one moves the
//! messages of one area from `trace` to `info` under a dedicated tracing
//! target, so they show up with the default `RUST_LOG=info` filter:
//!
//! | Toggle | Target | Messages |
//! |--------|--------|----------|
//! | `exec` | `wdb::exec` | command lines, resumes, continues |
//! | `events` | `wdb::events` | every kernel debug event |
//! | `memory` | `wdb::memory` | every memory transfer |
//! | `exceptions` | `wdb::exceptions` | every classified exception |

use std::str::FromStr;

/// Environment variable holding the default verbosity list.
pub const DEBUG_ENV_VAR: &str = "WDB_DEBUG";

/// Emit at `info` when `$enabled`, otherwise at `trace`, under `$target`.
macro_rules! verbose {
    ($enabled:expr, $target:literal, $($arg:tt)+) => {
        if $enabled {
            ::tracing::info!(target: $target, $($arg)+);
        } else {
            ::tracing::trace!(target: $target, $($arg)+);
        }
    };
}
pub(crate) use verbose;

/// Options for one debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionConfig
{
    /// Launch the target with its own console window.
    pub new_console: bool,
    /// Launch the target in a new process group, so `interrupt` reaches only
    /// its process tree.
    pub new_process_group: bool,
    /// Diagnostic verbosity.
    pub verbosity: Verbosity,
}

impl SessionConfig
{
    /// Default options with verbosity taken from `WDB_DEBUG`.
    ///
    /// An unparsable value is ignored.
    pub fn from_env() -> Self
    {
        Self {
            verbosity: Verbosity::from_env().unwrap_or_default(),
            ..Self::default()
        }
    }
}

/// The four independent diagnostic toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verbosity
{
    /// Execution: command lines, resumes and continues.
    pub exec: bool,
    /// Kernel debug events.
    pub events: bool,
    /// Memory transfers.
    pub memory: bool,
    /// Target exceptions.
    pub exceptions: bool,
}

impl Verbosity
{
    /// Every toggle on.
    pub const ALL: Self = Self {
        exec: true,
        events: true,
        memory: true,
        exceptions: true,
    };

    /// Parse `WDB_DEBUG`, if set.
    pub fn from_env() -> Option<Self>
    {
        std::env::var(DEBUG_ENV_VAR).ok()?.parse().ok()
    }
}

impl FromStr for Verbosity
{
    type Err = String;

    /// Parse a comma-separated list of `exec`, `events`, `memory`,
    /// `exceptions`, or one of `all` / `none`.
    ///
    /// ```rust
    /// use wdb_core::config::Verbosity;
    ///
    /// let v: Verbosity = "events, memory".parse().unwrap();
    /// assert!(v.events && v.memory && !v.exec);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let mut verbosity = Verbosity::default();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            match item.to_ascii_lowercase().as_str() {
                "all" => verbosity = Verbosity::ALL,
                "none" => verbosity = Verbosity::default(),
                "exec" => verbosity.exec = true,
                "events" => verbosity.events = true,
                "memory" => verbosity.memory = true,
                "exceptions" => verbosity.exceptions = true,
                other => {
                    return Err(format!(
                        "unknown debug stream '{other}'. Valid values: exec, events, memory, exceptions, all, none"
                    ))
                }
            }
        }
        Ok(verbosity)
    }
}
