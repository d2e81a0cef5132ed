//! # wdb-core
//!
//! Native process-debugging controller for the Windows debug-event API.
//!
//! This crate starts or attaches to a target process, consumes the kernel's
//! debug-event stream, classifies stop reasons into portable signals, and
//! exposes register and memory access to a higher-level debugger:
//!
//! - [`exception`]: OS exception codes to portable signals
//! - [`registers`]: lazily synchronised register cache
//! - [`memory`]: cross-process reads and writes with instruction-cache flushes
//! - [`modules`]: module-load notification and de-duplication
//! - [`event_loop`]: the blocking wait/translate/continue cycle
//! - [`controller`]: attach, launch, resume, interrupt, kill, detach, mourn
//!
//! All OS access goes through the [`os::DebugApi`] trait. The Win32 backend
//! lives in [`platform`]; tests drive the controller through a scripted one.
//!
//! ## Why unsafe code is needed
//!
//! The Win32 backend calls kernel debugging functions through raw FFI
//! bindings and reinterprets `CONTEXT` and `DEBUG_EVENT` structures. The
//! unsafe code is confined to `platform::windows` and wrapped in safe
//! functions.

#![allow(unsafe_code)] // Required for the Win32 debugging API

pub mod config;
pub mod controller;
pub mod debugger;
pub mod error;
pub mod event_loop;
pub mod events;
pub mod exception;
pub mod launch;
pub mod memory;
pub mod modules;
pub mod os;
pub mod paths;
pub mod platform;
pub mod prelude;
pub mod registers;
pub mod session;
pub mod symbols;
pub mod types;

pub use controller::NativeProcessController;
pub use debugger::{create_debugger, Debugger};
pub use error::{Result, WdbError};
#[cfg(target_os = "windows")]
pub use platform::windows::WindowsDebugApi;
pub use types::{Address, ProcessId, Signal, ThreadId, WaitStatus};
