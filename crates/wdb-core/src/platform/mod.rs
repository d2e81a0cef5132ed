//! # Platform-Specific Implementations
//!
//! OS backends implementing [`DebugApi`](crate::os::DebugApi). Everything
//! above the seam is portable; only the backend touches the OS.
//!
//! - **Windows**: Win32 debugging API via `windows-sys`
//!   - See: [Debugging Functions](https://learn.microsoft.com/en-us/windows/win32/debug/debugging-functions)
//!
//! Other systems have no kernel debug-event stream of this shape, so no
//! backend is compiled there; [`create_debugger`](crate::debugger::create_debugger)
//! reports the platform as unsupported.

#[cfg(target_os = "windows")]
pub mod windows;
