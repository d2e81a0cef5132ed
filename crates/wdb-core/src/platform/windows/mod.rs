//! # Windows Debugging Backend
//!
//! [`WindowsDebugApi`] implements [`DebugApi`](crate::os::DebugApi) over the
//! Win32 debugging functions through the `windows-sys` bindings.
//!
//! Windows debugging is event based: after `CreateProcessW` with
//! `DEBUG_ONLY_THIS_PROCESS` (or `DebugActiveProcess`), the kernel queues a
//! `DEBUG_EVENT` for every process, thread, module and exception change, and
//! suspends the whole target until the debugger answers with
//! `ContinueDebugEvent`.
//!
//! ## Handle ownership
//!
//! - `hFile` of creation and DLL-load events belongs to the debugger; the
//!   backend closes it as soon as the event is translated
//! - `hProcess`/`hThread` of debug events belong to the system, which closes
//!   them when the matching exit event is continued
//! - `hProcess`/`hThread` returned by `CreateProcessW` belong to the caller
//!
//! ## References
//!
//! - [Debugging Functions](https://learn.microsoft.com/en-us/windows/win32/debug/debugging-functions)
//! - [DEBUG_EVENT](https://learn.microsoft.com/en-us/windows/win32/api/minwinbase/ns-minwinbase-debug_event)
//! - [windows-sys](https://docs.rs/windows-sys)

mod api;
mod event;

pub use api::WindowsDebugApi;
use windows_sys::Win32::Foundation::GetLastError;

use crate::os::OsError;

/// `OsError` for `call` carrying the thread's last error code.
fn last_error(call: &'static str) -> OsError
{
    // SAFETY: GetLastError only reads thread-local state.
    let code = unsafe { GetLastError() };
    OsError::new(call, code)
}

/// Turn a Win32 `BOOL` into a `Result`.
fn win32(call: &'static str, ok: i32) -> Result<(), OsError>
{
    if ok != 0 {
        Ok(())
    } else {
        Err(last_error(call))
    }
}
