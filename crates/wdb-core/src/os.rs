//! # OS Debugging Seam
//!
//! The controller talks to the kernel exclusively through [`DebugApi`]. The
//! Windows backend in [`crate::platform::windows`] implements it over the
//! Win32 debugging functions; tests drive the controller through a scripted
//! implementation instead.
//!
//! ## Win32 functions behind each operation
//!
//! | Operation | Win32 |
//! |-----------|-------|
//! | `debug_active_process` | `DebugActiveProcess` |
//! | `debug_active_process_stop` | `DebugActiveProcessStop` |
//! | `create_process` | `CreateProcessW` with `DEBUG_ONLY_THIS_PROCESS` |
//! | `wait_for_event` | `WaitForDebugEvent(INFINITE)` |
//! | `continue_event` | `ContinueDebugEvent` |
//! | `read_process_memory` / `write_process_memory` | `ReadProcessMemory` / `WriteProcessMemory` |
//! | `flush_instruction_cache` | `FlushInstructionCache` |
//! | `get_thread_context` / `set_thread_context` | `GetThreadContext` / `SetThreadContext` |
//! | `terminate_process` | `TerminateProcess` |
//! | `generate_console_ctrl_event` | `GenerateConsoleCtrlEvent` |
//!
//! ## References
//!
//! - [Debugging Functions](https://learn.microsoft.com/en-us/windows/win32/debug/debugging-functions)
//! - [DEBUG_EVENT](https://learn.microsoft.com/en-us/windows/win32/api/minwinbase/ns-minwinbase-debug_event)

use std::panic::Location;

use thiserror::Error;
use tracing::error;

use crate::types::{Address, OsHandle, ProcessId, RegisterGroups, ThreadId};

/// A failed OS call: which function failed and the OS error code it left
/// behind (`GetLastError` on Windows).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{call} failed with OS error {code} ({})", OsErrorKind::from(*.code))]
pub struct OsError
{
    /// Name of the failing OS function.
    pub call: &'static str,
    /// Raw OS error code.
    pub code: u32,
}

impl OsError
{
    /// Create an error for `call` with the given OS code.
    pub const fn new(call: &'static str, code: u32) -> Self
    {
        Self { call, code }
    }

    /// Classification of the OS code.
    pub fn kind(&self) -> OsErrorKind
    {
        OsErrorKind::from(self.code)
    }
}

/// Classification of the Win32 error codes the controller cares about
///
/// - `ERROR_ACCESS_DENIED` (5): missing privilege, or the process is already
///   being debugged
/// - `ERROR_NOT_SUPPORTED` (50): the OS refuses the operation for this target
/// - `ERROR_INVALID_PARAMETER` (87): no such process, or a bad handle/argument
/// - `ERROR_PARTIAL_COPY` (299): a memory transfer stopped short
///
/// See: [System Error Codes](https://learn.microsoft.com/en-us/windows/win32/debug/system-error-codes--0-499-)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsErrorKind
{
    /// `ERROR_ACCESS_DENIED`
    AccessDenied,
    /// `ERROR_NOT_SUPPORTED`
    NotSupported,
    /// `ERROR_INVALID_PARAMETER`
    InvalidParameter,
    /// `ERROR_PARTIAL_COPY`
    PartialCopy,
    /// Anything else.
    Other(u32),
}

impl From<u32> for OsErrorKind
{
    fn from(code: u32) -> Self
    {
        match code {
            5 => OsErrorKind::AccessDenied,
            50 => OsErrorKind::NotSupported,
            87 => OsErrorKind::InvalidParameter,
            299 => OsErrorKind::PartialCopy,
            other => OsErrorKind::Other(other),
        }
    }
}

impl std::fmt::Display for OsErrorKind
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self {
            OsErrorKind::AccessDenied => f.write_str("access denied"),
            OsErrorKind::NotSupported => f.write_str("not supported"),
            OsErrorKind::InvalidParameter => f.write_str("invalid parameter"),
            OsErrorKind::PartialCopy => f.write_str("partial copy"),
            OsErrorKind::Other(code) => write!(f, "error {code}"),
        }
    }
}

/// Report an OS call that was expected to succeed
///
/// Failures are logged with the OS code and the caller's source location, then
/// swallowed. Aborting mid-session would leave the target suspended, so these
/// protocol violations never propagate.
///
/// Returns whether the call succeeded.
#[track_caller]
pub fn check(result: std::result::Result<(), OsError>) -> bool
{
    match result {
        Ok(()) => true,
        Err(err) => {
            let caller = Location::caller();
            error!(
                call = err.call,
                code = err.code,
                "error return {}:{} was {}",
                caller.file(),
                caller.line(),
                err.code
            );
            false
        }
    }
}

/// How the target should proceed after a debug event is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueDisposition
{
    /// `DBG_CONTINUE`: the debugger consumed the event.
    Continue,
    /// `DBG_EXCEPTION_NOT_HANDLED`: let the target's own fault handling run.
    ExceptionNotHandled,
}

/// Console control event sent by [`DebugApi::generate_console_ctrl_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlEvent
{
    /// `CTRL_C_EVENT`; can only target the shared console group (0).
    CtrlC,
    /// `CTRL_BREAK_EVENT`; can target a specific process group.
    CtrlBreak,
}

/// One debug event as delivered by the OS
///
/// Pointer-valued fields are addresses in the *target's* address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEvent
{
    /// Process that raised the event.
    pub process_id: ProcessId,
    /// Thread that raised the event.
    pub thread_id: ThreadId,
    /// What happened.
    pub kind: DebugEventKind,
}

/// Payload of a [`DebugEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEventKind
{
    /// First event of every session; carries the process and initial thread
    /// handles.
    ProcessCreated
    {
        /// Process handle owned by the OS for the lifetime of the session.
        process: OsHandle,
        /// Initial thread handle.
        thread: OsHandle,
        /// Load address of the executable image.
        image_base: Address,
        /// Address of a pointer to the image name (may be null).
        image_name: Address,
        /// Whether the image name is UTF-16.
        unicode: bool,
    },
    /// The process exited.
    ProcessExited
    {
        /// Process exit code.
        exit_code: u32,
    },
    /// A new thread started.
    ThreadCreated
    {
        /// Handle to the new thread.
        thread: OsHandle,
    },
    /// A thread exited.
    ThreadExited
    {
        /// Thread exit code.
        exit_code: u32,
    },
    /// A module was mapped into the process.
    ModuleLoaded
    {
        /// Load address of the module.
        base: Address,
        /// Address of a pointer to the module name (may be null).
        image_name: Address,
        /// Whether the module name is UTF-16.
        unicode: bool,
    },
    /// A module was unmapped.
    ModuleUnloaded
    {
        /// Former load address.
        base: Address,
    },
    /// The target raised an exception.
    Exception
    {
        /// OS exception code (`NTSTATUS`).
        code: u32,
        /// Faulting address.
        address: Address,
        /// Whether the target's own handlers have not seen it yet.
        first_chance: bool,
    },
    /// The target called `OutputDebugString`.
    DebugString
    {
        /// Address of the string data.
        address: Address,
        /// Whether the string is UTF-16.
        unicode: bool,
        /// Length reported by the OS, in code units.
        length: u16,
    },
    /// An event code the backend does not recognise.
    Unknown
    {
        /// Raw event code.
        code: u32,
    },
}

impl DebugEventKind
{
    /// OS name of the event code, for diagnostics.
    pub fn name(&self) -> &'static str
    {
        match self {
            DebugEventKind::ProcessCreated { .. } => "CREATE_PROCESS_DEBUG_EVENT",
            DebugEventKind::ProcessExited { .. } => "EXIT_PROCESS_DEBUG_EVENT",
            DebugEventKind::ThreadCreated { .. } => "CREATE_THREAD_DEBUG_EVENT",
            DebugEventKind::ThreadExited { .. } => "EXIT_THREAD_DEBUG_EVENT",
            DebugEventKind::ModuleLoaded { .. } => "LOAD_DLL_DEBUG_EVENT",
            DebugEventKind::ModuleUnloaded { .. } => "UNLOAD_DLL_DEBUG_EVENT",
            DebugEventKind::Exception { .. } => "EXCEPTION_DEBUG_EVENT",
            DebugEventKind::DebugString { .. } => "OUTPUT_DEBUG_STRING_EVENT",
            DebugEventKind::Unknown { .. } => "UNKNOWN_DEBUG_EVENT",
        }
    }
}

/// Everything `CreateProcess` needs, already in OS-native form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest
{
    /// Native path of the executable (used for diagnostics).
    pub program: String,
    /// Full command line: native path, a space, then the verbatim arguments.
    pub command_line: String,
    /// `NAME=value` entries, in order.
    pub environment: Vec<String>,
    /// Give the target its own console window.
    pub new_console: bool,
    /// Put the target in a new process group.
    pub new_process_group: bool,
}

/// Handles and ids returned by a successful process creation
///
/// The handles belong to the debugger and must be closed on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedProcess
{
    /// Process handle.
    pub process: OsHandle,
    /// Initial thread handle.
    pub thread: OsHandle,
    /// Process id.
    pub process_id: ProcessId,
    /// Initial thread id.
    pub thread_id: ThreadId,
}

/// Kernel debugging operations used by the controller
///
/// Every method maps onto one OS call (see the module docs). Implementations
/// must not retry or add policy; the controller owns all policy.
pub trait DebugApi
{
    /// Start debugging an existing process.
    fn debug_active_process(&mut self, pid: ProcessId) -> Result<(), OsError>;

    /// Stop debugging a process without terminating it.
    fn debug_active_process_stop(&mut self, pid: ProcessId) -> Result<(), OsError>;

    /// Create a process suspended for debugging.
    fn create_process(&mut self, request: &LaunchRequest) -> Result<CreatedProcess, OsError>;

    /// Block until the next debug event. There is no timeout.
    fn wait_for_event(&mut self) -> Result<DebugEvent, OsError>;

    /// Acknowledge the last event reported for `pid`/`tid`.
    fn continue_event(&mut self, pid: ProcessId, tid: ThreadId, disposition: ContinueDisposition)
        -> Result<(), OsError>;

    /// Read target memory into `buf`; returns the number of bytes copied.
    /// Failures are reported as a short count, never as an error.
    fn read_process_memory(&self, process: OsHandle, address: Address, buf: &mut [u8]) -> usize;

    /// Write `data` into target memory; returns the number of bytes written.
    fn write_process_memory(&mut self, process: OsHandle, address: Address, data: &[u8]) -> usize;

    /// Invalidate the target's instruction cache over a range.
    fn flush_instruction_cache(&mut self, process: OsHandle, address: Address, len: usize) -> Result<(), OsError>;

    /// Fill the `groups` portion of `context` (a CONTEXT blob) from the thread.
    /// Bytes belonging to other groups are left untouched.
    fn get_thread_context(&self, thread: OsHandle, groups: RegisterGroups, context: &mut [u8]) -> Result<(), OsError>;

    /// Store the `groups` portion of `context` into the thread.
    fn set_thread_context(&mut self, thread: OsHandle, groups: RegisterGroups, context: &[u8]) -> Result<(), OsError>;

    /// Forcibly terminate a process.
    fn terminate_process(&mut self, process: OsHandle, exit_code: u32) -> Result<(), OsError>;

    /// Send a console control event to a process group (0 = whole console).
    fn generate_console_ctrl_event(&mut self, event: CtrlEvent, process_group: u32) -> Result<(), OsError>;

    /// Release a handle returned by [`DebugApi::create_process`].
    fn close_handle(&mut self, handle: OsHandle) -> Result<(), OsError>;
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_os_error_kind_from_code()
    {
        assert_eq!(OsErrorKind::from(5), OsErrorKind::AccessDenied);
        assert_eq!(OsErrorKind::from(87), OsErrorKind::InvalidParameter);
        assert_eq!(OsErrorKind::from(299), OsErrorKind::PartialCopy);
        assert_eq!(OsErrorKind::from(1234), OsErrorKind::Other(1234));
    }

    #[test]
    fn test_os_error_display_names_call_and_code()
    {
        let err = OsError::new("DebugActiveProcess", 5);
        let message = err.to_string();
        assert!(message.contains("DebugActiveProcess"));
        assert!(message.contains("access denied"));
    }

    #[test]
    fn test_check_reports_success()
    {
        assert!(check(Ok(())));
        assert!(!check(Err(OsError::new("ContinueDebugEvent", 6))));
    }
}
