//! `DebugApi` over the Win32 debugging functions.

use std::ffi::c_void;
use std::mem::{size_of, zeroed};
use std::ptr::{null, null_mut};

use tracing::trace;
use windows_sys::Win32::Foundation::{CloseHandle, DBG_CONTINUE, DBG_EXCEPTION_NOT_HANDLED, HANDLE, TRUE};
use windows_sys::Win32::System::Console::{GenerateConsoleCtrlEvent, CTRL_BREAK_EVENT, CTRL_C_EVENT};
use windows_sys::Win32::System::Diagnostics::Debug::{
    ContinueDebugEvent, DebugActiveProcess, DebugActiveProcessStop, FlushInstructionCache, GetThreadContext,
    ReadProcessMemory, SetThreadContext, WaitForDebugEvent, WriteProcessMemory, CONTEXT, DEBUG_EVENT,
};
use windows_sys::Win32::System::Threading::{
    CreateProcessW, TerminateProcess, CREATE_NEW_CONSOLE, CREATE_NEW_PROCESS_GROUP, CREATE_UNICODE_ENVIRONMENT,
    DEBUG_ONLY_THIS_PROCESS, INFINITE, PROCESS_INFORMATION, STARTUPINFOW,
};

use super::{event, last_error, win32};
use crate::launch::{encode_environment_block, to_wide};
use crate::os::{ContinueDisposition, CreatedProcess, CtrlEvent, DebugApi, DebugEvent, LaunchRequest, OsError};
use crate::registers::RegisterLayout;
use crate::types::{Address, Architecture, OsHandle, ProcessId, RegisterGroups, ThreadId};

fn raw_handle(handle: OsHandle) -> HANDLE
{
    handle.0 as HANDLE
}

fn remote(address: Address) -> *const c_void
{
    address.value() as usize as *const c_void
}

/// Win32 implementation of [`DebugApi`] for targets of the debugger's own
/// architecture.
#[derive(Debug)]
pub struct WindowsDebugApi
{
    layout: &'static RegisterLayout,
}

impl Default for WindowsDebugApi
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl WindowsDebugApi
{
    /// Backend for the current architecture.
    pub fn new() -> Self
    {
        Self {
            layout: RegisterLayout::for_arch(Architecture::current()),
        }
    }

    fn read_context(&self, thread: OsHandle, groups: RegisterGroups) -> Result<CONTEXT, OsError>
    {
        // SAFETY: CONTEXT is plain data; all-zero is a valid value.
        let mut context: CONTEXT = unsafe { zeroed() };
        context.ContextFlags = self.layout.os_context_flags(groups);
        // SAFETY: `context` is a properly aligned CONTEXT that outlives the call.
        win32("GetThreadContext", unsafe { GetThreadContext(raw_handle(thread), &mut context) })?;
        Ok(context)
    }
}

fn context_bytes(context: &CONTEXT) -> &[u8]
{
    // SAFETY: CONTEXT is repr(C) plain data with no padding-sensitive invariants.
    unsafe { std::slice::from_raw_parts((context as *const CONTEXT).cast::<u8>(), size_of::<CONTEXT>()) }
}

fn context_bytes_mut(context: &mut CONTEXT) -> &mut [u8]
{
    // SAFETY: as above; every byte pattern is a valid CONTEXT.
    unsafe { std::slice::from_raw_parts_mut((context as *mut CONTEXT).cast::<u8>(), size_of::<CONTEXT>()) }
}

impl DebugApi for WindowsDebugApi
{
    fn debug_active_process(&mut self, pid: ProcessId) -> Result<(), OsError>
    {
        // SAFETY: plain Win32 call with a value argument.
        win32("DebugActiveProcess", unsafe { DebugActiveProcess(pid.raw()) })
    }

    fn debug_active_process_stop(&mut self, pid: ProcessId) -> Result<(), OsError>
    {
        // SAFETY: plain Win32 call with a value argument.
        win32("DebugActiveProcessStop", unsafe { DebugActiveProcessStop(pid.raw()) })
    }

    fn create_process(&mut self, request: &LaunchRequest) -> Result<CreatedProcess, OsError>
    {
        let mut command_line = to_wide(&request.command_line);
        let environment = encode_environment_block(&request.environment);
        // An empty list means "inherit ours" rather than an empty block.
        let environment_ptr: *const c_void = if request.environment.is_empty() {
            null()
        } else {
            environment.as_ptr().cast()
        };

        let mut flags = DEBUG_ONLY_THIS_PROCESS | CREATE_UNICODE_ENVIRONMENT;
        if request.new_process_group {
            flags |= CREATE_NEW_PROCESS_GROUP;
        }
        if request.new_console {
            flags |= CREATE_NEW_CONSOLE;
        }

        // SAFETY: plain data structures; zero is the documented initial state.
        let mut startup: STARTUPINFOW = unsafe { zeroed() };
        startup.cb = size_of::<STARTUPINFOW>() as u32;
        // SAFETY: as above.
        let mut info: PROCESS_INFORMATION = unsafe { zeroed() };

        trace!(command_line = %request.command_line, flags, "CreateProcessW");
        // SAFETY: the command line is a writable NUL-terminated UTF-16 buffer,
        // the environment block is double-NUL terminated, and every pointer
        // outlives the call.
        let ok = unsafe {
            CreateProcessW(
                null(),
                command_line.as_mut_ptr(),
                null(),
                null(),
                TRUE,
                flags,
                environment_ptr,
                null(),
                &startup,
                &mut info,
            )
        };
        win32("CreateProcessW", ok)?;

        Ok(CreatedProcess {
            process: OsHandle(info.hProcess as usize),
            thread: OsHandle(info.hThread as usize),
            process_id: ProcessId(info.dwProcessId),
            thread_id: ThreadId(info.dwThreadId),
        })
    }

    fn wait_for_event(&mut self) -> Result<DebugEvent, OsError>
    {
        // SAFETY: DEBUG_EVENT is plain data.
        let mut raw: DEBUG_EVENT = unsafe { zeroed() };
        // SAFETY: `raw` outlives the call.
        win32("WaitForDebugEvent", unsafe { WaitForDebugEvent(&mut raw, INFINITE) })?;
        // SAFETY: the wait succeeded, so the event is fully initialised.
        Ok(unsafe { event::translate(&raw) })
    }

    fn continue_event(&mut self, pid: ProcessId, tid: ThreadId, disposition: ContinueDisposition)
        -> Result<(), OsError>
    {
        let status = match disposition {
            ContinueDisposition::Continue => DBG_CONTINUE,
            ContinueDisposition::ExceptionNotHandled => DBG_EXCEPTION_NOT_HANDLED,
        };
        // SAFETY: plain Win32 call with value arguments.
        win32("ContinueDebugEvent", unsafe { ContinueDebugEvent(pid.raw(), tid.raw(), status) })
    }

    fn read_process_memory(&self, process: OsHandle, address: Address, buf: &mut [u8]) -> usize
    {
        let mut done = 0usize;
        // SAFETY: `buf` is writable for `buf.len()` bytes; the remote range is
        // validated by the kernel.
        let ok = unsafe {
            ReadProcessMemory(raw_handle(process), remote(address), buf.as_mut_ptr().cast(), buf.len(), &mut done)
        };
        if ok == 0 {
            trace!(error = %last_error("ReadProcessMemory"), address = %address, done, "short read");
        }
        done
    }

    fn write_process_memory(&mut self, process: OsHandle, address: Address, data: &[u8]) -> usize
    {
        let mut done = 0usize;
        // SAFETY: `data` is readable for `data.len()` bytes; the remote range is
        // validated by the kernel.
        let ok = unsafe {
            WriteProcessMemory(raw_handle(process), remote(address), data.as_ptr().cast(), data.len(), &mut done)
        };
        if ok == 0 {
            trace!(error = %last_error("WriteProcessMemory"), address = %address, done, "short write");
        }
        done
    }

    fn flush_instruction_cache(&mut self, process: OsHandle, address: Address, len: usize) -> Result<(), OsError>
    {
        // SAFETY: plain Win32 call; the range is only used as a hint.
        win32("FlushInstructionCache", unsafe {
            FlushInstructionCache(raw_handle(process), remote(address), len)
        })
    }

    fn get_thread_context(&self, thread: OsHandle, groups: RegisterGroups, context: &mut [u8]) -> Result<(), OsError>
    {
        let fetched = self.read_context(thread, groups)?;
        let raw = context_bytes(&fetched);
        for range in self.layout.group_ranges(groups) {
            if let (Some(dst), Some(src)) = (context.get_mut(range.clone()), raw.get(range)) {
                dst.copy_from_slice(src);
            }
        }
        Ok(())
    }

    fn set_thread_context(&mut self, thread: OsHandle, groups: RegisterGroups, context: &[u8]) -> Result<(), OsError>
    {
        // Start from the live context so state we do not model (vector
        // registers, MXCSR) is written back unchanged.
        let mut merged = self.read_context(thread, groups)?;
        {
            let raw = context_bytes_mut(&mut merged);
            for range in self.layout.group_ranges(groups) {
                if let (Some(dst), Some(src)) = (raw.get_mut(range.clone()), context.get(range)) {
                    dst.copy_from_slice(src);
                }
            }
        }
        merged.ContextFlags = self.layout.os_context_flags(groups);
        // SAFETY: `merged` is a properly aligned CONTEXT that outlives the call.
        win32("SetThreadContext", unsafe { SetThreadContext(raw_handle(thread), &merged) })
    }

    fn terminate_process(&mut self, process: OsHandle, exit_code: u32) -> Result<(), OsError>
    {
        // SAFETY: plain Win32 call with a handle we were given by the kernel.
        win32("TerminateProcess", unsafe { TerminateProcess(raw_handle(process), exit_code) })
    }

    fn generate_console_ctrl_event(&mut self, event: CtrlEvent, process_group: u32) -> Result<(), OsError>
    {
        let code = match event {
            CtrlEvent::CtrlC => CTRL_C_EVENT,
            CtrlEvent::CtrlBreak => CTRL_BREAK_EVENT,
        };
        // SAFETY: plain Win32 call with value arguments.
        win32("GenerateConsoleCtrlEvent", unsafe { GenerateConsoleCtrlEvent(code, process_group) })
    }

    fn close_handle(&mut self, handle: OsHandle) -> Result<(), OsError>
    {
        if handle.is_null() {
            return Ok(());
        }
        // SAFETY: the handle came from CreateProcessW and is closed once.
        win32("CloseHandle", unsafe { CloseHandle(raw_handle(handle)) })
    }
}
