//! `DEBUG_EVENT` translation.

use std::ffi::c_void;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
use windows_sys::Win32::System::Diagnostics::Debug::{
    CREATE_PROCESS_DEBUG_EVENT, CREATE_THREAD_DEBUG_EVENT, DEBUG_EVENT, EXCEPTION_DEBUG_EVENT, EXIT_PROCESS_DEBUG_EVENT,
    EXIT_THREAD_DEBUG_EVENT, LOAD_DLL_DEBUG_EVENT, OUTPUT_DEBUG_STRING_EVENT, UNLOAD_DLL_DEBUG_EVENT,
};

use crate::os::{DebugEvent, DebugEventKind};
use crate::types::{Address, OsHandle, ProcessId, ThreadId};

fn address(ptr: *const c_void) -> Address
{
    Address::from(ptr as usize as u64)
}

fn handle(raw: HANDLE) -> OsHandle
{
    OsHandle(raw as usize)
}

fn close_file(raw: HANDLE)
{
    if !raw.is_null() {
        // SAFETY: the kernel handed us this file handle and nothing else
        // references it.
        unsafe { CloseHandle(raw) };
    }
}

/// Convert a raw event, releasing the file handles it carries.
///
/// ## Safety
///
/// `raw` must have been filled in by a successful `WaitForDebugEvent`, so the
/// union member selected by `dwDebugEventCode` is the initialised one.
pub(super) unsafe fn translate(raw: &DEBUG_EVENT) -> DebugEvent
{
    let kind = match raw.dwDebugEventCode {
        CREATE_PROCESS_DEBUG_EVENT => {
            let info = unsafe { &raw.u.CreateProcessInfo };
            close_file(info.hFile);
            DebugEventKind::ProcessCreated {
                process: handle(info.hProcess),
                thread: handle(info.hThread),
                image_base: address(info.lpBaseOfImage),
                image_name: address(info.lpImageName),
                unicode: info.fUnicode != 0,
            }
        }
        EXIT_PROCESS_DEBUG_EVENT => DebugEventKind::ProcessExited {
            exit_code: unsafe { raw.u.ExitProcess.dwExitCode },
        },
        CREATE_THREAD_DEBUG_EVENT => DebugEventKind::ThreadCreated {
            thread: handle(unsafe { raw.u.CreateThread.hThread }),
        },
        EXIT_THREAD_DEBUG_EVENT => DebugEventKind::ThreadExited {
            exit_code: unsafe { raw.u.ExitThread.dwExitCode },
        },
        LOAD_DLL_DEBUG_EVENT => {
            let info = unsafe { &raw.u.LoadDll };
            close_file(info.hFile);
            DebugEventKind::ModuleLoaded {
                base: address(info.lpBaseOfDll),
                image_name: address(info.lpImageName),
                unicode: info.fUnicode != 0,
            }
        }
        UNLOAD_DLL_DEBUG_EVENT => DebugEventKind::ModuleUnloaded {
            base: address(unsafe { raw.u.UnloadDll.lpBaseOfDll }),
        },
        EXCEPTION_DEBUG_EVENT => {
            let info = unsafe { &raw.u.Exception };
            DebugEventKind::Exception {
                code: info.ExceptionRecord.ExceptionCode as u32,
                address: address(info.ExceptionRecord.ExceptionAddress),
                first_chance: info.dwFirstChance != 0,
            }
        }
        OUTPUT_DEBUG_STRING_EVENT => {
            let info = unsafe { &raw.u.DebugString };
            DebugEventKind::DebugString {
                address: address(info.lpDebugStringData as *const c_void),
                unicode: info.fUnicode != 0,
                length: info.nDebugStringLength,
            }
        }
        code => DebugEventKind::Unknown { code },
    };

    DebugEvent {
        process_id: ProcessId(raw.dwProcessId),
        thread_id: ThreadId(raw.dwThreadId),
        kind,
    }
}
