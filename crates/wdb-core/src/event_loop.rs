//! # Debug Event Loop
//!
//! The blocking wait/translate/continue cycle that schedules the whole core.
//!
//! Each iteration blocks for the next kernel debug event (no timeout), records
//! the reporting process and thread as current, and dispatches on the event
//! kind. Only two outcomes leave the loop:
//!
//! - the process exited ([`WaitStatus::Exited`])
//! - an exception the debugger cares about ([`WaitStatus::Stopped`])
//!
//! Every other event is acknowledged and the loop waits again. An event that
//! is returned to the caller stays *pending*: it is acknowledged by the next
//! `resume`, `kill`, `detach` or `mourn`.
//!
//! ## References
//!
//! - [Writing the Debugger's Main Loop](https://learn.microsoft.com/en-us/windows/win32/debug/writing-the-debugger-s-main-loop)

use tracing::{debug, info, warn};

use crate::config::verbose;
use crate::error::Result;
use crate::events::DebuggerEvent;
use crate::exception::{self, Classification};
use crate::memory::{self, StringEncoding, MAX_DEBUG_STRING_BYTES};
use crate::modules::{self, ModuleLoad, ModuleLoadEvent};
use crate::os::{check, ContinueDisposition, DebugApi, DebugEvent, DebugEventKind};
use crate::paths::PathTranslator;
use crate::session::DebugSession;
use crate::symbols::SymbolLoader;
use crate::types::{Address, OsHandle, RegisterGroups, ThreadId, WaitStatus};

/// Block until the target stops or exits
///
/// ## Errors
///
/// - `Os`: waiting for the next event failed (for example, no debuggee)
pub fn wait<A: DebugApi + ?Sized>(
    session: &mut DebugSession,
    api: &mut A,
    symbols: &mut dyn SymbolLoader,
    paths: &dyn PathTranslator,
) -> Result<WaitStatus>
{
    loop {
        let event = api.wait_for_event()?;
        session.event_count += 1;
        session.current_process_id = event.process_id;
        session.current_thread_id = event.thread_id;
        session.pending_event = true;

        verbose!(
            session.config.verbosity.events,
            "wdb::events",
            "kernel event for pid={} tid={} code={}",
            event.process_id,
            event.thread_id,
            event.kind.name()
        );

        let disposition = match dispatch(session, api, symbols, paths, &event) {
            Step::Return(status) => return Ok(status),
            Step::Continue(disposition) => disposition,
        };

        verbose!(
            session.config.verbosity.exec,
            "wdb::exec",
            "ContinueDebugEvent (cpid={}, ctid={}, {:?})",
            event.process_id,
            event.thread_id,
            disposition
        );
        check(api.continue_event(event.process_id, event.thread_id, disposition));
        session.pending_event = false;
    }
}

enum Step
{
    Return(WaitStatus),
    Continue(ContinueDisposition),
}

fn dispatch<A: DebugApi + ?Sized>(
    session: &mut DebugSession,
    api: &mut A,
    symbols: &mut dyn SymbolLoader,
    paths: &dyn PathTranslator,
    event: &DebugEvent,
) -> Step
{
    let tid = event.thread_id;
    match event.kind {
        DebugEventKind::ProcessCreated {
            process,
            thread,
            image_base,
            ..
        } => {
            if let Some(target) = session.process.as_mut() {
                if target.process.is_null() {
                    target.process = process;
                }
                target.threads.insert(tid, thread);
            }
            debug!(pid = event.process_id.raw(), tid = tid.raw(), image_base = %image_base, "process created");
        }
        DebugEventKind::ThreadCreated { thread } => {
            if let Some(target) = session.process.as_mut() {
                target.threads.insert(tid, thread);
            }
        }
        DebugEventKind::ThreadExited { exit_code } => {
            if let Some(target) = session.process.as_mut() {
                target.threads.remove(&tid);
            }
            if session.registers.thread() == Some(tid) {
                session.registers.clear();
            }
            debug!(tid = tid.raw(), exit_code, "thread exited");
        }
        DebugEventKind::ProcessExited { exit_code } => {
            if let Some(target) = session.process.as_mut() {
                target.alive = false;
                target.close_owned_handles(api);
            }
            session.registers.clear();
            info!("Program exited with code {exit_code}");
            session.publish(DebuggerEvent::TargetExited { code: exit_code });
            return Step::Return(WaitStatus::Exited { code: exit_code });
        }
        DebugEventKind::ModuleLoaded {
            base,
            image_name,
            unicode,
        } => {
            let load = ModuleLoadEvent {
                process: process_handle(session),
                base,
                image_name,
                unicode,
            };
            let outcome = modules::notify_module_load(&*api, session.arch, paths, symbols, &mut session.modules, &load);
            if let ModuleLoad::Registered { path, base, .. } = outcome {
                session.publish(DebuggerEvent::ModuleLoaded { path, base });
            }
            session.registers.invalidate();
        }
        DebugEventKind::ModuleUnloaded { base } => {
            debug!(base = %base, "module unloaded");
        }
        DebugEventKind::Exception {
            code,
            address,
            first_chance,
        } => {
            let classification =
                exception::classify(code, address, first_chance, session.config.verbosity.exceptions);
            session.exception_count += 1;
            match classification {
                Classification::Stop(signal) => {
                    refresh_registers(session, api, tid);
                    session.publish(DebuggerEvent::TargetStopped { signal, thread: tid });
                    return Step::Return(WaitStatus::Stopped { signal });
                }
                Classification::PassToTarget => return Step::Continue(ContinueDisposition::ExceptionNotHandled),
            }
        }
        DebugEventKind::DebugString {
            address,
            unicode,
            length,
        } => {
            if let Some(text) = read_debug_string(session, &*api, address, unicode, length) {
                warn!("{text}");
                session.publish(DebuggerEvent::DebugOutput { text });
            }
        }
        DebugEventKind::Unknown { code } => {
            info!(
                "kernel event for pid={} tid={}: unknown event code {code}",
                event.process_id, event.thread_id
            );
        }
    }
    Step::Continue(ContinueDisposition::Continue)
}

fn process_handle(session: &DebugSession) -> OsHandle
{
    session.process.as_ref().map_or(OsHandle::NULL, |target| target.process)
}

/// Point the register cache at `tid` and pull a fresh context.
fn refresh_registers<A: DebugApi + ?Sized>(session: &mut DebugSession, api: &A, tid: ThreadId)
{
    let handle = session.process.as_ref().and_then(|target| target.thread_handle(tid));
    match handle {
        Some(handle) => {
            session.registers.select_thread(tid, handle);
            session.registers.refresh(api, RegisterGroups::ALL);
        }
        None => {
            warn!(tid = tid.raw(), "stop reported by unknown thread; registers unavailable");
            session.registers.clear();
        }
    }
}

fn read_debug_string<A: DebugApi + ?Sized>(
    session: &DebugSession,
    api: &A,
    address: Address,
    unicode: bool,
    length: u16,
) -> Option<String>
{
    if address.is_null() {
        return None;
    }
    let encoding = StringEncoding::from_unicode_flag(unicode);
    let mut max_units = MAX_DEBUG_STRING_BYTES / encoding.unit_size();
    if length > 0 {
        max_units = max_units.min(usize::from(length));
    }
    let text = memory::read_string(api, process_handle(session), address, encoding, max_units);
    let text = text.trim_end_matches(['\r', '\n']);
    (!text.is_empty()).then(|| text.to_string())
}
