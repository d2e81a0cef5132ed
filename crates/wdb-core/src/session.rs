//! # Debug Session State
//!
//! All mutable state of the one live debug session, owned by the controller
//! and passed by reference into the event loop and the run-control
//! operations. Nothing here is global.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::SessionConfig;
use crate::error::{Result, WdbError};
use crate::events::{DebuggerEvent, DebuggerEventSender};
use crate::modules::KnownModules;
use crate::os::{check, CreatedProcess, DebugApi};
use crate::registers::RegisterCache;
use crate::types::{Architecture, OsHandle, ProcessId, ThreadId};

/// The process being debugged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggedProcess
{
    /// Process id.
    pub pid: ProcessId,
    /// Process handle; null until the creation event arrives after an attach.
    pub process: OsHandle,
    /// Live threads and their handles.
    pub threads: BTreeMap<ThreadId, OsHandle>,
    /// Attached to an existing process rather than launched.
    pub attached: bool,
    /// Cleared once the exit event has been seen.
    pub alive: bool,
    /// Handles returned by process creation; ours to close.
    pub owned_handles: Vec<OsHandle>,
}

impl DebuggedProcess
{
    /// Process we attached to. Handles arrive with the creation event.
    pub fn attached(pid: ProcessId) -> Self
    {
        Self {
            pid,
            process: OsHandle::NULL,
            threads: BTreeMap::new(),
            attached: true,
            alive: true,
            owned_handles: Vec::new(),
        }
    }

    /// Process we created.
    pub fn launched(created: &CreatedProcess) -> Self
    {
        let mut threads = BTreeMap::new();
        threads.insert(created.thread_id, created.thread);
        Self {
            pid: created.process_id,
            process: created.process,
            threads,
            attached: false,
            alive: true,
            owned_handles: vec![created.process, created.thread],
        }
    }

    /// Handle of thread `tid`, if known.
    pub fn thread_handle(&self, tid: ThreadId) -> Option<OsHandle>
    {
        self.threads.get(&tid).copied()
    }

    /// Close the handles we own. Safe to call more than once.
    pub fn close_owned_handles<A: DebugApi + ?Sized>(&mut self, api: &mut A)
    {
        for handle in self.owned_handles.drain(..) {
            check(api.close_handle(handle));
        }
    }
}

/// State of one debug session.
#[derive(Debug)]
pub struct DebugSession
{
    /// Options.
    pub config: SessionConfig,
    /// Target architecture.
    pub arch: Architecture,
    /// The live target, if any.
    pub process: Option<DebuggedProcess>,
    /// Process id of the last event.
    pub current_process_id: ProcessId,
    /// Thread id of the last event.
    pub current_thread_id: ThreadId,
    /// Register snapshot of the last stopped thread.
    pub registers: RegisterCache,
    /// Modules with symbols attributed.
    pub modules: KnownModules,
    /// Debug events received.
    pub event_count: u64,
    /// Exceptions classified.
    pub exception_count: u64,
    /// An event has been received and not yet acknowledged.
    pub pending_event: bool,
    publisher: Option<DebuggerEventSender>,
}

impl DebugSession
{
    /// Idle session.
    pub fn new(config: SessionConfig, arch: Architecture) -> Self
    {
        Self {
            config,
            arch,
            process: None,
            current_process_id: ProcessId::default(),
            current_thread_id: ThreadId::default(),
            registers: RegisterCache::new(arch),
            modules: KnownModules::new(),
            event_count: 0,
            exception_count: 0,
            pending_event: false,
            publisher: None,
        }
    }

    /// Start tracking `process`; counters and per-session tables are reset.
    pub fn begin(&mut self, process: DebuggedProcess)
    {
        self.current_process_id = process.pid;
        self.current_thread_id = process.threads.keys().next().copied().unwrap_or_default();
        self.process = Some(process);
        self.registers.clear();
        self.modules.clear();
        self.event_count = 0;
        self.exception_count = 0;
        self.pending_event = false;
    }

    /// Forget the target.
    pub fn end(&mut self)
    {
        if let Some(process) = self.process.take() {
            debug!(pid = process.pid.raw(), events = self.event_count, exceptions = self.exception_count, "session ended");
        }
        self.registers.clear();
        self.pending_event = false;
    }

    /// The live target.
    ///
    /// ## Errors
    ///
    /// - `NotAttached`: no session
    pub fn process(&self) -> Result<&DebuggedProcess>
    {
        self.process.as_ref().ok_or(WdbError::NotAttached)
    }

    /// The live target, mutably.
    pub fn process_mut(&mut self) -> Result<&mut DebuggedProcess>
    {
        self.process.as_mut().ok_or(WdbError::NotAttached)
    }

    /// Send future events to `sender`.
    pub fn set_publisher(&mut self, sender: DebuggerEventSender)
    {
        self.publisher = Some(sender);
    }

    /// Publish `event` if anyone is listening. A dropped receiver unsubscribes.
    pub fn publish(&mut self, event: DebuggerEvent)
    {
        if let Some(sender) = &self.publisher {
            if sender.send(event).is_err() {
                self.publisher = None;
            }
        }
    }
}
