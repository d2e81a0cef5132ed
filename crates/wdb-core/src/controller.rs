//! # Process Lifecycle Manager
//!
//! [`NativeProcessController`] implements [`Debugger`] on top of any
//! [`DebugApi`]. It owns the [`DebugSession`] and orchestrates the event loop,
//! the register cache, the memory bridge and the module notifier.
//!
//! ## Acknowledging events
//!
//! The OS suspends the whole target from the moment an event is delivered
//! until the debugger acknowledges it. `wait` leaves the event that stopped
//! it unacknowledged; exactly one of `resume`, `kill`, `detach` or `mourn`
//! acknowledges it later.

use tracing::{debug, info, warn};

use crate::config::{verbose, SessionConfig};
use crate::debugger::Debugger;
use crate::error::{Result, WdbError};
use crate::event_loop;
use crate::events::{event_channel, DebuggerEvent, DebuggerEventReceiver};
use crate::launch::{build_command_line, build_environment};
use crate::memory;
use crate::os::{check, ContinueDisposition, CtrlEvent, DebugApi, DebugEventKind, LaunchRequest};
use crate::paths::{NativePaths, PathTranslator};
use crate::registers::RegisterLayout;
use crate::session::{DebugSession, DebuggedProcess};
use crate::symbols::{ObjectSymbolLoader, SymbolLoader};
use crate::types::{Address, Architecture, ProcessId, RegisterValue, Signal, ThreadId, WaitStatus};

/// Upper bound on events drained while a killed process tears down.
pub const KILL_DRAIN_LIMIT: usize = 4096;

/// Native debugger over a [`DebugApi`] backend.
pub struct NativeProcessController<A: DebugApi>
{
    api: A,
    session: DebugSession,
    symbols: Box<dyn SymbolLoader>,
    paths: Box<dyn PathTranslator>,
}

impl<A: DebugApi> NativeProcessController<A>
{
    /// Controller for targets of the debugger's own architecture, with the
    /// `object`-based symbol loader and identity path translation.
    pub fn new(api: A, config: SessionConfig) -> Self
    {
        Self {
            api,
            session: DebugSession::new(config, Architecture::current()),
            symbols: Box::new(ObjectSymbolLoader::new()),
            paths: Box::new(NativePaths),
        }
    }

    /// Debug targets of `arch` instead.
    #[must_use]
    pub fn with_architecture(mut self, arch: Architecture) -> Self
    {
        self.session = DebugSession::new(self.session.config, arch);
        self
    }

    /// Use `symbols` for newly loaded modules.
    #[must_use]
    pub fn with_symbol_loader(mut self, symbols: Box<dyn SymbolLoader>) -> Self
    {
        self.symbols = symbols;
        self
    }

    /// Use `paths` for host/native path conversion.
    #[must_use]
    pub fn with_path_translator(mut self, paths: Box<dyn PathTranslator>) -> Self
    {
        self.paths = paths;
        self
    }

    /// The backend.
    pub fn api(&self) -> &A
    {
        &self.api
    }

    /// The backend, mutably.
    pub fn api_mut(&mut self) -> &mut A
    {
        &mut self.api
    }

    /// Session state.
    pub fn session(&self) -> &DebugSession
    {
        &self.session
    }

    /// Debug events received this session.
    pub fn event_count(&self) -> u64
    {
        self.session.event_count
    }

    /// Exceptions classified this session.
    pub fn exception_count(&self) -> u64
    {
        self.session.exception_count
    }

    fn ensure_idle(&self) -> Result<()>
    {
        match &self.session.process {
            Some(process) => Err(WdbError::SessionActive(process.pid.raw())),
            None => Ok(()),
        }
    }

    /// Acknowledge the pending event, if any. Returns whether the OS accepted it.
    fn acknowledge_pending(&mut self) -> bool
    {
        if !self.session.pending_event {
            return true;
        }
        let (pid, tid) = (self.session.current_process_id, self.session.current_thread_id);
        verbose!(
            self.session.config.verbosity.exec,
            "wdb::exec",
            "ContinueDebugEvent (cpid={pid}, ctid={tid}, Continue)"
        );
        self.session.pending_event = false;
        check(self.api.continue_event(pid, tid, ContinueDisposition::Continue))
    }

    fn close_owned_handles(&mut self)
    {
        if let Some(process) = self.session.process.as_mut() {
            process.close_owned_handles(&mut self.api);
        }
    }

    fn wait_inner(&mut self) -> Result<WaitStatus>
    {
        event_loop::wait(&mut self.session, &mut self.api, self.symbols.as_mut(), self.paths.as_ref())
    }
}

impl<A: DebugApi> Debugger for NativeProcessController<A>
{
    fn attach(&mut self, pid: ProcessId) -> Result<()>
    {
        self.ensure_idle()?;
        self.api
            .debug_active_process(pid)
            .map_err(|source| WdbError::AttachFailed { pid: pid.raw(), source })?;
        self.session.begin(DebuggedProcess::attached(pid));
        info!("Attaching to process {pid}");
        Ok(())
    }

    fn launch(&mut self, program: &str, args: &str, env: &[(String, String)]) -> Result<ProcessId>
    {
        self.ensure_idle()?;
        if program.is_empty() {
            return Err(WdbError::InvalidArgument("no executable specified".to_string()));
        }

        let native_program = self.paths.to_native_path(program);
        let request = LaunchRequest {
            command_line: build_command_line(&native_program, args),
            environment: build_environment(env, self.paths.as_ref()),
            program: native_program,
            new_console: self.session.config.new_console,
            new_process_group: self.session.config.new_process_group,
        };
        verbose!(
            self.session.config.verbosity.exec,
            "wdb::exec",
            "creating process: {}",
            request.command_line
        );

        let created = self.api.create_process(&request).map_err(|err| WdbError::LaunchFailed {
            program: program.to_string(),
            reason: err.to_string(),
            os_code: Some(err.code),
        })?;
        self.session.begin(DebuggedProcess::launched(&created));
        self.session.modules.insert(program, Address::NULL);
        debug!(pid = created.process_id.raw(), tid = created.thread_id.raw(), "process created");

        // Swallow the initial stop so the caller sees an initialised target.
        match self.wait_inner() {
            Ok(WaitStatus::Stopped { signal }) => debug!(%signal, "initial stop consumed"),
            Ok(WaitStatus::Exited { code }) => {
                let _ = self.mourn();
                return Err(WdbError::LaunchFailed {
                    program: program.to_string(),
                    reason: format!("process exited during startup with code {code}"),
                    os_code: None,
                });
            }
            Err(err) => {
                let _ = self.kill();
                return Err(err);
            }
        }

        self.resume(false, None)?;
        Ok(created.process_id)
    }

    fn wait(&mut self) -> Result<WaitStatus>
    {
        self.session.process()?;
        self.wait_inner()
    }

    fn resume(&mut self, step: bool, signal: Option<Signal>) -> Result<()>
    {
        let pid = self.session.process()?.pid;
        if let Some(signal) = signal {
            warn!("Can't send signals to the child ({signal} ignored)");
        }
        verbose!(
            self.session.config.verbosity.exec,
            "wdb::exec",
            "child_resume (pid={pid}, step={step})"
        );

        self.session.registers.prepare_resume(&mut self.api, step);
        self.acknowledge_pending();
        self.session.publish(DebuggerEvent::TargetResumed { step });
        Ok(())
    }

    fn interrupt(&mut self) -> Result<()>
    {
        let process = self.session.process()?;
        let (event, group) = if self.session.config.new_process_group && !process.attached {
            (CtrlEvent::CtrlBreak, process.pid.raw())
        } else {
            (CtrlEvent::CtrlC, 0)
        };
        verbose!(
            self.session.config.verbosity.exec,
            "wdb::exec",
            "sending {event:?} to process group {group}"
        );
        check(self.api.generate_console_ctrl_event(event, group));
        self.session.registers.invalidate();
        Ok(())
    }

    fn kill(&mut self) -> Result<()>
    {
        let process = self.session.process()?;
        if !process.alive {
            return self.mourn();
        }
        let handle = process.process;
        check(self.api.terminate_process(handle, 0));

        // Keep acknowledging until teardown completes or the stream dries up.
        for _ in 0..KILL_DRAIN_LIMIT {
            if !self.acknowledge_pending() {
                break;
            }
            let event = match self.api.wait_for_event() {
                Ok(event) => event,
                Err(err) => {
                    debug!(error = %err, "wait failed while draining killed process");
                    break;
                }
            };
            self.session.event_count += 1;
            self.session.current_process_id = event.process_id;
            self.session.current_thread_id = event.thread_id;
            self.session.pending_event = true;
            if let DebugEventKind::ProcessExited { exit_code } = event.kind {
                debug!(exit_code, "killed process exited");
                break;
            }
        }

        self.close_owned_handles();
        self.mourn()
    }

    fn detach(&mut self) -> Result<()>
    {
        let pid = self.session.process()?.pid;
        self.session.registers.prepare_resume(&mut self.api, false);
        self.acknowledge_pending();
        self.api.debug_active_process_stop(pid)?;
        self.close_owned_handles();
        info!("Detaching from process {pid}");
        self.session.end();
        Ok(())
    }

    fn mourn(&mut self) -> Result<()>
    {
        self.session.process()?;
        if self.session.pending_event {
            let (pid, tid) = (self.session.current_process_id, self.session.current_thread_id);
            // The target may already be gone; failure here is expected.
            if let Err(err) = self.api.continue_event(pid, tid, ContinueDisposition::Continue) {
                debug!(error = %err, "final acknowledge failed");
            }
            self.session.pending_event = false;
        }
        self.close_owned_handles();
        self.session.end();
        Ok(())
    }

    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>
    {
        let process = self.session.process()?.process;
        Ok(memory::read(&self.api, process, address, len, self.session.config.verbosity.memory))
    }

    fn write_memory(&mut self, address: Address, data: &[u8]) -> Result<usize>
    {
        let process = self.session.process()?.process;
        let transfer = memory::write(&mut self.api, process, address, data, self.session.config.verbosity.memory);
        Ok(transfer.transferred)
    }

    fn fetch_register(&mut self, index: usize) -> Result<RegisterValue>
    {
        self.session.process()?;
        self.session.registers.fetch(&self.api, index)
    }

    fn fetch_registers(&mut self) -> Result<Vec<RegisterValue>>
    {
        self.session.process()?;
        self.session.registers.fetch_all(&self.api)
    }

    fn store_register(&mut self, index: usize, value: RegisterValue) -> Result<()>
    {
        self.session.process()?;
        self.session.registers.store(&self.api, index, &value)
    }

    fn store_registers(&mut self, values: &[RegisterValue]) -> Result<()>
    {
        self.session.process()?;
        self.session.registers.store_all(&self.api, values)
    }

    fn register_layout(&self) -> &'static RegisterLayout
    {
        self.session.registers.layout()
    }

    fn is_attached(&self) -> bool
    {
        self.session.process.is_some()
    }

    fn process_id(&self) -> Option<ProcessId>
    {
        self.session.process.as_ref().map(|process| process.pid)
    }

    fn current_thread(&self) -> Option<ThreadId>
    {
        self.session.process.as_ref().map(|_| self.session.current_thread_id)
    }

    fn files_info(&self) -> Result<String>
    {
        let process = self.session.process()?;
        let kind = if process.attached { "attached" } else { "child" };
        Ok(format!("Using the running image of {kind} process {}.", process.pid))
    }

    fn subscribe(&mut self) -> DebuggerEventReceiver
    {
        let (sender, receiver) = event_channel();
        self.session.set_publisher(sender);
        receiver
    }
}
