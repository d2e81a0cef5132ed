//! # Debugger Trait
//!
//! The capability set the controller exposes to a run-control consumer.
//!
//! A consumer drives a target with a simple cycle:
//!
//! 1. `attach(pid)` or `launch(program, args, env)`
//! 2. `wait()` until the target stops or exits
//! 3. inspect and patch registers and memory
//! 4. `resume(step, None)` and go back to 2
//! 5. `mourn()` after an exit, or `kill()` / `detach()` to end early
//!
//! The controller is handed to the consumer by construction
//! ([`create_debugger`] or [`NativeProcessController::new`](crate::controller::NativeProcessController::new));
//! there is no global registration.
//!
//! ## Thread Safety
//!
//! The debugger is **not** thread-safe, and the OS requires that the thread
//! that created or attached to the target is the one that waits for its
//! events. Keep the debugger on one thread.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::events::DebuggerEventReceiver;
use crate::registers::RegisterLayout;
use crate::types::{Address, ProcessId, RegisterValue, Signal, ThreadId, WaitStatus};

/// Main debugger interface
pub trait Debugger
{
    /// Attach to a running process
    ///
    /// The target keeps running; the OS then reports its creation, its
    /// threads and modules, and finally a breakpoint exception, which
    /// [`Debugger::wait`] returns as a `SIGTRAP` stop.
    ///
    /// ## Errors
    ///
    /// - `SessionActive`: already debugging a process
    /// - `AttachFailed`: the OS refused (already debugged, insufficient
    ///   privilege, nonexistent pid)
    fn attach(&mut self, pid: ProcessId) -> Result<()>;

    /// Launch a new process under debugger control
    ///
    /// `args` is appended to the program path verbatim after one space, so it
    /// must already be quoted. `env` is passed through except `PATH`, which is
    /// converted to the native path-list convention. The initial creation stop
    /// is consumed and the target is resumed before this returns.
    ///
    /// ## Errors
    ///
    /// - `SessionActive`: already debugging a process
    /// - `LaunchFailed`: process creation failed, or the process exited
    ///   before it finished starting
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// use wdb_core::config::SessionConfig;
    /// use wdb_core::debugger::create_debugger;
    ///
    /// let mut debugger = create_debugger(SessionConfig::default())?;
    /// let env: Vec<(String, String)> = std::env::vars().collect();
    /// let pid = debugger.launch(r"C:\Windows\System32\notepad.exe", "", &env)?;
    /// println!("Launched process with PID: {pid}");
    /// # Ok::<(), wdb_core::error::WdbError>(())
    /// ```
    fn launch(&mut self, program: &str, args: &str, env: &[(String, String)]) -> Result<ProcessId>;

    /// Block until the target stops or exits. There is no timeout.
    fn wait(&mut self) -> Result<WaitStatus>;

    /// Resume the target, for one instruction when `step` is set
    ///
    /// Pending register stores are committed first. Signals cannot be
    /// delivered to a Windows process; passing one only logs a warning.
    fn resume(&mut self, step: bool, signal: Option<Signal>) -> Result<()>;

    /// Ask the target to stop
    ///
    /// Sends a console control event. The stop is observed on the next
    /// [`Debugger::wait`] as a `SIGINT`, not immediately.
    fn interrupt(&mut self) -> Result<()>;

    /// Terminate the target and end the session.
    fn kill(&mut self) -> Result<()>;

    /// Stop debugging but leave the target running.
    fn detach(&mut self) -> Result<()>;

    /// Finish the session after the target exited.
    fn mourn(&mut self) -> Result<()>;

    /// Read up to `len` bytes; the result holds only the bytes transferred.
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>;

    /// Write `data`; returns the bytes transferred.
    fn write_memory(&mut self, address: Address, data: &[u8]) -> Result<usize>;

    /// Value of register `index` in [`Debugger::register_layout`] numbering
    ///
    /// ## Panics
    ///
    /// If `index` is outside the register table.
    fn fetch_register(&mut self, index: usize) -> Result<RegisterValue>;

    /// Every register, in table order.
    fn fetch_registers(&mut self) -> Result<Vec<RegisterValue>>;

    /// Set register `index`; committed on the next resume.
    fn store_register(&mut self, index: usize, value: RegisterValue) -> Result<()>;

    /// Set every register, in table order; committed on the next resume.
    fn store_registers(&mut self, values: &[RegisterValue]) -> Result<()>;

    /// Register numbering used by the fetch and store calls.
    fn register_layout(&self) -> &'static RegisterLayout;

    /// Whether a session is live.
    fn is_attached(&self) -> bool;

    /// Process being debugged.
    fn process_id(&self) -> Option<ProcessId>;

    /// Thread that reported the last event.
    fn current_thread(&self) -> Option<ThreadId>;

    /// One-line description of the target.
    fn files_info(&self) -> Result<String>;

    /// Receive [`DebuggerEvent`](crate::events::DebuggerEvent)s from now on.
    fn subscribe(&mut self) -> DebuggerEventReceiver;
}

/// Create the native debugger for the current platform
///
/// ## Platform Support
///
/// - Windows: returns a [`NativeProcessController`](crate::controller::NativeProcessController)
///   over the Win32 debugging API
/// - Elsewhere: `InvalidArgument`
pub fn create_debugger(config: SessionConfig) -> Result<Box<dyn Debugger>>
{
    #[cfg(target_os = "windows")]
    {
        let api = crate::platform::windows::WindowsDebugApi::new();
        Ok(Box::new(crate::controller::NativeProcessController::new(api, config)))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let _ = config;
        Err(crate::error::WdbError::InvalidArgument(format!(
            "native debugging is not available on {}",
            std::env::consts::OS
        )))
    }
}
