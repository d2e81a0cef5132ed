//! Debugger event types and helpers.
//!
//! Front ends consume these events to report what the target did without
//! inspecting every [`WaitStatus`](crate::types::WaitStatus) themselves. The
//! controller publishes an event whenever a stop, exit, resume, module load
//! or debug string is observed, provided a receiver was obtained with
//! [`Debugger::subscribe`](crate::Debugger::subscribe).

use std::sync::mpsc;

use crate::types::{Address, Signal, ThreadId};

/// Event emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerEvent
{
    /// Target stopped and is waiting to be resumed.
    TargetStopped
    {
        /// Portable stop reason.
        signal: Signal,
        /// Thread that reported the stop.
        thread: ThreadId,
    },
    /// Target exited.
    TargetExited
    {
        /// Exit code.
        code: u32,
    },
    /// Target resumed execution.
    TargetResumed
    {
        /// Whether it was resumed for a single instruction.
        step: bool,
    },
    /// A new module was mapped and registered.
    ModuleLoaded
    {
        /// Host path of the module.
        path: String,
        /// Load base.
        base: Address,
    },
    /// The target called `OutputDebugString`.
    DebugOutput
    {
        /// The string.
        text: String,
    },
}

impl DebuggerEvent
{
    /// Human-readable description of the event.
    #[must_use]
    pub fn describe(&self) -> String
    {
        match self {
            Self::TargetStopped { signal, thread } => {
                format!("Program received signal {signal} (thread {})", thread.raw())
            }
            Self::TargetExited { code } => format!("Program exited with code {code}"),
            Self::TargetResumed { step: true } => "Target stepped one instruction".to_string(),
            Self::TargetResumed { step: false } => "Target resumed execution".to_string(),
            Self::ModuleLoaded { path, base } => format!("{base:x}:{path}"),
            Self::DebugOutput { text } => format!("debug output: {text}"),
        }
    }
}

/// Sender side of the debugger event channel.
pub type DebuggerEventSender = mpsc::Sender<DebuggerEvent>;
/// Receiver side of the debugger event channel.
pub type DebuggerEventReceiver = mpsc::Receiver<DebuggerEvent>;

/// Create a new debugger event channel.
#[must_use]
pub fn event_channel() -> (DebuggerEventSender, DebuggerEventReceiver)
{
    mpsc::channel()
}
