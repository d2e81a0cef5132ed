//! Process, thread, handle, signal and wait-status types.

use std::fmt;

/// Process identifier as reported by the OS
///
/// Windows process ids are 32-bit values. The newtype keeps them from being
/// confused with thread ids, which share the same number space.
///
/// ## Example
///
/// ```rust
/// use wdb_core::types::ProcessId;
///
/// let pid = ProcessId::from(4242);
/// assert_eq!(u32::from(pid), 4242);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProcessId(pub u32);

impl ProcessId
{
    /// Raw process id.
    pub fn raw(self) -> u32
    {
        self.0
    }
}

impl From<u32> for ProcessId
{
    fn from(pid: u32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Thread identifier as reported in debug events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ThreadId(pub u32);

impl ThreadId
{
    /// Raw thread id.
    pub fn raw(self) -> u32
    {
        self.0
    }
}

impl From<u32> for ThreadId
{
    fn from(value: u32) -> Self
    {
        Self(value)
    }
}

impl fmt::Display for ThreadId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Opaque OS handle value (process, thread or file)
///
/// The core never dereferences handles; it only hands them back to the
/// [`DebugApi`](crate::os::DebugApi) that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsHandle(pub usize);

impl OsHandle
{
    /// The null handle.
    pub const NULL: Self = OsHandle(0);

    /// Whether the handle is null.
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }
}

/// Portable signal kind reported for a stop
///
/// The OS reports faults as numeric exception codes; the
/// [exception classifier](crate::exception) translates them into these
/// kinds so run-control code does not need to know OS-specific codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal
{
    /// Invalid memory access (access violation, stack overflow).
    Segv,
    /// Breakpoint or single-step trap.
    Trap,
    /// Console interrupt (Ctrl-C / Ctrl-Break).
    Int,
    /// An exception code the classifier has no mapping for.
    Unknown,
    /// A signal number supplied by a consumer. The native target cannot
    /// deliver these; see `resume`.
    Other(i32),
}

impl Signal
{
    /// Conventional short name, as printed by debuggers.
    pub fn name(self) -> &'static str
    {
        match self {
            Signal::Segv => "SIGSEGV",
            Signal::Trap => "SIGTRAP",
            Signal::Int => "SIGINT",
            Signal::Unknown => "unknown signal",
            Signal::Other(_) => "signal",
        }
    }
}

impl fmt::Display for Signal
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Signal::Other(n) => write!(f, "signal {n}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Result of [`Debugger::wait`](crate::Debugger::wait)
///
/// The event loop keeps waiting internally for events that are not visible to
/// the consumer, so only these two outcomes ever reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus
{
    /// The target stopped and is waiting to be resumed.
    Stopped
    {
        /// Portable reason for the stop.
        signal: Signal,
    },
    /// The target exited with the given exit code.
    Exited
    {
        /// Process exit code.
        code: u32,
    },
}

/// CPU architecture of the debug target
///
/// Selects the register mapping table and the pointer width used when
/// reading pointers out of the target's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 32-bit x86.
    X86,
    /// 64-bit x86 (AMD64).
    X86_64,
}

impl Architecture
{
    /// Architecture of the running debugger binary.
    ///
    /// The native backend can only debug processes matching this.
    pub const fn current() -> Self
    {
        #[cfg(target_arch = "x86")]
        {
            Architecture::X86
        }

        #[cfg(not(target_arch = "x86"))]
        {
            Architecture::X86_64
        }
    }

    /// Size of a target pointer in bytes.
    #[must_use]
    pub const fn pointer_size_bytes(self) -> usize
    {
        match self {
            Architecture::X86 => 4,
            Architecture::X86_64 => 8,
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::X86 => write!(f, "i386"),
            Architecture::X86_64 => write!(f, "x86_64"),
        }
    }
}
