//! # Exception Classifier
//!
//! Translates OS exception codes (`NTSTATUS` values) into portable [`Signal`]s
//! and decides whether the debugger should stop for them.
//!
//! ## Policy
//!
//! - A code found in [`EXCEPTION_TABLE`] always stops, first or second chance.
//! - A code not in the table is handed back to the target on first chance, so
//!   exceptions the program handles itself (structured exception handling,
//!   language runtimes) cause no spurious stops.
//! - The same unknown code on second chance stops with [`Signal::Unknown`].
//!
//! ## References
//!
//! - [EXCEPTION_RECORD](https://learn.microsoft.com/en-us/windows/win32/api/winnt/ns-winnt-exception_record)
//! - [Debugger exception handling](https://learn.microsoft.com/en-us/windows/win32/debug/debugger-exception-handling)

use tracing::warn;

use crate::config::verbose;
use crate::types::{Address, Signal};

/// `EXCEPTION_ACCESS_VIOLATION`
pub const EXCEPTION_ACCESS_VIOLATION: u32 = 0xC000_0005;
/// `STATUS_STACK_OVERFLOW`
pub const STATUS_STACK_OVERFLOW: u32 = 0xC000_00FD;
/// `EXCEPTION_BREAKPOINT`
pub const EXCEPTION_BREAKPOINT: u32 = 0x8000_0003;
/// `EXCEPTION_SINGLE_STEP`
pub const EXCEPTION_SINGLE_STEP: u32 = 0x8000_0004;
/// `DBG_CONTROL_C`
pub const DBG_CONTROL_C: u32 = 0x4001_0005;
/// `DBG_CONTROL_BREAK`
pub const DBG_CONTROL_BREAK: u32 = 0x4001_0008;
/// `EXCEPTION_ILLEGAL_INSTRUCTION` (not in the table)
pub const EXCEPTION_ILLEGAL_INSTRUCTION: u32 = 0xC000_001D;

/// One row of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionEntry
{
    /// OS exception code.
    pub code: u32,
    /// Symbolic name, for diagnostics.
    pub name: &'static str,
    /// Portable signal reported for the code.
    pub signal: Signal,
}

/// Exceptions the debugger always stops for. Searched linearly, first match
/// wins.
pub static EXCEPTION_TABLE: &[ExceptionEntry] = &[
    ExceptionEntry {
        code: EXCEPTION_ACCESS_VIOLATION,
        name: "ACCESS_VIOLATION",
        signal: Signal::Segv,
    },
    ExceptionEntry {
        code: STATUS_STACK_OVERFLOW,
        name: "STACK_OVERFLOW",
        signal: Signal::Segv,
    },
    ExceptionEntry {
        code: EXCEPTION_BREAKPOINT,
        name: "BREAKPOINT",
        signal: Signal::Trap,
    },
    ExceptionEntry {
        code: DBG_CONTROL_C,
        name: "CONTROL_C",
        signal: Signal::Int,
    },
    ExceptionEntry {
        code: DBG_CONTROL_BREAK,
        name: "CONTROL_BREAK",
        signal: Signal::Int,
    },
    ExceptionEntry {
        code: EXCEPTION_SINGLE_STEP,
        name: "SINGLE_STEP",
        signal: Signal::Trap,
    },
];

/// Outcome of classifying one exception event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification
{
    /// Stop and report `signal` to the consumer.
    Stop(Signal),
    /// Not interesting: continue with "not handled" so the target's own
    /// handlers run.
    PassToTarget,
}

impl Classification
{
    /// Whether the debugger stops.
    pub fn is_stop(self) -> bool
    {
        matches!(self, Classification::Stop(_))
    }
}

/// Table entry for `code`.
pub fn lookup(code: u32) -> Option<&'static ExceptionEntry>
{
    EXCEPTION_TABLE.iter().find(|entry| entry.code == code)
}

/// Classify an exception event
///
/// `verbose` raises the per-exception trace line to `info`. Unknown
/// second-chance codes are always echoed as a warning.
///
/// ## Example
///
/// ```rust
/// use wdb_core::exception::{classify, Classification, EXCEPTION_ACCESS_VIOLATION};
/// use wdb_core::types::{Address, Signal};
///
/// let at = Address::from(0xDEAD_BEEF);
/// assert_eq!(classify(EXCEPTION_ACCESS_VIOLATION, at, true, false), Classification::Stop(Signal::Segv));
/// assert_eq!(classify(0xE06D_7363, at, true, false), Classification::PassToTarget);
/// assert_eq!(classify(0xE06D_7363, at, false, false), Classification::Stop(Signal::Unknown));
/// ```
pub fn classify(code: u32, address: Address, first_chance: bool, verbose: bool) -> Classification
{
    match lookup(code) {
        Some(entry) => {
            verbose!(verbose, "wdb::exceptions", "Target exception {} at {}", entry.name, address);
            Classification::Stop(entry.signal)
        }
        None if first_chance => {
            verbose!(
                verbose,
                "wdb::exceptions",
                "first chance exception 0x{code:08x} at {address} passed to target"
            );
            Classification::PassToTarget
        }
        None => {
            warn!("unknown target exception 0x{code:08x} at {address}");
            Classification::Stop(Signal::Unknown)
        }
    }
}
