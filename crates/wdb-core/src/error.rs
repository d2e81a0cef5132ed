//! # Error Types
//!
//! Errors returned by the controller to its consumer.
//!
//! Only failures that abort the *requested* operation surface here. OS calls
//! that are expected to succeed mid-session (acknowledging an event, closing a
//! handle) are reported through [`crate::os::check`] and never become a
//! `WdbError`, and module symbol failures are swallowed by the notifier.

use thiserror::Error;

use crate::os::{OsError, OsErrorKind};
use crate::types::Address;

/// Main error type for controller operations
///
/// ## Error Categories
///
/// 1. **Session setup**: AttachFailed, LaunchFailed, SessionActive
/// 2. **State errors**: NotAttached
/// 3. **Transfers**: ShortTransfer (only when a caller opts in with
///    [`Transfer::require_complete`](crate::memory::Transfer::require_complete))
/// 4. **Platform errors**: Os, Io
#[derive(Error, Debug)]
pub enum WdbError
{
    /// The OS refused to let us debug the process
    ///
    /// Typical causes:
    /// - The process is already being debugged
    /// - The caller lacks `SeDebugPrivilege` for a process owned by another user
    /// - The PID does not exist
    ///
    /// See: [DebugActiveProcess](https://learn.microsoft.com/en-us/windows/win32/api/debugapi/nf-debugapi-debugactiveprocess)
    #[error("Can't attach to process {pid}: {}", describe_attach_failure(.source))]
    AttachFailed
    {
        /// Target process id.
        pid: u32,
        /// The failing OS call.
        source: OsError,
    },

    /// Process creation failed, or the process died before its first event
    #[error("Error creating process {program}: {reason}")]
    LaunchFailed
    {
        /// Executable that was being launched.
        program: String,
        /// Human-readable reason.
        reason: String,
        /// OS error code when the failure came from the OS.
        os_code: Option<u32>,
    },

    /// Operation requires a live debug session
    ///
    /// ## Solution
    ///
    /// Call `attach(pid)` or `launch(...)` first.
    #[error("Not attached to a process")]
    NotAttached,

    /// A session is already live; only one target is debugged at a time.
    #[error("Already debugging process {0}")]
    SessionActive(u32),

    /// Invalid argument passed to a controller function.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A memory transfer moved fewer bytes than requested.
    #[error("Short transfer at {address}: {transferred} of {requested} bytes")]
    ShortTransfer
    {
        /// Start of the transfer.
        address: Address,
        /// Bytes requested.
        requested: usize,
        /// Bytes actually transferred.
        transferred: usize,
    },

    /// An OS call failed in a way the caller must see.
    #[error(transparent)]
    Os(#[from] OsError),

    /// I/O error (image files, log files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_attach_failure(source: &OsError) -> String
{
    match source.kind() {
        OsErrorKind::AccessDenied => {
            format!("permission denied (already debugged or missing debug privilege, error {})", source.code)
        }
        OsErrorKind::InvalidParameter => format!("no such process (error {})", source.code),
        _ => source.to_string(),
    }
}

/// Convenience type alias for `Result<T, WdbError>`
///
/// ```rust
/// use wdb_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, WdbError>;

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_attach_failed_access_denied_message()
    {
        let err = WdbError::AttachFailed {
            pid: 42,
            source: OsError::new("DebugActiveProcess", 5),
        };
        let message = err.to_string();
        assert!(message.starts_with("Can't attach to process 42"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn test_short_transfer_message()
    {
        let err = WdbError::ShortTransfer {
            address: Address::from(0x1000),
            requested: 8,
            transferred: 3,
        };
        assert_eq!(err.to_string(), "Short transfer at 0x00001000: 3 of 8 bytes");
    }
}
