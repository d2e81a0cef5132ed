//! Tests for error handling

use wdb_core::error::{Result, WdbError};
use wdb_core::memory::Transfer;
use wdb_core::os::{OsError, OsErrorKind};
use wdb_core::types::Address;

#[test]
fn test_os_error_kinds()
{
    assert_eq!(OsError::new("ReadProcessMemory", 299).kind(), OsErrorKind::PartialCopy);
    assert_eq!(OsError::new("DebugActiveProcess", 5).kind(), OsErrorKind::AccessDenied);
    assert_eq!(OsError::new("DebugActiveProcess", 87).kind(), OsErrorKind::InvalidParameter);
    assert_eq!(OsError::new("CloseHandle", 6).kind(), OsErrorKind::Other(6));
}

#[test]
fn test_attach_failure_for_missing_process()
{
    let err = WdbError::AttachFailed {
        pid: 99999,
        source: OsError::new("DebugActiveProcess", 87),
    };
    assert_eq!(err.to_string(), "Can't attach to process 99999: no such process (error 87)");
}

#[test]
fn test_launch_failure_message()
{
    let err = WdbError::LaunchFailed {
        program: r"C:\missing.exe".to_string(),
        reason: "file not found".to_string(),
        os_code: Some(2),
    };
    assert_eq!(err.to_string(), r"Error creating process C:\missing.exe: file not found");
}

#[test]
fn test_os_error_converts_transparently()
{
    let os = OsError::new("WaitForDebugEvent", 6);
    let err: WdbError = os.into();
    assert_eq!(err.to_string(), os.to_string());
    assert!(matches!(err, WdbError::Os(inner) if inner.call == "WaitForDebugEvent"));
}

#[test]
fn test_short_transfer_is_opt_in()
{
    let short = Transfer {
        requested: 8,
        transferred: 2,
    };
    assert!(!short.is_complete());
    let err = short.require_complete(Address::from(0x4000)).unwrap_err();
    assert!(matches!(
        err,
        WdbError::ShortTransfer {
            requested: 8,
            transferred: 2,
            ..
        }
    ));
}

#[test]
fn test_result_type()
{
    fn lookup(attached: bool) -> Result<u32>
    {
        if attached {
            Ok(1)
        } else {
            Err(WdbError::NotAttached)
        }
    }

    assert_eq!(lookup(true).unwrap(), 1);
    assert_eq!(lookup(false).unwrap_err().to_string(), "Not attached to a process");
}
