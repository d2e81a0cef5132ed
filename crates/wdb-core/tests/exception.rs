//! Exception classification as seen through `wait`.

mod common;

use common::{exception, exited, launched, PID, TID};
use wdb_core::exception::{EXCEPTION_ACCESS_VIOLATION, EXCEPTION_ILLEGAL_INSTRUCTION, EXCEPTION_SINGLE_STEP};
use wdb_core::os::ContinueDisposition;
use wdb_core::types::WaitStatus;
use wdb_core::{Debugger, Signal};

#[test]
fn test_access_violation_stops_on_first_and_second_chance()
{
    let (mut debugger, _) = launched(|api| {
        api.push(exception(EXCEPTION_ACCESS_VIOLATION, 0xDEAD_BEEF, true));
        api.push(exception(EXCEPTION_ACCESS_VIOLATION, 0xDEAD_BEEF, false));
    });

    assert_eq!(debugger.wait().unwrap(), WaitStatus::Stopped { signal: Signal::Segv });
    debugger.resume(false, None).unwrap();
    assert_eq!(debugger.wait().unwrap(), WaitStatus::Stopped { signal: Signal::Segv });
}

#[test]
fn test_unknown_first_chance_is_passed_to_target()
{
    let (mut debugger, _) = launched(|api| {
        api.push(exception(EXCEPTION_ILLEGAL_INSTRUCTION, 0x1_4000_2000, true));
        api.push(exception(EXCEPTION_SINGLE_STEP, 0x1_4000_2004, true));
    });
    let before = debugger.api().continues.len();

    assert_eq!(debugger.wait().unwrap(), WaitStatus::Stopped { signal: Signal::Trap });
    let continues = &debugger.api().continues[before..];
    assert_eq!(continues, &[(PID, TID, ContinueDisposition::ExceptionNotHandled)]);
}

#[test]
fn test_unknown_second_chance_stops_with_unknown_signal()
{
    let (mut debugger, _) = launched(|api| {
        api.push(exception(EXCEPTION_ILLEGAL_INSTRUCTION, 0x1_4000_2000, true));
        api.push(exception(EXCEPTION_ILLEGAL_INSTRUCTION, 0x1_4000_2000, false));
    });
    assert_eq!(debugger.wait().unwrap(), WaitStatus::Stopped { signal: Signal::Unknown });
}

#[test]
fn test_unhandled_fault_then_exit()
{
    let (mut debugger, _) = launched(|api| {
        api.push(exception(0xC000_0094, 0x1_4000_3000, true));
        api.push(exited(0xC000_0094));
    });
    assert_eq!(debugger.wait().unwrap(), WaitStatus::Exited { code: 0xC000_0094 });
}

#[test]
fn test_every_classified_exception_is_counted()
{
    let (mut debugger, _) = launched(|api| {
        api.push(exception(EXCEPTION_ILLEGAL_INSTRUCTION, 0x1_4000_2000, true));
        api.push(exception(EXCEPTION_ACCESS_VIOLATION, 0x0, true));
    });
    // The launch's initial breakpoint was counted too.
    assert_eq!(debugger.exception_count(), 1);
    debugger.wait().unwrap();
    assert_eq!(debugger.exception_count(), 3);
}
