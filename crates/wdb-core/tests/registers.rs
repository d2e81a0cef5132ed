//! Register cache behaviour through the controller.

mod common;

use common::{breakpoint, exception, launched, THREAD};
use wdb_core::exception::EXCEPTION_ACCESS_VIOLATION;
use wdb_core::os::DebugEventKind;
use wdb_core::registers::TRAP_FLAG;
use wdb_core::types::{OsHandle, RegisterGroups, RegisterValue, ThreadId, WaitStatus};
use wdb_core::{Debugger, Signal, WdbError};

/// First stop on the main thread with a known `rax`, then a fault on a new
/// thread whose context cannot be read.
fn stopped_on_unreadable_thread() -> common::Controller
{
    let worker = ThreadId(2002);
    let (mut debugger, _) = launched(|api| {
        api.set_register(THREAD, "rax", 0x1111);
        api.push(breakpoint());
        api.push_from(worker, DebugEventKind::ThreadCreated {
            thread: OsHandle(0x200),
        });
        api.push_from(worker, exception(EXCEPTION_ACCESS_VIOLATION, 0xDEAD_BEEF, true));
    });
    debugger.wait().unwrap();
    let rax = debugger.register_layout().index_of("rax").unwrap();
    assert_eq!(debugger.fetch_register(rax).unwrap().as_u64(), 0x1111);
    debugger.resume(false, None).unwrap();
    assert_eq!(debugger.wait().unwrap(), WaitStatus::Stopped { signal: Signal::Segv });
    debugger
}

fn pattern(index: usize, size: usize) -> RegisterValue
{
    let bytes: Vec<u8> = (0..size).map(|i| (index * 16 + i + 1) as u8).collect();
    RegisterValue::from_bytes(&bytes)
}

#[test]
fn test_store_then_fetch_returns_stored_value_for_every_register()
{
    let (mut debugger, _) = launched(|api| {
        api.push(breakpoint());
    });
    assert_eq!(debugger.wait().unwrap(), WaitStatus::Stopped { signal: Signal::Trap });

    let layout = debugger.register_layout();
    for (index, mapping) in layout.registers.iter().enumerate() {
        let value = pattern(index, mapping.size);
        debugger.store_register(index, value.clone()).unwrap();
        assert_eq!(debugger.fetch_register(index).unwrap(), value, "register {}", mapping.name);
    }
}

#[test]
fn test_fetch_uses_snapshot_taken_at_stop()
{
    let (mut debugger, _) = launched(|api| {
        api.set_register(THREAD, "rip", 0x1_4000_1234);
        api.push(breakpoint());
    });
    debugger.wait().unwrap();
    let reads = debugger.api().context_reads.get();

    let layout = debugger.register_layout();
    assert_eq!(debugger.fetch_register(layout.pc).unwrap().as_u64(), 0x1_4000_1234);
    let all = debugger.fetch_registers().unwrap();
    assert_eq!(all.len(), layout.len());
    assert_eq!(debugger.api().context_reads.get(), reads);
}

#[test]
fn test_stores_are_deferred_until_resume()
{
    let (mut debugger, _) = launched(|api| {
        api.push(breakpoint());
        api.push(breakpoint());
    });
    debugger.wait().unwrap();

    let layout = debugger.register_layout();
    let rax = layout.index_of("rax").unwrap();
    let rbx = layout.index_of("rbx").unwrap();
    debugger.store_register(rax, RegisterValue::from_u64(0xAAAA, 8)).unwrap();
    debugger.store_register(rbx, RegisterValue::from_u64(0xBBBB, 8)).unwrap();
    assert!(debugger.api().context_writes.is_empty());
    assert_eq!(debugger.api().register(THREAD, "rax"), 0);

    debugger.resume(false, None).unwrap();
    assert_eq!(debugger.api().context_writes.len(), 1);
    assert!(debugger.api().context_writes[0].1.contains(RegisterGroups::INTEGER));
    assert_eq!(debugger.api().register(THREAD, "rax"), 0xAAAA);
    assert_eq!(debugger.api().register(THREAD, "rbx"), 0xBBBB);
}

#[test]
fn test_resume_without_stores_writes_nothing()
{
    let (mut debugger, _) = launched(|api| {
        api.push(breakpoint());
    });
    debugger.wait().unwrap();
    debugger.resume(false, None).unwrap();
    assert!(debugger.api().context_writes.is_empty());
}

#[test]
fn test_single_step_sets_trap_flag()
{
    let (mut debugger, _) = launched(|api| {
        api.set_register(THREAD, "eflags", 0x246);
        api.push(breakpoint());
    });
    debugger.wait().unwrap();
    debugger.resume(true, None).unwrap();

    assert_eq!(debugger.api().context_writes.len(), 1);
    assert!(debugger.api().context_writes[0].1.contains(RegisterGroups::CONTROL));
    assert_eq!(debugger.api().register(THREAD, "eflags"), 0x246 | TRAP_FLAG);
}

#[test]
fn test_resume_invalidates_snapshot()
{
    let (mut debugger, _) = launched(|api| {
        api.push(breakpoint());
    });
    debugger.wait().unwrap();
    debugger.resume(false, None).unwrap();

    debugger.api_mut().set_register(THREAD, "rcx", 77);
    let reads = debugger.api().context_reads.get();
    let rcx = debugger.register_layout().index_of("rcx").unwrap();
    assert_eq!(debugger.fetch_register(rcx).unwrap().as_u64(), 77);
    assert_eq!(debugger.api().context_reads.get(), reads + 1);
}

#[test]
fn test_store_registers_rejects_wrong_count()
{
    let (mut debugger, _) = launched(|api| {
        api.push(breakpoint());
    });
    debugger.wait().unwrap();
    let err = debugger.store_registers(&[RegisterValue::from_u64(1, 8)]).unwrap_err();
    assert!(matches!(err, WdbError::InvalidArgument(_)));
}

#[test]
#[should_panic(expected = "out of range")]
fn test_out_of_range_index_panics()
{
    let (mut debugger, _) = launched(|api| {
        api.push(breakpoint());
    });
    debugger.wait().unwrap();
    let len = debugger.register_layout().len();
    let _ = debugger.fetch_register(len);
}

#[test]
fn test_registers_need_a_session()
{
    let (mut debugger, _) = common::controller(common::FakeDebugApi::new());
    assert!(matches!(debugger.fetch_register(0), Err(WdbError::NotAttached)));
}

#[test]
fn test_unreadable_context_is_an_error_not_the_previous_thread()
{
    let mut debugger = stopped_on_unreadable_thread();
    let rax = debugger.register_layout().index_of("rax").unwrap();
    assert!(matches!(debugger.fetch_register(rax), Err(WdbError::Os(err)) if err.call == "GetThreadContext"));
    assert!(matches!(debugger.fetch_registers(), Err(WdbError::Os(_))));
}

#[test]
fn test_store_fails_when_context_cannot_be_read()
{
    let mut debugger = stopped_on_unreadable_thread();
    let rax = debugger.register_layout().index_of("rax").unwrap();
    let err = debugger.store_register(rax, RegisterValue::from_u64(0x4242, 8)).unwrap_err();
    assert!(matches!(err, WdbError::Os(_)));

    debugger.resume(false, None).unwrap();
    assert!(debugger.api().context_writes.is_empty());
}
