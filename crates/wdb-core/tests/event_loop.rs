//! Debug event loop: acknowledgement, lifecycle events and notifications.

mod common;

use common::{breakpoint, controller, exited, launched, process_created, FakeDebugApi, PID, PROCESS, THREAD, TID};
use wdb_core::events::DebuggerEvent;
use wdb_core::os::{ContinueDisposition, DebugEventKind};
use wdb_core::types::{Address, OsHandle, ThreadId, WaitStatus};
use wdb_core::{Debugger, Signal, WdbError};

#[test]
fn test_launch_consumes_creation_stop()
{
    let mut api = FakeDebugApi::new();
    api.push(process_created()).push(breakpoint()).push(exited(0));
    let (mut debugger, _) = controller(api);

    let pid = debugger.launch(common::PROGRAM, "", &[]).unwrap();
    assert_eq!(pid, PID);
    // Creation event continued by the loop, initial breakpoint by the resume.
    assert_eq!(
        debugger.api().continues,
        vec![(PID, TID, ContinueDisposition::Continue), (PID, TID, ContinueDisposition::Continue)]
    );
    assert_eq!(debugger.api().events.len(), 1);
    assert_eq!(debugger.wait().unwrap(), WaitStatus::Exited { code: 0 });
}

#[test]
fn test_exit_closes_owned_handles_and_stays_pending()
{
    let (mut debugger, _) = launched(|api| {
        api.push(exited(7));
    });
    let continues = debugger.api().continues.len();

    assert_eq!(debugger.wait().unwrap(), WaitStatus::Exited { code: 7 });
    assert_eq!(debugger.api().closed, vec![PROCESS, THREAD]);
    assert_eq!(debugger.api().continues.len(), continues);

    debugger.mourn().unwrap();
    assert_eq!(debugger.api().continues.len(), continues + 1);
    assert_eq!(debugger.api().closed.len(), 2);
    assert!(!debugger.is_attached());
}

#[test]
fn test_thread_events_are_tracked()
{
    let worker = ThreadId(2002);
    let worker_handle = OsHandle(0x200);
    let (mut debugger, _) = launched(|api| {
        api.contexts.insert(worker_handle, vec![0; api.layout.context_size]);
        api.set_register(worker_handle, "rip", 0x1_4000_5000);
        api.push_from(worker, DebugEventKind::ThreadCreated { thread: worker_handle });
        api.push_from(worker, breakpoint());
        api.push_from(worker, DebugEventKind::ThreadExited { exit_code: 0 });
        api.push(breakpoint());
    });

    assert_eq!(debugger.wait().unwrap(), WaitStatus::Stopped { signal: Signal::Trap });
    assert_eq!(debugger.current_thread(), Some(worker));
    let pc = debugger.register_layout().pc;
    assert_eq!(debugger.fetch_register(pc).unwrap().as_u64(), 0x1_4000_5000);
    assert_eq!(debugger.session().process.as_ref().unwrap().threads.len(), 2);

    debugger.resume(false, None).unwrap();
    debugger.wait().unwrap();
    assert_eq!(debugger.current_thread(), Some(TID));
    assert_eq!(debugger.session().process.as_ref().unwrap().threads.len(), 1);
}

#[test]
fn test_debug_string_is_published_and_continued()
{
    let (mut debugger, _) = launched(|api| {
        api.poke_string(0x1_4000_9000, "hello from target\n", false);
        api.push(DebugEventKind::DebugString {
            address: Address::from(0x1_4000_9000),
            unicode: false,
            length: 19,
        });
        api.push(breakpoint());
    });
    let events = debugger.subscribe();

    debugger.wait().unwrap();
    assert_eq!(
        events.try_recv().unwrap(),
        DebuggerEvent::DebugOutput {
            text: "hello from target".to_string()
        }
    );
    assert!(matches!(events.try_recv().unwrap(), DebuggerEvent::TargetStopped { signal: Signal::Trap, .. }));
}

#[test]
fn test_unterminated_debug_string_is_capped()
{
    let (mut debugger, _) = launched(|api| {
        api.poke(0x1_4000_9000, &[b'a'; 2000]);
        api.push(DebugEventKind::DebugString {
            address: Address::from(0x1_4000_9000),
            unicode: false,
            length: 0,
        });
        api.push(DebugEventKind::DebugString {
            address: Address::from(0x1_4000_9000),
            unicode: false,
            length: 1500,
        });
        api.push(breakpoint());
    });
    let events = debugger.subscribe();
    debugger.wait().unwrap();

    for _ in 0..2 {
        match events.try_recv().unwrap() {
            DebuggerEvent::DebugOutput { text } => assert_eq!(text, "a".repeat(1024)),
            other => panic!("expected debug output, got {other:?}"),
        }
    }
}

#[test]
fn test_unreadable_debug_string_is_ignored()
{
    let (mut debugger, _) = launched(|api| {
        api.push(DebugEventKind::DebugString {
            address: Address::from(0x10),
            unicode: true,
            length: 4,
        });
        api.push(breakpoint());
    });
    let events = debugger.subscribe();
    debugger.wait().unwrap();
    assert!(matches!(events.try_recv().unwrap(), DebuggerEvent::TargetStopped { .. }));
}

#[test]
fn test_uninteresting_events_are_continued()
{
    let (mut debugger, _) = launched(|api| {
        api.push(DebugEventKind::ModuleUnloaded {
            base: Address::from(0x7ff0_0000_0000),
        });
        api.push(DebugEventKind::Unknown { code: 9 });
        api.push(breakpoint());
    });
    let before = debugger.api().continues.len();
    let events_before = debugger.event_count();

    debugger.wait().unwrap();
    assert_eq!(debugger.api().continues.len(), before + 2);
    assert_eq!(debugger.event_count(), events_before + 3);
}

#[test]
fn test_wait_failure_is_reported()
{
    let (mut debugger, _) = launched(|_| {});
    match debugger.wait() {
        Err(WdbError::Os(err)) => assert_eq!(err.call, "WaitForDebugEvent"),
        other => panic!("expected OS error, got {other:?}"),
    }
}

#[test]
fn test_failed_acknowledge_does_not_stop_the_loop()
{
    let (mut debugger, _) = launched(|api| {
        api.push(DebugEventKind::Unknown { code: 9 });
        api.push(breakpoint());
    });
    debugger.api_mut().fail_continue = true;
    assert_eq!(debugger.wait().unwrap(), WaitStatus::Stopped { signal: Signal::Trap });
}

#[test]
fn test_wait_needs_a_session()
{
    let (mut debugger, _) = controller(FakeDebugApi::new());
    assert!(matches!(debugger.wait(), Err(WdbError::NotAttached)));
}
