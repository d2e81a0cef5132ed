//! Scripted `DebugApi` used by the integration tests.
//!
//! Events are replayed from a queue; once it is empty every wait fails, the
//! same way `WaitForDebugEvent` fails when there is nothing left to debug.
//! Target memory is a sparse byte map (absent bytes are unmapped) and each
//! thread has its own `CONTEXT` blob. Every call is recorded for assertions.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use wdb_core::config::SessionConfig;
use wdb_core::os::{ContinueDisposition, CreatedProcess, CtrlEvent, DebugApi, DebugEvent, DebugEventKind, LaunchRequest, OsError};
use wdb_core::paths::{NativePaths, PathTranslator};
use wdb_core::registers::RegisterLayout;
use wdb_core::symbols::{SymbolError, SymbolLoader};
use wdb_core::types::{Address, Architecture, OsHandle, ProcessId, RegisterGroups, ThreadId};
use wdb_core::{Debugger, NativeProcessController};

pub const PID: ProcessId = ProcessId(4242);
pub const TID: ThreadId = ThreadId(1001);
pub const PROCESS: OsHandle = OsHandle(0x100);
pub const THREAD: OsHandle = OsHandle(0x104);
pub const PROGRAM: &str = r"C:\work\app.exe";

pub const ERROR_INVALID_HANDLE: u32 = 6;
pub const ERROR_ACCESS_DENIED: u32 = 5;

pub struct FakeDebugApi
{
    pub layout: &'static RegisterLayout,
    pub events: VecDeque<Result<DebugEvent, OsError>>,
    pub memory: BTreeMap<u64, u8>,
    pub contexts: HashMap<OsHandle, Vec<u8>>,
    pub context_reads: Cell<usize>,
    pub context_writes: Vec<(OsHandle, RegisterGroups)>,
    pub continues: Vec<(ProcessId, ThreadId, ContinueDisposition)>,
    pub fail_continue: bool,
    pub flushes: Vec<(OsHandle, Address, usize)>,
    pub closed: Vec<OsHandle>,
    pub terminated: Vec<(OsHandle, u32)>,
    pub ctrl_events: Vec<(CtrlEvent, u32)>,
    pub launches: Vec<LaunchRequest>,
    pub create_error: Option<OsError>,
    pub attach_result: Result<(), OsError>,
    pub attached: Vec<ProcessId>,
    pub detached: Vec<ProcessId>,
}

impl FakeDebugApi
{
    pub fn new() -> Self
    {
        let layout = RegisterLayout::for_arch(Architecture::X86_64);
        let mut contexts = HashMap::new();
        contexts.insert(THREAD, vec![0u8; layout.context_size]);
        Self {
            layout,
            events: VecDeque::new(),
            memory: BTreeMap::new(),
            contexts,
            context_reads: Cell::new(0),
            context_writes: Vec::new(),
            continues: Vec::new(),
            fail_continue: false,
            flushes: Vec::new(),
            closed: Vec::new(),
            terminated: Vec::new(),
            ctrl_events: Vec::new(),
            launches: Vec::new(),
            create_error: None,
            attach_result: Ok(()),
            attached: Vec::new(),
            detached: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: DebugEventKind) -> &mut Self
    {
        self.events.push_back(Ok(event(kind)));
        self
    }

    pub fn push_from(&mut self, tid: ThreadId, kind: DebugEventKind) -> &mut Self
    {
        self.events.push_back(Ok(DebugEvent {
            process_id: PID,
            thread_id: tid,
            kind,
        }));
        self
    }

    /// Map `len` zeroed bytes at `address`.
    pub fn map(&mut self, address: u64, len: usize)
    {
        for offset in 0..len as u64 {
            self.memory.insert(address + offset, 0);
        }
    }

    pub fn poke(&mut self, address: u64, bytes: &[u8])
    {
        for (offset, byte) in bytes.iter().enumerate() {
            self.memory.insert(address + offset as u64, *byte);
        }
    }

    /// Store a NUL-terminated string at `at`.
    pub fn poke_string(&mut self, at: u64, text: &str, wide: bool)
    {
        let mut bytes: Vec<u8> = if wide {
            text.encode_utf16().flat_map(u16::to_le_bytes).collect()
        } else {
            text.as_bytes().to_vec()
        };
        bytes.extend_from_slice(if wide { &[0, 0] } else { &[0] });
        self.poke(at, &bytes);
    }

    /// Store a module name the way the loader does: a pointer at `slot`
    /// referring to the string at `text_at`.
    pub fn poke_module_name(&mut self, slot: u64, text_at: u64, text: &str, wide: bool) -> Address
    {
        self.poke(slot, &text_at.to_le_bytes());
        self.poke_string(text_at, text, wide);
        Address::from(slot)
    }

    pub fn register(&self, thread: OsHandle, name: &str) -> u64
    {
        let mapping = &self.layout.registers[self.layout.index_of(name).unwrap()];
        let blob = &self.contexts[&thread];
        let mut le = [0u8; 8];
        let size = mapping.size.min(8);
        le[..size].copy_from_slice(&blob[mapping.offset..mapping.offset + size]);
        u64::from_le_bytes(le)
    }

    pub fn set_register(&mut self, thread: OsHandle, name: &str, value: u64)
    {
        let mapping = self.layout.registers[self.layout.index_of(name).unwrap()];
        let blob = self.contexts.get_mut(&thread).unwrap();
        let size = mapping.size.min(8);
        blob[mapping.offset..mapping.offset + size].copy_from_slice(&value.to_le_bytes()[..size]);
    }
}

impl DebugApi for FakeDebugApi
{
    fn debug_active_process(&mut self, pid: ProcessId) -> Result<(), OsError>
    {
        self.attach_result?;
        self.attached.push(pid);
        Ok(())
    }

    fn debug_active_process_stop(&mut self, pid: ProcessId) -> Result<(), OsError>
    {
        self.detached.push(pid);
        Ok(())
    }

    fn create_process(&mut self, request: &LaunchRequest) -> Result<CreatedProcess, OsError>
    {
        self.launches.push(request.clone());
        if let Some(err) = self.create_error {
            return Err(err);
        }
        Ok(CreatedProcess {
            process: PROCESS,
            thread: THREAD,
            process_id: PID,
            thread_id: TID,
        })
    }

    fn wait_for_event(&mut self) -> Result<DebugEvent, OsError>
    {
        self.events
            .pop_front()
            .unwrap_or(Err(OsError::new("WaitForDebugEvent", ERROR_INVALID_HANDLE)))
    }

    fn continue_event(&mut self, pid: ProcessId, tid: ThreadId, disposition: ContinueDisposition)
        -> Result<(), OsError>
    {
        if self.fail_continue {
            return Err(OsError::new("ContinueDebugEvent", ERROR_INVALID_HANDLE));
        }
        self.continues.push((pid, tid, disposition));
        Ok(())
    }

    fn read_process_memory(&self, _process: OsHandle, address: Address, buf: &mut [u8]) -> usize
    {
        for (offset, slot) in buf.iter_mut().enumerate() {
            match self.memory.get(&(address.value() + offset as u64)) {
                Some(byte) => *slot = *byte,
                None => return offset,
            }
        }
        buf.len()
    }

    fn write_process_memory(&mut self, _process: OsHandle, address: Address, data: &[u8]) -> usize
    {
        for (offset, byte) in data.iter().enumerate() {
            match self.memory.get_mut(&(address.value() + offset as u64)) {
                Some(slot) => *slot = *byte,
                None => return offset,
            }
        }
        data.len()
    }

    fn flush_instruction_cache(&mut self, process: OsHandle, address: Address, len: usize) -> Result<(), OsError>
    {
        self.flushes.push((process, address, len));
        Ok(())
    }

    fn get_thread_context(&self, thread: OsHandle, groups: RegisterGroups, context: &mut [u8]) -> Result<(), OsError>
    {
        self.context_reads.set(self.context_reads.get() + 1);
        let stored = self
            .contexts
            .get(&thread)
            .ok_or(OsError::new("GetThreadContext", ERROR_INVALID_HANDLE))?;
        for range in self.layout.group_ranges(groups) {
            context[range.clone()].copy_from_slice(&stored[range]);
        }
        Ok(())
    }

    fn set_thread_context(&mut self, thread: OsHandle, groups: RegisterGroups, context: &[u8]) -> Result<(), OsError>
    {
        self.context_writes.push((thread, groups));
        let layout = self.layout;
        let stored = self
            .contexts
            .get_mut(&thread)
            .ok_or(OsError::new("SetThreadContext", ERROR_INVALID_HANDLE))?;
        for range in layout.group_ranges(groups) {
            stored[range.clone()].copy_from_slice(&context[range]);
        }
        Ok(())
    }

    fn terminate_process(&mut self, process: OsHandle, exit_code: u32) -> Result<(), OsError>
    {
        self.terminated.push((process, exit_code));
        Ok(())
    }

    fn generate_console_ctrl_event(&mut self, event: CtrlEvent, process_group: u32) -> Result<(), OsError>
    {
        self.ctrl_events.push((event, process_group));
        Ok(())
    }

    fn close_handle(&mut self, handle: OsHandle) -> Result<(), OsError>
    {
        self.closed.push(handle);
        Ok(())
    }
}

/// Symbol loader that records every registration.
#[derive(Clone, Default)]
pub struct RecordingLoader
{
    pub calls: Rc<RefCell<Vec<(String, Address)>>>,
    pub fail: bool,
}

impl SymbolLoader for RecordingLoader
{
    fn register_module(&mut self, path: &str, load_offset: Address) -> Result<(), SymbolError>
    {
        self.calls.borrow_mut().push((path.to_string(), load_offset));
        if self.fail {
            return Err(SymbolError::Parse {
                path: path.to_string(),
                message: "not an image".to_string(),
            });
        }
        Ok(())
    }
}

pub type Controller = NativeProcessController<FakeDebugApi>;

pub fn event(kind: DebugEventKind) -> DebugEvent
{
    DebugEvent {
        process_id: PID,
        thread_id: TID,
        kind,
    }
}

pub fn process_created() -> DebugEventKind
{
    DebugEventKind::ProcessCreated {
        process: PROCESS,
        thread: THREAD,
        image_base: Address::from(0x1_4000_0000),
        image_name: Address::NULL,
        unicode: true,
    }
}

pub fn exception(code: u32, address: u64, first_chance: bool) -> DebugEventKind
{
    DebugEventKind::Exception {
        code,
        address: Address::from(address),
        first_chance,
    }
}

pub fn breakpoint() -> DebugEventKind
{
    exception(wdb_core::exception::EXCEPTION_BREAKPOINT, 0x7ffb_0000_1000, true)
}

pub fn exited(code: u32) -> DebugEventKind
{
    DebugEventKind::ProcessExited { exit_code: code }
}

pub fn module_loaded(base: u64, image_name: Address, unicode: bool) -> DebugEventKind
{
    DebugEventKind::ModuleLoaded {
        base: Address::from(base),
        image_name,
        unicode,
    }
}

pub fn controller_with(api: FakeDebugApi, config: SessionConfig, paths: Box<dyn PathTranslator>) -> (Controller, RecordingLoader)
{
    let loader = RecordingLoader::default();
    let controller = NativeProcessController::new(api, config)
        .with_architecture(Architecture::X86_64)
        .with_symbol_loader(Box::new(loader.clone()))
        .with_path_translator(paths);
    (controller, loader)
}

pub fn controller(api: FakeDebugApi) -> (Controller, RecordingLoader)
{
    controller_with(api, SessionConfig::default(), Box::new(NativePaths))
}

/// Controller with a launched target that already passed its initial stop.
/// `script` is queued after the startup events.
pub fn launched(script: impl FnOnce(&mut FakeDebugApi)) -> (Controller, RecordingLoader)
{
    let mut api = FakeDebugApi::new();
    api.push(process_created()).push(breakpoint());
    script(&mut api);
    let (mut controller, loader) = controller(api);
    controller.launch(PROGRAM, "", &[]).expect("launch");
    (controller, loader)
}
