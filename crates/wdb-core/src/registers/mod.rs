//! # Register Context Cache
//!
//! Lazily synchronised register snapshot for the thread that last reported an
//! event.
//!
//! The cache holds one raw `CONTEXT` blob and a mask of the register groups
//! that are currently valid in it. Reads ensure the covering group is present
//! (fetching only the missing groups from the OS); writes patch the blob and
//! mark it dirty. The OS-level store is deferred to [`RegisterCache::prepare_resume`],
//! which writes everything back in one call and then invalidates every group,
//! so nothing stale is ever served across a resume.
//!
//! Only one thread's context is retained. Switching threads drops the old
//! snapshot.
//!
//! ## Example
//!
//! ```rust,ignore
//! cache.select_thread(tid, thread_handle);
//! let rip = cache.fetch(&api, layout.pc)?;
//! cache.store(&api, layout.pc, RegisterValue::from_u64(rip.as_u64() + 1, 8))?;
//! cache.prepare_resume(&mut api, false); // one SetThreadContext
//! ```

pub mod layout;

pub use layout::{RegisterLayout, RegisterMapping, TRAP_FLAG};
use tracing::{error, trace};

use crate::error::{Result, WdbError};
use crate::os::{check, DebugApi};
use crate::types::{Architecture, OsHandle, RegisterGroups, RegisterValue, ThreadId};

/// Register snapshot of the current thread.
#[derive(Debug)]
pub struct RegisterCache
{
    layout: &'static RegisterLayout,
    context: Vec<u8>,
    valid: RegisterGroups,
    dirty: bool,
    thread: Option<(ThreadId, OsHandle)>,
}

impl RegisterCache
{
    /// Empty cache for `arch` with no thread selected.
    pub fn new(arch: Architecture) -> Self
    {
        let layout = RegisterLayout::for_arch(arch);
        Self {
            layout,
            context: vec![0; layout.context_size],
            valid: RegisterGroups::EMPTY,
            dirty: false,
            thread: None,
        }
    }

    /// Register table in use.
    pub fn layout(&self) -> &'static RegisterLayout
    {
        self.layout
    }

    /// Groups currently valid in the snapshot.
    pub fn valid_groups(&self) -> RegisterGroups
    {
        self.valid
    }

    /// Whether stores are waiting to be written back.
    pub fn is_dirty(&self) -> bool
    {
        self.dirty
    }

    /// Thread whose context is cached.
    pub fn thread(&self) -> Option<ThreadId>
    {
        self.thread.map(|(tid, _)| tid)
    }

    /// Make `tid` the thread of interest. A different thread drops the snapshot.
    pub fn select_thread(&mut self, tid: ThreadId, handle: OsHandle)
    {
        if self.thread != Some((tid, handle)) {
            self.invalidate();
            self.thread = Some((tid, handle));
        }
    }

    /// Forget the thread and the snapshot.
    pub fn clear(&mut self)
    {
        self.invalidate();
        self.thread = None;
    }

    /// Mark every group invalid. Pending stores are discarded.
    pub fn invalidate(&mut self)
    {
        self.valid = RegisterGroups::EMPTY;
        self.dirty = false;
    }

    /// Fetch `groups` from the OS regardless of what is cached.
    ///
    /// Failures are protocol violations: logged, and the groups stay invalid
    /// so the next read retries and reports the error.
    pub fn refresh<A: DebugApi + ?Sized>(&mut self, api: &A, groups: RegisterGroups)
    {
        self.valid = self.valid.difference(groups);
        if let Err(err) = self.ensure(api, groups) {
            error!(error = %err, "cannot refresh thread context");
        }
    }

    /// Make sure `groups` are present, fetching only the missing ones.
    fn ensure<A: DebugApi + ?Sized>(&mut self, api: &A, groups: RegisterGroups) -> Result<()>
    {
        let missing = groups.difference(self.valid);
        if missing.is_empty() {
            return Ok(());
        }
        let (tid, handle) = self.thread.ok_or(WdbError::NotAttached)?;
        trace!(thread = tid.raw(), groups = ?missing, "fetching thread context");
        api.get_thread_context(handle, missing, &mut self.context)?;
        self.valid |= missing;
        Ok(())
    }

    fn mapping(&self, index: usize) -> RegisterMapping
    {
        assert!(
            index < self.layout.len(),
            "register index {index} out of range for {} ({} registers)",
            self.layout.arch,
            self.layout.len()
        );
        self.layout.registers[index]
    }

    /// Value of register `index`.
    ///
    /// ## Panics
    ///
    /// If `index` is not in the register table.
    ///
    /// ## Errors
    ///
    /// - `NotAttached`: no thread has reported an event yet
    /// - `Os`: the thread's context could not be read
    pub fn fetch<A: DebugApi + ?Sized>(&mut self, api: &A, index: usize) -> Result<RegisterValue>
    {
        let mapping = self.mapping(index);
        self.ensure(api, mapping.group)?;
        Ok(RegisterValue::from_bytes(&self.context[mapping.offset..mapping.offset + mapping.size]))
    }

    /// Every register, in table order.
    pub fn fetch_all<A: DebugApi + ?Sized>(&mut self, api: &A) -> Result<Vec<RegisterValue>>
    {
        (0..self.layout.len()).map(|index| self.fetch(api, index)).collect()
    }

    /// Patch register `index` in the snapshot; the OS store happens on resume.
    ///
    /// Values narrower than the register are zero-extended, wider ones
    /// truncated.
    ///
    /// ## Panics
    ///
    /// If `index` is not in the register table.
    ///
    /// ## Errors
    ///
    /// Same as [`RegisterCache::fetch`]; the snapshot is left untouched.
    pub fn store<A: DebugApi + ?Sized>(&mut self, api: &A, index: usize, value: &RegisterValue) -> Result<()>
    {
        let mapping = self.mapping(index);
        // The whole group is written back, so the rest of it must be current.
        self.ensure(api, mapping.group)?;
        let slot = &mut self.context[mapping.offset..mapping.offset + mapping.size];
        slot.fill(0);
        let count = value.len().min(mapping.size);
        slot[..count].copy_from_slice(&value.as_bytes()[..count]);
        self.dirty = true;
        Ok(())
    }

    /// Store every register from `values` (table order).
    pub fn store_all<A: DebugApi + ?Sized>(&mut self, api: &A, values: &[RegisterValue]) -> Result<()>
    {
        if values.len() != self.layout.len() {
            return Err(WdbError::InvalidArgument(format!(
                "expected {} register values, got {}",
                self.layout.len(),
                values.len()
            )));
        }
        for (index, value) in values.iter().enumerate() {
            self.store(api, index, value)?;
        }
        Ok(())
    }

    /// Commit the snapshot before the target runs again
    ///
    /// When `step` is set the trap flag is raised in the flags register so the
    /// thread stops after one instruction. Pending stores are written back in
    /// a single context store, then every group is invalidated.
    pub fn prepare_resume<A: DebugApi + ?Sized>(&mut self, api: &mut A, step: bool)
    {
        if let Some((tid, handle)) = self.thread {
            if step {
                let flags = self.layout.flags;
                match self.fetch(&*api, flags) {
                    Ok(value) => {
                        let size = value.len();
                        let raised = RegisterValue::from_u64(value.as_u64() | TRAP_FLAG, size);
                        let _ = self.store(&*api, flags, &raised);
                    }
                    Err(err) => trace!(error = %err, "cannot set trap flag"),
                }
            }
            if self.dirty {
                trace!(thread = tid.raw(), groups = ?self.valid, "storing thread context");
                check(api.set_thread_context(handle, self.valid, &self.context));
            }
        }
        self.invalidate();
    }
}
