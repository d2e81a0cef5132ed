//! # Module Load Notifier
//!
//! Resolves the path of a freshly mapped module, suppresses modules whose
//! base name is already known, and hands genuinely new modules to the
//! [`SymbolLoader`].
//!
//! ## Resolution steps
//!
//! 1. Read the pointer stored at the event's image-name address (target
//!    pointer width). A short read or a null pointer ends processing quietly.
//! 2. Scan the name one code unit at a time up to the terminator
//!    (bounded by [`MAX_MODULE_NAME_UNITS`]).
//! 3. Decode it (UTF-16 or single-byte, per the event flag) and convert it to
//!    the host path convention.
//! 4. Compare its base name (text after the last `\` or `/`) with the base
//!    names of known modules, case-sensitively.
//! 5. Register new modules by native path at `base + 0x1000`, the offset of the first
//!    section past the image headers.
//!
//! Everything is best-effort; a module that cannot be resolved or loaded must
//! not cost the rest of the session.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::memory::{self, StringEncoding, MAX_MODULE_NAME_UNITS};
use crate::os::DebugApi;
use crate::paths::{basename, PathTranslator};
use crate::symbols::SymbolLoader;
use crate::types::{Address, Architecture, OsHandle};

/// Offset from a module's load base to where its symbols are relocated.
pub const IMAGE_SYMBOL_OFFSET: u64 = 0x1000;

/// A module the debugger has already attributed symbols to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownModule
{
    /// Host-convention path.
    pub path: String,
    /// Load base (null for the seeded executable when unknown).
    pub base: Address,
}

/// Modules seen this session, keyed by base name
///
/// Entries are never removed: an unloaded module keeps its symbols.
#[derive(Debug, Default)]
pub struct KnownModules
{
    by_basename: BTreeMap<String, KnownModule>,
}

impl KnownModules
{
    /// Empty set.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Record a module. Returns `false` if its base name was already known.
    pub fn insert(&mut self, path: &str, base: Address) -> bool
    {
        let key = basename(path).to_string();
        if self.by_basename.contains_key(&key) {
            return false;
        }
        self.by_basename.insert(key, KnownModule {
            path: path.to_string(),
            base,
        });
        true
    }

    /// Known module sharing `path`'s base name.
    pub fn find_by_basename(&self, path: &str) -> Option<&KnownModule>
    {
        self.by_basename.get(basename(path))
    }

    /// Number of known modules.
    pub fn len(&self) -> usize
    {
        self.by_basename.len()
    }

    /// Whether nothing is known yet.
    pub fn is_empty(&self) -> bool
    {
        self.by_basename.is_empty()
    }

    /// All known modules, ordered by base name.
    pub fn iter(&self) -> impl Iterator<Item = &KnownModule>
    {
        self.by_basename.values()
    }

    /// Forget everything (new session).
    pub fn clear(&mut self)
    {
        self.by_basename.clear();
    }
}

/// Result of handling one module-load event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLoad
{
    /// The name could not be read; nothing happened.
    Unresolved,
    /// A module with the same base name is already known.
    AlreadyKnown
    {
        /// Host path of the newly mapped module.
        path: String,
    },
    /// A new module was recorded.
    Registered
    {
        /// Host path.
        path: String,
        /// Load base.
        base: Address,
        /// Whether the symbol loader accepted it.
        symbols_loaded: bool,
    },
}

/// Inputs of one module-load event.
#[derive(Debug, Clone, Copy)]
pub struct ModuleLoadEvent
{
    /// Process the module was mapped into.
    pub process: OsHandle,
    /// Load base.
    pub base: Address,
    /// Address of the pointer to the name.
    pub image_name: Address,
    /// Whether the name is UTF-16.
    pub unicode: bool,
}

/// Native path of a loaded module as the target reports it, or `None` if
/// it cannot be read.
pub fn read_module_name<A: DebugApi + ?Sized>(api: &A, arch: Architecture, event: &ModuleLoadEvent) -> Option<String>
{
    if event.image_name.is_null() {
        return None;
    }
    let name_ptr = memory::read_pointer(api, event.process, event.image_name, arch)?;
    if name_ptr.is_null() {
        return None;
    }
    let encoding = StringEncoding::from_unicode_flag(event.unicode);
    let native = memory::read_string(api, event.process, name_ptr, encoding, MAX_MODULE_NAME_UNITS);
    (!native.is_empty()).then_some(native)
}

/// Handle a module-load event
///
/// Symbols are read from the native path; the host path is what gets
/// recorded and reported. Symbol-loading failures are reported as a warning
/// and the module is still recorded as known.
pub fn notify_module_load<A: DebugApi + ?Sized>(
    api: &A,
    arch: Architecture,
    paths: &dyn PathTranslator,
    symbols: &mut dyn SymbolLoader,
    known: &mut KnownModules,
    event: &ModuleLoadEvent,
) -> ModuleLoad
{
    let Some(native) = read_module_name(api, arch, event) else {
        return ModuleLoad::Unresolved;
    };
    let path = paths.to_host_path(&native);

    if known.find_by_basename(&path).is_some() {
        info!("{} (symbols previously loaded)", basename(&path));
        return ModuleLoad::AlreadyKnown { path };
    }

    let symbols_loaded = match symbols.register_module(&native, event.base + IMAGE_SYMBOL_OFFSET) {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "[failed reading symbols from DLL]");
            false
        }
    };
    known.insert(&path, event.base);
    info!("{:x}:{}", event.base, path);

    ModuleLoad::Registered {
        path,
        base: event.base,
        symbols_loaded,
    }
}
