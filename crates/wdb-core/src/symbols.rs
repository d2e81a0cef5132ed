//! # Symbol Loading Collaborator
//!
//! The controller does not parse debug information. When a new module is
//! mapped into the target it hands the module's path and load offset to a
//! [`SymbolLoader`]; the result is advisory and never affects run control.
//!
//! [`ObjectSymbolLoader`] is a minimal loader that parses the image with the
//! `object` crate and records what it found, which is enough for a headless
//! front end to report modules. Richer consumers plug in their own loader.

use std::fs;
use std::path::PathBuf;

use object::{Object, ObjectKind};
use thiserror::Error;
use tracing::debug;

use crate::types::Address;

/// Why a module's symbols could not be loaded.
#[derive(Error, Debug)]
pub enum SymbolError
{
    /// The image file could not be read.
    #[error("cannot read {path}: {source}")]
    Io
    {
        /// Image path as given to the loader.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The image is not a parsable object file.
    #[error("cannot parse {path}: {message}")]
    Parse
    {
        /// Image path as given to the loader.
        path: String,
        /// Parser message.
        message: String,
    },
}

/// Receives newly loaded modules.
pub trait SymbolLoader
{
    /// Register the module at `path`, whose symbols are relocated by
    /// `load_offset` (module base plus the image header offset).
    ///
    /// `path` is the OS-native path the target reported.
    fn register_module(&mut self, path: &str, load_offset: Address) -> Result<(), SymbolError>;
}

/// Summary of one registered image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage
{
    /// Path the image was read from.
    pub path: PathBuf,
    /// Offset its symbols are relocated by.
    pub load_offset: Address,
    /// Symbol table entries plus exports.
    pub symbol_count: usize,
    /// Whether the image is a DLL rather than an executable.
    pub is_dynamic: bool,
}

/// [`SymbolLoader`] backed by the `object` crate.
#[derive(Debug, Default)]
pub struct ObjectSymbolLoader
{
    images: Vec<LoadedImage>,
}

impl ObjectSymbolLoader
{
    /// Loader with nothing registered.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Images registered so far, in load order.
    pub fn images(&self) -> &[LoadedImage]
    {
        &self.images
    }
}

impl SymbolLoader for ObjectSymbolLoader
{
    fn register_module(&mut self, path: &str, load_offset: Address) -> Result<(), SymbolError>
    {
        let data = fs::read(path).map_err(|source| SymbolError::Io {
            path: path.to_string(),
            source,
        })?;
        let file = object::File::parse(&*data).map_err(|err| SymbolError::Parse {
            path: path.to_string(),
            message: err.to_string(),
        })?;

        let exports = file.exports().map(|exports| exports.len()).unwrap_or(0);
        let symbol_count = file.symbols().count() + exports;
        let is_dynamic = file.kind() == ObjectKind::Dynamic;
        debug!(path, symbol_count, load_offset = %load_offset, "registered module symbols");

        self.images.push(LoadedImage {
            path: PathBuf::from(path),
            load_offset,
            symbol_count,
            is_dynamic,
        });
        Ok(())
    }
}
