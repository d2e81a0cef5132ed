//! # Memory Access Bridge
//!
//! Cross-process reads and writes against the debug target.
//!
//! Transfers never fail with an error at this layer: an unmapped or protected
//! range simply moves fewer bytes (often zero), and the caller decides whether
//! that matters. Writes are always followed by an instruction-cache flush over
//! the written range, since the bytes may be code (breakpoint patching).
//!
//! ## References
//!
//! - [ReadProcessMemory](https://learn.microsoft.com/en-us/windows/win32/api/memoryapi/nf-memoryapi-readprocessmemory)
//! - [FlushInstructionCache](https://learn.microsoft.com/en-us/windows/win32/api/processthreadsapi/nf-processthreadsapi-flushinstructioncache)

use crate::config::verbose;
use crate::error::{Result, WdbError};
use crate::os::{check, DebugApi};
use crate::types::{Address, Architecture, OsHandle};

/// Upper bound, in code units, for module names read out of the target.
pub const MAX_MODULE_NAME_UNITS: usize = 4096;

/// Upper bound, in bytes, for `OutputDebugString` text.
pub const MAX_DEBUG_STRING_BYTES: usize = 1024;

/// Byte counts of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer
{
    /// Bytes asked for.
    pub requested: usize,
    /// Bytes actually moved.
    pub transferred: usize,
}

impl Transfer
{
    /// Whether every requested byte moved.
    pub fn is_complete(&self) -> bool
    {
        self.transferred == self.requested
    }

    /// Turn a short transfer at `address` into an error.
    ///
    /// ## Errors
    ///
    /// - `ShortTransfer`: fewer bytes moved than requested
    pub fn require_complete(self, address: Address) -> Result<Self>
    {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(WdbError::ShortTransfer {
                address,
                requested: self.requested,
                transferred: self.transferred,
            })
        }
    }
}

/// Read up to `len` bytes at `address`
///
/// The returned buffer is truncated to the bytes actually transferred, so an
/// invalid address yields an empty buffer.
pub fn read<A: DebugApi + ?Sized>(api: &A, process: OsHandle, address: Address, len: usize, trace: bool) -> Vec<u8>
{
    let mut buf = vec![0u8; len];
    let transferred = api.read_process_memory(process, address, &mut buf).min(len);
    buf.truncate(transferred);
    verbose!(trace, "wdb::memory", "read target memory at {address}, length {len}: {transferred} bytes");
    buf
}

/// Write `data` at `address`, then flush the instruction cache over the range.
pub fn write<A: DebugApi + ?Sized>(api: &mut A, process: OsHandle, address: Address, data: &[u8], trace: bool) -> Transfer
{
    let transferred = api.write_process_memory(process, address, data).min(data.len());
    check(api.flush_instruction_cache(process, address, data.len()));
    verbose!(
        trace,
        "wdb::memory",
        "write target memory at {address}, length {}: {transferred} bytes",
        data.len()
    );
    Transfer {
        requested: data.len(),
        transferred,
    }
}

/// Read a target pointer of `arch` width. `None` on a short read.
pub fn read_pointer<A: DebugApi + ?Sized>(api: &A, process: OsHandle, address: Address, arch: Architecture) -> Option<Address>
{
    let size = arch.pointer_size_bytes();
    let mut raw = [0u8; 8];
    if api.read_process_memory(process, address, &mut raw[..size]) < size {
        return None;
    }
    Some(Address::from(u64::from_le_bytes(raw)))
}

/// Encoding of a string in target memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEncoding
{
    /// Single-byte (ANSI code page) characters.
    Narrow,
    /// UTF-16 code units.
    Wide,
}

impl StringEncoding
{
    /// Encoding selected by an event's "is unicode" flag.
    pub fn from_unicode_flag(unicode: bool) -> Self
    {
        if unicode {
            StringEncoding::Wide
        } else {
            StringEncoding::Narrow
        }
    }

    /// Size of one code unit in bytes.
    pub fn unit_size(self) -> usize
    {
        match self {
            StringEncoding::Narrow => 1,
            StringEncoding::Wide => 2,
        }
    }
}

/// Read a NUL-terminated string one code unit at a time
///
/// The scan stops at the terminator, at the first short read, or after
/// `max_units` units, whichever comes first. Returns the raw bytes before the
/// terminator.
pub fn scan_string<A: DebugApi + ?Sized>(
    api: &A,
    process: OsHandle,
    address: Address,
    encoding: StringEncoding,
    max_units: usize,
) -> Vec<u8>
{
    let unit = encoding.unit_size();
    let mut bytes = Vec::new();
    let mut cursor = address;
    for _ in 0..max_units {
        let mut buf = [0u8; 2];
        if api.read_process_memory(process, cursor, &mut buf[..unit]) < unit {
            break;
        }
        if buf[..unit].iter().all(|b| *b == 0) {
            break;
        }
        bytes.extend_from_slice(&buf[..unit]);
        cursor = cursor + unit as u64;
    }
    bytes
}

/// Decode raw string bytes as read from the target.
///
/// Wide strings are UTF-16LE; narrow strings are taken as UTF-8 with lossy
/// replacement of anything else.
pub fn decode_string(bytes: &[u8], encoding: StringEncoding) -> String
{
    match encoding {
        StringEncoding::Narrow => String::from_utf8_lossy(bytes).into_owned(),
        StringEncoding::Wide => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
    }
}

/// Read and decode a bounded string.
pub fn read_string<A: DebugApi + ?Sized>(
    api: &A,
    process: OsHandle,
    address: Address,
    encoding: StringEncoding,
    max_units: usize,
) -> String
{
    decode_string(&scan_string(api, process, address, encoding, max_units), encoding)
}
