//! Register group masks and register values.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use smallvec::SmallVec;

/// Bitmask of register groups
///
/// The OS context API fetches and stores a thread's registers one *group* at a
/// time. The register cache tracks which groups of its snapshot are currently
/// populated with this mask.
///
/// ## Groups
///
/// - `INTEGER`: general-purpose registers
/// - `CONTROL`: instruction pointer, stack pointer, flags, `cs`/`ss`
/// - `SEGMENTS`: `ds`, `es`, `fs`, `gs`
/// - `FLOATING_POINT`: x87 stack and SSE state
///
/// ## Example
///
/// ```rust
/// use wdb_core::types::RegisterGroups;
///
/// let groups = RegisterGroups::INTEGER | RegisterGroups::CONTROL;
/// assert!(groups.contains(RegisterGroups::CONTROL));
/// assert!(!groups.contains(RegisterGroups::SEGMENTS));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegisterGroups(u8);

impl RegisterGroups
{
    /// No groups.
    pub const EMPTY: Self = RegisterGroups(0);
    /// General-purpose integer registers.
    pub const INTEGER: Self = RegisterGroups(0b0001);
    /// Control registers (pc, sp, flags, code/stack segment).
    pub const CONTROL: Self = RegisterGroups(0b0010);
    /// Data segment registers.
    pub const SEGMENTS: Self = RegisterGroups(0b0100);
    /// Floating-point and vector state.
    pub const FLOATING_POINT: Self = RegisterGroups(0b1000);
    /// Every group.
    pub const ALL: Self = RegisterGroups(0b1111);

    /// Raw bits.
    pub const fn bits(self) -> u8
    {
        self.0
    }

    /// Whether every group in `other` is also in `self`.
    pub const fn contains(self, other: Self) -> bool
    {
        self.0 & other.0 == other.0
    }

    /// Groups in `self` that are not in `other`.
    pub const fn difference(self, other: Self) -> Self
    {
        RegisterGroups(self.0 & !other.0)
    }

    /// Whether no group is set.
    pub const fn is_empty(self) -> bool
    {
        self.0 == 0
    }

    /// Iterate over the single-group masks contained in `self`.
    pub fn iter(self) -> impl Iterator<Item = RegisterGroups>
    {
        [Self::INTEGER, Self::CONTROL, Self::SEGMENTS, Self::FLOATING_POINT]
            .into_iter()
            .filter(move |group| self.contains(*group))
    }
}

impl BitOr for RegisterGroups
{
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output
    {
        RegisterGroups(self.0 | rhs.0)
    }
}

impl BitOrAssign for RegisterGroups
{
    fn bitor_assign(&mut self, rhs: Self)
    {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for RegisterGroups
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let names: Vec<&str> = self
            .iter()
            .map(|group| match group {
                Self::INTEGER => "INTEGER",
                Self::CONTROL => "CONTROL",
                Self::SEGMENTS => "SEGMENTS",
                _ => "FLOATING_POINT",
            })
            .collect();
        if names.is_empty() {
            write!(f, "RegisterGroups(EMPTY)")
        } else {
            write!(f, "RegisterGroups({})", names.join(" | "))
        }
    }
}

/// Value of a single register as raw little-endian bytes
///
/// Registers range from 2-byte segment selectors to 10-byte x87 stack slots,
/// so values are carried as bytes sized by the register's mapping entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterValue(SmallVec<[u8; 16]>);

impl RegisterValue
{
    /// Build a value from raw little-endian bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self
    {
        Self(SmallVec::from_slice(bytes))
    }

    /// Build a value of `size` bytes from an integer, truncating as needed.
    pub fn from_u64(value: u64, size: usize) -> Self
    {
        let mut bytes: SmallVec<[u8; 16]> = SmallVec::from_elem(0, size);
        let le = value.to_le_bytes();
        let count = size.min(le.len());
        bytes[..count].copy_from_slice(&le[..count]);
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8]
    {
        &self.0
    }

    /// Width in bytes.
    pub fn len(&self) -> usize
    {
        self.0.len()
    }

    /// Whether the value has no bytes.
    pub fn is_empty(&self) -> bool
    {
        self.0.is_empty()
    }

    /// Low 64 bits interpreted as an unsigned integer.
    pub fn as_u64(&self) -> u64
    {
        let mut le = [0u8; 8];
        let count = self.0.len().min(8);
        le[..count].copy_from_slice(&self.0[..count]);
        u64::from_le_bytes(le)
    }
}

impl fmt::Display for RegisterValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.0.len() <= 8 {
            write!(f, "0x{:x}", self.as_u64())
        } else {
            f.write_str("0x")?;
            for byte in self.0.iter().rev() {
                write!(f, "{byte:02x}")?;
            }
            Ok(())
        }
    }
}
