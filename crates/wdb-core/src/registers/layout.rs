//! # Register Layouts
//!
//! Static register mapping tables for the OS `CONTEXT` structure.
//!
//! Each table entry gives the byte offset of one register inside the raw
//! `CONTEXT` blob, its width, and the register group that the OS fetches and
//! stores it with. The debugger's register numbering is the table order.
//!
//! ## References
//!
//! - [CONTEXT (x64)](https://learn.microsoft.com/en-us/windows/win32/api/winnt/ns-winnt-context)
//! - [WOW64_CONTEXT (x86)](https://learn.microsoft.com/en-us/windows/win32/api/winnt/ns-winnt-wow64_context)
//! - `winnt.h`: `CONTEXT_AMD64`, `CONTEXT_i386`, `CONTEXT_CONTROL`, ...

use crate::types::{Architecture, RegisterGroups};

/// Location of one register inside the `CONTEXT` blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMapping
{
    /// Register name as printed by the debugger.
    pub name: &'static str,
    /// Byte offset into the blob.
    pub offset: usize,
    /// Width in bytes.
    pub size: usize,
    /// Group the OS transfers this register with.
    pub group: RegisterGroups,
}

const fn reg(name: &'static str, offset: usize, size: usize, group: RegisterGroups) -> RegisterMapping
{
    RegisterMapping { name, offset, size, group }
}

const INT: RegisterGroups = RegisterGroups::INTEGER;
const CTL: RegisterGroups = RegisterGroups::CONTROL;
const SEG: RegisterGroups = RegisterGroups::SEGMENTS;
const FP: RegisterGroups = RegisterGroups::FLOATING_POINT;

/// Trap flag in `EFLAGS`; set to single-step one instruction.
pub const TRAP_FLAG: u64 = 0x100;

/// Register table and `CONTEXT` geometry for one architecture.
#[derive(Debug)]
pub struct RegisterLayout
{
    /// Architecture described by this layout.
    pub arch: Architecture,
    /// Size of the `CONTEXT` blob in bytes.
    pub context_size: usize,
    /// Offset of the `ContextFlags` field.
    pub context_flags_offset: usize,
    /// Architecture bit that every `ContextFlags` value must carry.
    pub context_arch_flag: u32,
    /// Register table in debugger numbering.
    pub registers: &'static [RegisterMapping],
    /// Index of the program counter.
    pub pc: usize,
    /// Index of the stack pointer.
    pub sp: usize,
    /// Index of the flags register.
    pub flags: usize,
}

impl RegisterLayout
{
    /// Layout for `arch`.
    pub fn for_arch(arch: Architecture) -> &'static RegisterLayout
    {
        match arch {
            Architecture::X86 => &X86_LAYOUT,
            Architecture::X86_64 => &X86_64_LAYOUT,
        }
    }

    /// Number of registers.
    pub fn len(&self) -> usize
    {
        self.registers.len()
    }

    /// Whether the table is empty (never true for the built-in layouts).
    pub fn is_empty(&self) -> bool
    {
        self.registers.is_empty()
    }

    /// Mapping for register `index`, if it exists.
    pub fn get(&self, index: usize) -> Option<&RegisterMapping>
    {
        self.registers.get(index)
    }

    /// Debugger index of the register called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize>
    {
        self.registers.iter().position(|mapping| mapping.name == name)
    }

    /// `ContextFlags` value selecting `groups`.
    pub fn os_context_flags(&self, groups: RegisterGroups) -> u32
    {
        let mut flags = self.context_arch_flag;
        for group in groups.iter() {
            flags |= match group {
                RegisterGroups::CONTROL => 0x1,
                RegisterGroups::INTEGER => 0x2,
                RegisterGroups::SEGMENTS => 0x4,
                _ => 0x8,
            };
        }
        flags
    }

    /// Byte ranges of the blob that belong to `groups`.
    pub fn group_ranges(&self, groups: RegisterGroups) -> impl Iterator<Item = std::ops::Range<usize>> + '_
    {
        self.registers
            .iter()
            .filter(move |mapping| groups.contains(mapping.group))
            .map(|mapping| mapping.offset..mapping.offset + mapping.size)
    }
}

static X86_64_REGISTERS: [RegisterMapping; 32] = [
    reg("rax", 0x78, 8, INT),
    reg("rbx", 0x90, 8, INT),
    reg("rcx", 0x80, 8, INT),
    reg("rdx", 0x88, 8, INT),
    reg("rsi", 0xA8, 8, INT),
    reg("rdi", 0xB0, 8, INT),
    reg("rbp", 0xA0, 8, INT),
    reg("rsp", 0x98, 8, CTL),
    reg("r8", 0xB8, 8, INT),
    reg("r9", 0xC0, 8, INT),
    reg("r10", 0xC8, 8, INT),
    reg("r11", 0xD0, 8, INT),
    reg("r12", 0xD8, 8, INT),
    reg("r13", 0xE0, 8, INT),
    reg("r14", 0xE8, 8, INT),
    reg("r15", 0xF0, 8, INT),
    reg("rip", 0xF8, 8, CTL),
    reg("eflags", 0x44, 4, CTL),
    reg("cs", 0x38, 2, CTL),
    reg("ss", 0x42, 2, CTL),
    reg("ds", 0x3A, 2, SEG),
    reg("es", 0x3C, 2, SEG),
    reg("fs", 0x3E, 2, SEG),
    reg("gs", 0x40, 2, SEG),
    reg("st0", 0x120, 10, FP),
    reg("st1", 0x130, 10, FP),
    reg("st2", 0x140, 10, FP),
    reg("st3", 0x150, 10, FP),
    reg("st4", 0x160, 10, FP),
    reg("st5", 0x170, 10, FP),
    reg("st6", 0x180, 10, FP),
    reg("st7", 0x190, 10, FP),
];

static X86_REGISTERS: [RegisterMapping; 24] = [
    reg("eax", 0xB0, 4, INT),
    reg("ecx", 0xAC, 4, INT),
    reg("edx", 0xA8, 4, INT),
    reg("ebx", 0xA4, 4, INT),
    reg("esp", 0xC4, 4, CTL),
    reg("ebp", 0xB4, 4, CTL),
    reg("esi", 0xA0, 4, INT),
    reg("edi", 0x9C, 4, INT),
    reg("eip", 0xB8, 4, CTL),
    reg("eflags", 0xC0, 4, CTL),
    reg("cs", 0xBC, 4, CTL),
    reg("ss", 0xC8, 4, CTL),
    reg("ds", 0x98, 4, SEG),
    reg("es", 0x94, 4, SEG),
    reg("fs", 0x90, 4, SEG),
    reg("gs", 0x8C, 4, SEG),
    reg("st0", 0x38, 10, FP),
    reg("st1", 0x42, 10, FP),
    reg("st2", 0x4C, 10, FP),
    reg("st3", 0x56, 10, FP),
    reg("st4", 0x60, 10, FP),
    reg("st5", 0x6A, 10, FP),
    reg("st6", 0x74, 10, FP),
    reg("st7", 0x7E, 10, FP),
];

/// AMD64 `CONTEXT` (`CONTEXT_AMD64` = 0x0010_0000).
pub static X86_64_LAYOUT: RegisterLayout = RegisterLayout {
    arch: Architecture::X86_64,
    context_size: 1232,
    context_flags_offset: 0x30,
    context_arch_flag: 0x0010_0000,
    registers: &X86_64_REGISTERS,
    pc: 16,
    sp: 7,
    flags: 17,
};

/// i386 `CONTEXT` (`CONTEXT_i386` = 0x0001_0000).
pub static X86_LAYOUT: RegisterLayout = RegisterLayout {
    arch: Architecture::X86,
    context_size: 716,
    context_flags_offset: 0x00,
    context_arch_flag: 0x0001_0000,
    registers: &X86_REGISTERS,
    pc: 8,
    sp: 4,
    flags: 9,
};
