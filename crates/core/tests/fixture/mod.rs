//! Hand-assembled little-endian ELF32 ARM fixture binaries.
//!
//! goblin resolves dynamic symbols through `PT_DYNAMIC` (`DT_SYMTAB` +
//! `DT_HASH`), so the fixture carries a real dynamic segment instead of
//! section headers. Everything lives in one `PT_LOAD` at vaddr 0 whose bytes
//! start at file offset 0x100: initializer code at 0x500, then the dynamic
//! string/hash/symbol tables and the dynamic array near the segment's end.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub const EM_ARM: u16 = 40;
pub const EM_386: u16 = 3;

/// Where the loadable segment's bytes start in the file.
pub const SEG_OFFSET: u64 = 0x100;
/// File-backed (and in-memory) size of the loadable segment.
pub const SEG_FILESZ: u64 = 0x4000;
/// Virtual address of the initializer code.
pub const CODE_VADDR: u32 = 0x500;

const DYNSTR_VADDR: u32 = 0x3800;
const HASH_VADDR: u32 = 0x3840;
const DYNSYM_VADDR: u32 = 0x3860;
const DYNAMIC_VADDR: u32 = 0x3880;

const DT_NULL: u32 = 0;
const DT_HASH: u32 = 4;
const DT_STRTAB: u32 = 5;
const DT_SYMTAB: u32 = 6;
const DT_STRSZ: u32 = 10;
const DT_SYMENT: u32 = 11;

const NOP: u32 = 0xE1A0_0000; // mov r0, r0

/// The canonical initializer: stage the four registration arguments, then
/// call out. The `bl` lands at `CODE_VADDR + 0x40`, inside the NOP padding.
pub fn init_code() -> Vec<u32> {
    vec![
        0xE3A0_0007, // mov r0, #7
        0xE3A0_1A01, // mov r1, #0x1000
        0xE3A0_2A02, // mov r2, #0x2000
        0xE3A0_3A03, // mov r3, #0x3000
        0xEB00_000A, // bl CODE_VADDR+0x40
    ]
}

/// Same shape, but r3 points past every file-backed range.
pub fn init_code_unmapped_data() -> Vec<u32> {
    vec![
        0xE3A0_0007, // mov r0, #7
        0xE3A0_1A01, // mov r1, #0x1000
        0xE3A0_2A02, // mov r2, #0x2000
        0xE3A0_3A08, // mov r3, #0x8000
        0xEB00_000A, // bl CODE_VADDR+0x40
    ]
}

/// Branch away immediately, before any argument is staged.
pub fn branch_only_code() -> Vec<u32> {
    vec![0xEA00_000E] // b CODE_VADDR+0x40
}

pub struct Fixture {
    machine: u16,
    symbol: (String, u32),
    code: Vec<u32>,
    with_dynamic: bool,
}

impl Fixture {
    /// ARM fixture exporting the canonical initializer as
    /// `_Z23qInitResources_testdatav` at `CODE_VADDR`.
    pub fn arm() -> Self {
        Self {
            machine: EM_ARM,
            symbol: ("_Z23qInitResources_testdatav".to_string(), CODE_VADDR),
            code: init_code(),
            with_dynamic: true,
        }
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn symbol(mut self, name: &str, value: u32) -> Self {
        self.symbol = (name.to_string(), value);
        self
    }

    pub fn code(mut self, code: Vec<u32>) -> Self {
        self.code = code;
        self
    }

    /// Drop the `PT_DYNAMIC` entry so the binary has no dynamic symbols.
    pub fn without_dynamic(mut self) -> Self {
        self.with_dynamic = false;
        self
    }

    /// Assemble the fixture into a byte image.
    pub fn build(&self) -> Vec<u8> {
        let mut file = vec![0u8; (SEG_OFFSET + SEG_FILESZ) as usize];

        // ELF header.
        file[..4].copy_from_slice(b"\x7fELF");
        file[4] = 1; // ELFCLASS32
        file[5] = 1; // little-endian
        file[6] = 1; // EV_CURRENT
        put_u16(&mut file, 16, 3); // ET_DYN
        put_u16(&mut file, 18, self.machine);
        put_u32(&mut file, 20, 1);
        put_u32(&mut file, 28, 52); // e_phoff
        put_u32(&mut file, 36, 0x0500_0000); // EABI v5
        put_u16(&mut file, 40, 52);
        put_u16(&mut file, 42, 32);
        put_u16(&mut file, 44, if self.with_dynamic { 2 } else { 1 });
        put_u16(&mut file, 46, 40);

        // PT_LOAD covering the whole image at vaddr 0.
        let ph = 52;
        put_u32(&mut file, ph, 1);
        put_u32(&mut file, ph + 4, SEG_OFFSET as u32);
        put_u32(&mut file, ph + 16, SEG_FILESZ as u32);
        put_u32(&mut file, ph + 20, SEG_FILESZ as u32);
        put_u32(&mut file, ph + 24, 0x5); // PF_R | PF_X
        put_u32(&mut file, ph + 28, 0x1000);

        // Initializer code, NOP-padded so short sequences still land their
        // branches on mapped, executable words.
        let mut words = self.code.clone();
        words.resize(64, NOP);
        let mut at = SEG_OFFSET as usize + CODE_VADDR as usize;
        for word in &words {
            put_u32(&mut file, at, *word);
            at += 4;
        }

        if self.with_dynamic {
            // PT_DYNAMIC.
            let ph = 52 + 32;
            put_u32(&mut file, ph, 2);
            put_u32(&mut file, ph + 4, SEG_OFFSET as u32 + DYNAMIC_VADDR);
            put_u32(&mut file, ph + 8, DYNAMIC_VADDR);
            put_u32(&mut file, ph + 12, DYNAMIC_VADDR);
            put_u32(&mut file, ph + 16, 48);
            put_u32(&mut file, ph + 20, 48);
            put_u32(&mut file, ph + 24, 0x4); // PF_R
            put_u32(&mut file, ph + 28, 4);

            // .dynstr: null byte, the one name, null terminator.
            let name = self.symbol.0.as_bytes();
            let strtab_at = SEG_OFFSET as usize + DYNSTR_VADDR as usize;
            file[strtab_at + 1..strtab_at + 1 + name.len()].copy_from_slice(name);
            let strsz = name.len() as u32 + 2;

            // .hash: one bucket, two chain entries (null symbol + export).
            let hash_at = SEG_OFFSET as usize + HASH_VADDR as usize;
            put_u32(&mut file, hash_at, 1);
            put_u32(&mut file, hash_at + 4, 2);

            // .dynsym entry 1; entry 0 stays the null symbol.
            let sym_at = SEG_OFFSET as usize + DYNSYM_VADDR as usize + 16;
            put_u32(&mut file, sym_at, 1); // st_name
            put_u32(&mut file, sym_at + 4, self.symbol.1);
            file[sym_at + 12] = 0x12; // GLOBAL | FUNC
            put_u16(&mut file, sym_at + 14, 1);

            // .dynamic array.
            let dyn_at = SEG_OFFSET as usize + DYNAMIC_VADDR as usize;
            let entries = [
                (DT_HASH, HASH_VADDR),
                (DT_STRTAB, DYNSTR_VADDR),
                (DT_SYMTAB, DYNSYM_VADDR),
                (DT_STRSZ, strsz),
                (DT_SYMENT, 16),
                (DT_NULL, 0),
            ];
            for (i, (tag, value)) in entries.iter().enumerate() {
                put_u32(&mut file, dyn_at + i * 8, *tag);
                put_u32(&mut file, dyn_at + i * 8 + 4, *value);
            }
        }

        file
    }

    /// Write the assembled fixture under `dir` and return its path.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).expect("write fixture");
        path
    }
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
