//! Loadable-segment collection and virtual-to-file address translation.

use goblin::elf::program_header::{PF_R, PF_W, PF_X, PT_LOAD};
use goblin::elf::Elf;

use crate::error::ExtractError;

/// One loadable region of the binary.
///
/// `memsz >= filesz` always holds; the tail beyond `filesz` is zero-filled
/// when the segment is mapped and has no file offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Virtual base address.
    pub vaddr: u64,
    /// Offset of the segment's first byte in the file.
    pub offset: u64,
    /// Number of bytes backed by the file.
    pub filesz: u64,
    /// In-memory size, including any zero-filled tail.
    pub memsz: u64,
    /// ELF permission flags (`PF_X` / `PF_W` / `PF_R`).
    pub flags: u32,
}

impl Segment {
    pub fn is_executable(&self) -> bool {
        self.flags & PF_X != 0
    }

    pub fn is_writable(&self) -> bool {
        self.flags & PF_W != 0
    }

    pub fn is_readable(&self) -> bool {
        self.flags & PF_R != 0
    }
}

/// Collect the loadable segments of `elf` in the order they appear.
///
/// Program-header entries other than `PT_LOAD` are ignored. Entries whose
/// file-backed range exceeds the file itself or whose `filesz` exceeds
/// `memsz` are rejected as malformed rather than silently clamped.
pub fn collect(elf: &Elf, file_len: usize) -> Result<Vec<Segment>, ExtractError> {
    let mut segments = Vec::new();
    for ph in &elf.program_headers {
        if ph.p_type != PT_LOAD || ph.p_memsz == 0 {
            continue;
        }
        if ph.p_filesz > ph.p_memsz {
            return Err(goblin::error::Error::Malformed(format!(
                "segment at {:#x} has filesz {:#x} > memsz {:#x}",
                ph.p_vaddr, ph.p_filesz, ph.p_memsz
            ))
            .into());
        }
        match ph.p_offset.checked_add(ph.p_filesz) {
            Some(end) if end <= file_len as u64 => {}
            _ => {
                return Err(goblin::error::Error::Malformed(format!(
                    "segment at {:#x} extends past end of file",
                    ph.p_vaddr
                ))
                .into());
            }
        }
        segments.push(Segment {
            vaddr: ph.p_vaddr,
            offset: ph.p_offset,
            filesz: ph.p_filesz,
            memsz: ph.p_memsz,
            flags: ph.p_flags,
        });
    }
    Ok(segments)
}

/// Translate a virtual address to its file offset.
///
/// Only the file-backed extent of each segment participates: an address that
/// falls in a zero-filled tail (between `filesz` and `memsz`) has no byte in
/// the file and fails with `AddressNotMapped`, as does anything outside every
/// segment.
pub fn translate(segments: &[Segment], vaddr: u64) -> Result<u64, ExtractError> {
    segments
        .iter()
        .find(|s| vaddr >= s.vaddr && vaddr < s.vaddr + s.filesz)
        .map(|s| vaddr - s.vaddr + s.offset)
        .ok_or(ExtractError::AddressNotMapped(vaddr))
}
