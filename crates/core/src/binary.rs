//! Whole-file loading: read, parse, reject, collect.

use std::fs;
use std::path::{Path, PathBuf};

use goblin::elf::header::EM_ARM;
use goblin::elf::Elf;

use crate::error::ExtractError;
use crate::scan::{self, Candidate};
use crate::segments::{self, Segment};

/// One parsed input binary, with everything the per-candidate stages need
/// already extracted so nothing borrows from the ELF parse.
///
/// Immutable once loaded; owned by a single analysis pass over one file.
#[derive(Debug)]
pub struct LoadedBinary {
    pub path: PathBuf,
    /// Raw file content, read once and reused for segment mapping.
    pub bytes: Vec<u8>,
    /// Loadable segments in program-header order.
    pub segments: Vec<Segment>,
    /// Initializer symbols found in the dynamic symbol table.
    pub candidates: Vec<Candidate>,
}

impl LoadedBinary {
    /// Read and parse `path`, applying the whole-file rejections before any
    /// emulation: the file must be a 32-bit ARM ELF and must carry a dynamic
    /// symbol table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let elf = Elf::parse(&bytes)?;
        if elf.is_64 || elf.header.e_machine != EM_ARM {
            return Err(ExtractError::UnsupportedArchitecture(elf.header.e_machine));
        }
        let segments = segments::collect(&elf, bytes.len())?;
        let candidates = scan::scan(&elf)?;
        Ok(Self { path: path.to_path_buf(), bytes, segments, candidates })
    }
}
