//! Dynamic-symbol scanning for resource-registration initializers.

use goblin::elf::Elf;

use crate::error::ExtractError;

/// Literal identifier tag every initializer symbol embeds.
const INIT_TAG: &str = "qInitResources_";

/// Itanium-mangling prefix for a free function.
const MANGLE_PREFIX: &str = "_Z";

/// A qualifying name is at least this long: the mangling overhead (prefix,
/// length digits, trailing signature character) accounts for 3 characters,
/// and the identifier itself must contribute at least 12 more.
const MIN_NAME_LEN: usize = 15;

/// One scanned initializer symbol, ready for sandboxed execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Resource-bundle name embedded in the symbol.
    pub bundle: String,
    /// Entry virtual address, verbatim from the symbol table. The low bit is
    /// preserved: set means the initializer uses the Thumb encoding.
    pub entry: u64,
}

impl Candidate {
    /// True when the entry address selects the Thumb instruction encoding.
    pub fn is_thumb(&self) -> bool {
        self.entry & 1 == 1
    }

    /// Address of the initializer's first basic block (mode bit cleared).
    pub fn first_block(&self) -> u64 {
        self.entry & !1
    }
}

/// Match a dynamic-symbol name against the initializer shape
/// `_Z<len>qInitResources_<bundle>v`, returning the embedded bundle name.
///
/// `<len>` is the decimal length of the mangled identifier
/// (`qInitResources_<bundle>`), and the trailing `v` marks the
/// void-return, no-argument signature. A mismatched length field, a missing
/// terminal `v`, an empty bundle name, or a name below the minimum length
/// all fail the match.
pub fn match_init_symbol(name: &str) -> Option<&str> {
    if name.len() < MIN_NAME_LEN {
        return None;
    }
    let rest = name.strip_prefix(MANGLE_PREFIX)?;
    let digits_end = rest.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let (digits, tail) = rest.split_at(digits_end);
    let ident_len: usize = digits.parse().ok()?;
    let ident = tail.strip_suffix('v')?;
    if ident.len() != ident_len {
        return None;
    }
    let bundle = ident.strip_prefix(INIT_TAG)?;
    if bundle.is_empty() {
        return None;
    }
    Some(bundle)
}

/// Scan the dynamic symbol table for initializer candidates.
///
/// Fails with `NoSymbolTable` when the binary carries no dynamic symbols at
/// all. An empty result is not an error here; the driver decides how to
/// report a binary with nothing to extract.
pub fn scan(elf: &Elf) -> Result<Vec<Candidate>, ExtractError> {
    if elf.dynsyms.is_empty() {
        return Err(ExtractError::NoSymbolTable);
    }
    let mut candidates = Vec::new();
    for sym in elf.dynsyms.iter() {
        let Some(name) = elf.dynstrtab.get_at(sym.st_name) else {
            continue;
        };
        if let Some(bundle) = match_init_symbol(name) {
            candidates.push(Candidate { bundle: bundle.to_string(), entry: sym.st_value });
        }
    }
    Ok(candidates)
}
