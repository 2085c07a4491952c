//! Translation of execution outcomes into on-disk bundle locations.

use serde::Serialize;

use crate::binary::LoadedBinary;
use crate::error::ExtractError;
use crate::sandbox::{self, RawArguments, SandboxConfig};
use crate::scan::Candidate;
use crate::segments::{self, Segment};

/// Terminal artifact: one resource bundle located in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleLocation {
    /// Resource-bundle name from the initializer symbol.
    pub bundle: String,
    /// Resource format version, passed through unmodified.
    pub version: u32,
    /// File offset of the resource tree.
    pub tree_offset: u64,
    /// File offset of the data blob.
    pub data_offset: u64,
    /// File offset of the name table.
    pub names_offset: u64,
}

/// Map the three recovered pointers through the segment list to file
/// offsets. Fails with `AddressNotMapped` when any of them falls outside
/// every file-backed range.
pub fn resolve(
    candidate: &Candidate,
    args: &RawArguments,
    segments: &[Segment],
) -> Result<BundleLocation, ExtractError> {
    Ok(BundleLocation {
        bundle: candidate.bundle.clone(),
        version: args.version,
        tree_offset: segments::translate(segments, args.tree)?,
        data_offset: segments::translate(segments, args.data)?,
        names_offset: segments::translate(segments, args.names)?,
    })
}

/// Run one candidate through the sandbox and translate the outcome: the
/// whole per-candidate pipeline the batch driver consumes.
pub fn extract(
    binary: &LoadedBinary,
    candidate: &Candidate,
    config: &SandboxConfig,
) -> Result<BundleLocation, ExtractError> {
    let args = sandbox::run(binary, candidate, config)?;
    resolve(candidate, &args, &binary.segments)
}
