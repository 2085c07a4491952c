use std::path::Path;

use qrcfind_core::resolve::BundleLocation;
use serde::Serialize;

/// One resolved bundle tagged with its source binary, for `--json` output.
#[derive(Debug, Serialize)]
pub struct BundleRecord {
    pub path: String,
    #[serde(flatten)]
    pub location: BundleLocation,
}

/// Render the machine-parseable success line for one resolved bundle.
///
/// Field order and the `#` marker are a frozen contract consumers parse:
/// path, decimal format version, then the tree/data/names file offsets in
/// decimal padded to a minimum width of 8, then `#` and the bundle name.
pub fn success_line(path: &Path, location: &BundleLocation) -> String {
    format!(
        "{} {} {:8} {:8} {:8} # {}",
        path.display(),
        location.version,
        location.tree_offset,
        location.data_offset,
        location.names_offset,
        location.bundle
    )
}
