//! qrcfind-core
//!
//! Core library for recovering embedded Qt resource tables from stripped ARM
//! ELF binaries. A binary that statically links its resources exports one
//! `qInitResources_<bundle>` initializer per bundle; each initializer loads a
//! format version and three table pointers into r0-r3 and calls the
//! registration routine. This crate finds those initializers by their mangled
//! names, executes each one in an isolated emulator just long enough to
//! observe the staged arguments, and maps the recovered virtual addresses
//! back to file offsets.
//!
//! All substantive logic lives here so it is fully testable and reusable
//! from multiple frontends; the CLI is a thin batch loop on top.

pub mod binary;
pub mod error;
pub mod resolve;
pub mod sandbox;
pub mod scan;
pub mod segments;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
