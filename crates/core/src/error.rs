use std::path::PathBuf;

use thiserror::Error;
use unicorn_engine::unicorn_const::uc_error;

/// Failure taxonomy for one extraction pass.
///
/// `Io`, `Parse`, `UnsupportedArchitecture` and `NoSymbolTable` are fatal to
/// the file they occur in; `EmulationFault`, `ArgumentsNotSet` and
/// `AddressNotMapped` are scoped to a single candidate. The batch driver
/// converts both classes into diagnostics and keeps going.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse ELF: {0}")]
    Parse(#[from] goblin::error::Error),
    #[error("unsupported architecture (e_machine {0:#x}); only 32-bit ARM is supported")]
    UnsupportedArchitecture(u16),
    #[error("no dynamic symbol table")]
    NoSymbolTable,
    #[error("emulation fault: {0:?}")]
    EmulationFault(uc_error),
    #[error("initializer branched away before loading its arguments")]
    ArgumentsNotSet,
    #[error("address {0:#x} is not file-backed by any loadable segment")]
    AddressNotMapped(u64),
}
