use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use qrcfind::{success_line, BundleRecord};
use qrcfind_core::binary::LoadedBinary;
use qrcfind_core::resolve;
use qrcfind_core::sandbox::SandboxConfig;

/// Recover embedded Qt resource tables from stripped ARM ELF binaries.
///
/// Every statically linked resource bundle exports a `qInitResources_*`
/// initializer. For each one, the tool executes the initializer's first
/// basic block in an isolated emulator, reads the arguments it stages for
/// the registration call, and prints where the resource tree, data blob,
/// and name table live in the file.
#[derive(Parser, Debug)]
#[command(
    name = "qrcfind",
    version,
    about = "Recover embedded Qt resource tables from ARM ELF binaries",
    long_about = None
)]
struct Cli {
    /// ARM ELF binaries to scan.
    #[arg(required = true)]
    binaries: Vec<PathBuf>,

    /// Emit a JSON array of results instead of text lines.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Bytes of initializer code the sandbox may execute before halting.
    #[arg(long, default_value_t = 128)]
    exec_window: u64,

    /// Alignment granularity for emulator memory mappings, in bytes.
    #[arg(long, default_value_t = 0x1000)]
    map_granularity: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Drive the whole batch and return the number of failures.
///
/// Failures never abort the batch: whole-file problems produce an `error:`
/// diagnostic and skip to the next binary, per-candidate problems produce a
/// `warning:` and skip to the next candidate. A scanned binary with zero
/// candidates is reported as a warning too.
fn run(cli: &Cli) -> Result<usize> {
    let config = SandboxConfig {
        exec_window: cli.exec_window,
        map_granularity: cli.map_granularity,
        ..SandboxConfig::default()
    };

    let mut failures = 0usize;
    let mut records = Vec::new();

    for path in &cli.binaries {
        let binary = match LoadedBinary::load(path) {
            Ok(binary) => binary,
            Err(err) => {
                failures += 1;
                eprintln!("error: {}: {err}", path.display());
                continue;
            }
        };

        if binary.candidates.is_empty() {
            failures += 1;
            eprintln!(
                "warning: {}: no resource initializers found (you may need to look manually)",
                path.display()
            );
            continue;
        }

        for candidate in &binary.candidates {
            match resolve::extract(&binary, candidate, &config) {
                Ok(location) => {
                    if cli.json {
                        records.push(BundleRecord { path: path.display().to_string(), location });
                    } else {
                        println!("{}", success_line(path, &location));
                    }
                }
                Err(err) => {
                    failures += 1;
                    eprintln!(
                        "warning: {}: failed to extract resources from qInitResources_{}@{:#x}: {err}",
                        path.display(),
                        candidate.bundle,
                        candidate.entry
                    );
                }
            }
        }
    }

    if cli.json {
        let serialized =
            serde_json::to_string_pretty(&records).context("Failed to serialize results to JSON")?;
        println!("{serialized}");
    }

    Ok(failures)
}
