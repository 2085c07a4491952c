//! Sandboxed execution of one initializer's observable prefix.
//!
//! Each candidate gets a fresh emulation context: the binary's loadable
//! segments copied in with their own permissions, a scratch stack, and the
//! four argument registers poisoned with a sentinel. Execution is allowed to
//! cover only the initializer's first basic block: a block-entry guard stops
//! the emulator the instant control transfers anywhere else, which is exactly
//! the moment the outgoing call's arguments are staged in r0-r3.

use unicorn_engine::unicorn_const::{uc_error, Arch, Mode, Permission};
use unicorn_engine::{RegisterARM, Unicorn};

use crate::binary::LoadedBinary;
use crate::error::ExtractError;
use crate::scan::Candidate;
use crate::segments::Segment;

/// All-ones poison written to r0-r3 before the run. A register still holding
/// it afterwards was never assigned by the initializer; the value can never
/// be a legitimate pointer or format version.
pub const ARG_SENTINEL: u64 = 0xFFFF_FFFF;

/// Tunables for the per-candidate sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Bytes of initializer code the run may cover before halting at the
    /// ceiling. Argument setup plus the registration call fit comfortably in
    /// the default for every toolchain prologue seen so far; raise it for
    /// initializers with stack-protector or long Thumb prologues.
    pub exec_window: u64,
    /// Alignment granularity for emulator mappings. Mapping bases are
    /// aligned down and spans rounded up to this; the emulator rejects
    /// anything finer than its 4 KiB page.
    pub map_granularity: u64,
    /// Virtual address just above the scratch stack.
    pub stack_top: u64,
    /// Scratch stack size in bytes.
    pub stack_size: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            exec_window: 128,
            map_granularity: 0x1000,
            stack_top: 0x4000_0000,
            stack_size: 0x1_0000,
        }
    }
}

/// The four argument-register values observed when the run halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawArguments {
    /// Resource format version (r0).
    pub version: u32,
    /// Virtual address of the resource tree (r1).
    pub tree: u64,
    /// Virtual address of the name table (r2).
    pub names: u64,
    /// Virtual address of the data blob (r3).
    pub data: u64,
}

/// Why a guarded run stopped. Both variants complete the observable prefix;
/// genuine emulator faults surface as errors instead.
enum Halt {
    /// The guard fired: control was about to leave the first basic block.
    LeftFirstBlock,
    /// Execution ran straight to the window ceiling without branching.
    ReachedCeiling,
}

/// Hook state: the one block address execution may stay in.
struct Guard {
    first_block: u64,
    left: bool,
}

/// Execute `candidate`'s first basic block inside a fresh sandbox and return
/// the argument registers it staged.
pub fn run(
    binary: &LoadedBinary,
    candidate: &Candidate,
    config: &SandboxConfig,
) -> Result<RawArguments, ExtractError> {
    let mode = if candidate.is_thumb() { Mode::THUMB } else { Mode::ARM };
    let guard = Guard { first_block: candidate.first_block(), left: false };
    let mut emu =
        Unicorn::new_with_data(Arch::ARM, mode, guard).map_err(ExtractError::EmulationFault)?;

    map_segments(&mut emu, binary, config).map_err(ExtractError::EmulationFault)?;
    arm_registers(&mut emu, config).map_err(ExtractError::EmulationFault)?;

    match start_guarded(&mut emu, candidate, config) {
        Ok(Halt::LeftFirstBlock) | Ok(Halt::ReachedCeiling) => {}
        Err(fault) => return Err(ExtractError::EmulationFault(fault)),
    }

    let version = emu.reg_read(RegisterARM::R0).map_err(ExtractError::EmulationFault)?;
    let tree = emu.reg_read(RegisterARM::R1).map_err(ExtractError::EmulationFault)?;
    let names = emu.reg_read(RegisterARM::R2).map_err(ExtractError::EmulationFault)?;
    let data = emu.reg_read(RegisterARM::R3).map_err(ExtractError::EmulationFault)?;

    if [version, tree, names, data].contains(&ARG_SENTINEL) {
        return Err(ExtractError::ArgumentsNotSet);
    }

    Ok(RawArguments { version: version as u32, tree, names, data })
}

/// Copy every loadable segment into the emulator at its virtual address,
/// file bytes first, zero-fill up to `memsz`. Segments load in binary order;
/// a later segment's bytes may overwrite an earlier one's where they share a
/// page.
fn map_segments(
    emu: &mut Unicorn<Guard>,
    binary: &LoadedBinary,
    config: &SandboxConfig,
) -> Result<(), uc_error> {
    let granularity = config.map_granularity.max(1);
    for seg in &binary.segments {
        let base = seg.vaddr - seg.vaddr % granularity;
        let span = round_up(seg.vaddr + seg.memsz - base, granularity);
        emu.mem_map(base, span as usize, permissions(seg))?;

        let file_range = seg.offset as usize..(seg.offset + seg.filesz) as usize;
        let mut image = binary.bytes[file_range].to_vec();
        image.resize(seg.memsz as usize, 0);
        emu.mem_write(seg.vaddr, &image)?;
    }
    Ok(())
}

/// Map the scratch stack, point SP at its top, and poison r0-r3.
fn arm_registers(emu: &mut Unicorn<Guard>, config: &SandboxConfig) -> Result<(), uc_error> {
    emu.mem_map(
        config.stack_top - config.stack_size,
        config.stack_size as usize,
        Permission::READ | Permission::WRITE,
    )?;
    emu.reg_write(RegisterARM::SP, config.stack_top)?;
    for reg in [RegisterARM::R0, RegisterARM::R1, RegisterARM::R2, RegisterARM::R3] {
        emu.reg_write(reg, ARG_SENTINEL)?;
    }
    Ok(())
}

/// Start execution at the candidate's entry with the block-entry guard
/// installed, and report how the run stopped.
fn start_guarded(
    emu: &mut Unicorn<Guard>,
    candidate: &Candidate,
    config: &SandboxConfig,
) -> Result<Halt, uc_error> {
    emu.add_block_hook(1, 0, |uc, address, _size| {
        if address != uc.get_data().first_block {
            uc.get_data_mut().left = true;
            let _ = uc.emu_stop();
        }
    })?;

    let ceiling = candidate.first_block() + config.exec_window;
    let outcome = emu.emu_start(candidate.entry, ceiling, 0, 0);

    // The guard stopping the run is the expected outcome, not a fault, even
    // if the emulator also reported an error while winding down.
    if emu.get_data().left {
        return Ok(Halt::LeftFirstBlock);
    }
    outcome.map(|()| Halt::ReachedCeiling)
}

fn permissions(seg: &Segment) -> Permission {
    let mut perms = Permission::NONE;
    if seg.is_executable() {
        perms |= Permission::EXEC;
    }
    if seg.is_writable() {
        perms |= Permission::WRITE;
    }
    if seg.is_readable() {
        perms |= Permission::READ;
    }
    perms
}

fn round_up(value: u64, granularity: u64) -> u64 {
    value.div_ceil(granularity) * granularity
}
