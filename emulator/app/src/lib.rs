/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Library interface for the SoC board emulator.

--*/

pub mod boot;
pub mod composer;
pub mod emulator;
pub mod machine;

pub use boot::{BootDescriptor, BootError, BootLoader, RawImageLoader};
pub use composer::{compose, Overrides, UNCLAIMED_MODEL};
pub use emulator::{Emulator, EmulatorArgs};
pub use machine::Machine;

use emulator_bus::MapError;
use emulator_cpu::CpuError;
use emulator_intc::IntcError;
use soc_config::ConfigError;
use thiserror::Error;

/// Anything that stops a board from being built or booted.
#[derive(Error, Debug)]
pub enum BoardError {
    #[error("unknown machine `{0}`")]
    UnknownMachine(String),
    #[error("{board} supports 1 to {max} cores, got {requested}")]
    CoreCount {
        board: String,
        requested: u32,
        max: u32,
    },
    #[error("ram size {requested:#x} does not fit the {region} region of {size:#x} bytes")]
    RamTooLarge {
        requested: u64,
        region: String,
        size: u64,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Cpu(#[from] CpuError),
    #[error(transparent)]
    Intc(#[from] IntcError),
    #[error(transparent)]
    Boot(#[from] BootError),
}
