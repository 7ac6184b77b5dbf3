/*++

Licensed under the Apache-2.0 license.

File Name:

    emulator.rs

Abstract:

    File contains the command line arguments and the Emulator built from
    them.

--*/

use crate::composer::{compose, Overrides};
use crate::machine::Machine;
use crate::BoardError;
use clap::Parser;
use clap_num::maybe_hex;
use emulator_periph::{DeviceIo, UartOutput};
use soc_config::{BoardDescriptor, BootMode};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, name = "SoC Board Emulator")]
pub struct EmulatorArgs {
    /// Built-in board to compose.
    #[arg(short, long, default_value = "thomas-a53")]
    pub machine: String,

    /// Board descriptor in TOML; takes precedence over --machine.
    #[arg(short, long)]
    pub board_config: Option<PathBuf>,

    /// List the built-in boards and exit.
    #[arg(long)]
    pub list_machines: bool,

    /// Number of cores.
    #[arg(long)]
    pub smp: Option<u32>,

    /// RAM handed to the guest, in bytes.
    #[arg(long, value_parser=maybe_hex::<u64>)]
    pub ram_size: Option<u64>,

    /// Entry address overriding the board reset vector.
    #[arg(long, value_parser=maybe_hex::<u64>)]
    pub entry: Option<u64>,

    /// Raw image copied to the loader region.
    #[arg(short, long)]
    pub kernel: Option<PathBuf>,

    /// Value the system controller reports as boot configuration.
    #[arg(long, default_value = "memory")]
    pub boot_mode: BootMode,

    /// Print the composed memory map.
    #[arg(long)]
    pub dump_map: bool,

    /// Print the board descriptor as TOML.
    #[arg(long)]
    pub dump_config: bool,

    #[arg(long, default_value = "info")]
    pub log_level: log::LevelFilter,
}

pub struct Emulator {
    pub board: BoardDescriptor,
    pub machine: Machine,
}

impl Emulator {
    pub fn from_args(cli: &EmulatorArgs) -> Result<Self, BoardError> {
        Self::from_args_with_output(cli, None)
    }

    /// Like [`from_args`](Self::from_args), with UART transmit captured
    /// into `uart_output` instead of going to stderr.
    pub fn from_args_with_output(
        cli: &EmulatorArgs,
        uart_output: Option<UartOutput>,
    ) -> Result<Self, BoardError> {
        let board = match &cli.board_config {
            Some(path) => BoardDescriptor::load(path)?,
            None => soc_boards::builtin(&cli.machine)
                .ok_or_else(|| BoardError::UnknownMachine(cli.machine.clone()))?,
        };
        let overrides = Overrides {
            smp: cli.smp,
            ram_size: cli.ram_size,
            entry: cli.entry,
            kernel: cli.kernel.clone(),
            io: DeviceIo {
                uart_output,
                uart_input: None,
                boot_mode: cli.boot_mode,
            },
        };
        let machine = compose(&board, &overrides)?;
        Ok(Self { board, machine })
    }

    /// Load the kernel and settle device interrupt state. Returns the entry
    /// address of core 0.
    pub fn start(&self) -> Result<u64, BoardError> {
        let entry = match self.machine.load_kernel()? {
            Some(entry) => entry,
            None => self.machine.boot().entry(),
        };
        self.machine.poll();
        Ok(entry)
    }
}
