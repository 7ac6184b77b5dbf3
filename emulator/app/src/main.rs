/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the SoC board emulator.

--*/

use anyhow::Context;
use clap::Parser;
use emulator::{Emulator, EmulatorArgs};

fn main() -> anyhow::Result<()> {
    let cli = EmulatorArgs::parse();
    simple_logger::SimpleLogger::new()
        .with_level(cli.log_level)
        .init()?;

    if cli.list_machines {
        for name in soc_boards::names() {
            println!("{name}");
        }
        return Ok(());
    }

    let emulator = Emulator::from_args(&cli).context("failed to build the board")?;
    if cli.dump_config {
        print!("{}", emulator.board.to_toml_string()?);
    }
    if cli.dump_map {
        print!("{}", emulator.machine.describe_map());
    }

    let entry = emulator.start().context("failed to boot the board")?;
    log::info!(
        "{} ready: {} cores, entry {entry:#x}",
        emulator.machine.name(),
        emulator.machine.cores().len()
    );
    Ok(())
}
