/*++

Licensed under the Apache-2.0 license.

File Name:

    composer.rs

Abstract:

    File contains the board composer. It turns a descriptor into a running
    machine or fails without leaving a partial board behind.

--*/

use crate::boot::BootDescriptor;
use crate::machine::Machine;
use crate::BoardError;
use emulator_bus::{AddressSpaceBuilder, MapError};
use emulator_cpu::create_core;
use emulator_intc::{check_sources, connect_device, create_controller, wire_cores, SharedLineMap};
use emulator_periph::{instantiate, DeviceIo, MmioDevice, RegisterDevice, Unimplemented};
use soc_config::BoardDescriptor;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Model name given to MMIO windows the descriptor leaves without a device.
pub const UNCLAIMED_MODEL: &str = "unclaimed";

/// Per-run choices layered over a board descriptor.
#[derive(Clone, Default)]
pub struct Overrides {
    /// Core count; the board default when unset.
    pub smp: Option<u32>,
    pub ram_size: Option<u64>,
    pub entry: Option<u64>,
    pub kernel: Option<PathBuf>,
    pub io: DeviceIo,
}

pub fn compose(board: &BoardDescriptor, overrides: &Overrides) -> Result<Machine, BoardError> {
    log::info!("composing {}: {}", board.name, board.description);

    let mut builder = AddressSpaceBuilder::new();
    builder.register_all(&board.memory_map)?;

    let count = overrides.smp.unwrap_or(board.cpu.default_count);
    if count == 0 || count > board.cpu.max_count {
        return Err(BoardError::CoreCount {
            board: board.name.clone(),
            requested: count,
            max: board.cpu.max_count,
        });
    }
    let cores = (0..count as usize)
        .map(|i| create_core(&board.cpu, i))
        .collect::<Result<Vec<_>, _>>()?;
    log::info!("{count} x {} ({})", board.cpu.model, board.cpu.arch);

    let mut intc = create_controller(
        &board.interrupt_controller,
        &board.cpu,
        cores.len(),
        |name| builder.entry(name).map(|e| e.size),
    )?;
    wire_cores(intc.as_ref(), &cores)?;

    let mut lines = SharedLineMap::new(intc.shared_lines());
    let mut devices: Vec<Arc<dyn RegisterDevice>> = Vec::with_capacity(board.devices.len());
    let mut bindings = HashMap::new();
    for spec in &board.devices {
        let size = builder
            .entry(&spec.region)
            .map(|e| e.size)
            .ok_or_else(|| MapError::UnknownRegion(spec.region.clone()))?;
        let device = instantiate(spec, size, &overrides.io);
        builder.attach(&spec.region, Arc::new(MmioDevice::new(device.clone())))?;
        connect_device(intc.as_ref(), &mut lines, device.as_ref(), &spec.irqs)?;
        log::debug!("{} ({}) at {}", spec.name, spec.kind, spec.region);
        bindings.insert(spec.region.clone(), spec.name.clone());
        devices.push(device);
    }

    let unclaimed: Vec<_> = builder
        .unattached()
        .map(|e| (e.name.clone(), e.size))
        .collect();
    for (region, size) in unclaimed {
        let device: Arc<dyn RegisterDevice> =
            Arc::new(Unimplemented::new(region.as_str(), UNCLAIMED_MODEL, size));
        builder.attach(&region, Arc::new(MmioDevice::new(device.clone())))?;
        log::debug!("{region} left unclaimed, backed by a placeholder");
        bindings.insert(region.clone(), region);
        devices.push(device);
    }

    check_sources(&devices)?;
    intc.finish_wiring()?;
    let space = builder.build()?;

    let boot_spec = &board.boot;
    let region = |name: &str| {
        space
            .entry(name)
            .cloned()
            .ok_or_else(|| MapError::UnknownRegion(name.to_string()))
    };
    let loader = region(boot_spec.loader_region.as_str())?;
    let smp_loader = match &boot_spec.smp_loader_region {
        Some(name) => region(name.as_str())?.base,
        None => loader.base,
    };
    let ram_size = match &boot_spec.ram_region {
        Some(name) => {
            let ram = region(name.as_str())?;
            match overrides.ram_size {
                Some(requested) if requested > ram.size => {
                    return Err(BoardError::RamTooLarge {
                        requested,
                        region: ram.name,
                        size: ram.size,
                    });
                }
                Some(requested) => requested,
                None => boot_spec.default_ram_size.min(ram.size),
            }
        }
        None => overrides.ram_size.unwrap_or(boot_spec.default_ram_size),
    };
    let boot = BootDescriptor {
        ram_size,
        loader_start: loader.base,
        smp_loader_address: smp_loader,
        reset_vector: boot_spec.reset_vector.unwrap_or(loader.base),
        entry_override: overrides.entry,
        board_id: boot_spec.board_id,
        max_image_size: boot_spec.max_image_size.unwrap_or(loader.size),
        kernel: overrides.kernel.clone(),
    };
    log::info!(
        "{}: {} regions, {} devices, ram {:#x}, loader {:#x}",
        board.name,
        space.entries().count(),
        devices.len(),
        boot.ram_size,
        boot.loader_start
    );

    Ok(Machine {
        name: board.name.clone(),
        space: Arc::new(space),
        cores,
        intc,
        devices,
        bindings,
        boot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_bus::Bus;
    use emulator_cpu::CpuInput;
    use emulator_intc::Stage;
    use emulator_periph::{TestDevice, TRIGGER_SENTINEL};
    use emulator_types::AccessSize;
    use soc_config::{
        BootSpec, CpuSpec, DeviceKind, DeviceSpec, InterruptControllerSpec, MemoryMapEntry,
    };

    fn tiny_board() -> BoardDescriptor {
        BoardDescriptor {
            name: "tiny".into(),
            description: "two regions and a test device".into(),
            cpu: CpuSpec::arm("cortex-a53", 1, 4),
            interrupt_controller: InterruptControllerSpec::GicV3 {
                shared_lines: 64,
                security_extensions: true,
                distributor: "gic-dist".into(),
                redistributor: "gic-redist".into(),
            },
            boot: BootSpec {
                ram_region: Some("ram".into()),
                ..BootSpec::new("ram", 0x10_0000)
            },
            memory_map: vec![
                MemoryMapEntry::ram("ram", 0x8000_0000, 0x10_0000),
                MemoryMapEntry::mmio("test", 0x5000_0000, 0x1000),
                MemoryMapEntry::mmio("gic-dist", 0x6000_0000, 0x1_0000),
                MemoryMapEntry::mmio("gic-redist", 0x6100_0000, 0x8_0000),
            ],
            devices: vec![DeviceSpec::new("test", DeviceKind::TestDevice, "test").with_irqs([5])],
        }
    }

    #[test]
    fn test_compose_and_trigger() {
        let machine = compose(&tiny_board(), &Overrides::default()).unwrap();
        assert_eq!(machine.cores().len(), 1);
        assert_eq!(machine.controller().stage(), Stage::Wired);
        // Both gic windows get placeholders.
        assert_eq!(machine.devices().len(), 3);

        let bus = machine.bus();
        bus.write(AccessSize::Word, 0x5000_0000, 5).unwrap();
        bus.write(AccessSize::Word, 0x5000_0004, 7).unwrap();
        assert_eq!(bus.read(AccessSize::Word, 0x5000_0008).unwrap(), 12);

        bus.write(
            AccessSize::Word,
            0x5000_0000 + TestDevice::IRQ_RAISE,
            TRIGGER_SENTINEL,
        )
        .unwrap();
        machine.poll();
        assert!(machine.cores()[0].input_level(CpuInput::Irq));
        assert_eq!(machine.violations(), 0);
    }

    #[test]
    fn test_core_count_bounds() {
        let board = tiny_board();
        for smp in [0, 5] {
            let overrides = Overrides {
                smp: Some(smp),
                ..Default::default()
            };
            assert!(matches!(
                compose(&board, &overrides),
                Err(BoardError::CoreCount { max: 4, .. })
            ));
        }
        let overrides = Overrides {
            smp: Some(4),
            ..Default::default()
        };
        assert_eq!(compose(&board, &overrides).unwrap().cores().len(), 4);
    }

    #[test]
    fn test_ram_size() {
        let board = tiny_board();
        let overrides = Overrides {
            ram_size: Some(0x20_0000),
            ..Default::default()
        };
        assert!(matches!(
            compose(&board, &overrides),
            Err(BoardError::RamTooLarge { size: 0x10_0000, .. })
        ));

        let mut board = tiny_board();
        board.boot.default_ram_size = 0x40_0000;
        let machine = compose(&board, &Overrides::default()).unwrap();
        assert_eq!(machine.boot().ram_size, 0x10_0000);
    }

    #[test]
    fn test_device_errors() {
        let mut board = tiny_board();
        board.devices[0].region = "nowhere".into();
        assert!(matches!(
            compose(&board, &Overrides::default()),
            Err(BoardError::Map(MapError::UnknownRegion(_)))
        ));

        let mut board = tiny_board();
        board.devices[0].irqs = vec![64];
        assert!(matches!(
            compose(&board, &Overrides::default()),
            Err(BoardError::Intc(_))
        ));

        let mut board = tiny_board();
        board.devices[0].region = "ram".into();
        assert!(matches!(
            compose(&board, &Overrides::default()),
            Err(BoardError::Map(MapError::NotMmio { .. }))
        ));
    }
}
