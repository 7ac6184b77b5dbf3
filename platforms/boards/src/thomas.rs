// Licensed under the Apache-2.0 license

use emulator_types::consts::MIB;
use soc_config::{
    BoardDescriptor, BootSpec, CpuSpec, DeviceKind, DeviceSpec, InterruptControllerSpec,
    MemoryMapEntry,
};

/// Shared interrupt lines of the GICv3 boards.
pub const NUM_IRQS: u32 = 256;

const SPINLOCK: u64 = 0x4100_0000;
const TEST_DEVICE: u64 = 0x5000_0000;
const GIC_DIST: u64 = 0x6000_0000;
const GIC_REDIST: u64 = 0x6100_0000;
const GIC_REDIST_SIZE: u64 = 0xf6_0000;

pub(crate) fn gicv3() -> InterruptControllerSpec {
    InterruptControllerSpec::GicV3 {
        shared_lines: NUM_IRQS,
        security_extensions: true,
        distributor: "gic-dist".into(),
        redistributor: "gic-redist".into(),
    }
}

/// Layout shared by the a15/a53/a55 boards: everything but the three
/// memories sits at the same address.
fn common_map(flash: u64, sram: u64, ddr: u64) -> Vec<MemoryMapEntry> {
    vec![
        MemoryMapEntry::ram("flash", flash, 0x200_0000),
        MemoryMapEntry::ram("sram", sram, 0x200_0000),
        MemoryMapEntry::ram("ddr", ddr, 0x1000_0000),
        MemoryMapEntry::mmio("uart", 0x4000_0000, 0x1000),
        MemoryMapEntry::mmio("spinlock", SPINLOCK, 0x1000),
        MemoryMapEntry::mmio("test", TEST_DEVICE, 0x1000),
        MemoryMapEntry::mmio("gic-dist", GIC_DIST, 0x1_0000),
        MemoryMapEntry::mmio("gic-redist", GIC_REDIST, GIC_REDIST_SIZE),
    ]
}

fn common_devices(test_irq: u32) -> Vec<DeviceSpec> {
    vec![
        DeviceSpec::new("spinlock", DeviceKind::Spinlock, "spinlock"),
        DeviceSpec::new("test", DeviceKind::TestDevice, "test").with_irqs([test_irq]),
    ]
}

fn boot(loader: &str, default_ram_size: u64) -> BootSpec {
    BootSpec {
        smp_loader_region: Some(loader.into()),
        ram_region: Some("ddr".into()),
        ..BootSpec::new(loader, default_ram_size)
    }
}

pub fn thomas_a15() -> BoardDescriptor {
    let mut devices = common_devices(132);
    // The PL011 model is not carried; the window keeps its interrupt.
    devices.push(DeviceSpec::placeholder("uart", "pl011", "uart").with_irqs([133]));
    BoardDescriptor {
        name: "thomas-a15".into(),
        description: "ARM THOMAS for Cortex-A15".into(),
        cpu: CpuSpec::arm("cortex-a15", 1, 256),
        interrupt_controller: gicv3(),
        boot: boot("flash", 256 * MIB),
        memory_map: common_map(0x0, 0x1000_0000, 0x2000_0000),
        devices,
    }
}

pub fn thomas_a53() -> BoardDescriptor {
    let mut devices = common_devices(132);
    devices.push(DeviceSpec::new("uart", DeviceKind::Uart16550, "uart").with_irqs([133]));
    BoardDescriptor {
        name: "thomas-a53".into(),
        description: "ARM THOMAS for Cortex-A53".into(),
        cpu: CpuSpec::arm("cortex-a53", 1, 256),
        interrupt_controller: gicv3(),
        boot: boot("sram", 512 * MIB),
        memory_map: common_map(0x1000_0000, 0x2000_0000, 0x3000_0000),
        devices,
    }
}

pub fn thomas_a55() -> BoardDescriptor {
    let mut memory_map = common_map(0x1000_0000, 0x2000_0000, 0x3000_0000);
    memory_map.push(MemoryMapEntry::mmio("sdhci", 0x7000_0000, 0x1_0000));
    memory_map.push(MemoryMapEntry::mmio("nic", 0x8000_0000, 0x1_0000));

    let mut devices = common_devices(100);
    devices.push(DeviceSpec::new("uart", DeviceKind::Uart16550, "uart").with_irqs([101]));
    devices.push(DeviceSpec::placeholder("sdhci", "sdhci", "sdhci").with_irqs([102]));
    devices.push(DeviceSpec::placeholder("nic", "lan9118", "nic").with_irqs([103]));
    for i in 0..5u32 {
        let name = format!("virtio{i}");
        memory_map.push(MemoryMapEntry::mmio(
            name.as_str(),
            0x9000_0000 + u64::from(i) * 0x1000,
            0x1000,
        ));
        devices.push(
            DeviceSpec::placeholder(name.as_str(), "virtio-mmio", name.as_str())
                .with_irqs([80 + i]),
        );
    }

    BoardDescriptor {
        name: "thomas-a55".into(),
        description: "ARM THOMAS for Cortex-A55".into(),
        cpu: CpuSpec::arm("cortex-a55", 1, 256),
        interrupt_controller: gicv3(),
        boot: boot("sram", 512 * MIB),
        memory_map,
        devices,
    }
}
