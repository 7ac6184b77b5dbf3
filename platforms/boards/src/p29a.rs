// Licensed under the Apache-2.0 license

use crate::thomas::NUM_IRQS;
use emulator_types::consts::MIB;
use soc_config::{
    BoardDescriptor, BootSpec, CpuSpec, DeviceKind, DeviceSpec, InterruptControllerSpec,
    MemoryMapEntry,
};

// Numbered from the first shared line; the hardware manual counts from 32.
const UART1_IRQ: u32 = 104;
const SDIO_IRQ: u32 = 43;

/// One redistributor frame. The hardware table gives the block 0xf60000
/// bytes, which would run over the eMMC, SDIO and TZC windows.
const GIC_REDIST_SIZE: u64 = 0x2_0000;

const BLOCK: u64 = 0x1_0000;

const TZCS: &[(&str, u64)] = &[
    ("tzc-sram01", 0xf5a4_0000),
    ("tzc-sram23", 0xf5a5_0000),
    ("tzc-aps-ddr", 0xf842_0000),
    ("tzc-lps2aps", 0xf5a8_0000),
    ("tzc-lps2las", 0xf5a7_0000),
    ("tzc-lps2ddr", 0xf5a6_0000),
    ("tzc-las2lps", 0xf165_0000),
    ("tzc-avs-sram", 0xf84f_0000),
    ("tzc-aps2lps", 0xf84e_0000),
];

const DUMMIES: &[(&str, u64)] = &[
    ("aps-mailbox", 0xf840_0000),
    ("las-mailbox", 0xf104_0000),
    ("lps-mailbox", 0xf590_0000),
    ("pmu", 0xf143_0000),
    ("las-ppu", 0xf142_0000),
    ("las-ccm", 0xf141_0000),
    ("timestamp", 0xf5ab_0000),
];

pub fn p29a_lp() -> BoardDescriptor {
    let mut memory_map = vec![
        MemoryMapEntry::ram("flash", 0x0, 0x200_0000),
        MemoryMapEntry::ram("sram", 0x1000_0000, 0x200_0000),
        MemoryMapEntry::ram("ddr", 0x2000_0000, 0xc000_0000),
        MemoryMapEntry::mmio("gic-dist", 0xf500_0000, 0x1000),
        MemoryMapEntry::mmio("gic-cpu", 0xf500_1000, 0x2000),
        MemoryMapEntry::mmio("gic-v2m", 0x0802_0000, 0x1000),
        MemoryMapEntry::mmio("gic-hyp", 0x0803_0000, BLOCK),
        MemoryMapEntry::mmio("gic-vcpu", 0x0804_0000, BLOCK),
        MemoryMapEntry::mmio("gic-its", 0x0c04_0000, BLOCK),
        MemoryMapEntry::mmio("gic-redist", 0xf504_0000, GIC_REDIST_SIZE),
        MemoryMapEntry::mmio("emmc", 0xf5a1_0000, BLOCK),
        MemoryMapEntry::mmio("sdio", 0xf5a2_0000, BLOCK),
        MemoryMapEntry::mmio("sys-otp", 0xf5aa_0000, BLOCK),
        MemoryMapEntry::mmio("uart0", 0xf5c1_0000, BLOCK),
        MemoryMapEntry::mmio("uart1", 0xf5c2_0000, BLOCK),
        MemoryMapEntry::mmio("sys-ctrl", 0xf5d1_0000, BLOCK),
    ];
    let mut devices = vec![
        DeviceSpec::new("uart1", DeviceKind::Uart16550, "uart1").with_irqs([UART1_IRQ]),
        DeviceSpec::placeholder("sdio", "sdhci", "sdio").with_irqs([SDIO_IRQ]),
        DeviceSpec::new("sys-otp", DeviceKind::Otp, "sys-otp"),
        DeviceSpec::new("sys-ctrl", DeviceKind::SysCtrl, "sys-ctrl"),
    ];
    for &(name, base) in TZCS {
        memory_map.push(MemoryMapEntry::mmio(name, base, BLOCK));
        devices.push(DeviceSpec::new(name, DeviceKind::Tzc, name));
    }
    for &(name, base) in DUMMIES {
        memory_map.push(MemoryMapEntry::mmio(name, base, BLOCK));
        devices.push(DeviceSpec::placeholder(name, "dummy", name));
    }

    let mut cpu = CpuSpec::arm("cortex-a32", 1, 1);
    cpu.has_pmu = true;

    BoardDescriptor {
        name: "p29a-lp".into(),
        description: "ARM P29A LP for Cortex-A32".into(),
        cpu,
        interrupt_controller: InterruptControllerSpec::GicV3 {
            shared_lines: NUM_IRQS,
            security_extensions: true,
            distributor: "gic-dist".into(),
            redistributor: "gic-redist".into(),
        },
        boot: BootSpec {
            ram_region: Some("ddr".into()),
            ..BootSpec::new("flash", 256 * MIB)
        },
        memory_map,
        devices,
    }
}
