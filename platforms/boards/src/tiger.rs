// Licensed under the Apache-2.0 license

use crate::thomas::NUM_IRQS;
use soc_config::{
    BoardDescriptor, BootSpec, CpuSpec, DeviceKind, DeviceSpec, InterruptControllerSpec,
    MemoryMapEntry, RegionKind,
};

const UART0_IRQ: u32 = 81;
const UART1_IRQ: u32 = 82;
const SD_IRQ: u32 = 13;

const RAM: RegionKind = RegionKind::Ram;
const MMIO: RegionKind = RegionKind::Mmio;

/// The hardware table gives the redistributor 0xf60000 bytes, which runs
/// into aon-apb. Cut it to the 118 frames that fit before that block.
const GIC_REDIST_SIZE: u64 = 0x00ec_0000;

/// FPGA v6 memory map.
const MEMORY_MAP: &[(&str, u64, u64, RegionKind)] = &[
    ("rom", 0x0000_0000, 0x0002_0000, RAM),
    ("sram0", 0x1fe8_0000, 0x0008_0000, RAM),
    ("sram1", 0x1ff0_0000, 0x0010_0000, RAM),
    ("aon-sram", 0x2000_0000, 0x0002_0000, RAM),
    ("hifi5-sram", 0x2020_0000, 0x0008_0000, RAM),
    ("secure", 0x2030_0000, 0x0010_0000, MMIO),
    ("efuse", 0x2040_0000, 0x0001_0000, MMIO),
    ("cpu-noc", 0x2050_0000, 0x0001_0000, MMIO),
    ("noc-apb", 0x2051_0000, 0x0007_0000, MMIO),
    ("coresight", 0x2d00_0000, 0x0010_0000, MMIO),
    ("gic-dist", 0x3010_0000, 0x0001_0000, MMIO),
    ("gic-redist", 0x3014_0000, GIC_REDIST_SIZE, MMIO),
    ("aon-apb", 0x3100_0000, 0x0008_0000, MMIO),
    ("dsp-apb", 0x3208_0000, 0x0010_0000, MMIO),
    ("mailbox", 0x3300_0000, 0x0001_0000, MMIO),
    ("apb0-spi0", 0x3400_0000, 0x0001_0000, MMIO),
    ("apb0-spi1", 0x3401_0000, 0x0001_0000, MMIO),
    ("apb0-spi2", 0x3402_0000, 0x0001_0000, MMIO),
    ("apb0-spi3", 0x3403_0000, 0x0001_0000, MMIO),
    ("apb0-spi4", 0x3404_0000, 0x0001_0000, MMIO),
    ("apb0-spi5", 0x3405_0000, 0x0001_0000, MMIO),
    ("apb0-uart0", 0x3406_0000, 0x0001_0000, MMIO),
    ("apb0-uart1", 0x3407_0000, 0x0001_0000, MMIO),
    ("apb0-uart2", 0x3408_0000, 0x0001_0000, MMIO),
    ("apb0-uart3", 0x3409_0000, 0x0001_0000, MMIO),
    ("apb0-uart4", 0x340a_0000, 0x0001_0000, MMIO),
    ("apb0-i2c0", 0x340b_0000, 0x0001_0000, MMIO),
    ("apb0-i2c1", 0x340c_0000, 0x0001_0000, MMIO),
    ("apb0-i2c2", 0x340d_0000, 0x0001_0000, MMIO),
    ("apb0-i2c3", 0x340e_0000, 0x0001_0000, MMIO),
    ("apb0-i2c4", 0x340f_0000, 0x0001_0000, MMIO),
    ("apb0-lpwm0", 0x3410_0000, 0x0001_0000, MMIO),
    ("apb0-lpwm1", 0x3411_0000, 0x0001_0000, MMIO),
    ("apb0-gpio", 0x3412_0000, 0x0001_0000, MMIO),
    ("apb0-gpio1", 0x3413_0000, 0x0001_0000, MMIO),
    ("apb0-pwm0", 0x3414_0000, 0x0001_0000, MMIO),
    ("apb0-pwm1", 0x3415_0000, 0x0001_0000, MMIO),
    ("apb0-pwm2", 0x3416_0000, 0x0001_0000, MMIO),
    ("apb0-pwm3", 0x3417_0000, 0x0001_0000, MMIO),
    ("apb0-lsio-slcr", 0x3418_0000, 0x0001_0000, MMIO),
    ("apb0-lsio-adc", 0x3419_0000, 0x0001_0000, MMIO),
    ("apb0-uart5", 0x341a_0000, 0x0001_0000, MMIO),
    ("apb0-uart6", 0x341b_0000, 0x0001_0000, MMIO),
    ("apb0-i2c5", 0x341c_0000, 0x0001_0000, MMIO),
    ("apb0-i2c6", 0x341d_0000, 0x0001_0000, MMIO),
    ("apb1-dma", 0x3420_0000, 0x0001_0000, MMIO),
    ("apb1-top-crm", 0x3421_0000, 0x0001_0000, MMIO),
    ("apb1-sys-ctl", 0x3423_0000, 0x0001_0000, MMIO),
    ("apb1-pvt", 0x3424_0000, 0x0001_0000, MMIO),
    ("apb1-crm", 0x3425_0000, 0x0001_0000, MMIO),
    ("apb1-time0", 0x3426_0000, 0x0001_0000, MMIO),
    ("apb1-time1", 0x3427_0000, 0x0001_0000, MMIO),
    ("ahb-qspi", 0x3500_0000, 0x0001_0000, MMIO),
    ("hsio-gmac", 0x3501_0000, 0x0001_0000, MMIO),
    ("hsio-sdio0", 0x3502_0000, 0x0001_0000, MMIO),
    ("hsio-sdio1", 0x3503_0000, 0x0001_0000, MMIO),
    ("hsio-emmc", 0x3504_0000, 0x0001_0000, MMIO),
    ("hsio-slcr", 0x3505_0000, 0x0001_0000, MMIO),
    ("hsio-usb3", 0x3510_0000, 0x0020_0000, MMIO),
    ("hsio-usb2", 0x3530_0000, 0x0020_0000, MMIO),
    ("ddr-cfg", 0x3600_0000, 0x0400_0000, MMIO),
    ("bpu", 0x3a00_0000, 0x0002_0000, MMIO),
    ("vedio", 0x3b00_0000, 0x0003_0000, MMIO),
    ("gpu", 0x3c00_0000, 0x0003_0000, MMIO),
    ("camera", 0x3d00_0000, 0x000c_0000, MMIO),
    ("display", 0x3e00_0000, 0x000b_0000, MMIO),
    ("ddr", 0x8000_0000, 0x1_8000_0000, RAM),
];

/// Blocks the hardware table places on top of other blocks. They are left
/// out of [`thomas_tiger`]; the address space would reject them.
pub const TIGER_ALIASED_BLOCKS: &[(&str, u64, u64)] = &[
    ("apb1-wdt", 0x3421_0000, 0x0001_0000),
    ("apb1-adc", 0x3419_0000, 0x0001_0000),
];

/// Blocks the firmware is known to touch that have no model.
const UNIMPLEMENTED: &[(&str, &str)] = &[
    ("ddr-cfg", "ddr-cfg"),
    ("aon-apb", "aon-apb"),
    ("i2c0", "apb0-i2c0"),
    ("i2c1", "apb0-i2c1"),
    ("i2c2", "apb0-i2c2"),
    ("i2c3", "apb0-i2c3"),
    ("i2c4", "apb0-i2c4"),
    ("sysctl", "apb1-sys-ctl"),
    ("dsp-apb", "dsp-apb"),
    ("top-crm", "apb1-top-crm"),
    ("dw-apb-uart2", "apb0-uart2"),
    ("dw-apb-uart3", "apb0-uart3"),
    ("dw-apb-uart4", "apb0-uart4"),
    ("dw-apb-uart5", "apb0-uart5"),
    ("dw-apb-uart6", "apb0-uart6"),
    ("secure-ip", "secure"),
    ("top-apb0-lsio", "apb0-lsio-slcr"),
    ("top-apb1-crm", "apb1-crm"),
];

pub fn thomas_tiger() -> BoardDescriptor {
    let memory_map: Vec<_> = MEMORY_MAP
        .iter()
        .map(|&(name, base, size, kind)| MemoryMapEntry::new(name, base, size, kind))
        .collect();
    let ddr_size = memory_map
        .iter()
        .find(|e| e.name == "ddr")
        .map_or(0, |e| e.size);

    let mut devices = vec![
        DeviceSpec::new("uart0", DeviceKind::Uart16550, "apb0-uart0").with_irqs([UART0_IRQ]),
        DeviceSpec::new("uart1", DeviceKind::Uart16550, "apb0-uart1").with_irqs([UART1_IRQ]),
        DeviceSpec::placeholder("sdhci", "sdhci", "hsio-sdio0").with_irqs([SD_IRQ]),
    ];
    devices.extend(
        UNIMPLEMENTED
            .iter()
            .map(|&(name, region)| DeviceSpec::new(name, DeviceKind::Placeholder, region)),
    );

    BoardDescriptor {
        name: "thomas-tiger".into(),
        description: "ARM THOMAS TIGER SoC for Cortex-A55".into(),
        cpu: CpuSpec::arm("cortex-a55", 1, 256),
        interrupt_controller: InterruptControllerSpec::GicV3 {
            shared_lines: NUM_IRQS,
            security_extensions: true,
            distributor: "gic-dist".into(),
            redistributor: "gic-redist".into(),
        },
        boot: BootSpec {
            smp_loader_region: Some("sram1".into()),
            ram_region: Some("ddr".into()),
            ..BootSpec::new("sram1", ddr_size)
        },
        memory_map,
        devices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_overlap_kept_blocks() {
        let board = thomas_tiger();
        for &(name, base, size) in TIGER_ALIASED_BLOCKS {
            let alias = MemoryMapEntry::mmio(name, base, size);
            assert!(
                board.memory_map.iter().any(|e| e.overlaps(&alias)),
                "{name}"
            );
        }
    }

    #[test]
    fn test_regions_disjoint() {
        let board = thomas_tiger();
        for (i, a) in board.memory_map.iter().enumerate() {
            for b in &board.memory_map[i + 1..] {
                assert!(!a.overlaps(b), "{} overlaps {}", a.name, b.name);
            }
        }
        let redist = board.entry("gic-redist").unwrap();
        assert_eq!(
            redist.base + redist.size,
            board.entry("aon-apb").unwrap().base
        );
    }

    #[test]
    fn test_default_ram_is_ddr() {
        let board = thomas_tiger();
        assert_eq!(board.boot.default_ram_size, 0x1_8000_0000);
        assert_eq!(board.entry("sram1").unwrap().base, 0x1ff0_0000);
        assert_eq!(board.device("uart1").unwrap().irqs, vec![82]);
        assert_eq!(
            board
                .devices
                .iter()
                .filter(|d| d.kind == DeviceKind::Placeholder)
                .count(),
            UNIMPLEMENTED.len() + 1
        );
    }
}
