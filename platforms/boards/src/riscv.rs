// Licensed under the Apache-2.0 license

use soc_config::{
    BoardDescriptor, BootSpec, CpuArch, CpuSpec, DeviceKind, DeviceSpec, InterruptControllerSpec,
    MemoryMapEntry,
};

const CLINT: (u64, u64) = (0x200_0000, 0x1_0000);
const PLIC: (u64, u64) = (0xc00_0000, 0x400_0000);
const UART0: (u64, u64) = (0x1000_0000, 0x1000);

const UART0_IRQ: u32 = 20;

/// Regions and devices both RISC-V boards carry at the same address.
fn common(test_irq: u32, test_base: u64) -> (Vec<MemoryMapEntry>, Vec<DeviceSpec>) {
    let memory_map = vec![
        MemoryMapEntry::mmio("clint", CLINT.0, CLINT.1),
        MemoryMapEntry::mmio("plic", PLIC.0, PLIC.1),
        MemoryMapEntry::mmio("uart0", UART0.0, UART0.1),
        MemoryMapEntry::mmio("test", test_base, 0x1000),
    ];
    let devices = vec![
        DeviceSpec::placeholder("clint", "aclint", "clint"),
        DeviceSpec::placeholder("plic", "sifive-plic", "plic"),
        DeviceSpec::new("uart0", DeviceKind::Uart16550, "uart0").with_irqs([UART0_IRQ]),
        DeviceSpec::new("test", DeviceKind::TestDevice, "test").with_irqs([test_irq]),
    ];
    (memory_map, devices)
}

pub fn thomas_riscv64() -> BoardDescriptor {
    let (mut memory_map, devices) = common(21, 0x3000_0000);
    memory_map.push(MemoryMapEntry::ram("sram", 0x2000_0000, 0x40_0000));
    memory_map.push(MemoryMapEntry::ram("ddr", 0x4000_0000, 0x4000_0000));
    BoardDescriptor {
        name: "thomas-riscv64".into(),
        description: "RISC-V THOMAS 64-bit board".into(),
        cpu: CpuSpec::riscv("rv64", CpuArch::Riscv64, "MS", 16),
        interrupt_controller: InterruptControllerSpec::Plic {
            sources: 250,
            region: "plic".into(),
        },
        boot: BootSpec {
            ram_region: Some("ddr".into()),
            reset_vector: Some(0x2000_0000),
            ..BootSpec::new("sram", 0x4000_0000)
        },
        memory_map,
        devices,
    }
}

pub fn thomas_riscv32() -> BoardDescriptor {
    let (mut memory_map, devices) = common(100, 0x6000_0000);
    // Mask ROM contents are not writable by the guest.
    memory_map.push(MemoryMapEntry::rom("flash", 0x2000_0000, 0x200_0000));
    memory_map.push(MemoryMapEntry::ram("sram", 0x8000_0000, 0x800_0000));
    BoardDescriptor {
        name: "thomas-riscv32".into(),
        description: "RISC-V THOMAS 32-bit board".into(),
        cpu: CpuSpec::riscv("rv32", CpuArch::Riscv32, "M", 1),
        interrupt_controller: InterruptControllerSpec::Plic {
            sources: 127,
            region: "plic".into(),
        },
        boot: BootSpec {
            ram_region: Some("sram".into()),
            reset_vector: Some(0x2000_0000),
            ..BootSpec::new("flash", 0x800_0000)
        },
        memory_map,
        devices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soc_config::RegionKind;

    #[test]
    fn test_riscv64_harts() {
        let board = thomas_riscv64();
        assert_eq!(board.cpu.max_count, 16);
        assert_eq!(board.cpu.hart_modes.as_deref(), Some("MS"));
        assert_eq!(board.device("test").unwrap().irqs, vec![21]);
        assert_eq!(board.boot.default_ram_size, board.entry("ddr").unwrap().size);
    }

    #[test]
    fn test_riscv32_boots_from_rom() {
        let board = thomas_riscv32();
        let flash = board.entry("flash").unwrap();
        assert_eq!(flash.kind, RegionKind::Rom);
        assert_eq!(board.boot.reset_vector, Some(flash.base));
        assert_eq!(board.interrupt_controller.shared_lines(), 127);
    }
}
