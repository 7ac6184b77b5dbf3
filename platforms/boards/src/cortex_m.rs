// Licensed under the Apache-2.0 license

use emulator_types::consts::MIB;
use soc_config::{
    BoardDescriptor, BootSpec, CpuSpec, DeviceKind, DeviceSpec, InterruptControllerSpec,
    MemoryMapEntry,
};

/// External lines of the integrated NVIC.
const NVIC_LINES: u32 = 64;

const M33_UART_TX_IRQ: u32 = 10;
const M33_UART_RX_IRQ: u32 = 11;
const M33_TEST_IRQ: u32 = 15;

fn nvic() -> InterruptControllerSpec {
    InterruptControllerSpec::Nvic { lines: NVIC_LINES }
}

pub fn thomas_m3() -> BoardDescriptor {
    BoardDescriptor {
        name: "thomas-m3".into(),
        description: "ARM THOMAS for Cortex-M3".into(),
        cpu: CpuSpec::arm_m("cortex-m3"),
        interrupt_controller: nvic(),
        boot: BootSpec {
            max_image_size: Some(0x40_0000),
            ..BootSpec::new("sram", 16 * MIB)
        },
        memory_map: vec![
            MemoryMapEntry::ram("sram", 0x0, 0x40_0000),
            MemoryMapEntry::mmio("uart", 0x4000_4000, 0x1000),
        ],
        // Created without interrupt lines on this board.
        devices: vec![DeviceSpec::placeholder("uart", "cmsdk-apb-uart", "uart")],
    }
}

pub fn thomas_m33() -> BoardDescriptor {
    BoardDescriptor {
        name: "thomas-m33".into(),
        description: "ARM THOMAS for Cortex-M33".into(),
        cpu: CpuSpec::arm_m("cortex-m33"),
        interrupt_controller: nvic(),
        boot: BootSpec {
            max_image_size: Some(0x40_0000),
            reset_vector: Some(0x1000_0000),
            ..BootSpec::new("flash", 16 * MIB)
        },
        memory_map: vec![
            MemoryMapEntry::ram("flash", 0x1000_0000, 0x40_0000),
            MemoryMapEntry::ram("sram", 0x2000_0000, 0x40_0000),
            MemoryMapEntry::mmio("uart", 0x4000_0000, 0x1000),
            MemoryMapEntry::mmio("test", 0x5000_0000, 0x1000),
        ],
        devices: vec![
            DeviceSpec::placeholder("uart", "cmsdk-apb-uart", "uart")
                .with_irqs([M33_UART_TX_IRQ, M33_UART_RX_IRQ]),
            DeviceSpec::new("test", DeviceKind::TestDevice, "test").with_irqs([M33_TEST_IRQ]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soc_config::CpuArch;

    #[test]
    fn test_m33_uart_has_two_lines() {
        let board = thomas_m33();
        assert_eq!(board.cpu.arch, CpuArch::ArmM);
        assert_eq!(board.device("uart").unwrap().irqs, vec![10, 11]);
        assert_eq!(board.boot.reset_vector, Some(0x1000_0000));
        assert_eq!(board.interrupt_controller.shared_lines(), 64);
    }

    #[test]
    fn test_m3_has_no_interrupt_sources() {
        let board = thomas_m3();
        assert!(board.devices.iter().all(|d| d.irqs.is_empty()));
        assert_eq!(board.entry("sram").unwrap().base, 0);
        assert_eq!(board.cpu.max_count, 1);
    }
}
