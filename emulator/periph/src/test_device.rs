/*++

Licensed under the Apache-2.0 license.

File Name:

    test_device.rs

Abstract:

    File contains the test device: two scratch values, their sum, and a pair
    of registers that raise and clear its interrupt.

--*/

use crate::register::{bank_device, ReadEffect, RegisterBank, RegisterSpec, WriteEffect};
use emulator_types::consts::DEVICE_PAGE_SIZE;

const VALUE0: usize = 0;
const VALUE1: usize = 1;

/// Value that must be written to the raise/clear registers to take effect.
pub const TRIGGER_SENTINEL: u32 = 0xa5;

fn sum(fields: &[u32]) -> u32 {
    fields[VALUE0].wrapping_add(fields[VALUE1])
}

static REGISTERS: [RegisterSpec; 5] = [
    RegisterSpec::field("VALUE0", TestDevice::VALUE0, VALUE0),
    RegisterSpec::field("VALUE1", TestDevice::VALUE1, VALUE1),
    RegisterSpec::read_only("SUM", TestDevice::SUM, ReadEffect::Computed(sum)),
    RegisterSpec::write_only(
        "IRQ_RAISE",
        TestDevice::IRQ_RAISE,
        WriteEffect::Trigger {
            sentinel: TRIGGER_SENTINEL,
            output: 0,
            level: true,
        },
    ),
    RegisterSpec::write_only(
        "IRQ_CLEAR",
        TestDevice::IRQ_CLEAR,
        WriteEffect::Trigger {
            sentinel: TRIGGER_SENTINEL,
            output: 0,
            level: false,
        },
    ),
];

pub struct TestDevice {
    bank: RegisterBank,
}

impl TestDevice {
    pub const VALUE0: u64 = 0x0;
    pub const VALUE1: u64 = 0x4;
    /// Read-only, `VALUE0 + VALUE1` modulo 2^32.
    pub const SUM: u64 = 0x8;
    pub const IRQ_RAISE: u64 = 0xc;
    pub const IRQ_CLEAR: u64 = 0x10;

    pub const SIZE: u64 = DEVICE_PAGE_SIZE;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            bank: RegisterBank::new(name, Self::SIZE, &REGISTERS, 2, 0, 1),
        }
    }
}

bank_device!(TestDevice);
