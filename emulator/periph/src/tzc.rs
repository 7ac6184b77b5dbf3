/*++

Licensed under the Apache-2.0 license.

File Name:

    tzc.rs

Abstract:

    File contains the TrustZone address space controller stub. Firmware only
    programs and reads back its configuration, so every register is plain
    storage apart from the gate keeper and the component ID block.

--*/

use crate::register::{bank_device, ReadEffect, RegisterBank, RegisterSpec, WriteEffect};
use emulator_types::consts::DEVICE_PAGE_SIZE;

/// Component ID registers at 0xff0..0xffc.
pub const COMPONENT_ID: [u32; 4] = [0x0d, 0xf0, 0x05, 0xb1];

const BUILD_CONFIG: usize = 0;
const ACTION: usize = 1;
const GATE_KEEPER: usize = 2;
const SPECULATION_CTRL: usize = 3;
const INT_STATUS: usize = 4;
const INT_CLEAR: usize = 5;
const FIELDS: usize = 6;

// Gate keeper requests land in the status half of the register.
fn gate_keeper_status(request: u32) -> u32 {
    request << 16
}

static REGISTERS: [RegisterSpec; 10] = [
    RegisterSpec::field("BUILD_CONFIG", 0x0, BUILD_CONFIG),
    RegisterSpec::field("ACTION", 0x4, ACTION),
    RegisterSpec::read_write(
        "GATE_KEEPER",
        0x8,
        ReadEffect::Field(GATE_KEEPER),
        WriteEffect::StoreWith(GATE_KEEPER, gate_keeper_status),
    ),
    RegisterSpec::field("SPECULATION_CTRL", 0xc, SPECULATION_CTRL),
    RegisterSpec::field("INT_STATUS", 0x10, INT_STATUS),
    RegisterSpec::field("INT_CLEAR", 0x14, INT_CLEAR),
    RegisterSpec::read_only("CID0", 0xff0, ReadEffect::Const(COMPONENT_ID[0])),
    RegisterSpec::read_only("CID1", 0xff4, ReadEffect::Const(COMPONENT_ID[1])),
    RegisterSpec::read_only("CID2", 0xff8, ReadEffect::Const(COMPONENT_ID[2])),
    RegisterSpec::read_only("CID3", 0xffc, ReadEffect::Const(COMPONENT_ID[3])),
];

pub struct Tzc {
    bank: RegisterBank,
}

impl Tzc {
    pub const SIZE: u64 = DEVICE_PAGE_SIZE;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            bank: RegisterBank::new(name, Self::SIZE, &REGISTERS, FIELDS, 0, 0),
        }
    }
}

bank_device!(Tzc);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegisterDevice;

    #[test]
    fn test_component_id() {
        let tzc = Tzc::new("tzc");
        let id: Vec<u32> = [0xff0, 0xff4, 0xff8, 0xffc]
            .into_iter()
            .map(|off| tzc.read(off))
            .collect();
        assert_eq!(id, COMPONENT_ID);
        // Writes cannot change them.
        tzc.write(0xff0, 0);
        assert_eq!(tzc.read(0xff0), 0x0d);
        assert_eq!(tzc.violations(), 1);
    }

    #[test]
    fn test_storage_registers() {
        let tzc = Tzc::new("tzc");
        for (off, val) in [(0x0, 1), (0x4, 2), (0xc, 3), (0x10, 4), (0x14, 5)] {
            tzc.write(off, val);
        }
        assert_eq!(tzc.read(0x0), 1);
        assert_eq!(tzc.read(0x4), 2);
        assert_eq!(tzc.read(0xc), 3);
        assert_eq!(tzc.read(0x10), 4);
        assert_eq!(tzc.read(0x14), 5);
    }

    #[test]
    fn test_gate_keeper_reports_request_as_status() {
        let tzc = Tzc::new("tzc");
        tzc.write(0x8, 0x3);
        assert_eq!(tzc.read(0x8), 0x3_0000);
    }

    #[test]
    fn test_undefined_offset() {
        let tzc = Tzc::new("tzc");
        assert_eq!(tzc.read(0x18), 0);
        assert_eq!(tzc.violations(), 1);
    }
}
