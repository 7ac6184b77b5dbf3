/*++

Licensed under the Apache-2.0 license.

File Name:

    sys_ctrl.rs

Abstract:

    File contains the system controller stub reporting the boot strapping.

--*/

use crate::register::{bank_device, ReadEffect, RegisterBank, RegisterSpec};
use soc_config::BootMode;

const BOOT_CFG: usize = 0;

static REGISTERS: [RegisterSpec; 1] = [RegisterSpec::read_only(
    "BOOT_CFG",
    SysCtrl::BOOT_CFG,
    ReadEffect::Field(BOOT_CFG),
)];

pub struct SysCtrl {
    bank: RegisterBank,
}

impl SysCtrl {
    pub const BOOT_CFG: u64 = 0x10;

    pub fn new(name: impl Into<String>, size: u64, boot_mode: BootMode) -> Self {
        let bank = RegisterBank::new(name, size, &REGISTERS, 1, 0, 0);
        bank.set_field(BOOT_CFG, boot_mode.into());
        Self { bank }
    }

    pub fn boot_mode(&self) -> Option<BootMode> {
        BootMode::try_from(self.bank.field(BOOT_CFG)).ok()
    }
}

bank_device!(SysCtrl);
