/*++

Licensed under the Apache-2.0 license.

File Name:

    otp.rs

Abstract:

    File contains the fuse block stub. Only the lifecycle word is modeled;
    the part always reports the development lifecycle.

--*/

use crate::register::{bank_device, ReadEffect, RegisterBank, RegisterSpec};

/// Lifecycle word of a development-state part.
pub const LIFECYCLE_DEV: u32 = 0x8000_0384;

static REGISTERS: [RegisterSpec; 1] = [RegisterSpec::read_only(
    "LIFECYCLE",
    Otp::LIFECYCLE,
    ReadEffect::Const(LIFECYCLE_DEV),
)];

pub struct Otp {
    bank: RegisterBank,
}

impl Otp {
    pub const LIFECYCLE: u64 = 0x4038;

    /// `size` is the window the fuse block occupies.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            bank: RegisterBank::new(name, size, &REGISTERS, 0, 0, 0),
        }
    }
}

bank_device!(Otp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegisterDevice;

    #[test]
    fn test_lifecycle() {
        let otp = Otp::new("otp", 0x10000);
        assert_eq!(otp.read(Otp::LIFECYCLE), LIFECYCLE_DEV);
        otp.write(Otp::LIFECYCLE, 0);
        assert_eq!(otp.read(Otp::LIFECYCLE), LIFECYCLE_DEV);
        assert_eq!(otp.violations(), 1);
    }

    #[test]
    fn test_window_follows_region() {
        // A window too small for the lifecycle word never decodes it.
        let otp = Otp::new("otp", 0x1000);
        assert_eq!(otp.size(), 0x1000);
        assert_eq!(otp.read(Otp::LIFECYCLE), 0);
        assert_eq!(otp.violations(), 1);
    }
}
