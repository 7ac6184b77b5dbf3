/*++

Licensed under the Apache-2.0 license.

File Name:

    consts.rs

Abstract:

    File contains size constants shared by the board tables and devices.

--*/

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

/// Window of every single-page register device.
pub const DEVICE_PAGE_SIZE: u64 = 0x1000;
