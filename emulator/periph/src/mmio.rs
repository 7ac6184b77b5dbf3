/*++

Licensed under the Apache-2.0 license.

File Name:

    mmio.rs

Abstract:

    File contains the adapter that puts a register device on the bus.

--*/

use crate::RegisterDevice;
use emulator_bus::{Bus, BusError};
use emulator_types::{AccessSize, Addr, Data};
use std::sync::Arc;

/// Exposes a [`RegisterDevice`] as a bus target.
///
/// Every access width reaches the device; narrow reads are truncated to the
/// access width and narrow writes carry only the low bytes.
pub struct MmioDevice {
    device: Arc<dyn RegisterDevice>,
}

impl MmioDevice {
    pub fn new(device: Arc<dyn RegisterDevice>) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &Arc<dyn RegisterDevice> {
        &self.device
    }
}

impl Bus for MmioDevice {
    fn read(&self, size: AccessSize, addr: Addr) -> Result<Data, BusError> {
        Ok(self.device.read(addr) & size.mask())
    }

    fn write(&self, size: AccessSize, addr: Addr, val: Data) -> Result<(), BusError> {
        self.device.write(addr, val & size.mask());
        Ok(())
    }

    fn poll(&self) {
        self.device.poll();
    }
}
