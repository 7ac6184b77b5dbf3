/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the peripheral models.

--*/

mod mmio;
mod otp;
mod register;
mod spinlock;
mod sys_ctrl;
mod test_device;
mod tzc;
mod uart;
mod unimp;

pub use mmio::MmioDevice;
pub use otp::{Otp, LIFECYCLE_DEV};
pub use register::{
    IrqOutputs, ReadEffect, RegisterBank, RegisterDevice, RegisterSpec, WriteEffect, GUEST_ERROR,
};
pub use spinlock::Spinlock;
pub use sys_ctrl::SysCtrl;
pub use test_device::{TestDevice, TRIGGER_SENTINEL};
pub use tzc::{Tzc, COMPONENT_ID};
pub use uart::{Uart16550, UartInput, UartOutput};
pub use unimp::{Unimplemented, UNIMP};

use soc_config::{BootMode, DeviceKind, DeviceSpec};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriphError {
    #[error("{device} has no interrupt output {index}")]
    NoSuchOutput { device: String, index: usize },
    #[error("interrupt output {index} of {device} is already connected")]
    AlreadyConnected { device: String, index: usize },
}

/// Host-side resources handed to device models at instantiation.
#[derive(Clone, Default)]
pub struct DeviceIo {
    /// Capture buffer for UART transmit; stderr when unset.
    pub uart_output: Option<UartOutput>,
    pub uart_input: Option<UartInput>,
    pub boot_mode: BootMode,
}

/// Build the model named by `spec` for a window of `region_size` bytes.
pub fn instantiate(spec: &DeviceSpec, region_size: u64, io: &DeviceIo) -> Arc<dyn RegisterDevice> {
    let name = spec.name.clone();
    match spec.kind {
        DeviceKind::TestDevice => Arc::new(TestDevice::new(name)),
        DeviceKind::Spinlock => Arc::new(Spinlock::new(name)),
        DeviceKind::Tzc => Arc::new(Tzc::new(name)),
        DeviceKind::Otp => Arc::new(Otp::new(name, region_size)),
        DeviceKind::SysCtrl => Arc::new(SysCtrl::new(name, region_size, io.boot_mode)),
        DeviceKind::Uart16550 => Arc::new(Uart16550::new(
            name,
            region_size,
            io.uart_output.clone(),
            io.uart_input.clone(),
        )),
        DeviceKind::Placeholder => Arc::new(Unimplemented::with_irqs(
            name,
            spec.model.as_deref().unwrap_or("unimplemented"),
            region_size,
            spec.irqs.len(),
        )),
    }
}
