/*++

Licensed under the Apache-2.0 license.

File Name:

    unimp.rs

Abstract:

    File contains the placeholder for blocks that have no model: the window
    decodes, reads as zero, swallows writes and logs every access.

--*/

use crate::register::{IrqOutputs, RegisterDevice};
use crate::PeriphError;
use emulator_bus::Irq;

/// Log target for traffic to blocks without a model.
pub const UNIMP: &str = "unimp";

pub struct Unimplemented {
    name: String,
    model: String,
    size: u64,
    irqs: IrqOutputs,
}

impl Unimplemented {
    pub fn new(name: impl Into<String>, model: impl Into<String>, size: u64) -> Self {
        Self::with_irqs(name, model, size, 0)
    }

    /// Placeholder for a collaborator model that owns `irqs` interrupt
    /// outputs. The outputs are wired like a real device's but never driven.
    pub fn with_irqs(
        name: impl Into<String>,
        model: impl Into<String>,
        size: u64,
        irqs: usize,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            size,
            irqs: IrqOutputs::new(irqs),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl RegisterDevice for Unimplemented {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read(&self, offset: u64) -> u32 {
        log::debug!(target: UNIMP, "{} ({}): read {offset:#x}", self.name, self.model);
        0
    }

    fn write(&self, offset: u64, value: u32) {
        log::debug!(
            target: UNIMP,
            "{} ({}): write {offset:#x} <- {value:#x}",
            self.name,
            self.model
        );
    }

    fn irq_outputs(&self) -> usize {
        self.irqs.len()
    }

    fn connect_irq(&self, index: usize, irq: Irq) -> Result<(), PeriphError> {
        self.irqs.connect(&self.name, index, irq)
    }

    fn irq_connected(&self, index: usize) -> bool {
        self.irqs.is_connected(index)
    }

    fn violations(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_bus::IrqLevels;
    use std::sync::Arc;

    #[test]
    fn test_reads_zero_and_ignores_writes() {
        let dev = Unimplemented::new("ddr-cfg", "unimplemented", 0x4000000);
        dev.write(0x100, 0xffff_ffff);
        assert_eq!(dev.read(0x100), 0);
        assert_eq!(dev.read(0x3ff_fffc), 0);
        assert_eq!(dev.violations(), 0);
        assert_eq!(dev.irq_outputs(), 0);
        assert_eq!(dev.model(), "unimplemented");
    }

    #[test]
    fn test_collaborator_outputs() {
        let dev = Unimplemented::with_irqs("sdhci", "sdhci", 0x10000, 1);
        let levels = Arc::new(IrqLevels::new(128));
        assert!(!dev.irq_connected(0));
        dev.connect_irq(0, levels.irq(102).unwrap()).unwrap();
        assert!(dev.irq_connected(0));
        assert!(dev.connect_irq(1, levels.irq(103).unwrap()).is_err());
    }
}
