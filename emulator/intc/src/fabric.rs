/*++

Licensed under the Apache-2.0 license.

File Name:

    fabric.rs

Abstract:

    File contains the wiring steps between peripherals, cores and the
    interrupt controller.

--*/

use crate::{IntcError, InterruptController};
use emulator_cpu::CpuCore;
use emulator_periph::RegisterDevice;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which device output owns each shared line of one controller.
pub struct SharedLineMap {
    lines: u32,
    owners: BTreeMap<u32, String>,
}

impl SharedLineMap {
    pub fn new(lines: u32) -> Self {
        Self {
            lines,
            owners: BTreeMap::new(),
        }
    }

    /// Claim `line` for `owner`. Each line has at most one owner.
    pub fn assign(&mut self, line: u32, owner: &str) -> Result<(), IntcError> {
        if line >= self.lines {
            return Err(IntcError::LineOutOfRange {
                line,
                lines: self.lines,
            });
        }
        if let Some(first) = self.owners.get(&line) {
            return Err(IntcError::DuplicateLine {
                line,
                first: first.clone(),
                second: owner.to_string(),
            });
        }
        self.owners.insert(line, owner.to_string());
        Ok(())
    }

    pub fn owner(&self, line: u32) -> Option<&str> {
        self.owners.get(&line).map(String::as_str)
    }

    /// Assigned lines in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.owners.iter().map(|(l, o)| (*l, o.as_str()))
    }
}

/// Connect output `i` of `device` to controller line `irqs[i]`.
pub fn connect_device(
    intc: &dyn InterruptController,
    map: &mut SharedLineMap,
    device: &dyn RegisterDevice,
    irqs: &[u32],
) -> Result<(), IntcError> {
    for (index, &line) in irqs.iter().enumerate() {
        let owner = format!("{}[{index}]", device.name());
        map.assign(line, &owner)?;
        device.connect_irq(index, intc.input(line)?)?;
        log::debug!("{owner} -> {} line {line}", intc.name());
    }
    Ok(())
}

/// Wire every core to `intc` and check no core output was left over.
pub fn wire_cores(
    intc: &dyn InterruptController,
    cores: &[Arc<dyn CpuCore>],
) -> Result<(), IntcError> {
    for core in cores {
        intc.wire_core(core.as_ref())?;
        if let Some(output) = core
            .outputs()
            .into_iter()
            .find(|&o| !core.output_connected(o))
        {
            return Err(IntcError::DanglingSource {
                source_name: format!("core {} {output}", core.index()),
                index: 0,
            });
        }
    }
    Ok(())
}

/// Every interrupt output of every device must have a sink.
pub fn check_sources(devices: &[Arc<dyn RegisterDevice>]) -> Result<(), IntcError> {
    for device in devices {
        if let Some(index) = (0..device.irq_outputs()).find(|&i| !device.irq_connected(i)) {
            return Err(IntcError::DanglingSource {
                source_name: device.name().to_string(),
                index,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_controller, Stage};
    use emulator_cpu::create_core;
    use emulator_periph::{TestDevice, Unimplemented, TRIGGER_SENTINEL};
    use soc_config::{CpuSpec, InterruptControllerSpec};

    fn gic(cores: usize) -> Box<dyn InterruptController> {
        let spec = InterruptControllerSpec::GicV3 {
            shared_lines: 256,
            security_extensions: true,
            distributor: "dist".into(),
            redistributor: "redist".into(),
        };
        create_controller(&spec, &CpuSpec::arm("cortex-a53", 1, 256), cores, |_| {
            Some(0xf60000)
        })
        .unwrap()
    }

    #[test]
    fn test_line_map() {
        let mut map = SharedLineMap::new(256);
        map.assign(132, "test[0]").unwrap();
        map.assign(133, "uart[0]").unwrap();
        assert_eq!(
            map.assign(132, "virtio0[0]"),
            Err(IntcError::DuplicateLine {
                line: 132,
                first: "test[0]".into(),
                second: "virtio0[0]".into(),
            })
        );
        assert!(matches!(
            map.assign(256, "late[0]"),
            Err(IntcError::LineOutOfRange { line: 256, .. })
        ));
        assert_eq!(map.owner(133), Some("uart[0]"));
        assert_eq!(map.iter().map(|(l, _)| l).collect::<Vec<_>>(), vec![132, 133]);
    }

    #[test]
    fn test_device_interrupt_reaches_core() {
        let mut intc = gic(2);
        let spec = CpuSpec::arm("cortex-a53", 1, 256);
        let cores: Vec<_> = (0..2).map(|i| create_core(&spec, i).unwrap()).collect();
        wire_cores(intc.as_ref(), &cores).unwrap();

        let test = Arc::new(TestDevice::new("test"));
        let mut map = SharedLineMap::new(intc.shared_lines());
        connect_device(intc.as_ref(), &mut map, test.as_ref(), &[132]).unwrap();
        let devices: Vec<Arc<dyn RegisterDevice>> = vec![test.clone()];
        check_sources(&devices).unwrap();
        intc.finish_wiring().unwrap();
        assert_eq!(intc.stage(), Stage::Wired);

        test.write(TestDevice::IRQ_RAISE, TRIGGER_SENTINEL);
        assert!(intc.input_level(132));
        intc.route();
        assert!(cores[0].input_level(emulator_cpu::CpuInput::Irq));
        test.write(TestDevice::IRQ_CLEAR, TRIGGER_SENTINEL);
        intc.route();
        assert!(!cores[0].input_level(emulator_cpu::CpuInput::Irq));
    }

    #[test]
    fn test_dangling_and_surplus_lines() {
        let intc = gic(1);
        let sdhci = Arc::new(Unimplemented::with_irqs("sdhci", "sdhci", 0x10000, 2));
        let mut map = SharedLineMap::new(intc.shared_lines());
        connect_device(intc.as_ref(), &mut map, sdhci.as_ref(), &[102]).unwrap();
        let devices: Vec<Arc<dyn RegisterDevice>> = vec![sdhci.clone()];
        assert_eq!(
            check_sources(&devices),
            Err(IntcError::DanglingSource {
                source_name: "sdhci".into(),
                index: 1
            })
        );

        let test = TestDevice::new("test");
        assert!(matches!(
            connect_device(intc.as_ref(), &mut map, &test, &[132, 140]),
            Err(IntcError::Periph(_))
        ));
    }

    #[test]
    fn test_wiring_needs_every_core() {
        let mut intc = gic(2);
        let core = create_core(&CpuSpec::arm("cortex-a53", 1, 256), 0).unwrap();
        wire_cores(intc.as_ref(), &[core]).unwrap();
        assert!(matches!(
            intc.finish_wiring(),
            Err(IntcError::DanglingOutput { output: 1, .. })
        ));
    }
}
