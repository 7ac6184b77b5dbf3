/*++

Licensed under the Apache-2.0 license.

File Name:

    gicv3.rs

Abstract:

    File contains GICv3 sizing, private interrupt numbering and the
    controller's configuration contract.

    Inputs are laid out as all shared lines first, then one block of
    GIC_INTERNAL lines per core. Outputs are one IRQ per core followed by
    one FIQ per core.

--*/

use crate::{IntcError, InterruptController, Stage};
use emulator_bus::{Irq, IrqLevels};
use emulator_cpu::{CpuCore, CpuInput, CpuOutput, GenericTimer};
use std::sync::{Arc, OnceLock};

/// Private lines (SGIs and PPIs) per core.
pub const GIC_INTERNAL: u32 = 32;
/// Software generated interrupts at the start of each private block.
pub const GIC_NR_SGIS: u32 = 16;
/// Architectural maximum of the `num-irq` property.
pub const GIC_MAX_LINES: u32 = 1020;
/// Bytes of redistributor frame per core.
pub const GICV3_REDIST_SIZE: u64 = 0x20000;

// PPI numbers relative to the first PPI.
pub const VIRTUAL_PMU_IRQ: u32 = 7;
pub const ARCH_GIC_MAINT_IRQ: u32 = 9;
pub const ARCH_TIMER_NS_EL2_IRQ: u32 = 10;
pub const ARCH_TIMER_VIRT_IRQ: u32 = 11;
pub const ARCH_TIMER_S_EL1_IRQ: u32 = 13;
pub const ARCH_TIMER_NS_EL1_IRQ: u32 = 14;

pub fn timer_ppi(timer: GenericTimer) -> u32 {
    match timer {
        GenericTimer::Phys => ARCH_TIMER_NS_EL1_IRQ,
        GenericTimer::Virt => ARCH_TIMER_VIRT_IRQ,
        GenericTimer::Hyp => ARCH_TIMER_NS_EL2_IRQ,
        GenericTimer::Sec => ARCH_TIMER_S_EL1_IRQ,
    }
}

fn output_ppi(output: CpuOutput) -> u32 {
    match output {
        CpuOutput::Timer(timer) => timer_ppi(timer),
        CpuOutput::GicMaintenance => ARCH_GIC_MAINT_IRQ,
        CpuOutput::Pmu => VIRTUAL_PMU_IRQ,
    }
}

/// Cores a redistributor region of `region_size` bytes can hold.
pub fn redistributor_capacity(region_size: u64) -> u64 {
    region_size / GICV3_REDIST_SIZE
}

/// Controller input of PPI 0 of `core`.
pub fn ppi_base(shared_lines: u32, core: usize) -> u32 {
    shared_lines + core as u32 * GIC_INTERNAL + GIC_NR_SGIS
}

/// Controller input for PPI `ppi` of `core`.
pub fn private_line(shared_lines: u32, core: usize, ppi: u32) -> u32 {
    ppi_base(shared_lines, core) + ppi
}

/// Controller dimensions for a given core count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerTopology {
    pub core_count: usize,
    pub private_lines_per_core: u32,
    pub shared_lines: u32,
    pub redistributor_region_count: u32,
}

impl ControllerTopology {
    /// Fails if the redistributor region cannot hold `core_count` frames,
    /// or if `shared_lines` leaves no room for the private lines.
    pub fn size(
        core_count: usize,
        shared_lines: u32,
        redist_region_size: u64,
    ) -> Result<Self, IntcError> {
        if core_count == 0 {
            return Err(IntcError::NoCores);
        }
        if shared_lines > GIC_MAX_LINES - GIC_INTERNAL {
            return Err(IntcError::BadLineCount {
                controller: "gicv3".into(),
                lines: shared_lines,
            });
        }
        // Input numbering stays within u32 for any accepted core count.
        let capacity = redistributor_capacity(redist_region_size)
            .min(u64::from((u32::MAX - GIC_MAX_LINES) / GIC_INTERNAL));
        if core_count as u64 > capacity {
            return Err(IntcError::CapacityExceeded {
                cores: core_count,
                capacity,
                region_size: redist_region_size,
            });
        }
        Ok(Self {
            core_count,
            private_lines_per_core: GIC_INTERNAL,
            shared_lines,
            // min(core_count, capacity), and capacity >= core_count here.
            redistributor_region_count: core_count as u32,
        })
    }

    /// Value of the controller's `num-irq` property.
    pub fn num_irq(&self) -> u32 {
        self.shared_lines + GIC_INTERNAL
    }

    pub fn total_inputs(&self) -> u32 {
        self.shared_lines + self.core_count as u32 * GIC_INTERNAL
    }
}

pub struct GicV3 {
    name: String,
    stage: Stage,
    num_cpu: Option<usize>,
    num_irq: Option<u32>,
    security_extensions: bool,
    redist_region_count: Option<Vec<u32>>,
    inputs: Option<Arc<IrqLevels>>,
    outputs: Vec<OnceLock<Irq>>,
}

impl GicV3 {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: Stage::Unconfigured,
            num_cpu: None,
            num_irq: None,
            security_extensions: false,
            redist_region_count: None,
            inputs: None,
            outputs: Vec::new(),
        }
    }

    fn out_of_order(&self, operation: &'static str) -> IntcError {
        IntcError::OutOfOrder {
            controller: self.name.clone(),
            operation,
            stage: self.stage,
        }
    }

    fn configurable(&self, operation: &'static str) -> Result<(), IntcError> {
        match self.stage {
            Stage::Unconfigured | Stage::Sized => Ok(()),
            _ => Err(self.out_of_order(operation)),
        }
    }

    fn update_stage(&mut self) {
        if self.num_cpu.is_some() && self.num_irq.is_some() && self.redist_region_count.is_some() {
            self.stage = Stage::Sized;
        }
    }

    pub fn set_num_cpu(&mut self, num_cpu: usize) -> Result<(), IntcError> {
        self.configurable("set num-cpu")?;
        if num_cpu == 0 {
            return Err(IntcError::NoCores);
        }
        self.num_cpu = Some(num_cpu);
        self.update_stage();
        Ok(())
    }

    /// `num_irq` counts the shared lines plus one private block.
    pub fn set_num_irq(&mut self, num_irq: u32) -> Result<(), IntcError> {
        self.configurable("set num-irq")?;
        if !(GIC_INTERNAL..=GIC_MAX_LINES).contains(&num_irq) || num_irq % 32 != 0 {
            return Err(IntcError::BadLineCount {
                controller: self.name.clone(),
                lines: num_irq,
            });
        }
        self.num_irq = Some(num_irq);
        self.update_stage();
        Ok(())
    }

    pub fn set_security_extensions(&mut self, enabled: bool) -> Result<(), IntcError> {
        self.configurable("set has-security-extensions")?;
        self.security_extensions = enabled;
        Ok(())
    }

    pub fn set_redist_region_count(&mut self, counts: Vec<u32>) -> Result<(), IntcError> {
        self.configurable("set redist-region-count")?;
        self.redist_region_count = Some(counts);
        self.update_stage();
        Ok(())
    }

    /// Apply every property of `topology`.
    pub fn size(&mut self, topology: &ControllerTopology) -> Result<(), IntcError> {
        self.set_num_cpu(topology.core_count)?;
        self.set_num_irq(topology.num_irq())?;
        self.set_redist_region_count(vec![topology.redistributor_region_count])
    }

    pub fn security_extensions(&self) -> bool {
        self.security_extensions
    }

    pub fn realize(&mut self) -> Result<(), IntcError> {
        if self.stage != Stage::Sized {
            return Err(self.out_of_order("realize"));
        }
        let (Some(num_cpu), Some(num_irq), Some(counts)) =
            (self.num_cpu, self.num_irq, &self.redist_region_count)
        else {
            return Err(self.out_of_order("realize"));
        };
        let frames: u64 = counts.iter().map(|&c| u64::from(c)).sum();
        if frames < num_cpu as u64 {
            return Err(IntcError::CapacityExceeded {
                cores: num_cpu,
                capacity: frames,
                region_size: frames * GICV3_REDIST_SIZE,
            });
        }
        let shared = num_irq - GIC_INTERNAL;
        let inputs = shared as usize + num_cpu * GIC_INTERNAL as usize;
        self.inputs = Some(Arc::new(IrqLevels::new(inputs)));
        self.outputs = (0..2 * num_cpu).map(|_| OnceLock::new()).collect();
        self.stage = Stage::Realized;
        log::debug!(
            "{}: {num_cpu} cores, {shared} shared lines, {inputs} inputs",
            self.name
        );
        Ok(())
    }

    fn levels(&self) -> Result<&Arc<IrqLevels>, IntcError> {
        self.inputs
            .as_ref()
            .ok_or_else(|| self.out_of_order("get input"))
    }

    /// Handle for PPI `ppi` of `core`.
    pub fn private_input(&self, core: usize, ppi: u32) -> Result<Irq, IntcError> {
        let levels = self.levels()?;
        let line = private_line(self.shared_lines(), core, ppi);
        if core >= self.core_count() || ppi >= GIC_INTERNAL - GIC_NR_SGIS {
            return Err(IntcError::LineOutOfRange {
                line,
                lines: levels.len() as u32,
            });
        }
        levels.irq(line).ok_or(IntcError::LineOutOfRange {
            line,
            lines: levels.len() as u32,
        })
    }

    pub fn output_connected(&self, output: usize) -> bool {
        self.outputs.get(output).is_some_and(|o| o.get().is_some())
    }

    fn connect_output(
        &self,
        output: usize,
        core: &dyn CpuCore,
        input: CpuInput,
    ) -> Result<(), IntcError> {
        let irq = core.input(input).ok_or(IntcError::MissingCoreInput {
            core: core.index(),
            input,
        })?;
        self.outputs[output]
            .set(irq)
            .map_err(|_| IntcError::AlreadyWired {
                controller: self.name.clone(),
                core: core.index(),
            })
    }
}

impl InterruptController for GicV3 {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage(&self) -> Stage {
        self.stage
    }

    fn shared_lines(&self) -> u32 {
        self.num_irq.map_or(0, |n| n - GIC_INTERNAL)
    }

    fn core_count(&self) -> usize {
        self.num_cpu.unwrap_or(0)
    }

    fn input(&self, line: u32) -> Result<Irq, IntcError> {
        let levels = self.levels()?;
        let lines = self.shared_lines();
        if line >= lines {
            return Err(IntcError::LineOutOfRange { line, lines });
        }
        levels
            .irq(line)
            .ok_or(IntcError::LineOutOfRange { line, lines })
    }

    fn input_level(&self, line: u32) -> bool {
        self.inputs.as_ref().is_some_and(|l| l.level(line))
    }

    fn wire_core(&self, core: &dyn CpuCore) -> Result<(), IntcError> {
        if self.stage != Stage::Realized {
            return Err(self.out_of_order("wire core"));
        }
        let n = self.core_count();
        let i = core.index();
        if i >= n {
            return Err(IntcError::TooManyCores {
                controller: self.name.clone(),
                cores: i + 1,
                max: n,
            });
        }
        for output in core.outputs() {
            let ppi = output_ppi(output);
            core.connect_output(output, self.private_input(i, ppi)?)?;
            log::debug!(
                "{}: core {i} {output} -> input {}",
                self.name,
                private_line(self.shared_lines(), i, ppi)
            );
        }
        self.connect_output(i, core, CpuInput::Irq)?;
        self.connect_output(i + n, core, CpuInput::Fiq)?;
        Ok(())
    }

    fn finish_wiring(&mut self) -> Result<(), IntcError> {
        if self.stage != Stage::Realized {
            return Err(self.out_of_order("finish wiring"));
        }
        if let Some(output) = (0..self.outputs.len()).find(|&o| !self.output_connected(o)) {
            return Err(IntcError::DanglingOutput {
                controller: self.name.clone(),
                output,
            });
        }
        self.stage = Stage::Wired;
        Ok(())
    }

    fn route(&self) {
        let Some(levels) = &self.inputs else {
            return;
        };
        let shared = self.shared_lines();
        let n = self.core_count();
        let spi_pending = levels.any_asserted(0..shared);
        for (i, output) in self.outputs.iter().take(n).enumerate() {
            let base = shared + i as u32 * GIC_INTERNAL;
            // Shared lines target core 0; group 0 (FIQ) delivery is not modeled.
            let pending = levels.any_asserted(base..base + GIC_INTERNAL) || (i == 0 && spi_pending);
            if let Some(irq) = output.get() {
                irq.set_level(pending);
            }
        }
    }
}
