/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the interrupt-facing side of CPU cores. Instruction
    execution lives elsewhere; a core here is its set of interrupt inputs
    (driven by the interrupt controller) and outputs (timers, controller
    maintenance, performance monitor) that the board wires up.

--*/

use emulator_bus::{Irq, IrqLevels};
use soc_config::{CpuArch, CpuSpec};
use std::fmt;
use std::sync::{Arc, OnceLock};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use thiserror::Error;

/// Generic timers of an A-profile core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum GenericTimer {
    /// Non-secure EL1 physical timer.
    Phys,
    Virt,
    /// Non-secure EL2 timer.
    Hyp,
    /// Secure EL1 physical timer.
    Sec,
}

/// Interrupt inputs a core accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum CpuInput {
    Irq,
    Fiq,
    MachineExternal,
    SupervisorExternal,
}

impl CpuInput {
    fn line(self) -> u32 {
        match self {
            CpuInput::Irq => 0,
            CpuInput::Fiq => 1,
            CpuInput::MachineExternal => 2,
            CpuInput::SupervisorExternal => 3,
        }
    }
}

/// Interrupt outputs a core drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuOutput {
    Timer(GenericTimer),
    GicMaintenance,
    Pmu,
}

impl fmt::Display for CpuOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuOutput::Timer(timer) => write!(f, "timer-{timer}"),
            CpuOutput::GicMaintenance => f.write_str("gic-maintenance"),
            CpuOutput::Pmu => f.write_str("pmu"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CpuError {
    #[error("core {core} ({model}) has no output {output}")]
    NoSuchOutput {
        core: usize,
        model: String,
        output: CpuOutput,
    },
    #[error("output {output} of core {core} is already connected")]
    AlreadyConnected { core: usize, output: CpuOutput },
    #[error("hart modes {0:?} must start with 'M' and contain only M, S and U")]
    BadHartModes(String),
}

/// A core as seen by the interrupt fabric.
pub trait CpuCore: Send + Sync {
    fn index(&self) -> usize;

    fn model(&self) -> &str;

    /// Inputs this core has, in a fixed order.
    fn inputs(&self) -> &[CpuInput];

    /// Handle that drives `input`, or `None` if the core lacks it.
    fn input(&self, input: CpuInput) -> Option<Irq>;

    fn input_level(&self, input: CpuInput) -> bool;

    fn outputs(&self) -> Vec<CpuOutput>;

    fn connect_output(&self, output: CpuOutput, irq: Irq) -> Result<(), CpuError>;

    fn output_connected(&self, output: CpuOutput) -> bool;

    /// Drive one of this core's outputs. Unconnected outputs are dropped.
    fn set_output_level(&self, output: CpuOutput, level: bool);
}

struct OutputSlot {
    output: CpuOutput,
    irq: OnceLock<Irq>,
}

/// Core built from a [`CpuSpec`]. The spec decides which inputs and outputs
/// exist; all cores share the same bookkeeping.
pub struct Core {
    index: usize,
    model: String,
    inputs: Vec<CpuInput>,
    levels: Arc<IrqLevels>,
    outputs: Vec<OutputSlot>,
}

impl Core {
    fn new(index: usize, model: &str, inputs: Vec<CpuInput>, outputs: Vec<CpuOutput>) -> Self {
        Self {
            index,
            model: model.to_string(),
            inputs,
            levels: Arc::new(IrqLevels::new(4)),
            outputs: outputs
                .into_iter()
                .map(|output| OutputSlot {
                    output,
                    irq: OnceLock::new(),
                })
                .collect(),
        }
    }

    fn slot(&self, output: CpuOutput) -> Option<&OutputSlot> {
        self.outputs.iter().find(|s| s.output == output)
    }
}

impl CpuCore for Core {
    fn index(&self) -> usize {
        self.index
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn inputs(&self) -> &[CpuInput] {
        &self.inputs
    }

    fn input(&self, input: CpuInput) -> Option<Irq> {
        if !self.inputs.contains(&input) {
            return None;
        }
        self.levels.irq(input.line())
    }

    fn input_level(&self, input: CpuInput) -> bool {
        self.levels.level(input.line())
    }

    fn outputs(&self) -> Vec<CpuOutput> {
        self.outputs.iter().map(|s| s.output).collect()
    }

    fn connect_output(&self, output: CpuOutput, irq: Irq) -> Result<(), CpuError> {
        let slot = self.slot(output).ok_or_else(|| CpuError::NoSuchOutput {
            core: self.index,
            model: self.model.clone(),
            output,
        })?;
        slot.irq.set(irq).map_err(|_| CpuError::AlreadyConnected {
            core: self.index,
            output,
        })
    }

    fn output_connected(&self, output: CpuOutput) -> bool {
        self.slot(output).is_some_and(|s| s.irq.get().is_some())
    }

    fn set_output_level(&self, output: CpuOutput, level: bool) {
        if let Some(irq) = self.slot(output).and_then(|s| s.irq.get()) {
            irq.set_level(level);
        }
    }
}

/// Instantiate core `index` of a cluster described by `spec`.
pub fn create_core(spec: &CpuSpec, index: usize) -> Result<Arc<dyn CpuCore>, CpuError> {
    let core = match spec.arch {
        CpuArch::Arm => {
            let mut outputs: Vec<CpuOutput> = GenericTimer::iter().map(CpuOutput::Timer).collect();
            if spec.has_el2 {
                outputs.push(CpuOutput::GicMaintenance);
            }
            if spec.has_pmu {
                outputs.push(CpuOutput::Pmu);
            }
            Core::new(
                index,
                &spec.model,
                vec![CpuInput::Irq, CpuInput::Fiq],
                outputs,
            )
        }
        // The NVIC feeds the core directly; SysTick is internal.
        CpuArch::ArmM => Core::new(index, &spec.model, vec![CpuInput::Irq], vec![]),
        CpuArch::Riscv32 | CpuArch::Riscv64 => {
            let modes = spec.hart_modes.as_deref().unwrap_or("M");
            Core::new(index, &spec.model, hart_inputs(modes)?, vec![])
        }
    };
    log::debug!(
        "core {index}: {} inputs {:?} outputs {:?}",
        core.model,
        core.inputs,
        core.outputs()
    );
    Ok(Arc::new(core))
}

/// External interrupt inputs of a hart with privilege `modes` ("M", "MS",
/// "MSU", ...).
pub fn hart_inputs(modes: &str) -> Result<Vec<CpuInput>, CpuError> {
    let bad = || CpuError::BadHartModes(modes.to_string());
    if !modes.starts_with('M') {
        return Err(bad());
    }
    let mut inputs = Vec::new();
    for mode in modes.chars() {
        match mode {
            'M' if !inputs.contains(&CpuInput::MachineExternal) => {
                inputs.push(CpuInput::MachineExternal)
            }
            'S' if !inputs.contains(&CpuInput::SupervisorExternal) => {
                inputs.push(CpuInput::SupervisorExternal)
            }
            // User mode has no external interrupt context.
            'U' => {}
            _ => return Err(bad()),
        }
    }
    Ok(inputs)
}
