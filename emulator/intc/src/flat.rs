/*++

Licensed under the Apache-2.0 license.

File Name:

    flat.rs

Abstract:

    File contains controllers without private lines: the M-profile NVIC,
    which feeds a single core, and the RISC-V PLIC, which has one context
    per hart privilege mode.

--*/

use crate::{IntcError, InterruptController, Stage};
use emulator_bus::{Irq, IrqLevels};
use emulator_cpu::{hart_inputs, CpuCore, CpuInput};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Flavor {
    Nvic,
    /// Hart privilege modes, e.g. "MS".
    Plic(String),
}

/// Target of one controller output.
struct Context {
    core: usize,
    input: CpuInput,
    irq: OnceLock<Irq>,
}

pub struct FlatController {
    name: String,
    flavor: Flavor,
    lines: u32,
    stage: Stage,
    core_count: usize,
    inputs: Option<Arc<IrqLevels>>,
    contexts: Vec<Context>,
}

impl FlatController {
    pub fn nvic(name: impl Into<String>, lines: u32) -> Self {
        Self::new(name.into(), Flavor::Nvic, lines)
    }

    /// `sources` includes the reserved source 0.
    pub fn plic(name: impl Into<String>, sources: u32, hart_modes: &str) -> Self {
        Self::new(name.into(), Flavor::Plic(hart_modes.to_string()), sources)
    }

    fn new(name: String, flavor: Flavor, lines: u32) -> Self {
        Self {
            name,
            flavor,
            lines,
            stage: Stage::Unconfigured,
            core_count: 0,
            inputs: None,
            contexts: Vec::new(),
        }
    }

    fn out_of_order(&self, operation: &'static str) -> IntcError {
        IntcError::OutOfOrder {
            controller: self.name.clone(),
            operation,
            stage: self.stage,
        }
    }

    fn first_line(&self) -> u32 {
        match self.flavor {
            Flavor::Nvic => 0,
            Flavor::Plic(_) => 1,
        }
    }

    fn max_cores(&self) -> usize {
        match self.flavor {
            Flavor::Nvic => 1,
            Flavor::Plic(_) => usize::MAX,
        }
    }

    pub fn set_core_count(&mut self, cores: usize) -> Result<(), IntcError> {
        if self.stage > Stage::Sized {
            return Err(self.out_of_order("set core count"));
        }
        if cores == 0 {
            return Err(IntcError::NoCores);
        }
        if cores > self.max_cores() {
            return Err(IntcError::TooManyCores {
                controller: self.name.clone(),
                cores,
                max: self.max_cores(),
            });
        }
        if self.lines <= self.first_line() {
            return Err(IntcError::BadLineCount {
                controller: self.name.clone(),
                lines: self.lines,
            });
        }
        self.core_count = cores;
        self.stage = Stage::Sized;
        Ok(())
    }

    pub fn realize(&mut self) -> Result<(), IntcError> {
        if self.stage != Stage::Sized {
            return Err(self.out_of_order("realize"));
        }
        let per_core = match &self.flavor {
            Flavor::Nvic => vec![CpuInput::Irq],
            Flavor::Plic(modes) => hart_inputs(modes)?,
        };
        self.contexts = (0..self.core_count)
            .flat_map(|core| {
                per_core.iter().map(move |&input| Context {
                    core,
                    input,
                    irq: OnceLock::new(),
                })
            })
            .collect();
        self.inputs = Some(Arc::new(IrqLevels::new(self.lines as usize)));
        self.stage = Stage::Realized;
        log::debug!(
            "{}: {} lines, {} contexts",
            self.name,
            self.lines,
            self.contexts.len()
        );
        Ok(())
    }

    pub fn contexts(&self) -> usize {
        self.contexts.len()
    }
}

impl InterruptController for FlatController {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage(&self) -> Stage {
        self.stage
    }

    fn shared_lines(&self) -> u32 {
        self.lines
    }

    fn core_count(&self) -> usize {
        self.core_count
    }

    fn input(&self, line: u32) -> Result<Irq, IntcError> {
        let levels = self
            .inputs
            .as_ref()
            .ok_or_else(|| self.out_of_order("get input"))?;
        if line < self.first_line() {
            return Err(IntcError::ReservedLine(line));
        }
        levels.irq(line).ok_or(IntcError::LineOutOfRange {
            line,
            lines: self.lines,
        })
    }

    fn input_level(&self, line: u32) -> bool {
        self.inputs.as_ref().is_some_and(|l| l.level(line))
    }

    fn wire_core(&self, core: &dyn CpuCore) -> Result<(), IntcError> {
        if self.stage != Stage::Realized {
            return Err(self.out_of_order("wire core"));
        }
        let index = core.index();
        if index >= self.core_count {
            return Err(IntcError::TooManyCores {
                controller: self.name.clone(),
                cores: index + 1,
                max: self.core_count,
            });
        }
        for ctx in self.contexts.iter().filter(|c| c.core == index) {
            let irq = core.input(ctx.input).ok_or(IntcError::MissingCoreInput {
                core: index,
                input: ctx.input,
            })?;
            ctx.irq.set(irq).map_err(|_| IntcError::AlreadyWired {
                controller: self.name.clone(),
                core: index,
            })?;
        }
        Ok(())
    }

    fn finish_wiring(&mut self) -> Result<(), IntcError> {
        if self.stage != Stage::Realized {
            return Err(self.out_of_order("finish wiring"));
        }
        if let Some(output) = self.contexts.iter().position(|c| c.irq.get().is_none()) {
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
        let pending = levels.any_asserted(self.first_line()..self.lines);
        // Every source targets the first context of core 0.
        for (i, ctx) in self.contexts.iter().enumerate() {
            if let Some(irq) = ctx.irq.get() {
                irq.set_level(i == 0 && pending);
            }
        }
    }
}
