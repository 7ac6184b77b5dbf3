/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the interrupt controllers and the fabric that wires
    peripherals and cores to them.

--*/

mod fabric;
mod flat;
mod gicv3;

pub use fabric::{check_sources, connect_device, wire_cores, SharedLineMap};
pub use flat::FlatController;
pub use gicv3::{
    ppi_base, private_line, redistributor_capacity, timer_ppi, ControllerTopology, GicV3,
    ARCH_GIC_MAINT_IRQ, ARCH_TIMER_NS_EL1_IRQ, ARCH_TIMER_NS_EL2_IRQ, ARCH_TIMER_S_EL1_IRQ,
    ARCH_TIMER_VIRT_IRQ, GICV3_REDIST_SIZE, GIC_INTERNAL, GIC_MAX_LINES, GIC_NR_SGIS,
    VIRTUAL_PMU_IRQ,
};

use emulator_bus::Irq;
use emulator_cpu::{CpuCore, CpuError, CpuInput};
use emulator_periph::PeriphError;
use soc_config::{CpuSpec, InterruptControllerSpec};
use strum_macros::Display;
use thiserror::Error;

/// Configuration lifecycle of a controller. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Unconfigured,
    Sized,
    Realized,
    Wired,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntcError {
    #[error("a machine needs at least one core")]
    NoCores,
    #[error(
        "{cores} cores need {cores} redistributors but the {region_size:#x} byte region holds {capacity}"
    )]
    CapacityExceeded {
        cores: usize,
        capacity: u64,
        region_size: u64,
    },
    #[error("{controller}: {operation} is not allowed while {stage}")]
    OutOfOrder {
        controller: String,
        operation: &'static str,
        stage: Stage,
    },
    #[error("{controller}: {lines} lines is not a valid line count")]
    BadLineCount { controller: String, lines: u32 },
    #[error("{controller} supports at most {max} cores, got {cores}")]
    TooManyCores {
        controller: String,
        cores: usize,
        max: usize,
    },
    #[error("interrupt line {line} is outside the {lines} shared lines")]
    LineOutOfRange { line: u32, lines: u32 },
    #[error("interrupt line {0} is reserved")]
    ReservedLine(u32),
    #[error("interrupt line {line} is claimed by both {first} and {second}")]
    DuplicateLine {
        line: u32,
        first: String,
        second: String,
    },
    #[error("interrupt output {index} of {source_name} is not connected")]
    DanglingSource { source_name: String, index: usize },
    #[error("{controller}: output {output} is not connected to a core")]
    DanglingOutput { controller: String, output: usize },
    #[error("core {core} has no {input} input")]
    MissingCoreInput { core: usize, input: CpuInput },
    #[error("core {core} is already wired to {controller}")]
    AlreadyWired { controller: String, core: usize },
    #[error("{0} is not in the memory map")]
    UnknownRegion(String),
    #[error(transparent)]
    Cpu(#[from] CpuError),
    #[error(transparent)]
    Periph(#[from] PeriphError),
}

/// The controller contract the fabric relies on. Distribution inside the
/// controller is a black box; `route` only has to present a level per core
/// output from the current input levels.
pub trait InterruptController: Send + Sync {
    fn name(&self) -> &str;

    fn stage(&self) -> Stage;

    /// Lines peripherals may be assigned to.
    fn shared_lines(&self) -> u32;

    fn core_count(&self) -> usize;

    /// Handle for shared line `line`. Valid once realized.
    fn input(&self, line: u32) -> Result<Irq, IntcError>;

    fn input_level(&self, line: u32) -> bool;

    /// Connect the controller to `core` in both directions.
    fn wire_core(&self, core: &dyn CpuCore) -> Result<(), IntcError>;

    /// Check every output reached a core and freeze the topology.
    fn finish_wiring(&mut self) -> Result<(), IntcError>;

    /// Recompute output levels from input levels.
    fn route(&self);
}

/// Size and realize the controller `spec` describes for `core_count` cores.
///
/// `region_size` resolves a memory map region name to its size.
pub fn create_controller(
    spec: &InterruptControllerSpec,
    cpu: &CpuSpec,
    core_count: usize,
    region_size: impl Fn(&str) -> Option<u64>,
) -> Result<Box<dyn InterruptController>, IntcError> {
    match spec {
        InterruptControllerSpec::GicV3 {
            shared_lines,
            security_extensions,
            redistributor,
            ..
        } => {
            let redist_size = region_size(redistributor)
                .ok_or_else(|| IntcError::UnknownRegion(redistributor.clone()))?;
            let topology = ControllerTopology::size(core_count, *shared_lines, redist_size)?;
            let mut gic = GicV3::new("gicv3");
            gic.size(&topology)?;
            gic.set_security_extensions(*security_extensions)?;
            gic.realize()?;
            Ok(Box::new(gic))
        }
        InterruptControllerSpec::Nvic { lines } => {
            let mut nvic = FlatController::nvic("nvic", *lines);
            nvic.set_core_count(core_count)?;
            nvic.realize()?;
            Ok(Box::new(nvic))
        }
        InterruptControllerSpec::Plic { sources, region } => {
            region_size(region).ok_or_else(|| IntcError::UnknownRegion(region.clone()))?;
            let modes = cpu.hart_modes.as_deref().unwrap_or("M");
            let mut plic = FlatController::plic("plic", *sources, modes);
            plic.set_core_count(core_count)?;
            plic.realize()?;
            Ok(Box::new(plic))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size_of(name: &str) -> Option<u64> {
        match name {
            "gic-redist" => Some(0xf60000),
            "plic" => Some(0x4000000),
            _ => None,
        }
    }

    fn gic_spec() -> InterruptControllerSpec {
        InterruptControllerSpec::GicV3 {
            shared_lines: 256,
            security_extensions: true,
            distributor: "gic-dist".into(),
            redistributor: "gic-redist".into(),
        }
    }

    #[test]
    fn test_create_gic() {
        let cpu = CpuSpec::arm("cortex-a53", 1, 256);
        let gic = create_controller(&gic_spec(), &cpu, 4, size_of).unwrap();
        assert_eq!(gic.stage(), Stage::Realized);
        assert_eq!(gic.shared_lines(), 256);
        assert_eq!(gic.core_count(), 4);
    }

    #[test]
    fn test_create_gic_over_capacity() {
        let cpu = CpuSpec::arm("cortex-a53", 1, 256);
        assert_eq!(
            create_controller(&gic_spec(), &cpu, 124, size_of).err(),
            Some(IntcError::CapacityExceeded {
                cores: 124,
                capacity: 123,
                region_size: 0xf60000
            })
        );
    }

    #[test]
    fn test_create_needs_regions() {
        let cpu = CpuSpec::arm("cortex-a53", 1, 256);
        let spec = InterruptControllerSpec::GicV3 {
            shared_lines: 256,
            security_extensions: true,
            distributor: "gic-dist".into(),
            redistributor: "missing".into(),
        };
        assert_eq!(
            create_controller(&spec, &cpu, 1, size_of).err(),
            Some(IntcError::UnknownRegion("missing".into()))
        );
    }

    #[test]
    fn test_create_flat() {
        let m33 = CpuSpec::arm_m("cortex-m33");
        let nvic =
            create_controller(&InterruptControllerSpec::Nvic { lines: 64 }, &m33, 1, size_of)
                .unwrap();
        assert_eq!(nvic.shared_lines(), 64);
        assert!(matches!(
            create_controller(&InterruptControllerSpec::Nvic { lines: 64 }, &m33, 2, size_of),
            Err(IntcError::TooManyCores { .. })
        ));

        let rv = CpuSpec::riscv("rv64", soc_config::CpuArch::Riscv64, "MS", 16);
        let plic = create_controller(
            &InterruptControllerSpec::Plic {
                sources: 250,
                region: "plic".into(),
            },
            &rv,
            2,
            size_of,
        )
        .unwrap();
        assert_eq!(plic.stage(), Stage::Realized);
        assert_eq!(plic.input(0).err(), Some(IntcError::ReservedLine(0)));
    }
}
