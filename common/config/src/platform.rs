// Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CpuArch {
    /// A/R-profile Arm core driven by a GIC.
    Arm,
    /// M-profile Arm core with an integrated NVIC.
    ArmM,
    Riscv32,
    Riscv64,
}

/// CPU cluster description. Cores are instantiated from this at compose time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSpec {
    pub model: String,
    pub arch: CpuArch,
    pub default_count: u32,
    pub max_count: u32,
    /// Virtualization extensions; brings the controller maintenance output.
    #[serde(default)]
    pub has_el2: bool,
    #[serde(default)]
    pub has_el3: bool,
    /// Performance monitor with an overflow interrupt output.
    #[serde(default)]
    pub has_pmu: bool,
    /// Privilege modes taking external interrupts, e.g. "MS" (RISC-V only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hart_modes: Option<String>,
}

impl CpuSpec {
    pub fn arm(model: impl Into<String>, default_count: u32, max_count: u32) -> Self {
        Self {
            model: model.into(),
            arch: CpuArch::Arm,
            default_count,
            max_count,
            has_el2: true,
            has_el3: true,
            has_pmu: false,
            hart_modes: None,
        }
    }

    pub fn arm_m(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            arch: CpuArch::ArmM,
            default_count: 1,
            max_count: 1,
            has_el2: false,
            has_el3: false,
            has_pmu: false,
            hart_modes: None,
        }
    }

    pub fn riscv(
        model: impl Into<String>,
        arch: CpuArch,
        hart_modes: impl Into<String>,
        max_count: u32,
    ) -> Self {
        Self {
            model: model.into(),
            arch,
            default_count: 1,
            max_count,
            has_el2: false,
            has_el3: false,
            has_pmu: false,
            hart_modes: Some(hart_modes.into()),
        }
    }
}

/// The board's single interrupt controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InterruptControllerSpec {
    /// GICv3 with a distributor and one redistributor region.
    #[serde(rename = "gicv3")]
    GicV3 {
        /// External (shared peripheral) lines; the controller adds 32 private lines.
        shared_lines: u32,
        #[serde(default = "default_true")]
        security_extensions: bool,
        distributor: String,
        redistributor: String,
    },
    /// Nested vectored interrupt controller of an M-profile core.
    Nvic { lines: u32 },
    /// Platform-level interrupt controller with per-hart contexts.
    Plic { sources: u32, region: String },
}

fn default_true() -> bool {
    true
}

impl InterruptControllerSpec {
    /// Number of lines peripherals may be assigned to.
    pub fn shared_lines(&self) -> u32 {
        match self {
            InterruptControllerSpec::GicV3 { shared_lines, .. } => *shared_lines,
            InterruptControllerSpec::Nvic { lines } => *lines,
            InterruptControllerSpec::Plic { sources, .. } => *sources,
        }
    }
}
