// Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Peripheral models a board may instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceKind {
    /// Scratch/sum/trigger test block with one interrupt output.
    TestDevice,
    /// Bank of four hardware test-and-set locks.
    Spinlock,
    /// TrustZone address space controller register stub.
    Tzc,
    /// One-time-programmable fuse block reporting the lifecycle state.
    Otp,
    /// System controller reporting the boot mode.
    SysCtrl,
    /// 16550-compatible UART with a 4-byte register stride.
    Uart16550,
    /// Register window with no behavior. `model` names the collaborator it
    /// stands in for.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub name: String,
    pub kind: DeviceKind,
    /// Name of the MMIO region the device decodes.
    pub region: String,
    /// Interrupt controller input for each interrupt output, in output order.
    #[serde(default)]
    pub irqs: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl DeviceSpec {
    pub fn new(name: impl Into<String>, kind: DeviceKind, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            region: region.into(),
            irqs: Vec::new(),
            model: None,
        }
    }

    pub fn with_irqs(mut self, irqs: impl IntoIterator<Item = u32>) -> Self {
        self.irqs = irqs.into_iter().collect();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Placeholder standing in for an external collaborator model.
    pub fn placeholder(
        name: impl Into<String>,
        model: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::new(name, DeviceKind::Placeholder, region).with_model(model)
    }
}
