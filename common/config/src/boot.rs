// Licensed under the Apache-2.0 license

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Boot source strapping reported by the system controller.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(u32)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BootMode {
    Emmc = 0,
    Recovery = 1,
    Sd = 2,
    #[default]
    Memory = 3,
}

/// How a board hands control to guest software.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootSpec {
    /// Region the kernel image is loaded into.
    pub loader_region: String,
    /// Region whose base secondary cores spin in, if different from the loader region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smp_loader_region: Option<String>,
    /// Main memory region; bounds the RAM size handed to the guest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_region: Option<String>,
    pub default_ram_size: u64,
    /// Largest image the loader accepts; defaults to the loader region size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_image_size: Option<u64>,
    /// Fixed reset vector, when the core does not start at the loader base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_vector: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<u32>,
    #[serde(default)]
    pub boot_mode: BootMode,
}

impl BootSpec {
    pub fn new(loader_region: impl Into<String>, default_ram_size: u64) -> Self {
        Self {
            loader_region: loader_region.into(),
            smp_loader_region: None,
            ram_region: None,
            default_ram_size,
            max_image_size: None,
            reset_vector: None,
            board_id: None,
            boot_mode: BootMode::default(),
        }
    }
}
