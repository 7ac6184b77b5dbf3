// Licensed under the Apache-2.0 license

//! Data-only board descriptors.
//!
//! A board is a memory map, a CPU cluster, one interrupt controller, a list
//! of peripherals bound to memory regions and controller lines, and a boot
//! recipe. Descriptors are plain serde structs so boards can be kept in TOML
//! files as well as built in code.

mod boot;
mod device;
mod memory_map;
mod platform;

pub use boot::{BootMode, BootSpec};
pub use device::{DeviceKind, DeviceSpec};
pub use memory_map::{symbols, MemoryMapEntry, RegionKind};
pub use platform::{CpuArch, CpuSpec, InterruptControllerSpec};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read board config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid board config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize board config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cpu: CpuSpec,
    pub interrupt_controller: InterruptControllerSpec,
    pub boot: BootSpec,
    pub memory_map: Vec<MemoryMapEntry>,
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,
}

impl BoardDescriptor {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn entry(&self, name: &str) -> Option<&MemoryMapEntry> {
        self.memory_map.iter().find(|e| e.name == name)
    }

    pub fn device(&self, name: &str) -> Option<&DeviceSpec> {
        self.devices.iter().find(|d| d.name == name)
    }
}
