/*++

Licensed under the Apache-2.0 license.

File Name:

    machine.rs

Abstract:

    File contains the composed machine. It is only ever built by the
    composer and is immutable afterwards.

--*/

use crate::boot::{BootDescriptor, BootLoader, RawImageLoader};
use crate::BoardError;
use emulator_bus::{AddressSpace, Bus};
use emulator_cpu::CpuCore;
use emulator_intc::InterruptController;
use emulator_periph::RegisterDevice;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Machine {
    pub(crate) name: String,
    pub(crate) space: Arc<AddressSpace>,
    pub(crate) cores: Vec<Arc<dyn CpuCore>>,
    pub(crate) intc: Box<dyn InterruptController>,
    pub(crate) devices: Vec<Arc<dyn RegisterDevice>>,
    /// Region name to the name of the device decoding it.
    pub(crate) bindings: HashMap<String, String>,
    pub(crate) boot: BootDescriptor,
}

impl Machine {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The system bus. Every core thread gets a clone.
    pub fn bus(&self) -> Arc<AddressSpace> {
        self.space.clone()
    }

    pub fn cores(&self) -> &[Arc<dyn CpuCore>] {
        &self.cores
    }

    pub fn core(&self, index: usize) -> Option<&Arc<dyn CpuCore>> {
        self.cores.get(index)
    }

    pub fn controller(&self) -> &dyn InterruptController {
        self.intc.as_ref()
    }

    pub fn devices(&self) -> &[Arc<dyn RegisterDevice>] {
        &self.devices
    }

    pub fn device(&self, name: &str) -> Option<&Arc<dyn RegisterDevice>> {
        self.devices.iter().find(|d| d.name() == name)
    }

    pub fn boot(&self) -> &BootDescriptor {
        &self.boot
    }

    /// Guest protocol violations recorded by every device so far.
    pub fn violations(&self) -> u64 {
        self.devices.iter().map(|d| d.violations()).sum()
    }

    /// Let devices update their interrupt outputs, then propagate controller
    /// inputs to the cores.
    pub fn poll(&self) {
        self.space.poll();
        self.intc.route();
    }

    /// Load the configured kernel, if any, and return the entry address.
    pub fn load_kernel(&self) -> Result<Option<u64>, BoardError> {
        let Some(path) = &self.boot.kernel else {
            return Ok(None);
        };
        let loader = RawImageLoader::from_file(path)?;
        self.load_with(&loader).map(Some)
    }

    pub fn load_with(&self, loader: &dyn BootLoader) -> Result<u64, BoardError> {
        Ok(loader.load(&self.space, &self.boot)?)
    }

    /// One line per region, in address order.
    pub fn describe_map(&self) -> String {
        let mut out = String::new();
        for entry in self.space.entries() {
            let owner = match self.bindings.get(&entry.name) {
                Some(device) if *device != entry.name => format!(" ({device})"),
                _ => String::new(),
            };
            out.push_str(&format!(
                "{:#012x}-{:#012x} {:<5} {}{owner}\n",
                entry.base,
                entry.base + (entry.size - 1),
                entry.kind.to_string(),
                entry.name,
            ));
        }
        out
    }
}
