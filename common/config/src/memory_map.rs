// Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::Display;

/// What backs a region of the physical address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RegionKind {
    Ram,
    Rom,
    Mmio,
}

/// One named window `[base, base + size)` of a board's memory map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMapEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub kind: RegionKind,
}

impl MemoryMapEntry {
    pub fn new(name: impl Into<String>, base: u64, size: u64, kind: RegionKind) -> Self {
        Self {
            name: name.into(),
            base,
            size,
            kind,
        }
    }

    pub fn ram(name: impl Into<String>, base: u64, size: u64) -> Self {
        Self::new(name, base, size, RegionKind::Ram)
    }

    pub fn rom(name: impl Into<String>, base: u64, size: u64) -> Self {
        Self::new(name, base, size, RegionKind::Rom)
    }

    pub fn mmio(name: impl Into<String>, base: u64, size: u64) -> Self {
        Self::new(name, base, size, RegionKind::Mmio)
    }

    /// Exclusive end address, or `None` if the region wraps the address space.
    pub fn end(&self) -> Option<u64> {
        self.base.checked_add(self.size)
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    pub fn overlaps(&self, other: &MemoryMapEntry) -> bool {
        // Half-open intervals; computed on differences so huge regions cannot overflow.
        let (lo, hi) = if self.base <= other.base {
            (self, other)
        } else {
            (other, self)
        };
        hi.base - lo.base < lo.size && hi.size > 0 && lo.size > 0
    }
}

/// Renders a memory map as `NAME_OFFSET`/`NAME_SIZE` symbols for linker
/// scripts and firmware build templates.
pub fn symbols(entries: &[MemoryMapEntry]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for entry in entries {
        let stem = entry.name.to_uppercase().replace(['-', '.'], "_");
        map.insert(format!("{stem}_OFFSET"), format!("0x{:x}", entry.base));
        map.insert(format!("{stem}_SIZE"), format!("0x{:x}", entry.size));
    }
    map
}
