/*++

Licensed under the Apache-2.0 license.

File Name:

    address_space.rs

Abstract:

    File contains the address space registry. Regions are registered into a
    builder, which rejects any overlap, and then frozen into an immutable
    `AddressSpace` that decodes bus accesses to the backing of each region.

--*/

use crate::{Bus, BusError, Ram, Rom};
use emulator_types::{AccessSize, Addr, Data};
use soc_config::{MemoryMapEntry, RegionKind};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("region `{0}` has zero size")]
    Empty(String),
    #[error("region `{name}` at {base:#x} with size {size:#x} runs past the end of the address space")]
    AddressOverflow { name: String, base: u64, size: u64 },
    #[error("region `{name}` [{base:#x}, {end:#x}) overlaps `{other}` [{other_base:#x}, {other_end:#x})")]
    Overlap {
        name: String,
        base: u64,
        end: u64,
        other: String,
        other_base: u64,
        other_end: u64,
    },
    #[error("region name `{0}` is registered twice")]
    DuplicateName(String),
    #[error("no region named `{0}`")]
    UnknownRegion(String),
    #[error("region `{0}` already has a device attached")]
    AlreadyAttached(String),
    #[error("region `{name}` is {kind}, devices attach only to mmio regions")]
    NotMmio { name: String, kind: RegionKind },
    #[error("mmio region `{0}` has no device attached")]
    Unattached(String),
    #[error("no ram or rom region holds {len:#x} bytes at {addr:#x}")]
    NotLoadable { addr: u64, len: u64 },
}

/// What answers accesses to a region.
#[derive(Clone)]
pub enum Backing {
    Ram(Arc<Ram>),
    Rom(Arc<Rom>),
    Mmio(Arc<dyn Bus>),
}

impl Backing {
    fn bus(&self) -> &dyn Bus {
        match self {
            Backing::Ram(ram) => ram.as_ref(),
            Backing::Rom(rom) => rom.as_ref(),
            Backing::Mmio(dev) => dev.as_ref(),
        }
    }

    fn load(&self, offset: u64, data: &[u8]) -> bool {
        match self {
            Backing::Ram(ram) => ram.load(offset, data),
            Backing::Rom(rom) => rom.load(offset, data),
            Backing::Mmio(_) => false,
        }
    }
}

struct Region {
    entry: MemoryMapEntry,
    backing: Option<Backing>,
}

/// Collects regions for a board. Nothing is decodable until [`build`] runs.
///
/// [`build`]: AddressSpaceBuilder::build
#[derive(Default)]
pub struct AddressSpaceBuilder {
    // Sorted by base; pairwise disjoint.
    regions: Vec<Region>,
    names: HashSet<String>,
}

impl AddressSpaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region. RAM and ROM regions get their storage here; MMIO
    /// regions wait for [`attach`](Self::attach).
    pub fn register(&mut self, entry: MemoryMapEntry) -> Result<(), MapError> {
        if entry.size == 0 {
            return Err(MapError::Empty(entry.name));
        }
        let Some(end) = entry.end() else {
            return Err(MapError::AddressOverflow {
                name: entry.name,
                base: entry.base,
                size: entry.size,
            });
        };
        if self.names.contains(&entry.name) {
            return Err(MapError::DuplicateName(entry.name));
        }

        let idx = self.regions.partition_point(|r| r.entry.base < entry.base);
        let neighbors = [idx.checked_sub(1), Some(idx)];
        for other in neighbors
            .into_iter()
            .flatten()
            .filter_map(|i| self.regions.get(i))
        {
            if other.entry.overlaps(&entry) {
                return Err(MapError::Overlap {
                    name: entry.name,
                    base: entry.base,
                    end,
                    other: other.entry.name.clone(),
                    other_base: other.entry.base,
                    other_end: other.entry.base + other.entry.size,
                });
            }
        }

        let backing = match entry.kind {
            RegionKind::Ram => Some(Backing::Ram(Arc::new(Ram::new(entry.size)))),
            RegionKind::Rom => Some(Backing::Rom(Arc::new(Rom::new(entry.size)))),
            RegionKind::Mmio => None,
        };
        log::debug!(
            "map {} [{:#x}, {:#x}) {}",
            entry.name,
            entry.base,
            end,
            entry.kind
        );
        self.names.insert(entry.name.clone());
        self.regions.insert(idx, Region { entry, backing });
        Ok(())
    }

    /// Register every entry of a table, stopping at the first error.
    pub fn register_all<'a>(
        &mut self,
        entries: impl IntoIterator<Item = &'a MemoryMapEntry>,
    ) -> Result<(), MapError> {
        entries
            .into_iter()
            .try_for_each(|e| self.register(e.clone()))
    }

    /// Route accesses to the MMIO region `name` to `device`, at offsets
    /// relative to the region base.
    pub fn attach(&mut self, name: &str, device: Arc<dyn Bus>) -> Result<(), MapError> {
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.entry.name == name)
            .ok_or_else(|| MapError::UnknownRegion(name.to_string()))?;
        if region.entry.kind != RegionKind::Mmio {
            return Err(MapError::NotMmio {
                name: name.to_string(),
                kind: region.entry.kind,
            });
        }
        if region.backing.is_some() {
            return Err(MapError::AlreadyAttached(name.to_string()));
        }
        region.backing = Some(Backing::Mmio(device));
        Ok(())
    }

    pub fn entry(&self, name: &str) -> Option<&MemoryMapEntry> {
        self.regions
            .iter()
            .map(|r| &r.entry)
            .find(|e| e.name == name)
    }

    /// MMIO regions nothing has attached to yet.
    pub fn unattached(&self) -> impl Iterator<Item = &MemoryMapEntry> {
        self.regions
            .iter()
            .filter(|r| r.backing.is_none())
            .map(|r| &r.entry)
    }

    pub fn build(self) -> Result<AddressSpace, MapError> {
        let mut regions = Vec::with_capacity(self.regions.len());
        for region in self.regions {
            let Some(backing) = region.backing else {
                return Err(MapError::Unattached(region.entry.name));
            };
            regions.push((region.entry, backing));
        }
        Ok(AddressSpace { regions })
    }
}

/// Immutable, decodable view of a board's physical address space.
pub struct AddressSpace {
    regions: Vec<(MemoryMapEntry, Backing)>,
}

impl AddressSpace {
    /// Region containing `addr`.
    pub fn find(&self, addr: Addr) -> Option<&MemoryMapEntry> {
        self.decode(addr).map(|(entry, _)| entry)
    }

    pub fn entries(&self) -> impl Iterator<Item = &MemoryMapEntry> {
        self.regions.iter().map(|(entry, _)| entry)
    }

    pub fn entry(&self, name: &str) -> Option<&MemoryMapEntry> {
        self.entries().find(|e| e.name == name)
    }

    pub fn ram(&self, name: &str) -> Option<Arc<Ram>> {
        self.regions.iter().find_map(|(entry, backing)| match backing {
            Backing::Ram(ram) if entry.name == name => Some(ram.clone()),
            _ => None,
        })
    }

    pub fn rom(&self, name: &str) -> Option<Arc<Rom>> {
        self.regions.iter().find_map(|(entry, backing)| match backing {
            Backing::Rom(rom) if entry.name == name => Some(rom.clone()),
            _ => None,
        })
    }

    /// Host-side copy into RAM or ROM, bypassing the ROM write protection.
    /// The data must fit inside a single region.
    pub fn load(&self, addr: Addr, data: &[u8]) -> Result<(), MapError> {
        let err = || MapError::NotLoadable {
            addr,
            len: data.len() as u64,
        };
        let (entry, backing) = self.decode(addr).ok_or_else(err)?;
        if backing.load(addr - entry.base, data) {
            Ok(())
        } else {
            Err(err())
        }
    }

    fn decode(&self, addr: Addr) -> Option<(&MemoryMapEntry, &Backing)> {
        let idx = self.regions.partition_point(|(e, _)| e.base <= addr);
        let (entry, backing) = self.regions.get(idx.checked_sub(1)?)?;
        entry.contains(addr).then_some((entry, backing))
    }

    fn decode_access(&self, size: AccessSize, addr: Addr) -> Option<(&Backing, u64)> {
        let (entry, backing) = self.decode(addr)?;
        let offset = addr - entry.base;
        // The whole access must stay inside the region.
        (entry.size - offset >= size.bytes()).then_some((backing, offset))
    }
}

impl Bus for AddressSpace {
    fn read(&self, size: AccessSize, addr: Addr) -> Result<Data, BusError> {
        let (backing, offset) = self
            .decode_access(size, addr)
            .ok_or(BusError::LoadAccessFault)?;
        backing.bus().read(size, offset)
    }

    fn write(&self, size: AccessSize, addr: Addr, val: Data) -> Result<(), BusError> {
        let (backing, offset) = self
            .decode_access(size, addr)
            .ok_or(BusError::StoreAccessFault)?;
        backing.bus().write(size, offset, val)
    }

    fn poll(&self) {
        for (_, backing) in &self.regions {
            if let Backing::Mmio(dev) = backing {
                dev.poll();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scratch(AtomicU32);

    impl Bus for Scratch {
        fn read(&self, _size: AccessSize, addr: Addr) -> Result<Data, BusError> {
            Ok(self.0.load(Ordering::Relaxed) + addr as u32)
        }

        fn write(&self, _size: AccessSize, _addr: Addr, val: Data) -> Result<(), BusError> {
            self.0.store(val, Ordering::Relaxed);
            Ok(())
        }
    }

    fn small_map() -> AddressSpaceBuilder {
        let mut builder = AddressSpaceBuilder::new();
        builder
            .register(MemoryMapEntry::rom("flash", 0x0, 0x1000))
            .unwrap();
        builder
            .register(MemoryMapEntry::ram("sram", 0x1000_0000, 0x1000))
            .unwrap();
        builder
            .register(MemoryMapEntry::mmio("dev", 0x4000_0000, 0x1000))
            .unwrap();
        builder
    }

    #[test]
    fn test_decode() {
        let mut builder = small_map();
        builder
            .attach("dev", Arc::new(Scratch(AtomicU32::new(0x100))))
            .unwrap();
        let space = builder.build().unwrap();

        space.write(AccessSize::Word, 0x1000_0010, 0xcafe).unwrap();
        assert_eq!(space.read(AccessSize::Word, 0x1000_0010).unwrap(), 0xcafe);
        assert_eq!(space.ram("sram").unwrap().read(AccessSize::Word, 0x10), Ok(0xcafe));

        // Devices see region-relative offsets.
        assert_eq!(space.read(AccessSize::Word, 0x4000_0008).unwrap(), 0x108);
        space.write(AccessSize::Word, 0x4000_0000, 0x200).unwrap();
        assert_eq!(space.read(AccessSize::Word, 0x4000_0004).unwrap(), 0x204);

        assert_eq!(space.find(0x4000_0fff).unwrap().name, "dev");
        assert!(space.find(0x4000_1000).is_none());
    }

    #[test]
    fn test_unmapped_access_faults() {
        let mut builder = small_map();
        builder
            .attach("dev", Arc::new(Scratch(AtomicU32::new(0))))
            .unwrap();
        let space = builder.build().unwrap();
        assert_eq!(
            space.read(AccessSize::Word, 0x2000_0000),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            space.write(AccessSize::Byte, 0x5000_0000, 1),
            Err(BusError::StoreAccessFault)
        );
        // Straddling the end of a region.
        assert_eq!(
            space.read(AccessSize::Word, 0x1000_0ffe),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            space.write(AccessSize::Word, 0x0, 1),
            Err(BusError::StoreAccessFault)
        );
    }

    #[test]
    fn test_register_rejects_overlap() {
        let mut builder = small_map();
        let err = builder
            .register(MemoryMapEntry::mmio("late", 0x1000_0800, 0x1000))
            .unwrap_err();
        assert!(matches!(err, MapError::Overlap { ref other, .. } if other == "sram"));
        // Overlap is fatal regardless of the region kind.
        let err = builder
            .register(MemoryMapEntry::ram("under", 0x800, 0x10))
            .unwrap_err();
        assert!(matches!(err, MapError::Overlap { ref other, .. } if other == "flash"));
        // Adjacent regions are fine.
        builder
            .register(MemoryMapEntry::ram("after", 0x1000_1000, 0x1000))
            .unwrap();
    }

    #[test]
    fn test_register_rejects_bad_entries() {
        let mut builder = small_map();
        assert_eq!(
            builder.register(MemoryMapEntry::ram("zero", 0x9000_0000, 0)),
            Err(MapError::Empty("zero".into()))
        );
        assert!(matches!(
            builder.register(MemoryMapEntry::ram("wrap", u64::MAX - 0xf, 0x20)),
            Err(MapError::AddressOverflow { .. })
        ));
        assert_eq!(
            builder.register(MemoryMapEntry::ram("sram", 0x9000_0000, 0x10)),
            Err(MapError::DuplicateName("sram".into()))
        );
    }

    #[test]
    fn test_attach_errors() {
        let mut builder = small_map();
        let dev: Arc<dyn Bus> = Arc::new(Scratch(AtomicU32::new(0)));
        assert!(matches!(
            builder.attach("sram", dev.clone()),
            Err(MapError::NotMmio { .. })
        ));
        assert_eq!(
            builder.attach("nope", dev.clone()),
            Err(MapError::UnknownRegion("nope".into()))
        );
        assert_eq!(
            builder.unattached().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["dev"]
        );
        builder.attach("dev", dev.clone()).unwrap();
        assert_eq!(
            builder.attach("dev", dev),
            Err(MapError::AlreadyAttached("dev".into()))
        );
    }

    #[test]
    fn test_build_requires_mmio_backing() {
        assert!(matches!(
            small_map().build(),
            Err(MapError::Unattached(name)) if name == "dev"
        ));
    }

    #[test]
    fn test_load() {
        let mut builder = small_map();
        builder
            .attach("dev", Arc::new(Scratch(AtomicU32::new(0))))
            .unwrap();
        let space = builder.build().unwrap();
        space.load(0x10, &[1, 2, 3, 4]).unwrap();
        assert_eq!(space.read(AccessSize::Word, 0x10).unwrap(), 0x0403_0201);
        assert!(matches!(
            space.load(0x4000_0000, &[0]),
            Err(MapError::NotLoadable { .. })
        ));
        assert!(matches!(
            space.load(0xff0, &[0; 0x20]),
            Err(MapError::NotLoadable { .. })
        ));
    }

    /// Random tables are accepted exactly when a pairwise check finds no overlap.
    #[test]
    fn test_random_tables_match_pairwise_oracle() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let count = rng.gen_range(1..8);
            let table: Vec<MemoryMapEntry> = (0..count)
                .map(|i| {
                    let base = rng.gen_range(0..64u64) * 0x100;
                    let size = rng.gen_range(1..16u64) * 0x100;
                    MemoryMapEntry::ram(format!("r{i}"), base, size)
                })
                .collect();

            let disjoint = table.iter().enumerate().all(|(i, a)| {
                table[i + 1..].iter().all(|b| {
                    let a_end = a.base + a.size;
                    let b_end = b.base + b.size;
                    a_end <= b.base || b_end <= a.base
                })
            });

            let mut builder = AddressSpaceBuilder::new();
            let accepted = builder.register_all(&table).is_ok();
            assert_eq!(accepted, disjoint, "table: {table:?}");

            if accepted {
                let space = builder.build().unwrap();
                for entry in &table {
                    assert_eq!(space.find(entry.base).unwrap().name, entry.name);
                    assert_eq!(
                        space.find(entry.base + entry.size - 1).unwrap().name,
                        entry.name
                    );
                }
            }
        }
    }
}
