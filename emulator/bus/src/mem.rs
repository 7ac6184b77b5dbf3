/*++

Licensed under the Apache-2.0 license.

File Name:

    mem.rs

Abstract:

    File contains RAM and ROM backings. Storage is paged and materializes on
    first write, so multi-gigabyte DDR windows cost nothing until touched.

--*/

use crate::{Bus, BusError};
use emulator_types::{AccessSize, Addr, Data};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

const PAGE_SHIFT: u32 = 12;
const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
const PAGE_MASK: u64 = PAGE_SIZE as u64 - 1;

type Page = Box<[u8; PAGE_SIZE]>;

struct SparseMemory {
    size: u64,
    pages: Mutex<HashMap<u64, Page>>,
}

impl SparseMemory {
    fn new(size: u64) -> Self {
        Self {
            size,
            pages: Mutex::new(HashMap::new()),
        }
    }

    fn in_bounds(&self, offset: u64, len: u64) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.size)
    }

    fn read_bytes(&self, offset: u64, buf: &mut [u8]) {
        let pages = self.pages.lock().unwrap_or_else(PoisonError::into_inner);
        for (i, byte) in buf.iter_mut().enumerate() {
            let addr = offset + i as u64;
            *byte = pages
                .get(&(addr >> PAGE_SHIFT))
                .map_or(0, |page| page[(addr & PAGE_MASK) as usize]);
        }
    }

    fn write_bytes(&self, offset: u64, data: &[u8]) {
        let mut pages = self.pages.lock().unwrap_or_else(PoisonError::into_inner);
        for (i, byte) in data.iter().enumerate() {
            let addr = offset + i as u64;
            let page = pages
                .entry(addr >> PAGE_SHIFT)
                .or_insert_with(|| Box::new([0; PAGE_SIZE]));
            page[(addr & PAGE_MASK) as usize] = *byte;
        }
    }

    fn read(&self, size: AccessSize, offset: Addr) -> Result<Data, BusError> {
        if !size.is_aligned(offset) {
            return Err(BusError::LoadAddrMisaligned);
        }
        if !self.in_bounds(offset, size.bytes()) {
            return Err(BusError::LoadAccessFault);
        }
        let mut buf = [0u8; 4];
        self.read_bytes(offset, &mut buf[..size.bytes() as usize]);
        Ok(u32::from_le_bytes(buf))
    }

    fn write(&self, size: AccessSize, offset: Addr, val: Data) -> Result<(), BusError> {
        if !size.is_aligned(offset) {
            return Err(BusError::StoreAddrMisaligned);
        }
        if !self.in_bounds(offset, size.bytes()) {
            return Err(BusError::StoreAccessFault);
        }
        self.write_bytes(offset, &val.to_le_bytes()[..size.bytes() as usize]);
        Ok(())
    }

    fn resident_pages(&self) -> usize {
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Read-write memory.
pub struct Ram {
    mem: SparseMemory,
}

impl Ram {
    pub fn new(size: u64) -> Self {
        Self {
            mem: SparseMemory::new(size),
        }
    }

    pub fn size(&self) -> u64 {
        self.mem.size
    }

    /// Copy `data` in at `offset`. Returns `false` if it does not fit.
    pub fn load(&self, offset: u64, data: &[u8]) -> bool {
        if !self.mem.in_bounds(offset, data.len() as u64) {
            return false;
        }
        self.mem.write_bytes(offset, data);
        true
    }

    pub fn read_bytes(&self, offset: u64, buf: &mut [u8]) -> bool {
        if !self.mem.in_bounds(offset, buf.len() as u64) {
            return false;
        }
        self.mem.read_bytes(offset, buf);
        true
    }

    pub fn resident_pages(&self) -> usize {
        self.mem.resident_pages()
    }
}

impl Bus for Ram {
    fn read(&self, size: AccessSize, addr: Addr) -> Result<Data, BusError> {
        self.mem.read(size, addr)
    }

    fn write(&self, size: AccessSize, addr: Addr, val: Data) -> Result<(), BusError> {
        self.mem.write(size, addr, val)
    }
}

/// Memory the guest can only read. The host fills it with [`Rom::load`].
pub struct Rom {
    mem: SparseMemory,
}

impl Rom {
    pub fn new(size: u64) -> Self {
        Self {
            mem: SparseMemory::new(size),
        }
    }

    pub fn size(&self) -> u64 {
        self.mem.size
    }

    pub fn load(&self, offset: u64, data: &[u8]) -> bool {
        if !self.mem.in_bounds(offset, data.len() as u64) {
            return false;
        }
        self.mem.write_bytes(offset, data);
        true
    }
}

impl Bus for Rom {
    fn read(&self, size: AccessSize, addr: Addr) -> Result<Data, BusError> {
        self.mem.read(size, addr)
    }

    fn write(&self, _size: AccessSize, _addr: Addr, _val: Data) -> Result<(), BusError> {
        Err(BusError::StoreAccessFault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_types::consts::GIB;

    #[test]
    fn test_ram_read_write() {
        let ram = Ram::new(0x2000);
        assert_eq!(ram.read(AccessSize::Word, 0x100).unwrap(), 0);
        ram.write(AccessSize::Word, 0x100, 0x1234_5678).unwrap();
        assert_eq!(ram.read(AccessSize::Word, 0x100).unwrap(), 0x1234_5678);
        assert_eq!(ram.read(AccessSize::Byte, 0x101).unwrap(), 0x56);
        assert_eq!(ram.read(AccessSize::HalfWord, 0x102).unwrap(), 0x1234);
        ram.write(AccessSize::Byte, 0x103, 0xab).unwrap();
        assert_eq!(ram.read(AccessSize::Word, 0x100).unwrap(), 0xab34_5678);
    }

    #[test]
    fn test_ram_faults() {
        let ram = Ram::new(0x1000);
        assert_eq!(
            ram.read(AccessSize::Word, 0x1000),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            ram.write(AccessSize::Word, 0xffe, 0),
            Err(BusError::StoreAddrMisaligned)
        );
        assert_eq!(
            ram.read(AccessSize::HalfWord, 0x1),
            Err(BusError::LoadAddrMisaligned)
        );
    }

    #[test]
    fn test_ram_is_sparse() {
        let ram = Ram::new(6 * GIB);
        assert_eq!(ram.resident_pages(), 0);
        ram.write(AccessSize::Word, 5 * GIB, 0xdead_beef).unwrap();
        assert_eq!(ram.resident_pages(), 1);
        assert_eq!(ram.read(AccessSize::Word, 5 * GIB).unwrap(), 0xdead_beef);
    }

    #[test]
    fn test_load_across_pages() {
        let ram = Ram::new(0x3000);
        let image: Vec<u8> = (0..=255).cycle().take(0x1800).collect();
        assert!(ram.load(0xc00, &image));
        let mut back = vec![0; image.len()];
        assert!(ram.read_bytes(0xc00, &mut back));
        assert_eq!(back, image);
        assert!(!ram.load(0x2c00, &image));
    }

    #[test]
    fn test_rom_rejects_guest_writes() {
        let rom = Rom::new(0x1000);
        assert!(rom.load(0, &[0x13, 0, 0, 0]));
        assert_eq!(rom.read(AccessSize::Word, 0).unwrap(), 0x13);
        assert_eq!(
            rom.write(AccessSize::Word, 0, 0),
            Err(BusError::StoreAccessFault)
        );
        assert_eq!(rom.read(AccessSize::Word, 0).unwrap(), 0x13);
    }
}
