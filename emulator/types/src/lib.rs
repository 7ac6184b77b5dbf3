/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Primitive types shared by the bus, peripherals and boards.

--*/

pub mod consts;

use strum_macros::{Display, EnumIter};

/// Physical address on the system bus.
pub type Addr = u64;

/// Data carried by a single bus access.
pub type Data = u32;

/// Width of a bus access.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, EnumIter)]
pub enum AccessSize {
    #[strum(serialize = "byte")]
    Byte = 1,
    #[strum(serialize = "half-word")]
    HalfWord = 2,
    #[strum(serialize = "word")]
    Word = 4,
}

impl AccessSize {
    pub const fn bytes(self) -> u64 {
        self as u64
    }

    /// Mask selecting the bits of a `Data` value covered by this access.
    pub const fn mask(self) -> Data {
        match self {
            AccessSize::Byte => 0xff,
            AccessSize::HalfWord => 0xffff,
            AccessSize::Word => 0xffff_ffff,
        }
    }

    pub const fn is_aligned(self, addr: Addr) -> bool {
        addr % self.bytes() == 0
    }
}

impl TryFrom<usize> for AccessSize {
    type Error = usize;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AccessSize::Byte),
            2 => Ok(AccessSize::HalfWord),
            4 => Ok(AccessSize::Word),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_size_mask() {
        assert_eq!(AccessSize::Byte.mask(), 0xff);
        assert_eq!(AccessSize::HalfWord.mask(), 0xffff);
        assert_eq!(AccessSize::Word.mask(), u32::MAX);
    }

    #[test]
    fn test_access_size_alignment() {
        assert!(AccessSize::Word.is_aligned(0x1000));
        assert!(!AccessSize::Word.is_aligned(0x1002));
        assert!(AccessSize::HalfWord.is_aligned(0x1002));
        assert!(AccessSize::Byte.is_aligned(0x1003));
    }

    #[test]
    fn test_access_size_from_usize() {
        assert_eq!(AccessSize::try_from(2), Ok(AccessSize::HalfWord));
        assert_eq!(AccessSize::try_from(8), Err(8));
    }
}
