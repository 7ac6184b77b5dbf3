/*++

Licensed under the Apache-2.0 license.

File Name:

    boot.rs

Abstract:

    File contains the boot hand-off: the descriptor a composed board passes
    to its image loader, and the raw image loader.

--*/

use emulator_bus::{AddressSpace, MapError};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootError {
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image of {len:#x} bytes exceeds the {limit:#x} byte loader window")]
    TooLarge { len: u64, limit: u64 },
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Everything a loader needs to start guest software on a composed board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootDescriptor {
    /// RAM handed to the guest.
    pub ram_size: u64,
    /// Base of the region the image is loaded into.
    pub loader_start: u64,
    /// Where secondary cores wait to be released.
    pub smp_loader_address: u64,
    /// Address core 0 starts at when nothing overrides it.
    pub reset_vector: u64,
    pub entry_override: Option<u64>,
    pub board_id: Option<u32>,
    /// Largest image the loader window takes.
    pub max_image_size: u64,
    pub kernel: Option<PathBuf>,
}

impl BootDescriptor {
    pub fn entry(&self) -> u64 {
        self.entry_override.unwrap_or(self.reset_vector)
    }
}

/// Places guest software into memory.
pub trait BootLoader {
    /// Load into `space` and return the entry address of core 0.
    fn load(&self, space: &AddressSpace, boot: &BootDescriptor) -> Result<u64, BootError>;
}

/// Flat binary copied to the loader start. Works for ROM regions too.
pub struct RawImageLoader {
    image: Vec<u8>,
}

impl RawImageLoader {
    pub fn new(image: Vec<u8>) -> Self {
        Self { image }
    }

    pub fn from_file(path: &Path) -> Result<Self, BootError> {
        let image = std::fs::read(path).map_err(|source| BootError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(image))
    }

    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

impl BootLoader for RawImageLoader {
    fn load(&self, space: &AddressSpace, boot: &BootDescriptor) -> Result<u64, BootError> {
        let len = self.image.len() as u64;
        if len > boot.max_image_size {
            return Err(BootError::TooLarge {
                len,
                limit: boot.max_image_size,
            });
        }
        space.load(boot.loader_start, &self.image)?;
        log::info!(
            "loaded {len:#x} byte image at {:#x}, entry {:#x}",
            boot.loader_start,
            boot.entry()
        );
        Ok(boot.entry())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_bus::{AddressSpaceBuilder, Bus};
    use emulator_types::AccessSize;
    use soc_config::MemoryMapEntry;

    fn descriptor(loader_start: u64, max_image_size: u64) -> BootDescriptor {
        BootDescriptor {
            ram_size: 0x1000,
            loader_start,
            smp_loader_address: loader_start,
            reset_vector: loader_start,
            entry_override: None,
            board_id: None,
            max_image_size,
            kernel: None,
        }
    }

    fn space() -> AddressSpace {
        let mut builder = AddressSpaceBuilder::new();
        builder
            .register(MemoryMapEntry::rom("flash", 0x2000_0000, 0x1000))
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_raw_image_into_rom() {
        let space = space();
        let loader = RawImageLoader::new(vec![0x13, 0x00, 0x00, 0x00]);
        let mut boot = descriptor(0x2000_0000, 0x1000);
        assert_eq!(loader.load(&space, &boot).unwrap(), 0x2000_0000);
        assert_eq!(space.read(AccessSize::Word, 0x2000_0000).unwrap(), 0x13);

        boot.entry_override = Some(0x2000_0100);
        assert_eq!(loader.load(&space, &boot).unwrap(), 0x2000_0100);
    }

    #[test]
    fn test_image_limits() {
        let space = space();
        let loader = RawImageLoader::new(vec![0; 0x20]);
        assert!(matches!(
            loader.load(&space, &descriptor(0x2000_0000, 0x10)),
            Err(BootError::TooLarge { len: 0x20, limit: 0x10 })
        ));
        assert!(matches!(
            loader.load(&space, &descriptor(0x3000_0000, 0x1000)),
            Err(BootError::Map(MapError::NotLoadable { .. }))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        assert!(matches!(
            RawImageLoader::from_file(&path),
            Err(BootError::Io { .. })
        ));
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        assert_eq!(RawImageLoader::from_file(&path).unwrap().len(), 3);
    }
}
