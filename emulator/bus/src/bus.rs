/*++

Licensed under the Apache-2.0 license.

File Name:

    bus.rs

Abstract:

    File contains definition of the Bus trait.

--*/

use emulator_types::{AccessSize, Addr, Data};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusError {
    /// Instruction access exception
    #[error("instruction access fault")]
    InstrAccessFault,

    /// Load address misaligned exception
    #[error("load address misaligned")]
    LoadAddrMisaligned,

    /// Load access fault exception
    #[error("load access fault")]
    LoadAccessFault,

    /// Store address misaligned exception
    #[error("store address misaligned")]
    StoreAddrMisaligned,

    /// Store access fault exception
    #[error("store access fault")]
    StoreAccessFault,
}

/// Represents an abstract memory bus. Used to read and write from RAM and
/// peripheral addresses.
///
/// Every core thread holds the same bus, so accesses take `&self` and
/// implementations keep their own interior synchronization.
pub trait Bus: Send + Sync {
    /// Read data of specified size from given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the read
    /// * `addr` - Address to read from
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::LoadAccessFault` or `BusError::LoadAddrMisaligned`
    fn read(&self, size: AccessSize, addr: Addr) -> Result<Data, BusError>;

    /// Write data of specified size to given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the write
    /// * `addr` - Address to write
    /// * `val` - Data to write
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::StoreAccessFault` or `BusError::StoreAddrMisaligned`
    fn write(&self, size: AccessSize, addr: Addr, val: Data) -> Result<(), BusError>;

    /// This method is used to notify peripherals of the passage of time. The
    /// owner of this bus MAY call this function periodically.
    fn poll(&self) {
        // By default, do nothing
    }
}
