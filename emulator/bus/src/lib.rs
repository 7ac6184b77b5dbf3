/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulator bus library.

--*/

mod address_space;
mod bus;
mod irq;
mod mem;

pub use address_space::{AddressSpace, AddressSpaceBuilder, Backing, MapError};
pub use bus::{Bus, BusError};
pub use irq::{Irq, IrqLevels, IrqSink};
pub use mem::{Ram, Rom};
