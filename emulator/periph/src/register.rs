/*++

Licensed under the Apache-2.0 license.

File Name:

    register.rs

Abstract:

    File contains the register-mapped device model. A device is a table of
    32-bit registers, each with an independent read effect and write effect,
    dispatched by offset against a small bank of state.

--*/

use crate::PeriphError;
use emulator_bus::Irq;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Log target for guest accesses that break a device's register protocol.
pub const GUEST_ERROR: &str = "guest_error";

/// A peripheral decoded as a window of 32-bit registers.
///
/// Accesses never fail: offsets without a register read as zero, ignore
/// writes, and are counted as protocol violations.
pub trait RegisterDevice: Send + Sync {
    fn name(&self) -> &str;

    /// Size of the decoded window in bytes.
    fn size(&self) -> u64;

    fn read(&self, offset: u64) -> u32;

    fn write(&self, offset: u64, value: u32);

    /// Number of interrupt outputs.
    fn irq_outputs(&self) -> usize {
        0
    }

    fn connect_irq(&self, index: usize, _irq: Irq) -> Result<(), PeriphError> {
        Err(PeriphError::NoSuchOutput {
            device: self.name().to_string(),
            index,
        })
    }

    fn irq_connected(&self, _index: usize) -> bool {
        false
    }

    /// Number of undefined accesses seen so far.
    fn violations(&self) -> u64;

    /// Called periodically by the machine.
    fn poll(&self) {}
}

/// What a read of a register returns.
#[derive(Clone, Copy)]
pub enum ReadEffect {
    /// Contents of a state field.
    Field(usize),
    /// A fixed value, independent of state.
    Const(u32),
    /// A pure function of the state fields, evaluated on every read.
    Computed(fn(&[u32]) -> u32),
    /// Acquire a lock: 1 if it was free (and is now held), 0 if already held.
    TestAndSet(usize),
}

/// What a write to a register does.
#[derive(Clone, Copy)]
pub enum WriteEffect {
    Store(usize),
    /// Store the transformed value.
    StoreWith(usize, fn(u32) -> u32),
    /// Drive interrupt output `output` to `level` when the written value is
    /// `sentinel`. Other values are inert.
    Trigger {
        sentinel: u32,
        output: usize,
        level: bool,
    },
    /// Release a lock regardless of its state and of the value written.
    Release(usize),
}

#[derive(Clone, Copy)]
pub struct RegisterSpec {
    pub name: &'static str,
    pub offset: u64,
    pub read: Option<ReadEffect>,
    pub write: Option<WriteEffect>,
}

impl RegisterSpec {
    /// Plain read-write storage.
    pub const fn field(name: &'static str, offset: u64, field: usize) -> Self {
        Self {
            name,
            offset,
            read: Some(ReadEffect::Field(field)),
            write: Some(WriteEffect::Store(field)),
        }
    }

    pub const fn read_only(name: &'static str, offset: u64, read: ReadEffect) -> Self {
        Self {
            name,
            offset,
            read: Some(read),
            write: None,
        }
    }

    pub const fn write_only(name: &'static str, offset: u64, write: WriteEffect) -> Self {
        Self {
            name,
            offset,
            read: None,
            write: Some(write),
        }
    }

    pub const fn read_write(
        name: &'static str,
        offset: u64,
        read: ReadEffect,
        write: WriteEffect,
    ) -> Self {
        Self {
            name,
            offset,
            read: Some(read),
            write: Some(write),
        }
    }
}

/// Interrupt outputs of a device. Each output connects to exactly one sink.
pub struct IrqOutputs {
    slots: Vec<OnceLock<Irq>>,
}

impl IrqOutputs {
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn connect(&self, device: &str, index: usize, irq: Irq) -> Result<(), PeriphError> {
        let slot = self
            .slots
            .get(index)
            .ok_or_else(|| PeriphError::NoSuchOutput {
                device: device.to_string(),
                index,
            })?;
        slot.set(irq).map_err(|_| PeriphError::AlreadyConnected {
            device: device.to_string(),
            index,
        })
    }

    pub fn is_connected(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.get().is_some())
    }

    pub fn set_level(&self, index: usize, level: bool) {
        if let Some(irq) = self.slots.get(index).and_then(OnceLock::get) {
            irq.set_level(level);
        }
    }
}

/// State and dispatch for a table-described device.
pub struct RegisterBank {
    name: String,
    size: u64,
    // Sorted by offset.
    registers: &'static [RegisterSpec],
    fields: Mutex<Vec<u32>>,
    locks: Vec<AtomicBool>,
    irqs: IrqOutputs,
    violations: AtomicU64,
}

impl RegisterBank {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        registers: &'static [RegisterSpec],
        fields: usize,
        locks: usize,
        irqs: usize,
    ) -> Self {
        debug_assert!(registers.windows(2).all(|w| w[0].offset < w[1].offset));
        Self {
            name: name.into(),
            size,
            registers,
            fields: Mutex::new(vec![0; fields]),
            locks: (0..locks).map(|_| AtomicBool::new(false)).collect(),
            irqs: IrqOutputs::new(irqs),
            violations: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    fn lookup(&self, offset: u64) -> Option<&RegisterSpec> {
        if offset >= self.size {
            return None;
        }
        self.registers
            .binary_search_by_key(&offset, |r| r.offset)
            .ok()
            .map(|i| &self.registers[i])
    }

    fn violation(&self, access: &str, offset: u64) {
        self.violations.fetch_add(1, Ordering::Relaxed);
        log::warn!(
            target: GUEST_ERROR,
            "{}: {access} of undefined offset {offset:#x}",
            self.name
        );
    }

    pub fn read(&self, offset: u64) -> u32 {
        let Some(effect) = self.lookup(offset).and_then(|r| r.read) else {
            self.violation("read", offset);
            return 0;
        };
        match effect {
            ReadEffect::Field(i) => self.field(i),
            ReadEffect::Const(value) => value,
            ReadEffect::Computed(f) => {
                f(&self.fields.lock().unwrap_or_else(PoisonError::into_inner))
            }
            ReadEffect::TestAndSet(i) => self.locks[i]
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok() as u32,
        }
    }

    pub fn write(&self, offset: u64, value: u32) {
        let Some(effect) = self.lookup(offset).and_then(|r| r.write) else {
            self.violation("write", offset);
            return;
        };
        match effect {
            WriteEffect::Store(i) => self.set_field(i, value),
            WriteEffect::StoreWith(i, f) => self.set_field(i, f(value)),
            WriteEffect::Trigger {
                sentinel,
                output,
                level,
            } => {
                if value == sentinel {
                    self.irqs.set_level(output, level);
                }
            }
            WriteEffect::Release(i) => self.locks[i].store(false, Ordering::Release),
        }
    }

    pub fn field(&self, index: usize) -> u32 {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)[index]
    }

    /// Host-side state update; not a guest access.
    pub fn set_field(&self, index: usize, value: u32) {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)[index] = value;
    }

    pub fn lock_held(&self, index: usize) -> bool {
        self.locks[index].load(Ordering::Acquire)
    }

    pub fn irqs(&self) -> &IrqOutputs {
        &self.irqs
    }

    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }
}

/// Implements [`RegisterDevice`] for a type whose whole behavior is the
/// `RegisterBank` in its `bank` field.
macro_rules! bank_device {
    ($ty:ty) => {
        impl $crate::RegisterDevice for $ty {
            fn name(&self) -> &str {
                self.bank.name()
            }

            fn size(&self) -> u64 {
                self.bank.size()
            }

            fn read(&self, offset: u64) -> u32 {
                self.bank.read(offset)
            }

            fn write(&self, offset: u64, value: u32) {
                self.bank.write(offset, value)
            }

            fn irq_outputs(&self) -> usize {
                self.bank.irqs().len()
            }

            fn connect_irq(
                &self,
                index: usize,
                irq: emulator_bus::Irq,
            ) -> Result<(), $crate::PeriphError> {
                self.bank.irqs().connect(self.bank.name(), index, irq)
            }

            fn irq_connected(&self, index: usize) -> bool {
                self.bank.irqs().is_connected(index)
            }

            fn violations(&self) -> u64 {
                self.bank.violations()
            }
        }
    };
}

pub(crate) use bank_device;

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_bus::IrqLevels;
    use std::sync::Arc;

    fn double(v: u32) -> u32 {
        v.wrapping_mul(2)
    }

    fn product(f: &[u32]) -> u32 {
        f[0].wrapping_mul(f[1])
    }

    static REGISTERS: [RegisterSpec; 6] = [
        RegisterSpec::field("A", 0x0, 0),
        RegisterSpec::read_write(
            "B",
            0x4,
            ReadEffect::Field(1),
            WriteEffect::StoreWith(1, double),
        ),
        RegisterSpec::read_only("PRODUCT", 0x8, ReadEffect::Computed(product)),
        RegisterSpec::read_write(
            "LOCK",
            0xc,
            ReadEffect::TestAndSet(0),
            WriteEffect::Release(0),
        ),
        RegisterSpec::write_only(
            "FIRE",
            0x10,
            WriteEffect::Trigger {
                sentinel: 0x5a,
                output: 0,
                level: true,
            },
        ),
        RegisterSpec::read_only("ID", 0xff0, ReadEffect::Const(0x42)),
    ];

    fn bank() -> RegisterBank {
        RegisterBank::new("bank", 0x1000, &REGISTERS, 2, 1, 1)
    }

    #[test]
    fn test_effects() {
        let bank = bank();
        bank.write(0x0, 3);
        bank.write(0x4, 5);
        assert_eq!(bank.read(0x0), 3);
        assert_eq!(bank.read(0x4), 10);
        assert_eq!(bank.read(0x8), 30);
        assert_eq!(bank.read(0xff0), 0x42);
        assert_eq!(bank.violations(), 0);
    }

    #[test]
    fn test_lock_effects() {
        let bank = bank();
        assert_eq!(bank.read(0xc), 1);
        assert!(bank.lock_held(0));
        assert_eq!(bank.read(0xc), 0);
        bank.write(0xc, 0);
        assert!(!bank.lock_held(0));
    }

    #[test]
    fn test_trigger_needs_sentinel_and_connection() {
        let bank = bank();
        // Unconnected outputs swallow the event.
        bank.write(0x10, 0x5a);

        let levels = Arc::new(IrqLevels::new(4));
        bank.irqs().connect("bank", 0, levels.irq(2).unwrap()).unwrap();
        bank.write(0x10, 0x5b);
        assert_eq!(levels.assertions(2), 0);
        bank.write(0x10, 0x5a);
        assert!(levels.level(2));
        assert_eq!(levels.assertions(2), 1);
    }

    #[test]
    fn test_output_connects_once() {
        let bank = bank();
        let levels = Arc::new(IrqLevels::new(4));
        bank.irqs().connect("bank", 0, levels.irq(0).unwrap()).unwrap();
        assert!(matches!(
            bank.irqs().connect("bank", 0, levels.irq(1).unwrap()),
            Err(PeriphError::AlreadyConnected { index: 0, .. })
        ));
        assert!(matches!(
            bank.irqs().connect("bank", 1, levels.irq(1).unwrap()),
            Err(PeriphError::NoSuchOutput { index: 1, .. })
        ));
    }

    #[test]
    fn test_undefined_accesses() {
        let bank = bank();
        // Offset without a register, read of a write-only register, write of
        // a read-only register, and an offset past the window.
        assert_eq!(bank.read(0x20), 0);
        assert_eq!(bank.read(0x10), 0);
        bank.write(0x8, 1);
        bank.write(0xff0, 1);
        assert_eq!(bank.read(0x2000), 0);
        assert_eq!(bank.violations(), 5);
        assert_eq!(bank.read(0xff0), 0x42);
    }
}
