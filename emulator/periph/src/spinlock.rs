/*++

Licensed under the Apache-2.0 license.

File Name:

    spinlock.rs

Abstract:

    File contains the hardware spinlock bank used by SMP guests. Reading a
    lock register is test-and-set; writing it releases the lock.

--*/

use crate::register::{bank_device, ReadEffect, RegisterBank, RegisterSpec, WriteEffect};
use emulator_types::consts::DEVICE_PAGE_SIZE;

const fn lock(name: &'static str, index: usize) -> RegisterSpec {
    RegisterSpec::read_write(
        name,
        index as u64 * 4,
        ReadEffect::TestAndSet(index),
        WriteEffect::Release(index),
    )
}

static REGISTERS: [RegisterSpec; Spinlock::LOCKS] = [
    lock("LOCK0", 0),
    lock("LOCK1", 1),
    lock("LOCK2", 2),
    lock("LOCK3", 3),
];

pub struct Spinlock {
    bank: RegisterBank,
}

impl Spinlock {
    pub const LOCKS: usize = 4;
    pub const SIZE: u64 = DEVICE_PAGE_SIZE;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            bank: RegisterBank::new(name, Self::SIZE, &REGISTERS, 0, Self::LOCKS, 0),
        }
    }

    /// Register offset of lock `index`.
    pub const fn offset(index: usize) -> u64 {
        index as u64 * 4
    }

    pub fn is_locked(&self, index: usize) -> bool {
        self.bank.lock_held(index)
    }
}

bank_device!(Spinlock);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegisterDevice;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn test_test_and_set() {
        let lock = Spinlock::new("spinlock");
        assert_eq!(lock.read(0x0), 1);
        assert!(lock.is_locked(0));
        assert_eq!(lock.read(0x0), 0);
        lock.write(0x0, 0);
        assert!(!lock.is_locked(0));
        assert_eq!(lock.read(0x0), 1);
    }

    #[test]
    fn test_locks_are_independent() {
        let lock = Spinlock::new("spinlock");
        assert_eq!(lock.read(Spinlock::offset(1)), 1);
        assert_eq!(lock.read(Spinlock::offset(2)), 1);
        assert_eq!(lock.read(Spinlock::offset(1)), 0);
        assert!(!lock.is_locked(0));
        assert!(!lock.is_locked(3));
    }

    #[test]
    fn test_write_always_releases() {
        let lock = Spinlock::new("spinlock");
        // Releasing a free lock is harmless and the value is ignored.
        lock.write(Spinlock::offset(3), 0xdead_beef);
        assert!(!lock.is_locked(3));
        assert_eq!(lock.read(Spinlock::offset(3)), 1);
        lock.write(Spinlock::offset(3), 0x1);
        assert!(!lock.is_locked(3));
        assert_eq!(lock.violations(), 0);
    }

    #[test]
    fn test_undefined_offsets() {
        let lock = Spinlock::new("spinlock");
        assert_eq!(lock.read(0x10), 0);
        lock.write(0x2, 0);
        assert_eq!(lock.violations(), 2);
    }

    #[test]
    fn test_contended_acquire() {
        const THREADS: usize = 8;
        const ROUNDS: usize = 200;
        let lock = Spinlock::new("spinlock");
        let winners = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        for _ in 0..ROUNDS {
            std::thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        barrier.wait();
                        if lock.read(Spinlock::offset(0)) == 1 {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });
            assert!(lock.is_locked(0));
            lock.write(Spinlock::offset(0), 0);
        }
        // Exactly one reader wins each round.
        assert_eq!(winners.load(Ordering::SeqCst), ROUNDS);
    }
}
