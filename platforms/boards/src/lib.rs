// Licensed under the Apache-2.0 license

//! Built-in board descriptors.

mod cortex_m;
mod p29a;
mod riscv;
mod thomas;
mod tiger;

pub use cortex_m::{thomas_m3, thomas_m33};
pub use p29a::p29a_lp;
pub use riscv::{thomas_riscv32, thomas_riscv64};
pub use thomas::{thomas_a15, thomas_a53, thomas_a55, NUM_IRQS};
pub use tiger::{thomas_tiger, TIGER_ALIASED_BLOCKS};

use soc_config::BoardDescriptor;

const BOARDS: &[(&str, fn() -> BoardDescriptor)] = &[
    ("thomas-a15", thomas_a15),
    ("thomas-a53", thomas_a53),
    ("thomas-a55", thomas_a55),
    ("thomas-tiger", thomas_tiger),
    ("p29a-lp", p29a_lp),
    ("thomas-m3", thomas_m3),
    ("thomas-m33", thomas_m33),
    ("thomas-riscv32", thomas_riscv32),
    ("thomas-riscv64", thomas_riscv64),
];

/// Names of the built-in boards.
pub fn names() -> impl Iterator<Item = &'static str> {
    BOARDS.iter().map(|(name, _)| *name)
}

pub fn builtin(name: &str) -> Option<BoardDescriptor> {
    BOARDS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, board)| board())
}
