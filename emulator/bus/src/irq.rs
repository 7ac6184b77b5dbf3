/*++

Licensed under the Apache-2.0 license.

File Name:

    irq.rs

Abstract:

    File contains interrupt line handles. A source holds an `Irq` and drives
    its level; the sink it points at decides what a level means.

--*/

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Receiver of level changes on numbered input lines.
pub trait IrqSink: Send + Sync {
    fn set_level(&self, line: u32, level: bool);
}

/// Handle to one input line of a sink.
#[derive(Clone)]
pub struct Irq {
    line: u32,
    sink: Arc<dyn IrqSink>,
}

impl Irq {
    pub fn new(sink: Arc<dyn IrqSink>, line: u32) -> Self {
        Self { line, sink }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn set_level(&self, level: bool) {
        self.sink.set_level(self.line, level);
    }

    pub fn raise(&self) {
        self.set_level(true);
    }

    pub fn lower(&self) {
        self.set_level(false);
    }
}

impl fmt::Debug for Irq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Irq").field("line", &self.line).finish()
    }
}

/// A bank of level-sensitive input lines.
///
/// Every assertion is also counted, so edge-style sources (one event per
/// guest write) stay observable even when the level does not change.
pub struct IrqLevels {
    levels: Vec<AtomicBool>,
    assertions: Vec<AtomicU64>,
}

impl IrqLevels {
    pub fn new(lines: usize) -> Self {
        Self {
            levels: (0..lines).map(|_| AtomicBool::new(false)).collect(),
            assertions: (0..lines).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, line: u32) -> bool {
        self.levels
            .get(line as usize)
            .is_some_and(|l| l.load(Ordering::Acquire))
    }

    /// Number of times `line` has been driven high.
    pub fn assertions(&self, line: u32) -> u64 {
        self.assertions
            .get(line as usize)
            .map_or(0, |c| c.load(Ordering::Acquire))
    }

    /// Lines currently high, in ascending order.
    pub fn asserted(&self) -> impl Iterator<Item = u32> + '_ {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.load(Ordering::Acquire))
            .map(|(i, _)| i as u32)
    }

    pub fn any_asserted(&self, mut lines: std::ops::Range<u32>) -> bool {
        lines.any(|line| self.level(line))
    }

    /// Handle for `line` of this bank.
    pub fn irq(self: &Arc<Self>, line: u32) -> Option<Irq> {
        ((line as usize) < self.len()).then(|| Irq::new(self.clone(), line))
    }
}

impl IrqSink for IrqLevels {
    fn set_level(&self, line: u32, level: bool) {
        let Some(slot) = self.levels.get(line as usize) else {
            log::warn!("irq line {line} is outside a bank of {}", self.len());
            return;
        };
        slot.store(level, Ordering::Release);
        if level {
            self.assertions[line as usize].fetch_add(1, Ordering::AcqRel);
        }
    }
}
