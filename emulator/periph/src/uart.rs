/*++

Licensed under the Apache-2.0 license.

File Name:

    uart.rs

Abstract:

    File contains a 16550-compatible UART with registers on a 4-byte stride.
    Only the registers a polled or interrupt-driven console driver touches
    are modeled; transmission is immediate.

--*/

use crate::register::{IrqOutputs, RegisterDevice, GUEST_ERROR};
use crate::unimp::UNIMP;
use crate::PeriphError;
use emulator_bus::Irq;
use num_enum::TryFromPrimitive;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tock_registers::{register_bitfields, LocalRegisterCopy};

register_bitfields![u8,
    IER [
        /// Received data available
        ERBFI OFFSET(0) NUMBITS(1) [],
        /// Transmit holding register empty
        ETBEI OFFSET(1) NUMBITS(1) [],
    ],
    LCR [
        WLS OFFSET(0) NUMBITS(2) [],
        STB OFFSET(2) NUMBITS(1) [],
        /// Divisor latch access
        DLAB OFFSET(7) NUMBITS(1) [],
    ],
    LSR [
        DR OFFSET(0) NUMBITS(1) [],
        THRE OFFSET(5) NUMBITS(1) [],
        TEMT OFFSET(6) NUMBITS(1) [],
    ],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u64)]
enum UartReg {
    /// RBR on read, THR on write; DLL with DLAB set.
    Data = 0x00,
    /// IER; DLM with DLAB set.
    Ier = 0x04,
    /// IIR on read, FCR on write.
    Iir = 0x08,
    Lcr = 0x0c,
    Mcr = 0x10,
    Lsr = 0x14,
    Msr = 0x18,
    Scr = 0x1c,
}

/// DesignWare APB UART extension block (USR, TFL, CPR and friends).
const DW_EXTENSION: std::ops::Range<u64> = 0x20..0x100;

const IIR_NO_INTERRUPT: u32 = 0x01;
const IIR_RX_DATA: u32 = 0x04;

/// Where transmitted bytes go.
pub type UartOutput = Arc<Mutex<Vec<u8>>>;

/// One-byte receive mailbox filled by the host console.
pub type UartInput = Arc<Mutex<Option<u8>>>;

struct UartRegs {
    ier: LocalRegisterCopy<u8, IER::Register>,
    lcr: LocalRegisterCopy<u8, LCR::Register>,
    mcr: u8,
    scr: u8,
    dll: u8,
    dlm: u8,
}

impl Default for UartRegs {
    fn default() -> Self {
        Self {
            ier: LocalRegisterCopy::new(0),
            lcr: LocalRegisterCopy::new(0),
            mcr: 0,
            scr: 0,
            dll: 0,
            dlm: 0,
        }
    }
}

pub struct Uart16550 {
    name: String,
    size: u64,
    output: Option<UartOutput>,
    input: Option<UartInput>,
    regs: Mutex<UartRegs>,
    irq: IrqOutputs,
    violations: AtomicU64,
}

impl Uart16550 {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        output: Option<UartOutput>,
        input: Option<UartInput>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            output,
            input,
            regs: Mutex::new(UartRegs::default()),
            irq: IrqOutputs::new(1),
            violations: AtomicU64::new(0),
        }
    }

    fn regs(&self) -> std::sync::MutexGuard<'_, UartRegs> {
        self.regs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rx_waiting(&self) -> bool {
        self.input.as_ref().is_some_and(|input| {
            input
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
        })
    }

    fn take_rx(&self) -> u8 {
        self.input.as_ref().map_or(0, |input| {
            input
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .unwrap_or(0)
        })
    }

    fn transmit(&self, byte: u8) {
        match &self.output {
            Some(output) => output
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(byte),
            None => {
                let mut stderr = std::io::stderr();
                // Console output is best effort.
                let _ = stderr.write_all(&[byte]);
                let _ = stderr.flush();
            }
        }
    }

    /// Accesses to the DesignWare extension block are unimplemented, not
    /// guest errors.
    fn unhandled(&self, access: &str, offset: u64) {
        if DW_EXTENSION.contains(&offset) {
            log::debug!(
                target: UNIMP,
                "{}: {access} of DesignWare extension {offset:#x}",
                self.name
            );
        } else {
            self.violation(access, offset);
        }
    }

    fn violation(&self, access: &str, offset: u64) {
        self.violations.fetch_add(1, Ordering::Relaxed);
        log::warn!(
            target: GUEST_ERROR,
            "{}: {access} of undefined offset {offset:#x}",
            self.name
        );
    }

    fn rx_irq_pending(&self) -> bool {
        self.regs().ier.is_set(IER::ERBFI) && self.rx_waiting()
    }
}

impl RegisterDevice for Uart16550 {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read(&self, offset: u64) -> u32 {
        let Ok(reg) = UartReg::try_from(offset) else {
            self.unhandled("read", offset);
            return 0;
        };
        let dlab = self.regs().lcr.is_set(LCR::DLAB);
        match reg {
            UartReg::Data if dlab => self.regs().dll.into(),
            UartReg::Data => self.take_rx().into(),
            UartReg::Ier if dlab => self.regs().dlm.into(),
            UartReg::Ier => self.regs().ier.get().into(),
            UartReg::Iir => {
                if self.rx_irq_pending() {
                    IIR_RX_DATA
                } else {
                    IIR_NO_INTERRUPT
                }
            }
            UartReg::Lcr => self.regs().lcr.get().into(),
            UartReg::Mcr => self.regs().mcr.into(),
            UartReg::Lsr => {
                let mut lsr: LocalRegisterCopy<u8, LSR::Register> = LocalRegisterCopy::new(0);
                lsr.modify(LSR::THRE::SET + LSR::TEMT::SET);
                if self.rx_waiting() {
                    lsr.modify(LSR::DR::SET);
                }
                lsr.get().into()
            }
            UartReg::Msr => 0,
            UartReg::Scr => self.regs().scr.into(),
        }
    }

    fn write(&self, offset: u64, value: u32) {
        let Ok(reg) = UartReg::try_from(offset) else {
            self.unhandled("write", offset);
            return;
        };
        let byte = value as u8;
        let dlab = self.regs().lcr.is_set(LCR::DLAB);
        match reg {
            UartReg::Data if dlab => self.regs().dll = byte,
            UartReg::Data => self.transmit(byte),
            UartReg::Ier if dlab => self.regs().dlm = byte,
            UartReg::Ier => {
                self.regs().ier.set(byte);
                self.poll();
            }
            // FIFO control has nothing to configure.
            UartReg::Iir => {}
            UartReg::Lcr => self.regs().lcr.set(byte),
            UartReg::Mcr => self.regs().mcr = byte,
            UartReg::Lsr | UartReg::Msr => self.violation("write", offset),
            UartReg::Scr => self.regs().scr = byte,
        }
    }

    fn irq_outputs(&self) -> usize {
        self.irq.len()
    }

    fn connect_irq(&self, index: usize, irq: Irq) -> Result<(), PeriphError> {
        self.irq.connect(&self.name, index, irq)
    }

    fn irq_connected(&self, index: usize) -> bool {
        self.irq.is_connected(index)
    }

    fn violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    fn poll(&self) {
        // Level follows "receive interrupt enabled and a byte is waiting".
        self.irq.set_level(0, self.rx_irq_pending());
    }
}
