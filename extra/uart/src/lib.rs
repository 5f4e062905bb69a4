// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interrupt-driven UART reads and writes for [`sigcore`].
//!
//! A [`Uart`] wraps the board's register access (anything implementing
//! [`UartRegisters`]) and the signal(s) its interrupts raise. Its
//! [`read`][Uart::read] and [`write`][Uart::write] methods return senders;
//! connect one to a receiver, pin the resulting operation, and start it.
//!
//! ```ignore
//! let uart = Uart::new(Usart2Regs, sigcore::vectors::irq(38));
//! let mut buf = [0; 16];
//! match sigcore::execute(uart.read(&mut buf)).await {
//!     Outcome::Success(n) => ...,
//!     Outcome::Error(UartError::Busy) => ..., // someone else is reading
//!     Outcome::Error(e) => ...,               // line error
//!     Outcome::Cancelled => ...,
//! }
//! ```
//!
//! # Sharing an interrupt
//!
//! Lots of UARTs have a single interrupt for both directions. With
//! [`Uart::new`], reads and writes share one signal, so only one of them can
//! be in flight at a time and the other gets [`UartError::Busy`]. If your
//! hardware raises separate interrupts for receive and transmit, use
//! [`Uart::with_signals`] and the two directions become independent.
//!
//! [`sigcore`]: https://docs.rs/sigcore/

#![cfg_attr(not(test), no_std)]
#![warn(
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    missing_debug_implementations,
    missing_docs,
    semicolon_in_expressions_from_macros,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_op_in_unsafe_fn,
    unused_qualifications
)]

use core::fmt;
use core::task::Poll;

use sigcore::operation::{Busy, Operation, Transfer, TransferSender};
use sigcore::SignalEmitter;

/// Errors a UART operation can end in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartError {
    /// Another operation holds the signal.
    Busy,
    /// A byte arrived before the previous one was read, and was lost.
    Overrun,
    /// A byte arrived without a valid stop bit.
    Framing,
    /// Noise was detected on the line while receiving.
    Noise,
}

impl From<Busy> for UartError {
    fn from(_: Busy) -> Self {
        UartError::Busy
    }
}

impl From<LineError> for UartError {
    fn from(e: LineError) -> Self {
        match e {
            LineError::Overrun => UartError::Overrun,
            LineError::Framing => UartError::Framing,
            LineError::Noise => UartError::Noise,
        }
    }
}

impl fmt::Display for UartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UartError::Busy => "uart busy",
            UartError::Overrun => "receive overrun",
            UartError::Framing => "framing error",
            UartError::Noise => "line noise",
        })
    }
}

/// Receive-side error flags, as reported by the hardware.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Overrun flag.
    Overrun,
    /// Framing error flag.
    Framing,
    /// Noise flag.
    Noise,
}

/// Register-level access to one UART, implemented by board or HAL code.
///
/// Methods take `&self` because they're called from both the main flow and
/// interrupt context; implementations are typically zero-sized wrappers
/// around a PAC register block.
pub trait UartRegisters {
    /// Checks whether a received byte is waiting to be read.
    fn rx_ready(&self) -> bool;

    /// Reads a received byte. Only called after `rx_ready` returned `true`.
    fn read_byte(&self) -> u8;

    /// Checks whether the transmitter can accept another byte.
    fn tx_ready(&self) -> bool;

    /// Queues a byte for transmission. Only called after `tx_ready` returned
    /// `true`.
    fn write_byte(&self, byte: u8);

    /// Checks for receive errors, clearing the flag it reports.
    fn take_error(&self) -> Option<LineError>;

    /// Enables or masks the receive interrupt (data ready and errors).
    fn set_rx_interrupt(&self, enabled: bool);

    /// Enables or masks the transmit interrupt (transmitter ready).
    fn set_tx_interrupt(&self, enabled: bool);
}

/// A UART driver.
#[derive(Debug)]
pub struct Uart<U> {
    regs: U,
    rx: SignalEmitter,
    tx: SignalEmitter,
}

impl<U: UartRegisters> Uart<U> {
    /// Creates a driver for a UART whose interrupts all raise `signal`.
    pub fn new(regs: U, signal: SignalEmitter) -> Self {
        Self::with_signals(regs, signal, signal)
    }

    /// Creates a driver for a UART with separate receive and transmit
    /// interrupts.
    pub fn with_signals(regs: U, rx: SignalEmitter, tx: SignalEmitter) -> Self {
        Self { regs, rx, tx }
    }

    /// Gets the register access object back.
    pub fn regs(&self) -> &U {
        &self.regs
    }

    /// Produces a sender that fills `buf` with received bytes.
    ///
    /// The operation succeeds with `buf.len()` once the buffer is full. An
    /// empty buffer succeeds immediately without touching the hardware.
    pub fn read<'a>(&'a self, buf: &'a mut [u8]) -> ReadSender<'a, U> {
        TransferSender::new(self.rx, ReadTransfer {
            regs: &self.regs,
            buf,
            filled: 0,
        })
    }

    /// Produces a sender that transmits `data`.
    ///
    /// The operation succeeds with `data.len()` once the last byte has been
    /// handed to the transmitter. Empty `data` succeeds immediately.
    pub fn write<'a>(&'a self, data: &'a [u8]) -> WriteSender<'a, U> {
        TransferSender::new(self.tx, WriteTransfer {
            regs: &self.regs,
            data,
            sent: 0,
        })
    }
}

/// Sender returned by [`Uart::read`].
pub type ReadSender<'a, U> = TransferSender<ReadTransfer<'a, U>>;
/// Operation produced by connecting a [`ReadSender`].
pub type ReadOperation<'a, U, R> = Operation<ReadTransfer<'a, U>, R>;
/// Sender returned by [`Uart::write`].
pub type WriteSender<'a, U> = TransferSender<WriteTransfer<'a, U>>;
/// Operation produced by connecting a [`WriteSender`].
pub type WriteOperation<'a, U, R> = Operation<WriteTransfer<'a, U>, R>;

/// Transfer behind [`Uart::read`].
#[derive(Debug)]
pub struct ReadTransfer<'a, U> {
    regs: &'a U,
    buf: &'a mut [u8],
    filled: usize,
}

impl<U: UartRegisters> Transfer for ReadTransfer<'_, U> {
    type Value = usize;
    type Error = UartError;

    fn degenerate(&mut self) -> Option<usize> {
        if self.buf.is_empty() { Some(0) } else { None }
    }

    fn begin(&mut self) {
        self.regs.set_rx_interrupt(true);
    }

    fn service(&mut self) -> Poll<Result<usize, UartError>> {
        if let Some(e) = self.regs.take_error() {
            return Poll::Ready(Err(e.into()));
        }
        while self.filled < self.buf.len() && self.regs.rx_ready() {
            self.buf[self.filled] = self.regs.read_byte();
            self.filled += 1;
        }
        if self.filled == self.buf.len() {
            Poll::Ready(Ok(self.filled))
        } else {
            Poll::Pending
        }
    }

    fn halt(&mut self) {
        self.regs.set_rx_interrupt(false);
    }
}

/// Transfer behind [`Uart::write`].
#[derive(Debug)]
pub struct WriteTransfer<'a, U> {
    regs: &'a U,
    data: &'a [u8],
    sent: usize,
}

impl<U: UartRegisters> Transfer for WriteTransfer<'_, U> {
    type Value = usize;
    type Error = UartError;

    fn degenerate(&mut self) -> Option<usize> {
        if self.data.is_empty() { Some(0) } else { None }
    }

    fn begin(&mut self) {
        self.regs.set_tx_interrupt(true);
    }

    fn service(&mut self) -> Poll<Result<usize, UartError>> {
        while self.sent < self.data.len() && self.regs.tx_ready() {
            self.regs.write_byte(self.data[self.sent]);
            self.sent += 1;
        }
        if self.sent == self.data.len() {
            Poll::Ready(Ok(self.sent))
        } else {
            Poll::Pending
        }
    }

    fn halt(&mut self) {
        self.regs.set_tx_interrupt(false);
    }
}
