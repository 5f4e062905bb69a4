// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Memory-to-memory DMA transfers for [`sigcore`].
//!
//! A [`Dma`] wraps one DMA stream (anything implementing [`DmaStream`]) and
//! the signal its interrupt raises. [`Dma::transfer`] returns a sender that
//! copies from one buffer to another:
//!
//! ```ignore
//! let dma = Dma::new(Dma2Stream0, sigcore::vectors::irq(56));
//! let n = sigcore::execute(dma.transfer(&src, &mut dst)).await;
//! ```
//!
//! The transfer moves `min(src.len(), dst.len())` bytes. If that's zero, it
//! succeeds immediately without starting the stream.
//!
//! # Buffers and cancellation
//!
//! While the operation runs, the hardware is writing into `dst` behind the
//! compiler's back. That's fine because the operation borrows `dst` for its
//! whole life, and cancelling it, including by dropping it, disables the
//! stream before the borrow can end.
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

/// Errors a DMA transfer can end in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Another transfer holds the stream's signal.
    Busy,
    /// The bus reported an error, usually a bad address.
    Transfer,
    /// The stream's FIFO overran or underran.
    Fifo,
}

impl From<Busy> for DmaError {
    fn from(_: Busy) -> Self {
        DmaError::Busy
    }
}

impl fmt::Display for DmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DmaError::Busy => "dma stream busy",
            DmaError::Transfer => "dma transfer error",
            DmaError::Fifo => "dma fifo error",
        })
    }
}

/// Interrupt status flags of a stream.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamStatus {
    /// Transfer complete.
    pub complete: bool,
    /// Transfer error.
    pub transfer_error: bool,
    /// FIFO error.
    pub fifo_error: bool,
}

/// Register-level access to one DMA stream, implemented by board or HAL
/// code.
pub trait DmaStream {
    /// Programs source, destination, and byte count for a memory-to-memory
    /// transfer. The stream is disabled when this is called.
    ///
    /// # Safety
    ///
    /// `src` must be readable and `dst` writable for `len` bytes until the
    /// stream is disabled.
    unsafe fn configure(&self, src: *const u8, dst: *mut u8, len: usize);

    /// Enables the stream, along with its complete and error interrupts.
    fn enable(&self);

    /// Disables the stream and masks its interrupts, waiting for any bus
    /// access in progress to finish.
    fn disable(&self);

    /// Reads the stream's interrupt flags and clears the ones that are set.
    fn take_status(&self) -> StreamStatus;
}

/// A DMA stream driver.
#[derive(Debug)]
pub struct Dma<S> {
    stream: S,
    signal: SignalEmitter,
}

impl<S: DmaStream> Dma<S> {
    /// Creates a driver for `stream`, whose interrupt raises `signal`.
    pub fn new(stream: S, signal: SignalEmitter) -> Self {
        Self { stream, signal }
    }

    /// Gets the stream back.
    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Produces a sender that copies `src` into `dst`, succeeding with the
    /// number of bytes copied.
    pub fn transfer<'a>(&'a self, src: &'a [u8], dst: &'a mut [u8]) -> DmaTransferSender<'a, S> {
        let len = src.len().min(dst.len());
        TransferSender::new(self.signal, DmaTransfer {
            stream: &self.stream,
            src,
            dst,
            len,
        })
    }
}

/// Sender returned by [`Dma::transfer`].
pub type DmaTransferSender<'a, S> = TransferSender<DmaTransfer<'a, S>>;
/// Operation produced by connecting a [`DmaTransferSender`].
pub type DmaTransferOperation<'a, S, R> = Operation<DmaTransfer<'a, S>, R>;

/// Transfer behind [`Dma::transfer`].
#[derive(Debug)]
pub struct DmaTransfer<'a, S> {
    stream: &'a S,
    src: &'a [u8],
    dst: &'a mut [u8],
    len: usize,
}

impl<S: DmaStream> Transfer for DmaTransfer<'_, S> {
    type Value = usize;
    type Error = DmaError;

    fn degenerate(&mut self) -> Option<usize> {
        if self.len == 0 { Some(0) } else { None }
    }

    fn begin(&mut self) {
        // Clear anything left over from a previous transfer.
        self.stream.take_status();
        // Safety: both buffers are borrowed for as long as this transfer
        // exists, and `halt` disables the stream before it goes away.
        unsafe {
            self.stream.configure(self.src.as_ptr(), self.dst.as_mut_ptr(), self.len);
        }
        self.stream.enable();
    }

    fn service(&mut self) -> Poll<Result<usize, DmaError>> {
        let status = self.stream.take_status();
        if status.transfer_error {
            Poll::Ready(Err(DmaError::Transfer))
        } else if status.fifo_error {
            Poll::Ready(Err(DmaError::Fifo))
        } else if status.complete {
            Poll::Ready(Ok(self.len))
        } else {
            Poll::Pending
        }
    }

    fn halt(&mut self) {
        self.stream.disable();
    }
}
