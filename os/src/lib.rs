// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interrupt signals, three-state outcomes, and pinned operations for
//! allocation-free async firmware.
//!
//! This crate is the piece that sits between your interrupt handlers and
//! the code that wants to know when some piece of hardware is done. It
//! doesn't contain a scheduler, and it doesn't contain drivers; it contains
//! the vocabulary that both of those speak.
//!
//! # `sigcore` design principles
//!
//! 1. No heap. Everything here is either a `static` that lives forever (the
//!    vector table) or a value that lives in your stack frame or future (an
//!    operation and its receiver). Nothing is reference counted.
//!
//! 2. No exceptions, and panics only for programmer errors. Every
//!    asynchronous operation ends in exactly one [`Outcome`], which can be a
//!    success, an error, or a cancellation. Reading the wrong arm of an
//!    `Outcome`, or starting the same operation twice, is a bug in your
//!    program and will panic.
//!
//! 3. Be predictable in interrupt context. The only thing an interrupt
//!    handler does through this crate is [`Signal::raise`], which calls at
//!    most one function pointer. There's no list to walk and no allocation
//!    to fail.
//!
//! # The pieces
//!
//! - [`outcome`] defines `Outcome<T, E>`, the terminal result of everything.
//!
//! - [`signal`] defines `Signal`, a single-slot binding from an interrupt to
//!   one handler, and `SignalEmitter`, the copyable handle drivers hold.
//!
//! - [`vectors`] holds the process-wide table of signals, one per interrupt
//!   vector, and the interrupt entry points that raise them.
//!
//! - [`pollable`] is a tiny cooperative future abstraction for code that is
//!   happy to spin: `poll()` until done, then read the value.
//!
//! - [`receiver`] and [`operation`] are the connection protocol drivers use
//!   to expose asynchronous hardware operations. A driver hands you a
//!   _sender_; you connect it to a _receiver_ and get an _operation_; you pin
//!   the operation and start it.
//!
//! - [`halt`] is what to call when initialization fails and there's nothing
//!   left to do.
//!
//! # Interrupts and the main flow of control
//!
//! This crate assumes one core, one flow of control (whatever loop or
//! executor you're running), and interrupt handlers that preempt it. A
//! `Signal` is claimed by at most one subscriber at a time; that's the
//! admission control that stops two operations from fighting over one
//! interrupt, and it's why a second operation on a busy signal fails with
//! [`Busy`][operation::Busy] instead of quietly stealing it.
//!
//! The interrupt handler that services an operation is the only code that
//! advances it. When it's done it stops the peripheral, unsubscribes, and
//! only _then_ tells the receiver, so that nothing in interrupt context can
//! touch the operation after the receiver has heard the news.
//!
//! # Cancellation
//!
//! Cancellation is a first-class result. An operation that is dropped or
//! explicitly [cancelled][operation::Operation::cancel] while running stops
//! its peripheral, releases its signal, and reports `Outcome::Cancelled` to
//! its receiver. Stopping the peripheral and releasing the signal always
//! happen together; doing one without the other would leave either a
//! dangling handler or a peripheral writing into memory nobody owns.

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
    unused_qualifications,
)]
#![warn(clippy::undocumented_unsafe_blocks)]

/// Internal assert macro that doesn't stringify its expression or generate any
/// fancy messages. This means failures must be diagnosed by file:line only, so,
/// don't use this more than once on the same line. In exchange, this makes
/// asserts significantly smaller in terms of text size.
macro_rules! cheap_assert {
    ($x:expr) => {
        if !$x { panic!(); };
    }
}

// Logging shims. With the `defmt` feature these forward to `defmt`; without
// it they expand to `()` and evaluate nothing, so arguments must be
// side-effect free. Either way they're usable as statements or expressions.
#[cfg(feature = "defmt")]
macro_rules! trace {
    ($($arg:tt)*) => { defmt::trace!($($arg)*) };
}
#[cfg(not(feature = "defmt"))]
macro_rules! trace {
    ($($arg:tt)*) => { () };
}
pub(crate) use trace;

#[cfg(feature = "defmt")]
macro_rules! debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}
#[cfg(not(feature = "defmt"))]
macro_rules! debug {
    ($($arg:tt)*) => { () };
}
pub(crate) use debug;

pub mod outcome;
pub mod signal;
pub mod vectors;
pub mod pollable;
pub mod receiver;
pub mod operation;
pub mod halt;
#[cfg(feature = "systick")]
pub mod time;

pub use outcome::Outcome;
pub use signal::{Signal, SignalEmitter};
pub use pollable::{Pollable, PollableExt, Status, wait_for};
pub use receiver::{Completion, Receiver};
pub use operation::{execute, Busy, Operation, Sender, Transfer, TransferSender};

#[cfg(test)]
mod tests {
    #[test]
    fn logging_shims_work_in_any_position() {
        crate::trace!("statement");
        for n in 0..3_u8 {
            let () = match n {
                0 => crate::trace!("arm {}", n),
                1 => crate::debug!("arm {}", n),
                _ => {
                    crate::debug!("block");
                }
            };
        }
    }
}
