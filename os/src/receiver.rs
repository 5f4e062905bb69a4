// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The consuming end of an operation.
//!
//! A [`Receiver`] is told how an [operation][crate::operation] ended,
//! exactly once, through one of three methods: [`set_value`] for success,
//! [`set_error`] for failure, or [`set_done`] for cancellation. All three take
//! `self` by value, so "exactly once" isn't a rule you have to remember; the
//! receiver is gone after the first call.
//!
//! Receivers are usually called from interrupt context, so they should do
//! very little. The two provided here are:
//!
//! - [`receiver_fn`], which wraps a closure taking an [`Outcome`]. Useful when
//!   the result needs to go into some state of your own.
//!
//! - [`Completion`], a slot the result gets stored into, which the main flow
//!   of control can then [`block`][Completion::block] on or
//!   [`wait`][Completion::wait] for in async code.
//!
//! [`set_value`]: Receiver::set_value
//! [`set_error`]: Receiver::set_error
//! [`set_done`]: Receiver::set_done

use core::cell::RefCell;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use critical_section::Mutex;
use futures::future::FusedFuture;

use crate::outcome::Outcome;

/// Something that can be told how an operation ended.
pub trait Receiver<T, E> {
    /// The operation succeeded with `value`.
    fn set_value(self, value: T);

    /// The operation failed with `error`.
    fn set_error(self, error: E);

    /// The operation was cancelled.
    fn set_done(self);

    /// Delivers `outcome` through whichever of the three methods matches it.
    fn complete(self, outcome: Outcome<T, E>)
        where Self: Sized,
    {
        match outcome {
            Outcome::Success(v) => self.set_value(v),
            Outcome::Error(e) => self.set_error(e),
            Outcome::Cancelled => self.set_done(),
        }
    }
}

/// Makes a receiver out of a closure that takes the `Outcome`.
pub fn receiver_fn<T, E, F>(f: F) -> FnReceiver<F>
    where F: FnOnce(Outcome<T, E>),
{
    FnReceiver(f)
}

/// Receiver wrapping a closure (result of [`receiver_fn`]).
#[derive(Copy, Clone, Debug)]
pub struct FnReceiver<F>(F);

impl<T, E, F> Receiver<T, E> for FnReceiver<F>
    where F: FnOnce(Outcome<T, E>),
{
    fn set_value(self, value: T) {
        (self.0)(Outcome::Success(value))
    }

    fn set_error(self, error: E) {
        (self.0)(Outcome::Error(error))
    }

    fn set_done(self) {
        (self.0)(Outcome::Cancelled)
    }
}

/// A slot that an operation's outcome can be delivered into, from interrupt
/// context, and collected from later.
///
/// `&Completion<T, E>` implements [`Receiver<T, E>`], so you connect an
/// operation to a reference to one of these. It can live on the stack, in a
/// future, or in a `static`:
///
/// ```ignore
/// static DONE: Completion<(), UartError> = Completion::new();
///
/// let op = pin!(uart.write(b"hello").connect(&DONE));
/// op.start();
/// // ... later ...
/// if let Some(outcome) = DONE.take() {
///     // ...
/// }
/// ```
///
/// A `Completion` holds at most one outcome. Once you [`take`] it, the slot
/// is empty again and can be reused for another operation.
///
/// [`take`]: Completion::take
pub struct Completion<T, E> {
    state: Mutex<RefCell<State<T, E>>>,
}

struct State<T, E> {
    outcome: Option<Outcome<T, E>>,
    waker: Option<Waker>,
}

impl<T, E> Completion<T, E> {
    /// Creates an empty `Completion`.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                outcome: None,
                waker: None,
            })),
        }
    }

    /// Checks whether an outcome has been delivered and not yet taken.
    pub fn is_complete(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).outcome.is_some())
    }

    /// Takes the delivered outcome, if there is one, leaving the slot empty.
    pub fn take(&self) -> Option<Outcome<T, E>> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).outcome.take())
    }

    /// Waits, without yielding, until an outcome is delivered, and takes it.
    ///
    /// On Cortex-M this sleeps the processor between checks, with interrupts
    /// masked around the check so the wakeup can't be missed. Elsewhere it
    /// spins.
    ///
    /// If nothing will ever deliver an outcome, this never returns.
    pub fn block(&self) -> Outcome<T, E> {
        loop {
            if let Some(o) = self.take_or_idle() {
                break o;
            }
        }
    }

    /// Returns a future that resolves when an outcome is delivered, taking
    /// it.
    ///
    /// Only one task should wait on a given `Completion` at a time. If two do,
    /// the one that polled most recently gets woken.
    ///
    /// # Cancellation
    ///
    /// Dropping the future stops waiting, but doesn't affect the operation,
    /// and the outcome can still be collected later.
    pub fn wait(&self) -> Wait<'_, T, E> {
        Wait { completion: self, finished: false }
    }

    /// Stores `outcome` and wakes any waiting task.
    fn deliver(&self, outcome: Outcome<T, E>) {
        let delivered = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.outcome.is_some() {
                return None;
            }
            state.outcome = Some(outcome);
            Some(state.waker.take())
        });
        // A second delivery means two operations share this slot.
        match delivered {
            Some(Some(w)) => w.wake(),
            Some(None) => (),
            None => panic!(),
        }
    }

    /// Takes the outcome if there is one; otherwise idles briefly.
    #[cfg(sigcore_cortex_m)]
    fn take_or_idle(&self) -> Option<Outcome<T, E>> {
        let re_enable = cortex_m::register::primask::read()
            == cortex_m::register::primask::Primask::Active;
        cortex_m::interrupt::disable();

        // Safety: interrupts are masked, and this is a single core, so
        // nothing can contend for the lock.
        let cs = unsafe { critical_section::CriticalSection::new() };
        let o = self.state.borrow_ref_mut(cs).outcome.take();
        if o.is_none() {
            // WFI wakes on a pending interrupt even while masked.
            cortex_m::asm::wfi();
            cortex_m::asm::isb();
        }

        if re_enable {
            // Safety: interrupts were on when we got here.
            unsafe { cortex_m::interrupt::enable() }
        }
        o
    }

    /// Takes the outcome if there is one; otherwise idles briefly.
    #[cfg(not(sigcore_cortex_m))]
    fn take_or_idle(&self) -> Option<Outcome<T, E>> {
        let o = self.take();
        if o.is_none() {
            core::hint::spin_loop();
        }
        o
    }
}

impl<T, E> Default for Completion<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> core::fmt::Debug for Completion<T, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Completion")
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl<T, E> Receiver<T, E> for &Completion<T, E> {
    fn set_value(self, value: T) {
        self.deliver(Outcome::Success(value))
    }

    fn set_error(self, error: E) {
        self.deliver(Outcome::Error(error))
    }

    fn set_done(self) {
        self.deliver(Outcome::Cancelled)
    }
}

/// Future returned by [`Completion::wait`].
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Wait<'a, T, E> {
    completion: &'a Completion<T, E>,
    finished: bool,
}

impl<T, E> Future for Wait<'_, T, E> {
    type Output = Outcome<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let r = critical_section::with(|cs| {
            let mut state = self.completion.state.borrow_ref_mut(cs);
            match state.outcome.take() {
                Some(o) => Some(o),
                None => {
                    match &mut state.waker {
                        Some(w) => w.clone_from(cx.waker()),
                        slot => *slot = Some(cx.waker().clone()),
                    }
                    None
                }
            }
        });
        match r {
            Some(o) => {
                self.finished = true;
                Poll::Ready(o)
            }
            None => Poll::Pending,
        }
    }
}

impl<T, E> FusedFuture for Wait<'_, T, E> {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}
