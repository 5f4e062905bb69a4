// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interrupt-driven operations: senders, transfers, and the glue between
//! them.
//!
//! # The protocol
//!
//! A driver method like `uart.read(&mut buf)` doesn't start anything. It
//! returns a [`Sender`], which describes the work. You
//! [`connect`][Sender::connect] the sender to a [`Receiver`], which is told
//! the result, and get an [`Operation`]. You pin the operation and
//! [`start`][Operation::start] it. From then on, the operation is driven by
//! its interrupt, and when it's done, the receiver hears about it exactly
//! once.
//!
//! ```ignore
//! let done = Completion::new();
//! let op = pin!(uart.read(&mut buf).connect(&done));
//! op.as_mut().start();
//! match done.block() {
//!     Outcome::Success(n) => ...,
//!     Outcome::Error(UartError::Busy) => ...,
//!     Outcome::Error(e) => ...,
//!     Outcome::Cancelled => unreachable!(),
//! }
//! ```
//!
//! Or, from async code, [`execute`] does all of that for you.
//!
//! # Why pinned?
//!
//! While an operation is running, the interrupt handler holds a pointer to
//! it. If the operation could move, that pointer would dangle. Requiring
//! `Pin<&mut Operation>` to start it means the operation's address is fixed
//! from `start` until it is dropped, and since dropping a running operation
//! cancels it (and unsubscribes the handler), the pointer can never outlive
//! the operation.
//!
//! That argument depends on the operation actually being dropped. An
//! operation that is started and then leaked (say, `Box::pin` followed by
//! `mem::forget`) stays subscribed and keeps using its buffers and receiver
//! after their borrows have ended. Don't do that. Stack pinning with
//! `core::pin::pin!`, or [`execute`], can't leak this way on its own.
//!
//! # Writing a driver
//!
//! Drivers implement [`Transfer`], which is the hardware-specific part:
//! checking for requests that don't need the hardware at all, programming
//! the peripheral, servicing its interrupt, and stopping it. [`Operation`]
//! supplies the rest: signal admission, ordering, cancellation, and
//! delivery. A driver's methods then return [`TransferSender`]s.
//!
//! # Ordering guarantees
//!
//! - If the transfer is [degenerate][Transfer::degenerate] (a zero-length
//!   read, say), `start` delivers success immediately and never touches the
//!   signal or the hardware.
//!
//! - Otherwise, subscribing and programming the peripheral happen inside one
//!   critical section, so the interrupt can't arrive in between.
//!
//! - If the signal is already claimed, the receiver gets a [`Busy`] error
//!   (converted into the transfer's error type) and the hardware is not
//!   touched; it belongs to whoever claimed the signal.
//!
//! - On completion, failure, or cancellation, the peripheral is
//!   [halted][Transfer::halt] and the signal released _before_ the receiver
//!   is told. By the time a receiver runs, nothing in interrupt context
//!   refers to the operation anymore.
//!
//! - An operation only ever releases its own subscription. If something
//!   evicts it with [`Signal::unsubscribe`][crate::signal::Signal::unsubscribe],
//!   it stops hearing interrupts and stays running until it's cancelled or
//!   dropped. At that point the receiver is told `Cancelled`, and if another
//!   operation has claimed the signal in the meantime, its subscription and
//!   its peripheral are left alone.

use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomPinned;
use core::pin::{pin, Pin};
use core::task::Poll;

use crate::outcome::Outcome;
use crate::receiver::{Completion, Receiver};
use crate::signal::SignalEmitter;

/// Error produced when an operation is started on a signal that another
/// operation already holds.
///
/// Driver error types have a `Busy` variant and implement `From<Busy>`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Busy;

impl fmt::Display for Busy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("signal busy")
    }
}

/// The hardware-specific half of an operation.
///
/// [`Operation`] calls these methods in a fixed pattern:
///
/// 1. `degenerate` once, at start. If it returns `Some`, that's the result,
///    and nothing else is called.
/// 2. `begin` once, inside a critical section, right after the signal has
///    been claimed.
/// 3. `service` from interrupt context, each time the signal is raised,
///    until it returns `Ready`.
/// 4. `halt` exactly once, after `service` returns `Ready` or when the
///    operation is cancelled.
pub trait Transfer {
    /// Type produced on success.
    type Value;
    /// Type produced on failure. Must be able to represent [`Busy`].
    type Error: From<Busy>;

    /// Checks whether the request can be satisfied without the hardware,
    /// and if so, produces the value.
    fn degenerate(&mut self) -> Option<Self::Value>;

    /// Programs the peripheral and enables its interrupts.
    fn begin(&mut self);

    /// Services an interrupt. Reads status flags, moves data, and reports
    /// whether the transfer has finished.
    ///
    /// This may be called when there's nothing to do (see the
    /// [`signal`][crate::signal] docs on stale calls), and should return
    /// `Pending` in that case.
    fn service(&mut self) -> Poll<Result<Self::Value, Self::Error>>;

    /// Stops the peripheral: masks its interrupt-enable bits, and aborts any
    /// transfer in progress.
    fn halt(&mut self);
}

/// Something that can be connected to a receiver to produce an operation.
pub trait Sender {
    /// The hardware half of the resulting operation.
    type Transfer: Transfer;

    /// Connects this sender to `receiver`. This has no side effects; nothing
    /// happens until the operation is started.
    fn connect<R>(self, receiver: R) -> Operation<Self::Transfer, R>
        where R: Receiver<SenderValue<Self>, SenderError<Self>>;
}

/// Value type produced by a sender's operations.
pub type SenderValue<S> = <<S as Sender>::Transfer as Transfer>::Value;
/// Error type produced by a sender's operations.
pub type SenderError<S> = <<S as Sender>::Transfer as Transfer>::Error;

/// A [`Sender`] made of a signal and a [`Transfer`]. This is what driver
/// methods usually return.
#[derive(Debug)]
#[must_use = "senders do nothing unless connected and started"]
pub struct TransferSender<X> {
    emitter: SignalEmitter,
    transfer: X,
}

impl<X: Transfer> TransferSender<X> {
    /// Creates a sender that will run `transfer` driven by `emitter`.
    pub fn new(emitter: SignalEmitter, transfer: X) -> Self {
        Self { emitter, transfer }
    }
}

impl<X: Transfer> Sender for TransferSender<X> {
    type Transfer = X;

    fn connect<R>(self, receiver: R) -> Operation<X, R>
        where R: Receiver<X::Value, X::Error>,
    {
        Operation::new(self.emitter, self.transfer, receiver)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    Connected,
    Running,
    Finished,
}

/// Everything the interrupt handler and the main flow share. Only touched
/// inside a critical section.
struct Inner<X, R> {
    transfer: X,
    receiver: Option<R>,
    phase: Phase,
}

/// A transfer connected to a receiver, ready to start.
///
/// See the module docs for the lifecycle. Operations are produced by
/// [`Sender::connect`] (or [`Operation::new`]), must be pinned to be
/// started, and cancel themselves if dropped while running.
pub struct Operation<X, R>
    where X: Transfer,
          R: Receiver<X::Value, X::Error>,
{
    emitter: SignalEmitter,
    inner: UnsafeCell<Inner<X, R>>,
    _pin: PhantomPinned,
}

impl<X, R> Operation<X, R>
    where X: Transfer,
          R: Receiver<X::Value, X::Error>,
{
    /// Creates an operation that runs `transfer`, driven by `emitter`, and
    /// reports to `receiver`.
    pub fn new(emitter: SignalEmitter, transfer: X, receiver: R) -> Self {
        Self {
            emitter,
            inner: UnsafeCell::new(Inner {
                transfer,
                receiver: Some(receiver),
                phase: Phase::Connected,
            }),
            _pin: PhantomPinned,
        }
    }

    /// Starts the operation.
    ///
    /// This either finishes the operation on the spot (degenerate request,
    /// or signal busy) and tells the receiver, or claims the signal and
    /// starts the hardware, in which case the receiver will be told later,
    /// from interrupt context.
    ///
    /// # Panics
    ///
    /// If the operation has already been started.
    pub fn start(self: Pin<&mut Self>) {
        let this = self.into_ref().get_ref();
        let context: *const Self = this;

        let started = critical_section::with(|_| {
            // Safety: we're in a critical section, so the handler can't be
            // running, and the main flow doesn't hold any other reference.
            let inner = unsafe { &mut *this.inner.get() };
            if inner.phase != Phase::Connected {
                return Err(());
            }

            if let Some(v) = inner.transfer.degenerate() {
                inner.phase = Phase::Finished;
                return Ok(inner.receiver.take().map(|r| (r, Outcome::Success(v))));
            }

            // Safety: the context points to this operation, which is pinned,
            // and which unsubscribes in `Drop` before it can go away. The
            // handler only touches it inside a critical section.
            let claimed = unsafe {
                this.emitter.subscribe(on_signal::<X, R>, context.cast())
            };
            if claimed {
                inner.phase = Phase::Running;
                inner.transfer.begin();
                Ok(None)
            } else {
                crate::debug!("operation refused: signal busy");
                inner.phase = Phase::Finished;
                Ok(inner.receiver.take().map(|r| (r, Outcome::Error(X::Error::from(Busy)))))
            }
        });

        match started {
            Ok(Some((r, outcome))) => r.complete(outcome),
            Ok(None) => {
                crate::trace!("operation started");
            }
            // Started twice.
            Err(()) => panic!(),
        }
    }

    /// Cancels the operation if it is running: stops the hardware, releases
    /// the signal, and tells the receiver it was cancelled.
    ///
    /// Returns `true` if the operation was running, `false` if it hadn't
    /// been started or had already finished (in which case nothing happens).
    pub fn cancel(self: Pin<&mut Self>) -> bool {
        self.into_ref().get_ref().stop()
    }

    /// Checks whether the operation has been started and hasn't finished.
    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    /// Checks whether the operation has finished and its receiver has been
    /// told.
    pub fn is_finished(&self) -> bool {
        self.phase() == Phase::Finished
    }

    fn phase(&self) -> Phase {
        critical_section::with(|_| {
            // Safety: critical section; see `start`.
            unsafe { (*self.inner.get()).phase }
        })
    }

    fn stop(&self) -> bool {
        let context: *const Self = self;
        let receiver = critical_section::with(|_| {
            // Safety: critical section; see `start`.
            let inner = unsafe { &mut *self.inner.get() };
            if inner.phase != Phase::Running {
                return None;
            }
            // If someone evicted us and a new owner has since claimed the
            // signal, the peripheral is theirs now.
            let ours = self.emitter.unsubscribe_if(context.cast());
            if ours || !self.emitter.is_subscribed() {
                inner.transfer.halt();
            }
            inner.phase = Phase::Finished;
            Some(inner.receiver.take())
        });
        match receiver {
            Some(r) => {
                crate::trace!("operation cancelled");
                if let Some(r) = r {
                    r.set_done();
                }
                true
            }
            None => false,
        }
    }
}

impl<X, R> Drop for Operation<X, R>
    where X: Transfer,
          R: Receiver<X::Value, X::Error>,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<X, R> fmt::Debug for Operation<X, R>
    where X: Transfer,
          R: Receiver<X::Value, X::Error>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("emitter", &self.emitter)
            .field("phase", &self.phase())
            .finish()
    }
}

/// Interrupt-side entry point, registered with the signal by `start`.
///
/// # Safety
///
/// `context` must point to a live, pinned `Operation<X, R>`.
unsafe fn on_signal<X, R>(context: *const ())
    where X: Transfer,
          R: Receiver<X::Value, X::Error>,
{
    // Safety: our contract.
    let op = unsafe { &*context.cast::<Operation<X, R>>() };

    let finished = critical_section::with(|_| {
        // Safety: critical section; see `start`.
        let inner = unsafe { &mut *op.inner.get() };
        if inner.phase != Phase::Running || !op.emitter.is_subscribed_with(context) {
            // Stale call.
            return None;
        }
        match inner.transfer.service() {
            Poll::Pending => None,
            Poll::Ready(result) => {
                inner.transfer.halt();
                op.emitter.unsubscribe_if(context);
                inner.phase = Phase::Finished;
                Some((inner.receiver.take(), result))
            }
        }
    });

    // From here on, `op` may be freed by whoever is woken, so don't touch
    // it.
    if let Some((receiver, result)) = finished {
        crate::trace!("operation finished");
        if let Some(r) = receiver {
            r.complete(result.into());
        }
    }
}

/// Connects `sender` to a local [`Completion`], starts it, and waits for
/// the outcome.
///
/// # Cancellation
///
/// Dropping the future before it resolves drops the operation, which
/// cancels it: the hardware is halted and the signal released.
pub async fn execute<S: Sender>(sender: S) -> Outcome<SenderValue<S>, SenderError<S>> {
    let done = Completion::new();
    let mut op = pin!(sender.connect(&done));
    op.as_mut().start();
    done.wait().await
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::future::Future;
    use core::task::Context;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use futures::task::{waker, ArcWake};

    use super::*;
    use crate::receiver::receiver_fn;
    use crate::signal::Signal;

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    enum FakeError {
        Busy,
        Fault,
    }

    impl From<Busy> for FakeError {
        fn from(_: Busy) -> Self {
            FakeError::Busy
        }
    }

    /// Stand-in for a peripheral's registers.
    #[derive(Default)]
    struct FakeHw {
        irq_enabled: Cell<bool>,
        began: Cell<usize>,
        halted: Cell<usize>,
        serviced: Cell<usize>,
        fault: Cell<bool>,
    }

    /// Transfer that finishes after `len` interrupts.
    struct FakeTransfer<'a> {
        hw: &'a FakeHw,
        len: usize,
        done: usize,
    }

    impl Transfer for FakeTransfer<'_> {
        type Value = usize;
        type Error = FakeError;

        fn degenerate(&mut self) -> Option<usize> {
            if self.len == 0 { Some(0) } else { None }
        }

        fn begin(&mut self) {
            self.hw.began.set(self.hw.began.get() + 1);
            self.hw.irq_enabled.set(true);
        }

        fn service(&mut self) -> Poll<Result<usize, FakeError>> {
            self.hw.serviced.set(self.hw.serviced.get() + 1);
            if self.hw.fault.get() {
                return Poll::Ready(Err(FakeError::Fault));
            }
            self.done += 1;
            if self.done == self.len {
                Poll::Ready(Ok(self.done))
            } else {
                Poll::Pending
            }
        }

        fn halt(&mut self) {
            self.hw.halted.set(self.hw.halted.get() + 1);
            self.hw.irq_enabled.set(false);
        }
    }

    fn sender<'a>(signal: &'static Signal, hw: &'a FakeHw, len: usize) -> TransferSender<FakeTransfer<'a>> {
        TransferSender::new(signal.emitter(), FakeTransfer { hw, len, done: 0 })
    }

    #[test]
    fn zero_length_succeeds_without_subscribing() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let done = Completion::new();
        let mut op = pin!(sender(&SIGNAL, &hw, 0).connect(&done));
        op.as_mut().start();

        assert_eq!(done.take(), Some(Outcome::Success(0)));
        assert!(!SIGNAL.is_subscribed());
        assert_eq!(hw.began.get(), 0);
        assert!(op.is_finished());
    }

    #[test]
    fn runs_to_completion() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let done = Completion::new();
        let mut op = pin!(sender(&SIGNAL, &hw, 3).connect(&done));
        assert!(!SIGNAL.is_subscribed());
        op.as_mut().start();

        assert!(op.is_running());
        assert!(SIGNAL.is_subscribed());
        assert!(hw.irq_enabled.get());
        assert_eq!(hw.began.get(), 1);

        SIGNAL.raise();
        SIGNAL.raise();
        assert!(!done.is_complete());
        SIGNAL.raise();
        assert_eq!(done.take(), Some(Outcome::Success(3)));
        assert!(!SIGNAL.is_subscribed());
        assert!(!hw.irq_enabled.get());
        assert_eq!(hw.halted.get(), 1);

        // Nobody's listening anymore.
        SIGNAL.raise();
        assert_eq!(hw.serviced.get(), 3);
        assert!(!op.as_mut().cancel());
        assert_eq!(hw.halted.get(), 1);
    }

    #[test]
    fn second_operation_is_busy() {
        static SIGNAL: Signal = Signal::new();
        let hw1 = FakeHw::default();
        let hw2 = FakeHw::default();
        let done1 = Completion::new();
        let done2 = Completion::new();

        let mut op1 = pin!(sender(&SIGNAL, &hw1, 2).connect(&done1));
        let mut op2 = pin!(sender(&SIGNAL, &hw2, 2).connect(&done2));
        op1.as_mut().start();
        op2.as_mut().start();

        assert_eq!(done2.take(), Some(Outcome::Error(FakeError::Busy)));
        assert_eq!(hw2.began.get(), 0);
        assert_eq!(hw2.halted.get(), 0);
        assert!(op2.is_finished());

        // The first one didn't notice.
        assert!(op1.is_running());
        SIGNAL.raise();
        SIGNAL.raise();
        assert_eq!(done1.take(), Some(Outcome::Success(2)));
        assert_eq!(hw2.serviced.get(), 0);
    }

    #[test]
    fn fault_is_reported_after_release() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let seen = Cell::new(None);
        let receiver = receiver_fn(|o: Outcome<usize, FakeError>| {
            // Released and halted before we hear about it.
            assert!(!SIGNAL.is_subscribed());
            assert!(!hw.irq_enabled.get());
            seen.set(Some(o));
        });
        let mut op = pin!(sender(&SIGNAL, &hw, 5).connect(receiver));
        op.as_mut().start();

        SIGNAL.raise();
        hw.fault.set(true);
        SIGNAL.raise();
        assert_eq!(seen.take(), Some(Outcome::Error(FakeError::Fault)));
        assert_eq!(hw.halted.get(), 1);
    }

    #[test]
    fn cancel_reports_cancelled() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let done = Completion::new();
        let mut op = pin!(sender(&SIGNAL, &hw, 2).connect(&done));

        // Not started yet, so nothing to cancel.
        assert!(!op.as_mut().cancel());
        op.as_mut().start();
        assert!(op.as_mut().cancel());

        assert_eq!(done.take(), Some(Outcome::Cancelled));
        assert!(!SIGNAL.is_subscribed());
        assert_eq!(hw.halted.get(), 1);

        SIGNAL.raise();
        assert_eq!(hw.serviced.get(), 0);
        assert!(!op.as_mut().cancel());
    }

    #[test]
    fn drop_cancels() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let done = Completion::new();
        {
            let mut op = pin!(sender(&SIGNAL, &hw, 2).connect(&done));
            op.as_mut().start();
            SIGNAL.raise();
        }
        assert_eq!(done.take(), Some(Outcome::Cancelled));
        assert!(!SIGNAL.is_subscribed());
        assert_eq!(hw.halted.get(), 1);
    }

    #[test]
    fn evicted_operation_leaves_new_owner_alone() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let done1 = Completion::new();
        let done2 = Completion::new();
        {
            let mut op1 = Box::pin(sender(&SIGNAL, &hw, 2).connect(&done1));
            op1.as_mut().start();
            assert!(SIGNAL.unsubscribe());

            // Evicted operations don't hear interrupts.
            SIGNAL.raise();
            assert_eq!(hw.serviced.get(), 0);

            let mut op2 = pin!(sender(&SIGNAL, &hw, 1).connect(&done2));
            op2.as_mut().start();
            assert!(op2.is_running());
            assert_eq!(hw.began.get(), 2);

            drop(op1);
            assert_eq!(done1.take(), Some(Outcome::Cancelled));
            assert!(SIGNAL.is_subscribed());
            assert!(hw.irq_enabled.get());
            assert_eq!(hw.halted.get(), 0);

            SIGNAL.raise();
            assert_eq!(done2.take(), Some(Outcome::Success(1)));
            assert!(!SIGNAL.is_subscribed());
        }
        assert_eq!(hw.halted.get(), 1);
    }

    #[test]
    fn evicted_operation_halts_when_nobody_took_over() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let done = Completion::new();
        let mut op = pin!(sender(&SIGNAL, &hw, 2).connect(&done));
        op.as_mut().start();
        assert!(SIGNAL.unsubscribe());

        assert!(op.as_mut().cancel());
        assert_eq!(done.take(), Some(Outcome::Cancelled));
        assert_eq!(hw.halted.get(), 1);
        assert!(!hw.irq_enabled.get());
    }

    #[test]
    fn drop_without_start_is_quiet() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let done = Completion::new();
        drop(sender(&SIGNAL, &hw, 2).connect(&done));
        assert!(!done.is_complete());
        assert_eq!(hw.halted.get(), 0);
    }

    #[test]
    #[should_panic]
    fn start_twice_panics() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let done = Completion::new();
        let mut op = pin!(sender(&SIGNAL, &hw, 0).connect(&done));
        op.as_mut().start();
        op.as_mut().start();
    }

    #[test]
    fn signal_is_reusable_after_completion() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        for _ in 0..3 {
            let done = Completion::new();
            let mut op = pin!(sender(&SIGNAL, &hw, 1).connect(&done));
            op.as_mut().start();
            SIGNAL.raise();
            assert_eq!(done.take(), Some(Outcome::Success(1)));
        }
        assert_eq!(hw.began.get(), 3);
    }

    struct Spy(AtomicUsize);

    impl ArcWake for Spy {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn execute_resolves_from_interrupt() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let spy = Arc::new(Spy(AtomicUsize::new(0)));
        let w = waker(spy.clone());
        let mut cx = Context::from_waker(&w);

        let mut f = pin!(execute(sender(&SIGNAL, &hw, 2)));
        assert!(f.as_mut().poll(&mut cx).is_pending());
        assert!(SIGNAL.is_subscribed());

        SIGNAL.raise();
        assert_eq!(spy.0.load(Ordering::Relaxed), 0);
        SIGNAL.raise();
        assert_eq!(spy.0.load(Ordering::Relaxed), 1);

        assert_eq!(f.as_mut().poll(&mut cx), Poll::Ready(Outcome::Success(2)));
    }

    #[test]
    fn dropping_execute_cancels() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let w = futures::task::noop_waker();
        let mut cx = Context::from_waker(&w);
        {
            let mut f = Box::pin(execute(sender(&SIGNAL, &hw, 2)));
            assert!(f.as_mut().poll(&mut cx).is_pending());
            assert!(hw.irq_enabled.get());
        }
        assert!(!SIGNAL.is_subscribed());
        assert!(!hw.irq_enabled.get());
        assert_eq!(hw.halted.get(), 1);
    }

    #[test]
    fn execute_degenerate_is_immediate() {
        static SIGNAL: Signal = Signal::new();
        let hw = FakeHw::default();
        let o = futures::executor::block_on(execute(sender(&SIGNAL, &hw, 0)));
        assert_eq!(o, Outcome::Success(0));
        assert_eq!(hw.began.get(), 0);
    }
}
