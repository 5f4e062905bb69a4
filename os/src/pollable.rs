// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cooperative, poll-to-completion computations.
//!
//! A [`Pollable`] is the simplest possible kind of future: you call
//! [`poll`][Pollable::poll] until it stops saying [`Status::Pending`], and
//! then you collect either its [`value`][Pollable::value] or its
//! [`error`][Pollable::error]. There's no `Waker` and no `Context`; the
//! assumption is that whoever is polling either has nothing better to do, or
//! is polling from a loop that will come back around soon.
//!
//! This is a good fit for bring-up code and for hardware with a status
//! register you can just go look at. For anything that should sleep until an
//! interrupt arrives, see [`operation`][crate::operation] instead.
//!
//! # Rules
//!
//! - `poll` can be called as often as you like. Intermediate calls may poke
//!   hardware to make progress, but once it has reported `Success` or
//!   `Error`, it keeps reporting the same thing.
//!
//! - `value` may only be called after `poll` has reported `Success`, and
//!   `error` only after `Error`. Anything else is a bug in the caller, and
//!   the pollables in this module panic when it happens.
//!
//! # Combinators
//!
//! - [`map`] transforms the value, lazily, when it's collected.
//! - [`map_err`] does the same for the error.
//! - [`flat_map`] chains a second pollable, built from the first one's value.
//! - [`wait_for`] spins a pollable to completion and gives you an
//!   [`Outcome`].
//!
//! These are also available as methods through [`PollableExt`]:
//!
//! ```
//! use sigcore::pollable::{ready, PollableExt};
//! use sigcore::Outcome;
//!
//! let o = ready::<_, ()>(15)
//!     .flat_map(|x| ready(x + 2))
//!     .map(|x| x * 2)
//!     .wait();
//! assert_eq!(o, Outcome::Success(34));
//! ```
//!
//! In every combinator, the predecessor's value is produced in full before
//! the transform sees it. This holds even when the value is `()` and the
//! transform is only there for its side effects.

use core::future::Future;
use core::marker::PhantomData;
use core::mem;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures::future::FusedFuture;
use pin_project::pin_project;

use crate::outcome::Outcome;

/// What a [`Pollable`] reports when polled.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Not done yet; poll again later.
    Pending,
    /// Done, and `value` can be collected.
    Success,
    /// Done, and `error` can be collected.
    Error,
}

impl Status {
    /// Checks whether this is `Pending`.
    pub fn is_pending(self) -> bool {
        self == Status::Pending
    }
}

/// A computation that can be polled until it finishes.
///
/// See the module docs for the rules.
pub trait Pollable {
    /// Type produced on success.
    type Value;
    /// Type produced on failure.
    type Error;

    /// Checks for (and possibly makes) progress.
    fn poll(&mut self) -> Status;

    /// Collects the value after `poll` has reported `Success`.
    fn value(self) -> Self::Value
        where Self: Sized;

    /// Collects the error after `poll` has reported `Error`.
    fn error(self) -> Self::Error
        where Self: Sized;
}

/// Spins on `pollable` until it finishes, and converts the result into an
/// [`Outcome`].
///
/// This blocks the caller for as long as it takes, and there is deliberately
/// no timeout. If you need to give up at some point, build the wait out of
/// an [operation][crate::operation] instead, where cancelling is a real
/// thing.
pub fn wait_for<P: Pollable>(mut pollable: P) -> Outcome<P::Value, P::Error> {
    loop {
        match pollable.poll() {
            Status::Pending => core::hint::spin_loop(),
            Status::Success => break Outcome::Success(pollable.value()),
            Status::Error => break Outcome::Error(pollable.error()),
        }
    }
}

/// Produces a pollable that has already succeeded with `value`.
pub fn ready<T, E>(value: T) -> Ready<T, E> {
    Ready { value, _error: PhantomData }
}

/// Produces a pollable that succeeds immediately with no value.
pub fn done<E>() -> Ready<(), E> {
    ready(())
}

/// Produces a pollable that has already failed with `error`.
pub fn failed<T, E>(error: E) -> Failed<T, E> {
    Failed { error, _value: PhantomData }
}

/// Produces a pollable that calls `f` each time it's polled, until `f`
/// returns `Some`.
///
/// This is the usual way to wrap a hardware status check:
///
/// ```ignore
/// let flush = poll_fn(|| {
///     let sr = uart.sr.read();
///     if sr.ore().bit() {
///         Some(Err(UartError::Overrun))
///     } else if sr.tc().bit() {
///         Some(Ok(()))
///     } else {
///         None
///     }
/// });
/// ```
///
/// Once `f` has produced a result, it is not called again.
pub fn poll_fn<T, E, F>(f: F) -> PollFn<F, T, E>
    where F: FnMut() -> Option<Result<T, E>>,
{
    PollFn { f, result: None }
}

/// Produces a pollable whose value is `f` applied to `pollable`'s value.
///
/// `poll` passes straight through. `f` runs exactly once, when the value is
/// collected, and only after `pollable` has produced its value. Errors are
/// not touched.
pub fn map<P, F, U>(pollable: P, f: F) -> Map<P, F>
    where P: Pollable,
          F: FnOnce(P::Value) -> U,
{
    Map { inner: pollable, f }
}

/// Produces a pollable whose error is `f` applied to `pollable`'s error.
pub fn map_err<P, F, U>(pollable: P, f: F) -> MapErr<P, F>
    where P: Pollable,
          F: FnOnce(P::Error) -> U,
{
    MapErr { inner: pollable, f }
}

/// Produces a pollable that runs `pollable`, then uses its value to build a
/// second pollable with `f`, and then runs that.
///
/// If `pollable` fails, `f` is never called and the error comes through
/// unchanged. When `pollable` succeeds, it is consumed to produce its value,
/// so it's gone before `f` is called; the two are never alive at once.
pub fn flat_map<P, F, Q>(pollable: P, f: F) -> FlatMap<P, F, Q>
    where P: Pollable,
          F: FnOnce(P::Value) -> Q,
          Q: Pollable<Error = P::Error>,
{
    FlatMap { phase: Phase::First(pollable, f) }
}

/// Extension trait providing the combinators as methods.
///
/// Blanket-implemented for every [`Pollable`].
pub trait PollableExt: Pollable + Sized {
    /// See [`map`].
    fn map<F, U>(self, f: F) -> Map<Self, F>
        where F: FnOnce(Self::Value) -> U,
    {
        map(self, f)
    }

    /// See [`map_err`].
    fn map_err<F, U>(self, f: F) -> MapErr<Self, F>
        where F: FnOnce(Self::Error) -> U,
    {
        map_err(self, f)
    }

    /// See [`flat_map`].
    fn flat_map<F, Q>(self, f: F) -> FlatMap<Self, F, Q>
        where F: FnOnce(Self::Value) -> Q,
              Q: Pollable<Error = Self::Error>,
    {
        flat_map(self, f)
    }

    /// See [`wait_for`].
    fn wait(self) -> Outcome<Self::Value, Self::Error> {
        wait_for(self)
    }

    /// Wraps this pollable in a `Future`.
    ///
    /// The future polls the pollable once each time it's polled. On
    /// `Pending` it wakes its own task before returning, so an executor will
    /// come back around to it after giving everyone else a turn -- the same
    /// behavior as a yield.
    fn into_future(self) -> PollableFuture<Self> {
        PollableFuture { inner: Some(self) }
    }
}

impl<P: Pollable> PollableExt for P {}

/// Pollable that has already succeeded (result of [`ready`] and [`done`]).
#[derive(Copy, Clone, Debug)]
#[must_use = "pollables do nothing unless polled"]
pub struct Ready<T, E> {
    value: T,
    _error: PhantomData<fn() -> E>,
}

impl<T, E> Pollable for Ready<T, E> {
    type Value = T;
    type Error = E;

    fn poll(&mut self) -> Status {
        Status::Success
    }

    fn value(self) -> T {
        self.value
    }

    fn error(self) -> E {
        panic!()
    }
}

/// Pollable that has already failed (result of [`failed`]).
#[derive(Copy, Clone, Debug)]
#[must_use = "pollables do nothing unless polled"]
pub struct Failed<T, E> {
    error: E,
    _value: PhantomData<fn() -> T>,
}

impl<T, E> Pollable for Failed<T, E> {
    type Value = T;
    type Error = E;

    fn poll(&mut self) -> Status {
        Status::Error
    }

    fn value(self) -> T {
        panic!()
    }

    fn error(self) -> E {
        self.error
    }
}

/// Pollable built from a closure (result of [`poll_fn`]).
#[derive(Debug)]
#[must_use = "pollables do nothing unless polled"]
pub struct PollFn<F, T, E> {
    f: F,
    result: Option<Result<T, E>>,
}

impl<F, T, E> Pollable for PollFn<F, T, E>
    where F: FnMut() -> Option<Result<T, E>>,
{
    type Value = T;
    type Error = E;

    fn poll(&mut self) -> Status {
        if self.result.is_none() {
            self.result = (self.f)();
        }
        match self.result {
            None => Status::Pending,
            Some(Ok(_)) => Status::Success,
            Some(Err(_)) => Status::Error,
        }
    }

    fn value(self) -> T {
        match self.result {
            Some(Ok(v)) => v,
            _ => panic!(),
        }
    }

    fn error(self) -> E {
        match self.result {
            Some(Err(e)) => e,
            _ => panic!(),
        }
    }
}

/// Pollable with a transformed value (result of [`map`]).
#[derive(Debug)]
#[must_use = "pollables do nothing unless polled"]
pub struct Map<P, F> {
    inner: P,
    f: F,
}

impl<P, F, U> Pollable for Map<P, F>
    where P: Pollable,
          F: FnOnce(P::Value) -> U,
{
    type Value = U;
    type Error = P::Error;

    fn poll(&mut self) -> Status {
        self.inner.poll()
    }

    fn value(self) -> U {
        // Force the value first, then transform it.
        let v = self.inner.value();
        (self.f)(v)
    }

    fn error(self) -> P::Error {
        self.inner.error()
    }
}

/// Pollable with a transformed error (result of [`map_err`]).
#[derive(Debug)]
#[must_use = "pollables do nothing unless polled"]
pub struct MapErr<P, F> {
    inner: P,
    f: F,
}

impl<P, F, U> Pollable for MapErr<P, F>
    where P: Pollable,
          F: FnOnce(P::Error) -> U,
{
    type Value = P::Value;
    type Error = U;

    fn poll(&mut self) -> Status {
        self.inner.poll()
    }

    fn value(self) -> P::Value {
        self.inner.value()
    }

    fn error(self) -> U {
        let e = self.inner.error();
        (self.f)(e)
    }
}

/// Which half of a `FlatMap` is currently alive.
#[derive(Debug)]
enum Phase<P, F, Q> {
    /// Running the first pollable; holding on to the factory for the second.
    First(P, F),
    /// Running the second pollable.
    Second(Q),
    /// Transient state while we swap halves. Only observable if the factory
    /// panicked.
    Poisoned,
}

/// Pollable chaining two pollables (result of [`flat_map`]).
#[derive(Debug)]
#[must_use = "pollables do nothing unless polled"]
pub struct FlatMap<P, F, Q> {
    phase: Phase<P, F, Q>,
}

impl<P, F, Q> Pollable for FlatMap<P, F, Q>
    where P: Pollable,
          F: FnOnce(P::Value) -> Q,
          Q: Pollable<Error = P::Error>,
{
    type Value = Q::Value;
    type Error = P::Error;

    fn poll(&mut self) -> Status {
        if let Phase::First(first, _) = &mut self.phase {
            match first.poll() {
                Status::Success => {
                    if let Phase::First(first, f) =
                        mem::replace(&mut self.phase, Phase::Poisoned)
                    {
                        let v = first.value();
                        self.phase = Phase::Second(f(v));
                    }
                }
                other => return other,
            }
        }
        match &mut self.phase {
            Phase::Second(second) => second.poll(),
            _ => panic!(),
        }
    }

    fn value(self) -> Q::Value {
        match self.phase {
            Phase::Second(second) => second.value(),
            _ => panic!(),
        }
    }

    fn error(self) -> P::Error {
        match self.phase {
            Phase::First(first, _) => first.error(),
            Phase::Second(second) => second.error(),
            Phase::Poisoned => panic!(),
        }
    }
}

/// Future wrapper around a pollable (result of
/// [`PollableExt::into_future`]).
///
/// The pollable is never pinned, so this future is `Unpin` whatever `P` is.
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[pin_project]
pub struct PollableFuture<P> {
    inner: Option<P>,
}

impl<P: Pollable> Future for PollableFuture<P> {
    type Output = Outcome<P::Value, P::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.project().inner;
        let status = match inner {
            Some(p) => p.poll(),
            // Polled after completion.
            None => panic!(),
        };
        if status.is_pending() {
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        match inner.take() {
            Some(p) if status == Status::Success => {
                Poll::Ready(Outcome::Success(p.value()))
            }
            Some(p) => Poll::Ready(Outcome::Error(p.error())),
            None => panic!(),
        }
    }
}

impl<P: Pollable> FusedFuture for PollableFuture<P> {
    fn is_terminated(&self) -> bool {
        self.inner.is_none()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::{Cell, RefCell};

    use super::*;

    #[test]
    fn wait_for_ready_and_failed() {
        assert_eq!(wait_for(ready::<_, ()>(15)), Outcome::Success(15));
        assert_eq!(wait_for(failed::<(), _>(7)), Outcome::Error(7));
        assert_eq!(wait_for(done::<u8>()), Outcome::Success(()));
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut r = ready::<_, ()>(1);
        assert_eq!(r.poll(), Status::Success);
        assert_eq!(r.poll(), Status::Success);

        let calls = Cell::new(0);
        let mut p = poll_fn(|| {
            calls.set(calls.get() + 1);
            Some(Err::<(), _>(3))
        });
        assert_eq!(p.poll(), Status::Error);
        assert_eq!(p.poll(), Status::Error);
        assert_eq!(calls.get(), 1);
        assert_eq!(p.error(), 3);
    }

    #[test]
    fn map_transforms_value() {
        let o = wait_for(map(ready::<_, ()>(15), |x| x + 2));
        assert_eq!(o, Outcome::Success(17));
    }

    #[test]
    fn map_for_side_effects_runs_once() {
        let runs = Cell::new(0);
        let o = wait_for(map(done::<()>(), |()| runs.set(runs.get() + 1)));
        assert_eq!(o, Outcome::Success(()));
        assert_eq!(runs.get(), 1);

        let runs = Cell::new(0);
        let o = wait_for(map(ready::<_, ()>(4), |_| runs.set(runs.get() + 1)));
        assert!(o.is_success());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn map_is_lazy() {
        let runs = Cell::new(0);
        let mut m = map(ready::<_, ()>(1), |x| {
            runs.set(runs.get() + 1);
            x
        });
        assert_eq!(m.poll(), Status::Success);
        assert_eq!(m.poll(), Status::Success);
        assert_eq!(runs.get(), 0);
        assert_eq!(m.value(), 1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn map_leaves_errors_alone() {
        let runs = Cell::new(0);
        let o = wait_for(map(failed::<u8, _>("bad"), |x| {
            runs.set(runs.get() + 1);
            x
        }));
        assert_eq!(o, Outcome::Error("bad"));
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn map_err_transforms_error() {
        let o = wait_for(map_err(failed::<(), _>(2_u8), u32::from));
        assert_eq!(o, Outcome::Error(2_u32));
        let o = wait_for(map_err(ready::<_, u8>(9), u32::from));
        assert_eq!(o, Outcome::Success(9));
    }

    /// Pollable that records when it's polled and when its value is taken,
    /// and takes a few polls to finish.
    struct Recorder<'a> {
        log: &'a RefCell<Vec<&'static str>>,
        remaining: usize,
    }

    impl Pollable for Recorder<'_> {
        type Value = u32;
        type Error = ();

        fn poll(&mut self) -> Status {
            self.log.borrow_mut().push("poll");
            if self.remaining == 0 {
                Status::Success
            } else {
                self.remaining -= 1;
                Status::Pending
            }
        }

        fn value(self) -> u32 {
            self.log.borrow_mut().push("value");
            10
        }

        fn error(self) {
            panic!()
        }
    }

    impl Drop for Recorder<'_> {
        fn drop(&mut self) {
            self.log.borrow_mut().push("drop");
        }
    }

    #[test]
    fn map_forces_value_before_transform() {
        let log = RefCell::new(vec![]);
        let o = wait_for(map(Recorder { log: &log, remaining: 1 }, |x| {
            log.borrow_mut().push("transform");
            x + 1
        }));
        assert_eq!(o, Outcome::Success(11));
        assert_eq!(
            *log.borrow(),
            ["poll", "poll", "value", "drop", "transform"],
        );
    }

    #[test]
    fn flat_map_chains() {
        let o = wait_for(flat_map(ready::<_, ()>(15), |x| ready(x + 2)));
        assert_eq!(o, Outcome::Success(17));
    }

    #[test]
    fn flat_map_error_skips_factory() {
        let built = Cell::new(false);
        let o = wait_for(flat_map(failed::<u8, _>(5), |x| {
            built.set(true);
            ready(x)
        }));
        assert_eq!(o, Outcome::Error(5));
        assert!(!built.get());
    }

    #[test]
    fn flat_map_second_error_propagates() {
        let o = wait_for(flat_map(ready::<_, u8>(1), |_| failed::<u8, u8>(6)));
        assert_eq!(o, Outcome::Error(6));
    }

    #[test]
    fn flat_map_retires_first_before_second_exists() {
        let log = RefCell::new(vec![]);
        let builds = Cell::new(0);
        let mut fm = flat_map(Recorder { log: &log, remaining: 2 }, |x| {
            builds.set(builds.get() + 1);
            log.borrow_mut().push("build");
            let mut left = 1;
            poll_fn(move || {
                if left == 0 {
                    Some(Ok(x * 3))
                } else {
                    left -= 1;
                    None
                }
            })
        });

        assert_eq!(fm.poll(), Status::Pending);
        assert_eq!(fm.poll(), Status::Pending);
        // First finishes here; second is built and polled once (pending).
        assert_eq!(fm.poll(), Status::Pending);
        assert_eq!(
            *log.borrow(),
            ["poll", "poll", "poll", "value", "drop", "build"],
        );
        assert_eq!(fm.poll(), Status::Success);
        assert_eq!(fm.poll(), Status::Success);
        assert_eq!(builds.get(), 1);
        assert_eq!(fm.value(), 30);
    }

    #[test]
    fn poll_fn_counts_down() {
        let mut n = 3;
        let o = wait_for(poll_fn(|| {
            if n == 0 {
                Some(Ok::<_, ()>("done"))
            } else {
                n -= 1;
                None
            }
        }));
        assert_eq!(o, Outcome::Success("done"));
        assert_eq!(n, 0);
    }

    #[test]
    #[should_panic]
    fn value_of_failed_panics() {
        let _ = failed::<u8, u8>(1).value();
    }

    #[test]
    #[should_panic]
    fn value_of_pending_panics() {
        let mut p = poll_fn(|| None::<Result<u8, u8>>);
        assert_eq!(p.poll(), Status::Pending);
        let _ = p.value();
    }

    #[test]
    fn method_chaining() {
        let o = ready::<_, ()>(15)
            .flat_map(|x| ready(x + 2))
            .map(|x| x * 2)
            .wait();
        assert_eq!(o, Outcome::Success(34));
    }

    #[test]
    fn as_future() {
        let mut n = 2;
        let p = poll_fn(move || {
            if n == 0 {
                Some(Ok::<_, u8>(99))
            } else {
                n -= 1;
                None
            }
        });
        let o = futures::executor::block_on(p.into_future());
        assert_eq!(o, Outcome::Success(99));

        let o = futures::executor::block_on(failed::<(), _>(4_u8).into_future());
        assert_eq!(o, Outcome::Error(4));
    }

    #[test]
    fn future_is_fused_after_completion() {
        use futures::task::noop_waker;

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut f = core::pin::pin!(ready::<_, ()>(1).into_future());
        assert!(!f.is_terminated());
        assert_eq!(f.as_mut().poll(&mut cx), Poll::Ready(Outcome::Success(1)));
        assert!(f.is_terminated());
    }

    /// Pollable that isn't `Unpin`.
    struct Anchored(u8, core::marker::PhantomPinned);

    impl Pollable for Anchored {
        type Value = u8;
        type Error = ();

        fn poll(&mut self) -> Status {
            Status::Success
        }

        fn value(self) -> u8 {
            self.0
        }

        fn error(self) {
            panic!()
        }
    }

    #[test]
    fn future_is_unpin_over_unpinned_pollable() {
        use futures::task::noop_waker;

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut f = Anchored(5, core::marker::PhantomPinned).into_future();
        assert_eq!(Pin::new(&mut f).poll(&mut cx), Poll::Ready(Outcome::Success(5)));
    }
}
