// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The terminal result of an asynchronous operation.
//!
//! `Result<T, E>` has two arms, and that's one too few for hardware. A DMA
//! transfer can finish, it can fail because the bus reported an error, or it
//! can be _abandoned_ because the code that asked for it stopped caring. The
//! last case isn't a failure of the transfer, and lumping it in with real
//! errors makes it hard to tell "the hardware is broken" from "we changed our
//! minds." So every operation in this crate ends in an [`Outcome`], which has
//! a third arm for that: [`Outcome::Cancelled`].
//!
//! Either payload type can be `()` if there's nothing to carry.
//!
//! # Reading an `Outcome`
//!
//! The usual way is to `match` on it. For the common case where you know
//! (because you just checked, or because the program is wrong otherwise)
//! which arm is active, [`Outcome::value`] and [`Outcome::error`] extract the
//! payload and panic on the wrong arm. The non-panicking versions are
//! [`Outcome::success`] and [`Outcome::failure`].

use core::fmt;

/// Terminal result of an asynchronous operation: it worked and produced a
/// `T`, it failed with an `E`, or it was cancelled before it got that far.
///
/// Since this is a plain `enum`, only the active arm's payload is ever
/// cloned or dropped, and an `Outcome` needs no drop glue at all when
/// neither `T` nor `E` does.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use = "an Outcome may be an error or a cancellation, which should be handled"]
pub enum Outcome<T, E> {
    /// The operation completed and produced a value.
    Success(T),
    /// The operation failed.
    Error(E),
    /// The operation was abandoned before it completed.
    Cancelled,
}

impl<T, E> Outcome<T, E> {
    /// Checks whether this is `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Checks whether this is `Error`.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Checks whether this is `Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Extracts the success value.
    ///
    /// # Panics
    ///
    /// If this is not `Success`. Reaching for the value of a failed or
    /// cancelled operation is a logic error in the caller.
    pub fn value(self) -> T {
        match self {
            Self::Success(v) => v,
            _ => panic!(),
        }
    }

    /// Extracts the error value.
    ///
    /// # Panics
    ///
    /// If this is not `Error`.
    pub fn error(self) -> E {
        match self {
            Self::Error(e) => e,
            _ => panic!(),
        }
    }

    /// Converts into `Some(value)` if this is `Success`, `None` otherwise.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Converts into `Some(error)` if this is `Error`, `None` otherwise.
    pub fn failure(self) -> Option<E> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Borrows the payload, producing an `Outcome` of references.
    pub fn as_ref(&self) -> Outcome<&T, &E> {
        match self {
            Self::Success(v) => Outcome::Success(v),
            Self::Error(e) => Outcome::Error(e),
            Self::Cancelled => Outcome::Cancelled,
        }
    }

    /// Transforms the success value with `f`, leaving the other arms alone.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U, E> {
        match self {
            Self::Success(v) => Outcome::Success(f(v)),
            Self::Error(e) => Outcome::Error(e),
            Self::Cancelled => Outcome::Cancelled,
        }
    }

    /// Transforms the error value with `f`, leaving the other arms alone.
    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Outcome<T, F> {
        match self {
            Self::Success(v) => Outcome::Success(v),
            Self::Error(e) => Outcome::Error(f(e)),
            Self::Cancelled => Outcome::Cancelled,
        }
    }

    /// Converts into a two-arm `Result`, or `None` if this was cancelled.
    pub fn into_result(self) -> Option<Result<T, E>> {
        match self {
            Self::Success(v) => Some(Ok(v)),
            Self::Error(e) => Some(Err(e)),
            Self::Cancelled => None,
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(r: Result<T, E>) -> Self {
        match r {
            Ok(v) => Self::Success(v),
            Err(e) => Self::Error(e),
        }
    }
}

impl<T: fmt::Display, E: fmt::Display> fmt::Display for Outcome<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(v) => write!(f, "success: {}", v),
            Self::Error(e) => write!(f, "error: {}", e),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::mem::needs_drop;

    use super::Outcome;

    /// Payload that counts how many times it is cloned and dropped.
    #[derive(Debug)]
    struct Tracked<'a> {
        clones: &'a Cell<usize>,
        drops: &'a Cell<usize>,
    }

    impl Clone for Tracked<'_> {
        fn clone(&self) -> Self {
            self.clones.set(self.clones.get() + 1);
            Tracked { clones: self.clones, drops: self.drops }
        }
    }

    impl Drop for Tracked<'_> {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    struct Counters {
        clones: Cell<usize>,
        drops: Cell<usize>,
    }

    impl Counters {
        fn new() -> Self {
            Self { clones: Cell::new(0), drops: Cell::new(0) }
        }

        fn tracked(&self) -> Tracked<'_> {
            Tracked { clones: &self.clones, drops: &self.drops }
        }
    }

    #[test]
    fn drop_glue_follows_payloads() {
        assert!(!needs_drop::<Outcome<u32, ()>>());
        assert!(!needs_drop::<Outcome<(), ()>>());
        assert!(!needs_drop::<Outcome<[u8; 4], u16>>());

        assert!(needs_drop::<Outcome<Tracked<'static>, ()>>());
        assert!(needs_drop::<Outcome<(), Tracked<'static>>>());
    }

    #[test]
    fn success_clone_and_drop_touch_only_the_value() {
        let ok = Counters::new();
        let err = Counters::new();
        {
            let o: Outcome<Tracked<'_>, Tracked<'_>> =
                Outcome::Success(ok.tracked());
            let copy = o.clone();
            assert!(copy.is_success());
            assert_eq!(ok.clones.get(), 1);
            assert_eq!(ok.drops.get(), 0);
        }
        assert_eq!(ok.drops.get(), 2);
        assert_eq!(err.clones.get(), 0);
        assert_eq!(err.drops.get(), 0);
    }

    #[test]
    fn error_clone_and_drop_touch_only_the_error() {
        let ok = Counters::new();
        let err = Counters::new();
        {
            let o: Outcome<Tracked<'_>, Tracked<'_>> =
                Outcome::Error(err.tracked());
            let _copy = o.clone();
        }
        assert_eq!(err.clones.get(), 1);
        assert_eq!(err.drops.get(), 2);
        assert_eq!(ok.clones.get(), 0);
        assert_eq!(ok.drops.get(), 0);
    }

    #[test]
    fn moving_does_not_clone_or_drop() {
        let ok = Counters::new();
        let o: Outcome<Tracked<'_>, ()> = Outcome::Success(ok.tracked());
        let moved = o;
        assert_eq!(ok.clones.get(), 0);
        assert_eq!(ok.drops.get(), 0);
        drop(moved);
        assert_eq!(ok.drops.get(), 1);
    }

    #[test]
    fn reassignment_drops_previous_payload() {
        let first = Counters::new();
        let second = Counters::new();
        let mut o: Outcome<Tracked<'_>, ()> = Outcome::Success(first.tracked());
        o = Outcome::Success(second.tracked());
        assert_eq!(first.drops.get(), 1);
        assert_eq!(second.drops.get(), 0);
        o = Outcome::Cancelled;
        assert_eq!(second.drops.get(), 1);
        assert!(o.is_cancelled());
    }

    #[test]
    fn equality() {
        assert_eq!(Outcome::<u32, u32>::Cancelled, Outcome::Cancelled);
        assert_eq!(Outcome::<(), ()>::Cancelled, Outcome::Cancelled);
        assert_eq!(Outcome::<u32, u32>::Success(3), Outcome::Success(3));
        assert_ne!(Outcome::<u32, u32>::Success(3), Outcome::Success(4));
        assert_ne!(Outcome::<u32, u32>::Success(3), Outcome::Error(3));
        assert_ne!(Outcome::<u32, u32>::Error(3), Outcome::Cancelled);
        assert_eq!(Outcome::<(), u8>::Error(9), Outcome::Error(9));
    }

    #[test]
    fn queries() {
        let s: Outcome<u8, u8> = Outcome::Success(1);
        let e: Outcome<u8, u8> = Outcome::Error(2);
        let c: Outcome<u8, u8> = Outcome::Cancelled;
        assert!(s.is_success() && !s.is_error() && !s.is_cancelled());
        assert!(!e.is_success() && e.is_error() && !e.is_cancelled());
        assert!(!c.is_success() && !c.is_error() && c.is_cancelled());

        assert_eq!(s.value(), 1);
        assert_eq!(e.error(), 2);
        assert_eq!(s.success(), Some(1));
        assert_eq!(e.success(), None);
        assert_eq!(e.failure(), Some(2));
        assert_eq!(c.failure(), None);
    }

    #[test]
    #[should_panic]
    fn value_of_error_panics() {
        let e: Outcome<u8, u8> = Outcome::Error(2);
        let _ = e.value();
    }

    #[test]
    #[should_panic]
    fn error_of_cancelled_panics() {
        let c: Outcome<u8, u8> = Outcome::Cancelled;
        let _ = c.error();
    }

    #[test]
    fn conversions() {
        let s: Outcome<u8, &str> = Ok(5).into();
        assert_eq!(s, Outcome::Success(5));
        let e: Outcome<u8, &str> = Err("nope").into();
        assert_eq!(e, Outcome::Error("nope"));

        assert_eq!(s.map(|x| x * 2), Outcome::Success(10));
        assert_eq!(e.map_err(str::len), Outcome::Error(4));
        assert_eq!(s.into_result(), Some(Ok(5)));
        assert_eq!(Outcome::<u8, u8>::Cancelled.into_result(), None);
        assert_eq!(s.as_ref(), Outcome::Success(&5));
    }
}
