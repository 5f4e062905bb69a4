// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-slot bindings from an interrupt to a handler.
//!
//! A [`Signal`] is the thing an interrupt service routine pokes. It holds at
//! most one _subscription_: a handler function and an opaque context pointer
//! to pass it. When the ISR calls [`Signal::raise`], the handler runs right
//! there, in interrupt context, to completion.
//!
//! There is only ever one subscriber. This is not an oversight: a second
//! attempt to [`subscribe`][Signal::subscribe] while the slot is occupied
//! fails and leaves the original subscription alone. Drivers use that
//! failure to report [`Busy`][crate::operation::Busy] instead of letting two
//! operations fight over one interrupt.
//!
//! Signals are meant to be `static`, and usually live in the process-wide
//! table in [`vectors`][crate::vectors]. A [`SignalEmitter`] is a copyable
//! handle to one, which is what you pass to a driver so it can subscribe
//! without being able to see the rest of the table.
//!
//! # Interaction with the main flow of control
//!
//! `subscribe` and `unsubscribe` update the slot inside a critical section,
//! so an ISR can never observe a half-written subscription, and once
//! `unsubscribe` has returned, no later `raise` will call the old handler.
//!
//! `raise` copies the subscription out of the slot before calling the
//! handler. This means a handler can unsubscribe itself (which is how
//! operations finish), and it means that if a `raise` in the main flow of
//! control gets preempted by an ISR that finishes the subscriber, the main
//! flow may still deliver one stale call. Handlers are expected to tolerate
//! that by checking their own state (and the hardware's status flags) rather
//! than assuming every call means progress.

use core::cell::Cell;
use core::fmt;

use critical_section::Mutex;

/// Function called by [`Signal::raise`], given the context pointer that was
/// registered alongside it.
///
/// This is an `unsafe fn` because the context pointer is type-erased; the
/// handler is responsible for casting it back to whatever it really is.
pub type Handler = unsafe fn(*const ());

/// A registered handler and its context.
#[derive(Copy, Clone)]
struct Subscription {
    handler: Handler,
    context: *const (),
}

// Safety: the context pointer is only ever handed back to the handler that
// was registered with it, and whoever subscribed promised (see
// `Signal::subscribe`) that the pair is fine to use from interrupt context.
unsafe impl Send for Subscription {}

/// A single-subscriber binding from an interrupt source to a handler.
///
/// See the module docs for the model.
pub struct Signal {
    slot: Mutex<Cell<Option<Subscription>>>,
}

impl Signal {
    /// Creates a `Signal` with nobody subscribed.
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(None)),
        }
    }

    /// Registers `handler` to be called with `context` each time this signal
    /// is raised.
    ///
    /// Returns `true` if the subscription was installed, or `false` if
    /// someone else was already subscribed -- in which case nothing changes.
    ///
    /// # Safety
    ///
    /// Until the matching `unsubscribe` returns, `context` must stay valid
    /// for whatever `handler` does with it, and it must be fine to call
    /// `handler(context)` from interrupt context at any point, including
    /// concurrently with the code that subscribed.
    pub unsafe fn subscribe(&self, handler: Handler, context: *const ()) -> bool {
        critical_section::with(|cs| {
            let slot = self.slot.borrow(cs);
            if slot.get().is_some() {
                crate::debug!("signal already claimed");
                false
            } else {
                slot.set(Some(Subscription { handler, context }));
                true
            }
        })
    }

    /// Registers a plain function, with no context, to be called each time
    /// this signal is raised.
    ///
    /// This has the same single-subscriber behavior as
    /// [`subscribe`][Signal::subscribe], but since there's no context to keep
    /// alive, it's safe.
    pub fn subscribe_fn(&self, f: fn()) -> bool {
        // Safety: the context is the function pointer itself, which is
        // 'static, and `call_plain_fn` turns it back into the same `fn()`.
        unsafe { self.subscribe(call_plain_fn, f as *const ()) }
    }

    /// Removes the current subscription.
    ///
    /// Returns `true` if there was one, `false` if the slot was already
    /// empty.
    pub fn unsubscribe(&self) -> bool {
        critical_section::with(|cs| self.slot.borrow(cs).take().is_some())
    }

    /// Removes the current subscription, but only if it was registered with
    /// `context`.
    ///
    /// Returns `true` if that subscription was removed. If the slot is empty,
    /// or someone else holds it, nothing changes and this returns `false`.
    /// This is how an owner lets go of a signal without clobbering whoever
    /// subscribed after it was evicted by [`unsubscribe`][Signal::unsubscribe].
    pub fn unsubscribe_if(&self, context: *const ()) -> bool {
        critical_section::with(|cs| {
            let slot = self.slot.borrow(cs);
            match slot.get() {
                Some(sub) if sub.context == context => {
                    slot.set(None);
                    true
                }
                _ => false,
            }
        })
    }

    /// Checks whether anyone is subscribed.
    pub fn is_subscribed(&self) -> bool {
        critical_section::with(|cs| self.slot.borrow(cs).get().is_some())
    }

    /// Checks whether the current subscription was registered with
    /// `context`.
    pub fn is_subscribed_with(&self, context: *const ()) -> bool {
        critical_section::with(|cs| {
            matches!(self.slot.borrow(cs).get(), Some(sub) if sub.context == context)
        })
    }

    /// Calls the subscribed handler, if any, with its context. Does nothing
    /// if nobody is subscribed.
    ///
    /// This is intended to be called from the interrupt service routine for
    /// the event this signal represents. It's safe to call from anywhere, but
    /// see the module docs about stale calls.
    pub fn raise(&self) {
        let sub = critical_section::with(|cs| self.slot.borrow(cs).get());
        if let Some(Subscription { handler, context }) = sub {
            // Safety: `subscribe`'s contract requires that the pair be
            // callable from interrupt context until unsubscribed, and we
            // observed it subscribed.
            unsafe { handler(context) }
        }
    }

    /// Produces a copyable handle to this signal.
    pub fn emitter(&'static self) -> SignalEmitter {
        SignalEmitter(self)
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

/// Implement Debug by hand so it doesn't try to print function pointers.
impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

/// Trampoline used by `subscribe_fn`.
///
/// # Safety
///
/// `context` must have been produced by casting an `fn()` to a pointer.
unsafe fn call_plain_fn(context: *const ()) {
    // Safety: fn pointers and data pointers have the same size on every
    // target we support, and our contract says this came from an `fn()`.
    let f = unsafe { core::mem::transmute::<*const (), fn()>(context) };
    f()
}

/// A copyable handle to a `'static` [`Signal`].
///
/// Emitters are how drivers get the ability to subscribe to "their"
/// interrupt without getting the whole vector table. They don't own
/// anything; copying one is copying a pointer.
#[derive(Copy, Clone)]
pub struct SignalEmitter(&'static Signal);

impl SignalEmitter {
    /// See [`Signal::subscribe`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Signal::subscribe`].
    pub unsafe fn subscribe(self, handler: Handler, context: *const ()) -> bool {
        // Safety: passed through from our caller.
        unsafe { self.0.subscribe(handler, context) }
    }

    /// See [`Signal::subscribe_fn`].
    pub fn subscribe_fn(self, f: fn()) -> bool {
        self.0.subscribe_fn(f)
    }

    /// See [`Signal::unsubscribe`].
    pub fn unsubscribe(self) -> bool {
        self.0.unsubscribe()
    }

    /// See [`Signal::unsubscribe_if`].
    pub fn unsubscribe_if(self, context: *const ()) -> bool {
        self.0.unsubscribe_if(context)
    }

    /// See [`Signal::is_subscribed`].
    pub fn is_subscribed(self) -> bool {
        self.0.is_subscribed()
    }

    /// See [`Signal::is_subscribed_with`].
    pub fn is_subscribed_with(self, context: *const ()) -> bool {
        self.0.is_subscribed_with(context)
    }

    /// See [`Signal::raise`].
    pub fn raise(self) {
        self.0.raise()
    }

    /// Gets the signal this refers to.
    pub fn signal(self) -> &'static Signal {
        self.0
    }

    /// Checks whether two emitters refer to the same signal.
    pub fn same_signal(self, other: SignalEmitter) -> bool {
        core::ptr::eq(self.0, other.0)
    }
}

impl From<&'static Signal> for SignalEmitter {
    fn from(s: &'static Signal) -> Self {
        SignalEmitter(s)
    }
}

impl fmt::Debug for SignalEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p: *const Signal = self.0;
        f.debug_tuple("SignalEmitter").field(&p).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{Signal, SignalEmitter};

    /// Handler that bumps the `AtomicUsize` its context points to.
    unsafe fn bump(context: *const ()) {
        let counter = unsafe { &*(context as *const AtomicUsize) };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn subscribe_is_single_slot() {
        static SIGNAL: Signal = Signal::new();
        static FIRST: AtomicUsize = AtomicUsize::new(0);
        static SECOND: AtomicUsize = AtomicUsize::new(0);

        let first = &FIRST as *const AtomicUsize as *const ();
        let second = &SECOND as *const AtomicUsize as *const ();

        assert!(unsafe { SIGNAL.subscribe(bump, first) });
        assert!(!unsafe { SIGNAL.subscribe(bump, second) });

        // The refused subscription must not have replaced the first.
        SIGNAL.raise();
        assert_eq!(FIRST.load(Ordering::Relaxed), 1);
        assert_eq!(SECOND.load(Ordering::Relaxed), 0);

        assert!(SIGNAL.unsubscribe());
    }

    #[test]
    fn unsubscribe_twice() {
        static SIGNAL: Signal = Signal::new();
        assert!(!SIGNAL.unsubscribe());
        assert!(SIGNAL.subscribe_fn(|| ()));
        assert!(SIGNAL.is_subscribed());
        assert!(SIGNAL.unsubscribe());
        assert!(!SIGNAL.unsubscribe());
        assert!(!SIGNAL.is_subscribed());
    }

    #[test]
    fn raise_after_unsubscribe_does_nothing() {
        static SIGNAL: Signal = Signal::new();
        static COUNT: AtomicUsize = AtomicUsize::new(0);
        let ctx = &COUNT as *const AtomicUsize as *const ();

        assert!(unsafe { SIGNAL.subscribe(bump, ctx) });
        SIGNAL.raise();
        SIGNAL.raise();
        assert_eq!(COUNT.load(Ordering::Relaxed), 2);

        assert!(SIGNAL.unsubscribe());
        SIGNAL.raise();
        assert_eq!(COUNT.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn raise_with_nobody_home() {
        static SIGNAL: Signal = Signal::new();
        SIGNAL.raise();
        assert!(!SIGNAL.is_subscribed());
    }

    #[test]
    fn plain_fn_subscription() {
        static SIGNAL: Signal = Signal::new();
        static COUNT: AtomicUsize = AtomicUsize::new(0);
        fn tick() {
            COUNT.fetch_add(1, Ordering::Relaxed);
        }

        assert!(SIGNAL.subscribe_fn(tick));
        for _ in 0..3 {
            SIGNAL.raise();
        }
        assert_eq!(COUNT.load(Ordering::Relaxed), 3);
        assert!(SIGNAL.unsubscribe());
    }

    #[test]
    fn handler_can_unsubscribe_itself() {
        static SIGNAL: Signal = Signal::new();
        static COUNT: AtomicUsize = AtomicUsize::new(0);
        fn once() {
            COUNT.fetch_add(1, Ordering::Relaxed);
            assert!(SIGNAL.unsubscribe());
        }

        assert!(SIGNAL.subscribe_fn(once));
        SIGNAL.raise();
        SIGNAL.raise();
        assert_eq!(COUNT.load(Ordering::Relaxed), 1);
        assert!(!SIGNAL.is_subscribed());
    }

    #[test]
    fn unsubscribe_if_leaves_other_owners_alone() {
        static SIGNAL: Signal = Signal::new();
        static FIRST: AtomicUsize = AtomicUsize::new(0);
        static SECOND: AtomicUsize = AtomicUsize::new(0);

        let first = &FIRST as *const AtomicUsize as *const ();
        let second = &SECOND as *const AtomicUsize as *const ();

        assert!(!SIGNAL.unsubscribe_if(first));
        assert!(unsafe { SIGNAL.subscribe(bump, first) });
        assert!(SIGNAL.is_subscribed_with(first));

        // Evicted, and the slot handed to someone else.
        assert!(SIGNAL.unsubscribe());
        assert!(unsafe { SIGNAL.subscribe(bump, second) });
        assert!(!SIGNAL.is_subscribed_with(first));

        assert!(!SIGNAL.unsubscribe_if(first));
        SIGNAL.raise();
        assert_eq!(FIRST.load(Ordering::Relaxed), 0);
        assert_eq!(SECOND.load(Ordering::Relaxed), 1);

        assert!(SIGNAL.emitter().unsubscribe_if(second));
        assert!(!SIGNAL.is_subscribed());
    }

    #[test]
    fn emitters_share_the_slot() {
        static SIGNAL: Signal = Signal::new();
        static OTHER: Signal = Signal::new();
        let a = SIGNAL.emitter();
        let b: SignalEmitter = (&SIGNAL).into();
        assert!(a.same_signal(b));
        assert!(!a.same_signal(OTHER.emitter()));

        assert!(a.subscribe_fn(|| ()));
        assert!(b.is_subscribed());
        assert!(!b.subscribe_fn(|| ()));
        assert!(b.unsubscribe());
        assert!(!a.is_subscribed());
    }
}
