// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Timekeeping using the SysTick Timer.
//!
//! **Note:** this entire module is only available if the `systick` feature is
//! present; it is on by default.
//!
//! With this module, the SysTick exception does two things: it advances a
//! monotonic counter of milliseconds ("ticks") since boot, and it raises the
//! SysTick slot of the [vector table][crate::vectors]. That second part is
//! what makes timed waits fit the same model as every other interrupt: a
//! [`delay`] is just an operation driven by the tick signal.
//!
//! To use this facility in an application, you need to call
//! [`initialize_sys_tick`] to inform the crate of the system clock speed.
//! Otherwise the counter never moves and delays never finish.
//!
//! You can get the value of tick counter using [`TickTime::now`].
//!
//! # Types for describing time
//!
//! `TickTime` represents a specific point in time, measured as a number of
//! ticks since boot. It's a 64-bit count of milliseconds, which means it
//! overflows every 584 million years. This lets us ignore overflows in
//! timestamps. `TickTime` is analogous to `std::time::Instant`.
//!
//! `Millis` represents a relative time interval in milliseconds. This uses the
//! same representation as `TickTime`, so adding them together is cheap.
//!
//! `core::time::Duration` can be added to a `TickTime` too, but on a smaller
//! CPU you may not want it: almost every `Duration` operation needs a 64-bit
//! multiply or divide.
//!
//! # One delay at a time
//!
//! The tick signal is a signal like any other, so it has one subscriber. A
//! second [`delay`] started while one is running fails with
//! [`Busy`][crate::operation::Busy]. If you need several timers, run them
//! off one delay, or give them their own hardware timer and signal.

use core::ops::{Add, AddAssign};
use core::task::Poll;
use core::time::Duration;

use portable_atomic::{AtomicU32, Ordering};

use crate::operation::{Busy, Transfer, TransferSender};
use crate::signal::SignalEmitter;
use crate::vectors;

/// Bottom 32 bits of the tick counter. Updated by ISR.
static TICK: AtomicU32 = AtomicU32::new(0);
/// Top 32 bits of the tick counter. Updated by ISR.
static EPOCH: AtomicU32 = AtomicU32::new(0);

/// Sets up the tick counter for 1kHz operation, assuming a CPU core clock of
/// `clock_hz`.
#[cfg(sigcore_cortex_m)]
pub fn initialize_sys_tick(syst: &mut cortex_m::peripheral::SYST, clock_hz: u32) {
    use cortex_m::peripheral::syst::SystClkSource;

    let cycles_per_millisecond = clock_hz / 1000;
    syst.set_reload(cycles_per_millisecond - 1);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_interrupt();
    syst.enable_counter();
}

/// Represents a moment in time by the value of the system tick counter.
/// System-specific analog of `std::time::Instant`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickTime(u64);

impl TickTime {
    /// Retrieves the current value of the tick counter.
    pub fn now() -> Self {
        // This loop will only repeat if e != e2, which means we raced the
        // systick ISR. Since that ISR only occurs once per millisecond, this
        // loop should repeat at most twice.
        loop {
            let e = EPOCH.load(Ordering::SeqCst);
            let t = TICK.load(Ordering::SeqCst);
            let e2 = EPOCH.load(Ordering::SeqCst);
            if e == e2 {
                break TickTime((u64::from(e) << 32) | u64::from(t));
            }
        }
    }

    /// Constructs a `TickTime` value describing a certain number of
    /// milliseconds since boot.
    pub fn from_millis_since_boot(m: u64) -> Self {
        Self(m)
    }

    /// Gives the amount of time between `earlier` and `self`, or zero if
    /// `earlier` is actually later.
    pub fn millis_since(self, earlier: TickTime) -> Millis {
        Millis(self.0.saturating_sub(earlier.0))
    }

    /// Checks the clock to determine how much time has elapsed since the
    /// instant recorded by `self`.
    pub fn elapsed(self) -> Millis {
        Self::now().millis_since(self)
    }

    /// Adds some milliseconds to `self`, checking for overflow.
    pub fn checked_add(self, millis: Millis) -> Option<Self> {
        self.0.checked_add(millis.0).map(TickTime)
    }
}

/// Add a `Duration` to a `TickTime` with normal `+` overflow behavior (i.e.
/// checked in debug builds, optionally not checked in release builds).
impl Add<Duration> for TickTime {
    type Output = Self;
    fn add(self, other: Duration) -> Self::Output {
        TickTime(self.0 + other.as_millis() as u64)
    }
}

impl From<TickTime> for u64 {
    fn from(t: TickTime) -> Self {
        t.0
    }
}

/// A period of time measured in milliseconds.
///
/// This plays a role similar to `core::time::Duration` but is cheaper to
/// use: it's the unit the tick counter already counts in, so deadline math
/// is a single 64-bit add.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(pub u64);

/// Adds a number of milliseconds to a `TickTime` with normal `+` overflow
/// behavior.
impl Add<Millis> for TickTime {
    type Output = Self;
    fn add(self, other: Millis) -> Self::Output {
        TickTime(self.0 + other.0)
    }
}

impl AddAssign<Millis> for TickTime {
    fn add_assign(&mut self, other: Millis) {
        self.0 += other.0;
    }
}

impl From<u64> for Millis {
    fn from(x: u64) -> Self {
        Self(x)
    }
}

impl From<Millis> for u64 {
    fn from(x: Millis) -> Self {
        x.0
    }
}

/// Produces a sender that finishes once `interval` has passed, counted from
/// when it's started, driven by the tick signal raised through `emitter`.
///
/// A zero interval finishes as soon as it's started, without claiming the
/// signal. Otherwise the operation holds the signal until it's done, and a
/// second delay on the same signal fails with `Busy`.
///
/// Stopping a delay doesn't stop the timer; other code depends on it.
pub fn delay(emitter: SignalEmitter, interval: Millis) -> TransferSender<Delay> {
    TransferSender::new(emitter, Delay { interval, deadline: TickTime(0) })
}

/// Shorthand for [`delay`] on the SysTick slot of the vector table.
pub fn sleep_for(interval: Millis) -> TransferSender<Delay> {
    delay(vectors::systick(), interval)
}

/// The transfer behind [`delay`].
#[derive(Debug)]
pub struct Delay {
    interval: Millis,
    deadline: TickTime,
}

impl Transfer for Delay {
    type Value = ();
    type Error = Busy;

    fn degenerate(&mut self) -> Option<()> {
        if self.interval.0 == 0 { Some(()) } else { None }
    }

    fn begin(&mut self) {
        self.deadline = TickTime::now() + self.interval;
    }

    fn service(&mut self) -> Poll<Result<(), Busy>> {
        if TickTime::now() >= self.deadline {
            Poll::Ready(Ok(()))
        } else {
            Poll::Pending
        }
    }

    fn halt(&mut self) {}
}

/// Advances the tick counter by one and raises the SysTick slot.
#[cfg_attr(not(sigcore_cortex_m), allow(dead_code))]
fn on_tick() {
    if TICK.fetch_add(1, Ordering::Release) == u32::MAX {
        EPOCH.fetch_add(1, Ordering::Release);
    }
    vectors::raise(vectors::SYSTICK);
}

/// System tick ISR.
#[cfg(sigcore_cortex_m)]
#[doc(hidden)]
#[cortex_m_rt::exception]
fn SysTick() {
    on_tick();
}
