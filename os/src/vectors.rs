// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The process-wide table of interrupt signals.
//!
//! There is one [`Signal`] per interrupt vector, stored in a fixed-size
//! `static` array. The array is constant-initialized, so it's ready before
//! the first instruction of `main` runs -- which is to say, before anybody
//! can enable an interrupt -- and it never moves, grows, or goes away.
//!
//! The table is indexed by Cortex-M exception number, the same number the
//! hardware reports in `ICSR.VECTACTIVE`: external interrupt `n` lives at
//! slot `16 + n`. The one exception is SysTick, which lives at slot 0, so
//! that "the tick signal" has the same index on every part. Slots 1 through
//! 15 are never raised by the handlers here; the other system exceptions
//! (faults, SVCall, PendSV) aren't interrupts a driver can wait on.
//!
//! # Entry points
//!
//! With the `handler` feature (on by default), this module installs the
//! `cortex-m-rt` `DefaultHandler`. Any interrupt you haven't given a
//! dedicated handler raises its slot in the table. That means that for most
//! peripherals, all you need to do is unmask the interrupt in the NVIC and
//! hand the driver the right emitter:
//!
//! ```ignore
//! let uart = Uart::new(regs, sigcore::vectors::irq(device::Interrupt::USART3 as u16));
//! unsafe { cortex_m::peripheral::NVIC::unmask(device::Interrupt::USART3) };
//! ```
//!
//! If you'd rather write the ISR yourself (say, because it needs to clear a
//! status flag before returning), turn off the feature, or just define a
//! handler for that one interrupt and call [`raise`] from it.
//!
//! The SysTick exception raises slot 0; see the [`time`][crate::time] module
//! for the version of that handler that also keeps time.

use crate::signal::{Signal, SignalEmitter};

cfg_if::cfg_if! {
    if #[cfg(sigcore_armv6m)] {
        /// Number of slots in the table. ARMv6-M supports at most 32 external
        /// interrupts.
        pub const VECTOR_COUNT: usize = FIRST_IRQ + 32;
    } else {
        /// Number of slots in the table. ARMv7-M and ARMv8-M support up to 240
        /// external interrupts.
        pub const VECTOR_COUNT: usize = FIRST_IRQ + 240;
    }
}

/// Slot used for the SysTick exception.
pub const SYSTICK: usize = 0;

/// Slot of external interrupt 0; external interrupt `n` is at
/// `FIRST_IRQ + n`.
pub const FIRST_IRQ: usize = 16;

/// Exception number the hardware uses for SysTick.
const SYSTICK_EXCEPTION: usize = 15;

#[allow(clippy::declare_interior_mutable_const)]
const IDLE: Signal = Signal::new();

static SIGNALS: [Signal; VECTOR_COUNT] = [IDLE; VECTOR_COUNT];

/// Gets the emitter for table slot `vector`, or `None` if it's out of range.
pub fn get(vector: usize) -> Option<SignalEmitter> {
    SIGNALS.get(vector).map(Signal::emitter)
}

/// Gets the emitter for external interrupt number `irq`.
///
/// # Panics
///
/// If `irq` is past the number of interrupts the architecture supports.
pub fn irq(irq: u16) -> SignalEmitter {
    let vector = FIRST_IRQ + usize::from(irq);
    cheap_assert!(vector < VECTOR_COUNT);
    SIGNALS[vector].emitter()
}

/// Gets the emitter for a device interrupt, using the PAC's interrupt enum.
#[cfg(sigcore_cortex_m)]
pub fn interrupt<I: cortex_m::interrupt::InterruptNumber>(i: I) -> SignalEmitter {
    irq(i.number())
}

/// Gets the emitter for the SysTick slot.
pub fn systick() -> SignalEmitter {
    SIGNALS[SYSTICK].emitter()
}

/// Raises the signal at table slot `vector`. Out-of-range slots are ignored,
/// so this is safe to call with whatever number the hardware hands you.
pub fn raise(vector: usize) {
    if let Some(s) = SIGNALS.get(vector) {
        s.raise();
    }
}

/// Maps a Cortex-M exception number (as found in `ICSR.VECTACTIVE`) to the
/// table slot that represents it.
///
/// Only SysTick and external interrupts have slots. Other system exceptions
/// (SVCall, PendSV, faults) give `None`.
pub fn slot_for_exception(exception: usize) -> Option<usize> {
    if exception == SYSTICK_EXCEPTION {
        Some(SYSTICK)
    } else if exception >= FIRST_IRQ {
        Some(exception)
    } else {
        None
    }
}

/// Generic interrupt entry point. `irqn` is the exception number minus 16,
/// so it's negative for system exceptions.
#[cfg(all(sigcore_cortex_m, feature = "handler"))]
#[doc(hidden)]
#[cortex_m_rt::exception]
unsafe fn DefaultHandler(irqn: i16) {
    let exception = (i32::from(irqn) + FIRST_IRQ as i32) as usize;
    if let Some(slot) = slot_for_exception(exception) {
        raise(slot);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn irq_slots_are_offset() {
        assert!(irq(0).same_signal(get(FIRST_IRQ).unwrap()));
        assert!(irq(5).same_signal(get(FIRST_IRQ + 5).unwrap()));
        assert!(systick().same_signal(get(SYSTICK).unwrap()));
        assert!(!systick().same_signal(irq(0)));
        assert!(get(VECTOR_COUNT).is_none());
    }

    #[test]
    #[should_panic]
    fn irq_out_of_range() {
        let _ = irq((VECTOR_COUNT - FIRST_IRQ) as u16);
    }

    #[test]
    fn raise_by_slot() {
        static COUNT: AtomicUsize = AtomicUsize::new(0);
        fn handler() {
            COUNT.fetch_add(1, Ordering::Relaxed);
        }

        let e = irq(40);
        assert!(e.subscribe_fn(handler));
        raise(FIRST_IRQ + 40);
        raise(FIRST_IRQ + 41);
        assert_eq!(COUNT.load(Ordering::Relaxed), 1);
        assert!(e.unsubscribe());
    }

    #[test]
    fn raise_out_of_range_is_ignored() {
        raise(VECTOR_COUNT);
        raise(usize::MAX);
    }

    #[test]
    fn systick_exception_maps_to_slot_zero() {
        assert_eq!(slot_for_exception(15), Some(SYSTICK));
        assert_eq!(slot_for_exception(16), Some(FIRST_IRQ));
        assert_eq!(slot_for_exception(FIRST_IRQ + 7), Some(FIRST_IRQ + 7));
    }

    #[test]
    fn other_system_exceptions_have_no_slot() {
        // NMI, HardFault, SVCall, PendSV.
        for exception in [2, 3, 11, 14] {
            assert_eq!(slot_for_exception(exception), None);
        }
    }
}
