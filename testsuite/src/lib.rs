// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! sigcore on-target test suite.
//!
//! The test suite is SoC-independent; it only relies on the Cortex-M core
//! peripherals (NVIC and SysTick) and on interrupts 0 and 1 not being used by
//! anything else. See the `lm3s6965` directory for a wrapper that runs it
//! under QEMU.
//!
//! The host unit tests cover each piece in isolation with fake hardware.
//! These cover the part that can't be faked: a real exception entering
//! through the `DefaultHandler` and `SysTick` entry points, landing in the
//! vector table, and driving an operation to completion.

#![no_std]

mod pend;
mod timing;

use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll};

use cortex_m_semihosting::{debug, hprintln};
use sigcore::halt::{halt, Halt};
use sigcore::pollable::{ready, PollableExt};
use sigcore::{time, Outcome};

macro_rules! tests {
    ($($(#[$attr:meta])* $name:path,)*) => {
        $(
            $(#[$attr])*
            {
                cortex_m_semihosting::hprint!(concat!(stringify!($name), "... "));
                $name();
                cortex_m_semihosting::hprintln!("OK");
            }
         )*
    };
}

/// Runs all the tests, and exits QEMU (or the debugger session) with
/// success. Failures panic, and the panic handler takes it from there.
pub fn run_test_suite(hz: u32) -> ! {
    // Check out peripherals from the runtime.
    let mut cp = match cortex_m::Peripherals::take() {
        Some(cp) => cp,
        None => halt(Halt::Peripheral),
    };
    time::initialize_sys_tick(&mut cp.SYST, hz);

    tests! {
        test_outcome_basics,
        test_pollable_chain,

        pend::test_default_handler_raises_slot,
        pend::test_unclaimed_interrupt_is_ignored,
        pend::test_operation_runs_from_interrupts,
        pend::test_second_operation_is_busy,
        pend::test_cancel_masks_interrupt,
        pend::test_drop_cancels,

        timing::test_clock_advancing,
        timing::test_pollable_deadline,
        timing::test_delay,
        timing::test_zero_delay,
        timing::test_delay_busy,
        timing::test_execute_delay,
    }

    hprintln!("tests complete.");
    debug::exit(debug::EXIT_SUCCESS);

    // Only reached when not running under a semihosting host that honors
    // exit.
    loop {
        cortex_m::asm::wfi();
    }
}

fn test_outcome_basics() {
    let s: Outcome<u32, ()> = Outcome::Success(3);
    assert!(s.is_success());
    assert_eq!(s.value(), 3);
    assert_eq!(Outcome::<u32, ()>::Cancelled, Outcome::Cancelled);
    assert_ne!(Outcome::<u32, u32>::Success(1), Outcome::Error(1));
}

fn test_pollable_chain() {
    let o = ready::<_, ()>(15).flat_map(|x| ready(x + 2)).wait();
    assert_eq!(o, Outcome::Success(17));
}

///////////////////////////////////////////////////////////////////////////////
// Utility functions

/// Polls `f` to completion, sleeping between polls.
///
/// There's no waker plumbing here: the future is simply polled again after
/// every interrupt. The SysTick keeps that from stalling for more than a
/// millisecond if a wakeup arrives between the poll and the `WFI`.
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    let mut f = pin!(f);
    let waker = futures::task::noop_waker();
    let mut cx = Context::from_waker(&waker);
    loop {
        if let Poll::Ready(v) = f.as_mut().poll(&mut cx) {
            break v;
        }
        cortex_m::asm::wfi();
    }
}
