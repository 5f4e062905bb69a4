// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests driven by pending interrupts in the NVIC by hand.

use core::pin::pin;
use core::sync::atomic::{AtomicUsize, Ordering};
use core::task::Poll;

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;
use sigcore::operation::{Busy, Transfer, TransferSender};
use sigcore::{vectors, Completion, Outcome, Sender};

#[derive(Copy, Clone, Debug)]
struct Irq(u16);

// Safety: 0 and 1 are valid interrupt numbers on every Cortex-M.
unsafe impl InterruptNumber for Irq {
    fn number(self) -> u16 {
        self.0
    }
}

const TEST_IRQ: Irq = Irq(0);
const OTHER_IRQ: Irq = Irq(1);

/// Makes sure any pended interrupt has been taken before we look at its
/// effects.
fn settle() {
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

pub fn test_default_handler_raises_slot() {
    static COUNT: AtomicUsize = AtomicUsize::new(0);
    fn bump() {
        COUNT.fetch_add(1, Ordering::Relaxed);
    }

    let e = vectors::interrupt(TEST_IRQ);
    assert!(e.subscribe_fn(bump));
    // Safety: nothing else uses this interrupt.
    unsafe { NVIC::unmask(TEST_IRQ) };

    NVIC::pend(TEST_IRQ);
    settle();
    assert_eq!(COUNT.load(Ordering::Relaxed), 1);
    NVIC::pend(TEST_IRQ);
    settle();
    assert_eq!(COUNT.load(Ordering::Relaxed), 2);

    NVIC::mask(TEST_IRQ);
    assert!(e.unsubscribe());
}

pub fn test_unclaimed_interrupt_is_ignored() {
    assert!(!vectors::interrupt(OTHER_IRQ).is_subscribed());
    // Safety: nothing else uses this interrupt.
    unsafe { NVIC::unmask(OTHER_IRQ) };
    NVIC::pend(OTHER_IRQ);
    settle();
    assert!(!NVIC::is_pending(OTHER_IRQ));
    NVIC::mask(OTHER_IRQ);
}

/// Transfer that counts interrupts until it reaches `target`, optionally
/// re-pending its own interrupt from the handler.
struct Pulses {
    irq: Irq,
    target: u32,
    seen: u32,
    repend: bool,
    began: &'static AtomicUsize,
}

impl Transfer for Pulses {
    type Value = u32;
    type Error = Busy;

    fn degenerate(&mut self) -> Option<u32> {
        if self.target == 0 { Some(0) } else { None }
    }

    fn begin(&mut self) {
        self.began.fetch_add(1, Ordering::Relaxed);
        // Safety: nothing else uses this interrupt.
        unsafe { NVIC::unmask(self.irq) };
        NVIC::pend(self.irq);
    }

    fn service(&mut self) -> Poll<Result<u32, Busy>> {
        self.seen += 1;
        if self.seen == self.target {
            Poll::Ready(Ok(self.seen))
        } else {
            if self.repend {
                NVIC::pend(self.irq);
            }
            Poll::Pending
        }
    }

    fn halt(&mut self) {
        NVIC::mask(self.irq);
        NVIC::unpend(self.irq);
    }
}

fn pulses(target: u32, repend: bool, began: &'static AtomicUsize) -> TransferSender<Pulses> {
    TransferSender::new(vectors::interrupt(TEST_IRQ), Pulses {
        irq: TEST_IRQ,
        target,
        seen: 0,
        repend,
        began,
    })
}

pub fn test_operation_runs_from_interrupts() {
    static BEGAN: AtomicUsize = AtomicUsize::new(0);
    let done = Completion::new();
    let mut op = pin!(pulses(3, true, &BEGAN).connect(&done));
    op.as_mut().start();

    assert_eq!(done.block(), Outcome::Success(3));
    assert_eq!(BEGAN.load(Ordering::Relaxed), 1);
    assert!(!vectors::interrupt(TEST_IRQ).is_subscribed());
    assert!(!NVIC::is_enabled(TEST_IRQ));
}

pub fn test_second_operation_is_busy() {
    static BEGAN: AtomicUsize = AtomicUsize::new(0);
    let first = Completion::new();
    let second = Completion::new();

    let mut op1 = pin!(pulses(2, false, &BEGAN).connect(&first));
    op1.as_mut().start();
    settle();
    assert!(op1.is_running());

    let mut op2 = pin!(pulses(2, false, &BEGAN).connect(&second));
    op2.as_mut().start();
    assert_eq!(second.take(), Some(Outcome::Error(Busy)));
    assert_eq!(BEGAN.load(Ordering::Relaxed), 1);
    assert!(NVIC::is_enabled(TEST_IRQ));

    NVIC::pend(TEST_IRQ);
    assert_eq!(first.block(), Outcome::Success(2));
}

pub fn test_cancel_masks_interrupt() {
    static BEGAN: AtomicUsize = AtomicUsize::new(0);
    let done = Completion::new();
    let mut op = pin!(pulses(5, false, &BEGAN).connect(&done));
    op.as_mut().start();
    settle();

    assert!(op.as_mut().cancel());
    assert_eq!(done.take(), Some(Outcome::Cancelled));
    assert!(!NVIC::is_enabled(TEST_IRQ));
    assert!(!vectors::interrupt(TEST_IRQ).is_subscribed());
}

pub fn test_drop_cancels() {
    static BEGAN: AtomicUsize = AtomicUsize::new(0);
    let done = Completion::new();
    {
        let mut op = pin!(pulses(5, false, &BEGAN).connect(&done));
        op.as_mut().start();
        settle();
    }
    assert_eq!(done.take(), Some(Outcome::Cancelled));
    assert!(!NVIC::is_enabled(TEST_IRQ));
    assert!(!vectors::interrupt(TEST_IRQ).is_subscribed());
}
