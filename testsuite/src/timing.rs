// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests driven by the SysTick.

use core::pin::pin;

use sigcore::operation::Busy;
use sigcore::pollable::{poll_fn, wait_for};
use sigcore::time::{sleep_for, Millis, TickTime};
use sigcore::{vectors, Completion, Outcome, Sender};

pub fn test_clock_advancing() {
    let t1 = TickTime::now();
    while TickTime::now() == t1 {
        cortex_m::asm::wfi();
    }
    assert!(TickTime::now() > t1);
}

pub fn test_pollable_deadline() {
    let deadline = TickTime::now() + Millis(3);
    let o = wait_for(poll_fn(|| {
        if TickTime::now() >= deadline {
            Some(Ok::<_, ()>(TickTime::now()))
        } else {
            None
        }
    }));
    assert!(o.value() >= deadline);
}

pub fn test_delay() {
    let start = TickTime::now();
    let done = Completion::new();
    let mut op = pin!(sleep_for(Millis(5)).connect(&done));
    op.as_mut().start();
    assert!(vectors::systick().is_subscribed());

    assert_eq!(done.block(), Outcome::Success(()));
    assert!(start.elapsed() >= Millis(5));
    assert!(!vectors::systick().is_subscribed());
}

pub fn test_zero_delay() {
    let done = Completion::new();
    let mut op = pin!(sleep_for(Millis(0)).connect(&done));
    op.as_mut().start();
    assert_eq!(done.take(), Some(Outcome::Success(())));
    assert!(!vectors::systick().is_subscribed());
}

pub fn test_delay_busy() {
    let first = Completion::new();
    let second = Completion::new();
    let mut op1 = pin!(sleep_for(Millis(50)).connect(&first));
    op1.as_mut().start();
    let mut op2 = pin!(sleep_for(Millis(1)).connect(&second));
    op2.as_mut().start();
    assert_eq!(second.take(), Some(Outcome::Error(Busy)));

    assert!(op1.as_mut().cancel());
    assert_eq!(first.take(), Some(Outcome::Cancelled));
    assert!(!vectors::systick().is_subscribed());
}

pub fn test_execute_delay() {
    let start = TickTime::now();
    let o = crate::block_on(sigcore::execute(sleep_for(Millis(3))));
    assert_eq!(o, Outcome::Success(()));
    assert!(start.elapsed() >= Millis(3));
}
