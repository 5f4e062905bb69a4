// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! sigcore test suite, LM3S6965 wrapper.
//!
//! Run with `cargo run --release -p sigcore-testsuite-lm3s6965` from the
//! `testsuite` directory; the Cargo config points the runner at QEMU.

#![no_std]
#![no_main]

// get the panic handler
use panic_semihosting as _;

/// QEMU's LM3S6965 runs its SysTick off a nominal 12MHz clock. None of the
/// tests depend on this being exact, only on time moving forward.
const HZ: u32 = 12_000_000;

#[cortex_m_rt::entry]
fn main() -> ! {
    sigcore_testsuite::run_test_suite(HZ)
}
