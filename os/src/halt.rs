// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stopping the program when there's nothing sensible left to do.
//!
//! Firmware has a category of failure that isn't worth propagating: the
//! clock didn't lock, the peripheral you need isn't responding, the board
//! isn't the board you were built for. The traditional response is an empty
//! infinite loop, which has the drawback that a debugger attached to the
//! stuck board can't tell _which_ empty infinite loop it's in.
//!
//! [`halt`] records why it was called in a `static` (`SIGCORE_LAST_HALT`, for
//! anyone poking at memory), and then parks the processor. On hosted builds
//! it panics instead, so tests can see that it happened.

use portable_atomic::{AtomicU8, Ordering};

/// Reason for a halt.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Halt {
    /// Clock or power configuration failed.
    Clock = 1,
    /// A peripheral couldn't be brought up.
    Peripheral = 2,
    /// An interrupt signal the application needs was already claimed.
    SignalClaimed = 3,
    /// The application found itself somewhere it can't recover from.
    Application = 4,
}

impl Halt {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Clock),
            2 => Some(Self::Peripheral),
            3 => Some(Self::SignalClaimed),
            4 => Some(Self::Application),
            _ => None,
        }
    }
}

/// Most recent halt reason, as a `Halt` discriminant, or 0 if none.
#[used]
#[no_mangle]
static SIGCORE_LAST_HALT: AtomicU8 = AtomicU8::new(0);

/// Records `reason` and stops.
///
/// On Cortex-M this sleeps forever with `WFI`. Interrupts stay as they were,
/// so anything already running from interrupt context (a watchdog kick, say)
/// carries on. Elsewhere, this panics with the reason.
pub fn halt(reason: Halt) -> ! {
    SIGCORE_LAST_HALT.store(reason as u8, Ordering::SeqCst);
    crate::debug!("halt: {}", reason);

    park(reason)
}

#[cfg(sigcore_cortex_m)]
fn park(_reason: Halt) -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

#[cfg(not(sigcore_cortex_m))]
fn park(reason: Halt) -> ! {
    panic!("halt: {:?}", reason)
}

/// Returns the reason passed to the most recent call to [`halt`], if any.
///
/// Mostly useful in tests, and for code that runs after a halt in interrupt
/// context.
pub fn last_halt() -> Option<Halt> {
    Halt::from_code(SIGCORE_LAST_HALT.load(Ordering::SeqCst))
}
