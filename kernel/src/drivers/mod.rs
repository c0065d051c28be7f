//! SoC peripheral drivers
//!
//! Each driver is a small owned handle over one register bank,
//! constructed from the bank's base address at startup and passed to the
//! components that need it. Register access goes through volatile
//! reads/writes of word offsets; nothing here holds interior state
//! beyond the base address, so handles are cheap to move.

pub mod clock;
pub mod gpio;
pub mod interrupt;
pub mod mailbox;
pub mod property;
pub mod systimer;

pub use gpio::Gpio;
pub use interrupt::InterruptController;
pub use mailbox::{Mailbox, MailboxChannel, MailboxError};
pub use systimer::SystemTimer;

/// Volatile read of a 32-bit register at `base + offset`.
#[inline(always)]
pub(crate) fn read_reg(base: usize, offset: usize) -> u32 {
    unsafe { core::ptr::read_volatile((base + offset) as *const u32) }
}

/// Volatile write of a 32-bit register at `base + offset`.
#[inline(always)]
pub(crate) fn write_reg(base: usize, offset: usize, value: u32) {
    unsafe { core::ptr::write_volatile((base + offset) as *mut u32, value) }
}
