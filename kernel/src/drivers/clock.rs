//! Firmware clock-rate queries
//!
//! Thin wrappers over the property protocol's clock tags. The kernel
//! uses them once at boot to move the core clock to the midpoint of
//! its supported range; rates are in Hz.

use tangram_abi::ClockId;

use super::mailbox::{Mailbox, MailboxError};
use super::property::{tags, PropertyMessage};

/// Current rate of a clock.
pub fn clock_rate(
    mailbox: &Mailbox,
    msg: &mut PropertyMessage<2>,
    clock: ClockId,
) -> Result<u32, MailboxError> {
    msg.submit(mailbox, tags::GET_CLOCK_RATE, [clock as u32, 0])?;
    Ok(msg.value(1))
}

/// Maximum supported rate of a clock.
pub fn max_clock_rate(
    mailbox: &Mailbox,
    msg: &mut PropertyMessage<2>,
    clock: ClockId,
) -> Result<u32, MailboxError> {
    msg.submit(mailbox, tags::GET_MAX_CLOCK_RATE, [clock as u32, 0])?;
    Ok(msg.value(1))
}

/// Minimum supported rate of a clock.
pub fn min_clock_rate(
    mailbox: &Mailbox,
    msg: &mut PropertyMessage<2>,
    clock: ClockId,
) -> Result<u32, MailboxError> {
    msg.submit(mailbox, tags::GET_MIN_CLOCK_RATE, [clock as u32, 0])?;
    Ok(msg.value(1))
}

/// Request a new rate; the firmware answers with the rate it actually
/// set, which may be clamped.
pub fn set_clock_rate(
    mailbox: &Mailbox,
    msg: &mut PropertyMessage<3>,
    clock: ClockId,
    rate_hz: u32,
) -> Result<u32, MailboxError> {
    // Third word: skip-turbo flag, left clear so the firmware may
    // overclock if configured to
    msg.submit(mailbox, tags::SET_CLOCK_RATE, [clock as u32, rate_hz, 0])?;
    Ok(msg.value(1))
}
