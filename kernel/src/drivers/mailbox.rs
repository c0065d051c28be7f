//! GPU mailbox transport
//!
//! Synchronous word-sized request/response channel to the coprocessor.
//! A request is a 16-byte-aligned buffer address with the channel number
//! packed into the low four bits; the response echoes the same address
//! on the same channel once the firmware has rewritten the buffer in
//! place.
//!
//! Buffer addresses are translated to the coprocessor's bus alias
//! before submission, and buffers must live in memory mapped without
//! caching so the firmware observes the request words directly.

use super::{read_reg, write_reg};
use crate::arch::armv6::{dmb, dsb};

const READ: usize = 0x00;
const STATUS: usize = 0x18;
const WRITE: usize = 0x20;

const STATUS_FULL: u32 = 1 << 31;
const STATUS_EMPTY: u32 = 1 << 30;

/// Bus alias the coprocessor uses for ARM physical memory.
const BUS_ALIAS: u32 = 0x4000_0000;

/// Mailbox channels used by this kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MailboxChannel {
    /// Legacy framebuffer negotiation
    Framebuffer = 1,
    /// Property tag protocol
    Property = 8,
}

/// Mailbox transaction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// Firmware flagged the request buffer as malformed
    RequestFailed(u32),
    /// A response tag came back without its response bit set
    TagUnfilled(u32),
    /// Legacy framebuffer channel replied with a nonzero status
    FramebufferRejected(u32),
}

/// Translate an ARM physical address to the coprocessor bus alias.
#[inline]
pub fn bus_address(addr: usize) -> u32 {
    addr as u32 | BUS_ALIAS
}

/// Owned handle over the mailbox register bank.
pub struct Mailbox {
    base: usize,
}

impl Mailbox {
    /// Create a handle at `base`.
    ///
    /// # Safety
    /// `base` must be the mapped mailbox bank and must not be handed to
    /// a second writer running concurrently.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Submit `data` on `channel` and block for the matching response.
    ///
    /// Responses for other channels are drained and dropped; nothing
    /// else in this kernel holds an outstanding mailbox request, so a
    /// foreign response can only be firmware-initiated noise.
    pub fn call(&self, channel: MailboxChannel, data: u32) -> u32 {
        dsb();
        while read_reg(self.base, STATUS) & STATUS_FULL != 0 {
            core::hint::spin_loop();
        }
        write_reg(self.base, WRITE, (data & !0xF) | channel as u32);

        loop {
            while read_reg(self.base, STATUS) & STATUS_EMPTY != 0 {
                core::hint::spin_loop();
            }
            let word = read_reg(self.base, READ);
            if word & 0xF == channel as u32 {
                dmb();
                return word & !0xF;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(4))]
    struct FakeBank([u32; 9]);

    #[test]
    fn test_bus_address_sets_alias_bit() {
        assert_eq!(bus_address(0x0010_0000), 0x4010_0000);
        assert_eq!(bus_address(0), 0x4000_0000);
    }

    #[test]
    fn test_call_packs_channel_into_low_bits() {
        let mut bank = FakeBank([0; 9]);
        // Prime the read register with the echoed response word
        bank.0[READ / 4] = 0x0010_0000 | MailboxChannel::Property as u32;
        let mailbox = unsafe { Mailbox::new(bank.0.as_mut_ptr() as usize) };

        let response = mailbox.call(MailboxChannel::Property, 0x0010_0008);
        assert_eq!(bank.0[WRITE / 4], 0x0010_0008 | 8);
        assert_eq!(response, 0x0010_0000);
    }

    #[test]
    fn test_call_strips_caller_low_bits() {
        let mut bank = FakeBank([0; 9]);
        bank.0[READ / 4] = MailboxChannel::Framebuffer as u32;
        let mailbox = unsafe { Mailbox::new(bank.0.as_mut_ptr() as usize) };

        mailbox.call(MailboxChannel::Framebuffer, 0xF);
        assert_eq!(bank.0[WRITE / 4], MailboxChannel::Framebuffer as u32);
    }
}
