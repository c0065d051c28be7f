//! Mailbox property tag protocol
//!
//! A property message is a single in-place rewritten buffer: header
//! (total size, request/response code), one tag (id, value buffer size,
//! tag request/response code, value words), and a zero end marker. The
//! firmware overwrites the value words and sets the response bits, so
//! request sentinels placed in the value buffer survive only if the
//! firmware never answered.

use super::mailbox::{bus_address, Mailbox, MailboxChannel, MailboxError};

/// Header code for an outgoing request.
pub const CODE_REQUEST: u32 = 0;

/// Header code the firmware writes on success.
pub const CODE_RESPONSE_OK: u32 = 0x8000_0000;

/// Bit the firmware sets in a tag's code field once filled.
pub const TAG_RESPONSE: u32 = 1 << 31;

/// Sentinel request value for "get pixel order": not a legal response
/// (0 = BGR, 1 = RGB), so reading it back means the firmware never
/// touched the buffer.
pub const PIXEL_ORDER_PROBE: u32 = 123;

/// Property tags used by this kernel.
pub mod tags {
    pub const GET_CLOCK_RATE: u32 = 0x0003_0002;
    pub const GET_MAX_CLOCK_RATE: u32 = 0x0003_0004;
    pub const GET_MIN_CLOCK_RATE: u32 = 0x0003_0007;
    pub const SET_CLOCK_RATE: u32 = 0x0003_8002;
    pub const GET_PIXEL_ORDER: u32 = 0x0004_0006;
    pub const SET_VIRTUAL_OFFSET: u32 = 0x0004_8009;
}

/// Single-tag property message with an `N`-word value buffer.
///
/// Must live in memory the coprocessor observes uncached (the kernel
/// places its instances in the dedicated non-cached link section).
#[repr(C, align(16))]
pub struct PropertyMessage<const N: usize> {
    size: u32,
    code: u32,
    tag: u32,
    value_size: u32,
    tag_code: u32,
    values: [u32; N],
    end: u32,
}

// Mailbox addresses carry the channel in their low four bits, so the
// buffer itself must sit on a 16-byte boundary
static_assertions::const_assert_eq!(core::mem::align_of::<PropertyMessage<1>>(), 16);

impl<const N: usize> PropertyMessage<N> {
    /// An empty message slot (filled per call by [`Self::submit`]).
    pub const fn new() -> Self {
        Self {
            size: 0,
            code: 0,
            tag: 0,
            value_size: 0,
            tag_code: 0,
            values: [0; N],
            end: 0,
        }
    }

    /// Total message size in bytes as encoded in the header.
    pub const fn byte_len() -> u32 {
        (core::mem::size_of::<Self>()) as u32
    }

    /// Fill the message as a request and run it through the mailbox.
    ///
    /// On success the value words hold the firmware's response.
    pub fn submit(
        &mut self,
        mailbox: &Mailbox,
        tag: u32,
        values: [u32; N],
    ) -> Result<(), MailboxError> {
        self.size = Self::byte_len();
        self.code = CODE_REQUEST;
        self.tag = tag;
        self.value_size = (N * 4) as u32;
        self.tag_code = 0;
        self.values = values;
        self.end = 0;

        mailbox.call(MailboxChannel::Property, bus_address(self as *const _ as usize));

        if self.code != CODE_RESPONSE_OK {
            return Err(MailboxError::RequestFailed(self.code));
        }
        if self.tag_code & TAG_RESPONSE == 0 {
            return Err(MailboxError::TagUnfilled(self.tag));
        }
        Ok(())
    }

    /// One response value word.
    #[inline]
    pub fn value(&self, index: usize) -> u32 {
        self.values[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_layout() {
        // Header (5 words) + values + end marker, 16-byte aligned
        assert_eq!(PropertyMessage::<2>::byte_len(), (5 + 2 + 1) * 4);
        assert_eq!(core::mem::align_of::<PropertyMessage<2>>(), 16);

        let msg = PropertyMessage::<3>::new();
        let base = &msg as *const _ as usize;
        let values = msg.values.as_ptr() as usize;
        assert_eq!(values - base, 5 * 4);
    }

    #[test]
    fn test_submit_rejects_unanswered_request() {
        // A mailbox over plain memory echoes the address but never
        // rewrites the buffer, so the header still reads as a request.
        #[repr(C, align(4))]
        struct FakeBank([u32; 9]);
        let mut bank = FakeBank([0; 9]);
        bank.0[0] = MailboxChannel::Property as u32; // READ echo
        let mailbox = unsafe { Mailbox::new(bank.0.as_mut_ptr() as usize) };

        let mut msg = PropertyMessage::<1>::new();
        let result = msg.submit(&mailbox, tags::GET_PIXEL_ORDER, [PIXEL_ORDER_PROBE]);
        assert_eq!(result, Err(MailboxError::RequestFailed(CODE_REQUEST)));
        // The probe sentinel survives an unanswered request
        assert_eq!(msg.value(0), PIXEL_ORDER_PROBE);
    }
}
