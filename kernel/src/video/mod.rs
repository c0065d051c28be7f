//! Video output
//!
//! Double-buffered framebuffer presentation. The hardware surface is
//! negotiated once at boot over the mailbox framebuffer channel with a
//! virtual height of twice the visible height; each frame is blitted
//! into the off-screen half and the display is panned onto it, so the
//! scan-out never races the copy.

pub mod framebuffer;

pub use framebuffer::{Framebuffer, FramebufferRequest};

use crate::drivers::property::{tags, PropertyMessage};
use crate::drivers::Mailbox;
use crate::kprintln;

/// Sink for completed frames. The scheduler presents through this seam
/// so the tick path does not depend on the mailbox hardware.
pub trait Display {
    /// Blit one packed 24-bit frame and make it visible.
    fn present(&mut self, frame: *const u8);
}

/// The hardware display: a negotiated framebuffer plus the mailbox used
/// to pan between its halves.
pub struct Screen {
    fb: Framebuffer,
    mailbox: &'static Mailbox,
    pan_msg: &'static mut PropertyMessage<2>,
}

impl Screen {
    pub fn new(
        fb: Framebuffer,
        mailbox: &'static Mailbox,
        pan_msg: &'static mut PropertyMessage<2>,
    ) -> Self {
        Self { fb, mailbox, pan_msg }
    }
}

impl Display for Screen {
    fn present(&mut self, frame: *const u8) {
        self.fb.blit(frame);
        let (x, y) = self.fb.pan_offset();
        match self.pan_msg.submit(self.mailbox, tags::SET_VIRTUAL_OFFSET, [x, y]) {
            Ok(()) => self.fb.swap(),
            // Keep drawing into the same half rather than tearing
            Err(e) => kprintln!("[video] pan to ({}, {}) failed: {:?}", x, y, e),
        }
    }
}
