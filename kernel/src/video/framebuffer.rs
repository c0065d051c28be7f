//! Framebuffer negotiation and blitting
//!
//! The surface is requested over the legacy mailbox framebuffer channel:
//! the kernel fills a descriptor with the geometry it wants, the
//! firmware answers with the pitch, buffer address and size. Virtual
//! height is twice the visible height so the surface holds two stacked
//! frames for flip-free presentation.

use tangram_abi::BYTES_PER_PIXEL;

use crate::drivers::mailbox::{bus_address, Mailbox, MailboxChannel, MailboxError};

/// Surface geometry requested from the firmware.
#[derive(Debug, Clone, Copy)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub virtual_width: u32,
    pub virtual_height: u32,
    pub depth_bits: u32,
}

/// Legacy framebuffer channel descriptor, rewritten in place by the
/// firmware. Must live in the non-cached link section like property
/// messages.
#[repr(C, align(16))]
pub struct FramebufferRequest {
    width: u32,
    height: u32,
    virtual_width: u32,
    virtual_height: u32,
    pitch: u32,
    depth: u32,
    x_offset: u32,
    y_offset: u32,
    pointer: u32,
    size: u32,
}

// The firmware walks the descriptor as ten consecutive words
static_assertions::const_assert_eq!(core::mem::size_of::<FramebufferRequest>(), 48);
static_assertions::const_assert_eq!(core::mem::align_of::<FramebufferRequest>(), 16);

impl FramebufferRequest {
    /// An empty descriptor slot (filled per call by [`Self::negotiate`]).
    pub const fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            virtual_width: 0,
            virtual_height: 0,
            pitch: 0,
            depth: 0,
            x_offset: 0,
            y_offset: 0,
            pointer: 0,
            size: 0,
        }
    }

    /// Ask the firmware for a surface matching `config`.
    ///
    /// The response word on the framebuffer channel is zero on success;
    /// a populated descriptor with a null pointer also counts as a
    /// rejection (older firmware answers that way).
    pub fn negotiate(
        &mut self,
        mailbox: &Mailbox,
        config: &DisplayConfig,
    ) -> Result<Framebuffer, MailboxError> {
        self.width = config.width;
        self.height = config.height;
        self.virtual_width = config.virtual_width;
        self.virtual_height = config.virtual_height;
        self.pitch = 0;
        self.depth = config.depth_bits;
        self.x_offset = 0;
        self.y_offset = 0;
        self.pointer = 0;
        self.size = 0;

        let response = mailbox.call(
            MailboxChannel::Framebuffer,
            bus_address(self as *const _ as usize),
        );
        if response != 0 {
            return Err(MailboxError::FramebufferRejected(response));
        }
        if self.pointer == 0 {
            return Err(MailboxError::FramebufferRejected(0));
        }

        // The firmware hands back a bus address; strip the alias bits
        let base = (self.pointer & 0x3FFF_FFFF) as usize;
        Ok(unsafe {
            Framebuffer::from_raw(
                base as *mut u8,
                self.pitch as usize,
                config.width as usize,
                config.height as usize,
            )
        })
    }
}

/// A negotiated double-height surface.
///
/// Frames are blitted into the half the display is not showing;
/// [`Self::pan_offset`] names that half and [`Self::swap`] commits the
/// flip after the pan has been accepted.
pub struct Framebuffer {
    base: *mut u8,
    pitch: usize,
    width: usize,
    height: usize,
    back: usize,
}

// The base pointer targets the exclusively-owned surface memory.
unsafe impl Send for Framebuffer {}

impl Framebuffer {
    /// Wrap a raw surface.
    ///
    /// # Safety
    /// `base` must point to at least `pitch * height * 2` writable bytes
    /// that nothing else writes while this handle exists.
    pub unsafe fn from_raw(base: *mut u8, pitch: usize, width: usize, height: usize) -> Self {
        Self {
            base,
            pitch,
            width,
            height,
            back: 1,
        }
    }

    /// Copy one packed frame into the off-screen half, converting each
    /// RGB triplet to the BGR order the surface scans out.
    ///
    /// The source is tightly packed; the destination honors the
    /// firmware's pitch, which may be wider than a row.
    pub fn blit(&mut self, frame: *const u8) {
        let dst_top = self.back * self.height;
        for y in 0..self.height {
            for x in 0..self.width {
                unsafe {
                    let src = frame.add((y * self.width + x) * BYTES_PER_PIXEL);
                    let dst = self
                        .base
                        .add((dst_top + y) * self.pitch + x * BYTES_PER_PIXEL);
                    dst.write(src.add(2).read());
                    dst.add(1).write(src.add(1).read());
                    dst.add(2).write(src.read());
                }
            }
        }
    }

    /// Flood both halves with one color (boot splash and sanity check
    /// that the surface is really writable).
    pub fn fill(&mut self, rgb: [u8; 3]) {
        for y in 0..self.height * 2 {
            let row = unsafe { self.base.add(y * self.pitch) };
            for x in 0..self.width {
                unsafe {
                    core::ptr::copy_nonoverlapping(rgb.as_ptr(), row.add(x * BYTES_PER_PIXEL), 3);
                }
            }
        }
    }

    /// Pan offset that brings the most recently blitted half on screen.
    pub fn pan_offset(&self) -> (u32, u32) {
        (0, (self.back * self.height) as u32)
    }

    /// Commit a successful pan: the halves trade roles.
    pub fn swap(&mut self) {
        self.back ^= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 4;
    const H: usize = 2;
    const PITCH: usize = 16; // wider than W * 3 = 12

    fn frame(fill: u8) -> [u8; W * H * BYTES_PER_PIXEL] {
        [fill; W * H * BYTES_PER_PIXEL]
    }

    #[test]
    fn test_blit_targets_back_half_and_honors_pitch() {
        let mut surface = [0u8; PITCH * H * 2];
        let mut fb =
            unsafe { Framebuffer::from_raw(surface.as_mut_ptr(), PITCH, W, H) };

        let src = frame(0xAB);
        fb.blit(src.as_ptr());
        assert_eq!(fb.pan_offset(), (0, H as u32));

        // Front half untouched
        assert!(surface[..PITCH * H].iter().all(|&b| b == 0));
        // Back half: 12 payload bytes per row, pitch padding untouched
        let back = &surface[PITCH * H..];
        assert!(back[..W * BYTES_PER_PIXEL].iter().all(|&b| b == 0xAB));
        assert!(back[W * BYTES_PER_PIXEL..PITCH].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_blit_swaps_red_and_blue() {
        let mut surface = [0u8; PITCH * H * 2];
        let mut fb =
            unsafe { Framebuffer::from_raw(surface.as_mut_ptr(), PITCH, W, H) };

        let mut src = frame(0);
        src[..3].copy_from_slice(&[0x11, 0x22, 0x33]); // pixel (0, 0)
        let last = (H - 1) * W * BYTES_PER_PIXEL + (W - 1) * BYTES_PER_PIXEL;
        src[last..last + 3].copy_from_slice(&[0xAA, 0xBB, 0xCC]);
        fb.blit(src.as_ptr());

        let back = &surface[PITCH * H..];
        assert_eq!(&back[..3], &[0x33, 0x22, 0x11]);
        let last_dst = (H - 1) * PITCH + (W - 1) * BYTES_PER_PIXEL;
        assert_eq!(&back[last_dst..last_dst + 3], &[0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn test_fill_floods_both_halves() {
        let mut surface = [0u8; PITCH * H * 2];
        let mut fb =
            unsafe { Framebuffer::from_raw(surface.as_mut_ptr(), PITCH, W, H) };

        fb.fill([0xFF, 0xFF, 0xFF]);
        for y in 0..H * 2 {
            let row = &surface[y * PITCH..];
            assert!(row[..W * BYTES_PER_PIXEL].iter().all(|&b| b == 0xFF));
            assert!(row[W * BYTES_PER_PIXEL..PITCH].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_swap_alternates_halves() {
        let mut surface = [0u8; PITCH * H * 2];
        let mut fb =
            unsafe { Framebuffer::from_raw(surface.as_mut_ptr(), PITCH, W, H) };

        assert_eq!(fb.pan_offset(), (0, H as u32));
        fb.swap();
        assert_eq!(fb.pan_offset(), (0, 0));

        let src = frame(0xCD);
        fb.blit(src.as_ptr());
        // Now the first half received the frame
        assert_eq!(surface[0], 0xCD);
        assert_eq!(surface[PITCH * H], 0);
    }

}
