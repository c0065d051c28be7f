//! Shared ABI definitions between the Tangram kernel and its user program.
//!
//! This crate contains the syscall numbers, pixel-format constants, and
//! clock identifiers that both sides need to agree on. It is `no_std` and
//! dependency-free so the user program can link it without dragging in any
//! kernel internals.

#![cfg_attr(not(test), no_std)]

// =============================================================================
// Syscall numbers
// =============================================================================
//
// The supervisor-call trap carries the syscall number in r0 and up to two
// arguments in r1/r2; the result comes back in r0. Numbers outside this
// table are accepted as no-ops returning zero.

/// Install the update/draw callback pair: (update_ptr, draw_ptr)
pub const SYS_REGISTER_CALLBACKS: u32 = 1;

/// Sample a low-order bit of the free-running microsecond counter
pub const SYS_TIME_PARITY: u32 = 2;

/// Clear indicator output bits: (mask)
pub const SYS_LED_CLEAR: u32 = 42;

/// Set indicator output bits: (mask)
pub const SYS_LED_SET: u32 = 43;

// =============================================================================
// Callback contract
// =============================================================================

/// Update callback: invoked once per tick, no arguments, no result.
pub type UpdateFn = extern "C" fn();

/// Draw callback: invoked once per tick after update; returns a pointer to
/// a tightly packed pixel buffer (see [`BYTES_PER_PIXEL`]) of logical
/// width x height triplets, or null to skip the blit for this tick.
pub type DrawFn = extern "C" fn() -> *const u8;

/// Pixel buffers exchanged through the draw callback are interleaved
/// byte triplets, row-major, with no stride padding.
pub const BYTES_PER_PIXEL: usize = 3;

// =============================================================================
// Firmware clock identifiers
// =============================================================================

/// Clock ids understood by the firmware's clock-rate property tags.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockId {
    Emmc = 1,
    Uart = 2,
    Arm = 3,
    Core = 4,
    V3d = 5,
    H264 = 6,
    Isp = 7,
    Sdram = 8,
    Pixel = 9,
}

impl ClockId {
    /// Every id the firmware exposes, in id order.
    pub const ALL: [ClockId; 9] = [
        ClockId::Emmc,
        ClockId::Uart,
        ClockId::Arm,
        ClockId::Core,
        ClockId::V3d,
        ClockId::H264,
        ClockId::Isp,
        ClockId::Sdram,
        ClockId::Pixel,
    ];

    /// Raw id as carried in the property tag value word.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Pixel channel order reported by the firmware: 0 = BGR, 1 = RGB.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOrder {
    Bgr = 0,
    Rgb = 1,
}

impl PixelOrder {
    /// Decode a firmware response value, rejecting anything but 0/1.
    pub const fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Bgr),
            1 => Some(Self::Rgb),
            _ => None,
        }
    }
}

// =============================================================================
// User-side syscall stubs
// =============================================================================

/// Raw supervisor call with up to two arguments.
///
/// The argument registers are declared clobbered: the contract with the
/// kernel only guarantees the result in r0, not what dispatch left in
/// r1-r3.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline]
pub fn syscall(number: u32, arg1: u32, arg2: u32) -> u32 {
    let result;
    unsafe {
        core::arch::asm!(
            "svc #0",
            inout("r0") number => result,
            inout("r1") arg1 => _,
            inout("r2") arg2 => _,
            lateout("r3") _,
            options(nostack),
        );
    }
    result
}

/// Register the update/draw callback pair for the tick loop.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline]
pub fn register_callbacks(update: UpdateFn, draw: DrawFn) {
    syscall(SYS_REGISTER_CALLBACKS, update as usize as u32, draw as usize as u32);
}

/// Sample the slow parity bit of the running counter (0 or 1).
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline]
pub fn time_parity() -> u32 {
    syscall(SYS_TIME_PARITY, 0, 0)
}

/// Turn indicator output bits on.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline]
pub fn led_set(mask: u32) {
    syscall(SYS_LED_SET, mask, 0);
}

/// Turn indicator output bits off.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline]
pub fn led_clear(mask: u32) {
    syscall(SYS_LED_CLEAR, mask, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syscall_numbers_distinct() {
        let numbers = [
            SYS_REGISTER_CALLBACKS,
            SYS_TIME_PARITY,
            SYS_LED_CLEAR,
            SYS_LED_SET,
        ];
        for (i, a) in numbers.iter().enumerate() {
            for b in &numbers[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_pixel_order_decode() {
        assert_eq!(PixelOrder::from_u32(0), Some(PixelOrder::Bgr));
        assert_eq!(PixelOrder::from_u32(1), Some(PixelOrder::Rgb));
        // The sentinel used to detect a dead firmware must not decode.
        assert_eq!(PixelOrder::from_u32(123), None);
    }

    #[test]
    fn test_clock_ids() {
        assert_eq!(ClockId::Arm.as_u32(), 3);
        assert_eq!(ClockId::Pixel.as_u32(), 9);
        // ALL is in id order with no gaps
        for (i, id) in ClockId::ALL.iter().enumerate() {
            assert_eq!(id.as_u32() as usize, i + 1);
        }
    }
}
