//! Kernel configuration and component composition
//!
//! This module is the single configurable surface of the kernel core:
//! board addresses, display geometry, tick rate, the user program window,
//! and the policy for which MMIO windows the user domain may see. It also
//! handles compile-time component composition (console selection) based
//! on cargo features.

use core::ops::Range;

use crate::components::console::Console;
#[cfg(feature = "console-null")]
use crate::components::console::null::{NullConfig, NullConsole};
#[cfg(not(feature = "console-null"))]
use crate::components::console::pl011::{Pl011Config, Pl011Console};
use crate::video::framebuffer::DisplayConfig;

// =============================================================================
// Board addresses (BCM2835)
// =============================================================================

/// Physical base of the peripheral MMIO window.
pub const PERIPHERAL_BASE: usize = 0x2000_0000;

/// System timer register bank.
pub const TIMER_BASE: usize = PERIPHERAL_BASE + 0x0000_3000;

/// Interrupt controller pending/enable block.
pub const INTC_BASE: usize = PERIPHERAL_BASE + 0x0000_B200;

/// GPU mailbox register bank.
pub const MAILBOX_BASE: usize = PERIPHERAL_BASE + 0x0000_B880;

/// GPIO register bank.
pub const GPIO_BASE: usize = PERIPHERAL_BASE + 0x0020_0000;

/// PL011 UART MMIO base (debug console).
pub const UART_BASE: usize = PERIPHERAL_BASE + 0x0020_1000;

/// GPIO line wired to the indicator LED (ACT, active low).
pub const LED_LINE: u32 = 47;

// =============================================================================
// Display
// =============================================================================

/// Framebuffer geometry requested from the firmware at boot. The virtual
/// height is doubled so the panning property tag can page-flip.
pub const DISPLAY: DisplayConfig = DisplayConfig {
    width: 256,
    height: 256,
    virtual_width: 256,
    virtual_height: 512,
    depth_bits: 24,
};

// =============================================================================
// Tick loop
// =============================================================================

/// Tick period in microseconds (60 Hz).
pub const TICK_PERIOD_US: u32 = 16_667;

/// System-timer compare channel driving the tick (channels 0/2 belong to
/// the GPU).
pub const TIMER_CHANNEL: u32 = 3;

/// Interrupt line for [`TIMER_CHANNEL`].
pub const TIMER_IRQ: u32 = 3;

/// Bit of the free-running microsecond counter sampled by the
/// time-parity syscall (~1 s period).
pub const TIME_PARITY_BIT: u32 = 20;

// =============================================================================
// User program
// =============================================================================

/// Virtual window the user program executes from. Callback registration
/// rejects pointers outside this range.
pub const USER_EXEC_WINDOW: Range<usize> = 0x8000_0000..0x9000_0000;

/// Physical base the user window is mapped onto.
pub const USER_PHYS_BASE: usize = 0x0100_0000;

/// Bytes of physical memory actually mapped at the start of the user
/// window; the rest of the window faults until someone grows this.
pub const USER_MEM_SIZE: usize = 8 * 1024 * 1024;

/// MMIO megabytes re-permissioned into the user domain in the user table.
///
/// The isolation policy for peripherals is a configuration decision: these
/// windows are tagged with the user domain and privileged-only access
/// bits, so user code cannot touch them directly and reaches the LED only
/// through syscalls. Widening access means changing the flags here, not
/// the address-space code.
pub const USER_MMIO_WINDOWS: &[usize] = &[
    PERIPHERAL_BASE,                // timer, interrupt controller, mailbox
    PERIPHERAL_BASE + 0x0020_0000,  // GPIO
];

// =============================================================================
// Console component selection (compile-time)
// =============================================================================

/// Console component selection (compile-time)
///
/// Cargo features select which console implementation backs `kprintln!`:
/// - `console-pl011`: PL011 UART console (default)
/// - `console-null`: No console output (production builds)
#[cfg(feature = "console-null")]
pub static CONSOLE: NullConsole = NullConsole::new(NullConfig);

// Default to PL011 unless explicitly silenced
#[cfg(not(feature = "console-null"))]
pub static CONSOLE: Pl011Console = Pl011Console::new(Pl011Config {
    mmio_base: UART_BASE,
});

/// Initialize the kernel console component.
///
/// Must be called early in the boot sequence before any debug output.
pub fn init_console() {
    CONSOLE.init();
}

/// Get a reference to the global console.
pub fn console() -> &'static impl Console {
    &CONSOLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_period_is_60hz() {
        // 16_667 µs is the closest whole-microsecond period to 60 Hz
        assert!(TICK_PERIOD_US * 60 >= 1_000_000);
        assert!((TICK_PERIOD_US - 1) * 60 < 1_000_000);
    }

    #[test]
    fn test_user_window_is_section_aligned() {
        assert_eq!(USER_EXEC_WINDOW.start % crate::memory::SECTION_SIZE, 0);
        assert_eq!(USER_EXEC_WINDOW.end % crate::memory::SECTION_SIZE, 0);
        assert_eq!(USER_PHYS_BASE % crate::memory::SECTION_SIZE, 0);
    }

    #[test]
    fn test_user_mmio_windows_are_section_aligned() {
        for base in USER_MMIO_WINDOWS {
            assert_eq!(base % crate::memory::SECTION_SIZE, 0);
        }
    }
}
