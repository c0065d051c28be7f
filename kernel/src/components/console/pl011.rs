//! PL011 UART console component (minimal)
//!
//! Minimal output-only driver for the BCM2835's PL011. Baud rate, word
//! length and parity are left as the firmware configured them; this
//! component only makes sure the transmitter is enabled and then feeds
//! the TX FIFO one byte at a time.

use core::ptr;

use super::Console;

// Register offsets from the PL011 base
const DR: usize = 0x00; // Data register
const FR: usize = 0x18; // Flag register
const CR: usize = 0x30; // Control register

// Flag register bits
const FR_TXFF: u32 = 1 << 5; // TX FIFO full
const FR_BUSY: u32 = 1 << 3; // Transmitter busy

// Control register bits
const CR_UARTEN: u32 = 1 << 0;
const CR_TXE: u32 = 1 << 8;

/// PL011 console component configuration
#[derive(Clone, Copy)]
pub struct Pl011Config {
    /// Physical MMIO base address
    pub mmio_base: usize,
}

/// PL011 minimal console (kernel component)
///
/// Directly accesses MMIO registers; the boot sequence keeps the UART
/// megabyte identity-mapped in every translation table so the console
/// stays usable across table activations and inside trap handlers.
pub struct Pl011Console {
    mmio_base: usize,
}

impl Pl011Console {
    /// Create a new PL011 console from configuration
    pub const fn new(config: Pl011Config) -> Self {
        Self {
            mmio_base: config.mmio_base,
        }
    }

    /// Ensure the UART and its transmitter are enabled.
    ///
    /// Assumes the firmware already programmed the baud divisors.
    pub fn init(&self) {
        unsafe {
            // Wait out any in-flight character before touching CR.
            while self.read_reg(FR) & FR_BUSY != 0 {
                core::hint::spin_loop();
            }
            let cr = self.read_reg(CR);
            self.write_reg(CR, cr | CR_UARTEN | CR_TXE);
        }
    }

    #[inline]
    unsafe fn read_reg(&self, offset: usize) -> u32 {
        ptr::read_volatile((self.mmio_base + offset) as *const u32)
    }

    #[inline]
    unsafe fn write_reg(&self, offset: usize, value: u32) {
        ptr::write_volatile((self.mmio_base + offset) as *mut u32, value);
    }
}

impl Console for Pl011Console {
    fn putc(&self, c: u8) {
        unsafe {
            // Wait until TX FIFO not full
            while self.read_reg(FR) & FR_TXFF != 0 {
                core::hint::spin_loop();
            }
            self.write_reg(DR, c as u32);
        }
    }
}
