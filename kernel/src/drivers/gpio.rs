//! GPIO register bank
//!
//! Function-select and set/clear registers only; no pull-up/down or
//! event-detect support, since the kernel drives exactly one line (the
//! activity LED) and user code reaches the rest through syscalls 42/43.
//!
//! Lines are numbered 0..=53. Function select packs ten lines per
//! register at three bits each; set/clear are one bit per line across
//! two banks of 32.

use super::{read_reg, write_reg};

const GPFSEL0: usize = 0x00;
const GPSET0: usize = 0x1C;
const GPCLR0: usize = 0x28;

/// Pin function, three bits per line in the GPFSEL registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LineFunction {
    Input = 0b000,
    Output = 0b001,
}

/// Owned handle over the GPIO register bank.
pub struct Gpio {
    base: usize,
}

impl Gpio {
    /// Create a handle at `base`.
    ///
    /// # Safety
    /// `base` must be the mapped GPIO bank and must not be handed to a
    /// second writer running concurrently.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Select the function of one line, preserving its neighbors.
    pub fn set_function(&self, line: u32, function: LineFunction) {
        let reg = GPFSEL0 + (line as usize / 10) * 4;
        let shift = (line % 10) * 3;
        let mut value = read_reg(self.base, reg);
        value &= !(0b111 << shift);
        value |= (function as u32) << shift;
        write_reg(self.base, reg, value);
    }

    /// Drive one output line high or low.
    ///
    /// Set/clear registers are write-only and write-1-to-act, so this
    /// never read-modifies and cannot disturb other lines.
    pub fn set_output(&self, line: u32, high: bool) {
        let bank = (line as usize / 32) * 4;
        let bit = 1u32 << (line % 32);
        let reg = if high { GPSET0 } else { GPCLR0 };
        write_reg(self.base, reg + bank, bit);
    }

    /// Set output lines from a raw bank-1 mask (lines 32..=53).
    ///
    /// Backs syscall 43: the mask is applied verbatim to the second
    /// set register.
    pub fn set_bank1_mask(&self, mask: u32) {
        write_reg(self.base, GPSET0 + 4, mask);
    }

    /// Clear output lines from a raw bank-1 mask (lines 32..=53).
    ///
    /// Backs syscall 42.
    pub fn clear_bank1_mask(&self, mask: u32) {
        write_reg(self.base, GPCLR0 + 4, mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(4))]
    struct FakeBank([u32; 16]);

    fn fake() -> FakeBank {
        FakeBank([0; 16])
    }

    #[test]
    fn test_set_function_packs_three_bits() {
        let mut bank = fake();
        let gpio = unsafe { Gpio::new(bank.0.as_mut_ptr() as usize) };

        // Line 47 lives in GPFSEL4 at bits 23:21
        gpio.set_function(47, LineFunction::Output);
        assert_eq!(bank.0[4], 0b001 << 21);

        // Re-selecting a neighbor leaves line 47 alone
        gpio.set_function(48, LineFunction::Output);
        assert_eq!(bank.0[4], (0b001 << 21) | (0b001 << 24));

        gpio.set_function(47, LineFunction::Input);
        assert_eq!(bank.0[4], 0b001 << 24);
    }

    #[test]
    fn test_set_output_targets_correct_bank() {
        let mut bank = fake();
        let gpio = unsafe { Gpio::new(bank.0.as_mut_ptr() as usize) };

        gpio.set_output(47, true);
        assert_eq!(bank.0[GPSET0 / 4 + 1], 1 << 15);

        gpio.set_output(47, false);
        assert_eq!(bank.0[GPCLR0 / 4 + 1], 1 << 15);

        gpio.set_output(5, true);
        assert_eq!(bank.0[GPSET0 / 4], 1 << 5);
    }

    #[test]
    fn test_bank1_masks_write_through() {
        let mut bank = fake();
        let gpio = unsafe { Gpio::new(bank.0.as_mut_ptr() as usize) };

        gpio.set_bank1_mask(0x8000);
        assert_eq!(bank.0[GPSET0 / 4 + 1], 0x8000);
        gpio.clear_bank1_mask(0x8000);
        assert_eq!(bank.0[GPCLR0 / 4 + 1], 0x8000);
    }
}
