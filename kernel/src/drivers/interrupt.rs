//! Interrupt controller register bank
//!
//! The ARM-side controller exposes two banks of 32 GPU interrupt lines
//! plus a handful of "basic" ARM-local lines. Enable and disable are
//! separate write-1-to-act registers, so routing a line never
//! read-modifies shared state.
//!
//! The handle starts at the pending-register block, not the peripheral's
//! nominal base.

use super::{read_reg, write_reg};

const PENDING1: usize = 0x04;
const PENDING2: usize = 0x08;
const ENABLE1: usize = 0x10;
const ENABLE2: usize = 0x14;
const DISABLE1: usize = 0x1C;
const DISABLE2: usize = 0x20;

/// Owned handle over the interrupt controller register block.
pub struct InterruptController {
    base: usize,
}

impl InterruptController {
    /// Create a handle at `base` (the pending-register block).
    ///
    /// # Safety
    /// `base` must be the mapped interrupt controller block and must not
    /// be handed to a second writer running concurrently.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Route a GPU interrupt line (0..64) to the core's IRQ input.
    pub fn enable(&self, line: u32) {
        let (reg, bit) = Self::select(ENABLE1, ENABLE2, line);
        write_reg(self.base, reg, bit);
    }

    /// Stop routing a GPU interrupt line.
    pub fn disable(&self, line: u32) {
        let (reg, bit) = Self::select(DISABLE1, DISABLE2, line);
        write_reg(self.base, reg, bit);
    }

    /// Whether a GPU interrupt line is asserted.
    pub fn pending(&self, line: u32) -> bool {
        let (reg, bit) = Self::select(PENDING1, PENDING2, line);
        read_reg(self.base, reg) & bit != 0
    }

    fn select(low: usize, high: usize, line: u32) -> (usize, u32) {
        if line < 32 {
            (low, 1 << line)
        } else {
            (high, 1 << (line - 32))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(4))]
    struct FakeBank([u32; 9]);

    #[test]
    fn test_enable_disable_pick_bank_by_line() {
        let mut bank = FakeBank([0; 9]);
        let ic = unsafe { InterruptController::new(bank.0.as_mut_ptr() as usize) };

        ic.enable(3);
        assert_eq!(bank.0[ENABLE1 / 4], 1 << 3);

        ic.enable(35);
        assert_eq!(bank.0[ENABLE2 / 4], 1 << 3);

        ic.disable(3);
        assert_eq!(bank.0[DISABLE1 / 4], 1 << 3);
    }

    #[test]
    fn test_pending_reads_correct_bank() {
        let mut bank = FakeBank([0; 9]);
        bank.0[PENDING1 / 4] = 1 << 3;
        let ic = unsafe { InterruptController::new(bank.0.as_mut_ptr() as usize) };

        assert!(ic.pending(3));
        assert!(!ic.pending(35));
    }
}
