//! Exception vectors and trap dispatch
//!
//! The vector table is eight `ldr pc, [pc, #24]` slots followed by a
//! literal pool of handler addresses, installed through VBAR. Exception
//! entry on ARM automatically masks IRQs, so the SVC and timer paths
//! never nest and the kernel's spin locks are uncontended by
//! construction.
//!
//! Every trap entry elevates the user domain with a [`DomainGuard`];
//! recoverable paths (SVC, IRQ) restore the previous access word when
//! the guard drops, fatal paths leak it because they never return.
//!
//! Fatal traps report twice: a line on the console, and a repeating
//! LED blink pattern that survives a dead console.
//!
//! | Trap             | Blinks |
//! |------------------|--------|
//! | Undefined instr  | 2      |
//! | Panic            | 3      |
//! | Data abort       | 4      |
//! | Prefetch abort   | 5      |
//! | Unexpected entry | 6      |

use crate::arch::armv6::domain::DomainGuard;
use crate::kprintln;

/// Fatal trap classes, ordered by blink count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapKind {
    Undefined,
    Panic,
    DataAbort,
    PrefetchAbort,
    /// A vector slot that should never be taken once the kernel is up:
    /// reset, the reserved slot, or FIQ (never unmasked).
    UnexpectedEntry,
}

impl TrapKind {
    /// Console label for the trap report line.
    pub fn label(self) -> &'static str {
        match self {
            TrapKind::Undefined => "undefined instruction",
            TrapKind::Panic => "kernel panic",
            TrapKind::DataAbort => "data abort",
            TrapKind::PrefetchAbort => "prefetch abort",
            TrapKind::UnexpectedEntry => "unexpected vector entry",
        }
    }

    /// LED blinks per repetition of the fault pattern.
    pub fn blink_count(self) -> u32 {
        match self {
            TrapKind::Undefined => 2,
            TrapKind::Panic => 3,
            TrapKind::DataAbort => 4,
            TrapKind::PrefetchAbort => 5,
            TrapKind::UnexpectedEntry => 6,
        }
    }

    /// On-phase length of one blink. Data aborts blink slow so they are
    /// distinguishable from prefetch aborts when counting is hard.
    pub fn blink_period_us(self) -> u32 {
        match self {
            TrapKind::DataAbort => 500_000,
            _ => 250_000,
        }
    }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod vectors {
    use core::arch::global_asm;

    use super::TrapKind;
    use crate::arch::armv6::domain::DomainGuard;
    use crate::boot;
    use crate::sched;
    use crate::syscall;

    // Eight vector slots, each loading pc from the literal pool that
    // follows. `[pc, #24]` resolves to the pool word for the same slot
    // (pc reads as slot + 8).
    global_asm!(
        r#"
        .section .text.exception_vectors, "ax"
        .global exception_vectors
        .balign 32
    exception_vectors:
        ldr pc, [pc, #24]   // reset
        ldr pc, [pc, #24]   // undefined instruction
        ldr pc, [pc, #24]   // supervisor call
        ldr pc, [pc, #24]   // prefetch abort
        ldr pc, [pc, #24]   // data abort
        ldr pc, [pc, #24]   // (reserved)
        ldr pc, [pc, #24]   // irq
        ldr pc, [pc, #24]   // fiq
        .word vector_unexpected
        .word vector_undefined
        .word vector_svc
        .word vector_prefetch_abort
        .word vector_data_abort
        .word vector_unexpected
        .word vector_irq
        .word vector_unexpected

    // Full caller-visible register save: dispatch is free to clobber
    // r1-r3 per the calling convention, but the interrupted program
    // only ceded r0 (the result). The result overwrites the saved r0
    // slot before the restore.
    vector_svc:
        push {{r0-r12, lr}}
        bl swi_dispatch
        str r0, [sp]
        pop {{r0-r12, lr}}
        movs pc, lr

    vector_irq:
        sub lr, lr, #4
        push {{r0-r12, lr}}
        bl irq_dispatch
        ldmfd sp!, {{r0-r12, pc}}^
        "#
    );

    /// Install the vector table base.
    ///
    /// # Safety
    /// The banked trap-mode stacks must already be set up; the first
    /// exception taken after this uses them.
    pub unsafe fn install() {
        extern "C" {
            static exception_vectors: u8;
        }
        let base = &exception_vectors as *const u8 as u32;
        core::arch::asm!(
            "mcr p15, 0, {base}, c12, c0, 0",
            base = in(reg) base,
            options(nostack, preserves_flags),
        );
        crate::arch::armv6::isb();
    }

    /// SVC entry. Arguments arrive in r0-r2 as the user left them; the
    /// result goes back in r0.
    #[no_mangle]
    extern "C" fn swi_dispatch(number: u32, arg1: u32, arg2: u32) -> u32 {
        let _elevated = DomainGuard::elevate();
        boot::with_syscall_context(|ctx| syscall::dispatch(ctx, number, arg1, arg2))
    }

    /// IRQ entry. The system timer compare is the only interrupt source
    /// this kernel unmasks; anything else is spurious and ignored.
    #[no_mangle]
    extern "C" fn irq_dispatch() {
        let _elevated = DomainGuard::elevate();
        if let Some(board) = boot::try_board() {
            if board.timer.match_pending(crate::config::TIMER_CHANNEL) {
                boot::with_tick_context(|ctx| sched::run_tick(ctx));
            }
        }
    }

    /// Reset, reserved and FIQ slots all land here; none is expected
    /// after startup.
    #[no_mangle]
    extern "C" fn vector_unexpected() -> ! {
        super::fatal_trap(TrapKind::UnexpectedEntry)
    }

    #[no_mangle]
    extern "C" fn vector_undefined() -> ! {
        super::fatal_trap(TrapKind::Undefined)
    }

    #[no_mangle]
    extern "C" fn vector_prefetch_abort() -> ! {
        super::fatal_trap(TrapKind::PrefetchAbort)
    }

    #[no_mangle]
    extern "C" fn vector_data_abort() -> ! {
        super::fatal_trap(TrapKind::DataAbort)
    }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use vectors::install;

/// Report a fatal trap and blink its pattern forever.
///
/// Runs with the user domain left elevated (the guard is forgotten):
/// the fault may have originated anywhere, and the report path must be
/// able to touch every peripheral without faulting again.
pub fn fatal_trap(kind: TrapKind) -> ! {
    core::mem::forget(DomainGuard::elevate());
    kprintln!("[trap] fatal: {}", kind.label());
    blink_forever(kind)
}

/// Panic entry point, referenced from the binary's `#[panic_handler]`.
pub fn panic_halt(info: &core::panic::PanicInfo) -> ! {
    core::mem::forget(DomainGuard::elevate());
    kprintln!("[panic] {}", info);
    blink_forever(TrapKind::Panic)
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
fn blink_forever(kind: TrapKind) -> ! {
    use crate::boot;
    use crate::config;

    let Some(board) = boot::try_board() else {
        // Faulted before the board came up; nothing left to signal with.
        loop {
            crate::arch::armv6::wait_for_interrupt();
        }
    };

    let period = kind.blink_period_us();
    loop {
        for _ in 0..kind.blink_count() {
            board.gpio.set_output(config::LED_LINE, true);
            board.timer.delay_us(period);
            board.gpio.set_output(config::LED_LINE, false);
            board.timer.delay_us(period);
        }
        // Gap so repetitions are countable
        board.timer.delay_us(4 * period);
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn blink_forever(kind: TrapKind) -> ! {
    panic!("fatal trap: {}", kind.label());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blink_counts_are_distinct() {
        let kinds = [
            TrapKind::Undefined,
            TrapKind::Panic,
            TrapKind::DataAbort,
            TrapKind::PrefetchAbort,
            TrapKind::UnexpectedEntry,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.blink_count(), b.blink_count());
            }
        }
    }

    #[test]
    fn test_data_abort_blinks_slow() {
        assert!(TrapKind::DataAbort.blink_period_us() > TrapKind::PrefetchAbort.blink_period_us());
        assert_eq!(TrapKind::Undefined.blink_count(), 2);
        assert_eq!(TrapKind::Panic.blink_count(), 3);
        assert_eq!(TrapKind::DataAbort.blink_count(), 4);
        assert_eq!(TrapKind::PrefetchAbort.blink_count(), 5);
    }

    #[test]
    fn test_unexpected_entry_has_its_own_report() {
        assert_eq!(TrapKind::UnexpectedEntry.blink_count(), 6);
        assert_ne!(
            TrapKind::UnexpectedEntry.label(),
            TrapKind::Undefined.label()
        );
    }
}
