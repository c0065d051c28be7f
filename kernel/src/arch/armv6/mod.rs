//! ARMv6 architecture support
//!
//! Barriers, interrupt masking, user-mode entry, and the CP15-backed
//! subsystems: translation tables ([`mmu`]), domain access control
//! ([`domain`]) and the trap vector table ([`exception`]).
//!
//! The ARM1176 predates the dedicated `dmb`/`dsb`/`isb` mnemonics; all
//! three barriers are CP15 c7 operations on this core.

pub mod domain;
pub mod exception;
pub mod mmu;

/// Data memory barrier: orders memory accesses across the barrier.
#[inline(always)]
pub fn dmb() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    unsafe {
        core::arch::asm!(
            "mcr p15, 0, {t}, c7, c10, 5",
            t = in(reg) 0u32,
            options(nostack, preserves_flags),
        );
    }
}

/// Data synchronization barrier: completes all outstanding accesses.
///
/// Required around peripheral hand-offs (mailbox submissions, timer
/// compare writes) and before any translation or domain state change.
#[inline(always)]
pub fn dsb() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    unsafe {
        core::arch::asm!(
            "mcr p15, 0, {t}, c7, c10, 4",
            t = in(reg) 0u32,
            options(nostack, preserves_flags),
        );
    }
}

/// Instruction synchronization barrier (prefetch flush on ARMv6).
#[inline(always)]
pub fn isb() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    unsafe {
        core::arch::asm!(
            "mcr p15, 0, {t}, c7, c5, 4",
            t = in(reg) 0u32,
            options(nostack, preserves_flags),
        );
    }
}

/// Unmask IRQs on the current core.
///
/// # Safety
/// The vector table and every banked trap stack must be installed first.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub unsafe fn enable_irqs() {
    core::arch::asm!("cpsie i", options(nostack, preserves_flags));
}

/// Park the core until the next interrupt.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn wait_for_interrupt() {
    unsafe {
        core::arch::asm!(
            "mcr p15, 0, {t}, c7, c0, 4",
            t = in(reg) 0u32,
            options(nostack, preserves_flags),
        );
    }
}

/// Drop to user mode and jump to the program entry point. Never returns.
///
/// Goes through system mode (which shares the user-mode register bank) to
/// plant the user stack pointer, then switches to user with IRQs enabled
/// and branches.
///
/// # Safety
/// - `entry` must be mapped executable in the active (user) table
/// - `stack_top` must be mapped writable in the active table
/// - The domain access word must already hold the default (Client)
///   configuration; nothing below this call can restore it
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub unsafe fn enter_user(entry: usize, stack_top: usize) -> ! {
    core::arch::asm!(
        "cps #0x1f",          // system mode: shares the user register bank
        "mov sp, {stack}",
        "cps #0x10",          // user mode (IRQs stay enabled)
        "bx {entry}",
        stack = in(reg) stack_top,
        entry = in(reg) entry,
        options(noreturn),
    );
}
