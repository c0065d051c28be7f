//! ARM domain access control
//!
//! Memory sections belong to one of sixteen access-control domains; the
//! DACR holds a 2-bit access mode for each. This kernel uses two:
//!
//! - domain 0, the *kernel* domain: always `Manager` (permission bits in
//!   descriptors are ignored, every access succeeds)
//! - domain 1, the *user* domain: `Client` while the user program runs
//!   (permission bits enforced, so privileged-only MMIO faults from user
//!   mode) and `Manager` only while the kernel services a trap
//!
//! Elevation is expressed as an RAII guard so that every trap path
//! restores the previous access word on exit, including early returns.
//! Fatal paths that never return leak the guard deliberately with
//! [`core::mem::forget`].

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
use core::sync::atomic::{AtomicU32, Ordering};

/// Kernel domain number.
pub const DOMAIN_KERNEL: u32 = 0;

/// User domain number.
pub const DOMAIN_USER: u32 = 1;

/// Per-domain access mode, two bits in the DACR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DomainAccess {
    /// Every access faults regardless of permission bits
    NoAccess = 0b00,
    /// Permission bits in descriptors are enforced
    Client = 0b01,
    /// Permission bits are ignored; every access succeeds
    Manager = 0b11,
}

/// DACR word for normal operation: kernel Manager, user Client.
pub const DACR_DEFAULT: u32 =
    (DomainAccess::Manager as u32) << (DOMAIN_KERNEL * 2) | (DomainAccess::Client as u32) << (DOMAIN_USER * 2);

/// DACR word while the kernel services a trap: both domains Manager.
pub const DACR_ELEVATED: u32 =
    (DomainAccess::Manager as u32) << (DOMAIN_KERNEL * 2) | (DomainAccess::Manager as u32) << (DOMAIN_USER * 2);

// Host builds shadow the DACR in an atomic so guard semantics are
// testable off-target.
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
static DACR_SHADOW: AtomicU32 = AtomicU32::new(DACR_DEFAULT);

/// Read the current domain access control word.
#[inline]
pub fn read_dacr() -> u32 {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    {
        let dacr: u32;
        unsafe {
            core::arch::asm!(
                "mrc p15, 0, {dacr}, c3, c0, 0",
                dacr = out(reg) dacr,
                options(nostack, preserves_flags),
            );
        }
        dacr
    }
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    {
        DACR_SHADOW.load(Ordering::SeqCst)
    }
}

/// Program the domain access control word.
///
/// # Safety
/// Revoking access to a domain whose sections hold the executing code or
/// the current stack faults immediately. Callers must only move between
/// words that keep the kernel domain at `Manager`.
#[inline]
pub unsafe fn write_dacr(dacr: u32) {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    {
        super::dsb();
        core::arch::asm!(
            "mcr p15, 0, {dacr}, c3, c0, 0",
            dacr = in(reg) dacr,
            options(nostack, preserves_flags),
        );
        super::isb();
    }
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    {
        DACR_SHADOW.store(dacr, Ordering::SeqCst);
    }
}

/// Access mode of one domain in a DACR word.
pub fn domain_access(dacr: u32, domain: u32) -> DomainAccess {
    match (dacr >> (domain * 2)) & 0b11 {
        0b01 => DomainAccess::Client,
        0b11 => DomainAccess::Manager,
        _ => DomainAccess::NoAccess,
    }
}

/// Scoped elevation of the user domain to `Manager`.
///
/// Created at every trap entry; dropping it restores the exact access
/// word that was live before elevation, so nested guards unwind
/// correctly.
#[must_use = "dropping immediately re-lowers the domain"]
pub struct DomainGuard {
    saved: u32,
}

impl DomainGuard {
    /// Elevate the user domain for the lifetime of the guard.
    pub fn elevate() -> Self {
        let saved = read_dacr();
        unsafe { write_dacr(DACR_ELEVATED) };
        Self { saved }
    }

    /// The access word that will be restored on drop.
    pub fn saved(&self) -> u32 {
        self.saved
    }
}

impl Drop for DomainGuard {
    fn drop(&mut self) {
        unsafe { write_dacr(self.saved) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The shadow DACR is process-global, so these tests serialize
    // through a lock.
    use spin::Mutex;
    static DACR_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_access_words() {
        assert_eq!(DACR_DEFAULT, 0b0111);
        assert_eq!(DACR_ELEVATED, 0b1111);
        assert_eq!(domain_access(DACR_DEFAULT, DOMAIN_KERNEL), DomainAccess::Manager);
        assert_eq!(domain_access(DACR_DEFAULT, DOMAIN_USER), DomainAccess::Client);
        assert_eq!(domain_access(DACR_ELEVATED, DOMAIN_USER), DomainAccess::Manager);
        assert_eq!(domain_access(0, DOMAIN_USER), DomainAccess::NoAccess);
    }

    #[test]
    fn test_guard_restores_previous_word() {
        let _serial = DACR_LOCK.lock();
        unsafe { write_dacr(DACR_DEFAULT) };

        {
            let guard = DomainGuard::elevate();
            assert_eq!(read_dacr(), DACR_ELEVATED);
            assert_eq!(guard.saved(), DACR_DEFAULT);
        }
        assert_eq!(read_dacr(), DACR_DEFAULT);
    }

    #[test]
    fn test_nested_guards_unwind_in_order() {
        let _serial = DACR_LOCK.lock();
        unsafe { write_dacr(DACR_DEFAULT) };

        let outer = DomainGuard::elevate();
        {
            // A nested trap saves the already-elevated word and restores
            // it unchanged.
            let inner = DomainGuard::elevate();
            assert_eq!(inner.saved(), DACR_ELEVATED);
        }
        assert_eq!(read_dacr(), DACR_ELEVATED);
        drop(outer);
        assert_eq!(read_dacr(), DACR_DEFAULT);
    }

    #[test]
    fn test_leaked_guard_stays_elevated() {
        let _serial = DACR_LOCK.lock();
        unsafe { write_dacr(DACR_DEFAULT) };

        core::mem::forget(DomainGuard::elevate());
        assert_eq!(read_dacr(), DACR_ELEVATED);

        unsafe { write_dacr(DACR_DEFAULT) };
    }
}
