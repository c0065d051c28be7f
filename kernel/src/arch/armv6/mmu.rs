//! ARMv6 section-mapped translation tables
//!
//! The whole address space is described with 1 MiB "section" descriptors
//! in a flat 4096-entry first-level table; no second-level (page) tables
//! exist. Two tables are built at boot:
//! - the *kernel table*: identity maps all 4 GiB, kernel domain
//! - the *user table*: a copy with the user program window opened and the
//!   exposed MMIO sections re-tagged into the user domain
//!
//! Only one table is active at a time (TTBR0); switching tables
//! invalidates every cached translation.
//!
//! # Descriptor format (short-descriptor section entry)
//! ```text
//! [31:20] physical section base
//! [11:10] AP      access permissions
//! [8:5]   domain  access-control group
//! [3]     C       cacheable
//! [2]     B       bufferable
//! [1:0]   0b10    section type tag
//! ```

use bitflags::bitflags;

use crate::memory::{PhysAddr, VirtAddr, SECTION_SIZE, TABLE_ENTRIES};

/// Low type-tag bits marking a first-level entry as a section.
pub const SECTION_TYPE: u32 = 0b10;

/// Mask selecting the physical base field of a section descriptor.
pub const SECTION_BASE_MASK: u32 = 0xFFF0_0000;

bitflags! {
    /// Section descriptor attribute bits (ARMv6 short-descriptor format)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u32 {
        /// Write-buffer allowed (B)
        const BUFFERABLE   = 1 << 2;

        /// Cache allowed (C)
        const CACHEABLE    = 1 << 3;

        /// Domain 1 (the user domain). Domain 0 is the all-zero default.
        const DOMAIN_USER  = 1 << 5;

        /// AP = 0b01: privileged read/write, user no access
        const AP_PRIV_RW   = 1 << 10;

        /// AP = 0b11: read/write at every privilege level
        const AP_FULL_RW   = 0b11 << 10;

        // Common combinations

        /// Kernel-domain normal memory, cached and buffered
        const KERNEL_NORMAL = Self::CACHEABLE.bits() | Self::BUFFERABLE.bits();

        /// Coprocessor-shared memory: caches and write buffer off so the
        /// GPU observes stores without explicit maintenance
        const COPROC_SHARED = 0;

        /// MMIO window moved into the user domain with privileged-only
        /// permission bits (enforced while the domain is Client)
        const USER_MMIO     = Self::DOMAIN_USER.bits() | Self::AP_PRIV_RW.bits();

        /// User program window: user-domain normal memory, accessible
        /// from user mode
        const USER_NORMAL   = Self::DOMAIN_USER.bits()
            | Self::AP_FULL_RW.bits()
            | Self::CACHEABLE.bits()
            | Self::BUFFERABLE.bits();
    }
}

/// One first-level entry describing a 1 MiB virtual-to-physical mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDescriptor(u32);

impl SectionDescriptor {
    /// Pack a descriptor from a section base and attribute flags.
    ///
    /// The base must be 1 MiB aligned; low bits of a misaligned base are
    /// masked off, so the descriptor silently maps the containing section
    /// instead. This is trusted boot-time code, so no validation is
    /// performed.
    pub const fn new(paddr: PhysAddr, flags: SectionFlags) -> Self {
        Self((paddr.as_usize() as u32 & SECTION_BASE_MASK) | flags.bits() | SECTION_TYPE)
    }

    /// The invalid (fault-on-access) entry.
    pub const fn invalid() -> Self {
        Self(0)
    }

    /// Raw descriptor word as installed in the table.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Physical section base encoded in this descriptor.
    #[inline]
    pub const fn base(self) -> PhysAddr {
        PhysAddr::new((self.0 & SECTION_BASE_MASK) as usize)
    }

    /// Whether the low tag bits mark this entry as a section.
    #[inline]
    pub const fn is_section(self) -> bool {
        self.0 & 0b11 == SECTION_TYPE
    }

    /// Attribute bits (everything but the base and the type tag).
    #[inline]
    pub fn flags(self) -> SectionFlags {
        SectionFlags::from_bits_truncate(self.0)
    }
}

/// First-level translation table (16 KiB, hardware-walked).
///
/// Mutated only during boot, before or between activations; the hardware
/// table walker treats it as read-only afterwards.
#[repr(C, align(16384))]
pub struct TranslationTable {
    entries: [u32; TABLE_ENTRIES],
}

impl TranslationTable {
    /// Create a table with every entry faulting.
    pub const fn new() -> Self {
        Self {
            entries: [0; TABLE_ENTRIES],
        }
    }

    /// Write one section descriptor.
    ///
    /// Both addresses must be 1 MiB aligned; see
    /// [`SectionDescriptor::new`] for why nothing is validated here.
    pub fn map_section(&mut self, vaddr: VirtAddr, paddr: PhysAddr, flags: SectionFlags) {
        self.entries[vaddr.section_index()] = SectionDescriptor::new(paddr, flags).raw();
    }

    /// Identity map `count` sections starting at `base` with `flags`.
    pub fn map_identity_range(&mut self, base: usize, count: usize, flags: SectionFlags) {
        for i in 0..count {
            let addr = base + i * SECTION_SIZE;
            self.map_section(VirtAddr::new(addr), PhysAddr::new(addr), flags);
        }
    }

    /// Read back the descriptor at a table index.
    #[inline]
    pub fn entry(&self, index: usize) -> SectionDescriptor {
        SectionDescriptor(self.entries[index])
    }

    /// Copy every entry from another table (user table = kernel table
    /// plus deltas).
    pub fn copy_from(&mut self, other: &TranslationTable) {
        self.entries = other.entries;
    }

    /// Physical base address of the table itself (identity-mapped boot
    /// memory, so the reference address is the physical address).
    pub fn phys_addr(&self) -> PhysAddr {
        PhysAddr::new(self as *const _ as usize)
    }
}

/// Install a table as the active translation table and invalidate all
/// cached translations.
///
/// # Safety
/// - The MMU must already be enabled (see [`enable`])
/// - The executing code, the current stacks, and the peripheral windows
///   in use must be mapped identically in `table`, or control flow dies
///   on the next fetch
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub unsafe fn activate(table: &TranslationTable) {
    use super::{dsb, isb};

    dsb();
    core::arch::asm!(
        "mcr p15, 0, {ttbr}, c2, c0, 0", // TTBR0
        "mcr p15, 0, {zero}, c8, c7, 0", // invalidate unified TLB
        ttbr = in(reg) table.phys_addr().as_usize() as u32,
        zero = in(reg) 0u32,
        options(nostack, preserves_flags),
    );
    dsb();
    isb();
}

/// Turn the MMU on with `table` active, enabling the caches in the same
/// control-register write.
///
/// # Safety
/// - Must be called exactly once, from identity-mapped code
/// - `table` must identity map the executing kernel image
/// - The domain access word must be programmed first (a zeroed DACR
///   faults every access the moment translation starts)
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub unsafe fn enable(table: &TranslationTable) {
    use super::{dsb, isb};

    const CTRL_MMU: u32 = 1 << 0;
    const CTRL_DCACHE: u32 = 1 << 2;
    const CTRL_ICACHE: u32 = 1 << 12;

    dsb();
    core::arch::asm!(
        "mcr p15, 0, {ttbr}, c2, c0, 0", // TTBR0
        "mcr p15, 0, {zero}, c8, c7, 0", // invalidate unified TLB
        ttbr = in(reg) table.phys_addr().as_usize() as u32,
        zero = in(reg) 0u32,
        options(nostack, preserves_flags),
    );
    dsb();

    let mut ctrl: u32;
    core::arch::asm!(
        "mrc p15, 0, {ctrl}, c1, c0, 0",
        ctrl = out(reg) ctrl,
        options(nostack, preserves_flags),
    );
    ctrl |= CTRL_MMU | CTRL_DCACHE | CTRL_ICACHE;
    core::arch::asm!(
        "mcr p15, 0, {ctrl}, c1, c0, 0",
        ctrl = in(reg) ctrl,
        options(nostack, preserves_flags),
    );
    dsb();
    isb();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_size_and_alignment() {
        assert_eq!(core::mem::size_of::<TranslationTable>(), 16 * 1024);
        assert_eq!(core::mem::align_of::<TranslationTable>(), 16 * 1024);
    }

    #[test]
    fn test_descriptor_packs_base_and_tag() {
        let desc = SectionDescriptor::new(
            PhysAddr::new(0x2030_0000),
            SectionFlags::KERNEL_NORMAL,
        );
        assert_eq!(desc.base(), PhysAddr::new(0x2030_0000));
        assert!(desc.is_section());
        assert!(desc.flags().contains(SectionFlags::CACHEABLE));
        assert!(desc.flags().contains(SectionFlags::BUFFERABLE));
        assert!(!SectionDescriptor::invalid().is_section());
    }

    #[test]
    fn test_map_section_indexes_by_high_bits() {
        let mut table = TranslationTable::new();
        table.map_section(
            VirtAddr::new(0x8000_0000),
            PhysAddr::new(0x0100_0000),
            SectionFlags::USER_NORMAL,
        );

        let desc = table.entry(0x800);
        assert!(desc.is_section());
        assert_eq!(desc.base(), PhysAddr::new(0x0100_0000));
        // Neighboring entries stay invalid
        assert!(!table.entry(0x7FF).is_section());
        assert!(!table.entry(0x801).is_section());
    }

    #[test]
    fn test_identity_range_and_copy() {
        let mut kernel = TranslationTable::new();
        kernel.map_identity_range(0, 4096, SectionFlags::COPROC_SHARED);
        kernel.map_section(
            VirtAddr::new(0),
            PhysAddr::new(0),
            SectionFlags::KERNEL_NORMAL,
        );

        let mut user = TranslationTable::new();
        user.copy_from(&kernel);
        assert_eq!(user.entry(0).raw(), kernel.entry(0).raw());
        assert_eq!(user.entry(4095).raw(), kernel.entry(4095).raw());

        // Re-permission one MMIO window in the copy only
        user.map_section(
            VirtAddr::new(0x2020_0000),
            PhysAddr::new(0x2020_0000),
            SectionFlags::USER_MMIO,
        );
        assert_ne!(user.entry(0x202).raw(), kernel.entry(0x202).raw());
        assert!(user.entry(0x202).flags().contains(SectionFlags::DOMAIN_USER));
        assert!(user.entry(0x202).flags().contains(SectionFlags::AP_PRIV_RW));
    }

    #[test]
    fn test_misaligned_base_is_masked_to_its_section() {
        // The low bits of a misaligned base are discarded, never merged
        // into the attribute field.
        let desc = SectionDescriptor::new(
            PhysAddr::new(0x2030_0004),
            SectionFlags::empty(),
        );
        assert_eq!(desc.base(), PhysAddr::new(0x2030_0000));
        assert!(desc.flags().is_empty());
    }
}
