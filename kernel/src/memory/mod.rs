//! Memory model types
//!
//! Type-safe physical and virtual addresses for the section-mapped address
//! space. There is no allocator here: every mapping in the system is a
//! 1 MiB section written during boot, and the only address arithmetic the
//! kernel does is section indexing and alignment checks.

/// Size of one translation section (the only mapping granularity used).
pub const SECTION_SIZE: usize = 1 << 20;

/// Number of entries in a full translation table (4 GiB / 1 MiB).
pub const TABLE_ENTRIES: usize = 4096;

/// A physical address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysAddr(usize);

impl PhysAddr {
    /// Create a new physical address
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check alignment
    #[inline]
    pub const fn is_aligned(self, align: usize) -> bool {
        self.0 % align == 0
    }

    /// Round down to the containing section boundary
    #[inline]
    pub const fn section_base(self) -> Self {
        Self(self.0 & !(SECTION_SIZE - 1))
    }
}

/// A virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// Create a new virtual address
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check alignment
    #[inline]
    pub const fn is_aligned(self, align: usize) -> bool {
        self.0 % align == 0
    }

    /// Translation-table index of the section containing this address
    /// (the top 12 bits).
    #[inline]
    pub const fn section_index(self) -> usize {
        self.0 >> 20
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_index() {
        assert_eq!(VirtAddr::new(0).section_index(), 0);
        assert_eq!(VirtAddr::new(0x0010_0000).section_index(), 1);
        assert_eq!(VirtAddr::new(0x8000_0000).section_index(), 0x800);
        assert_eq!(VirtAddr::new(0x8012_3456).section_index(), 0x801);
    }

    #[test]
    fn test_section_base() {
        assert_eq!(
            PhysAddr::new(0x2012_3456).section_base(),
            PhysAddr::new(0x2010_0000)
        );
        assert!(PhysAddr::new(0x2010_0000).is_aligned(SECTION_SIZE));
        assert!(!PhysAddr::new(0x2010_0004).is_aligned(SECTION_SIZE));
    }
}
