//! Address types.
//!
//! Grounded on the teacher's `src/debugger/address.rs`: two newtypes over
//! `usize` that are never implicitly interconvertible. `GlobalAddress` is
//! the address as it appears in the object file / debug info, unique per
//! file but not per process. `RelocatedAddress` is where that byte actually
//! lives in the traced process's address space, after the PIE load
//! address has been added in. The only legal conversions go through
//! `Session`'s single `load_address`, never ad hoc arithmetic at call
//! sites.

use std::fmt::{Display, Formatter};

/// Address inside the traced process's virtual address space.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Default, PartialOrd, Ord)]
pub struct RelocatedAddress(usize);

impl RelocatedAddress {
    #[inline(always)]
    pub fn remove_load_offset(self, load_address: usize) -> GlobalAddress {
        GlobalAddress(self.0 - load_address)
    }

    #[inline(always)]
    pub fn offset(self, offset: isize) -> RelocatedAddress {
        if offset >= 0 {
            self.0 + offset as usize
        } else {
            self.0 - offset.unsigned_abs()
        }
        .into()
    }

    #[inline(always)]
    pub fn as_u64(self) -> u64 {
        u64::from(self)
    }

    #[inline(always)]
    pub fn as_usize(self) -> usize {
        usize::from(self)
    }
}

impl From<usize> for RelocatedAddress {
    fn from(addr: usize) -> Self {
        RelocatedAddress(addr)
    }
}

impl From<u64> for RelocatedAddress {
    fn from(addr: u64) -> Self {
        RelocatedAddress(addr as usize)
    }
}

impl From<RelocatedAddress> for usize {
    fn from(addr: RelocatedAddress) -> Self {
        addr.0
    }
}

impl From<RelocatedAddress> for u64 {
    fn from(addr: RelocatedAddress) -> Self {
        addr.0 as u64
    }
}

impl Display for RelocatedAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:#016x}", self.0))
    }
}

/// Address as recorded in the ELF file or DWARF debug info.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct GlobalAddress(usize);

impl GlobalAddress {
    #[inline(always)]
    pub fn relocate(self, load_address: usize) -> RelocatedAddress {
        RelocatedAddress(self.0 + load_address)
    }

    pub fn in_range(self, range: &gimli::Range) -> bool {
        u64::from(self) >= range.begin && u64::from(self) < range.end
    }

    pub fn in_ranges(self, ranges: &[gimli::Range]) -> bool {
        ranges.iter().any(|range| self.in_range(range))
    }

    #[inline(always)]
    pub fn as_u64(self) -> u64 {
        u64::from(self)
    }

    #[inline(always)]
    pub fn as_usize(self) -> usize {
        usize::from(self)
    }
}

impl From<usize> for GlobalAddress {
    fn from(addr: usize) -> Self {
        GlobalAddress(addr)
    }
}

impl From<u64> for GlobalAddress {
    fn from(addr: u64) -> Self {
        GlobalAddress(addr as usize)
    }
}

impl From<GlobalAddress> for usize {
    fn from(addr: GlobalAddress) -> Self {
        addr.0
    }
}

impl From<GlobalAddress> for u64 {
    fn from(addr: GlobalAddress) -> Self {
        addr.0 as u64
    }
}

impl Display for GlobalAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:#016x}", self.0))
    }
}

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub enum Address {
    Relocated(RelocatedAddress),
    Global(GlobalAddress),
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Address::Relocated(addr) => addr.fmt(f),
            Address::Global(addr) => addr.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocate_roundtrip() {
        let global = GlobalAddress::from(0x1000usize);
        let relocated = global.relocate(0x5550_0000);
        assert_eq!(relocated, RelocatedAddress::from(0x5550_1000usize));
        assert_eq!(relocated.remove_load_offset(0x5550_0000), global);
    }

    #[test]
    fn relocate_zero_load_address_is_identity() {
        let global = GlobalAddress::from(0x4011_22usize);
        assert_eq!(global.relocate(0).as_usize(), global.as_usize());
    }

    #[test]
    fn offset_forward_and_backward() {
        let addr = RelocatedAddress::from(0x1000usize);
        assert_eq!(addr.offset(4), RelocatedAddress::from(0x1004usize));
        assert_eq!(addr.offset(-4), RelocatedAddress::from(0x0FFCusize));
    }

    #[test]
    fn in_range_is_half_open() {
        let range = gimli::Range {
            begin: 0x1000,
            end: 0x1010,
        };
        assert!(GlobalAddress::from(0x1000usize).in_range(&range));
        assert!(GlobalAddress::from(0x100Fusize).in_range(&range));
        assert!(!GlobalAddress::from(0x1010usize).in_range(&range));
    }
}
