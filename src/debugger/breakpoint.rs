//! Software breakpoint engine (component C).
//!
//! Grounded on the teacher's `src/debugger/breakpoint.rs`: patch the
//! target byte with `0xCC` (`int3`), saving the original byte so
//! `disable` can restore it. ptrace only peeks/pokes whole 8-byte words,
//! so enabling/disabling a breakpoint always splices one byte into a
//! freshly-read word rather than writing a lone byte.

use crate::debugger::address::RelocatedAddress;
use crate::debugger::error::Error;
use crate::debugger::tracee::Tracee;
use crate::weak_error;
use std::cell::Cell;
use std::collections::HashMap;

const INT3: u8 = 0xCC;

/// A single installed (or installable) breakpoint at a fixed runtime
/// address.
pub struct Breakpoint {
    addr: RelocatedAddress,
    saved_byte: Cell<u8>,
    enabled: Cell<bool>,
}

impl Breakpoint {
    pub fn new(addr: RelocatedAddress) -> Self {
        Self {
            addr,
            saved_byte: Cell::new(0),
            enabled: Cell::new(false),
        }
    }

    pub fn addr(&self) -> RelocatedAddress {
        self.addr
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Splice `0xCC` into the low byte of the word at `addr`, remembering
    /// the byte it replaced.
    pub fn enable(&self, tracee: &Tracee) -> Result<(), Error> {
        if self.enabled.get() {
            return Ok(());
        }
        let word = tracee.peek(self.addr.as_usize())?;
        self.saved_byte.set((word & 0xff) as u8);
        let patched = (word & !0xffu64) | INT3 as u64;
        tracee.poke(self.addr.as_usize(), patched)?;
        self.enabled.set(true);
        Ok(())
    }

    /// Restore the byte saved by [`Self::enable`].
    pub fn disable(&self, tracee: &Tracee) -> Result<(), Error> {
        if !self.enabled.get() {
            return Ok(());
        }
        let word = tracee.peek(self.addr.as_usize())?;
        let restored = (word & !0xffu64) | self.saved_byte.get() as u64;
        tracee.poke(self.addr.as_usize(), restored)?;
        self.enabled.set(false);
        Ok(())
    }
}

/// Registry of breakpoints keyed by runtime address.
#[derive(Default)]
pub struct BreakpointTable {
    breakpoints: HashMap<RelocatedAddress, Breakpoint>,
}

impl BreakpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and enable a breakpoint at `addr`. Overwrites (and first
    /// disables) any existing breakpoint at the same address.
    pub fn set(&mut self, tracee: &Tracee, addr: RelocatedAddress) -> Result<(), Error> {
        if let Some(existing) = self.breakpoints.remove(&addr) {
            existing.disable(tracee)?;
        }
        let bp = Breakpoint::new(addr);
        bp.enable(tracee)?;
        self.breakpoints.insert(addr, bp);
        Ok(())
    }

    /// Disable and remove the breakpoint at `addr`, if any.
    pub fn remove(&mut self, tracee: &Tracee, addr: RelocatedAddress) -> Result<(), Error> {
        if let Some(bp) = self.breakpoints.remove(&addr) {
            bp.disable(tracee)?;
        }
        Ok(())
    }

    pub fn at(&self, addr: RelocatedAddress) -> Option<&Breakpoint> {
        self.breakpoints.get(&addr)
    }

    pub fn contains(&self, addr: RelocatedAddress) -> bool {
        self.breakpoints.contains_key(&addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    /// Disable every installed breakpoint, e.g. before single-stepping
    /// over one. One breakpoint's restore failing shouldn't stop the
    /// others from being restored, so failures are logged rather than
    /// propagated.
    pub fn disable_all(&self, tracee: &Tracee) {
        for bp in self.breakpoints.values() {
            weak_error!(bp.disable(tracee));
        }
    }

    /// Re-enable every breakpoint previously disabled by
    /// [`Self::disable_all`].
    pub fn enable_all(&self, tracee: &Tracee) {
        for bp in self.breakpoints.values() {
            weak_error!(bp.enable(tracee));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_preserves_other_bytes() {
        let word: u64 = 0x1122_3344_5566_7788;
        let patched = (word & !0xffu64) | INT3 as u64;
        assert_eq!(patched, 0x1122_3344_5566_77CC);
        let restored = (patched & !0xffu64) | 0x88;
        assert_eq!(restored, word);
    }

    #[test]
    fn new_breakpoint_starts_disabled() {
        let bp = Breakpoint::new(RelocatedAddress::from(0x1000usize));
        assert!(!bp.is_enabled());
        assert_eq!(bp.addr(), RelocatedAddress::from(0x1000usize));
    }

    #[test]
    fn table_starts_empty() {
        let table = BreakpointTable::new();
        assert!(!table.contains(RelocatedAddress::from(0x1000usize)));
        assert!(table.iter().next().is_none());
    }
}
