//! ELF view (component B).
//!
//! Named in `spec.md` §2 but not detailed further there; grounded on the
//! teacher's object-crate usage in `src/debugger/debugee/dwarf/symbol.rs`
//! and `loader.rs`. Wraps an mmap'd ELF file and answers the handful of
//! questions the rest of the debugger needs: entry point, executable
//! type, text section range, and symbol lookup by exact name.

use crate::debugger::address::GlobalAddress;
use crate::debugger::error::Error;
use memmap2::Mmap;
use object::{Object, ObjectSection, ObjectSymbol};
use std::fs::File;
use std::path::Path;

/// A memory-mapped ELF file plus the handful of facts the debugger reads
/// out of it. Owns the mapping so `object::File` borrows can outlive the
/// constructor.
pub struct ElfView {
    mmap: Mmap,
}

impl ElfView {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }

    fn parse(&self) -> Result<object::File<'_>, Error> {
        Ok(object::File::parse(&*self.mmap)?)
    }

    /// A parsed `object::File` view over the mapped ELF data, for
    /// callers (DWARF loading) that need the full `object::Object`
    /// surface rather than the handful of queries this type exposes
    /// directly.
    pub fn object(&self) -> Result<object::File<'_>, Error> {
        self.parse()
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.mmap
    }

    /// Entry point address as recorded in the ELF header, a
    /// [`GlobalAddress`] until the tracee's load address is known.
    pub fn entry_point(&self) -> Result<GlobalAddress, Error> {
        Ok(self.parse()?.entry().into())
    }

    /// True for `ET_DYN` (PIE/shared object) binaries, which need a
    /// runtime load address read from `/proc/<pid>/maps`.
    pub fn is_pie(&self) -> Result<bool, Error> {
        Ok(matches!(self.parse()?.kind(), object::ObjectKind::Dynamic))
    }

    /// Start/end of the `.text` section, in file-relative
    /// [`GlobalAddress`]es.
    pub fn text_range(&self) -> Result<(GlobalAddress, GlobalAddress), Error> {
        let obj = self.parse()?;
        let text = obj
            .section_by_name(".text")
            .ok_or(Error::NoDebugInformation(".text"))?;
        let start = text.address();
        let end = start + text.size();
        Ok((start.into(), end.into()))
    }

    /// Look up a global symbol by its exact name. Target programs are
    /// plain C, so symbol-table names are already unmangled.
    pub fn symbol(&self, name: &str) -> Result<GlobalAddress, Error> {
        let obj = self.parse()?;
        obj.symbols()
            .find(|sym| sym.name().map(|n| n == name).unwrap_or(false))
            .map(|sym| sym.address().into())
            .ok_or_else(|| Error::NoSuchSymbol(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_range_is_half_open_and_nonempty() {
        // Exercises the arithmetic independent of a real ELF file.
        let start: u64 = 0x401000;
        let size: u64 = 0x200;
        let (lo, hi): (GlobalAddress, GlobalAddress) = (start.into(), (start + size).into());
        assert!(lo.as_u64() < hi.as_u64());
        assert_eq!(hi.as_u64() - lo.as_u64(), size);
    }
}
