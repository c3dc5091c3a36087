//! DWARF symbolication (component D).
//!
//! Grounded on the teacher's early, single-file `src/debugger/dwarf.rs`:
//! parse every compilation unit once at load time into a flat
//! `ParsedUnit` (line rows + a DFS-ordered DIE list), then answer
//! queries by binary search over sorted address ranges rather than
//! re-walking `gimli`'s DIE tree on every lookup.

pub mod eval;
pub mod r#type;

use crate::debugger::address::GlobalAddress;
use crate::debugger::error::Error;
use fallible_iterator::FallibleIterator;
use gimli::{
    DW_AT_location, DW_AT_type, DW_TAG_base_type, DW_TAG_formal_parameter, DW_TAG_lexical_block,
    DW_TAG_subprogram, DW_TAG_typedef, DW_TAG_unspecified_type, DW_TAG_variable, DwTag, Range,
    Reader, UnitOffset,
};
use object::{Object, ObjectSection};
use std::borrow::Cow;
use std::num::NonZeroU64;
use std::path::Path;
use std::rc::Rc;

use self::r#type::{attr_name_string, classify_base_type, modifier_for_tag, TypeChain, TypeChainBuilder};

/// Reader type threaded through every `gimli` structure this debugger
/// builds. Single-threaded by design (no multi-threaded tracees, per
/// scope), so an `Rc`-backed slice is enough -- the teacher reaches for
/// `Arc` only in its later multi-threaded era.
pub type R = gimli::EndianRcSlice<gimli::RunTimeEndian>;

/// One resolved source location: a line-table row plus the file name it
/// points at.
pub struct Place<'a> {
    pub file: &'a str,
    pub address: GlobalAddress,
    pub line: u64,
    pub column: u64,
    pub is_stmt: bool,
    pub prologue_end: bool,
    pos_in_unit: usize,
    unit: &'a ParsedUnit,
}

impl<'a> Place<'a> {
    /// The next line-table row in the same unit, in address order.
    pub fn next(&self) -> Option<Place<'a>> {
        self.unit.place_at(self.pos_in_unit + 1)
    }
}

impl PartialEq for Place<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.address == other.address && self.line == other.line
    }
}

#[derive(Debug)]
struct LineRow {
    address: u64,
    file_index: u64,
    line: u64,
    column: u64,
    is_stmt: bool,
    prologue_end: bool,
}

/// A debug-info entry, flattened out of `gimli`'s DIE tree. `parent` and
/// `depth` are enough to reconstruct subtree membership (used by
/// [`DwarfContext::runtime_variable`]) without keeping the tree itself
/// around.
#[derive(Debug)]
pub struct Die {
    pub tag: DwTag,
    pub name: Option<String>,
    pub low_pc: Option<u64>,
    pub high_pc: Option<u64>,
    pub type_ref: Option<UnitOffset>,
    pub location: Option<gimli::AttributeValue<R>>,
    /// `DW_AT_frame_base`, present on `DW_TAG_subprogram` entries. Needed
    /// to evaluate `DW_OP_fbreg` locations of that function's locals.
    pub frame_base: Option<gimli::AttributeValue<R>>,
    pub parent: Option<usize>,
    pub depth: usize,
}

struct DieRange {
    range: Range,
    die_idx: usize,
}

struct ParsedUnit {
    unit: gimli::Unit<R>,
    files: Vec<String>,
    lines: Vec<LineRow>,
    ranges: Vec<Range>,
    dies: Vec<Die>,
    die_ranges: Vec<DieRange>,
}

impl ParsedUnit {
    fn place_at(&self, pos: usize) -> Option<Place<'_>> {
        let line = self.lines.get(pos)?;
        Some(Place {
            file: self.files.get(line.file_index as usize).map(String::as_str)?,
            address: line.address.into(),
            line: line.line,
            column: line.column,
            is_stmt: line.is_stmt,
            prologue_end: line.prologue_end,
            pos_in_unit: pos,
            unit: self,
        })
    }

    fn subtree_end(&self, idx: usize) -> usize {
        let depth = self.dies[idx].depth;
        let mut end = idx + 1;
        while end < self.dies.len() && self.dies[end].depth > depth {
            end += 1;
        }
        end
    }
}

pub struct DwarfContext {
    dwarf: gimli::Dwarf<R>,
    units: Vec<ParsedUnit>,
}

impl DwarfContext {
    pub fn load<'data, 'file, OBJ>(obj_file: &'data OBJ) -> Result<Self, Error>
    where
        'data: 'file,
        OBJ: Object<'data, 'file>,
    {
        let endian = if obj_file.is_little_endian() {
            gimli::RunTimeEndian::Little
        } else {
            gimli::RunTimeEndian::Big
        };

        let dwarf = gimli::Dwarf::load(|id| -> Result<R, Error> {
            let data = obj_file
                .section_by_name(id.name())
                .and_then(|section| section.uncompressed_data().ok())
                .unwrap_or(Cow::Borrowed(&[]));
            Ok(gimli::EndianRcSlice::new(Rc::from(&*data), endian))
        })?;

        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers.next()? {
            units.push(Self::parse_unit(&dwarf, header)?);
        }
        Ok(Self { dwarf, units })
    }

    fn parse_unit(
        dwarf: &gimli::Dwarf<R>,
        header: gimli::UnitHeader<R>,
    ) -> Result<ParsedUnit, Error> {
        let unit = dwarf.unit(header)?;

        let mut lines = Vec::new();
        let mut files = Vec::new();
        if let Some(ref line_program) = unit.line_program {
            let mut rows = line_program.clone().rows();
            while let Some((_header, row)) = rows.next_row()? {
                let column = match row.column() {
                    gimli::ColumnType::LeftEdge => 0,
                    gimli::ColumnType::Column(c) => c.get(),
                };
                lines.push(LineRow {
                    address: row.address(),
                    file_index: row.file_index(),
                    line: row.line().map(NonZeroU64::get).unwrap_or(0),
                    column,
                    is_stmt: row.is_stmt(),
                    prologue_end: row.prologue_end(),
                });
            }
            files = Self::parse_files(dwarf, &unit, line_program)?;
        }
        lines.sort_by_key(|l| l.address);

        let mut ranges = dwarf.unit_ranges(&unit)?.collect::<Vec<_>>()?;
        ranges.sort_by_key(|r| r.begin);

        let mut dies = Vec::new();
        let mut die_ranges = Vec::new();
        let mut cursor = unit.entries();
        // `ancestors` holds the DFS path down to (but excluding) the entry
        // currently being built; truncating it to `depth` entries before
        // each push reconstructs the parent chain without keeping gimli's
        // tree around.
        let mut ancestors: Vec<usize> = Vec::new();
        let mut depth: i64 = 0;
        while let Some((delta, die)) = cursor.next_dfs()? {
            depth += delta;
            ancestors.truncate(depth.max(0) as usize);

            let mut low_pc = None;
            if let Some(attr) = die.attr(gimli::DW_AT_low_pc)? {
                match attr.value() {
                    gimli::AttributeValue::Addr(v) => low_pc = Some(v),
                    gimli::AttributeValue::DebugAddrIndex(idx) => {
                        low_pc = Some(dwarf.address(&unit, idx)?)
                    }
                    _ => {}
                }
            }
            let mut high_pc = None;
            if let Some(attr) = die.attr(gimli::DW_AT_high_pc)? {
                match attr.value() {
                    gimli::AttributeValue::Addr(v) => high_pc = Some(v),
                    gimli::AttributeValue::DebugAddrIndex(idx) => {
                        high_pc = Some(dwarf.address(&unit, idx)?)
                    }
                    gimli::AttributeValue::Udata(v) => high_pc = Some(low_pc.unwrap_or(0) + v),
                    _ => {}
                }
            }
            let name = die
                .attr(gimli::DW_AT_name)?
                .and_then(|attr| dwarf.attr_string(&unit, attr.value()).ok())
                .and_then(|s| s.to_string_lossy().ok().map(|s| s.into_owned()));
            let type_ref = die.attr(DW_AT_type)?.and_then(|attr| match attr.value() {
                gimli::AttributeValue::UnitRef(offset) => Some(offset),
                _ => None,
            });
            let location = die.attr(DW_AT_location)?.map(|attr| attr.value());
            let frame_base = die
                .attr(gimli::DW_AT_frame_base)?
                .map(|attr| attr.value());

            let parent = ancestors.last().copied();
            dies.push(Die {
                tag: die.tag(),
                name,
                low_pc,
                high_pc,
                type_ref,
                location,
                frame_base,
                parent,
                depth: depth.max(0) as usize,
            });
            let this_idx = dies.len() - 1;

            dwarf.die_ranges(&unit, die)?.for_each(|range| {
                die_ranges.push(DieRange {
                    range,
                    die_idx: this_idx,
                });
                Ok(())
            })?;

            ancestors.push(this_idx);
        }
        die_ranges.sort_by_key(|dr| dr.range.begin);

        Ok(ParsedUnit {
            unit,
            files,
            lines,
            ranges,
            dies,
            die_ranges,
        })
    }

    fn parse_files(
        dwarf: &gimli::Dwarf<R>,
        unit: &gimli::Unit<R>,
        line_program: &gimli::IncompleteLineProgram<R>,
    ) -> Result<Vec<String>, Error> {
        let header = line_program.header();
        let mut files = Vec::new();
        match header.file(0) {
            Some(file) => files.push(Self::render_file_path(dwarf, unit, &file, header)?),
            None => files.push(String::new()),
        }
        let mut index = 1;
        while let Some(file) = header.file(index) {
            files.push(Self::render_file_path(dwarf, unit, &file, header)?);
            index += 1;
        }
        Ok(files)
    }

    fn render_file_path(
        dwarf: &gimli::Dwarf<R>,
        unit: &gimli::Unit<R>,
        file: &gimli::FileEntry<R>,
        header: &gimli::LineProgramHeader<R>,
    ) -> Result<String, Error> {
        let mut path = unit
            .comp_dir
            .as_ref()
            .map(|c| c.to_string_lossy().map(|s| s.into_owned()))
            .transpose()?
            .unwrap_or_default();

        if file.directory_index() != 0 {
            if let Some(dir) = file.directory(header) {
                push_component(&mut path, &dwarf.attr_string(unit, dir)?.to_string_lossy()?);
            }
        }
        push_component(
            &mut path,
            &dwarf
                .attr_string(unit, file.path_name())?
                .to_string_lossy()?,
        );
        Ok(path)
    }

    fn find_unit(&self, pc: u64) -> Option<&ParsedUnit> {
        self.units.iter().find(|u| {
            match u.ranges.binary_search_by_key(&pc, |r| r.begin) {
                Ok(_) => true,
                Err(pos) => u.ranges[..pos].iter().rev().any(|r| pc >= r.begin && pc < r.end),
            }
        })
    }

    fn die_idx_for_pc(unit: &ParsedUnit, pc: u64, tag: DwTag) -> Option<usize> {
        let find_pos = match unit.die_ranges.binary_search_by_key(&pc, |dr| dr.range.begin) {
            Ok(pos) => pos + 1,
            Err(pos) => pos,
        };
        unit.die_ranges[..find_pos]
            .iter()
            .rev()
            .find(|dr| unit.dies[dr.die_idx].tag == tag && dr.range.begin <= pc && pc < dr.range.end)
            .map(|dr| dr.die_idx)
    }

    /// Source file that contains `pc`, if debug info covers it.
    pub fn filepath_from_pc(&self, pc: GlobalAddress) -> Option<&str> {
        self.line_entry_from_pc(pc).map(|p| p.file)
    }

    /// Best-matching line-table row at or before `pc` (the row whose
    /// address range covers `pc`).
    pub fn line_entry_from_pc(&self, pc: GlobalAddress) -> Option<Place<'_>> {
        let pc = pc.as_u64();
        let unit = self.find_unit(pc)?;
        let pos = match unit.lines.binary_search_by_key(&pc, |l| l.address) {
            Ok(p) => p,
            Err(0) => return None,
            Err(p) => p - 1,
        };
        unit.place_at(pos)
    }

    /// Line-table row whose address exactly equals `pc`, if any --
    /// distinct from [`Self::line_entry_from_pc`], which tolerates `pc`
    /// falling inside a line's range.
    pub fn line_entry_at(&self, pc: GlobalAddress) -> Option<Place<'_>> {
        let place = self.line_entry_from_pc(pc)?;
        (place.address == pc).then_some(place)
    }

    /// The row at `file:line`, the parsing front-end for `enable
    /// file:line`.
    pub fn line_entry_for_file_line(&self, file: &str, line: u64) -> Option<Place<'_>> {
        for unit in &self.units {
            let unit_matches = unit
                .unit
                .name
                .as_ref()
                .map(|n| n.to_string_lossy().map(|s| s.contains(file)).unwrap_or(false))
                .unwrap_or(false);
            if !unit_matches {
                continue;
            }
            for (pos, row) in unit.lines.iter().enumerate() {
                if row.line == line {
                    return unit.place_at(pos);
                }
            }
        }
        None
    }

    /// Visit every line-table row across every unit, in no particular
    /// cross-unit order.
    pub fn for_each_line<F: FnMut(Place<'_>)>(&self, mut f: F) {
        for unit in &self.units {
            for pos in 0..unit.lines.len() {
                if let Some(place) = unit.place_at(pos) {
                    f(place);
                }
            }
        }
    }

    pub fn find_function_by_pc(&self, pc: GlobalAddress) -> Option<&Die> {
        let pc = pc.as_u64();
        let unit = self.find_unit(pc)?;
        Self::die_idx_for_pc(unit, pc, DW_TAG_subprogram).map(|idx| &unit.dies[idx])
    }

    pub fn find_function_by_name(&self, name: &str) -> Option<&Die> {
        self.units.iter().find_map(|unit| {
            unit.dies
                .iter()
                .find(|die| die.tag == DW_TAG_subprogram && die.name.as_deref() == Some(name))
        })
    }

    /// Best-effort first instruction past a function's prologue: prefer
    /// the line-table row marked `prologue_end`, otherwise fall back to
    /// the second statement-boundary row in the function (the original
    /// spec's documented fallback).
    pub fn effective_start_addr(&self, func: &Die) -> Result<GlobalAddress, Error> {
        let low_pc = func.low_pc.ok_or(Error::FunctionNotFound(0u64.into()))?;
        let mut place = self
            .line_entry_from_pc(low_pc.into())
            .ok_or(Error::PlaceNotFound(low_pc.into()))?;
        if place.prologue_end {
            return Ok(place.address);
        }
        let mut statement_rows_seen = 0;
        loop {
            if place.is_stmt {
                statement_rows_seen += 1;
                if statement_rows_seen >= 2 {
                    return Ok(place.address);
                }
            }
            match place.next() {
                Some(next) => place = next,
                None => return Ok(place.address),
            }
        }
    }

    /// Resolve `name` to a runtime location expression and its type
    /// chain, scoped to the function enclosing `pc` (lexical blocks
    /// along the way further narrow validity). Falls back to CU-scope
    /// variables if no local or parameter matches, per the
    /// enclosing-scope-precedence rule.
    pub fn runtime_variable<'a>(
        &'a self,
        pc: GlobalAddress,
        name: &str,
    ) -> Result<Option<(&'a Die, gimli::Expression<R>, TypeChain)>, Error> {
        let pc_u64 = pc.as_u64();
        let unit = match self.find_unit(pc_u64) {
            Some(u) => u,
            None => return Ok(None),
        };
        let func_idx = Self::die_idx_for_pc(unit, pc_u64, DW_TAG_subprogram);

        if let Some(func_idx) = func_idx {
            let range = (func_idx + 1)..unit.subtree_end(func_idx);
            if let Some(found) = self.match_in_range(unit, range, name, pc_u64, Some(func_idx))? {
                return Ok(Some(found));
            }
        }

        // No local/parameter match (or `pc` isn't inside any function at
        // all): fall back to file-scope variables -- direct children of
        // the compilation unit DIE, never nested inside a subprogram.
        let cu_scope: Vec<usize> = unit
            .dies
            .iter()
            .enumerate()
            .filter(|(idx, die)| *idx != 0 && die.parent == Some(0) && die.tag == DW_TAG_variable)
            .map(|(idx, _)| idx)
            .collect();
        for idx in cu_scope {
            if let Some(found) = self.match_one(unit, idx, name, pc_u64, None)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn match_in_range<'a>(
        &'a self,
        unit: &'a ParsedUnit,
        range: std::ops::Range<usize>,
        name: &str,
        pc_u64: u64,
        func_idx: Option<usize>,
    ) -> Result<Option<(&'a Die, gimli::Expression<R>, TypeChain)>, Error> {
        for idx in range {
            if let Some(found) = self.match_one(unit, idx, name, pc_u64, func_idx)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Test DIE `idx` against `name` and (if inside a function) scope.
    /// Once it matches, enclosing-scope precedence has picked the
    /// answer: a location attribute that's absent falls through to keep
    /// searching, but one that's present and simply doesn't cover `pc`
    /// (an out-of-range location list entry) is `LOC_UNAVAILABLE_AT_PC`,
    /// not a reason to keep looking for another DIE with the same name.
    fn match_one<'a>(
        &'a self,
        unit: &'a ParsedUnit,
        idx: usize,
        name: &str,
        pc_u64: u64,
        func_idx: Option<usize>,
    ) -> Result<Option<(&'a Die, gimli::Expression<R>, TypeChain)>, Error> {
        let die = &unit.dies[idx];
        let is_var = die.tag == DW_TAG_variable || die.tag == DW_TAG_formal_parameter;
        if !is_var || die.name.as_deref() != Some(name) {
            return Ok(None);
        }
        if let Some(func_idx) = func_idx {
            if !Self::in_scope(unit, idx, func_idx, pc_u64) {
                return Ok(None);
            }
        }
        let Some(expr) = self.location_expr(unit, die, pc_u64)? else {
            return Ok(None);
        };
        let chain = match die.type_ref {
            Some(offset) => self.resolve_type_chain(unit, offset)?,
            None => TypeChain::default(),
        };
        Ok(Some((die, expr, chain)))
    }

    /// Follow a `DW_AT_type` reference chain starting at `offset`,
    /// unwrapping modifiers and typedefs until a base type or an
    /// unspecified type terminates it.
    fn resolve_type_chain(&self, unit: &ParsedUnit, offset: UnitOffset) -> Result<TypeChain, Error> {
        let mut builder = TypeChainBuilder::new();
        let mut next = Some(offset);

        while let Some(off) = next {
            let mut cursor = unit.unit.entries_at_offset(off)?;
            cursor.next_entry()?;
            let die = cursor
                .current()
                .ok_or(Error::UnsupportedType(gimli::DwTag(0)))?;
            let tag = die.tag();

            if tag == DW_TAG_typedef {
                let name = attr_name_string(&self.dwarf, &unit.unit, die)?;
                builder.push_typedef(name);
                next = Self::type_ref_of(die)?;
                continue;
            }
            if let Some(modifier) = modifier_for_tag(tag) {
                builder.push_modifier(modifier);
                next = Self::type_ref_of(die)?;
                if next.is_none() {
                    // e.g. `const void` / `void *`: no DW_AT_type means
                    // the modified type is void.
                    builder.push_unspecified();
                }
                continue;
            }
            if tag == DW_TAG_base_type {
                let encoding = die
                    .attr_value(gimli::DW_AT_encoding)?
                    .and_then(|v| v.udata_value())
                    .map(|v| gimli::DwAte(v as u8));
                let byte_size = die
                    .attr_value(gimli::DW_AT_byte_size)?
                    .and_then(|v| v.udata_value())
                    .unwrap_or(0);
                let name = attr_name_string(&self.dwarf, &unit.unit, die)?;
                let tag = encoding
                    .and_then(|enc| classify_base_type(enc, byte_size, name.as_deref()))
                    .ok_or(Error::UnsupportedType(DW_TAG_base_type))?;
                builder.push_base_type(tag, byte_size as u8);
                next = None;
                continue;
            }
            if tag == DW_TAG_unspecified_type {
                builder.push_unspecified();
                next = None;
                continue;
            }
            return Err(Error::UnsupportedType(tag));
        }
        Ok(builder.finish())
    }

    fn type_ref_of(die: &gimli::DebuggingInformationEntry<R>) -> Result<Option<UnitOffset>, Error> {
        Ok(die.attr(DW_AT_type)?.and_then(|attr| match attr.value() {
            gimli::AttributeValue::UnitRef(offset) => Some(offset),
            _ => None,
        }))
    }

    fn in_scope(unit: &ParsedUnit, die_idx: usize, func_idx: usize, pc: u64) -> bool {
        let mut cur = unit.dies[die_idx].parent;
        while let Some(idx) = cur {
            if idx == func_idx {
                return true;
            }
            let ancestor = &unit.dies[idx];
            if ancestor.tag == DW_TAG_lexical_block {
                if let (Some(low), Some(high)) = (ancestor.low_pc, ancestor.high_pc) {
                    if !(pc >= low && pc < high) {
                        return false;
                    }
                }
            }
            cur = ancestor.parent;
        }
        true
    }

    /// Resolve a DIE's `DW_AT_location` to the expression that covers
    /// `pc`: a direct `DW_FORM_exprloc`, or a DWARF location list
    /// (`DW_FORM_sec_offset`/`DW_FORM_loclistx`) read via
    /// `gimli::Dwarf::locations()`, picking the first `(range, expr)`
    /// pair whose range contains `pc`. `Ok(None)` means the DIE carries
    /// no location attribute at all; `Err(LocUnavailableAtPc)` means it
    /// has a location list but none of its ranges cover `pc`.
    fn location_expr(
        &self,
        unit: &ParsedUnit,
        die: &Die,
        pc: u64,
    ) -> Result<Option<gimli::Expression<R>>, Error> {
        let Some(value) = die.location.as_ref() else {
            return Ok(None);
        };
        match value {
            gimli::AttributeValue::Exprloc(expr) => Ok(Some(expr.clone())),
            gimli::AttributeValue::LocationListsRef(offset) => {
                self.location_from_list(unit, *offset, pc).map(Some)
            }
            gimli::AttributeValue::DebugLocListsIndex(index) => {
                let offset = self.dwarf.locations.get_offset(
                    unit.unit.encoding(),
                    unit.unit.loclists_base,
                    *index,
                )?;
                self.location_from_list(unit, offset, pc).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Pick the first `(range, expr)` pair covering `pc` out of a DWARF
    /// location list, per the range-selection rule.
    fn location_from_list(
        &self,
        unit: &ParsedUnit,
        offset: gimli::LocationListsOffset,
        pc: u64,
    ) -> Result<gimli::Expression<R>, Error> {
        let mut iter = self.dwarf.locations.locations(
            offset,
            unit.unit.encoding(),
            unit.unit.low_pc,
            &self.dwarf.debug_addr,
            unit.unit.addr_base,
        )?;
        while let Some(entry) = iter.next()? {
            if entry.range.begin <= pc && pc < entry.range.end {
                return Ok(entry.data);
            }
        }
        Err(Error::LocUnavailableAtPc)
    }

    /// The enclosing subprogram's `DW_AT_frame_base` expression, needed
    /// to evaluate a local's `DW_OP_fbreg` location.
    pub fn frame_base_expr(&self, func: &Die) -> Option<gimli::Expression<R>> {
        match func.frame_base.as_ref()? {
            gimli::AttributeValue::Exprloc(expr) => Some(expr.clone()),
            _ => None,
        }
    }

    pub fn unit_encoding(&self, pc: GlobalAddress) -> Option<gimli::Encoding> {
        Some(self.find_unit(pc.as_u64())?.unit.encoding())
    }
}

fn push_component(path: &mut String, component: &str) {
    if component.starts_with('/') {
        *path = component.to_string();
        return;
    }
    if !path.is_empty() && !path.ends_with('/') {
        path.push('/');
    }
    path.push_str(component);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_line(address: u64, line: u64, prologue_end: bool, is_stmt: bool) -> LineRow {
        LineRow {
            address,
            file_index: 0,
            line,
            column: 0,
            is_stmt,
            prologue_end,
        }
    }

    #[test]
    fn push_component_replaces_on_absolute_path() {
        let mut path = String::from("/some/dir");
        push_component(&mut path, "/abs/other");
        assert_eq!(path, "/abs/other");
    }

    #[test]
    fn push_component_joins_relative() {
        let mut path = String::from("/some/dir");
        push_component(&mut path, "file.c");
        assert_eq!(path, "/some/dir/file.c");
    }

    #[test]
    fn line_sort_by_address_is_stable_for_prologue_search() {
        let mut lines = vec![
            make_line(0x20, 11, false, true),
            make_line(0x10, 10, false, true),
            make_line(0x18, 10, true, false),
        ];
        lines.sort_by_key(|l| l.address);
        assert_eq!(lines[0].address, 0x10);
        assert_eq!(lines[1].address, 0x18);
        assert!(lines[1].prologue_end);
    }
}
