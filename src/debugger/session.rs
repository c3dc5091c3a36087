//! Session state & command dispatch (component G).
//!
//! Grounded on the teacher's top-level `Debugger` struct
//! (`src/debugger/mod.rs`): one struct binding the tracee, breakpoint
//! table, ELF/DWARF views and the load address, exposing one method per
//! user-facing operation. The teacher's `Debugger` also tracks multiple
//! threads and a DAP/TUI-facing hook registry; neither applies here, so
//! this `Session` is flat: one tracee, one synchronous caller.
//!
//! Load-address computation for PIE binaries is grounded on the
//! teacher's `src/debugger/debugee/registry.rs`, which reads
//! `/proc/<pid>/maps` via `proc_maps` to find the text segment's actual
//! runtime base.

use crate::debugger::address::{GlobalAddress, RelocatedAddress};
use crate::debugger::breakpoint::BreakpointTable;
use crate::debugger::dwarf::eval::{EvalOption, ExpressionEvaluator};
use crate::debugger::dwarf::r#type::TypeChain;
use crate::debugger::dwarf::DwarfContext;
use crate::debugger::elf::ElfView;
use crate::debugger::error::Error;
use crate::debugger::register::{DwarfRegisterMap, Register};
use crate::debugger::step;
use crate::debugger::tracee::{StopReason as TraceeStopReason, Tracee};
use crate::weak_error;
use nix::sys::signal::Signal;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

/// Front-end-agnostic parse of `enable`/`disable`'s target argument, per
/// the original's `check_file_line`/`check_function_name` validators.
#[derive(Debug, Clone)]
pub enum BreakpointSpec {
    Address(u64),
    FileLine(String, u64),
    Function(String),
}

/// Why the tracee most recently stopped, for a [`StopReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    Breakpoint,
    Step,
    Signal(Signal),
    Entry,
}

/// A structured stop record, per `spec.md` §6's output contract.
#[derive(Debug, Clone)]
pub struct StopReport {
    pub address: RelocatedAddress,
    pub file: Option<String>,
    pub line: Option<u64>,
    pub column: Option<u64>,
    pub function: Option<String>,
    pub cause: StopCause,
}

/// Outcome of any command that resumes the tracee.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Stopped(StopReport),
    Exited(i32),
    Terminated(Signal),
}

/// One frame of a naive `rbp`-chain backtrace (no CFI unwinder in
/// scope; frame-pointer-omitting builds are out of scope per
/// `spec.md` §4.F).
#[derive(Debug, Clone)]
pub struct Frame {
    pub pc: RelocatedAddress,
    pub function: Option<String>,
}

/// Lazily-loaded, in-memory cache of source file lines. Not consumed by
/// any command in this core (pretty-printing source context is an
/// external collaborator's job per `spec.md` §1), but kept on `Session`
/// per `spec.md` §3's data model and populated so a front end can read
/// it without touching the filesystem itself.
#[derive(Default)]
pub struct SourceCache {
    files: HashMap<String, Rc<Vec<String>>>,
}

impl SourceCache {
    pub fn lines(&mut self, path: &str) -> Option<Rc<Vec<String>>> {
        if let Some(cached) = self.files.get(path) {
            return Some(Rc::clone(cached));
        }
        let text = fs::read_to_string(path).ok()?;
        let lines: Vec<String> = text.lines().map(str::to_owned).collect();
        let lines = Rc::new(lines);
        self.files.insert(path.to_string(), Rc::clone(&lines));
        Some(lines)
    }
}

pub struct Session {
    program_path: PathBuf,
    tracee: Tracee,
    breakpoints: BreakpointTable,
    elf: ElfView,
    dwarf: DwarfContext,
    load_address: usize,
    source_cache: SourceCache,
    history: Vec<String>,
}

impl Session {
    /// Spawn and trace `program_path`, load its ELF/DWARF, and compute
    /// its runtime load address. Does not yet run the tracee to `main`
    /// -- call [`Self::run_to_main`] once for that, matching
    /// `spec.md` §4.G's two-phase startup.
    pub fn launch(program_path: impl AsRef<Path>, args: &[String]) -> Result<Self, Error> {
        let program_path = program_path.as_ref().to_path_buf();
        let elf = ElfView::open(&program_path)?;
        let dwarf = {
            let obj = elf.object()?;
            DwarfContext::load(&obj)?
        };

        let program_str = program_path
            .to_str()
            .ok_or_else(|| Error::ParseErr("tracee path is not valid UTF-8".into()))?;
        let tracee = Tracee::spawn_and_trace(program_str, args)?;
        let load_address = Self::compute_load_address(&tracee, &elf, &program_path)?;

        Ok(Self {
            program_path,
            tracee,
            breakpoints: BreakpointTable::new(),
            elf,
            dwarf,
            load_address,
            source_cache: SourceCache::default(),
            history: Vec::new(),
        })
    }

    fn compute_load_address(tracee: &Tracee, elf: &ElfView, program_path: &Path) -> Result<usize, Error> {
        if !elf.is_pie()? {
            return Ok(0);
        }
        let canonical = program_path.canonicalize()?;
        let maps = proc_maps::get_process_maps(tracee.pid().as_raw()).map_err(Error::Io)?;
        let mapped_base = maps
            .iter()
            .filter(|m| m.filename() == Some(canonical.as_path()))
            .map(|m| m.start())
            .min()
            .ok_or(Error::NoDebugInformation("process memory mapping"))?;
        let (text_vaddr, _) = elf.text_range()?;
        Ok(mapped_base - text_vaddr.as_usize())
    }

    /// Continue until `main`'s first post-prologue statement, per
    /// `spec.md` §4.G. Called exactly once, right after [`Self::launch`].
    pub fn run_to_main(&mut self) -> Result<SessionEvent, Error> {
        let entry_addr = {
            let main_die = self
                .dwarf
                .find_function_by_name("main")
                .ok_or_else(|| Error::NoSuchSymbol("main".to_string()))?;
            self.dwarf.effective_start_addr(main_die)?.relocate(self.load_address)
        };

        let already_set = self.breakpoints.contains(entry_addr);
        if !already_set {
            self.breakpoints.set(&self.tracee, entry_addr)?;
        }
        let reason = step::cont(&self.tracee, &self.breakpoints)?;
        if !already_set {
            weak_error!(self.breakpoints.remove(&self.tracee, entry_addr));
        }
        self.classify(reason, StopCause::Entry)
    }

    pub fn program_path(&self) -> &Path {
        &self.program_path
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn push_history(&mut self, command: impl Into<String>) {
        self.history.push(command.into());
    }

    pub fn source_lines(&mut self, path: &str) -> Option<Rc<Vec<String>>> {
        self.source_cache.lines(path)
    }

    // ----------------------------------------------------------- breakpoints

    pub fn enable(&mut self, spec: &BreakpointSpec) -> Result<(), Error> {
        let addr = self.resolve_spec(spec)?;
        self.breakpoints.set(&self.tracee, addr)
    }

    pub fn disable(&mut self, spec: &BreakpointSpec) -> Result<(), Error> {
        let addr = self.resolve_spec(spec)?;
        self.breakpoints.remove(&self.tracee, addr)
    }

    fn resolve_spec(&self, spec: &BreakpointSpec) -> Result<RelocatedAddress, Error> {
        match spec {
            BreakpointSpec::Address(addr) => Ok(RelocatedAddress::from(*addr)),
            BreakpointSpec::FileLine(file, line) => {
                let place = self
                    .dwarf
                    .line_entry_for_file_line(file, *line)
                    .ok_or_else(|| Error::NoSuchSymbol(format!("{file}:{line}")))?;
                Ok(place.address.relocate(self.load_address))
            }
            BreakpointSpec::Function(name) => {
                let die = self
                    .dwarf
                    .find_function_by_name(name)
                    .ok_or_else(|| Error::NoSuchSymbol(name.clone()))?;
                Ok(self.dwarf.effective_start_addr(die)?.relocate(self.load_address))
            }
        }
    }

    // ----------------------------------------------------------- stepping

    pub fn single_step(&mut self) -> Result<SessionEvent, Error> {
        let reason = step::single_step_instruction(&self.tracee, &self.breakpoints)?;
        self.classify(reason, StopCause::Step)
    }

    pub fn step_in(&mut self) -> Result<SessionEvent, Error> {
        let reason = step::step_in(&self.tracee, &self.breakpoints, &self.dwarf, self.load_address)?;
        self.classify(reason, StopCause::Step)
    }

    pub fn step_over(&mut self) -> Result<SessionEvent, Error> {
        let reason = step::step_over(&self.tracee, &mut self.breakpoints, &self.dwarf, self.load_address)?;
        self.classify_continue(reason)
    }

    pub fn step_out(&mut self) -> Result<SessionEvent, Error> {
        let reason = step::step_out(&self.tracee, &mut self.breakpoints)?;
        self.classify_continue(reason)
    }

    pub fn continue_execution(&mut self) -> Result<SessionEvent, Error> {
        let reason = step::cont(&self.tracee, &self.breakpoints)?;
        self.classify_continue(reason)
    }

    /// Classify a stop that may have landed exactly on an enabled
    /// breakpoint (continue/step-over/step-out all resume freely and so
    /// may stop at one); anything else is reported under `fallback`.
    fn classify_continue(&self, reason: TraceeStopReason) -> Result<SessionEvent, Error> {
        if let TraceeStopReason::Signaled(Signal::SIGTRAP) = reason {
            let pc = RelocatedAddress::from(self.tracee.registers()?.value(Register::Rip));
            if self.breakpoints.at(pc).map(|b| b.is_enabled()).unwrap_or(false) {
                return self.classify(reason, StopCause::Breakpoint);
            }
        }
        self.classify(reason, StopCause::Step)
    }

    fn classify(&self, reason: TraceeStopReason, fallback: StopCause) -> Result<SessionEvent, Error> {
        match reason {
            TraceeStopReason::Exited(code) => Ok(SessionEvent::Exited(code)),
            TraceeStopReason::Killed(sig) => Ok(SessionEvent::Terminated(sig)),
            TraceeStopReason::Signaled(Signal::SIGTRAP) => Ok(SessionEvent::Stopped(self.build_stop_report(fallback)?)),
            TraceeStopReason::Signaled(sig) => Ok(SessionEvent::Stopped(self.build_stop_report(StopCause::Signal(sig))?)),
        }
    }

    fn build_stop_report(&self, cause: StopCause) -> Result<StopReport, Error> {
        let pc = RelocatedAddress::from(self.tracee.registers()?.value(Register::Rip));
        let global = pc.remove_load_offset(self.load_address);
        let place = self.dwarf.line_entry_from_pc(global);
        let function = self
            .dwarf
            .find_function_by_pc(global)
            .and_then(|d| d.name.clone());
        Ok(StopReport {
            address: pc,
            file: place.as_ref().map(|p| p.file.to_string()),
            line: place.as_ref().map(|p| p.line),
            column: place.as_ref().map(|p| p.column),
            function,
            cause,
        })
    }

    // ----------------------------------------------------------- registers & memory

    pub fn read_register(&self, name: &str) -> Result<u64, Error> {
        let reg = Register::from_str(name).map_err(|_| Error::RegisterNameNotFound(name.to_string()))?;
        Ok(self.tracee.registers()?.value(reg))
    }

    pub fn write_register(&self, name: &str, value: u64) -> Result<(), Error> {
        let reg = Register::from_str(name).map_err(|_| Error::RegisterNameNotFound(name.to_string()))?;
        let mut regs = self.tracee.registers()?;
        regs.update(reg, value);
        self.tracee.set_registers(regs)
    }

    pub fn memread(&self, addr: u64) -> Result<u64, Error> {
        self.tracee.peek(addr as usize)
    }

    pub fn memwrite(&self, addr: u64, value: u64) -> Result<(), Error> {
        self.tracee.poke(addr as usize, value)
    }

    // ----------------------------------------------------------- variables

    /// Resolve and read a source-level variable's current value, scoped
    /// to the function enclosing the current PC.
    pub fn read_variable(&self, name: &str) -> Result<(u64, TypeChain), Error> {
        let (result, chain) = self.evaluate_variable(name)?;
        let byte_size = chain.base_type().map(|(_, size)| size as usize).unwrap_or(8);
        let bytes = result.into_raw_buffer(byte_size)?;
        let mut buf = [0u8; 8];
        let n = bytes.len().min(8);
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok((u64::from_ne_bytes(buf), chain))
    }

    /// Resolve and write `value` to a source-level variable's location,
    /// scoped to the function enclosing the current PC.
    pub fn write_variable(&self, name: &str, value: u64) -> Result<(), Error> {
        let (result, chain) = self.evaluate_variable(name)?;
        let byte_size = chain.base_type().map(|(_, size)| size as usize).unwrap_or(8);
        result.write(value, byte_size)
    }

    fn evaluate_variable<'a>(&'a self, name: &str) -> Result<(crate::debugger::dwarf::eval::CompletedResult<'a>, TypeChain), Error> {
        let (expr, chain, encoding) = self.variable_expr(name)?;
        let frame_base = self.current_frame_base()?;
        let registers = DwarfRegisterMap::from(self.tracee.registers()?);
        let evaluator = ExpressionEvaluator::new(encoding, &self.tracee, registers);
        let opts = EvalOption::new()
            .with_relocation_addr(self.load_address as u64)
            .with_frame_base(frame_base);
        let result = evaluator.evaluate_with_opts(expr, opts)?;
        Ok((result, chain))
    }

    fn variable_expr(&self, name: &str) -> Result<(gimli::Expression<crate::debugger::dwarf::R>, TypeChain, gimli::Encoding), Error> {
        let pc = RelocatedAddress::from(self.tracee.registers()?.value(Register::Rip));
        let global = pc.remove_load_offset(self.load_address);
        let (_, expr, chain) = self
            .dwarf
            .runtime_variable(global, name)?
            .ok_or_else(|| Error::NoSuchSymbol(name.to_string()))?;
        let encoding = self
            .dwarf
            .unit_encoding(global)
            .ok_or(Error::NoDebugInformation("compilation unit encoding"))?;
        Ok((expr, chain, encoding))
    }

    fn current_frame_base(&self) -> Result<u64, Error> {
        let pc = RelocatedAddress::from(self.tracee.registers()?.value(Register::Rip));
        let global = pc.remove_load_offset(self.load_address);
        let func = self
            .dwarf
            .find_function_by_pc(global)
            .ok_or(Error::FunctionNotFound(global))?;
        let expr = self.dwarf.frame_base_expr(func).ok_or(Error::NoFrameBase)?;
        let encoding = self
            .dwarf
            .unit_encoding(global)
            .ok_or(Error::NoDebugInformation("compilation unit encoding"))?;
        let registers = DwarfRegisterMap::from(self.tracee.registers()?);
        let evaluator = ExpressionEvaluator::new(encoding, &self.tracee, registers);
        let opts = EvalOption::new().with_relocation_addr(self.load_address as u64);
        evaluator.evaluate_with_opts(expr, opts)?.addr().map(GlobalAddress::as_u64)
    }

    // ----------------------------------------------------------- backtrace

    /// Walk the `rbp` chain, one frame per saved `[rbp]`/`[rbp+8]` pair.
    /// Stops at a null `rbp` or once 256 frames are collected (runaway
    /// guard against a corrupted chain).
    pub fn backtrace(&self) -> Result<Vec<Frame>, Error> {
        let regs = self.tracee.registers()?;
        let mut pc = RelocatedAddress::from(regs.value(Register::Rip));
        let mut rbp = regs.value(Register::Rbp);

        let mut frames = Vec::new();
        for _ in 0..256 {
            let global = pc.remove_load_offset(self.load_address);
            let function = self.dwarf.find_function_by_pc(global).and_then(|d| d.name.clone());
            frames.push(Frame { pc, function });

            if rbp == 0 {
                break;
            }
            let saved_rbp = self.tracee.peek(rbp as usize)?;
            let return_addr = self.tracee.peek(rbp as usize + 8)?;
            if return_addr == 0 {
                break;
            }
            pc = RelocatedAddress::from(return_addr);
            rbp = saved_rbp;
        }
        Ok(frames)
    }

    pub fn kill(&self) -> Result<(), Error> {
        self.tracee.kill()
    }
}
