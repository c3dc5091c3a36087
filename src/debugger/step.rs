//! Execution stepper (component F).
//!
//! Grounded on the teacher's `src/debugger/step.rs`, trimmed down to this
//! scope's single-threaded, no-unwinder semantics: the teacher computes a
//! CFA per step to detect recursive self-calls; this core instead follows
//! the specification's simpler rule of "stop at the next new statement",
//! which is sufficient without call-frame unwinding.
//!
//! Every function here upholds the same invariant: control returns to the
//! caller only once the tracee is stopped (or has exited).

use crate::debugger::address::{GlobalAddress, RelocatedAddress};
use crate::debugger::breakpoint::BreakpointTable;
use crate::debugger::dwarf::DwarfContext;
use crate::debugger::error::Error;
use crate::debugger::register::Register;
use crate::debugger::tracee::{StopReason, Tracee};
use crate::weak_error;
use nix::sys::signal::Signal;

fn current_pc(tracee: &Tracee) -> Result<RelocatedAddress, Error> {
    Ok(RelocatedAddress::from(tracee.registers()?.value(Register::Rip)))
}

fn current_global_pc(tracee: &Tracee, load_address: usize) -> Result<GlobalAddress, Error> {
    Ok(current_pc(tracee)?.remove_load_offset(load_address))
}

/// Read the return address of the current frame: the 8 bytes at
/// `rbp + 8`, per the System V AMD64 frame convention. Programs built
/// with `-fomit-frame-pointer` are out of scope.
fn return_address(tracee: &Tracee) -> Result<RelocatedAddress, Error> {
    let rbp = tracee.registers()?.value(Register::Rbp);
    let word = tracee.peek(rbp as usize + 8)?;
    Ok(RelocatedAddress::from(word))
}

/// If the tracee is stopped exactly at an enabled breakpoint, disable
/// it, single-step past it, then re-enable it. A no-op (returns `None`)
/// if no enabled breakpoint sits at the current PC.
pub fn step_over_breakpoint(
    tracee: &Tracee,
    breakpoints: &BreakpointTable,
) -> Result<Option<StopReason>, Error> {
    let pc = current_pc(tracee)?;
    let Some(bp) = breakpoints.at(pc) else {
        return Ok(None);
    };
    if !bp.is_enabled() {
        return Ok(None);
    }
    bp.disable(tracee)?;
    let reason = tracee.single_step()?;
    bp.enable(tracee)?;
    Ok(Some(reason))
}

/// Execute exactly one machine instruction, stepping over a breakpoint
/// first if the tracee is currently stopped at one.
pub fn single_step_instruction(tracee: &Tracee, breakpoints: &BreakpointTable) -> Result<StopReason, Error> {
    if let Some(reason) = step_over_breakpoint(tracee, breakpoints)? {
        return Ok(reason);
    }
    tracee.single_step()
}

/// Resume the tracee until its next stop. If that stop lands one byte
/// past an enabled breakpoint (the `int3` the CPU already executed),
/// rewind the instruction pointer so the user observes being "at" the
/// breakpoint rather than just after it.
pub fn cont(tracee: &Tracee, breakpoints: &BreakpointTable) -> Result<StopReason, Error> {
    if let Some(reason) = step_over_breakpoint(tracee, breakpoints)? {
        if !matches!(reason, StopReason::Signaled(Signal::SIGTRAP)) {
            return Ok(reason);
        }
    }

    let reason = tracee.cont(None)?;
    if matches!(reason, StopReason::Signaled(Signal::SIGTRAP)) {
        let mut regs = tracee.registers()?;
        let stop_addr = RelocatedAddress::from(regs.value(Register::Rip));
        let bp_addr = stop_addr.offset(-1);
        if breakpoints.at(bp_addr).map(|b| b.is_enabled()).unwrap_or(false) {
            regs.update(Register::Rip, bp_addr.as_u64());
            tracee.set_registers(regs)?;
        }
    }
    Ok(reason)
}

/// Step at source-statement granularity, entering any function calls
/// along the way. Single-steps until the PC lands exactly on a line
/// entry, other than the starting one, that is a new-statement
/// boundary -- whether that's later in the same function or the first
/// statement of a callee.
pub fn step_in(
    tracee: &Tracee,
    breakpoints: &BreakpointTable,
    dwarf: &DwarfContext,
    load_address: usize,
) -> Result<StopReason, Error> {
    let start_pc = current_global_pc(tracee, load_address)?;
    let start_place = dwarf
        .line_entry_from_pc(start_pc)
        .ok_or(Error::PlaceNotFound(start_pc))?;
    let start_addr = start_place.address;

    loop {
        let reason = single_step_instruction(tracee, breakpoints)?;
        if !matches!(reason, StopReason::Signaled(Signal::SIGTRAP)) {
            return Ok(reason);
        }
        let pc = current_global_pc(tracee, load_address)?;
        if let Some(place) = dwarf.line_entry_at(pc) {
            if place.is_stmt && place.address != start_addr {
                return Ok(reason);
            }
        }
    }
}

/// Set a temporary breakpoint at the current frame's return address
/// (skipping it if one is already installed there), continue, then
/// remove the temporary.
pub fn step_out(tracee: &Tracee, breakpoints: &mut BreakpointTable) -> Result<StopReason, Error> {
    let ret_addr = return_address(tracee)?;
    let already_set = breakpoints.contains(ret_addr);
    if !already_set {
        breakpoints.set(tracee, ret_addr)?;
    }
    let reason = cont(tracee, breakpoints)?;
    if !already_set {
        // A failed cleanup shouldn't override the stepping outcome above.
        weak_error!(breakpoints.remove(tracee, ret_addr));
    }
    Ok(reason)
}

/// Step over the statement at the current PC without descending into
/// calls it makes: set a temporary breakpoint on every other
/// new-statement line in the enclosing function, plus one on the
/// return address, continue, then remove every temporary installed by
/// this call (an existing breakpoint at one of those addresses is left
/// alone).
pub fn step_over(
    tracee: &Tracee,
    breakpoints: &mut BreakpointTable,
    dwarf: &DwarfContext,
    load_address: usize,
) -> Result<StopReason, Error> {
    let pc = current_global_pc(tracee, load_address)?;
    let func = dwarf
        .find_function_by_pc(pc)
        .ok_or(Error::FunctionNotFound(pc))?;
    let (low, high) = (
        func.low_pc.ok_or(Error::FunctionNotFound(pc))?,
        func.high_pc.ok_or(Error::FunctionNotFound(pc))?,
    );

    let mut candidates = Vec::new();
    dwarf.for_each_line(|place| {
        let addr = place.address.as_u64();
        if place.is_stmt && addr >= low && addr < high && place.address != pc {
            candidates.push(place.address.relocate(load_address));
        }
    });

    let ret_addr = return_address(tracee)?;
    candidates.push(ret_addr);

    let mut installed = Vec::new();
    for addr in candidates {
        if !breakpoints.contains(addr) {
            breakpoints.set(tracee, addr)?;
            installed.push(addr);
        }
    }

    let reason = cont(tracee, breakpoints);

    for addr in installed {
        weak_error!(breakpoints.remove(tracee, addr));
    }

    reason
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewind_offset_is_one_byte() {
        let stop_addr = RelocatedAddress::from(0x4010usize);
        assert_eq!(stop_addr.offset(-1), RelocatedAddress::from(0x400Fusize));
    }
}
