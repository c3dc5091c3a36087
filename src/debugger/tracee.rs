//! Tracee control (component A).
//!
//! Grounded on the teacher's `src/debugger/process.rs`: fork + `pre_exec`
//! to disable ASLR, then attach with ptrace before the tracee's `execve`
//! runs. The teacher multiplexes the child's stdout/stderr through
//! `os_pipe` for its TUI; this crate has no such consumer, so the child
//! simply inherits the terminal's stdio.
//!
//! Unlike the teacher, this crate has exactly one backend (real ptrace,
//! no remote debugging), so `Tracee` exposes its primitives as inherent
//! methods rather than through a trait.

use crate::debugger::error::Error;
use crate::debugger::register::RegisterMap;
use nix::libc::c_void;
use nix::sys;
use nix::sys::personality::Persona;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use std::os::unix::process::CommandExt;
use std::process::Command;

/// Why the tracee most recently stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stopped by a signal, typically `SIGTRAP` after a breakpoint hit or
    /// single step.
    Signaled(Signal),
    /// Exited normally with the given status code.
    Exited(i32),
    /// Killed by a signal before it could exit.
    Killed(Signal),
}

/// A traced child process, already attached and stopped at its first
/// instruction.
pub struct Tracee {
    pid: Pid,
}

impl Tracee {
    /// Fork, disable ASLR in the child, and attach via `PTRACE_TRACEME`
    /// before `execve`. Returns once the child has stopped on its initial
    /// `SIGTRAP` (post-exec).
    pub fn spawn_and_trace(program: &str, args: &[String]) -> Result<Self, Error> {
        let mut cmd = Command::new(program);
        cmd.args(args);

        unsafe {
            cmd.pre_exec(move || {
                sys::ptrace::traceme()?;
                sys::personality::set(Persona::ADDR_NO_RANDOMIZE)?;
                Ok(())
            });
        }

        match unsafe { fork().map_err(Error::TraceeFailed)? } {
            ForkResult::Parent { child: pid } => match waitpid(pid, None).map_err(Error::TraceeFailed)? {
                WaitStatus::Stopped(..) => Ok(Self { pid }),
                other => {
                    log::warn!(target: "debugger", "unexpected initial wait status: {other:?}");
                    Ok(Self { pid })
                }
            },
            ForkResult::Child => {
                let err = cmd.exec();
                panic!("exec of tracee failed: {err}");
            }
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn registers(&self) -> Result<RegisterMap, Error> {
        RegisterMap::current(self.pid).map_err(Error::TraceeFailed)
    }

    pub fn set_registers(&self, regs: RegisterMap) -> Result<(), Error> {
        regs.persist(self.pid).map_err(Error::TraceeFailed)
    }

    /// Read one 8-byte word at `addr` from the tracee's address space.
    pub fn peek(&self, addr: usize) -> Result<u64, Error> {
        sys::ptrace::read(self.pid, addr as *mut c_void)
            .map(|v| v as u64)
            .map_err(Error::TraceeFailed)
    }

    /// Write one 8-byte word at `addr` in the tracee's address space.
    pub fn poke(&self, addr: usize, value: u64) -> Result<(), Error> {
        unsafe {
            sys::ptrace::write(self.pid, addr as *mut c_void, value as *mut c_void)
                .map_err(Error::TraceeFailed)
        }
    }

    /// Resume execution, optionally delivering `signal`, and block until
    /// the next stop.
    pub fn cont(&self, signal: Option<Signal>) -> Result<StopReason, Error> {
        sys::ptrace::cont(self.pid, signal).map_err(Error::TraceeFailed)?;
        self.wait_stop()
    }

    /// Execute exactly one machine instruction and block until the next
    /// stop.
    pub fn single_step(&self) -> Result<StopReason, Error> {
        sys::ptrace::step(self.pid, None).map_err(Error::TraceeFailed)?;
        self.wait_stop()
    }

    /// Block until the tracee changes state, classifying the result.
    pub fn wait_stop(&self) -> Result<StopReason, Error> {
        match waitpid(self.pid, Some(WaitPidFlag::empty())).map_err(Error::TraceeFailed)? {
            WaitStatus::Stopped(_, sig) => Ok(StopReason::Signaled(sig)),
            WaitStatus::Exited(_, code) => Ok(StopReason::Exited(code)),
            WaitStatus::Signaled(_, sig, _) => Ok(StopReason::Killed(sig)),
            WaitStatus::PtraceEvent(_, sig, _) => Ok(StopReason::Signaled(sig)),
            _ => Err(Error::ProcessNotStarted),
        }
    }

    pub fn kill(&self) -> Result<(), Error> {
        sys::signal::kill(self.pid, Signal::SIGKILL).map_err(Error::TraceeFailed)
    }
}
