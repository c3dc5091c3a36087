//! Error kinds for the debugger core.
//!
//! One flat enum, mirroring the teacher's `src/debugger/error.rs` shape.
//! Every kind named in the specification's error-handling design has a
//! variant here. `is_fatal` tells the session loop whether to keep
//! dispatching commands or end the session.

use crate::debugger::address::GlobalAddress;
use gimli::Register;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- parse / user input -----------------
    #[error("malformed command: {0}")]
    ParseErr(String),

    // --------------------------------- symbol resolution ------------------
    #[error("no such symbol: {0}")]
    NoSuchSymbol(String),
    #[error("unknown register {0:?}")]
    RegisterNotFound(Register),
    #[error("unknown register name {0:?}")]
    RegisterNameNotFound(String),
    #[error("no line entry at address {0}")]
    PlaceNotFound(GlobalAddress),
    #[error("no compilation unit covers address {0}")]
    UnitNotFound(GlobalAddress),
    #[error("no function covers address {0}")]
    FunctionNotFound(GlobalAddress),
    #[error("breakpoint address {0} is outside any loaded segment")]
    BpOob(GlobalAddress),
    #[error("unsupported type tag {0:?} (compound/aggregate types are out of scope)")]
    UnsupportedType(gimli::DwTag),

    // --------------------------------- debug info --------------------------
    #[error("no debug information for {0}")]
    NoDebugInformation(&'static str),
    #[error("dwarf section \"{0}\" is missing")]
    SectionNotFound(&'static str),
    #[error("dwarf parsing error: {0}")]
    DwarfParsing(#[from] gimli::Error),
    #[error("object file parsing error: {0}")]
    ObjParsing(#[from] object::Error),

    // --------------------------------- location evaluation ------------------
    #[error("location unavailable at current pc")]
    LocUnavailableAtPc,
    #[error("location expression evaluation failed: {0}")]
    LocEvalFailed(String),
    #[error("unsupported location opcode: {0}")]
    LocEvalUnsupported(String),
    #[error("no frame base for current function")]
    NoFrameBase,

    // --------------------------------- tracee / kernel -----------------------
    #[error("tracee operation failed: {0}")]
    TraceeFailed(nix::Error),
    #[error("tracee exited with code {0}")]
    TraceeExitedCode(i32),
    #[error("tracee killed by signal {0}")]
    TraceeExitedSignal(String),
    #[error("no process is currently running")]
    ProcessNotStarted,

    // --------------------------------- generic ------------------------------
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Return a hint to the session loop: continue dispatching commands
    /// (`false`) or end the session (`true`).
    ///
    /// `resuming` is whether the command that produced this error resumes
    /// the tracee (continue/step family). A tracee exit/kill is always
    /// fatal; a bare ptrace failure (`TraceeFailed`) is only fatal when it
    /// happened mid-resume, since the tracee's state is then unknown --
    /// the same failure on a read-only command like `memread` or
    /// `print register` just means that one read didn't work.
    pub fn is_fatal(&self, resuming: bool) -> bool {
        match self {
            Error::TraceeExitedCode(_) | Error::TraceeExitedSignal(_) => true,
            Error::TraceeFailed(_) => resuming,
            _ => false,
        }
    }
}

/// Transforms a `Result` into an `Option`, logging a warning on error.
/// Mirrors the teacher's `weak_error!` macro.
#[macro_export]
macro_rules! weak_error {
    ($res:expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!(target: "debugger", "{:#}", e);
                None
            }
        }
    };
}
