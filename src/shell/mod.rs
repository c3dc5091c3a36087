//! Command shell: the thin REPL front end over [`Session`].
//!
//! Grounded on the teacher's `src/console/mod.rs`, stripped to the
//! shape `spec.md` §4.G/§6 actually call for: a synchronous
//! `rustyline` read-eval-print loop with no TUI, no background
//! threads relaying debugee stdio, and no completion/highlighting.
//! This module contains no debugging logic of its own -- every command
//! is a one-line dispatch to [`Session`].

pub mod command;

use crate::debugger::dwarf::r#type::TypeChain;
use crate::debugger::error::Error;
use crate::debugger::session::{Session, SessionEvent, StopCause};
use command::Command;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "(tpit) ";

/// Run the REPL to completion: until `quit`, tracee exit, or EOF on
/// stdin. Returns the tracee's exit code if it ran to completion, or
/// `None` if the user quit first. The caller is expected to have
/// already reported the session's initial stop (at `main`'s first
/// statement, per `spec.md` §4.G) via [`report_event`].
pub fn run(session: &mut Session) -> Result<Option<i32>, Error> {
    let mut editor = DefaultEditor::new().map_err(|e| Error::ParseErr(e.to_string()))?;

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => return Ok(None),
            Err(e) => return Err(Error::ParseErr(e.to_string())),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);
        session.push_history(line);

        let command = match Command::parse(line) {
            Ok(cmd) => cmd,
            Err(e) => {
                println!("error: {e}");
                continue;
            }
        };

        if matches!(command, Command::Quit) {
            let _ = session.kill();
            return Ok(None);
        }

        let resuming = matches!(
            command,
            Command::Step | Command::Next | Command::StepI | Command::Finish | Command::Continue
        );
        match dispatch(session, command) {
            Ok(Some(code)) => return Ok(Some(code)),
            Ok(None) => {}
            Err(e) => {
                println!("error: {e}");
                if e.is_fatal(resuming) {
                    return Err(e);
                }
            }
        }
    }
}

/// Execute one parsed command against `session`, printing its result.
/// Returns `Some(exit_code)` once the tracee has exited.
fn dispatch(session: &mut Session, command: Command) -> Result<Option<i32>, Error> {
    match command {
        Command::Quit => unreachable!("handled by the caller"),
        Command::Enable(spec) => {
            session.enable(&spec)?;
            println!("breakpoint enabled");
            Ok(None)
        }
        Command::Disable(spec) => {
            session.disable(&spec)?;
            println!("breakpoint disabled");
            Ok(None)
        }
        Command::Step => handle_event(session.step_in()?),
        Command::Next => handle_event(session.step_over()?),
        Command::StepI => handle_event(session.single_step()?),
        Command::Finish => handle_event(session.step_out()?),
        Command::Continue => handle_event(session.continue_execution()?),
        Command::PrintRegister(name) => {
            let value = session.read_register(&name)?;
            println!("{name} = {value:#018x}");
            Ok(None)
        }
        Command::PrintVariable(name) => {
            let (value, chain) = session.read_variable(&name)?;
            println!("{name} = {} ({})", value, describe_type(&chain));
            Ok(None)
        }
        Command::SetRegister(name, value) => {
            session.write_register(&name, value)?;
            Ok(None)
        }
        Command::SetVariable(name, value) => {
            session.write_variable(&name, value)?;
            Ok(None)
        }
        Command::MemRead(addr) => {
            let value = session.memread(addr)?;
            println!("{addr:#018x} = {value:#018x}");
            Ok(None)
        }
        Command::MemWrite(addr, value) => {
            session.memwrite(addr, value)?;
            Ok(None)
        }
        Command::Backtrace => {
            for (i, frame) in session.backtrace()?.iter().enumerate() {
                let function = frame.function.as_deref().unwrap_or("??");
                println!("#{i} {} in {function}", frame.pc);
            }
            Ok(None)
        }
    }
}

fn handle_event(event: SessionEvent) -> Result<Option<i32>, Error> {
    report_event(&event);
    match event {
        SessionEvent::Exited(code) => Ok(Some(code)),
        SessionEvent::Terminated(sig) => Ok(Some(128 + sig as i32)),
        SessionEvent::Stopped(_) => Ok(None),
    }
}

/// Print a structured stop/termination record, per `spec.md` §6's
/// output contract. Public so [`crate::main`] can report the session's
/// initial stop before the REPL loop starts.
pub fn report_event(event: &SessionEvent) {
    match event {
        SessionEvent::Exited(code) => println!("[tracee exited with code {code}]"),
        SessionEvent::Terminated(sig) => println!("[tracee terminated by signal {sig:?}]"),
        SessionEvent::Stopped(_) => print_session_event(event),
    }
}

fn print_session_event(event: &SessionEvent) {
    let SessionEvent::Stopped(report) = event else {
        return;
    };
    let cause = match report.cause {
        StopCause::Breakpoint => "breakpoint",
        StopCause::Step => "step",
        StopCause::Signal(sig) => return println!("stopped by signal {sig:?} at {}", report.address),
        StopCause::Entry => "entry",
    };
    match (&report.file, report.line) {
        (Some(file), Some(line)) => {
            let function = report.function.as_deref().unwrap_or("??");
            println!("{cause}: {function} at {file}:{line} ({})", report.address);
        }
        _ => println!("{cause}: {}", report.address),
    }
}

fn describe_type(chain: &TypeChain) -> String {
    if chain.is_empty() {
        return "<unknown type>".to_string();
    }
    if chain.is_pointer() {
        return "pointer".to_string();
    }
    match chain.base_type() {
        Some((tag, size)) => format!("{tag:?}, {size} bytes"),
        None => "<unsupported type>".to_string(),
    }
}
