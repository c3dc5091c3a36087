//! Debugger application entry point.
//!
//! Grounded on the teacher's `src/bin/main.rs`: parse arguments with
//! `clap`, initialize logging, build the debugger core, hand control
//! to the front end. The teacher chooses between a console and a TUI
//! front end by flag; this core has exactly one front end.

use clap::Parser;
use std::process::ExitCode;
use tracepit::debugger::session::Session;
use tracepit::shell;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Executable file to debug (must carry DWARF debug information).
    tracee_path: String,

    /// Arguments passed to the tracee.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    tracee_args: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut session = match Session::launch(&args.tracee_path, &args.tracee_args) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("failed to start {}: {e}", args.tracee_path);
            return ExitCode::FAILURE;
        }
    };

    let entry_event = match session.run_to_main() {
        Ok(event) => event,
        Err(e) => {
            eprintln!("failed to reach main: {e}");
            let _ = session.kill();
            return ExitCode::FAILURE;
        }
    };
    shell::report_event(&entry_event);
    if !matches!(
        entry_event,
        tracepit::debugger::session::SessionEvent::Stopped(_)
    ) {
        return ExitCode::SUCCESS;
    }

    match shell::run(&mut session) {
        Ok(Some(code)) => {
            if code == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("session error: {e}");
            ExitCode::FAILURE
        }
    }
}
