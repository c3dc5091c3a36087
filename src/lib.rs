//! tracepit: a source-level debugger core for native Linux/x86-64 executables.
//!
//! This crate implements the control loop and supporting machinery for
//! symbolic execution: a software breakpoint engine, a DWARF-backed
//! symbolication layer, a small C type model, and a debug event stepper.
//! The interactive shell in [`shell`] is a thin front end over
//! [`debugger::session::Session`].

pub mod debugger;
pub mod shell;
