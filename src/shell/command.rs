//! Command grammar (`spec.md` §6).
//!
//! Grounded on the original implementation's `check_file_line`/
//! `check_function_name` validators (`original_source/src/debugger.h`):
//! a `file:line` target is accepted only if it matches `^[^:]+:[0-9]+$`,
//! a bare function name only if it matches `^[A-Za-z_][A-Za-z0-9_]*$`.
//! Everything else is split on whitespace; there is no expression
//! grammar beyond a single register/variable name or a hex literal.

use crate::debugger::error::Error;
use crate::debugger::register::Register;
use crate::debugger::session::BreakpointSpec;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

static FILE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^:]+:[0-9]+$").unwrap());
static FUNCTION_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone)]
pub enum Command {
    Enable(BreakpointSpec),
    Disable(BreakpointSpec),
    Step,
    Next,
    StepI,
    Finish,
    Continue,
    PrintRegister(String),
    PrintVariable(String),
    SetRegister(String, u64),
    SetVariable(String, u64),
    MemRead(u64),
    MemWrite(u64, u64),
    Backtrace,
    Quit,
}

fn parse_bp_target(target: &str) -> Result<BreakpointSpec, Error> {
    if let Some(hex) = target.strip_prefix("0x") {
        let addr = u64::from_str_radix(hex, 16).map_err(|_| Error::ParseErr(format!("bad address: {target}")))?;
        return Ok(BreakpointSpec::Address(addr));
    }
    if FILE_LINE.is_match(target) {
        let (file, line) = target.rsplit_once(':').expect("regex guarantees a colon");
        let line: u64 = line.parse().map_err(|_| Error::ParseErr(format!("bad line number: {target}")))?;
        return Ok(BreakpointSpec::FileLine(file.to_string(), line));
    }
    if FUNCTION_NAME.is_match(target) {
        return Ok(BreakpointSpec::Function(target.to_string()));
    }
    Err(Error::ParseErr(format!(
        "expected a hex address, file:line, or function name, got: {target}"
    )))
}

fn parse_hex(text: &str) -> Result<u64, Error> {
    let hex = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(hex, 16).map_err(|_| Error::ParseErr(format!("bad hex value: {text}")))
}

/// Parse a value that follows `print`/`set`: either a register/variable
/// name, or (only valid for `set`) a hex literal.
fn parse_value(text: &str) -> Result<u64, Error> {
    parse_hex(text)
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, Error> {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| Error::ParseErr("empty command".to_string()))?;

        match verb {
            "enable" => {
                let target = words.next().ok_or_else(|| Error::ParseErr("enable requires a target".to_string()))?;
                Ok(Command::Enable(parse_bp_target(target)?))
            }
            "disable" => {
                let target = words.next().ok_or_else(|| Error::ParseErr("disable requires a target".to_string()))?;
                Ok(Command::Disable(parse_bp_target(target)?))
            }
            "step" => Ok(Command::Step),
            "next" => Ok(Command::Next),
            "stepi" => Ok(Command::StepI),
            "finish" => Ok(Command::Finish),
            "continue" | "c" => Ok(Command::Continue),
            "print" | "p" => {
                let name = words.next().ok_or_else(|| Error::ParseErr("print requires a name".to_string()))?;
                if Register::from_str(name).is_ok() {
                    Ok(Command::PrintRegister(name.to_string()))
                } else {
                    Ok(Command::PrintVariable(name.to_string()))
                }
            }
            "set" => {
                let name = words.next().ok_or_else(|| Error::ParseErr("set requires a name".to_string()))?;
                let value = words.next().ok_or_else(|| Error::ParseErr("set requires a value".to_string()))?;
                let value = parse_value(value)?;
                if Register::from_str(name).is_ok() {
                    Ok(Command::SetRegister(name.to_string(), value))
                } else {
                    Ok(Command::SetVariable(name.to_string(), value))
                }
            }
            "memread" => {
                let addr = words.next().ok_or_else(|| Error::ParseErr("memread requires an address".to_string()))?;
                Ok(Command::MemRead(parse_hex(addr)?))
            }
            "memwrite" => {
                let addr = words.next().ok_or_else(|| Error::ParseErr("memwrite requires an address".to_string()))?;
                let value = words.next().ok_or_else(|| Error::ParseErr("memwrite requires a value".to_string()))?;
                Ok(Command::MemWrite(parse_hex(addr)?, parse_hex(value)?))
            }
            "backtrace" | "bt" => Ok(Command::Backtrace),
            "quit" | "q" => Ok(Command::Quit),
            other => Err(Error::ParseErr(format!("unknown command: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_line_target_parses() {
        match parse_bp_target("main.c:12").unwrap() {
            BreakpointSpec::FileLine(file, line) => {
                assert_eq!(file, "main.c");
                assert_eq!(line, 12);
            }
            other => panic!("unexpected spec: {other:?}"),
        }
    }

    #[test]
    fn function_target_parses() {
        match parse_bp_target("main").unwrap() {
            BreakpointSpec::Function(name) => assert_eq!(name, "main"),
            other => panic!("unexpected spec: {other:?}"),
        }
    }

    #[test]
    fn address_target_parses() {
        match parse_bp_target("0x4010a0").unwrap() {
            BreakpointSpec::Address(addr) => assert_eq!(addr, 0x4010a0),
            other => panic!("unexpected spec: {other:?}"),
        }
    }

    #[test]
    fn malformed_target_is_rejected() {
        assert!(parse_bp_target("3bad:name").is_err());
    }

    #[test]
    fn enable_and_continue_roundtrip() {
        assert!(matches!(Command::parse("continue").unwrap(), Command::Continue));
        assert!(matches!(Command::parse("c").unwrap(), Command::Continue));
        assert!(matches!(Command::parse("enable main").unwrap(), Command::Enable(_)));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(Command::parse("   ").is_err());
    }
}
