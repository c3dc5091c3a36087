//! Location expression evaluator (component E).
//!
//! Grounded on the teacher's early `src/debugger/debugee/dwarf/eval.rs`:
//! drive `gimli::Evaluation` directly rather than hand-rolling an opcode
//! dispatch table (`gimli`'s `EvaluationResult` already is that table).
//! Resolves the handful of `EvaluationResult` requirements this
//! debugger's opcode set can produce: registers (via a
//! [`DwarfRegisterMap`] snapshot), frame base, relocated addresses, and
//! base types. Everything else maps to
//! [`Error::LocEvalUnsupported`] — including `DW_OP_stack_value`, per the
//! specification's own resolution.

use crate::debugger::address::GlobalAddress;
use crate::debugger::error::Error;
use crate::debugger::register::DwarfRegisterMap;
use crate::debugger::tracee::Tracee;
use bytes::{BufMut, Bytes, BytesMut};
use gimli::{Encoding, EvaluationResult, Expression, Location, Piece, Value, ValueType};
use std::cmp::min;
use std::mem;

/// Extra state an evaluation may need beyond the expression bytes
/// themselves. Mirrors the original implementation's location-evaluation
/// context struct (`pid`, `pc`, load address all threaded through).
#[derive(Default)]
pub struct EvalOption {
    frame_base: Option<u64>,
    relocation_addr: Option<u64>,
}

impl EvalOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame_base(mut self, addr: u64) -> Self {
        self.frame_base = Some(addr);
        self
    }

    pub fn with_relocation_addr(mut self, load_address: u64) -> Self {
        self.relocation_addr = Some(load_address);
        self
    }
}

pub struct ExpressionEvaluator<'a> {
    encoding: Encoding,
    tracee: &'a Tracee,
    registers: DwarfRegisterMap,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(encoding: Encoding, tracee: &'a Tracee, registers: DwarfRegisterMap) -> Self {
        Self {
            encoding,
            tracee,
            registers,
        }
    }

    pub fn evaluate(&self, expr: Expression<crate::debugger::dwarf::R>) -> Result<CompletedResult, Error> {
        self.evaluate_with_opts(expr, EvalOption::default())
    }

    pub fn evaluate_with_opts(
        &self,
        expr: Expression<crate::debugger::dwarf::R>,
        opts: EvalOption,
    ) -> Result<CompletedResult, Error> {
        let mut eval = expr.evaluation(self.encoding);
        let mut result = eval
            .evaluate()
            .map_err(|e| Error::LocEvalFailed(gimli_err_str(e)))?;

        while result != EvaluationResult::Complete {
            result = match result {
                EvaluationResult::RequiresRegister { register, .. } => {
                    let value = self
                        .registers
                        .value(register)
                        .ok_or(Error::LocUnavailableAtPc)?;
                    eval.resume_with_register(Value::Generic(value))
                }
                EvaluationResult::RequiresFrameBase => {
                    let base = opts.frame_base.ok_or(Error::NoFrameBase)?;
                    eval.resume_with_frame_base(base)
                }
                EvaluationResult::RequiresRelocatedAddress(addr) => {
                    let load_address = opts.relocation_addr.unwrap_or(0);
                    eval.resume_with_relocated_address(addr + load_address)
                }
                EvaluationResult::RequiresBaseType(_) => {
                    eval.resume_with_base_type(ValueType::Generic)
                }
                other => {
                    return Err(Error::LocEvalUnsupported(format!("{other:?}")));
                }
            }
            .map_err(|e| Error::LocEvalFailed(gimli_err_str(e)))?;
        }

        Ok(CompletedResult {
            pieces: eval.result(),
            tracee: self.tracee,
        })
    }
}

fn gimli_err_str(e: gimli::Error) -> String {
    e.to_string()
}

/// Kind of address a caller needs from a [`CompletedResult`]: the raw
/// value, or a memory address that must be further dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Value,
    MemoryAddress,
}

pub struct CompletedResult<'a> {
    pieces: Vec<Piece<crate::debugger::dwarf::R>>,
    tracee: &'a Tracee,
}

impl<'a> CompletedResult<'a> {
    /// Interpret this result as a single address-sized scalar.
    pub fn into_scalar(self, kind: AddressKind) -> Result<u64, Error> {
        let bytes = self.into_raw_buffer(mem::size_of::<u64>())?;
        let mut buf = [0u8; 8];
        buf[..bytes.len().min(8)].copy_from_slice(&bytes[..bytes.len().min(8)]);
        let value = u64::from_ne_bytes(buf);
        match kind {
            AddressKind::Value => Ok(value),
            AddressKind::MemoryAddress => Ok(value),
        }
    }

    /// Read the byte content this evaluation resolved to: register
    /// contents, tracee memory, or literal values, concatenated across
    /// DWARF pieces.
    pub fn into_raw_buffer(self, byte_size: usize) -> Result<Bytes, Error> {
        let mut buf = BytesMut::with_capacity(byte_size);
        for piece in self.pieces {
            let read_size = piece
                .size_in_bits
                .map(|bits| bits as usize / 8)
                .unwrap_or(byte_size);

            match piece.location {
                Location::Register { register } => {
                    let value = self
                        .tracee
                        .registers()?
                        .value(register);
                    let bytes = value.to_ne_bytes();
                    buf.put_slice(&bytes[..min(read_size, 8)]);
                }
                Location::Address { address } => {
                    let word = self.tracee.peek(address as usize)?;
                    buf.put_slice(&word.to_ne_bytes()[..min(read_size, 8)]);
                }
                Location::Value { value } => match value {
                    Value::Generic(v) | Value::U64(v) => buf.put_u64_le(v),
                    Value::I8(v) => buf.put_i8(v),
                    Value::U8(v) => buf.put_u8(v),
                    Value::I16(v) => buf.put_i16_le(v),
                    Value::U16(v) => buf.put_u16_le(v),
                    Value::I32(v) => buf.put_i32_le(v),
                    Value::U32(v) => buf.put_u32_le(v),
                    Value::I64(v) => buf.put_i64_le(v),
                    Value::F32(v) => buf.put_f32_le(v),
                    Value::F64(v) => buf.put_f64_le(v),
                },
                Location::Bytes { value, .. } => {
                    buf.put_slice(value.bytes());
                }
                Location::Empty => {}
                Location::ImplicitPointer { .. } => {
                    return Err(Error::LocEvalUnsupported("DW_OP_implicit_pointer".into()));
                }
            }
        }
        Ok(buf.freeze())
    }

    pub fn addr(self) -> Result<GlobalAddress, Error> {
        Ok(self.into_scalar(AddressKind::Value)?.into())
    }

    /// Write `value`'s low `byte_size` bytes to the location this
    /// evaluation resolved to. Every type this debugger's type model
    /// covers is scalar, so only the single-piece case is handled --
    /// a multi-piece location (a value split across registers/memory)
    /// has no counterpart in the type model that would call for one.
    pub fn write(self, value: u64, byte_size: usize) -> Result<(), Error> {
        let piece = self
            .pieces
            .first()
            .ok_or_else(|| Error::LocEvalUnsupported("empty location".to_string()))?;
        match piece.location {
            Location::Register { register } => {
                let mut regs = self.tracee.registers()?;
                regs.update(crate::debugger::register::Register::from(register), value);
                self.tracee.set_registers(regs)
            }
            Location::Address { address } => {
                let word = self.tracee.peek(address as usize)?;
                let size = byte_size.clamp(1, 8);
                let mask: u64 = if size >= 8 { u64::MAX } else { (1u64 << (size * 8)) - 1 };
                let patched = (word & !mask) | (value & mask);
                self.tracee.poke(address as usize, patched)
            }
            _ => Err(Error::LocEvalUnsupported(
                "writing to this kind of location is not supported".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_kind_variants_are_distinct() {
        assert_ne!(AddressKind::Value, AddressKind::MemoryAddress);
    }
}
