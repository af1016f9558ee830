//! Operand and address helpers shared by the opcode handlers.

use crate::decoder::Instruction;
use crate::state::Register;
use crate::{FaultKind, MachineState};

/// Where the second operand of an ALU or branch instruction comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Sign-extended 32-bit immediate.
    Imm,
    /// Source register.
    Reg,
}

/// Resolves a 4-bit register field.
///
/// # Errors
///
/// Returns [`FaultKind::InvalidRegister`] for fields `11..=15`.
pub const fn register_field(field: u8) -> Result<Register, FaultKind> {
    match Register::from_u4(field) {
        Some(reg) => Ok(reg),
        None => Err(FaultKind::InvalidRegister { index: field }),
    }
}

/// Reads the destination register's current value.
///
/// # Errors
///
/// Returns [`FaultKind::InvalidRegister`] when `dst` names no register.
pub fn read_dst(instr: &Instruction, state: &MachineState) -> Result<i64, FaultKind> {
    Ok(state.registers.get(register_field(instr.dst)?))
}

/// Reads the source register's current value.
///
/// # Errors
///
/// Returns [`FaultKind::InvalidRegister`] when `src` names no register.
pub fn read_src(instr: &Instruction, state: &MachineState) -> Result<i64, FaultKind> {
    Ok(state.registers.get(register_field(instr.src)?))
}

/// Reads the second operand from the immediate or the source register.
///
/// # Errors
///
/// Returns [`FaultKind::InvalidRegister`] for a register-form operand naming
/// no register.
pub fn read_operand(
    instr: &Instruction,
    state: &MachineState,
    source: Source,
) -> Result<i64, FaultKind> {
    match source {
        Source::Imm => Ok(i64::from(instr.imm)),
        Source::Reg => read_src(instr, state),
    }
}

/// Effective address `base + offset`, wrapping on overflow.
///
/// A wrapped address is negative or huge and fails the bounds check.
#[must_use]
pub const fn effective_address(base: i64, offset: i16) -> i64 {
    base.wrapping_add(offset as i64)
}

/// Jump target relative to the instruction after `pc`.
#[must_use]
pub const fn branch_target(pc: i64, offset: i16) -> i64 {
    pc.wrapping_add(offset as i64).wrapping_add(1)
}
