//! Built-in demonstration program.

use crate::decoder::{encode_program, Instruction};
use crate::opcode::Opcode;

/// Demo program computing `r0 = (5 + 9) - 3`.
///
/// Exits with `r0 = 11`, `r1 = 14`, `r2 = 9` and every other register zero.
#[must_use]
pub fn sample_program() -> Vec<Instruction> {
    vec![
        Instruction::new(Opcode::MovImm, 1, 0, 0, 5),
        Instruction::new(Opcode::MovImm, 2, 0, 0, 9),
        Instruction::new(Opcode::AddReg, 1, 2, 0, 0),
        Instruction::new(Opcode::MovReg, 0, 1, 0, 0),
        Instruction::new(Opcode::SubImm, 0, 0, 0, 3),
        Instruction::new(Opcode::Exit, 0, 0, 0, 0),
    ]
}

/// [`sample_program`] encoded as raw bytecode.
#[must_use]
pub fn sample_bytecode() -> Vec<u8> {
    encode_program(&sample_program())
}
