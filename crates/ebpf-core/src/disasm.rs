//! Instruction disassembly.
//!
//! Turns a decoded program into a listing of human-readable rows. Unknown
//! opcodes are rendered as `.insn 0xNN ; UNKNOWN` and the two-slot `lddw` is
//! folded into a single row.

use std::fmt;

use crate::decoder::Instruction;
use crate::opcode::{Opcode, OpcodeClass};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Index of the first slot of this instruction.
    pub index: usize,
    /// Slots covered (2 for a complete `lddw`, otherwise 1).
    pub len_slots: u8,
    /// Raw encoded bytes of every covered slot.
    pub raw: Vec<u8>,
    /// The instruction mnemonic (e.g. `add`, `ldxw`, `be32`).
    pub mnemonic: String,
    /// The formatted operands (e.g. `r1, r2` or `[r10-8], 7`).
    pub operands: String,
    /// Whether the opcode byte is unassigned.
    pub is_unknown: bool,
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}: {}", self.index, self.mnemonic)?;
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands)?;
        }
        Ok(())
    }
}

/// Disassembles every instruction of `program` in order.
#[must_use]
pub fn disassemble(program: &[Instruction]) -> Vec<DisassemblyRow> {
    let mut rows = Vec::with_capacity(program.len());
    let mut index = 0;
    while index < program.len() {
        let row = disassemble_one(program, index);
        index += usize::from(row.len_slots);
        rows.push(row);
    }
    rows
}

fn disassemble_one(program: &[Instruction], index: usize) -> DisassemblyRow {
    let instr = program[index];
    let Some(opcode) = instr.opcode() else {
        return DisassemblyRow {
            index,
            len_slots: 1,
            raw: instr.encode().to_vec(),
            mnemonic: ".insn".to_string(),
            operands: format!("0x{:02x} ; UNKNOWN", instr.opcode),
            is_unknown: true,
        };
    };

    if opcode == Opcode::Lddw {
        return disassemble_lddw(program, index);
    }

    let mnemonic = match opcode {
        Opcode::ToLe | Opcode::ToBe => format!("{}{}", opcode.mnemonic(), instr.imm),
        _ => opcode.mnemonic().to_string(),
    };

    DisassemblyRow {
        index,
        len_slots: 1,
        raw: instr.encode().to_vec(),
        mnemonic,
        operands: format_operands(opcode, &instr),
        is_unknown: false,
    }
}

#[allow(clippy::cast_sign_loss)]
fn disassemble_lddw(program: &[Instruction], index: usize) -> DisassemblyRow {
    let low = program[index];
    let dst = format_register(low.dst);
    let Some(high) = program.get(index + 1) else {
        return DisassemblyRow {
            index,
            len_slots: 1,
            raw: low.encode().to_vec(),
            mnemonic: Opcode::Lddw.mnemonic().to_string(),
            operands: format!("{dst}, ? ; INCOMPLETE"),
            is_unknown: false,
        };
    };

    let value = u64::from(low.imm as u32) | (u64::from(high.imm as u32) << 32);
    let mut raw = low.encode().to_vec();
    raw.extend_from_slice(&high.encode());
    DisassemblyRow {
        index,
        len_slots: 2,
        raw,
        mnemonic: Opcode::Lddw.mnemonic().to_string(),
        operands: format!("{dst}, {value:#x}"),
        is_unknown: false,
    }
}

fn format_operands(opcode: Opcode, instr: &Instruction) -> String {
    let dst = format_register(instr.dst);
    let src = format_register(instr.src);
    let second = if opcode.uses_source_register() {
        src.clone()
    } else {
        instr.imm.to_string()
    };

    match opcode {
        Opcode::Neg | Opcode::ToLe | Opcode::ToBe => dst,
        Opcode::Exit => String::new(),
        Opcode::Ja | Opcode::Call => format_offset(instr.offset),
        Opcode::LdAbsW | Opcode::LdAbsH | Opcode::LdAbsB | Opcode::LdAbsDw => {
            format!("[{}]", instr.imm)
        }
        Opcode::LdIndW | Opcode::LdIndH | Opcode::LdIndB | Opcode::LdIndDw => {
            format_address(&src, i64::from(instr.imm))
        }
        Opcode::LdxW | Opcode::LdxH | Opcode::LdxB | Opcode::LdxDw => {
            format!("{dst}, {}", format_address(&src, i64::from(instr.offset)))
        }
        Opcode::StW | Opcode::StH | Opcode::StB | Opcode::StDw => {
            format!("{}, {}", format_address(&dst, i64::from(instr.offset)), instr.imm)
        }
        Opcode::StxW | Opcode::StxH | Opcode::StxB | Opcode::StxDw => {
            format!("{}, {src}", format_address(&dst, i64::from(instr.offset)))
        }
        _ if opcode.class() == OpcodeClass::Branch => {
            format!("{dst}, {second}, {}", format_offset(instr.offset))
        }
        _ => format!("{dst}, {second}"),
    }
}

fn format_register(field: u8) -> String {
    format!("r{field}")
}

fn format_address(base: &str, displacement: i64) -> String {
    if displacement == 0 {
        format!("[{base}]")
    } else {
        format!("[{base}{displacement:+}]")
    }
}

fn format_offset(offset: i16) -> String {
    format!("{offset:+}")
}
