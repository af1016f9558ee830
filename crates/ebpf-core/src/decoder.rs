//! Bytecode decoder.
//!
//! Splits a flat byte sequence into fixed 8-byte instruction records:
//!
//! ```text
//! byte 0      opcode
//! byte 1      dst (low nibble) | src (high nibble)
//! bytes 2..4  offset, i16 little-endian
//! bytes 4..8  immediate, i32 little-endian
//! ```
//!
//! Opcode legality is not checked here; unknown opcodes surface at execution.

use thiserror::Error;

use crate::fault::FaultCode;
use crate::opcode::Opcode;

/// Width in bytes of one instruction slot.
pub const INSTRUCTION_WIDTH: usize = 8;

/// One decoded instruction slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Instruction {
    /// Raw opcode byte.
    pub opcode: u8,
    /// Destination register field (`0..=15`).
    pub dst: u8,
    /// Source register field (`0..=15`).
    pub src: u8,
    /// Signed displacement for jumps and memory addressing.
    pub offset: i16,
    /// Signed immediate operand.
    pub imm: i32,
}

impl Instruction {
    /// Builds an instruction from an assigned opcode.
    ///
    /// Register fields are truncated to four bits.
    #[must_use]
    pub const fn new(opcode: Opcode, dst: u8, src: u8, offset: i16, imm: i32) -> Self {
        Self {
            opcode: opcode.as_u8(),
            dst: dst & 0x0F,
            src: src & 0x0F,
            offset,
            imm,
        }
    }

    /// Decodes one 8-byte slot.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; INSTRUCTION_WIDTH]) -> Self {
        Self {
            opcode: bytes[0],
            dst: bytes[1] & 0x0F,
            src: (bytes[1] >> 4) & 0x0F,
            offset: i16::from_le_bytes([bytes[2], bytes[3]]),
            imm: i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Re-encodes this instruction into its 8-byte slot.
    #[must_use]
    pub const fn encode(self) -> [u8; INSTRUCTION_WIDTH] {
        let offset = self.offset.to_le_bytes();
        let imm = self.imm.to_le_bytes();
        [
            self.opcode,
            (self.dst & 0x0F) | ((self.src & 0x0F) << 4),
            offset[0],
            offset[1],
            imm[0],
            imm[1],
            imm[2],
            imm[3],
        ]
    }

    /// Returns the assigned opcode, or `None` for unknown bytes.
    #[must_use]
    pub fn opcode(self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }
}

/// Decoder rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DecodeError {
    /// Length leaves a partial slot at the end.
    #[error("bytecode length {len} is not a multiple of 8")]
    MalformedInput {
        /// Length of the rejected input.
        len: usize,
    },
}

impl DecodeError {
    /// Maps the decode failure to the stable fault code surface.
    #[must_use]
    pub const fn fault_code(self) -> FaultCode {
        match self {
            Self::MalformedInput { .. } => FaultCode::MalformedInput,
        }
    }
}

/// Decodes a whole program, one record per 8-byte slot in source order.
///
/// # Errors
///
/// Returns [`DecodeError::MalformedInput`] when `bytes.len()` is not a
/// multiple of [`INSTRUCTION_WIDTH`]. Trailing partial slots are never dropped.
pub fn decode_program(bytes: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    if !bytes.len().is_multiple_of(INSTRUCTION_WIDTH) {
        return Err(DecodeError::MalformedInput { len: bytes.len() });
    }

    let mut program = Vec::with_capacity(bytes.len() / INSTRUCTION_WIDTH);
    for chunk in bytes.chunks_exact(INSTRUCTION_WIDTH) {
        let mut slot = [0u8; INSTRUCTION_WIDTH];
        slot.copy_from_slice(chunk);
        program.push(Instruction::from_bytes(slot));
    }
    Ok(program)
}

/// Encodes instructions back into a flat bytecode image.
#[must_use]
pub fn encode_program(program: &[Instruction]) -> Vec<u8> {
    program.iter().flat_map(|instr| instr.encode()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_splits_fields_per_layout() {
        let bytes = [0xbf, 0x21, 0xfe, 0xff, 0x78, 0x56, 0x34, 0x12];
        let program = decode_program(&bytes).expect("aligned input decodes");
        assert_eq!(
            program,
            vec![Instruction {
                opcode: 0xbf,
                dst: 1,
                src: 2,
                offset: -2,
                imm: 0x1234_5678,
            }]
        );
    }

    #[test]
    fn negative_immediate_is_sign_preserved() {
        let bytes = [0xb7, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff];
        let program = decode_program(&bytes).expect("aligned input decodes");
        assert_eq!(program[0].imm, -1);
    }

    #[test]
    fn empty_input_decodes_to_empty_program() {
        assert_eq!(decode_program(&[]), Ok(Vec::new()));
    }

    #[test]
    fn trailing_partial_slot_is_rejected() {
        let bytes = [0x95, 0, 0, 0, 0, 0, 0, 0, 0x95, 0, 0];
        assert_eq!(
            decode_program(&bytes),
            Err(DecodeError::MalformedInput { len: 11 })
        );
        assert_eq!(
            DecodeError::MalformedInput { len: 11 }.fault_code(),
            FaultCode::MalformedInput
        );
    }

    #[test]
    fn unknown_opcodes_are_decoded_not_rejected() {
        let bytes = [0xee, 0, 0, 0, 0, 0, 0, 0];
        let program = decode_program(&bytes).expect("decoder does not validate opcodes");
        assert_eq!(program[0].opcode, 0xee);
        assert_eq!(program[0].opcode(), None);
    }

    #[test]
    fn new_truncates_register_fields_to_nibbles() {
        let instr = Instruction::new(Opcode::MovReg, 0x1f, 0x2e, 0, 0);
        assert_eq!(instr.dst, 0x0f);
        assert_eq!(instr.src, 0x0e);
    }

    #[test]
    fn encode_matches_hand_assembled_bytes() {
        let program = [
            Instruction::new(Opcode::MovImm, 1, 0, 0, 5),
            Instruction::new(Opcode::Exit, 0, 0, 0, 0),
        ];
        assert_eq!(
            encode_program(&program),
            vec![0xb7, 0x01, 0, 0, 5, 0, 0, 0, 0x95, 0, 0, 0, 0, 0, 0, 0]
        );
    }
}
