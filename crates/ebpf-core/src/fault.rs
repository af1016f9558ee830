use thiserror::Error;

/// Stable fault taxonomy with fixed numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Bytecode length is not a multiple of the instruction width.
    #[error("malformed bytecode input")]
    MalformedInput = 0x01,
    /// Opcode byte is not assigned.
    #[error("unknown opcode")]
    UnknownOpcode = 0x02,
    /// Program counter is outside the decoded program.
    #[error("program counter out of range")]
    ProgramCounterOutOfRange = 0x03,
    /// Data access falls outside `[0, capacity)`.
    #[error("memory access out of bounds")]
    MemoryAccessOutOfBounds = 0x04,
    /// Divide or modulo with a zero divisor.
    #[error("division by zero")]
    DivisionByZero = 0x05,
    /// `lddw` in the last slot, without its second half.
    #[error("incomplete wide immediate load")]
    IncompleteWideLoad = 0x06,
    /// Register field names a register outside `r0..=r10`.
    #[error("invalid register")]
    InvalidRegister = 0x07,
    /// Byteswap immediate is not 16, 32 or 64.
    #[error("invalid byteswap width")]
    InvalidSwapWidth = 0x08,
}

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Execution fault with the operands needed to diagnose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultKind {
    /// Opcode byte has no assigned operation.
    #[error("unknown opcode 0x{opcode:02x}")]
    UnknownOpcode {
        /// Offending opcode byte.
        opcode: u8,
    },
    /// Fetch attempted outside `0..len`.
    #[error("program counter {pc} outside program of {len} instructions")]
    ProgramCounterOutOfRange {
        /// Program counter that could not be fetched.
        pc: i64,
        /// Number of decoded instruction slots.
        len: usize,
    },
    /// Access of `width` bytes at `addr` leaves the memory buffer.
    #[error("{width}-byte access at {addr} outside memory of {capacity} bytes")]
    MemoryAccessOutOfBounds {
        /// Effective address.
        addr: i64,
        /// Access width in bytes.
        width: u8,
        /// Memory capacity in bytes.
        capacity: usize,
    },
    /// Zero divisor in a divide or modulo instruction.
    #[error("division by zero")]
    DivisionByZero,
    /// `lddw` has no second slot to take the upper half from.
    #[error("wide immediate load at the end of the program")]
    IncompleteWideLoad,
    /// Register field outside `r0..=r10`.
    #[error("register r{index} does not exist")]
    InvalidRegister {
        /// Raw 4-bit register field.
        index: u8,
    },
    /// Byteswap width immediate other than 16, 32 or 64.
    #[error("byteswap width {width} is not 16, 32 or 64")]
    InvalidSwapWidth {
        /// Raw immediate.
        width: i32,
    },
}

impl FaultKind {
    /// Maps this fault to its stable code.
    #[must_use]
    pub const fn code(self) -> FaultCode {
        match self {
            Self::UnknownOpcode { .. } => FaultCode::UnknownOpcode,
            Self::ProgramCounterOutOfRange { .. } => FaultCode::ProgramCounterOutOfRange,
            Self::MemoryAccessOutOfBounds { .. } => FaultCode::MemoryAccessOutOfBounds,
            Self::DivisionByZero => FaultCode::DivisionByZero,
            Self::IncompleteWideLoad => FaultCode::IncompleteWideLoad,
            Self::InvalidRegister { .. } => FaultCode::InvalidRegister,
            Self::InvalidSwapWidth { .. } => FaultCode::InvalidSwapWidth,
        }
    }
}

/// A fault raised while executing, located at the instruction index `pc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("{kind} (pc {pc})")]
pub struct Fault {
    /// What went wrong.
    pub kind: FaultKind,
    /// Instruction index at which the fault was raised.
    pub pc: i64,
}

impl Fault {
    /// Creates a fault located at `pc`.
    #[must_use]
    pub const fn new(kind: FaultKind, pc: i64) -> Self {
        Self { kind, pc }
    }

    /// Returns the stable code of this fault.
    #[must_use]
    pub const fn code(&self) -> FaultCode {
        self.kind.code()
    }
}
