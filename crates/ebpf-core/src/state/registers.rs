/// Number of general-purpose registers (`r0..=r10`).
pub const REGISTER_COUNT: usize = 11;

/// Architectural register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
}

impl Register {
    /// Conventional return-value register.
    pub const RETURN_VALUE: Self = Self::R0;
    /// Register receiving the return index written by `call`.
    pub const LINK: Self = Self::R8;

    /// Ordered list of all registers.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
    ];

    /// Returns the array index for this register (`0..=10`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes a 4-bit register field.
    ///
    /// Fields `11..=15` name no register.
    #[must_use]
    pub const fn from_u4(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::R0),
            1 => Some(Self::R1),
            2 => Some(Self::R2),
            3 => Some(Self::R3),
            4 => Some(Self::R4),
            5 => Some(Self::R5),
            6 => Some(Self::R6),
            7 => Some(Self::R7),
            8 => Some(Self::R8),
            9 => Some(Self::R9),
            10 => Some(Self::R10),
            _ => None,
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.index())
    }
}

/// Register file of eleven signed 64-bit registers.
///
/// Pure indexed storage: the `r0`/`r10` conventions are not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    regs: [i64; REGISTER_COUNT],
}

impl RegisterFile {
    /// Reads a register.
    #[must_use]
    pub const fn get(&self, reg: Register) -> i64 {
        self.regs[reg.index()]
    }

    /// Writes a register.
    pub const fn set(&mut self, reg: Register, value: i64) {
        self.regs[reg.index()] = value;
    }

    /// Returns all register values in index order.
    #[must_use]
    pub const fn as_array(&self) -> &[i64; REGISTER_COUNT] {
        &self.regs
    }
}
