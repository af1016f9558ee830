/// Operation families an opcode belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum OpcodeClass {
    Alu,
    Swap,
    Memory,
    Branch,
    Control,
}

/// Every assigned opcode byte, one variant each.
///
/// `Imm` forms take the sign-extended 32-bit immediate as the second operand,
/// `Reg` forms take the source register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    AddImm = 0x07,
    AddReg = 0x0f,
    SubImm = 0x17,
    SubReg = 0x1f,
    MulImm = 0x27,
    MulReg = 0x2f,
    DivImm = 0x37,
    DivReg = 0x3f,
    OrImm = 0x47,
    OrReg = 0x4f,
    AndImm = 0x57,
    AndReg = 0x5f,
    LshImm = 0x67,
    LshReg = 0x6f,
    RshImm = 0x77,
    RshReg = 0x7f,
    Neg = 0x87,
    ModImm = 0x97,
    ModReg = 0x9f,
    XorImm = 0xa7,
    XorReg = 0xaf,
    MovImm = 0xb7,
    MovReg = 0xbf,
    ArshImm = 0xc7,
    ArshReg = 0xcf,

    ToLe = 0xd4,
    ToBe = 0xdc,

    Lddw = 0x18,
    LdAbsW = 0x20,
    LdAbsH = 0x28,
    LdAbsB = 0x30,
    LdAbsDw = 0x38,
    LdIndW = 0x40,
    LdIndH = 0x48,
    LdIndB = 0x50,
    LdIndDw = 0x58,
    LdxW = 0x61,
    LdxH = 0x69,
    LdxB = 0x71,
    LdxDw = 0x79,
    StW = 0x62,
    StH = 0x6a,
    StB = 0x72,
    StDw = 0x7a,
    StxW = 0x63,
    StxH = 0x6b,
    StxB = 0x73,
    StxDw = 0x7b,

    Ja = 0x05,
    JeqImm = 0x15,
    JeqReg = 0x1d,
    JgtImm = 0x25,
    JgtReg = 0x2d,
    JgeImm = 0x35,
    JgeReg = 0x3d,
    JltImm = 0xa5,
    JltReg = 0xad,
    JleImm = 0xb5,
    JleReg = 0xbd,
    JsetImm = 0x45,
    JsetReg = 0x4d,
    JneImm = 0x55,
    JneReg = 0x5d,
    JsgtImm = 0x65,
    JsgtReg = 0x6d,
    JsgeImm = 0x75,
    JsgeReg = 0x7d,
    JsltImm = 0xc5,
    JsltReg = 0xcd,
    JsleImm = 0xd5,
    JsleReg = 0xdd,
    Call = 0x85,
    Exit = 0x95,
}

/// Single source-of-truth opcode table.
///
/// Any byte not present here is an unknown opcode.
pub const OPCODE_TABLE: &[(u8, Opcode)] = &[
    (0x07, Opcode::AddImm),
    (0x0f, Opcode::AddReg),
    (0x17, Opcode::SubImm),
    (0x1f, Opcode::SubReg),
    (0x27, Opcode::MulImm),
    (0x2f, Opcode::MulReg),
    (0x37, Opcode::DivImm),
    (0x3f, Opcode::DivReg),
    (0x47, Opcode::OrImm),
    (0x4f, Opcode::OrReg),
    (0x57, Opcode::AndImm),
    (0x5f, Opcode::AndReg),
    (0x67, Opcode::LshImm),
    (0x6f, Opcode::LshReg),
    (0x77, Opcode::RshImm),
    (0x7f, Opcode::RshReg),
    (0x87, Opcode::Neg),
    (0x97, Opcode::ModImm),
    (0x9f, Opcode::ModReg),
    (0xa7, Opcode::XorImm),
    (0xaf, Opcode::XorReg),
    (0xb7, Opcode::MovImm),
    (0xbf, Opcode::MovReg),
    (0xc7, Opcode::ArshImm),
    (0xcf, Opcode::ArshReg),
    (0xd4, Opcode::ToLe),
    (0xdc, Opcode::ToBe),
    (0x18, Opcode::Lddw),
    (0x20, Opcode::LdAbsW),
    (0x28, Opcode::LdAbsH),
    (0x30, Opcode::LdAbsB),
    (0x38, Opcode::LdAbsDw),
    (0x40, Opcode::LdIndW),
    (0x48, Opcode::LdIndH),
    (0x50, Opcode::LdIndB),
    (0x58, Opcode::LdIndDw),
    (0x61, Opcode::LdxW),
    (0x69, Opcode::LdxH),
    (0x71, Opcode::LdxB),
    (0x79, Opcode::LdxDw),
    (0x62, Opcode::StW),
    (0x6a, Opcode::StH),
    (0x72, Opcode::StB),
    (0x7a, Opcode::StDw),
    (0x63, Opcode::StxW),
    (0x6b, Opcode::StxH),
    (0x73, Opcode::StxB),
    (0x7b, Opcode::StxDw),
    (0x05, Opcode::Ja),
    (0x15, Opcode::JeqImm),
    (0x1d, Opcode::JeqReg),
    (0x25, Opcode::JgtImm),
    (0x2d, Opcode::JgtReg),
    (0x35, Opcode::JgeImm),
    (0x3d, Opcode::JgeReg),
    (0xa5, Opcode::JltImm),
    (0xad, Opcode::JltReg),
    (0xb5, Opcode::JleImm),
    (0xbd, Opcode::JleReg),
    (0x45, Opcode::JsetImm),
    (0x4d, Opcode::JsetReg),
    (0x55, Opcode::JneImm),
    (0x5d, Opcode::JneReg),
    (0x65, Opcode::JsgtImm),
    (0x6d, Opcode::JsgtReg),
    (0x75, Opcode::JsgeImm),
    (0x7d, Opcode::JsgeReg),
    (0xc5, Opcode::JsltImm),
    (0xcd, Opcode::JsltReg),
    (0xd5, Opcode::JsleImm),
    (0xdd, Opcode::JsleReg),
    (0x85, Opcode::Call),
    (0x95, Opcode::Exit),
];

impl Opcode {
    /// Looks up the opcode assigned to a raw byte.
    ///
    /// `None` means the byte is unassigned.
    #[must_use]
    pub fn from_u8(byte: u8) -> Option<Self> {
        OPCODE_TABLE
            .iter()
            .find_map(|(entry, opcode)| (*entry == byte).then_some(*opcode))
    }

    /// Returns the raw opcode byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the lower-case assembler mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::AddImm | Self::AddReg => "add",
            Self::SubImm | Self::SubReg => "sub",
            Self::MulImm | Self::MulReg => "mul",
            Self::DivImm | Self::DivReg => "div",
            Self::OrImm | Self::OrReg => "or",
            Self::AndImm | Self::AndReg => "and",
            Self::LshImm | Self::LshReg => "lsh",
            Self::RshImm | Self::RshReg => "rsh",
            Self::Neg => "neg",
            Self::ModImm | Self::ModReg => "mod",
            Self::XorImm | Self::XorReg => "xor",
            Self::MovImm | Self::MovReg => "mov",
            Self::ArshImm | Self::ArshReg => "arsh",
            Self::ToLe => "le",
            Self::ToBe => "be",
            Self::Lddw => "lddw",
            Self::LdAbsW => "ldabsw",
            Self::LdAbsH => "ldabsh",
            Self::LdAbsB => "ldabsb",
            Self::LdAbsDw => "ldabsdw",
            Self::LdIndW => "ldindw",
            Self::LdIndH => "ldindh",
            Self::LdIndB => "ldindb",
            Self::LdIndDw => "ldinddw",
            Self::LdxW => "ldxw",
            Self::LdxH => "ldxh",
            Self::LdxB => "ldxb",
            Self::LdxDw => "ldxdw",
            Self::StW => "stw",
            Self::StH => "sth",
            Self::StB => "stb",
            Self::StDw => "stdw",
            Self::StxW => "stxw",
            Self::StxH => "stxh",
            Self::StxB => "stxb",
            Self::StxDw => "stxdw",
            Self::Ja => "ja",
            Self::JeqImm | Self::JeqReg => "jeq",
            Self::JgtImm | Self::JgtReg => "jgt",
            Self::JgeImm | Self::JgeReg => "jge",
            Self::JltImm | Self::JltReg => "jlt",
            Self::JleImm | Self::JleReg => "jle",
            Self::JsetImm | Self::JsetReg => "jset",
            Self::JneImm | Self::JneReg => "jne",
            Self::JsgtImm | Self::JsgtReg => "jsgt",
            Self::JsgeImm | Self::JsgeReg => "jsge",
            Self::JsltImm | Self::JsltReg => "jslt",
            Self::JsleImm | Self::JsleReg => "jsle",
            Self::Call => "call",
            Self::Exit => "exit",
        }
    }

    /// Returns the operation family of this opcode.
    #[must_use]
    pub const fn class(self) -> OpcodeClass {
        match self {
            Self::ToLe | Self::ToBe => OpcodeClass::Swap,
            Self::Lddw
            | Self::LdAbsW
            | Self::LdAbsH
            | Self::LdAbsB
            | Self::LdAbsDw
            | Self::LdIndW
            | Self::LdIndH
            | Self::LdIndB
            | Self::LdIndDw
            | Self::LdxW
            | Self::LdxH
            | Self::LdxB
            | Self::LdxDw
            | Self::StW
            | Self::StH
            | Self::StB
            | Self::StDw
            | Self::StxW
            | Self::StxH
            | Self::StxB
            | Self::StxDw => OpcodeClass::Memory,
            Self::Ja
            | Self::JeqImm
            | Self::JeqReg
            | Self::JgtImm
            | Self::JgtReg
            | Self::JgeImm
            | Self::JgeReg
            | Self::JltImm
            | Self::JltReg
            | Self::JleImm
            | Self::JleReg
            | Self::JsetImm
            | Self::JsetReg
            | Self::JneImm
            | Self::JneReg
            | Self::JsgtImm
            | Self::JsgtReg
            | Self::JsgeImm
            | Self::JsgeReg
            | Self::JsltImm
            | Self::JsltReg
            | Self::JsleImm
            | Self::JsleReg => OpcodeClass::Branch,
            Self::Call | Self::Exit => OpcodeClass::Control,
            _ => OpcodeClass::Alu,
        }
    }

    /// Returns true for forms whose second operand is the source register.
    #[must_use]
    pub const fn uses_source_register(self) -> bool {
        matches!(
            self,
            Self::AddReg
                | Self::SubReg
                | Self::MulReg
                | Self::DivReg
                | Self::OrReg
                | Self::AndReg
                | Self::LshReg
                | Self::RshReg
                | Self::ModReg
                | Self::XorReg
                | Self::MovReg
                | Self::ArshReg
                | Self::LdIndW
                | Self::LdIndH
                | Self::LdIndB
                | Self::LdIndDw
                | Self::LdxW
                | Self::LdxH
                | Self::LdxB
                | Self::LdxDw
                | Self::StxW
                | Self::StxH
                | Self::StxB
                | Self::StxDw
                | Self::JeqReg
                | Self::JgtReg
                | Self::JgeReg
                | Self::JltReg
                | Self::JleReg
                | Self::JsetReg
                | Self::JneReg
                | Self::JsgtReg
                | Self::JsgeReg
                | Self::JsltReg
                | Self::JsleReg
        )
    }
}
