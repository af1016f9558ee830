//! Access widths and bounds policy for data memory.

use crate::FaultKind;

/// Width of a data memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum AccessWidth {
    /// 1 byte.
    Byte = 1,
    /// 2 bytes.
    Half = 2,
    /// 4 bytes.
    Word = 4,
    /// 8 bytes.
    Double = 8,
}

impl AccessWidth {
    /// Number of bytes touched by the access.
    #[must_use]
    pub const fn bytes(self) -> u8 {
        self as u8
    }

    /// Widens a raw little-endian load to a register value.
    ///
    /// Byte and half loads sign-extend, word loads zero-extend, double loads
    /// are taken verbatim.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn extend(self, raw: u64) -> i64 {
        match self {
            Self::Byte => raw as u8 as i8 as i64,
            Self::Half => raw as u16 as i16 as i64,
            Self::Word => raw as u32 as i64,
            Self::Double => raw as i64,
        }
    }
}

/// Validates that `width` bytes starting at `addr` lie inside `[0, capacity)`.
///
/// Returns the start offset as a buffer index on success.
///
/// # Errors
///
/// Returns [`FaultKind::MemoryAccessOutOfBounds`] for negative addresses and
/// for accesses whose last byte would be at or past `capacity`.
pub fn validate_access(addr: i64, width: AccessWidth, capacity: usize) -> Result<usize, FaultKind> {
    let out_of_bounds = FaultKind::MemoryAccessOutOfBounds {
        addr,
        width: width.bytes(),
        capacity,
    };

    let start = usize::try_from(addr).map_err(|_| out_of_bounds)?;
    let end = start
        .checked_add(usize::from(width.bytes()))
        .ok_or(out_of_bounds)?;
    if end > capacity {
        return Err(out_of_bounds);
    }
    Ok(start)
}
