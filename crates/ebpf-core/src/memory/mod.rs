//! Bounded, byte-addressable data memory.

/// Access width and bounds validation helpers.
pub mod access;

pub use access::{validate_access, AccessWidth};

use crate::FaultKind;

/// Default data memory capacity in bytes (64 KiB).
pub const DEFAULT_MEMORY_CAPACITY: usize = 65_536;

/// Zero-initialised, fixed-capacity data memory.
///
/// All multi-byte accesses are little-endian and bounds-checked; a rejected
/// access leaves the buffer untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl Memory {
    /// Allocates `capacity` zeroed bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity].into_boxed_slice(),
        }
    }

    /// Capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Read-only view of the whole buffer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable view of the whole buffer, for seeding memory before a run.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Reads `width` bytes at `addr`, zero-extended into a `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultKind::MemoryAccessOutOfBounds`] when the access leaves
    /// the buffer.
    pub fn load(&self, addr: i64, width: AccessWidth) -> Result<u64, FaultKind> {
        let start = validate_access(addr, width, self.capacity())?;
        let mut raw = [0u8; 8];
        let len = usize::from(width.bytes());
        raw[..len].copy_from_slice(&self.bytes[start..start + len]);
        Ok(u64::from_le_bytes(raw))
    }

    /// Writes the low `width` bytes of `value` at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultKind::MemoryAccessOutOfBounds`] when the access leaves
    /// the buffer; memory is not modified in that case.
    pub fn store(&mut self, addr: i64, width: AccessWidth, value: u64) -> Result<(), FaultKind> {
        let start = validate_access(addr, width, self.capacity())?;
        let len = usize::from(width.bytes());
        self.bytes[start..start + len].copy_from_slice(&value.to_le_bytes()[..len]);
        Ok(())
    }
}
