//! Packed pointer/length handles into guest linear memory.
//!
//! Host and guest cannot share native addresses, so every region crossing
//! the boundary is referenced by a single `u64` packing a 32-bit address
//! (high half) and a 32-bit byte length (low half). A `FatPtr` is only
//! meaningful relative to the guest instance that owns the memory; it is
//! never dereferenced as a host pointer.

use std::fmt;

/// Packed (address, length) reference into guest linear memory.
///
/// `FatPtr::NULL` (all zero bits) denotes "no payload" at call sites that
/// allow an absent result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FatPtr(u64);

impl FatPtr {
    /// The null handle.
    pub const NULL: FatPtr = FatPtr(0);

    /// Pack an address and a byte length into one handle.
    pub fn pack(addr: u32, len: u32) -> Self {
        Self(((addr as u64) << 32) | (len as u64))
    }

    /// Recover the (address, length) pair.
    pub fn unpack(self) -> (u32, u32) {
        ((self.0 >> 32) as u32, self.0 as u32)
    }

    /// The raw wire representation (an i64 on the WASM side).
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Reinterpret a raw wire value as a handle.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Address into guest memory.
    pub fn addr(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Byte length of the referenced region.
    pub fn len(self) -> u32 {
        self.0 as u32
    }

    /// True for the null handle.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for FatPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}+{}", self.addr(), self.len())
    }
}
