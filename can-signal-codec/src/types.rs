//! Core types for the signal codec library
//!
//! This module defines the byte-order convention, the occupancy mask type,
//! frame width constants and the error type shared by the codec and the
//! frame adapter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Number of payload bytes in a classic CAN frame
pub const FRAME_BYTES: usize = 8;

/// Set of bit positions claimed within a frame
///
/// Bit `8 * b + k` stands for bit `k` (LSB = 0) of payload byte `b`.
pub type BitMask = u64;

/// Byte order used to lay a signal's bytes into the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Little-endian (Intel format): bytes at increasing index from `start_bit / 8`
    #[default]
    #[serde(alias = "intel")]
    LittleEndian,
    /// Big-endian (Motorola format): bytes at decreasing index from `start_bit / 8`
    #[serde(alias = "motorola")]
    BigEndian,
}

impl ByteOrder {
    /// Byte index step when walking from the first byte of a field
    pub fn step(self) -> isize {
        match self {
            ByteOrder::LittleEndian => 1,
            ByteOrder::BigEndian => -1,
        }
    }

    pub fn is_big_endian(self) -> bool {
        self == ByteOrder::BigEndian
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LittleEndian => write!(f, "Intel"),
            ByteOrder::BigEndian => write!(f, "Motorola"),
        }
    }
}

/// Errors that can occur while encoding, decoding or building a frame layout
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("Physical value {value} is out of range [{min}, {max}]")]
    RangeError { value: f64, min: f64, max: f64 },

    #[error("Signal bytes {first} to {last} do not fit in a {len}-byte buffer")]
    Truncation { first: isize, last: isize, len: usize },

    #[error("Byte order mismatch: adapter is {adapter}, signal is {signal}")]
    OrderMismatch { adapter: ByteOrder, signal: ByteOrder },

    #[error("Signal at bit {start_bit} with length {bit_length} exceeds the 64-bit frame")]
    MaskOverflow { start_bit: u32, bit_length: u32 },

    #[error("Bit collision: slot {slot} overlaps slot {owner} on bits 0x{overlap:016X}")]
    BitCollision {
        slot: usize,
        owner: usize,
        overlap: BitMask,
    },

    #[error("Slot {index} is out of range (capacity {capacity})")]
    IndexOutOfRange { index: usize, capacity: usize },

    #[error("Slot {0} has no signal registered")]
    InvalidSlot(usize),

    #[error("Slot {0} already holds a signal")]
    SlotOccupied(usize),

    #[error("Expected at least {expected} values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Frame ID mismatch: expected 0x{expected:X}, got 0x{actual:X}")]
    FrameIdMismatch { expected: u32, actual: u32 },

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Invalid signal definition: {0}")]
    InvalidSignal(String),

    #[error("Invalid frame layout: {0}")]
    InvalidLayout(String),
}
