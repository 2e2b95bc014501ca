//! Frame message abstraction
//!
//! The adapter never talks to a transport. Bulk operations only need to read
//! and write a frame's identifier, payload bytes and data length code, which
//! is what [`FrameMessage`] exposes. Any transport message type can implement
//! it; [`CanFrame`] is the plain classic-CAN implementation.

use crate::types::{CodecError, Result, FRAME_BYTES};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accessors a frame message must provide to be read or written in bulk
pub trait FrameMessage {
    /// Frame identifier
    fn id(&self) -> u32;

    fn set_id(&mut self, id: u32);

    /// Payload bytes (the full buffer, independent of the DLC)
    fn payload(&self) -> &[u8];

    fn payload_mut(&mut self) -> &mut [u8];

    /// Data length code - number of meaningful payload bytes
    fn dlc(&self) -> usize;

    /// Set the data length code; implementations may clamp it to their payload size
    fn set_dlc(&mut self, dlc: usize);
}

/// Classic CAN frame with an 8-byte payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    /// CAN message ID (11-bit or 29-bit)
    pub id: u32,
    /// Frame data bytes
    pub data: [u8; FRAME_BYTES],
    /// Number of meaningful bytes in `data`
    pub len: u8,
}

impl CanFrame {
    /// Create a frame from an ID and up to 8 data bytes
    ///
    /// Missing bytes are zero and the DLC is the number of bytes given.
    pub fn new(id: u32, data: &[u8]) -> Result<Self> {
        if data.len() > FRAME_BYTES {
            return Err(CodecError::PreconditionViolation(format!(
                "{} data bytes do not fit in a {}-byte frame",
                data.len(),
                FRAME_BYTES
            )));
        }

        let mut frame = Self {
            id,
            data: [0; FRAME_BYTES],
            len: data.len() as u8,
        };
        frame.data[..data.len()].copy_from_slice(data);
        Ok(frame)
    }

    /// Empty frame with the given ID, ready to be filled by a bulk write
    pub fn empty(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// The meaningful bytes of the frame
    pub fn data(&self) -> &[u8] {
        &self.data[..usize::from(self.len).min(FRAME_BYTES)]
    }
}

impl FrameMessage for CanFrame {
    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn payload(&self) -> &[u8] {
        &self.data
    }

    fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn dlc(&self) -> usize {
        usize::from(self.len)
    }

    fn set_dlc(&mut self, dlc: usize) {
        // Never claim more bytes than the payload holds
        self.len = dlc.min(FRAME_BYTES) as u8;
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:03X} [{}]", self.id, self.len)?;
        for byte in self.data() {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}
