//! Frame adapter
//!
//! Groups several [`SignalCodec`]s that share one frame. The adapter keeps a
//! fixed table of optional slots, refuses signals whose byte order differs
//! from its own or whose bits overlap an already registered signal, and
//! reads/writes all slots of a frame in one call.
//!
//! The adapter owns no frame buffer: every encode/decode works on a buffer or
//! [`FrameMessage`] supplied by the caller.

use crate::codec::SignalCodec;
use crate::frame::FrameMessage;
use crate::types::{BitMask, ByteOrder, CodecError, Result, FRAME_BYTES};
use serde::{Deserialize, Serialize};

/// How the transmitted data length code is derived from the occupied bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DlcMode {
    /// `highest occupied byte + 1`
    #[default]
    Exact,
    /// `(highest occupied byte + 1) & 0b111`, as written by legacy transports
    /// with a 3-bit length field. An 8-byte frame reports 0.
    #[serde(alias = "legacy")]
    Legacy3Bit,
}

/// A set of non-overlapping signals bound to one frame ID
#[derive(Debug, Clone)]
pub struct FrameAdapter {
    frame_id: u32,
    byte_order: ByteOrder,
    dlc_mode: DlcMode,
    slots: Vec<Option<SignalCodec>>,
    /// Union of the masks of all registered signals
    occupancy_mask: BitMask,
    /// Highest byte index touched by any registered signal
    max_byte_used: Option<usize>,
}

impl FrameAdapter {
    /// Create an adapter with `capacity` unset slots
    pub fn new(frame_id: u32, capacity: usize, byte_order: ByteOrder) -> Self {
        Self {
            frame_id,
            byte_order,
            dlc_mode: DlcMode::default(),
            slots: vec![None; capacity],
            occupancy_mask: 0,
            max_byte_used: None,
        }
    }

    /// Builder method: choose how the frame length is derived
    pub fn with_dlc_mode(mut self, dlc_mode: DlcMode) -> Self {
        self.dlc_mode = dlc_mode;
        self
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn dlc_mode(&self) -> DlcMode {
        self.dlc_mode
    }

    /// Number of slots, populated or not
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of populated slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn occupancy_mask(&self) -> BitMask {
        self.occupancy_mask
    }

    pub fn max_byte_used(&self) -> Option<usize> {
        self.max_byte_used
    }

    /// Signal registered in `slot`, if any
    pub fn slot(&self, slot: usize) -> Option<&SignalCodec> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// All populated slots with their index
    pub fn signals(&self) -> impl Iterator<Item = (usize, &SignalCodec)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|codec| (idx, codec)))
    }

    /// Per-slot occupancy, `None` for unset slots
    pub fn slot_masks(&self) -> Vec<Option<BitMask>> {
        self.slots
            .iter()
            .map(|slot| slot.as_ref().and_then(|codec| codec.compute_mask().ok()))
            .collect()
    }

    /// Register `codec` in an unset slot
    ///
    /// # Returns
    /// * `Err(IndexOutOfRange)` - `slot` is beyond the capacity
    /// * `Err(SlotOccupied)` - the slot already holds a signal
    /// * `Err(OrderMismatch)` - the codec's byte order differs from the adapter's
    /// * `Err(MaskOverflow)` - the codec does not fit in the frame
    /// * `Err(BitCollision)` - the codec overlaps a registered signal
    ///
    /// The adapter is left unchanged on error.
    pub fn register(&mut self, slot: usize, codec: SignalCodec) -> Result<()> {
        if slot >= self.slots.len() {
            log::warn!(
                "Frame 0x{:X}: slot {} is out of range (capacity {})",
                self.frame_id,
                slot,
                self.slots.len()
            );
            return Err(CodecError::IndexOutOfRange {
                index: slot,
                capacity: self.slots.len(),
            });
        }
        if self.slots[slot].is_some() {
            log::warn!("Frame 0x{:X}: slot {} is already populated", self.frame_id, slot);
            return Err(CodecError::SlotOccupied(slot));
        }

        let mask = self.admit(slot, &codec)?;
        self.commit(slot, codec, mask);
        Ok(())
    }

    /// Register `codec` in a new slot appended to the table
    ///
    /// The table grows by one slot on every call, so slot indices follow
    /// call order. A rejected codec leaves its slot unset, which makes
    /// `status()` false and bulk operations stop with `InvalidSlot`.
    ///
    /// # Returns
    /// * `Ok(slot)` - index of the new slot
    /// * `Err(_)` - same errors as [`FrameAdapter::register`]; the error
    ///   carries the new slot index where it has one
    pub fn append(&mut self, codec: SignalCodec) -> Result<usize> {
        let slot = self.slots.len();
        self.slots.push(None);
        let mask = self.admit(slot, &codec)?;
        self.commit(slot, codec, mask);
        Ok(slot)
    }

    /// Build a codec in the adapter's byte order and register it in `slot`
    pub fn set_signal(
        &mut self,
        slot: usize,
        start_bit: u32,
        bit_length: u32,
        min_val: f64,
        max_val: f64,
    ) -> Result<()> {
        let codec = SignalCodec::new(start_bit, bit_length, min_val, max_val, self.byte_order)
            .map_err(|e| {
                log::warn!("Frame 0x{:X}: slot {}: {}", self.frame_id, slot, e);
                e
            })?;
        self.register(slot, codec)
    }

    /// Check a codec against the adapter without changing it
    fn admit(&self, slot: usize, codec: &SignalCodec) -> Result<BitMask> {
        if codec.byte_order() != self.byte_order {
            log::warn!(
                "Frame 0x{:X}: slot {} is {} but the frame is {}",
                self.frame_id,
                slot,
                codec.byte_order(),
                self.byte_order
            );
            return Err(CodecError::OrderMismatch {
                adapter: self.byte_order,
                signal: codec.byte_order(),
            });
        }

        let mask = codec.compute_mask().map_err(|e| {
            log::warn!("Frame 0x{:X}: slot {}: {}", self.frame_id, slot, e);
            e
        })?;

        let overlap = mask & self.occupancy_mask;
        if overlap != 0 {
            let owner = self
                .slots
                .iter()
                .position(|other| {
                    other
                        .as_ref()
                        .and_then(|c| c.compute_mask().ok())
                        .is_some_and(|m| m & overlap != 0)
                })
                .unwrap_or(slot);
            log::warn!(
                "Frame 0x{:X}: slot {} ({}) collides with slot {} on bits 0x{:016X}",
                self.frame_id,
                slot,
                codec,
                owner,
                overlap
            );
            return Err(CodecError::BitCollision {
                slot,
                owner,
                overlap,
            });
        }

        Ok(mask)
    }

    fn commit(&mut self, slot: usize, codec: SignalCodec, mask: BitMask) {
        log::debug!(
            "Frame 0x{:X}: slot {} registered ({}, mask 0x{:016X})",
            self.frame_id,
            slot,
            codec,
            mask
        );
        self.occupancy_mask |= mask;
        self.max_byte_used = self.max_byte_used.max(Some(codec.highest_byte()));
        self.slots[slot] = Some(codec);
    }

    /// Look up a populated slot
    fn codec(&self, slot: usize) -> Result<&SignalCodec> {
        match self.slots.get(slot) {
            None => Err(CodecError::IndexOutOfRange {
                index: slot,
                capacity: self.slots.len(),
            }),
            Some(None) => Err(CodecError::InvalidSlot(slot)),
            Some(Some(codec)) => Ok(codec),
        }
    }

    /// Encode `value` through the signal in `slot` into `buf`
    pub fn assign(&self, slot: usize, value: f64, buf: &mut [u8]) -> Result<()> {
        self.codec(slot)
            .and_then(|codec| codec.encode(value, buf))
            .map_err(|e| {
                log::warn!("Frame 0x{:X}: assign slot {}: {}", self.frame_id, slot, e);
                e
            })
    }

    /// Decode the signal in `slot` from `buf`
    pub fn fetch(&self, slot: usize, buf: &[u8]) -> Result<f64> {
        self.codec(slot)
            .and_then(|codec| codec.decode(buf))
            .map_err(|e| {
                log::warn!("Frame 0x{:X}: fetch slot {}: {}", self.frame_id, slot, e);
                e
            })
    }

    /// Data length code for a frame carrying every registered signal
    ///
    /// 0 while no signal is registered.
    pub fn frame_length(&self) -> u8 {
        let Some(max_byte) = self.max_byte_used else {
            return 0;
        };
        let count = max_byte + 1;
        match self.dlc_mode {
            DlcMode::Exact => count as u8,
            DlcMode::Legacy3Bit => (count & 0b111) as u8,
        }
    }

    /// Encode `values[i]` through slot `i` for every slot, then stamp the
    /// frame's ID and DLC
    ///
    /// Values are OR-merged into the payload; see [`FrameAdapter::clear_occupied`]
    /// to reuse a frame. Slots are processed in order and processing stops at
    /// the first failure: slots written before it stay written, and the ID
    /// and DLC are only set when every slot succeeded.
    pub fn bulk_write(&self, frame: &mut dyn FrameMessage, values: &[f64]) -> Result<()> {
        if values.len() < self.slots.len() {
            log::warn!(
                "Frame 0x{:X}: bulk write needs {} values, got {}",
                self.frame_id,
                self.slots.len(),
                values.len()
            );
            return Err(CodecError::ArityMismatch {
                expected: self.slots.len(),
                actual: values.len(),
            });
        }

        for (slot, &value) in values.iter().enumerate().take(self.slots.len()) {
            log::trace!("Frame 0x{:X}: writing slot {} = {}", self.frame_id, slot, value);
            self.assign(slot, value, frame.payload_mut())?;
        }

        frame.set_id(self.frame_id);
        frame.set_dlc(usize::from(self.frame_length()));
        Ok(())
    }

    /// Decode every slot from `frame`
    pub fn bulk_read(&self, frame: &dyn FrameMessage) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(self.slots.len());
        self.bulk_read_into(frame, &mut values)?;
        Ok(values)
    }

    /// Decode every slot from `frame` into `values`
    ///
    /// `values` is resized to the slot count; entries not reached because of
    /// an earlier failure are NaN. Decoding uses the whole payload rather
    /// than the DLC so that frames stamped in [`DlcMode::Legacy3Bit`] stay
    /// readable.
    pub fn bulk_read_into(&self, frame: &dyn FrameMessage, values: &mut Vec<f64>) -> Result<()> {
        if frame.id() != self.frame_id {
            log::warn!(
                "Frame ID mismatch: adapter 0x{:X}, frame 0x{:X}",
                self.frame_id,
                frame.id()
            );
            return Err(CodecError::FrameIdMismatch {
                expected: self.frame_id,
                actual: frame.id(),
            });
        }
        if frame.dlc() > frame.payload().len() {
            return Err(CodecError::PreconditionViolation(format!(
                "DLC {} exceeds payload of {} bytes",
                frame.dlc(),
                frame.payload().len()
            )));
        }

        values.clear();
        values.resize(self.slots.len(), f64::NAN);

        for (slot, value) in values.iter_mut().enumerate() {
            *value = self.fetch(slot, frame.payload())?;
            log::trace!("Frame 0x{:X}: read slot {} = {}", self.frame_id, slot, value);
        }
        Ok(())
    }

    /// Zero the bits owned by registered signals, leaving all other bits
    pub fn clear_occupied(&self, buf: &mut [u8]) {
        for (idx, byte) in buf.iter_mut().take(FRAME_BYTES).enumerate() {
            *byte &= !((self.occupancy_mask >> (8 * idx)) as u8);
        }
    }

    /// True when every slot holds a signal
    pub fn status(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(Option::is_some)
    }

    /// Unset every slot and forget all occupancy
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.occupancy_mask = 0;
        self.max_byte_used = None;
    }
}
