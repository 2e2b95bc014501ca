//! Frame layout configuration
//!
//! Declarative description of a frame and its signals, deserializable from
//! any serde format. A [`FrameLayout`] is turned into a ready
//! [`FrameAdapter`] with [`FrameLayout::build`].

use crate::adapter::{DlcMode, FrameAdapter};
use crate::codec::SignalCodec;
use crate::types::{ByteOrder, CodecError, Result};
use serde::{Deserialize, Serialize};

/// Layout of one frame: its ID, byte order and signals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameLayout {
    /// Frame ID the adapter is bound to
    pub frame_id: u32,

    /// Optional name for documentation
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub byte_order: ByteOrder,

    /// Slot count; defaults to the number of signals
    #[serde(default)]
    pub capacity: Option<usize>,

    #[serde(default)]
    pub dlc_mode: DlcMode,

    #[serde(default)]
    pub signals: Vec<SignalConfig>,
}

/// One signal of a frame layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub name: String,

    /// Slot index; defaults to the signal's position in the list
    #[serde(default)]
    pub slot: Option<usize>,

    pub start_bit: u32,

    pub bit_length: u32,

    /// Minimum physical value
    pub min: f64,

    /// Maximum physical value
    pub max: f64,

    /// Engineering unit (e.g., "km/h", "°C", "V")
    #[serde(default)]
    pub unit: Option<String>,
}

impl SignalConfig {
    /// Create a new signal description
    pub fn new(name: impl Into<String>, start_bit: u32, bit_length: u32, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            slot: None,
            start_bit,
            bit_length,
            min,
            max,
            unit: None,
        }
    }

    /// Builder method: pin the signal to a slot
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Builder method: set the engineering unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Build the codec for this signal in the given byte order
    pub fn to_codec(&self, byte_order: ByteOrder) -> Result<SignalCodec> {
        SignalCodec::new(self.start_bit, self.bit_length, self.min, self.max, byte_order).map_err(
            |e| match e {
                CodecError::InvalidSignal(reason) => {
                    CodecError::InvalidSignal(format!("'{}': {}", self.name, reason))
                }
                other => other,
            },
        )
    }
}

impl FrameLayout {
    /// Create an empty layout for a frame
    pub fn new(frame_id: u32, byte_order: ByteOrder) -> Self {
        Self {
            frame_id,
            byte_order,
            ..Self::default()
        }
    }

    /// Builder method: set the frame name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method: set the slot count
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Builder method: set the DLC derivation mode
    pub fn with_dlc_mode(mut self, dlc_mode: DlcMode) -> Self {
        self.dlc_mode = dlc_mode;
        self
    }

    /// Builder method: add a signal
    pub fn with_signal(mut self, signal: SignalConfig) -> Self {
        self.signals.push(signal);
        self
    }

    /// Slot count of the adapter built from this layout
    pub fn slot_count(&self) -> usize {
        self.capacity.unwrap_or(self.signals.len())
    }

    /// Slot of the `idx`-th signal
    fn slot_of(&self, idx: usize) -> usize {
        self.signals[idx].slot.unwrap_or(idx)
    }

    /// Signal descriptions indexed by slot
    pub fn signals_by_slot(&self) -> Vec<Option<&SignalConfig>> {
        let mut by_slot = vec![None; self.slot_count()];
        for (idx, signal) in self.signals.iter().enumerate() {
            if let Some(entry @ None) = by_slot.get_mut(self.slot_of(idx)) {
                *entry = Some(signal);
            }
        }
        by_slot
    }

    /// Find a signal by name
    pub fn find_signal(&self, name: &str) -> Option<(usize, &SignalConfig)> {
        self.signals
            .iter()
            .enumerate()
            .find(|(_, signal)| signal.name == name)
            .map(|(idx, signal)| (self.slot_of(idx), signal))
    }

    /// Build the adapter, registering every signal in its slot
    ///
    /// Fails on the first signal that cannot be registered.
    pub fn build(&self) -> Result<FrameAdapter> {
        let capacity = self.slot_count();
        if capacity < self.signals.len() {
            return Err(CodecError::InvalidLayout(format!(
                "frame 0x{:X} has {} signals but only {} slots",
                self.frame_id,
                self.signals.len(),
                capacity
            )));
        }

        let mut adapter =
            FrameAdapter::new(self.frame_id, capacity, self.byte_order).with_dlc_mode(self.dlc_mode);
        for (idx, signal) in self.signals.iter().enumerate() {
            let codec = signal.to_codec(self.byte_order)?;
            adapter.register(self.slot_of(idx), codec)?;
        }

        log::debug!(
            "Built frame 0x{:X} with {} signals, DLC {}",
            self.frame_id,
            adapter.len(),
            adapter.frame_length()
        );
        Ok(adapter)
    }

    /// Check that the layout builds
    pub fn validate(&self) -> Result<()> {
        self.build().map(|_| ())
    }
}
