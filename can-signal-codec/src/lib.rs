//! CAN Signal Codec Library
//!
//! Converts engineering-unit signal values to and from their packed bit-field
//! representation inside an 8-byte CAN frame.
//!
//! # Architecture
//!
//! - [`SignalCodec`] encodes/decodes one linearly scaled signal into a bit
//!   range of a byte buffer, in Intel or Motorola byte order
//! - [`FrameAdapter`] groups the signals of one frame, rejects overlapping or
//!   mismatched signals, and reads/writes every signal of a frame at once
//! - [`FrameLayout`] describes a frame declaratively and builds its adapter
//!
//! The library does NOT:
//! - Open, configure or read from a CAN channel
//! - Own frame buffers (callers pass them in)
//! - Render occupancy (the CLI does that from [`FrameAdapter::slot_masks`])
//!
//! # Example Usage
//!
//! ```
//! use can_signal_codec::{ByteOrder, CanFrame, FrameAdapter, SignalCodec};
//!
//! let mut adapter = FrameAdapter::new(0x123, 2, ByteOrder::LittleEndian);
//! adapter.register(0, SignalCodec::new(0, 10, 0.0, 1023.0, ByteOrder::LittleEndian)?)?;
//! adapter.set_signal(1, 14, 10, -50.0, 50.0)?;
//!
//! let mut frame = CanFrame::default();
//! adapter.bulk_write(&mut frame, &[512.0, -50.0])?;
//! assert_eq!(frame.id, 0x123);
//! assert_eq!(frame.len, 3);
//!
//! let values = adapter.bulk_read(&frame)?;
//! assert!((values[0] - 512.0).abs() < 1e-9);
//! # Ok::<(), can_signal_codec::CodecError>(())
//! ```

// Public modules
pub mod adapter;
pub mod codec;
pub mod config;
pub mod frame;
pub mod types;

// Re-export main types for convenience
pub use adapter::{DlcMode, FrameAdapter};
pub use codec::SignalCodec;
pub use config::{FrameLayout, SignalConfig};
pub use frame::{CanFrame, FrameMessage};
pub use types::{BitMask, ByteOrder, CodecError, Result, FRAME_BYTES};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
