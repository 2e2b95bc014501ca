//! Signal bit transcoding
//!
//! Converts one physical value to and from a bit field inside a frame buffer.
//! The field is linearly scaled from `[min_val, max_val]` onto
//! `[0, 2^bit_length - 1]` and laid out byte by byte, either at increasing
//! (Intel) or decreasing (Motorola) byte index from `start_bit / 8`.

use crate::types::{BitMask, ByteOrder, CodecError, Result, FRAME_BYTES};
use std::fmt;

/// A single scaled signal occupying a bit range of a frame
///
/// Immutable once constructed; all derived quantities are computed in
/// [`SignalCodec::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct SignalCodec {
    start_bit: u32,
    bit_length: u32,
    min_val: f64,
    max_val: f64,
    byte_order: ByteOrder,
    /// Number of bytes touched by the field
    byte_span: usize,
    /// `2^bit_length - 1`
    raw_mask: u64,
    range: f64,
}

impl SignalCodec {
    /// Create a codec for a signal
    ///
    /// # Arguments
    /// * `start_bit` - Bit offset of the field within the frame
    /// * `bit_length` - Field width in bits (1..=64)
    /// * `min_val` / `max_val` - Physical range, `max_val > min_val`
    /// * `byte_order` - Direction in which the field's bytes are laid out
    ///
    /// # Returns
    /// * `Err(CodecError::InvalidSignal)` if the definition is unusable
    pub fn new(
        start_bit: u32,
        bit_length: u32,
        min_val: f64,
        max_val: f64,
        byte_order: ByteOrder,
    ) -> Result<Self> {
        if !(1..=64).contains(&bit_length) {
            return Err(CodecError::InvalidSignal(format!(
                "bit length {} is outside 1..=64",
                bit_length
            )));
        }

        let range = max_val - min_val;
        if !min_val.is_finite() || !max_val.is_finite() || !range.is_finite() || range <= 0.0 {
            return Err(CodecError::InvalidSignal(format!(
                "physical range [{}, {}] must be finite with max > min",
                min_val, max_val
            )));
        }

        let first_byte = u64::from(start_bit) / 8;
        let last_bit = u64::from(start_bit) + u64::from(bit_length) - 1;
        let byte_span = (last_bit / 8 - first_byte + 1) as usize;

        // Motorola fields walk toward byte 0 and must not pass it
        if byte_order == ByteOrder::BigEndian && first_byte + 1 < byte_span as u64 {
            return Err(CodecError::InvalidSignal(format!(
                "big-endian signal at bit {} with length {} reaches below byte 0",
                start_bit, bit_length
            )));
        }

        Ok(Self {
            start_bit,
            bit_length,
            min_val,
            max_val,
            byte_order,
            byte_span,
            raw_mask: u64::MAX >> (64 - bit_length),
            range,
        })
    }

    pub fn start_bit(&self) -> u32 {
        self.start_bit
    }

    pub fn bit_length(&self) -> u32 {
        self.bit_length
    }

    pub fn min_val(&self) -> f64 {
        self.min_val
    }

    pub fn max_val(&self) -> f64 {
        self.max_val
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn byte_span(&self) -> usize {
        self.byte_span
    }

    pub fn raw_mask(&self) -> u64 {
        self.raw_mask
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    /// Quantization step: the physical change represented by one raw count
    pub fn resolution(&self) -> f64 {
        self.range / self.raw_mask as f64
    }

    /// Byte holding `start_bit`, where the byte walk begins
    pub fn first_byte(&self) -> usize {
        self.start_bit as usize / 8
    }

    /// Lowest byte index touched by the field
    pub fn lowest_byte(&self) -> usize {
        match self.byte_order {
            ByteOrder::LittleEndian => self.first_byte(),
            ByteOrder::BigEndian => self.first_byte() + 1 - self.byte_span,
        }
    }

    /// Highest byte index touched by the field
    pub fn highest_byte(&self) -> usize {
        match self.byte_order {
            ByteOrder::LittleEndian => self.first_byte() + self.byte_span - 1,
            ByteOrder::BigEndian => self.first_byte(),
        }
    }

    /// Scale a physical value into its raw representation
    ///
    /// Fails with `RangeError` outside `[min_val, max_val]` (NaN included);
    /// values are never clamped.
    pub fn to_raw(&self, value: f64) -> Result<u64> {
        if !(value >= self.min_val && value <= self.max_val) {
            return Err(CodecError::RangeError {
                value,
                min: self.min_val,
                max: self.max_val,
            });
        }

        let scaled = ((value - self.min_val) / self.range * self.raw_mask as f64).round();
        // `as` saturates, the mask guards against rounding past the field width
        Ok((scaled as u64) & self.raw_mask)
    }

    /// Scale a raw field value back to physical units
    pub fn to_physical(&self, raw: u64) -> f64 {
        (raw & self.raw_mask) as f64 / self.raw_mask as f64 * self.range + self.min_val
    }

    /// Encode `value` into `dest`, OR-merging with the bytes already there
    ///
    /// The whole slice is the usable buffer. Bits outside this signal's field
    /// are left alone, so several signals with disjoint fields may share one
    /// buffer. Callers are responsible for that disjointness (see
    /// `FrameAdapter`).
    ///
    /// Nothing is written unless the call succeeds.
    pub fn encode(&self, value: f64, dest: &mut [u8]) -> Result<()> {
        let raw = self.to_raw(value)?;
        self.scatter(raw, dest)
    }

    /// Encode into the first `len` bytes of `dest`
    pub fn encode_with_len(&self, value: f64, dest: &mut [u8], len: usize) -> Result<()> {
        if len > dest.len() {
            return Err(CodecError::PreconditionViolation(format!(
                "usable length {} exceeds buffer of {} bytes",
                len,
                dest.len()
            )));
        }
        self.encode(value, &mut dest[..len])
    }

    /// Decode the physical value held by this signal's field in `src`
    ///
    /// The result is not checked against `[min_val, max_val]`.
    pub fn decode(&self, src: &[u8]) -> Result<f64> {
        self.check_bounds(src.len())?;

        let mut scratch: u128 = 0;
        for i in 0..self.byte_span {
            scratch |= u128::from(src[self.byte_position(i)]) << (8 * i);
        }

        let raw = (scratch >> self.bit_offset()) as u64 & self.raw_mask;
        Ok(self.to_physical(raw))
    }

    /// Decode from the first `len` bytes of `src`
    pub fn decode_with_len(&self, src: &[u8], len: usize) -> Result<f64> {
        if len > src.len() {
            return Err(CodecError::PreconditionViolation(format!(
                "usable length {} exceeds buffer of {} bytes",
                len,
                src.len()
            )));
        }
        self.decode(&src[..len])
    }

    /// Bit positions claimed by this signal in a frame
    ///
    /// Equivalent to encoding `max_val` into a zeroed frame and collecting
    /// the set bits, but works on a private scratch frame.
    ///
    /// # Returns
    /// * `Err(CodecError::MaskOverflow)` if the field does not fit in
    ///   [`FRAME_BYTES`] bytes
    pub fn compute_mask(&self) -> Result<BitMask> {
        let mut scratch = [0u8; FRAME_BYTES];
        self.scatter(self.raw_mask, &mut scratch)
            .map_err(|_| CodecError::MaskOverflow {
                start_bit: self.start_bit,
                bit_length: self.bit_length,
            })?;

        Ok(scratch
            .iter()
            .enumerate()
            .fold(0, |mask, (idx, &byte)| mask | (BitMask::from(byte) << (8 * idx))))
    }

    fn bit_offset(&self) -> u32 {
        self.start_bit % 8
    }

    /// Buffer index of the `i`-th byte of the field (byte 0 carries the LSBs)
    fn byte_position(&self, i: usize) -> usize {
        match self.byte_order {
            ByteOrder::LittleEndian => self.first_byte() + i,
            ByteOrder::BigEndian => self.first_byte() - i,
        }
    }

    fn check_bounds(&self, len: usize) -> Result<()> {
        let first = self.first_byte() as isize;
        let last = first + self.byte_order.step() * (self.byte_span as isize - 1);
        if self.highest_byte() >= len {
            return Err(CodecError::Truncation { first, last, len });
        }
        Ok(())
    }

    /// Place a raw value into `dest`; bounds are checked before any write
    fn scatter(&self, raw: u64, dest: &mut [u8]) -> Result<()> {
        self.check_bounds(dest.len())?;

        // A 64-bit field at a non-zero offset spans nine bytes
        let scratch = u128::from(raw & self.raw_mask) << self.bit_offset();
        for i in 0..self.byte_span {
            dest[self.byte_position(i)] |= (scratch >> (8 * i)) as u8;
        }
        Ok(())
    }
}

impl fmt::Display for SignalCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}@{} [{}|{}]",
            self.start_bit, self.bit_length, self.byte_order, self.min_val, self.max_val
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intel(start_bit: u32, bit_length: u32, min: f64, max: f64) -> SignalCodec {
        SignalCodec::new(start_bit, bit_length, min, max, ByteOrder::LittleEndian).unwrap()
    }

    fn motorola(start_bit: u32, bit_length: u32, min: f64, max: f64) -> SignalCodec {
        SignalCodec::new(start_bit, bit_length, min, max, ByteOrder::BigEndian).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_derived_fields() {
        let codec = intel(4, 12, 0.0, 100.0);
        assert_eq!(codec.byte_span(), 2);
        assert_eq!(codec.raw_mask(), 0xFFF);
        assert_eq!(codec.range(), 100.0);
        assert_eq!(codec.lowest_byte(), 0);
        assert_eq!(codec.highest_byte(), 1);

        let codec = motorola(20, 10, 0.0, 1023.0);
        assert_eq!(codec.byte_span(), 2);
        assert_eq!(codec.lowest_byte(), 1);
        assert_eq!(codec.highest_byte(), 2);
    }

    #[test]
    fn test_full_width_mask() {
        let codec = intel(0, 64, 0.0, 1.0);
        assert_eq!(codec.raw_mask(), u64::MAX);
        assert_eq!(codec.byte_span(), 8);
        assert_eq!(codec.compute_mask().unwrap(), u64::MAX);
    }

    #[test]
    fn test_invalid_definitions() {
        assert!(matches!(
            SignalCodec::new(0, 0, 0.0, 1.0, ByteOrder::LittleEndian),
            Err(CodecError::InvalidSignal(_))
        ));
        assert!(matches!(
            SignalCodec::new(0, 65, 0.0, 1.0, ByteOrder::LittleEndian),
            Err(CodecError::InvalidSignal(_))
        ));
        assert!(matches!(
            SignalCodec::new(0, 8, 5.0, 5.0, ByteOrder::LittleEndian),
            Err(CodecError::InvalidSignal(_))
        ));
        assert!(matches!(
            SignalCodec::new(0, 8, 0.0, f64::NAN, ByteOrder::LittleEndian),
            Err(CodecError::InvalidSignal(_))
        ));
        // Bits 4..=11 walking downward from byte 0
        assert!(matches!(
            SignalCodec::new(4, 8, 0.0, 1.0, ByteOrder::BigEndian),
            Err(CodecError::InvalidSignal(_))
        ));
    }

    #[test]
    fn test_encode_little_endian_cross_byte() {
        let codec = intel(4, 12, 0.0, 4095.0);
        let mut data = [0u8; 8];
        codec.encode(0xABC as f64, &mut data).unwrap();
        assert_eq!(data[0], 0xC0);
        assert_eq!(data[1], 0xAB);
        assert_close(codec.decode(&data).unwrap(), 0xABC as f64);
    }

    #[test]
    fn test_encode_big_endian_walks_down() {
        let codec = motorola(20, 10, 0.0, 1023.0);
        let mut data = [0u8; 8];
        codec.encode(500.0, &mut data).unwrap();
        // 500 << 4 = 0x1F40: low byte at byte 2, next byte at byte 1
        assert_eq!(data[2], 0x40);
        assert_eq!(data[1], 0x1F);
        assert_close(codec.decode(&data).unwrap(), 500.0);
    }

    #[test]
    fn test_scaling_with_offset() {
        let codec = intel(40, 10, 1.0, 1024.0);
        let mut data = [0u8; 8];
        codec.encode(1024.0, &mut data).unwrap();
        assert_eq!(codec.to_raw(1024.0).unwrap(), 1023);
        assert_eq!(codec.decode(&data).unwrap(), 1024.0);

        let codec = motorola(56, 14, 0.0, 50.0);
        let mut data = [0u8; 8];
        codec.encode(50.0, &mut data).unwrap();
        assert_eq!(codec.decode(&data).unwrap(), 50.0);
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        let codec = intel(0, 8, -40.0, 215.0);
        let mut data = [0u8; 8];
        assert!(matches!(
            codec.encode(215.5, &mut data),
            Err(CodecError::RangeError { .. })
        ));
        assert!(matches!(
            codec.encode(-40.1, &mut data),
            Err(CodecError::RangeError { .. })
        ));
        assert!(matches!(
            codec.encode(f64::NAN, &mut data),
            Err(CodecError::RangeError { .. })
        ));
        assert_eq!(data, [0u8; 8]);
    }

    #[test]
    fn test_encode_or_merges() {
        let codec = intel(0, 4, 0.0, 15.0);
        let mut data = [0xF0u8, 0, 0, 0, 0, 0, 0, 0];
        codec.encode(5.0, &mut data).unwrap();
        assert_eq!(data[0], 0xF5);
    }

    #[test]
    fn test_truncation_leaves_buffer_untouched() {
        let codec = intel(56, 16, 0.0, 100.0);
        let mut data = [0u8; 8];
        let err = codec.encode(50.0, &mut data).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncation {
                first: 7,
                last: 8,
                len: 8
            }
        );
        assert_eq!(data, [0u8; 8]);
        assert!(matches!(codec.decode(&data), Err(CodecError::Truncation { .. })));
    }

    #[test]
    fn test_short_buffer() {
        let codec = motorola(23, 8, 0.0, 255.0);
        let mut data = [0u8; 2];
        assert!(matches!(
            codec.encode(1.0, &mut data),
            Err(CodecError::Truncation { .. })
        ));
    }

    #[test]
    fn test_explicit_length_forms() {
        let codec = intel(0, 8, 0.0, 255.0);
        let mut data = [0u8; 4];
        assert!(matches!(
            codec.encode_with_len(1.0, &mut data, 5),
            Err(CodecError::PreconditionViolation(_))
        ));
        assert!(matches!(
            codec.decode_with_len(&data, 5),
            Err(CodecError::PreconditionViolation(_))
        ));

        let codec = intel(8, 8, 0.0, 255.0);
        assert!(matches!(
            codec.encode_with_len(1.0, &mut data, 1),
            Err(CodecError::Truncation { .. })
        ));
        codec.encode_with_len(7.0, &mut data, 2).unwrap();
        assert_close(codec.decode_with_len(&data, 2).unwrap(), 7.0);
    }

    #[test]
    fn test_decode_reads_foreign_bits() {
        // Bits set by unrelated data still decode without error
        let codec = intel(0, 8, 0.0, 10.0);
        let data = [0xFFu8; 8];
        assert_eq!(codec.decode(&data).unwrap(), 10.0);
    }

    #[test]
    fn test_compute_mask() {
        assert_eq!(intel(0, 10, 0.0, 1.0).compute_mask().unwrap(), 0x3FF);
        assert_eq!(intel(14, 10, 0.0, 1.0).compute_mask().unwrap(), 0x00FF_C000);
        assert_eq!(motorola(20, 10, 0.0, 1.0).compute_mask().unwrap(), 0x00F0_3F00);
        assert_eq!(intel(63, 1, 0.0, 1.0).compute_mask().unwrap(), 1 << 63);
    }

    #[test]
    fn test_compute_mask_overflow() {
        assert_eq!(
            intel(60, 8, 0.0, 1.0).compute_mask(),
            Err(CodecError::MaskOverflow {
                start_bit: 60,
                bit_length: 8
            })
        );
        assert!(motorola(71, 8, 0.0, 1.0).compute_mask().is_err());
    }

    #[test]
    fn test_64_bit_field_at_offset_spans_nine_bytes() {
        let codec = intel(4, 64, 0.0, u64::MAX as f64);
        assert_eq!(codec.byte_span(), 9);

        let mut data = [0u8; 9];
        codec.encode(u64::MAX as f64, &mut data).unwrap();
        assert_eq!(data[0], 0xF0);
        assert_eq!(&data[1..8], &[0xFF; 7]);
        assert_eq!(data[8], 0x0F);
        assert!(codec.compute_mask().is_err());
    }

    #[test]
    fn test_display() {
        let codec = motorola(20, 10, 0.0, 1023.0);
        assert_eq!(codec.to_string(), "20|10@Motorola [0|1023]");
    }
}
