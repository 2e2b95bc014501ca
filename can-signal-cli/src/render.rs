//! Text rendering of frame layouts and decoded values

use can_signal_codec::{BitMask, CanFrame, FrameAdapter, FrameLayout, FRAME_BYTES};
use serde::Serialize;

/// Occupancy matrix: one row per byte, bit 7 on the left, slot number per bit
pub fn occupancy_matrix(adapter: &FrameAdapter) -> String {
    let masks = adapter.slot_masks();
    let mut out = String::new();

    out.push_str("byte |");
    for bit in (0..8).rev() {
        out.push_str(&format!("{:>3}", bit));
    }
    out.push('\n');
    out.push_str("-----+");
    out.push_str(&"-".repeat(24));
    out.push('\n');

    for byte in 0..FRAME_BYTES {
        out.push_str(&format!("{:>4} |", byte));
        for bit in (0..8).rev() {
            match owner(&masks, 8 * byte + bit) {
                Some(slot) => out.push_str(&format!("{:>3}", slot)),
                None => out.push_str("  ."),
            }
        }
        out.push('\n');
    }
    out
}

fn owner(masks: &[Option<BitMask>], position: usize) -> Option<usize> {
    masks
        .iter()
        .position(|mask| mask.is_some_and(|m| m & (1 << position) != 0))
}

/// One line per slot: definition, range and resolution
pub fn signal_table(layout: &FrameLayout, adapter: &FrameAdapter) -> String {
    let by_slot = layout.signals_by_slot();
    let mut out = String::new();

    for (slot, signal) in by_slot.into_iter().enumerate() {
        let name = signal.map(|s| s.name.as_str()).unwrap_or("<unset>");
        let line = match adapter.slot(slot) {
            Some(codec) => format!(
                "  [{}] {:<20} {}  step {:.6}{}\n",
                slot,
                name,
                codec,
                codec.resolution(),
                signal
                    .and_then(|s| s.unit.as_deref())
                    .map(|u| format!(" {}", u))
                    .unwrap_or_default()
            ),
            None => format!("  [{}] {:<20} (empty)\n", slot, name),
        };
        out.push_str(&line);
    }
    out
}

/// Frame as produced by `encode`
#[derive(Debug, Serialize)]
pub struct EncodedFrame {
    pub id: u32,
    pub dlc: u8,
    pub data: String,
}

impl From<&CanFrame> for EncodedFrame {
    fn from(frame: &CanFrame) -> Self {
        Self {
            id: frame.id,
            dlc: frame.len,
            data: hex(frame.data()),
        }
    }
}

/// One decoded slot as produced by `decode`
#[derive(Debug, Serialize)]
pub struct DecodedValue {
    pub slot: usize,
    pub name: String,
    pub value: f64,
    pub unit: Option<String>,
}

pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_signal_codec::{ByteOrder, SignalConfig};

    #[test]
    fn test_occupancy_matrix() {
        let layout = FrameLayout::new(0x10, ByteOrder::LittleEndian)
            .with_signal(SignalConfig::new("A", 0, 4, 0.0, 1.0))
            .with_signal(SignalConfig::new("B", 12, 8, 0.0, 1.0));
        let adapter = layout.build().unwrap();

        let matrix = occupancy_matrix(&adapter);
        let lines: Vec<&str> = matrix.lines().collect();
        assert_eq!(lines.len(), 2 + FRAME_BYTES);
        assert_eq!(lines[2], "   0 |  .  .  .  .  0  0  0  0");
        assert_eq!(lines[3], "   1 |  1  1  1  1  .  .  .  .");
        assert_eq!(lines[4], "   2 |  .  .  .  .  1  1  1  1");
    }

    #[test]
    fn test_signal_table_marks_empty_slots() {
        let layout = FrameLayout::new(0x10, ByteOrder::LittleEndian)
            .with_capacity(2)
            .with_signal(SignalConfig::new("Speed", 0, 8, 0.0, 255.0).with_unit("km/h"));
        let adapter = layout.build().unwrap();

        let table = signal_table(&layout, &adapter);
        assert!(table.contains("[0] Speed"));
        assert!(table.contains("km/h"));
        assert!(table.contains("[1] <unset>"));
        assert!(table.contains("(empty)"));
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x00, 0xC0, 0xAB]), "00 C0 AB");
        assert_eq!(hex(&[]), "");
    }
}
