//! # Persisted State Tests
//!
//! Round trips through the current layout, the one-time upgrade from the
//! legacy layout, and rejection of truncated or corrupt records.

use pretty_assertions::assert_eq;
use tubesim_core::TubeUla;
use tubesim_core::common::StateError;
use tubesim_core::state::{
    self, CURRENT_BLOCK_LEN, LEGACY_BLOCK_LEN, STATE_VERSION, StateLayout,
};

/// A ULA with data in every kind of buffer and a few control bits set.
fn busy_ula() -> TubeUla {
    let mut ula = TubeUla::new();
    let _ = ula.host_write(0, 0x93);
    let _ = ula.host_read(5);
    for b in [0x10, 0x20, 0x30] {
        ula.parasite_write(1, b);
    }
    let _ = ula.host_read(1);
    ula.parasite_write(5, 0x55);
    let _ = ula.host_write(3, 0x66);
    let _ = ula.host_write(5, 0x77);
    ula.parasite_write(7, 0x88);
    ula.set_rom_overlay(true);
    ula
}

fn save(ula: &TubeUla) -> Vec<u8> {
    let mut bytes = Vec::new();
    ula.save_state(&mut bytes).unwrap();
    bytes
}

/// Converts a current-layout record into the legacy layout.
fn to_legacy(current: &[u8]) -> Vec<u8> {
    let mut legacy = vec![current[1]];
    legacy.extend_from_slice(&current[2..2 + LEGACY_BLOCK_LEN]);
    legacy
}

#[test]
fn test_current_layout_header_and_length() {
    let bytes = save(&busy_ula());
    assert_eq!(bytes.len(), 2 + CURRENT_BLOCK_LEN);
    assert_eq!(bytes[0], STATE_VERSION);
    assert_eq!(bytes[1], 1);
}

#[test]
fn test_current_layout_field_offsets() {
    let bytes = save(&busy_ula());
    let block = &bytes[2..];
    // ph1 holds the three bytes written; head has moved past the first.
    assert_eq!(&block[0..3], &[0x10, 0x20, 0x30]);
    assert_eq!(block[25], 0x55, "ph3[0]");
    assert_eq!(block[29], 0x66, "hp2");
    assert_eq!(block[30], 0x77, "hp3[0]");
    assert_eq!(block[41], 0x13, "r1stat");
    assert_eq!(&block[44..48], &3i32.to_le_bytes(), "ph1tail");
    assert_eq!(&block[48..52], &1i32.to_le_bytes(), "ph1head");
    assert_eq!(&block[52..56], &2i32.to_le_bytes(), "ph1count");
    assert_eq!(block[64], 0x77, "hpl");
    assert_eq!(block[65], 0x88, "phl");
}

#[test]
fn test_current_round_trip_restores_everything() {
    let original = busy_ula();
    let bytes = save(&original);

    let mut restored = TubeUla::new();
    let layout = restored.load_state(&mut bytes.as_slice()).unwrap();
    assert_eq!(layout, StateLayout::Current);
    assert_eq!(restored, original);
}

#[test]
fn test_legacy_layout_upgrade_is_idempotent() {
    let legacy = to_legacy(&save(&busy_ula()));
    assert_eq!(legacy.len(), 1 + LEGACY_BLOCK_LEN);

    let mut upgraded = TubeUla::new();
    let layout = upgraded.load_state(&mut legacy.as_slice()).unwrap();
    assert_eq!(layout, StateLayout::Legacy);
    assert!(upgraded.rom_overlay());
    assert_eq!(upgraded.r1_fifo_len(), 2);

    let resaved = save(&upgraded);
    let mut reloaded = TubeUla::new();
    let layout = reloaded.load_state(&mut resaved.as_slice()).unwrap();
    assert_eq!(layout, StateLayout::Current);
    assert_eq!(reloaded, upgraded);
}

#[test]
fn test_legacy_layout_keeps_live_latches() {
    let legacy = to_legacy(&save(&TubeUla::new()));
    let mut ula = TubeUla::new();
    ula.parasite_write(3, 0xAB);
    let _ = ula.host_read(3);

    let _ = ula.load_state(&mut legacy.as_slice()).unwrap();
    assert_eq!(ula.host_read(1), 0xAB);
}

#[test]
fn test_any_other_tag_is_legacy_overlay_flag() {
    let mut legacy = to_legacy(&save(&TubeUla::new()));
    legacy[0] = 0;
    let persisted = state::read_state(&mut legacy.as_slice()).unwrap();
    assert_eq!(persisted.layout, StateLayout::Legacy);
    assert!(!persisted.rom_overlay);
    assert_eq!(persisted.registers.latches, None);
}

#[test]
fn test_load_recomputes_interrupts() {
    let mut source = TubeUla::new();
    let _ = source.host_write(0, 0x81);
    source.parasite_write(7, 0x01);
    assert!(source.lines().host_irq);

    let mut target = TubeUla::new();
    let _ = target.load_state(&mut save(&source).as_slice()).unwrap();
    assert!(target.lines().host_irq);
}

#[test]
fn test_truncated_record_is_rejected() {
    let bytes = save(&busy_ula());
    let mut ula = TubeUla::new();
    let err = ula.load_state(&mut &bytes[..40]).unwrap_err();
    assert!(matches!(err, StateError::Io(_)));
    assert_eq!(ula, TubeUla::new());
}

#[test]
fn test_out_of_range_fifo_count_is_rejected() {
    let mut bytes = save(&busy_ula());
    bytes[2 + 52..2 + 56].copy_from_slice(&30i32.to_le_bytes());
    let mut ula = TubeUla::new();
    let err = ula.load_state(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(
        err,
        StateError::FieldRange {
            field: "ph1count",
            value: 30
        }
    ));
    assert_eq!(ula, TubeUla::new());
}

#[test]
fn test_negative_counter_is_rejected() {
    let mut bytes = save(&busy_ula());
    bytes[2 + 56..2 + 60].copy_from_slice(&(-1i32).to_le_bytes());
    let err = state::read_state(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(
        err,
        StateError::FieldRange {
            field: "ph3pos",
            value: -1
        }
    ));
}

#[test]
fn test_inconsistent_fifo_counters_are_rejected() {
    let mut bytes = save(&busy_ula());
    bytes[2 + 44..2 + 48].copy_from_slice(&7i32.to_le_bytes());
    let mut ula = TubeUla::new();
    let err = ula.load_state(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, StateError::FifoInconsistent { .. }));
}

#[test]
fn test_shift_position_past_capacity_is_rejected() {
    let mut bytes = save(&busy_ula());
    bytes[2 + 60..2 + 64].copy_from_slice(&3i32.to_le_bytes());
    let mut ula = TubeUla::new();
    let err = ula.load_state(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(
        err,
        StateError::FieldRange {
            field: "hp3pos",
            ..
        }
    ));
}
