//! # Session Tests
//!
//! Attach and its failure paths, the idle bus with no coprocessor, interrupt
//! edge forwarding, resets and state through the session.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use tempfile::TempDir;
use tubesim_core::TubeConfigs;
use tubesim_core::common::{AttachError, ConfigError, LoadError};
use tubesim_core::coprocessor::CpuModel;
use tubesim_core::sim::{BootRomLoader, IDLE_BUS, TubeSession};
use tubesim_core::state::StateLayout;
use tubesim_core::ula::InterruptDelivery;
use tubesim_core::TubeUla;

use crate::common::harness::{TestContext, single_tube};
use crate::common::logging::{capture_logs, count_level};
use crate::common::mocks::coprocessor::{CallLog, CpuCall, Resets, catalog_expecting, mock_catalog};
use crate::common::mocks::sink::Edge;

fn new_calls() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn test_detached_bus_is_idle() {
    let mut tc = TestContext::detached();
    for addr in 0..8 {
        assert_eq!(tc.session.host_read(addr), IDLE_BUS);
    }
    tc.session.host_write(0, 0x81);
    tc.session.host_write(3, 0x12);
    assert_eq!(*tc.session.ula(), TubeUla::new());
    assert_eq!(tc.session.parasite_cycles(100), 0);
    assert!(tc.take_edges().is_empty());
}

#[test]
fn test_attach_without_boot_rom() {
    let tc = TestContext::detached();
    let mut session = tc.session;
    let configs = single_tube("32016", 8);
    let catalog = mock_catalog(&tc.calls, false);
    let loader = BootRomLoader::new(Vec::<std::path::PathBuf>::new());

    let ((), logs) = capture_logs(|| session.attach(Some(0), &configs, &catalog, &loader).unwrap());
    assert!(session.is_attached());
    assert_eq!(session.attached_index(), Some(0));
    assert_eq!(session.attached_model(), Some(CpuModel::Ns32016));
    assert_eq!(*tc.calls.borrow(), vec![CpuCall::Init(CpuModel::Ns32016, None)]);
    assert!((session.multiplier() - 4.0).abs() < f64::EPSILON);
    assert_eq!(count_level(&logs, "INFO"), 1);
}

#[test]
fn test_attach_with_boot_rom_from_search_dir() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Z80_200.rom"), vec![0xC3; 0x1000]).unwrap();
    let configs = TubeConfigs::builtin();
    let calls = new_calls();
    let catalog = mock_catalog(&calls, false);
    let loader = BootRomLoader::new([dir.path()]);

    let mut session = TubeSession::default();
    session.set_speed_preset(1).unwrap();
    session.attach(Some(8), &configs, &catalog, &loader).unwrap();
    assert_eq!(session.attached_config().unwrap().name, "Z80 ROM 2.00");
    assert_eq!(*calls.borrow(), vec![CpuCall::Init(CpuModel::Z80, Some(0x1000))]);
    assert!((session.multiplier() - 6.0).abs() < f64::EPSILON);
    assert_eq!(session.parasite_cycles(2), 12);
}

#[test]
fn test_missing_boot_rom_leaves_session_unattached() {
    let dir = TempDir::new().unwrap();
    let configs = TubeConfigs::builtin();
    let calls = new_calls();
    let catalog = mock_catalog(&calls, false);
    let loader = BootRomLoader::new([dir.path()]);
    let mut session = TubeSession::default();

    let (result, logs) = capture_logs(|| session.attach(Some(6), &configs, &catalog, &loader));
    assert!(matches!(
        result,
        Err(AttachError::Load(LoadError::NotFound { .. }))
    ));
    assert!(!session.is_attached());
    assert!(calls.borrow().is_empty(), "no coprocessor is started");
    assert_eq!(count_level(&logs, "ERROR"), 1);
    assert!(logs.contains("boot rom 6502Tube for tube 6502 External not found"));
    assert_eq!(session.host_read(0), IDLE_BUS);
}

#[test]
fn test_init_failure_leaves_session_unattached() {
    let configs = single_tube("ARM2", 4);
    let calls = new_calls();
    let catalog = mock_catalog(&calls, true);
    let loader = BootRomLoader::new(Vec::<std::path::PathBuf>::new());
    let mut session = TubeSession::default();

    let (result, logs) = capture_logs(|| session.attach(Some(0), &configs, &catalog, &loader));
    assert!(matches!(result, Err(AttachError::Load(LoadError::Init { .. }))));
    assert!(!session.is_attached());
    assert_eq!(count_level(&logs, "ERROR"), 1);
}

#[test]
fn test_bad_selection_leaves_session_unattached() {
    let configs = single_tube("Z80", 6);
    let calls = new_calls();
    let catalog = mock_catalog(&calls, false);
    let loader = BootRomLoader::new(Vec::<std::path::PathBuf>::new());
    let mut session = TubeSession::default();

    let (result, logs) = capture_logs(|| session.attach(Some(4), &configs, &catalog, &loader));
    assert!(matches!(
        result,
        Err(AttachError::Config(ConfigError::SelectionOutOfRange { index: 4, count: 1 }))
    ));
    assert_eq!(count_level(&logs, "WARN"), 1);
    assert!(!session.is_attached());

    session.attach(None, &configs, &catalog, &loader).unwrap();
    assert!(!session.is_attached());
}

#[test]
fn test_detach_returns_bus_to_idle() {
    let mut tc = TestContext::attached("6809");
    tc.session.detach();
    assert!(!tc.session.is_attached());
    assert_eq!(tc.session.host_read(1), IDLE_BUS);
}

#[test]
fn test_host_irq_edge_on_enable_with_pending_data() {
    let mut tc = TestContext::attached("Z80");
    tc.session.parasite_write(7, 0x42);
    assert!(tc.take_edges().is_empty());

    tc.session.host_write(0, 0x81);
    assert_eq!(tc.take_edges(), vec![Edge::HostIrq(true)]);

    // Still asserted: nothing more is delivered.
    tc.session.host_write(0, 0x81);
    assert!(tc.take_edges().is_empty());

    assert_eq!(tc.session.host_read(7), 0x42);
    assert_eq!(tc.take_edges(), vec![Edge::HostIrq(false)]);
}

#[test]
fn test_parasite_irq_uses_family_delivery() {
    let mut tc = TestContext::attached("PDP11");
    tc.session.host_write(0, 0x82);
    tc.session.host_write(1, 0x01);
    tc.session.host_write(1, 0x02);
    let irq = InterruptDelivery::Vectored {
        vector: 0x84,
        priority: 6,
    };
    assert_eq!(tc.take_edges(), vec![Edge::ParasiteIrq(irq, true)]);

    let _ = tc.session.parasite_read(1);
    assert_eq!(tc.take_edges(), vec![Edge::ParasiteIrq(irq, false)]);
}

#[test]
fn test_parasite_nmi_uses_family_delivery() {
    let mut tc = TestContext::attached("68000");
    tc.session.host_write(0, 0x88);
    tc.session.host_write(5, 0x99);
    assert_eq!(
        tc.take_edges(),
        vec![Edge::ParasiteNmi(InterruptDelivery::Autovector { level: 5 }, true)]
    );
}

#[test]
fn test_detach_releases_asserted_lines() {
    let mut tc = TestContext::attached("Sprow ARM");
    tc.session.host_write(0, 0x84);
    tc.session.host_write(7, 0x01);
    assert_eq!(
        tc.take_edges(),
        vec![Edge::ParasiteIrq(InterruptDelivery::Numbered(1), true)]
    );
    tc.session.detach();
    assert_eq!(
        tc.take_edges(),
        vec![Edge::ParasiteIrq(InterruptDelivery::Numbered(1), false)]
    );
}

#[test]
fn test_reset_hold_release_resets_cpu_once() {
    let mut tc = TestContext::attached("Z80");
    tc.session.host_write(0, 0x20);
    assert_eq!(tc.reset_count(), 0, "flag was already clear");

    tc.session.host_write(0, 0xA0);
    assert_eq!(tc.reset_count(), 0);
    tc.session.host_write(0, 0x20);
    assert_eq!(tc.reset_count(), 1);
    tc.session.host_write(0, 0x20);
    assert_eq!(tc.reset_count(), 1);
}

#[test]
fn test_reset_hold_cycle_expects_exactly_one_reset() {
    let calls = new_calls();
    let catalog = catalog_expecting(&calls, false, Resets::Exactly(1));
    let loader = BootRomLoader::new(Vec::<std::path::PathBuf>::new());
    let mut session = TubeSession::default();
    session
        .attach(Some(0), &single_tube("PDP11", 2), &catalog, &loader)
        .unwrap();

    session.host_write(0, 0x20);
    session.host_write(0, 0xA0);
    session.host_write(0, 0xA0);
    session.host_write(0, 0x20);
    session.host_write(0, 0x20);
    // Dropping the coprocessor checks the reset count.
    session.detach();
}

#[test]
fn test_reset_hold_release_keeps_ula_state() {
    let mut tc = TestContext::attached("Z80");
    tc.session.host_write(0, 0xA0);
    tc.session.parasite_write(1, 0x33);
    tc.session.host_write(0, 0x20);
    assert_eq!(tc.reset_count(), 1);
    assert_eq!(tc.session.ula().r1_fifo_len(), 1);
}

#[test]
fn test_machine_reset_resets_cpu_then_ula() {
    let mut tc = TestContext::attached("80186");
    tc.session.host_write(0, 0x9F);
    tc.session.parasite_write(1, 0x01);
    tc.session.reset();
    assert_eq!(*tc.calls.borrow(), vec![CpuCall::Reset]);
    assert_eq!(*tc.session.ula(), {
        let mut fresh = TubeUla::new();
        let _ = fresh.host_write(0, 0x9F);
        fresh.parasite_write(1, 0x01);
        fresh.reset();
        fresh
    });
}

#[test]
fn test_6502_reset_pages_rom_in_until_status_read() {
    let mut tc = TestContext::attached("6502");
    assert!(tc.session.rom_overlay(), "attach pages the boot ROM in");
    let _ = tc.session.parasite_read(0);
    assert!(!tc.session.rom_overlay());
    tc.session.reset();
    assert!(tc.session.rom_overlay());
    let _ = tc.session.parasite_read(2);
    assert!(tc.session.rom_overlay());
    let _ = tc.session.parasite_read(0);
    assert!(!tc.session.rom_overlay());

    let mut other = TestContext::attached("Z80");
    other.session.reset();
    assert!(!other.session.rom_overlay());
}

#[test]
fn test_state_round_trip_through_session() {
    let mut tc = TestContext::attached("6809");
    tc.session.host_write(0, 0x82);
    tc.session.host_write(1, 0x5A);
    tc.session.set_rom_overlay(true);
    let mut saved = Vec::new();
    tc.session.save_state(&mut saved).unwrap();

    let mut other = TestContext::attached("6809");
    let layout = other.session.load_state(&mut saved.as_slice()).unwrap();
    assert_eq!(layout, StateLayout::Current);
    assert_eq!(other.session.ula(), tc.session.ula());
    assert_eq!(
        other.take_edges(),
        vec![Edge::ParasiteIrq(InterruptDelivery::Combined { mask: 0x01 }, true)]
    );
    assert_eq!(other.session.parasite_read(1), 0x5A);
}

#[test]
fn test_debugger_passthrough() {
    let mut tc = TestContext::attached("65816");
    let debug = tc.session.debugger().unwrap();
    assert_eq!(debug.cpu_name(), "mock");
    debug.set_register(3, 0x8000);
    assert_eq!(debug.register(3), 0x8000);
    debug.write_memory(0x10, 0xEA);
    assert_eq!(debug.read_memory(0x10), 0xEA);

    tc.session.detach();
    assert!(tc.session.debugger().is_none());
}

#[test]
fn test_attach_sets_rom_overlay_per_family() {
    let tc = TestContext::detached();
    let mut session = tc.session;
    let catalog = mock_catalog(&tc.calls, false);
    let loader = BootRomLoader::new(Vec::<std::path::PathBuf>::new());

    session
        .attach(Some(0), &single_tube("6502", 4), &catalog, &loader)
        .unwrap();
    assert!(session.rom_overlay());

    session
        .attach(Some(0), &single_tube("Z80", 6), &catalog, &loader)
        .unwrap();
    assert!(!session.rom_overlay(), "overlay does not leak into the next tube");

    session
        .attach(Some(0), &single_tube("6502 Turbo", 4), &catalog, &loader)
        .unwrap();
    assert!(session.rom_overlay());
}
