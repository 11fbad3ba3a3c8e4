use std::cell::RefCell;
use std::rc::Rc;

use tubesim_core::config::{TubeSection, TubeSections, TubeSettings};
use tubesim_core::sim::{BootRomLoader, TubeSession};
use tubesim_core::TubeConfigs;

use crate::common::mocks::coprocessor::{CallLog, CpuCall, mock_catalog};
use crate::common::mocks::sink::{Edge, EdgeLog, RecordingSink};

/// Builds a single-tube list for a CPU type with no boot ROM.
pub fn single_tube(cpu: &str, speed: u32) -> TubeConfigs {
    let settings = TubeSettings {
        tubes: TubeSections::Listed(vec![TubeSection {
            name: Some(format!("Test {cpu}")),
            cpu: cpu.to_string(),
            speed,
            ..TubeSection::default()
        }]),
        ..TubeSettings::default()
    };
    TubeConfigs::load(&settings).unwrap()
}

/// A session with a mock coprocessor attached and both logs exposed.
pub struct TestContext {
    pub session: TubeSession,
    pub calls: CallLog,
    pub edges: EdgeLog,
}

impl TestContext {
    /// Creates a detached session wired to recording mocks.
    pub fn detached() -> Self {
        let edges: EdgeLog = Rc::new(RefCell::new(Vec::new()));
        Self {
            session: TubeSession::new(Box::new(RecordingSink::new(Rc::clone(&edges)))),
            calls: Rc::new(RefCell::new(Vec::new())),
            edges,
        }
    }

    /// Creates a session with a ROM-less tube of the given CPU type attached.
    pub fn attached(cpu: &str) -> Self {
        let mut tc = Self::detached();
        let configs = single_tube(cpu, 2);
        let catalog = mock_catalog(&tc.calls, false);
        let loader = BootRomLoader::new(Vec::<std::path::PathBuf>::new());
        tc.session
            .attach(Some(0), &configs, &catalog, &loader)
            .unwrap();
        tc.calls.borrow_mut().clear();
        tc
    }

    /// Returns and clears the recorded edges.
    pub fn take_edges(&self) -> Vec<Edge> {
        self.edges.borrow_mut().drain(..).collect()
    }

    /// Returns the number of CPU resets recorded so far.
    pub fn reset_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| **call == CpuCall::Reset)
            .count()
    }
}
