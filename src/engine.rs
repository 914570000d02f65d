//! Boundary to the external power-flow engine.
//!
//! The engine is an explicit parameter: callers construct one and pass it to
//! [`crate::pipeline`]. Nothing here manages an engine session.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::entity::{Load, Transformer};
use crate::error::Result;
use crate::io::monitor::read_monitor_file;
use crate::loadshape::Loadshape;
use crate::monitor::{MonitorData, MonitorId};

/// Terminal monitored on a load.
pub const LOAD_TERMINAL: u32 = 1;
/// Transformer terminals monitored as primary and secondary.
pub const PRIMARY_TERMINAL: u32 = 1;
pub const SECONDARY_TERMINAL: u32 = 2;

/// Everything the engine needs for one solve.
#[derive(Debug, Clone)]
pub struct SimulationRequest<'a> {
    pub loads: &'a [Load],
    pub transformers: &'a [Transformer],
    pub loadshapes: &'a [Loadshape],
    pub monitors: Vec<MonitorId>,
}

impl<'a> SimulationRequest<'a> {
    /// Declares one monitor per load and two per transformer.
    pub fn new(
        loads: &'a [Load],
        transformers: &'a [Transformer],
        loadshapes: &'a [Loadshape],
    ) -> Self {
        let monitors = loads
            .iter()
            .map(|l| MonitorId::new(l.id.clone(), LOAD_TERMINAL))
            .chain(transformers.iter().flat_map(|t| {
                [
                    MonitorId::new(t.id.clone(), PRIMARY_TERMINAL),
                    MonitorId::new(t.id.clone(), SECONDARY_TERMINAL),
                ]
            }))
            .collect();
        Self {
            loads,
            transformers,
            loadshapes,
            monitors,
        }
    }
}

/// A batch power-flow solver.
pub trait SimulationEngine {
    /// Solves the request and returns the samples of every declared monitor.
    ///
    /// # Errors
    ///
    /// Implementations return [`crate::SynthError`] when the solve fails or a
    /// monitor cannot be read.
    fn simulate(
        &mut self,
        request: &SimulationRequest<'_>,
    ) -> Result<IndexMap<MonitorId, MonitorData>>;
}

/// Replays monitor exports from a directory of `<element_name>.csv` files.
#[derive(Debug, Clone)]
pub struct MonitorDirectory {
    root: PathBuf,
}

impl MonitorDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, monitor: &MonitorId) -> PathBuf {
        self.root.join(format!("{}.csv", monitor.element_name()))
    }
}

impl SimulationEngine for MonitorDirectory {
    fn simulate(
        &mut self,
        request: &SimulationRequest<'_>,
    ) -> Result<IndexMap<MonitorId, MonitorData>> {
        let mut out = IndexMap::with_capacity(request.monitors.len());
        for monitor in &request.monitors {
            let path = self.path_for(monitor);
            let data = read_monitor_file(&path)?;
            debug!(%monitor, samples = data.sample_count(), "replayed monitor");
            out.insert(monitor.clone(), data);
        }
        Ok(out)
    }
}
