//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use loadshape_dataset::Result;
use loadshape_dataset::engine::{SimulationEngine, SimulationRequest};
use loadshape_dataset::entity::{Connection, EntityKind, Load, Phase, PhaseInfo, Transformer};
use loadshape_dataset::loadshape::{IqrRandom, Recurrence};
use loadshape_dataset::monitor::{MonitorData, MonitorId};
use loadshape_dataset::pipeline::Circuit;
use loadshape_dataset::profiles::{ProfileId, ProfileRepository, WeatherZone};
use loadshape_dataset::selector::PhaseProfileMapping;

/// Channels a monitor in voltage/current mode reports.
pub const FULL_CHANNELS: [&str; 4] = ["hours", "V1", "V2", "V3"];

/// Deterministic stand-in for the power-flow engine.
///
/// Each load's voltage sags with its loadshape; transformer sides report a
/// flat nominal voltage. `channels` controls which channels are reported.
pub struct FakeEngine {
    pub channels: Vec<String>,
    pub calls: usize,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::with_channels(&FULL_CHANNELS)
    }

    pub fn with_channels(channels: &[&str]) -> Self {
        Self {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            calls: 0,
        }
    }
}

impl SimulationEngine for FakeEngine {
    fn simulate(
        &mut self,
        request: &SimulationRequest<'_>,
    ) -> Result<IndexMap<MonitorId, MonitorData>> {
        self.calls += 1;
        let steps = request.loadshapes.iter().map(|s| s.len()).max().unwrap_or(0);
        let mut out = IndexMap::new();
        for monitor in &request.monitors {
            let shape = request
                .loadshapes
                .iter()
                .find(|s| s.entity == monitor.entity)
                .map(|s| s.values.clone())
                .unwrap_or_else(|| vec![0.0; steps]);
            let nominal = match monitor.entity.kind {
                EntityKind::Load => 120.0,
                EntityKind::Transformer if monitor.terminal == 1 => 7200.0,
                EntityKind::Transformer => 240.0,
            };
            let rows = (0..steps)
                .map(|t| {
                    self.channels
                        .iter()
                        .enumerate()
                        .map(|(c, name)| {
                            if name == "hours" {
                                t as f64
                            } else {
                                nominal * (1.0 - 0.05 * shape.get(t).copied().unwrap_or(0.0))
                                    + c as f64 * 0.01
                            }
                        })
                        .collect()
                })
                .collect();
            out.insert(monitor.clone(), MonitorData::new(self.channels.clone(), rows)?);
        }
        Ok(out)
    }
}

/// Smooth synthetic daily profile, offset per column so profiles differ.
pub fn profile_samples(offset: usize, len: usize) -> Vec<f64> {
    (0..len)
        .map(|t| {
            let x = (t + offset) as f64 / 24.0 * std::f64::consts::TAU;
            3.0 + x.sin() + 0.3 * (2.0 * x).cos() + offset as f64 * 0.1
        })
        .collect()
}

/// Profiles for every pooled ERCOT class in `zone`.
pub fn synthetic_profiles(zone: WeatherZone, len: usize) -> ProfileRepository {
    let columns: Vec<(ProfileId, Vec<f64>)> = PhaseProfileMapping::ercot(zone)
        .profile_ids()
        .enumerate()
        .map(|(i, id)| (*id, profile_samples(i, len)))
        .collect();
    ProfileRepository::from_columns(columns).expect("unique profile columns")
}

/// Writes the same profiles as [`synthetic_profiles`] as a profile CSV.
pub fn write_profiles_csv(path: &Path, zone: WeatherZone, len: usize) {
    let ids: Vec<ProfileId> = PhaseProfileMapping::ercot(zone).profile_ids().copied().collect();
    let mut text = String::from("hour");
    for id in &ids {
        text.push(',');
        text.push_str(&id.to_string());
    }
    text.push('\n');
    let columns: Vec<Vec<f64>> = (0..ids.len()).map(|i| profile_samples(i, len)).collect();
    for t in 0..len {
        text.push_str(&t.to_string());
        for column in &columns {
            text.push(',');
            text.push_str(&column[t].to_string());
        }
        text.push('\n');
    }
    fs::write(path, text).expect("write profile csv");
}

/// IQR-random strategy over [`synthetic_profiles`].
pub fn iqr_strategy(zone: WeatherZone, len: usize) -> IqrRandom {
    let mapping = PhaseProfileMapping::ercot(zone);
    IqrRandom::new(
        synthetic_profiles(zone, len),
        mapping,
        0.1,
        Recurrence::Yearly,
        1.0,
        None,
    )
    .expect("every pooled profile is present")
}

/// Four loads covering every pool plus one transformer.
pub fn small_circuit(seed: u64) -> Circuit {
    Circuit {
        name: "ckt_test".to_string(),
        seed,
        loads: vec![
            Load::new("house_1", PhaseInfo::new(Phase::A, Connection::Wye, 1)),
            Load::new("house_2", PhaseInfo::new(Phase::BC, Connection::Delta, 1)),
            Load::new("shop_1", PhaseInfo::new(Phase::AB, Connection::Wye, 2)).with_base_kv(0.208),
            Load::new("plant_1", PhaseInfo::new(Phase::ABC, Connection::Wye, 3))
                .with_base_kv(12.47),
        ],
        transformers: vec![Transformer::new("sub_1")],
    }
}

/// Fresh empty directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "loadshape-dataset-{name}-{}",
        std::process::id()
    ));
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
