//! Per-circuit orchestration: seeds, loadshapes, simulation, aggregation.
//!
//! A circuit either produces a complete [`CircuitDataset`] or an error; a
//! failed circuit never reaches [`crate::io::export`]. [`run_batch`] isolates
//! circuits from one another.

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::aggregate::{
    ChannelMap, MeasurementTable, PHASE_VOLTAGE_CHANNELS, PairedSided, SingleSided,
    aggregate_paired_sided, aggregate_single_sided,
};
use crate::config::{CircuitConfig, RunConfig, SynthesisConfig};
use crate::engine::{
    LOAD_TERMINAL, MonitorDirectory, PRIMARY_TERMINAL, SECONDARY_TERMINAL, SimulationEngine,
    SimulationRequest,
};
use crate::entity::{EntityId, Load, Transformer};
use crate::error::{Result, SynthError};
use crate::io::export::{ArtifactPaths, write_circuit_dataset};
use crate::io::profiles::read_profiles_file;
use crate::labels::{LabelRow, build_labels};
use crate::loadshape::{IqrRandom, Loadshape, LoadshapeStrategy, PureRandom, Strategy};
use crate::monitor::{MonitorData, MonitorId};
use crate::seeds::{EntitySeeds, SeedAllocator};
use crate::selector::PhaseProfileMapping;

/// Entities and master seed of one circuit.
#[derive(Debug, Clone)]
pub struct Circuit {
    pub name: String,
    pub seed: u64,
    pub loads: Vec<Load>,
    pub transformers: Vec<Transformer>,
}

impl Circuit {
    /// Builds the circuit's entities from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Configuration`] if a load's phase or connection
    /// is invalid.
    pub fn from_config(cfg: &CircuitConfig) -> Result<Self> {
        Ok(Self {
            name: cfg.name.clone(),
            seed: cfg.seed,
            loads: cfg.loads()?,
            transformers: cfg.transformers(),
        })
    }
}

/// Aggregated simulation output of one circuit.
#[derive(Debug, Clone)]
pub struct Measurements {
    pub loads: MeasurementTable,
    pub channel_map: ChannelMap,
    /// `None` when the circuit has no transformers.
    pub transformers: Option<MeasurementTable>,
}

/// Everything produced for one circuit, ready to export.
#[derive(Debug, Clone)]
pub struct CircuitDataset {
    pub circuit: String,
    pub loadshapes: Vec<Loadshape>,
    pub labels: Vec<LabelRow>,
    /// `None` for synthesize-only runs.
    pub measurements: Option<Measurements>,
}

/// Builds the configured strategy, reading the circuit's profile source
/// when the strategy needs one.
///
/// # Errors
///
/// Returns [`SynthError::Configuration`] for an unknown strategy, zone, or
/// recurrence, or a missing profile path, and any error from reading the
/// profile file.
pub fn build_strategy(synthesis: &SynthesisConfig, circuit: &CircuitConfig) -> Result<Strategy> {
    let recurrence = synthesis.recurrence()?;
    match synthesis.strategy.as_str() {
        "iqr_random" => {
            let path = circuit.profiles.as_deref().ok_or_else(|| {
                SynthError::configuration(format!(
                    "circuit `{}` needs a profile source for iqr_random",
                    circuit.name
                ))
            })?;
            let profiles = read_profiles_file(path)?;
            let mapping = PhaseProfileMapping::ercot(circuit.zone()?);
            Ok(Strategy::IqrRandom(IqrRandom::new(
                profiles,
                mapping,
                synthesis.noise_scale,
                recurrence,
                synthesis.hour_interval,
                synthesis.n_interpolate,
            )?))
        }
        "pure_random" => Ok(Strategy::PureRandom(PureRandom::new(
            synthesis.pure_random_steps,
            recurrence,
            synthesis.hour_interval,
        ))),
        other => Err(SynthError::configuration(format!(
            "unknown strategy `{other}`"
        ))),
    }
}

/// Generates one loadshape per seeded load, sequentially and in load order.
///
/// # Errors
///
/// Returns the first error raised by `strategy`.
pub fn generate_loadshapes(
    seeds: &EntitySeeds<'_, Load>,
    strategy: &impl LoadshapeStrategy,
) -> Result<Vec<Loadshape>> {
    seeds
        .iter()
        .map(|(load, seed)| strategy.generate(load, seed))
        .collect()
}

/// Synthesizes loadshapes and labels from externally allocated seeds.
///
/// # Errors
///
/// Returns [`SynthError::Reproducibility`] if `seeds` does not have one seed
/// per load, or any generation error.
pub fn synthesize_with_seeds(
    circuit: &Circuit,
    seeds: Vec<u32>,
    strategy: &impl LoadshapeStrategy,
) -> Result<CircuitDataset> {
    let seeds = EntitySeeds::new(&circuit.loads, seeds)?;
    let loadshapes = generate_loadshapes(&seeds, strategy)?;
    let labels = build_labels(&circuit.loads, &loadshapes)?;
    info!(
        circuit = %circuit.name,
        strategy = strategy.name(),
        loadshapes = loadshapes.len(),
        "synthesized loadshapes"
    );
    Ok(CircuitDataset {
        circuit: circuit.name.clone(),
        loadshapes,
        labels,
        measurements: None,
    })
}

/// Allocates seeds from the circuit's master seed and synthesizes.
///
/// # Errors
///
/// Returns any generation error.
pub fn synthesize(circuit: &Circuit, strategy: &impl LoadshapeStrategy) -> Result<CircuitDataset> {
    let seeds = SeedAllocator::new(circuit.seed).allocate(circuit.loads.len());
    info!(
        circuit = %circuit.name,
        master_seed = circuit.seed,
        count = seeds.len(),
        "allocated seeds"
    );
    synthesize_with_seeds(circuit, seeds, strategy)
}

/// Synthesizes, simulates through `engine`, and aggregates one circuit.
///
/// # Errors
///
/// Returns any synthesis, engine, or aggregation error; no partial dataset
/// is returned.
pub fn run_circuit(
    circuit: &Circuit,
    strategy: &impl LoadshapeStrategy,
    engine: &mut impl SimulationEngine,
) -> Result<CircuitDataset> {
    let mut dataset = synthesize(circuit, strategy)?;
    let request =
        SimulationRequest::new(&circuit.loads, &circuit.transformers, &dataset.loadshapes);
    let outputs = engine.simulate(&request)?;
    dataset.measurements = Some(aggregate_monitors(
        &circuit.loads,
        &circuit.transformers,
        &outputs,
    )?);
    Ok(dataset)
}

fn monitor_output<'a>(
    outputs: &'a IndexMap<MonitorId, MonitorData>,
    entity: &EntityId,
    terminal: u32,
) -> Result<&'a MonitorData> {
    let id = MonitorId::new(entity.clone(), terminal);
    outputs
        .get(&id)
        .ok_or_else(|| SynthError::data(format!("engine returned no output for {id}")))
}

/// Aggregates load monitors single-sided and transformer monitors
/// paired-sided, in entity order.
///
/// # Errors
///
/// Returns [`SynthError::Data`] if a monitor or channel is missing.
pub fn aggregate_monitors(
    loads: &[Load],
    transformers: &[Transformer],
    outputs: &IndexMap<MonitorId, MonitorData>,
) -> Result<Measurements> {
    let single = loads
        .iter()
        .map(|load| -> Result<SingleSided<'_>> {
            Ok(SingleSided {
                entity: &load.id,
                meter_count: load.meter_count(),
                monitor: monitor_output(outputs, &load.id, LOAD_TERMINAL)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let (table, channel_map) = aggregate_single_sided(&single, &PHASE_VOLTAGE_CHANNELS)?;

    let transformer_table = if transformers.is_empty() {
        None
    } else {
        let paired = transformers
            .iter()
            .map(|t| -> Result<PairedSided<'_>> {
                Ok(PairedSided {
                    entity: &t.id,
                    primary: monitor_output(outputs, &t.id, PRIMARY_TERMINAL)?,
                    secondary: monitor_output(outputs, &t.id, SECONDARY_TERMINAL)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Some(aggregate_paired_sided(&paired, &PHASE_VOLTAGE_CHANNELS)?)
    };

    Ok(Measurements {
        loads: table,
        channel_map,
        transformers: transformer_table,
    })
}

/// Result of one circuit in a batch.
#[derive(Debug)]
pub struct CircuitOutcome {
    pub circuit: String,
    pub result: Result<ArtifactPaths>,
}

impl CircuitOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

fn process_circuit(
    cfg: &RunConfig,
    circuit_cfg: &CircuitConfig,
    synthesize_only: bool,
) -> Result<ArtifactPaths> {
    let circuit = Circuit::from_config(circuit_cfg)?;
    let strategy = build_strategy(&cfg.synthesis, circuit_cfg)?;
    let dataset = match circuit_cfg.monitors.as_deref() {
        Some(dir) if !synthesize_only => {
            let mut engine = MonitorDirectory::new(dir);
            run_circuit(&circuit, &strategy, &mut engine)?
        }
        _ => synthesize(&circuit, &strategy)?,
    };
    write_circuit_dataset(&dataset, &cfg.output.directory, &cfg.output.delimiter)
}

/// Processes every configured circuit in order.
///
/// A failing circuit is logged and recorded; later circuits still run.
/// Circuits without a monitor directory are synthesized only.
pub fn run_batch(cfg: &RunConfig, synthesize_only: bool) -> Vec<CircuitOutcome> {
    cfg.circuits
        .iter()
        .map(|circuit_cfg| {
            let result = process_circuit(cfg, circuit_cfg, synthesize_only);
            match &result {
                Ok(paths) => info!(
                    circuit = %circuit_cfg.name,
                    labels = %paths.labels.display(),
                    "circuit complete"
                ),
                Err(e) => warn!(circuit = %circuit_cfg.name, error = %e, "circuit failed"),
            }
            CircuitOutcome {
                circuit: circuit_cfg.name.clone(),
                result,
            }
        })
        .collect()
}
