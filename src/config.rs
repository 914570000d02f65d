//! TOML-based run configuration and preset definitions.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::aggregate::DEFAULT_DELIMITER;
use crate::entity::{Connection, Load, Phase, PhaseInfo, Transformer};
use crate::error::Result as SynthResult;
use crate::loadshape::{DEFAULT_NOISE_SCALE, Recurrence};
use crate::profiles::WeatherZone;

/// Strategy names accepted in `synthesis.strategy`.
pub const STRATEGIES: &[&str] = &["iqr_random", "pure_random"];

/// Top-level run configuration parsed from TOML.
///
/// Load from TOML with [`RunConfig::from_toml_file`] or use
/// [`RunConfig::demo`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Artifact destination and column naming.
    #[serde(default)]
    pub output: OutputConfig,
    /// Loadshape generation parameters shared by all circuits.
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    /// Circuits processed in order, each independently.
    #[serde(default)]
    pub circuits: Vec<CircuitConfig>,
}

/// Artifact destination and column naming.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving per-circuit artifacts.
    pub directory: PathBuf,
    /// Separator joining entity, side, and channel in column names.
    pub delimiter: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

/// Loadshape generation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthesisConfig {
    /// `"iqr_random"` or `"pure_random"`.
    pub strategy: String,
    /// `"daily"` or `"yearly"`.
    pub recurrence: String,
    /// Hours per sample (must be > 0).
    pub hour_interval: f64,
    /// Resample profile-based series to this many points.
    pub n_interpolate: Option<usize>,
    /// Noise standard deviation as a fraction of the profile IQR.
    pub noise_scale: f64,
    /// Series length for `pure_random`.
    pub pure_random_steps: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            strategy: "iqr_random".to_string(),
            recurrence: "yearly".to_string(),
            hour_interval: 1.0,
            n_interpolate: None,
            noise_scale: DEFAULT_NOISE_SCALE,
            pure_random_steps: 8760,
        }
    }
}

impl SynthesisConfig {
    /// Parsed recurrence.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SynthError::Configuration`] for an unknown name.
    pub fn recurrence(&self) -> SynthResult<Recurrence> {
        self.recurrence.parse()
    }
}

fn default_seed() -> u64 {
    42
}

fn default_zone() -> String {
    WeatherZone::SouthCentral.to_string()
}

/// One circuit: its entities, input files, and master seed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitConfig {
    /// Circuit name, used as the artifact file prefix.
    pub name: String,
    /// Master seed for the circuit's per-load seeds.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Profile CSV (required by `iqr_random`).
    #[serde(default)]
    pub profiles: Option<PathBuf>,
    /// Directory of monitor CSVs; without it the circuit is synthesized only.
    #[serde(default)]
    pub monitors: Option<PathBuf>,
    /// ERCOT weather zone of the circuit's profiles.
    #[serde(default = "default_zone")]
    pub zone: String,
    #[serde(default)]
    pub loads: Vec<LoadConfig>,
    #[serde(default)]
    pub transformers: Vec<TransformerConfig>,
}

impl CircuitConfig {
    /// Parsed weather zone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SynthError::Configuration`] for an unknown zone.
    pub fn zone(&self) -> SynthResult<WeatherZone> {
        self.zone.parse()
    }

    /// Builds the circuit's loads in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SynthError::Configuration`] for the first load whose
    /// phase or connection cannot be resolved.
    pub fn loads(&self) -> SynthResult<Vec<Load>> {
        self.loads.iter().map(LoadConfig::to_load).collect()
    }

    pub fn transformers(&self) -> Vec<Transformer> {
        self.transformers
            .iter()
            .map(|t| Transformer::new(t.name.clone()))
            .collect()
    }
}

fn default_phases() -> usize {
    1
}

fn default_conn() -> String {
    Connection::Wye.to_string()
}

/// A load declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    pub name: String,
    /// Bus and terminals, e.g. `"n12.1.2"`.
    #[serde(default)]
    pub bus1: String,
    /// Number of phases.
    #[serde(default = "default_phases")]
    pub phases: usize,
    /// `"wye"`/`"y"`/`"ln"` or `"delta"`/`"d"`/`"ll"`.
    #[serde(default = "default_conn")]
    pub conn: String,
    /// Nominal voltage (kV).
    #[serde(default)]
    pub kv: Option<f64>,
    /// Explicit phase name, overriding derivation from `bus1`.
    #[serde(default)]
    pub phase: Option<String>,
}

impl LoadConfig {
    /// Resolves phase and connection into a [`Load`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::SynthError::Configuration`] if the phase or
    /// connection is invalid.
    pub fn to_load(&self) -> SynthResult<Load> {
        let phase = match &self.phase {
            Some(name) => name.parse::<Phase>()?,
            None => Phase::from_bus(&self.bus1, self.phases)?,
        };
        let connection = self.conn.parse::<Connection>()?;
        let load = Load::new(
            self.name.clone(),
            PhaseInfo::new(phase, connection, self.phases),
        );
        Ok(match self.kv {
            Some(kv) => load.with_base_kv(kv),
            None => load,
        })
    }
}

/// A transformer monitored on both windings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformerConfig {
    pub name: String,
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"circuits[0].loads"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

fn load(name: &str, bus1: &str, phases: usize, conn: &str) -> LoadConfig {
    LoadConfig {
        name: name.to_string(),
        bus1: bus1.to_string(),
        phases,
        conn: conn.to_string(),
        kv: Some(if phases == 3 { 12.47 } else { 0.24 }),
        phase: None,
    }
}

impl RunConfig {
    /// Returns the demo run: one small circuit, pure-random daily loadshapes,
    /// no input files.
    pub fn demo() -> Self {
        Self {
            output: OutputConfig::default(),
            synthesis: SynthesisConfig {
                strategy: "pure_random".to_string(),
                recurrence: "daily".to_string(),
                pure_random_steps: 24,
                ..SynthesisConfig::default()
            },
            circuits: vec![CircuitConfig {
                name: "demo".to_string(),
                seed: default_seed(),
                profiles: None,
                monitors: None,
                zone: default_zone(),
                loads: vec![
                    load("house_1", "n1.1", 1, "wye"),
                    load("house_2", "n2.2.3", 1, "delta"),
                    load("shop_1", "n3.1.2", 2, "wye"),
                    load("plant_1", "n4", 3, "wye"),
                ],
                transformers: vec![TransformerConfig {
                    name: "sub_1".to_string(),
                }],
            }],
        }
    }

    /// Returns the demo circuit with a year of hourly loadshapes.
    pub fn demo_yearly() -> Self {
        let mut cfg = Self::demo();
        cfg.synthesis.recurrence = "yearly".to_string();
        cfg.synthesis.pure_random_steps = 8760;
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "demo_yearly"];

    /// Loads a run from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "demo_yearly" => Ok(Self::demo_yearly()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a run from a TOML file. Relative input paths are resolved
    /// against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            cfg.resolve_inputs(base);
        }
        Ok(cfg)
    }

    /// Parses a run from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Joins relative profile and monitor paths onto `base`.
    pub fn resolve_inputs(&mut self, base: &Path) {
        let resolve = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut().filter(|p| p.is_relative()) {
                *path = base.join(&*path);
            }
        };
        for circuit in &mut self.circuits {
            resolve(&mut circuit.profiles);
            resolve(&mut circuit.monitors);
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.output.delimiter.is_empty() {
            errors.push(ConfigError {
                field: "output.delimiter".into(),
                message: "must not be empty".into(),
            });
        }

        let s = &self.synthesis;
        if !STRATEGIES.contains(&s.strategy.as_str()) {
            errors.push(ConfigError {
                field: "synthesis.strategy".into(),
                message: format!(
                    "must be \"iqr_random\" or \"pure_random\", got \"{}\"",
                    s.strategy
                ),
            });
        }
        if s.recurrence().is_err() {
            errors.push(ConfigError {
                field: "synthesis.recurrence".into(),
                message: format!("must be \"daily\" or \"yearly\", got \"{}\"", s.recurrence),
            });
        }
        if s.hour_interval.is_nan() || s.hour_interval <= 0.0 {
            errors.push(ConfigError {
                field: "synthesis.hour_interval".into(),
                message: "must be > 0".into(),
            });
        }
        if s.n_interpolate.is_some_and(|n| n <= 1) {
            errors.push(ConfigError {
                field: "synthesis.n_interpolate".into(),
                message: "must be > 1".into(),
            });
        }
        if s.noise_scale.is_nan() || s.noise_scale < 0.0 {
            errors.push(ConfigError {
                field: "synthesis.noise_scale".into(),
                message: "must be >= 0".into(),
            });
        }
        if s.strategy == "pure_random" && s.pure_random_steps <= 1 {
            errors.push(ConfigError {
                field: "synthesis.pure_random_steps".into(),
                message: "must be > 1".into(),
            });
        }

        if self.circuits.is_empty() {
            errors.push(ConfigError {
                field: "circuits".into(),
                message: "at least one circuit is required".into(),
            });
        }

        let mut names = HashSet::new();
        for (i, c) in self.circuits.iter().enumerate() {
            let field = |name: &str| format!("circuits[{i}].{name}");
            if c.name.trim().is_empty() {
                errors.push(ConfigError {
                    field: field("name"),
                    message: "must not be empty".into(),
                });
            } else if !names.insert(c.name.as_str()) {
                errors.push(ConfigError {
                    field: field("name"),
                    message: format!("duplicate circuit name \"{}\"", c.name),
                });
            }
            if c.zone().is_err() {
                errors.push(ConfigError {
                    field: field("zone"),
                    message: format!("unknown weather zone \"{}\"", c.zone),
                });
            }
            if s.strategy == "iqr_random" && c.profiles.is_none() {
                errors.push(ConfigError {
                    field: field("profiles"),
                    message: "required by the iqr_random strategy".into(),
                });
            }
            if c.loads.is_empty() {
                errors.push(ConfigError {
                    field: field("loads"),
                    message: "at least one load is required".into(),
                });
            }

            let mut load_names = HashSet::new();
            for (j, l) in c.loads.iter().enumerate() {
                if !load_names.insert(l.name.as_str()) {
                    errors.push(ConfigError {
                        field: field(&format!("loads[{j}].name")),
                        message: format!("duplicate load name \"{}\"", l.name),
                    });
                }
                if let Err(e) = l.to_load() {
                    errors.push(ConfigError {
                        field: field(&format!("loads[{j}]")),
                        message: e.to_string(),
                    });
                }
            }

            let mut transformer_names = HashSet::new();
            for (j, t) in c.transformers.iter().enumerate() {
                if !transformer_names.insert(t.name.as_str()) {
                    errors.push(ConfigError {
                        field: field(&format!("transformers[{j}].name")),
                        message: format!("duplicate transformer name \"{}\"", t.name),
                    });
                }
            }
        }

        errors
    }
}
