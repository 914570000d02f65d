//! Structured identity and phase metadata for circuit entities.
//!
//! Identity and phase information are separate structs composed into
//! [`Load`]; string forms such as `load.house_12` are produced only when
//! writing artifacts.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, SynthError};

/// The class of a circuit element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Load,
    Transformer,
}

impl EntityKind {
    /// Lowercase class name used in object names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Transformer => "transformer",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "load" => Ok(Self::Load),
            "transformer" => Ok(Self::Transformer),
            other => Err(SynthError::data(format!("unknown entity kind `{other}`"))),
        }
    }
}

/// Entity identity: kind plus element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityId {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn load(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Load, name)
    }

    pub fn transformer(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Transformer, name)
    }

    /// Full object name, e.g. `load.house_12`.
    pub fn object_name(&self) -> String {
        format!("{}.{}", self.kind, self.name)
    }

    /// Parses an object name of the form `<kind>.<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Data`] if there is no `.` separator, the kind is
    /// unknown, or the element name is empty.
    pub fn parse_object_name(s: &str) -> Result<Self> {
        let (kind, name) = s.split_once('.').ok_or_else(|| {
            SynthError::data(format!("`{s}` is not a `<kind>.<name>` object name"))
        })?;
        if name.is_empty() {
            return Err(SynthError::data(format!("`{s}` has an empty element name")));
        }
        Ok(Self::new(kind.parse()?, name))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// Phase configuration of a single-terminal entity.
///
/// Line-to-line connections (`AB`, `AC`, `BC`) are single-phase in the
/// engine's sense but are metered on two channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    A,
    B,
    C,
    AB,
    AC,
    BC,
    ABC,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::A,
        Phase::B,
        Phase::C,
        Phase::AB,
        Phase::AC,
        Phase::BC,
        Phase::ABC,
    ];

    /// Stable numeric code written to label tables.
    pub fn value(&self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::AB => 3,
            Self::AC => 4,
            Self::BC => 5,
            Self::ABC => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::AB => "AB",
            Self::AC => "AC",
            Self::BC => "BC",
            Self::ABC => "ABC",
        }
    }

    /// Number of monitor channels recorded for this phase configuration.
    pub fn meter_count(&self) -> usize {
        match self {
            Self::A | Self::B | Self::C => 1,
            Self::AB | Self::AC | Self::BC => 2,
            Self::ABC => 3,
        }
    }

    fn terminals(&self) -> &'static [u8] {
        match self {
            Self::A => &[1],
            Self::B => &[2],
            Self::C => &[3],
            Self::AB => &[1, 2],
            Self::AC => &[1, 3],
            Self::BC => &[2, 3],
            Self::ABC => &[1, 2, 3],
        }
    }

    /// Derives the phase from a `bus1` specification and the phase count.
    ///
    /// Three-phase entities are always [`Phase::ABC`]. Otherwise the terminal
    /// numbers after the bus name (`"b7.1.3"` gives `{1, 3}`) are matched as an
    /// unordered set.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Configuration`] if a terminal is not a number or
    /// the terminal set does not name a known phase configuration.
    pub fn from_bus(bus1: &str, phase_count: usize) -> Result<Self> {
        if phase_count == 3 {
            return Ok(Self::ABC);
        }

        let terminals = bus1
            .split('.')
            .skip(1)
            .map(|t| {
                t.trim().parse::<u8>().map_err(|_| {
                    SynthError::configuration(format!(
                        "bus `{bus1}` has non-numeric terminal `{t}`"
                    ))
                })
            })
            .collect::<Result<BTreeSet<u8>>>()?;

        Self::ALL
            .into_iter()
            .filter(|p| *p != Self::ABC)
            .find(|p| p.terminals().iter().copied().collect::<BTreeSet<_>>() == terminals)
            .ok_or_else(|| {
                SynthError::configuration(format!(
                    "bus `{bus1}` with {phase_count} phase(s) has no matching phase configuration"
                ))
            })
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Phase {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SynthError::configuration(format!("`{s}` is an invalid phase")))
    }
}

/// Winding connection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Connection {
    Wye,
    Delta,
}

impl Connection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wye => "wye",
            Self::Delta => "delta",
        }
    }
}

impl FromStr for Connection {
    type Err = SynthError;

    /// Accepts the engine's spellings, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wye" | "y" | "ln" => Ok(Self::Wye),
            "delta" | "d" | "ll" => Ok(Self::Delta),
            _ => Err(SynthError::configuration(format!(
                "`{s}` is an invalid connection type"
            ))),
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase metadata of an entity with a single-sided connection on `bus1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseInfo {
    pub phase: Phase,
    pub connection: Connection,
    pub phase_count: usize,
}

impl PhaseInfo {
    pub fn new(phase: Phase, connection: Connection, phase_count: usize) -> Self {
        Self {
            phase,
            connection,
            phase_count,
        }
    }

    pub fn meter_count(&self) -> usize {
        self.phase.meter_count()
    }
}

/// A load: identity plus phase metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    pub id: EntityId,
    pub phase: PhaseInfo,
    /// Nominal voltage in kV, when the circuit declares one.
    pub base_kv: Option<f64>,
}

impl Load {
    pub fn new(name: impl Into<String>, phase: PhaseInfo) -> Self {
        Self {
            id: EntityId::load(name),
            phase,
            base_kv: None,
        }
    }

    pub fn with_base_kv(mut self, kv: f64) -> Self {
        self.base_kv = Some(kv);
        self
    }

    pub fn meter_count(&self) -> usize {
        self.phase.meter_count()
    }
}

/// A two-winding transformer monitored on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformer {
    pub id: EntityId,
}

impl Transformer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::transformer(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Phase::A, 1)]
    #[case(Phase::B, 1)]
    #[case(Phase::C, 1)]
    #[case(Phase::AB, 2)]
    #[case(Phase::AC, 2)]
    #[case(Phase::BC, 2)]
    #[case(Phase::ABC, 3)]
    fn meter_count_follows_phase(#[case] phase: Phase, #[case] expected: usize) {
        assert_eq!(phase.meter_count(), expected);
    }

    #[rstest]
    #[case("bus1.1", 1, Phase::A)]
    #[case("bus1.2", 1, Phase::B)]
    #[case("bus1.3", 1, Phase::C)]
    #[case("bus1.2.1", 1, Phase::AB)]
    #[case("bus1.1.3", 1, Phase::AC)]
    #[case("bus1.3.2", 2, Phase::BC)]
    #[case("bus1", 3, Phase::ABC)]
    fn phase_from_bus(#[case] bus: &str, #[case] count: usize, #[case] expected: Phase) {
        assert_eq!(Phase::from_bus(bus, count).ok(), Some(expected));
    }

    #[test]
    fn phase_from_bus_rejects_unknown_terminal_sets() {
        assert!(matches!(
            Phase::from_bus("bus1.4", 1),
            Err(SynthError::Configuration(_))
        ));
        assert!(matches!(
            Phase::from_bus("bus1", 1),
            Err(SynthError::Configuration(_))
        ));
        assert!(matches!(
            Phase::from_bus("bus1.x", 1),
            Err(SynthError::Configuration(_))
        ));
    }

    #[test]
    fn connection_parses_engine_spellings() {
        for s in ["wye", "Y", "LN"] {
            assert_eq!(s.parse::<Connection>().ok(), Some(Connection::Wye));
        }
        for s in ["Delta", "d", "ll"] {
            assert_eq!(s.parse::<Connection>().ok(), Some(Connection::Delta));
        }
        assert!("star".parse::<Connection>().is_err());
    }

    #[test]
    fn object_name_round_trips() {
        let id = EntityId::load("house_12");
        assert_eq!(id.object_name(), "load.house_12");
        let parsed = EntityId::parse_object_name("load.house_12").ok();
        assert_eq!(parsed, Some(id));
    }

    #[test]
    fn malformed_object_names_are_data_errors() {
        assert!(matches!(
            EntityId::parse_object_name("house_12"),
            Err(SynthError::Data(_))
        ));
        assert!(matches!(
            EntityId::parse_object_name("line.l1"),
            Err(SynthError::Data(_))
        ));
        assert!(matches!(
            EntityId::parse_object_name("load."),
            Err(SynthError::Data(_))
        ));
    }
}
