//! Aggregation of monitor output into wide per-entity measurement tables.
//!
//! Columns are keyed by [`ColumnKey`]; delimiter-joined names only appear
//! when a table is written out (see [`MeasurementTable::column_names`]).

use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::info;

use crate::entity::EntityId;
use crate::error::{Result, SynthError};
use crate::monitor::MonitorData;

/// Phase-voltage magnitude channels, in phase order.
pub const PHASE_VOLTAGE_CHANNELS: [&str; 3] = ["V1", "V2", "V3"];

/// Default delimiter between entity, side, and channel in column names.
pub const DEFAULT_DELIMITER: &str = "-";

/// Winding side of a two-sided entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Primary,
    Secondary,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured identity of one table column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub entity: EntityId,
    pub side: Option<Side>,
    pub channel: String,
}

impl ColumnKey {
    /// Renders `entity{d}channel` or `entity{d}side{d}channel`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Data`] if the channel name contains the
    /// delimiter, which would make the name unparseable.
    pub fn render(&self, delimiter: &str) -> Result<String> {
        if delimiter.is_empty() || self.channel.contains(delimiter) {
            return Err(SynthError::data(format!(
                "channel `{}` cannot be joined with delimiter `{delimiter}`",
                self.channel
            )));
        }
        let entity = self.entity.object_name();
        Ok(match self.side {
            Some(side) => format!("{entity}{delimiter}{side}{delimiter}{}", self.channel),
            None => format!("{entity}{delimiter}{}", self.channel),
        })
    }
}

/// A wide table: one column per (entity, side, channel), one row per timestep.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasurementTable {
    keys: Vec<ColumnKey>,
    columns: Vec<Vec<f64>>,
}

impl MeasurementTable {
    fn push(&mut self, key: ColumnKey, values: Vec<f64>) -> Result<()> {
        if let Some(first) = self.columns.first() {
            if first.len() != values.len() {
                return Err(SynthError::data(format!(
                    "column for {} has {} samples but the table has {} rows",
                    key.entity,
                    values.len(),
                    first.len()
                )));
            }
        }
        self.keys.push(key);
        self.columns.push(values);
        Ok(())
    }

    pub fn keys(&self) -> &[ColumnKey] {
        &self.keys
    }

    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Row `t` across all columns.
    pub fn row(&self, t: usize) -> Option<Vec<f64>> {
        self.columns.iter().map(|c| c.get(t).copied()).collect()
    }

    /// Column names joined with `delimiter`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Data`] if a name cannot be rendered unambiguously.
    pub fn column_names(&self, delimiter: &str) -> Result<Vec<String>> {
        self.keys.iter().map(|k| k.render(delimiter)).collect()
    }
}

/// Entity → ordered column indices it owns in a [`MeasurementTable`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelMap(IndexMap<EntityId, Vec<usize>>);

impl ChannelMap {
    /// Groups column indices by entity, in first-seen entity order.
    pub fn from_keys(keys: &[ColumnKey]) -> Self {
        let mut map: IndexMap<EntityId, Vec<usize>> = IndexMap::new();
        for (i, key) in keys.iter().enumerate() {
            map.entry(key.entity.clone()).or_default().push(i);
        }
        Self(map)
    }

    /// Rebuilds a map from single-sided column names such as
    /// `load.house_1-V2`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Data`] if a name lacks the delimiter or its
    /// entity part is not a valid object name.
    pub fn from_column_names<S: AsRef<str>>(names: &[S], delimiter: &str) -> Result<Self> {
        let mut map: IndexMap<EntityId, Vec<usize>> = IndexMap::new();
        for (i, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let (entity, _) = name
                .rsplit_once(delimiter)
                .filter(|(e, c)| !e.is_empty() && !c.is_empty() && !delimiter.is_empty())
                .ok_or_else(|| {
                    SynthError::data(format!(
                        "column `{name}` is not `<entity>{delimiter}<channel>`"
                    ))
                })?;
            map.entry(EntityId::parse_object_name(entity)?)
                .or_default()
                .push(i);
        }
        Ok(Self(map))
    }

    pub fn get(&self, entity: &EntityId) -> Option<&[usize]> {
        self.0.get(entity).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &[usize])> {
        self.0.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the index lists partition `0..column_count` exactly.
    pub fn partitions(&self, column_count: usize) -> bool {
        let mut seen = vec![false; column_count];
        for index in self.0.values().flatten() {
            match seen.get_mut(*index) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        seen.into_iter().all(|s| s)
    }
}

impl Serialize for ChannelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k.object_name(), v)))
    }
}

/// One monitored point per entity.
#[derive(Debug, Clone, Copy)]
pub struct SingleSided<'a> {
    pub entity: &'a EntityId,
    pub meter_count: usize,
    pub monitor: &'a MonitorData,
}

/// Primary and secondary monitored points per entity.
#[derive(Debug, Clone, Copy)]
pub struct PairedSided<'a> {
    pub entity: &'a EntityId,
    pub primary: &'a MonitorData,
    pub secondary: &'a MonitorData,
}

/// Builds one column per metered channel per entity plus the channel map.
///
/// Each entity contributes the first `meter_count` names of `channels`.
///
/// # Errors
///
/// Returns [`SynthError::Data`] if a requested channel is missing from an
/// entity's monitor or sample counts differ; no partial table is returned.
pub fn aggregate_single_sided(
    inputs: &[SingleSided<'_>],
    channels: &[&str],
) -> Result<(MeasurementTable, ChannelMap)> {
    let mut table = MeasurementTable::default();
    for input in inputs {
        for channel in channels.iter().take(input.meter_count) {
            let values = input.monitor.channel(channel).map_err(|e| {
                SynthError::data(format!("{}: {e}", input.entity))
            })?;
            table.push(
                ColumnKey {
                    entity: input.entity.clone(),
                    side: None,
                    channel: (*channel).to_string(),
                },
                values,
            )?;
        }
    }
    let map = ChannelMap::from_keys(table.keys());
    info!(
        entities = map.len(),
        columns = table.column_count(),
        rows = table.row_count(),
        "aggregated single-sided measurements"
    );
    Ok((table, map))
}

/// Builds one column per (side, channel) per entity over the full channel set.
///
/// # Errors
///
/// Returns [`SynthError::Data`] if a channel is missing on either side or
/// sample counts differ.
pub fn aggregate_paired_sided(
    inputs: &[PairedSided<'_>],
    channels: &[&str],
) -> Result<MeasurementTable> {
    let mut table = MeasurementTable::default();
    for input in inputs {
        for channel in channels {
            for (side, monitor) in [
                (Side::Primary, input.primary),
                (Side::Secondary, input.secondary),
            ] {
                let values = monitor
                    .channel(channel)
                    .map_err(|e| SynthError::data(format!("{} {side}: {e}", input.entity)))?;
                table.push(
                    ColumnKey {
                        entity: input.entity.clone(),
                        side: Some(side),
                        channel: (*channel).to_string(),
                    },
                    values,
                )?;
            }
        }
    }
    info!(
        entities = inputs.len(),
        columns = table.column_count(),
        rows = table.row_count(),
        "aggregated paired-sided measurements"
    );
    Ok(table)
}
