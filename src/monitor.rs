//! Monitor identity and the per-monitor channel matrices returned by the engine.

use std::fmt;

use crate::entity::EntityId;
use crate::error::{Result, SynthError};

/// Monitor mode recording voltage and current magnitudes/angles.
pub const VOLTAGE_CURRENT_MODE: u32 = 0;

/// Name of the leading timestamp channel.
pub const HOURS_CHANNEL: &str = "hours";

/// A monitor attached to one terminal of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonitorId {
    pub entity: EntityId,
    pub terminal: u32,
    pub mode: u32,
}

impl MonitorId {
    pub fn new(entity: EntityId, terminal: u32) -> Self {
        Self {
            entity,
            terminal,
            mode: VOLTAGE_CURRENT_MODE,
        }
    }

    /// Element name, e.g. `load_house_1-mode_0-terminal_1`.
    pub fn element_name(&self) -> String {
        format!(
            "{}_{}-mode_{}-terminal_{}",
            self.entity.kind, self.entity.name, self.mode, self.terminal
        )
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "monitor.{}", self.element_name())
    }
}

/// Samples recorded by one monitor: rows are timesteps, columns are channels.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorData {
    channel_names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl MonitorData {
    /// Builds monitor data, stripping spaces from channel names.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Data`] if any row's width differs from the
    /// number of channels.
    pub fn new(channel_names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let channel_names: Vec<String> = channel_names
            .into_iter()
            .map(|name| name.replace(' ', ""))
            .collect();
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != channel_names.len())
        {
            return Err(SynthError::data(format!(
                "row {i} has {} values but there are {} channels",
                row.len(),
                channel_names.len()
            )));
        }
        Ok(Self {
            channel_names,
            rows,
        })
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn sample_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a channel by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Data`] if the channel is absent.
    pub fn channel_index(&self, name: &str) -> Result<usize> {
        self.channel_names
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| {
                SynthError::data(format!(
                    "channel `{name}` not found (available: {})",
                    self.channel_names.join(", ")
                ))
            })
    }

    /// All samples of one channel in timestep order.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Data`] if the channel is absent.
    pub fn channel(&self, name: &str) -> Result<Vec<f64>> {
        let index = self.channel_index(name)?;
        Ok(self.rows.iter().map(|row| row[index]).collect())
    }
}
