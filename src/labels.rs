//! Per-load label rows describing how each loadshape was produced.

use serde::Serialize;

use crate::entity::Load;
use crate::error::{Result, SynthError};
use crate::loadshape::Loadshape;

/// One row of the label table. Field order is the column order on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelRow {
    pub base_kv: Option<f64>,
    pub connection: String,
    pub load_name: String,
    pub loadshape_name: String,
    pub meter_count: usize,
    pub phase_count: usize,
    pub phase_name: String,
    pub phase_value: u8,
    pub profile_name: String,
    pub random_state: u32,
}

impl LabelRow {
    fn new(load: &Load, shape: &Loadshape) -> Self {
        Self {
            base_kv: load.base_kv,
            connection: load.phase.connection.to_string(),
            load_name: load.id.object_name(),
            loadshape_name: shape.object_name(),
            meter_count: load.meter_count(),
            phase_count: load.phase.phase_count,
            phase_name: load.phase.phase.name().to_string(),
            phase_value: load.phase.phase.value(),
            profile_name: shape.meta.profile_name.clone(),
            random_state: shape.meta.seed,
        }
    }
}

/// Pairs loads with their loadshapes, in load order.
///
/// # Errors
///
/// Returns [`SynthError::Reproducibility`] if the counts differ, and
/// [`SynthError::Data`] if a loadshape belongs to a different load than the
/// one at the same position.
pub fn build_labels(loads: &[Load], shapes: &[Loadshape]) -> Result<Vec<LabelRow>> {
    if loads.len() != shapes.len() {
        return Err(SynthError::Reproducibility {
            entities: loads.len(),
            seeds: shapes.len(),
        });
    }
    loads
        .iter()
        .zip(shapes)
        .map(|(load, shape)| {
            if shape.entity != load.id {
                return Err(SynthError::data(format!(
                    "loadshape for {} found where {} was expected",
                    shape.entity, load.id
                )));
            }
            Ok(LabelRow::new(load, shape))
        })
        .collect()
}
