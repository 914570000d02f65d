//! Reads the columnar profile source.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Result, SynthError};
use crate::profiles::{ProfileId, ProfileRepository};

/// Reads profiles from a CSV file whose header row holds `{class}_{zone}` keys.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or its contents are invalid
/// (see [`read_profiles`]).
pub fn read_profiles_file(path: &Path) -> Result<ProfileRepository> {
    let file = File::open(path)?;
    let repo = read_profiles(io::BufReader::new(file))?;
    info!(path = %path.display(), profiles = repo.len(), "read profile source");
    Ok(repo)
}

/// Reads profiles from CSV: one column per profile, one row per timestep.
///
/// Columns whose header is not a profile key (an index column, for example)
/// are skipped.
///
/// # Errors
///
/// Returns [`SynthError::Data`] for a ragged row or a non-numeric cell, and
/// [`SynthError::Configuration`] for a duplicated key.
pub fn read_profiles(reader: impl Read) -> Result<ProfileRepository> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut keyed: Vec<(usize, ProfileId)> = Vec::new();
    for (i, header) in headers.iter().enumerate() {
        match header.parse::<ProfileId>() {
            Ok(id) => keyed.push((i, id)),
            Err(e) => warn!(column = header, error = %e, "skipping non-profile column"),
        }
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); keyed.len()];
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(SynthError::data(format!(
                "profile row {row} has {} cells but the header has {}",
                record.len(),
                headers.len()
            )));
        }
        for ((i, id), column) in keyed.iter().zip(columns.iter_mut()) {
            let cell = &record[*i];
            let value = cell.parse::<f64>().map_err(|_| {
                SynthError::data(format!("profile `{id}` row {row}: `{cell}` is not a number"))
            })?;
            column.push(value);
        }
    }

    ProfileRepository::from_columns(keyed.into_iter().map(|(_, id)| id).zip(columns))
}
