//! CSV and JSON export of per-circuit dataset artifacts.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::aggregate::{ChannelMap, MeasurementTable};
use crate::error::Result;
use crate::labels::LabelRow;
use crate::loadshape::Loadshape;
use crate::pipeline::CircuitDataset;

/// File locations of one circuit's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub load_measurements: PathBuf,
    pub transformer_measurements: PathBuf,
    pub loadshapes: PathBuf,
    pub labels: PathBuf,
    pub channel_map: PathBuf,
}

impl ArtifactPaths {
    /// Paths for circuit `circuit` under `dir`.
    pub fn new(dir: &Path, circuit: &str) -> Self {
        let file = |suffix: &str| dir.join(format!("{circuit}-{suffix}"));
        Self {
            load_measurements: file("load-voltage_magnitudes-raw.csv"),
            transformer_measurements: file("transformer-voltage_magnitudes-raw.csv"),
            loadshapes: file("loadshapes.csv"),
            labels: file("labels.csv"),
            channel_map: file("channel_map-load.json"),
        }
    }
}

/// Writes a measurement table with delimiter-joined column names.
///
/// # Arguments
///
/// * `table` - Aggregated measurements
/// * `delimiter` - Separator between entity, side, and channel
/// * `writer` - Destination implementing `Write`
///
/// # Errors
///
/// Returns an error if a column name cannot be rendered or writing fails.
pub fn write_table(table: &MeasurementTable, delimiter: &str, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(table.column_names(delimiter)?)?;
    for t in 0..table.row_count() {
        let row = table.row(t).unwrap_or_default();
        wtr.write_record(row.iter().map(f64::to_string))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes one column per loadshape, headed by its object name. Shorter
/// series leave trailing cells empty.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_loadshapes(shapes: &[Loadshape], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(shapes.iter().map(Loadshape::object_name))?;
    let rows = shapes.iter().map(Loadshape::len).max().unwrap_or(0);
    for t in 0..rows {
        wtr.write_record(
            shapes
                .iter()
                .map(|s| s.values.get(t).map(f64::to_string).unwrap_or_default()),
        )?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the label table; an absent `base_kv` is an empty cell.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_labels(rows: &[LabelRow], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the channel map as a JSON object of object name to index list.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_channel_map(map: &ChannelMap, writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(writer, map)?;
    Ok(())
}

/// Renders every artifact of `dataset` in memory, then writes the files.
///
/// Nothing is written if any artifact fails to render, and a failed write
/// leaves none of the circuit's files behind. Measurement artifacts
/// are skipped for synthesize-only datasets, and the transformer table is
/// skipped when the circuit has no transformers.
///
/// # Errors
///
/// Returns an error if rendering fails or a file cannot be written.
pub fn write_circuit_dataset(
    dataset: &CircuitDataset,
    dir: &Path,
    delimiter: &str,
) -> Result<ArtifactPaths> {
    let paths = ArtifactPaths::new(dir, &dataset.circuit);
    let mut files: Vec<(&Path, Vec<u8>)> = Vec::new();

    let mut buf = Vec::new();
    write_loadshapes(&dataset.loadshapes, &mut buf)?;
    files.push((paths.loadshapes.as_path(), buf));

    let mut buf = Vec::new();
    write_labels(&dataset.labels, &mut buf)?;
    files.push((paths.labels.as_path(), buf));

    if let Some(m) = &dataset.measurements {
        let mut buf = Vec::new();
        write_table(&m.loads, delimiter, &mut buf)?;
        files.push((paths.load_measurements.as_path(), buf));

        let mut buf = Vec::new();
        write_channel_map(&m.channel_map, &mut buf)?;
        files.push((paths.channel_map.as_path(), buf));

        if let Some(transformers) = &m.transformers {
            let mut buf = Vec::new();
            write_table(transformers, delimiter, &mut buf)?;
            files.push((paths.transformer_measurements.as_path(), buf));
        }
    }

    fs::create_dir_all(dir)?;
    commit_files(&files)?;
    info!(
        circuit = %dataset.circuit,
        dir = %dir.display(),
        files = files.len(),
        "wrote circuit artifacts"
    );
    Ok(paths)
}

/// Sibling path a file is staged at before it is renamed into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    PathBuf::from(staged)
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut out = io::BufWriter::new(File::create(path)?);
    out.write_all(bytes)?;
    out.flush()
}

/// Stages every file, then renames them into place. On any failure the
/// staged files and the files already renamed are removed.
fn commit_files(files: &[(&Path, Vec<u8>)]) -> Result<()> {
    let staged: Vec<PathBuf> = files.iter().map(|(path, _)| staging_path(path)).collect();

    for (i, (_, bytes)) in files.iter().enumerate() {
        if let Err(e) = write_file(&staged[i], bytes) {
            remove_all(staged[..=i].iter().map(PathBuf::as_path));
            return Err(e.into());
        }
    }
    for (i, (path, _)) in files.iter().enumerate() {
        if let Err(e) = fs::rename(&staged[i], path) {
            remove_all(files[..i].iter().map(|(p, _)| *p));
            remove_all(staged[i..].iter().map(PathBuf::as_path));
            return Err(e.into());
        }
    }
    Ok(())
}

fn remove_all<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                warn!(path = %path.display(), error = %e, "could not remove partial artifact");
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{PHASE_VOLTAGE_CHANNELS, SingleSided, aggregate_single_sided};
    use crate::entity::{Connection, EntityId, Load, Phase, PhaseInfo};
    use crate::error::SynthError;
    use crate::loadshape::{GenerationMeta, Recurrence};
    use crate::monitor::MonitorData;

    fn shape(name: &str, values: Vec<f64>) -> Loadshape {
        Loadshape {
            entity: EntityId::load(name),
            name: format!("load_{name}"),
            recurrence: Recurrence::Daily,
            values,
            hour_interval: 1.0,
            meta: GenerationMeta {
                profile_name: "1".into(),
                seed: 1,
                pool: None,
            },
        }
    }

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).expect("utf-8 output")
    }

    #[test]
    fn table_header_uses_delimiter() {
        let a = EntityId::load("a");
        let m = MonitorData::new(
            vec!["hours".into(), "V1".into()],
            vec![vec![0.0, 1.5], vec![1.0, 2.5]],
        )
        .expect("rectangular fixture");
        let inputs = [SingleSided { entity: &a, meter_count: 1, monitor: &m }];
        let (table, _) =
            aggregate_single_sided(&inputs, &PHASE_VOLTAGE_CHANNELS).expect("aggregation");
        let mut buf = Vec::new();
        write_table(&table, "|", &mut buf).expect("write to buffer");
        assert_eq!(text(buf), "load.a|V1\n1.5\n2.5\n");
    }

    #[test]
    fn loadshapes_are_columns() {
        let shapes = [shape("a", vec![0.0, 1.0]), shape("b", vec![0.5])];
        let mut buf = Vec::new();
        write_loadshapes(&shapes, &mut buf).expect("write to buffer");
        assert_eq!(
            text(buf),
            "loadshape.load_a,loadshape.load_b\n0,0.5\n1,\n"
        );
    }

    #[test]
    fn labels_header_matches_schema() {
        let load = Load::new("a", PhaseInfo::new(Phase::A, Connection::Wye, 1));
        let rows = crate::labels::build_labels(&[load], &[shape("a", vec![0.0, 1.0])])
            .expect("matching loads and shapes");
        assert_eq!(rows.len(), 1);
        let mut buf = Vec::new();
        write_labels(&rows, &mut buf).expect("write to buffer");
        let out = text(buf);
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some(
                "base_kv,connection,load_name,loadshape_name,meter_count,\
                 phase_count,phase_name,phase_value,profile_name,random_state"
            )
        );
        assert_eq!(lines.next(), Some(",wye,load.a,loadshape.load_a,1,1,A,0,1,1"));
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "loadshape-dataset-export-{name}-{}",
            std::process::id()
        ));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read scratch dir")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn committed_files_replace_staging_files() {
        let dir = scratch("commit");
        let a = dir.join("a.csv");
        let b = dir.join("b.csv");
        commit_files(&[(a.as_path(), b"x\n".to_vec()), (b.as_path(), b"y\n".to_vec())])
            .expect("commit");
        assert_eq!(entries(&dir), vec!["a.csv", "b.csv"]);
        assert_eq!(fs::read_to_string(&b).expect("read b"), "y\n");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn failed_rename_removes_every_file_of_the_batch() {
        let dir = scratch("rollback");
        let a = dir.join("a.csv");
        let b = dir.join("b.csv");
        let blocked = dir.join("c.csv");
        // a directory cannot be replaced by a file
        fs::create_dir_all(&blocked).expect("create blocker");

        let files = [
            (a.as_path(), b"1\n".to_vec()),
            (b.as_path(), b"2\n".to_vec()),
            (blocked.as_path(), b"3\n".to_vec()),
        ];
        assert!(matches!(commit_files(&files), Err(SynthError::Io(_))));
        assert_eq!(entries(&dir), vec!["c.csv"]);
        assert!(blocked.is_dir());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn artifact_names_follow_circuit() {
        let paths = ArtifactPaths::new(Path::new("out"), "ckt5");
        assert_eq!(paths.labels, PathBuf::from("out/ckt5-labels.csv"));
        assert_eq!(
            paths.channel_map,
            PathBuf::from("out/ckt5-channel_map-load.json")
        );
        assert_eq!(
            paths.load_measurements,
            PathBuf::from("out/ckt5-load-voltage_magnitudes-raw.csv")
        );
    }
}
