//! Monitor CSV files: a header of channel names, then one row per timestep.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{Result, SynthError};
use crate::monitor::MonitorData;

/// Reads one monitor export.
///
/// # Errors
///
/// Returns [`SynthError::Data`] if the file does not exist or its contents
/// are invalid (see [`read_monitor`]).
pub fn read_monitor_file(path: &Path) -> Result<MonitorData> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            SynthError::data(format!("monitor output `{}` not found", path.display()))
        }
        _ => SynthError::Io(e),
    })?;
    read_monitor(io::BufReader::new(file))
}

/// Parses monitor CSV from any reader. Channel names keep their order;
/// spaces are stripped by [`MonitorData::new`].
///
/// # Errors
///
/// Returns [`SynthError::Data`] for a ragged row or a non-numeric sample.
pub fn read_monitor(reader: impl Read) -> Result<MonitorData> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let channel_names: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for (t, record) in rdr.records().enumerate() {
        let record = record?;
        let row = record
            .iter()
            .map(|cell| {
                cell.parse::<f64>().map_err(|_| {
                    SynthError::data(format!("monitor row {t}: `{cell}` is not a number"))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    MonitorData::new(channel_names, rows)
}

/// Writes monitor data as CSV.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_monitor(data: &MonitorData, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(data.channel_names())?;
    for row in data.rows() {
        wtr.write_record(row.iter().map(f64::to_string))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes monitor data to `path`, creating or truncating the file.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn write_monitor_file(data: &MonitorData, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_monitor(data, io::BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let csv = "hours, V1, VAngle1\n0,120.1,0\n1,119.9,-0.5\n";
        let data = read_monitor(csv.as_bytes()).expect("valid monitor csv");
        assert_eq!(data.channel_names(), ["hours", "V1", "VAngle1"]);
        assert_eq!(data.sample_count(), 2);
    }

    #[test]
    fn written_file_reads_back() {
        let data = MonitorData::new(
            vec!["hours".into(), "V1".into()],
            vec![vec![0.0, 1.25], vec![1.0, 1.5]],
        )
        .expect("rectangular fixture");
        let mut buf = Vec::new();
        write_monitor(&data, &mut buf).expect("write to buffer");
        assert_eq!(read_monitor(buf.as_slice()).expect("read back"), data);
    }

    #[test]
    fn bad_sample_is_data_error() {
        let csv = "hours,V1\n0,x\n";
        assert!(matches!(read_monitor(csv.as_bytes()), Err(SynthError::Data(_))));
    }

    #[test]
    fn missing_file_is_data_error() {
        let path = std::env::temp_dir().join("loadshape-dataset-no-such-monitor.csv");
        assert!(matches!(read_monitor_file(&path), Err(SynthError::Data(_))));
    }
}
