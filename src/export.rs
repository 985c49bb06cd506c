//! End-of-session export of the reading buffer.
//!
//! Files are named `<prefix>_<YYYYmmdd_HHMMSS>.<ext>`. If that name is
//! already taken a numeric suffix is added; an existing export is never
//! overwritten.

use std::fmt::Debug;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};

use crate::config::{ExportFormat, ExportSettings};
use crate::data::Reading;
use crate::error::ExportError;

/// Header row of the CSV export.
pub const CSV_HEADER: &str = "Timestamp,Location,Concentration,Risk_Level";

/// Timestamp layout used inside exported files.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Writes a session's readings to a portable file.
pub trait Exporter: Send + Debug {
    /// Export every reading, in order, and return the written file.
    fn export(&self, readings: &[Reading]) -> Result<PathBuf, ExportError>;
}

/// Build the exporter selected by the export settings.
pub fn from_settings(settings: &ExportSettings) -> Box<dyn Exporter> {
    match settings.format {
        ExportFormat::Csv => Box::new(CsvExporter::new(&settings.directory, &settings.prefix)),
        ExportFormat::Json => Box::new(JsonExporter::new(&settings.directory, &settings.prefix)),
    }
}

/// Comma-separated export with one row per reading.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    directory: PathBuf,
    prefix: String,
}

impl CsvExporter {
    pub fn new<P: AsRef<Path>>(directory: P, prefix: &str) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
        }
    }
}

impl Exporter for CsvExporter {
    fn export(&self, readings: &[Reading]) -> Result<PathBuf, ExportError> {
        if readings.is_empty() {
            return Err(ExportError::Empty);
        }

        let (path, file) = create_unique(&self.directory, &self.prefix, "csv", Local::now())?;
        let mut out = BufWriter::new(file);

        writeln!(out, "{}", CSV_HEADER)?;
        for reading in readings {
            writeln!(
                out,
                "{},{},{},{}",
                format_timestamp(reading.timestamp()),
                escape_field(reading.location()),
                reading.concentration(),
                reading.risk_tier().label()
            )?;
        }
        out.flush()?;

        Ok(path)
    }
}

/// Pretty-printed JSON array of readings.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    directory: PathBuf,
    prefix: String,
}

impl JsonExporter {
    pub fn new<P: AsRef<Path>>(directory: P, prefix: &str) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
        }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, readings: &[Reading]) -> Result<PathBuf, ExportError> {
        if readings.is_empty() {
            return Err(ExportError::Empty);
        }

        let json = serde_json::to_string_pretty(readings)?;
        let (path, mut file) = create_unique(&self.directory, &self.prefix, "json", Local::now())?;
        file.write_all(json.as_bytes())?;
        file.flush()?;

        Ok(path)
    }
}

/// Create a new export file, never replacing an existing one.
fn create_unique(
    directory: &Path,
    prefix: &str,
    extension: &str,
    now: DateTime<Local>,
) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(directory)?;
    let stamp = now.format("%Y%m%d_%H%M%S");

    for attempt in 0u32.. {
        let name = if attempt == 0 {
            format!("{}_{}.{}", prefix, stamp, extension)
        } else {
            format!("{}_{}_{}.{}", prefix, stamp, attempt, extension)
        };
        let path = directory.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(io::ErrorKind::AlreadyExists, "no free export file name"))
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
}

/// Quote a CSV field if it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SessionBuffer;
    use tempfile::tempdir;

    fn sample_buffer(location: &str) -> SessionBuffer {
        let mut buffer = SessionBuffer::new();
        for c in [0.005, 0.02, 0.15] {
            buffer.push(Utc::now(), location, c);
        }
        buffer
    }

    #[test]
    fn test_csv_export_rows_in_order() {
        let dir = tempdir().unwrap();
        let buffer = sample_buffer("Warehouse 4");
        let exporter = CsvExporter::new(dir.path(), "asbestos_readings");

        let path = exporter.export(buffer.readings()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("asbestos_readings_"));
        assert!(name.ends_with(".csv"));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].ends_with(",Warehouse 4,0.005,Low"));
        assert!(lines[2].ends_with(",Warehouse 4,0.02,Medium"));
        assert!(lines[3].ends_with(",Warehouse 4,0.15,High"));
    }

    #[test]
    fn test_csv_quotes_awkward_locations() {
        let dir = tempdir().unwrap();
        let buffer = sample_buffer("Block A, \"north\" wing");
        let path = CsvExporter::new(dir.path(), "x").export(buffer.readings()).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains(",\"Block A, \"\"north\"\" wing\",0.005,Low"));
    }

    #[test]
    fn test_exports_never_overwrite() {
        let dir = tempdir().unwrap();
        let buffer = sample_buffer("Lab");
        let exporter = CsvExporter::new(dir.path(), "asbestos_readings");

        let first = exporter.export(buffer.readings()).unwrap();
        let second = exporter.export(buffer.readings()).unwrap();
        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
    }

    #[test]
    fn test_empty_buffer_is_not_exported() {
        let dir = tempdir().unwrap();
        let err = CsvExporter::new(dir.path(), "x").export(&[]).unwrap_err();
        assert!(matches!(err, ExportError::Empty));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_json_export() {
        let dir = tempdir().unwrap();
        let buffer = sample_buffer("Lab");
        let path = JsonExporter::new(dir.path().join("nested"), "session")
            .export(buffer.readings())
            .unwrap();
        assert_eq!(path.extension().unwrap(), "json");

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["sequence_index"], 1);
        assert_eq!(rows[2]["risk_tier"], "High");
        assert_eq!(rows[1]["location"], "Lab");
    }

    #[test]
    fn test_from_settings_picks_format() {
        let dir = tempdir().unwrap();
        let settings = ExportSettings {
            directory: dir.path().to_path_buf(),
            format: ExportFormat::Json,
            prefix: "p".to_string(),
        };
        let path = from_settings(&settings).export(sample_buffer("Lab").readings()).unwrap();
        assert_eq!(path.extension().unwrap(), ExportFormat::Json.extension());
    }
}
