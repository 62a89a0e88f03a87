//! Reading and writing landmark tables as CSV.
//!
//! Reading is forgiving: any row whose first three fields are numbers is a
//! landmark, and so is a row with a name followed by three numbers. Header
//! rows, short rows and garbage are skipped.

use std::io::{Read, Write};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use nalgebra::Point3;
use tps_warp::NamedLandmarkPair3D;
use tracing::debug;

use crate::error::{DocumentError, DocumentResult};

/// One landmark row.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLandmark {
    pub name: Option<String>,
    pub position: Point3<f64>,
}

impl CsvLandmark {
    pub fn new(name: Option<String>, position: Point3<f64>) -> Self {
        Self { name, position }
    }

    pub fn unnamed(position: Point3<f64>) -> Self {
        Self::new(None, position)
    }

    pub fn named(name: impl Into<String>, position: Point3<f64>) -> Self {
        Self::new(Some(name.into()), position)
    }
}

/// What to include when writing a landmark table.
///
/// The default writes both a header row and a `name` column, so a saved
/// table reloads with its landmark ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvExportOptions {
    /// Write a header row first.
    pub header: bool,
    /// Write a leading `name` column.
    pub names: bool,
}

impl Default for CsvExportOptions {
    fn default() -> Self {
        Self {
            header: true,
            names: true,
        }
    }
}

impl CsvExportOptions {
    /// Positions only, no header row.
    pub fn bare() -> Self {
        Self {
            header: false,
            names: false,
        }
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn with_names(mut self, names: bool) -> Self {
        self.names = names;
        self
    }
}

// =============================================================================
// Reading
// =============================================================================

fn parse_coordinate(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_position(fields: &[&str]) -> Option<Point3<f64>> {
    match fields {
        [x, y, z, ..] => Some(Point3::new(
            parse_coordinate(x)?,
            parse_coordinate(y)?,
            parse_coordinate(z)?,
        )),
        _ => None,
    }
}

/// Interpret one row, or `None` if it isn't a landmark.
fn parse_record(record: &StringRecord) -> Option<CsvLandmark> {
    let fields: Vec<&str> = record.iter().collect();

    if let Some(position) = parse_position(&fields) {
        return Some(CsvLandmark::unnamed(position));
    }

    let (name, rest) = fields.split_first()?;
    if parse_coordinate(name).is_some() {
        return None;
    }
    let position = parse_position(rest)?;
    let name = (!name.is_empty()).then(|| name.to_string());
    Some(CsvLandmark::new(name, position))
}

/// Read every landmark row from a CSV stream.
///
/// # Errors
///
/// Only fails if the underlying stream does. Rows that aren't landmarks
/// are skipped and logged at debug level.
pub fn read_landmarks_from_csv(reader: impl Read) -> DocumentResult<Vec<CsvLandmark>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut landmarks = Vec::new();
    let mut skipped = 0usize;

    for (row, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(DocumentError::CsvRead { source: e }),
            Err(e) => {
                debug!(target: "tps_document::csv", row, error = %e, "skipping unreadable row");
                skipped += 1;
                continue;
            }
        };

        match parse_record(&record) {
            Some(landmark) => landmarks.push(landmark),
            None => {
                debug!(target: "tps_document::csv", row, "skipping non-landmark row");
                skipped += 1;
            }
        }
    }

    debug!(
        target: "tps_document::csv",
        read = landmarks.len(),
        skipped,
        "read landmark table"
    );
    Ok(landmarks)
}

// =============================================================================
// Writing
// =============================================================================

fn csv_write_error(source: csv::Error) -> DocumentError {
    DocumentError::CsvWrite { source }
}

fn coordinates(p: &Point3<f64>) -> [String; 3] {
    [p.x.to_string(), p.y.to_string(), p.z.to_string()]
}

/// Write landmarks as `x,y,z` rows, or `name,x,y,z` when names are requested.
///
/// Unnamed landmarks get an empty name field.
pub fn write_landmarks_to_csv<'a>(
    writer: impl Write,
    landmarks: impl IntoIterator<Item = &'a CsvLandmark>,
    options: CsvExportOptions,
) -> DocumentResult<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);

    if options.header {
        let header: &[&str] = if options.names {
            &["name", "x", "y", "z"]
        } else {
            &["x", "y", "z"]
        };
        csv_writer.write_record(header).map_err(csv_write_error)?;
    }

    for landmark in landmarks {
        let [x, y, z] = coordinates(&landmark.position);
        if options.names {
            let name = landmark.name.as_deref().unwrap_or_default();
            csv_writer
                .write_record([name, x.as_str(), y.as_str(), z.as_str()])
                .map_err(csv_write_error)?;
        } else {
            csv_writer.write_record([&x, &y, &z]).map_err(csv_write_error)?;
        }
    }

    csv_writer.flush().map_err(|e| csv_write_error(e.into()))
}

/// Write fully paired landmarks as six-column rows.
pub fn write_paired_landmarks_to_csv<'a>(
    writer: impl Write,
    pairs: impl IntoIterator<Item = &'a NamedLandmarkPair3D>,
    options: CsvExportOptions,
) -> DocumentResult<()> {
    const COLUMNS: [&str; 6] = ["source.x", "source.y", "source.z", "dest.x", "dest.y", "dest.z"];

    let mut csv_writer = WriterBuilder::new().from_writer(writer);

    if options.header {
        let mut header = Vec::with_capacity(7);
        if options.names {
            header.push("name");
        }
        header.extend(COLUMNS);
        csv_writer.write_record(&header).map_err(csv_write_error)?;
    }

    let mut row: Vec<String> = Vec::with_capacity(7);
    for named in pairs {
        if options.names {
            row.push(named.name.clone());
        }
        row.extend(coordinates(&named.pair.source));
        row.extend(coordinates(&named.pair.destination));
        csv_writer.write_record(&row).map_err(csv_write_error)?;
        row.clear();
    }

    csv_writer.flush().map_err(|e| csv_write_error(e.into()))
}
