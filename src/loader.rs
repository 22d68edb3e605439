use std::collections::HashMap;
use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};
use jiff::Span;
use jiff::civil::{DateTime, date};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::geometry;
use crate::store::{self, NewTrack};

/// Column headers the spreadsheet must carry, in any order.
const REQUIRED_COLUMNS: [&str; 6] = [
    "id",
    "longitude",
    "latitude",
    "speed",
    "gps_time",
    "vehicle_id",
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open spreadsheet: {0}")]
    Workbook(#[from] calamine::XlsxError),
    #[error("spreadsheet has no worksheets")]
    NoWorksheet,
    #[error("spreadsheet has no header row")]
    NoHeader,
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}: missing value for '{column}'")]
    MissingValue { row: usize, column: &'static str },
    #[error("row {row}: expected a number for '{column}', got '{value}'")]
    NotNumeric {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("row {row}: unparsable gps_time '{value}'")]
    BadTimestamp { row: usize, value: String },
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Reads, transforms and inserts the whole spreadsheet in one transaction.
/// Any malformed row or failed insert aborts the run with nothing persisted.
pub async fn load_file(pool: &SqlitePool, path: &Path) -> Result<usize, LoadError> {
    let rows = read_rows(path)?;
    store::insert_all(pool, &rows).await?;
    info!(message = "batch loaded", rows = rows.len(), path = %path.display());
    Ok(rows.len())
}

/// Reads the first worksheet into transformed track rows, without touching
/// the database.
pub fn read_rows(path: &Path) -> Result<Vec<NewTrack>, LoadError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(LoadError::NoWorksheet)??;

    let mut rows = range.rows();
    let header = rows.next().ok_or(LoadError::NoHeader)?;
    let columns = resolve_columns(header)?;

    // Header occupies spreadsheet row 1; data starts at 2.
    rows.enumerate()
        .map(|(i, row)| transform_row(i + 2, &columns, row))
        .collect()
}

fn resolve_columns(header: &[Data]) -> Result<HashMap<&'static str, usize>, LoadError> {
    let mut columns = HashMap::new();
    for (index, cell) in header.iter().enumerate() {
        if let Data::String(name) = cell {
            let name = name.trim().to_lowercase();
            if let Some(required) = REQUIRED_COLUMNS.iter().find(|c| **c == name) {
                columns.insert(*required, index);
            }
        }
    }
    for column in REQUIRED_COLUMNS {
        if !columns.contains_key(column) {
            return Err(LoadError::MissingColumn(column));
        }
    }
    Ok(columns)
}

fn transform_row(
    row_number: usize,
    columns: &HashMap<&'static str, usize>,
    row: &[Data],
) -> Result<NewTrack, LoadError> {
    let longitude = numeric_cell(row_number, columns, row, "longitude")?;
    let latitude = numeric_cell(row_number, columns, row, "latitude")?;

    Ok(NewTrack {
        id: Some(numeric_cell(row_number, columns, row, "id")? as i64),
        longitude,
        latitude,
        speed: numeric_cell(row_number, columns, row, "speed")?,
        gps_time: gps_time_cell(row_number, cell(columns, row, "gps_time"))?,
        vehicle_id: numeric_cell(row_number, columns, row, "vehicle_id")? as i64,
        geometry: geometry::to_ewkt(longitude, latitude),
    })
}

fn cell<'a>(columns: &HashMap<&'static str, usize>, row: &'a [Data], column: &str) -> &'a Data {
    row.get(columns[column]).unwrap_or(&Data::Empty)
}

fn numeric_cell(
    row_number: usize,
    columns: &HashMap<&'static str, usize>,
    row: &[Data],
    column: &'static str,
) -> Result<f64, LoadError> {
    match cell(columns, row, column) {
        Data::Float(v) => Ok(*v),
        Data::Int(v) => Ok(*v as f64),
        Data::Empty => Err(LoadError::MissingValue {
            row: row_number,
            column,
        }),
        other => Err(LoadError::NotNumeric {
            row: row_number,
            column,
            value: other.to_string(),
        }),
    }
}

fn gps_time_cell(row_number: usize, value: &Data) -> Result<DateTime, LoadError> {
    let bad = |value: String| LoadError::BadTimestamp {
        row: row_number,
        value,
    };
    match value {
        // Text timestamps keep their local-clock value: the offset is
        // dropped, never converted.
        Data::String(text) => strip_offset(text.trim())
            .parse()
            .map_err(|_| bad(text.clone())),
        Data::DateTime(serial) => {
            let serial = serial.as_f64();
            excel_serial_to_datetime(serial).ok_or_else(|| bad(serial.to_string()))
        }
        other => Err(bad(other.to_string())),
    }
}

/// Cuts a trailing UTC-offset designator (`+hh:mm`, `-hh:mm`, `Z`) off an
/// ISO-8601 timestamp, keeping the civil portion untouched.
fn strip_offset(value: &str) -> &str {
    let Some(sep) = value.find(['T', ' ']) else {
        return value;
    };
    let time = &value[sep + 1..];
    match time.find(['+', '-', 'Z', 'z']) {
        Some(i) => &value[..sep + 1 + i],
        None => value,
    }
}

/// Spreadsheet datetime serials count days from 1899-12-30.
fn excel_serial_to_datetime(serial: f64) -> Option<DateTime> {
    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    date(1899, 12, 30)
        .at(0, 0, 0, 0)
        .checked_add(Span::new().days(days as i64).seconds(seconds))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::datetime;

    fn header() -> Vec<Data> {
        REQUIRED_COLUMNS
            .iter()
            .map(|c| Data::String(c.to_string()))
            .collect()
    }

    #[test]
    fn offset_is_dropped_not_converted() {
        let row = [
            Data::Int(1),
            Data::Float(30.0),
            Data::Float(10.0),
            Data::Float(55.5),
            Data::String("2023-01-01T12:00:00+03:00".to_string()),
            Data::Int(7),
        ];
        let columns = resolve_columns(&header()).unwrap();
        let track = transform_row(2, &columns, &row).unwrap();
        assert_eq!(track.gps_time, datetime(2023, 1, 1, 12, 0, 0, 0));
        assert_eq!(track.geometry, "SRID=4326;POINT(30 10)");
    }

    #[test]
    fn strips_various_offset_shapes() {
        assert_eq!(strip_offset("2023-01-01T12:00:00+03:00"), "2023-01-01T12:00:00");
        assert_eq!(strip_offset("2023-01-01T12:00:00-05:30"), "2023-01-01T12:00:00");
        assert_eq!(strip_offset("2023-01-01T12:00:00Z"), "2023-01-01T12:00:00");
        assert_eq!(strip_offset("2023-01-01 12:00:00"), "2023-01-01 12:00:00");
        assert_eq!(strip_offset("2023-01-01T12:00:00"), "2023-01-01T12:00:00");
    }

    #[test]
    fn excel_serials_convert_from_the_1899_epoch() {
        // 2023-01-01 12:00:00 is 44927.5 days after 1899-12-30.
        assert_eq!(
            excel_serial_to_datetime(44927.5).unwrap(),
            datetime(2023, 1, 1, 12, 0, 0, 0)
        );
        assert_eq!(
            excel_serial_to_datetime(60.0).unwrap(),
            datetime(1900, 2, 28, 0, 0, 0, 0)
        );
    }

    #[test]
    fn missing_column_aborts_the_load() {
        let mut incomplete = header();
        incomplete.retain(|c| !matches!(c, Data::String(s) if s == "speed"));
        assert!(matches!(
            resolve_columns(&incomplete),
            Err(LoadError::MissingColumn("speed"))
        ));
    }

    #[test]
    fn non_numeric_coordinate_aborts_the_load() {
        let row = [
            Data::Int(1),
            Data::String("east of here".to_string()),
            Data::Float(10.0),
            Data::Float(55.5),
            Data::String("2023-01-01T12:00:00".to_string()),
            Data::Int(7),
        ];
        let columns = resolve_columns(&header()).unwrap();
        assert!(matches!(
            transform_row(2, &columns, &row),
            Err(LoadError::NotNumeric { column: "longitude", .. })
        ));
    }

    #[test]
    fn short_row_is_a_missing_value() {
        let row = [Data::Int(1), Data::Float(30.0)];
        let columns = resolve_columns(&header()).unwrap();
        assert!(matches!(
            transform_row(2, &columns, &row),
            Err(LoadError::MissingValue { .. })
        ));
    }
}
