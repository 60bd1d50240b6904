//! Header-addressed CSV reading.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;

use crate::error::{IngestError, Result};

/// Date formats accepted in date columns, tried in order.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// A CSV file read fully into memory, addressed by header name.
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl CsvTable {
    /// Read a comma-separated file with one header row.
    ///
    /// Fields are trimmed and rows may be shorter than the header.
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| open_error(path, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| parse_error(path, &e))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(IngestError::EmptyCsv {
                path: path.to_path_buf(),
            });
        }

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| parse_error(path, &e))?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            records.push(record);
        }

        tracing::debug!(
            path = %path.display(),
            columns = headers.len(),
            rows = records.len(),
            "read CSV table"
        );
        Ok(Self {
            path: path.to_path_buf(),
            headers,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the first header matching any of `names`, ignoring case.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| {
            self.headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(name))
        })
    }

    /// Like [`Self::column`], failing with the first name when absent.
    pub fn require(&self, names: &[&str]) -> Result<usize> {
        self.column(names).ok_or_else(|| IngestError::MissingColumn {
            column: names.first().copied().unwrap_or_default().to_string(),
            path: self.path.clone(),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().map(|record| Row {
            table: self,
            record,
        })
    }
}

/// One data row of a [`CsvTable`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a CsvTable,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// 1-based line number in the source file.
    pub fn line(&self) -> u64 {
        self.record.position().map_or(0, csv::Position::line)
    }

    /// Non-empty cell of `column`.
    pub fn text(&self, column: Option<usize>) -> Option<&'a str> {
        let value = self.record.get(column?)?.trim();
        (!value.is_empty()).then_some(value)
    }

    /// Numeric cell; thousands separators and a trailing `%` are ignored.
    ///
    /// Unparseable values are logged and read as absent.
    pub fn number(&self, field: &str, column: Option<usize>) -> Option<f64> {
        let raw = self.text(column)?;
        let parsed = parse_number(raw);
        if parsed.is_none() {
            tracing::warn!(
                path = %self.table.path.display(),
                line = self.line(),
                field,
                value = raw,
                "ignoring non-numeric value"
            );
        }
        parsed
    }

    /// Date cell in one of the accepted formats; unparseable dates are absent.
    pub fn date(&self, field: &str, column: Option<usize>) -> Option<NaiveDate> {
        let raw = self.text(column)?;
        let parsed = parse_date(raw);
        if parsed.is_none() {
            tracing::warn!(
                path = %self.table.path.display(),
                line = self.line(),
                field,
                value = raw,
                "ignoring unrecognised date"
            );
        }
        parsed
    }

    /// Error for a cell that cannot be used.
    pub fn invalid(&self, field: &str, value: &str) -> IngestError {
        IngestError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            path: self.table.path.clone(),
            line: self.line(),
        }
    }
}

pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Spreadsheet exports often append a midnight time.
    let day = raw.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(day, format).ok())
}

fn open_error(path: &Path, err: csv::Error) -> IngestError {
    if let csv::ErrorKind::Io(io) = err.kind()
        && io.kind() == std::io::ErrorKind::NotFound
    {
        return IngestError::FileNotFound {
            path: path.to_path_buf(),
        };
    }
    match err.into_kind() {
        csv::ErrorKind::Io(source) => IngestError::FileRead {
            path: path.to_path_buf(),
            source,
        },
        other => IngestError::CsvParse {
            path: path.to_path_buf(),
            message: format!("{other:?}"),
        },
    }
}

fn parse_error(path: &Path, err: &csv::Error) -> IngestError {
    IngestError::CsvParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
