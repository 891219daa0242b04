use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{ReportError, Result};
use crate::event::RawEvent;

/// Where case rows come from
///
/// Implementations resolve the whole table before returning. A failure is
/// fatal for the render that asked; callers never aggregate a partial log.
pub trait LogSource: Send + Sync {
    /// All rows of the named log table, in source order
    fn fetch(&self, table: &str) -> Result<Vec<RawEvent>>;

    /// Last non-empty value of `column` in `table`, if any
    fn latest_value(&self, table: &str, column: &str) -> Result<Option<String>>;
}

/// Column names used to pick the event fields out of a table
#[derive(Clone, Debug)]
pub struct ColumnMap {
    pub timestamp: String,
    pub outcome: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            timestamp: "Created".to_string(),
            outcome: "Response".to_string(),
        }
    }
}

/// Reads tables exported as `<dir>/<table>.csv`, first line is the header
#[derive(Clone, Debug)]
pub struct CsvLogSource {
    dir: PathBuf,
    columns: ColumnMap,
}

impl CsvLogSource {
    pub fn new(dir: impl Into<PathBuf>, columns: ColumnMap) -> Self {
        CsvLogSource {
            dir: dir.into(),
            columns,
        }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", table))
    }

    fn read_table(&self, table: &str) -> Result<CsvTable> {
        let path = self.table_path(table);
        debug!("reading log table {} from {}", table, path.display());
        let file = File::open(&path).map_err(|e| source_error(&path, e))?;
        CsvTable::read(BufReader::new(file)).map_err(|e| source_error(&path, e))
    }
}

impl LogSource for CsvLogSource {
    fn fetch(&self, table: &str) -> Result<Vec<RawEvent>> {
        let csv = self.read_table(table)?;
        let created = csv.column(&self.columns.timestamp, table)?;
        let response = csv.column(&self.columns.outcome, table)?;

        let events: Vec<RawEvent> = csv
            .rows
            .iter()
            .enumerate()
            .map(|(i, fields)| {
                RawEvent::new(
                    i + 1,
                    fields.get(created).cloned().unwrap_or_default(),
                    fields.get(response).cloned().unwrap_or_default(),
                )
            })
            .collect();

        info!("fetched {} rows from log table {}", events.len(), table);
        Ok(events)
    }

    fn latest_value(&self, table: &str, column: &str) -> Result<Option<String>> {
        let csv = self.read_table(table)?;
        let idx = csv.column(column, table)?;
        Ok(csv
            .rows
            .iter()
            .rev()
            .filter_map(|fields| fields.get(idx))
            .find(|value| !value.trim().is_empty())
            .cloned())
    }
}

/// Tables held in memory, keyed by name
#[derive(Clone, Debug, Default)]
pub struct MemoryLogSource {
    tables: HashMap<String, Vec<RawEvent>>,
    notes: HashMap<String, Vec<String>>,
}

impl MemoryLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: impl Into<String>, events: Vec<RawEvent>) -> Self {
        self.tables.insert(table.into(), events);
        self
    }

    pub fn with_notes(mut self, table: impl Into<String>, notes: Vec<String>) -> Self {
        self.notes.insert(table.into(), notes);
        self
    }
}

impl LogSource for MemoryLogSource {
    fn fetch(&self, table: &str) -> Result<Vec<RawEvent>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| ReportError::SourceUnavailable(format!("no table named {}", table)))
    }

    fn latest_value(&self, table: &str, _column: &str) -> Result<Option<String>> {
        let notes = self
            .notes
            .get(table)
            .ok_or_else(|| ReportError::SourceUnavailable(format!("no table named {}", table)))?;
        Ok(notes.iter().rev().find(|n| !n.trim().is_empty()).cloned())
    }
}

fn source_error(path: &Path, err: io::Error) -> ReportError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            ReportError::AuthenticationFailed(format!("{}: {}", path.display(), err))
        }
        _ => ReportError::SourceUnavailable(format!("{}: {}", path.display(), err)),
    }
}

struct CsvTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    fn read(mut reader: impl Read) -> io::Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        let mut records = parse_csv_records(&text).into_iter();
        let header = match records.next() {
            Some(fields) => fields
                .into_iter()
                .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
                .collect(),
            None => return Err(io::Error::new(io::ErrorKind::InvalidData, "CSV file is empty")),
        };

        Ok(CsvTable {
            header,
            rows: records.collect(),
        })
    }

    fn column(&self, name: &str, table: &str) -> Result<usize> {
        self.header.iter().position(|h| h == name).ok_or_else(|| {
            ReportError::Config(format!("log table {} has no column named {}", table, name))
        })
    }
}

// Split CSV text into records, honouring quotes and doubled quotes inside
// them. A quoted field may span lines; whitespace-only lines are dropped.
fn parse_csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut blank = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                blank = false;
                if in_quotes && chars.peek() == Some(&'"') {
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                blank = false;
                record.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut current_field));
                if blank {
                    record.clear();
                } else {
                    records.push(std::mem::take(&mut record));
                }
                blank = true;
            }
            _ => {
                if !c.is_whitespace() {
                    blank = false;
                }
                current_field.push(c);
            }
        }
    }

    if !blank {
        record.push(current_field);
        records.push(record);
    }
    records
}
