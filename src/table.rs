//! In-memory time series table.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt;

/// Name of the numeric column every stage operates on.
pub const VALUE_COLUMN: &str = "value";
/// Name of the ordering key, as an index name or as a plain column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

const NA_TOKENS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Row label of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKey {
    Timestamp(NaiveDateTime),
    Position(usize),
}

impl RowKey {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            RowKey::Timestamp(ts) => Some(*ts),
            RowKey::Position(_) => None,
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            RowKey::Position(pos) => write!(f, "{pos}"),
        }
    }
}

/// Parse a timestamp the way the CSV exports write them.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_utc());
    }
    if let Some(ts) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(ts);
    }
    Err(Error::InvalidTimestamp {
        value: raw.to_owned(),
    })
}

/// Ordering key of a table: one label per row plus an optional name.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    name: Option<String>,
    keys: Vec<RowKey>,
}

impl Index {
    pub fn timestamps(name: &str, timestamps: Vec<NaiveDateTime>) -> Self {
        Self {
            name: Some(name.to_owned()),
            keys: timestamps.into_iter().map(RowKey::Timestamp).collect(),
        }
    }

    /// Unnamed index labelling rows `0..len`.
    pub fn positional(len: usize) -> Self {
        Self {
            name: None,
            keys: (0..len).map(RowKey::Position).collect(),
        }
    }

    pub fn from_keys(name: Option<&str>, keys: Vec<RowKey>) -> Self {
        Self {
            name: name.map(str::to_owned),
            keys,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Timestamps of every row, or `None` if any row has a positional key.
    pub fn as_timestamps(&self) -> Option<Vec<NaiveDateTime>> {
        self.keys.iter().map(RowKey::timestamp).collect()
    }
}

/// Single field of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Parse a raw CSV field.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NA_TOKENS.contains(&trimmed) {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(num) => Cell::Number(num),
            Err(_) => Cell::Text(raw.to_owned()),
        }
    }

    /// Numeric coercion: missing, NaN and unparseable text all give `None`.
    pub fn to_numeric(&self) -> Option<f64> {
        let num = match self {
            Cell::Missing => return None,
            Cell::Number(num) => *num,
            Cell::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        (!num.is_nan()).then_some(num)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Missing, Cell::Number)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: &str, cells: Vec<Cell>) -> Self {
        Self {
            name: name.to_owned(),
            cells,
        }
    }
}

/// Rows of labelled cells sharing one index.
///
/// Every column holds exactly one cell per index key.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    index: Index,
    columns: Vec<Column>,
}

impl TimeSeriesTable {
    /// Build a table, checking that all columns match the index length.
    ///
    /// # Panics
    /// Panics if a column length differs from the index length.
    pub fn new(index: Index, columns: Vec<Column>) -> Self {
        for column in &columns {
            assert_eq!(
                column.cells.len(),
                index.len(),
                "column '{}' length does not match the index",
                column.name
            );
        }
        Self { index, columns }
    }

    /// Table indexed by `timestamp` with a single nullable `value` column.
    pub fn from_readings<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDateTime, Option<f64>)>,
    {
        let (timestamps, values): (Vec<_>, Vec<_>) = readings.into_iter().unzip();
        let cells = values.into_iter().map(Cell::from).collect();
        Self::new(
            Index::timestamps(TIMESTAMP_COLUMN, timestamps),
            vec![Column::new(VALUE_COLUMN, cells)],
        )
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|col| col.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|col| col.name == name)
            .ok_or_else(|| Error::missing_column(name))
    }

    /// Explicit numeric coercion of a column.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self.column(name)?;
        Ok(column.cells.iter().map(Cell::to_numeric).collect())
    }

    /// Replace the cells of an existing column, or append a new one.
    ///
    /// # Panics
    /// Panics if `cells` does not match the index length.
    pub fn set_column(&mut self, name: &str, cells: Vec<Cell>) {
        assert_eq!(cells.len(), self.len(), "column '{name}' length does not match the index");
        match self.columns.iter_mut().find(|col| col.name == name) {
            Some(column) => column.cells = cells,
            None => self.columns.push(Column::new(name, cells)),
        }
    }

    /// Stable sort of all rows by their index key.
    pub fn sort_by_index(&mut self) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i_row| self.index.keys[i_row]);
        if order.iter().enumerate().all(|(pos, &i_row)| pos == i_row) {
            return;
        }

        self.index.keys = order.iter().map(|&i_row| self.index.keys[i_row]).collect();
        for column in &mut self.columns {
            column.cells = order.iter().map(|&i_row| column.cells[i_row].clone()).collect();
        }
    }

    /// Use a column of timestamps as the index, removing it from the columns.
    pub fn set_index_from_column(mut self, name: &str) -> Result<Self> {
        let pos = self
            .columns
            .iter()
            .position(|col| col.name == name)
            .ok_or_else(|| Error::missing_column(name))?;

        let timestamps = self.columns[pos]
            .cells
            .iter()
            .map(|cell| match cell {
                Cell::Text(raw) => parse_timestamp(raw),
                Cell::Number(num) => parse_timestamp(&num.to_string()),
                Cell::Missing => Err(Error::InvalidTimestamp {
                    value: String::new(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        self.columns.remove(pos);
        self.index = Index::timestamps(name, timestamps);
        Ok(self)
    }
}
