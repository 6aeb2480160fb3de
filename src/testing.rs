use crate::table::{Column, Index, TimeSeriesTable, VALUE_COLUMN};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use log::{Level, Log, Metadata, Record};
use std::sync::Mutex;

/// `2025-01-01 00:00:00` plus `n` minutes.
pub fn minutes(n: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid base timestamp")
        + TimeDelta::minutes(n)
}

/// One reading per minute, starting at `2025-01-01 00:00:00`.
pub fn readings(values: &[Option<f64>]) -> TimeSeriesTable {
    TimeSeriesTable::from_readings(
        values
            .iter()
            .enumerate()
            .map(|(i, &val)| (minutes(i as i64), val)),
    )
}

/// Positionally indexed table with a single `value` column.
pub fn positional(values: &[f64]) -> TimeSeriesTable {
    TimeSeriesTable::new(
        Index::positional(values.len()),
        vec![Column::new(
            VALUE_COLUMN,
            values.iter().map(|&val| val.into()).collect(),
        )],
    )
}

/// Log sink that keeps every record in memory.
#[derive(Default)]
pub struct CaptureSink {
    lines: Mutex<Vec<(Level, String, String)>>,
}

impl CaptureSink {
    pub fn lines(&self) -> Vec<(Level, String, String)> {
        self.lines.lock().expect("capture lock poisoned").clone()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(lvl, _, msg)| *lvl == level && msg.contains(needle))
    }
}

impl Log for CaptureSink {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.lines.lock().expect("capture lock poisoned").push((
            record.level(),
            record.target().to_owned(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}
