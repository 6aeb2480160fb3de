use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::stats::compute_mean;
use crate::table::{Cell, TimeSeriesTable, VALUE_COLUMN};
use crate::window::Window;

/// Fills gaps in the `value` column with a trailing rolling mean.
///
/// Each missing reading takes the mean of the present readings in the
/// window ending at its row (at least one present reading is enough). Gaps
/// the window cannot cover fall back to the mean of the whole column after
/// the first pass. If the column has no present reading at all, that
/// fallback is NaN and is written as such.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Imputer {
    window: Window,
}

impl Imputer {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    pub fn impute(&self, mut table: TimeSeriesTable, log: &Logger<'_>) -> Result<TimeSeriesTable> {
        if !table.has_column(VALUE_COLUMN) {
            return Err(Error::missing_column(VALUE_COLUMN));
        }
        log.info(format_args!(
            "handling missing values using rolling mean with window {}",
            self.window
        ));

        table.sort_by_index();
        let vals = table.numeric_column(VALUE_COLUMN)?;
        let timestamps = table.index().as_timestamps();
        let starts = self.window.starts(vals.len(), timestamps.as_deref())?;

        let mut n_rolling = 0;
        let mut filled: Vec<Option<f64>> = Vec::with_capacity(vals.len());
        for (i_row, val) in vals.iter().enumerate() {
            let val = val.or_else(|| rolling_mean(&vals[starts[i_row]..=i_row]));
            if vals[i_row].is_none() && val.is_some() {
                n_rolling += 1;
            }
            filled.push(val);
        }

        let n_remaining = filled.iter().filter(|val| val.is_none()).count();
        let fallback = if n_remaining > 0 {
            let present: Vec<f64> = filled.iter().flatten().copied().collect();
            let fallback = compute_mean(&present);
            log.warn(format_args!(
                "{n_remaining} values not covered by the window, using column mean {fallback:.6}"
            ));
            if fallback.is_nan() {
                log.warn(format_args!(
                    "column '{VALUE_COLUMN}' has no valid values left to average"
                ));
            }
            fallback
        } else {
            f64::NAN
        };

        let cells = filled
            .into_iter()
            .map(|val| Cell::Number(val.unwrap_or(fallback)))
            .collect();
        table.set_column(VALUE_COLUMN, cells);

        log.info(format_args!(
            "filled {} missing values ({n_rolling} from the rolling mean)",
            n_rolling + n_remaining
        ));
        Ok(table)
    }
}

/// Mean of the present values of a window, `None` if there are none.
fn rolling_mean(window: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = window
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), val| (sum + val, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, Index, TIMESTAMP_COLUMN};
    use crate::testing::{CaptureSink, minutes, positional, readings};
    use chrono::TimeDelta;
    use log::Level;

    fn values(table: &TimeSeriesTable) -> Vec<f64> {
        table
            .column(VALUE_COLUMN)
            .unwrap()
            .cells
            .iter()
            .map(|cell| match cell {
                Cell::Number(val) => *val,
                other => panic!("unexpected cell {other:?}"),
            })
            .collect()
    }

    fn impute(window: Window, table: TimeSeriesTable) -> (Result<TimeSeriesTable>, CaptureSink) {
        let sink = CaptureSink::default();
        let result = Imputer::new(window).impute(table, &Logger::new(&sink, "test"));
        (result, sink)
    }

    #[test]
    fn fills_gap_from_previous_row() {
        let (table, _) = impute(Window::RowCount(2), readings(&[Some(1.0), None, Some(3.0)]));
        assert_eq!(values(&table.unwrap()), vec![1.0, 1.0, 3.0]);
    }

    #[test]
    fn rolling_mean_uses_present_values_in_window() {
        let table = readings(&[Some(2.0), Some(4.0), Some(9.0), None]);
        let (table, _) = impute(Window::RowCount(3), table);
        assert_eq!(values(&table.unwrap()), vec![2.0, 4.0, 9.0, 6.5]);
    }

    #[test]
    fn falls_back_to_column_mean() {
        let table = readings(&[Some(4.0), None, None, None, Some(8.0)]);
        let (table, sink) = impute(Window::RowCount(2), table);
        // Row 2 sees rows 1..=2, both missing; the column mean is taken after
        // row 1 was filled with 4.0.
        let vals = values(&table.unwrap());
        assert_eq!(vals[1], 4.0);
        let fallback = (4.0 + 4.0 + 8.0) / 3.0;
        assert!((vals[2] - fallback).abs() < 1e-12);
        assert!((vals[3] - fallback).abs() < 1e-12);
        assert_eq!(vals[4], 8.0);
        assert!(sink.contains(Level::Warn, "2 values not covered"));
    }

    #[test]
    fn all_missing_stays_nan() {
        let (table, sink) = impute(Window::RowCount(3), readings(&[None, None]));
        assert!(values(&table.unwrap()).iter().all(|val| val.is_nan()));
        assert!(sink.contains(Level::Warn, "no valid values"));
    }

    #[test]
    fn sorts_by_timestamp_before_rolling() {
        let index = Index::timestamps(TIMESTAMP_COLUMN, vec![minutes(2), minutes(0), minutes(1)]);
        let table = TimeSeriesTable::new(
            index,
            vec![Column::new(VALUE_COLUMN, vec![Cell::Missing, Cell::Number(10.0), Cell::Number(20.0)])],
        );
        let (table, _) = impute(Window::RowCount(2), table);
        let table = table.unwrap();
        assert_eq!(
            table.index().as_timestamps().unwrap(),
            vec![minutes(0), minutes(1), minutes(2)]
        );
        assert_eq!(values(&table), vec![10.0, 20.0, 20.0]);
    }

    #[test]
    fn time_span_window() {
        let index = Index::timestamps(
            TIMESTAMP_COLUMN,
            vec![minutes(0), minutes(1), minutes(2), minutes(10), minutes(11)],
        );
        let table = TimeSeriesTable::new(
            index,
            vec![Column::new(
                VALUE_COLUMN,
                vec![Cell::Number(1.0), Cell::Number(3.0), Cell::Missing, Cell::Number(7.0), Cell::Missing],
            )],
        );
        let (table, _) = impute(Window::TimeSpan(TimeDelta::minutes(2)), table);
        // Row 2 sees minutes 1..=2; row 4 sees minutes 10..=11.
        assert_eq!(values(&table.unwrap()), vec![1.0, 3.0, 3.0, 7.0, 7.0]);
    }

    #[test]
    fn unparseable_text_counts_as_missing() {
        let table = TimeSeriesTable::new(
            Index::positional(3),
            vec![Column::new(VALUE_COLUMN, vec![Cell::Number(2.0), "oops".into(), "4".into()])],
        );
        let (table, _) = impute(Window::RowCount(5), table);
        assert_eq!(values(&table.unwrap()), vec![2.0, 2.0, 4.0]);
    }

    #[test]
    fn time_span_on_positional_index_is_rejected() {
        let (result, _) = impute(Window::TimeSpan(TimeDelta::minutes(2)), positional(&[1.0]));
        assert!(matches!(result, Err(Error::InvalidWindow { .. })));
    }

    #[test]
    fn missing_value_column() {
        let table = TimeSeriesTable::new(
            Index::positional(1),
            vec![Column::new("other", vec![Cell::Number(1.0)])],
        );
        let (result, _) = impute(Window::RowCount(2), table);
        assert!(matches!(result, Err(Error::MissingColumn { column }) if column == VALUE_COLUMN));
    }

    #[test]
    fn complete_column_is_unchanged() {
        let table = readings(&[Some(1.5), Some(-2.0), Some(8.25)]);
        let (imputed, sink) = impute(Window::RowCount(2), table.clone());
        assert_eq!(imputed.unwrap(), table);
        assert!(!sink.lines().iter().any(|(level, _, _)| *level == Level::Warn));
    }

    #[test]
    fn imputing_twice_changes_nothing() {
        let table = readings(&[None, Some(1.0), None, None, Some(5.0), None]);
        let (once, _) = impute(Window::RowCount(2), table);
        let once = once.unwrap();
        let (twice, _) = impute(Window::RowCount(2), once.clone());
        assert_eq!(twice.unwrap(), once);
    }
}
