use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::stats::Accumulator;
use crate::table::{TimeSeriesTable, VALUE_COLUMN};

/// Reference distribution of normal readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineParams {
    pub mean: f64,
    /// Sample standard deviation, NaN when estimated from a single value.
    pub std: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineEstimator;

impl BaselineEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Mean and sample standard deviation of the coercible `value` entries.
    pub fn estimate(&self, table: &TimeSeriesTable, log: &Logger<'_>) -> Result<BaselineParams> {
        if table.is_empty() {
            return Err(Error::EmptyDataset);
        }
        let vals = table.numeric_column(VALUE_COLUMN)?;

        let mut acc = Accumulator::new();
        acc.extend(vals.into_iter().flatten());
        if acc.n_vals() == 0 {
            return Err(Error::NoValidData {
                column: VALUE_COLUMN.to_owned(),
            });
        }

        let report = acc.report();
        let params = BaselineParams {
            mean: report.mean,
            std: report.std_dev,
        };
        log.info(format_args!(
            "baseline -> mean={:.6}, std={:.6} ({} values)",
            params.mean, params.std, report.n_vals
        ));
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, Column, Index};
    use crate::testing::{CaptureSink, readings};
    use log::Level;

    fn estimate(table: &TimeSeriesTable) -> Result<BaselineParams> {
        let sink = CaptureSink::default();
        BaselineEstimator::new().estimate(table, &Logger::new(&sink, "test"))
    }

    #[test]
    fn mean_and_sample_std() {
        let params = estimate(&readings(&[Some(1.0), Some(2.0), Some(3.0)])).unwrap();
        assert!((params.mean - 2.0).abs() < 1e-9);
        assert!((params.std - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ignores_entries_that_do_not_coerce() {
        let table = TimeSeriesTable::new(
            Index::positional(4),
            vec![Column::new(
                VALUE_COLUMN,
                vec![Cell::Number(1.0), "n/a?".into(), "3".into(), Cell::Missing],
            )],
        );
        let params = estimate(&table).unwrap();
        assert_eq!(params.mean, 2.0);
        assert!((params.std - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn single_value_has_nan_std() {
        let params = estimate(&readings(&[Some(5.0)])).unwrap();
        assert_eq!(params.mean, 5.0);
        assert!(params.std.is_nan());
    }

    #[test]
    fn missing_value_column() {
        let table = TimeSeriesTable::new(
            Index::positional(3),
            vec![Column::new("other", vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)])],
        );
        assert!(matches!(estimate(&table), Err(Error::MissingColumn { .. })));
    }

    #[test]
    fn empty_dataset() {
        assert!(matches!(estimate(&readings(&[])), Err(Error::EmptyDataset)));
    }

    #[test]
    fn no_valid_data() {
        let table = TimeSeriesTable::new(
            Index::positional(2),
            vec![Column::new(VALUE_COLUMN, vec!["x".into(), Cell::Missing])],
        );
        assert!(matches!(estimate(&table), Err(Error::NoValidData { .. })));
    }

    #[test]
    fn logs_a_summary() {
        let sink = CaptureSink::default();
        BaselineEstimator::new()
            .estimate(&readings(&[Some(1.0), Some(3.0)]), &Logger::new(&sink, "test"))
            .unwrap();
        assert!(sink.contains(Level::Info, "mean=2.000000"));
    }
}
