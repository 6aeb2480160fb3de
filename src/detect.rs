use crate::baseline::BaselineParams;
use crate::error::Result;
use crate::logging::Logger;
use crate::table::{
    Cell, Column, Index, RowKey, TIMESTAMP_COLUMN, TimeSeriesTable, VALUE_COLUMN, parse_timestamp,
};

/// Column holding the explanation of each flagged reading.
pub const REASON_COLUMN: &str = "reason";

/// Reading that fell outside the normal band.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRecord {
    pub key: RowKey,
    pub value: f64,
    pub reason: String,
}

/// Flags readings outside `mean ± k·std` of a baseline.
///
/// A zero standard deviation collapses the band to the mean itself, so any
/// reading different from the mean is flagged, including readings that are
/// not numbers at all. A NaN standard deviation (baseline from a single
/// value) flags nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    baseline: BaselineParams,
    threshold_multiplier: f64,
}

impl AnomalyDetector {
    pub fn new(baseline: BaselineParams, threshold_multiplier: f64) -> Self {
        Self {
            baseline,
            threshold_multiplier,
        }
    }

    /// Lower and upper bound of the normal band.
    pub fn bounds(&self) -> (f64, f64) {
        let BaselineParams { mean, std } = self.baseline;
        if std == 0.0 {
            (mean, mean)
        } else {
            let half_width = self.threshold_multiplier * std;
            (mean - half_width, mean + half_width)
        }
    }

    pub fn is_anomalous(&self, val: f64) -> bool {
        if self.baseline.std == 0.0 {
            return val != self.baseline.mean;
        }
        let (lower, upper) = self.bounds();
        val < lower || val > upper
    }

    /// Flag the rows of `table` whose `value` falls outside the band.
    ///
    /// Rows are labelled by the `timestamp` index when there is one, else by a
    /// `timestamp` column, else by their existing index keys (with a warning).
    /// Values that do not coerce to a number are reported as NaN when the band
    /// has zero width and skipped otherwise.
    pub fn detect(&self, table: &TimeSeriesTable, log: &Logger<'_>) -> Result<Vec<AnomalyRecord>> {
        let vals = table.numeric_column(VALUE_COLUMN)?;
        let keys = resolve_keys(table, log)?;
        let (lower, upper) = self.bounds();
        let zero_variance = self.baseline.std == 0.0;

        let mut n_skipped = 0;
        let mut anomalies = Vec::new();
        for (key, val) in keys.into_iter().zip(vals) {
            let val = match val {
                Some(val) => val,
                None if zero_variance => f64::NAN,
                None => {
                    n_skipped += 1;
                    continue;
                }
            };
            if self.is_anomalous(val) {
                anomalies.push(AnomalyRecord {
                    key,
                    value: val,
                    reason: format!(
                        "Value {val:.2} is outside the normal range [{lower:.2}, {upper:.2}]"
                    ),
                });
            }
        }

        if n_skipped > 0 {
            log.debug(format_args!("skipped {n_skipped} rows without a numeric value"));
        }
        log.info(format_args!("detected anomalies: {}", anomalies.len()));
        Ok(anomalies)
    }
}

fn resolve_keys(table: &TimeSeriesTable, log: &Logger<'_>) -> Result<Vec<RowKey>> {
    if table.index().name() == Some(TIMESTAMP_COLUMN) {
        return Ok(table.index().keys().to_vec());
    }
    if table.has_column(TIMESTAMP_COLUMN) {
        return table
            .column(TIMESTAMP_COLUMN)?
            .cells
            .iter()
            .map(|cell| {
                let raw = match cell {
                    Cell::Text(raw) => raw.clone(),
                    Cell::Number(num) => num.to_string(),
                    Cell::Missing => String::new(),
                };
                parse_timestamp(&raw).map(RowKey::Timestamp)
            })
            .collect();
    }
    log.warn(format_args!(
        "no '{TIMESTAMP_COLUMN}' index or column found; using the existing index"
    ));
    Ok(table.index().keys().to_vec())
}

/// Anomaly report as a table indexed by `timestamp` with `value` and `reason`.
pub fn anomalies_to_table(anomalies: &[AnomalyRecord]) -> TimeSeriesTable {
    let keys = anomalies.iter().map(|rec| rec.key).collect();
    let values = anomalies.iter().map(|rec| Cell::Number(rec.value)).collect();
    let reasons = anomalies
        .iter()
        .map(|rec| Cell::Text(rec.reason.clone()))
        .collect();
    TimeSeriesTable::new(
        Index::from_keys(Some(TIMESTAMP_COLUMN), keys),
        vec![
            Column::new(VALUE_COLUMN, values),
            Column::new(REASON_COLUMN, reasons),
        ],
    )
}
