//! Rolling window descriptors.

use crate::error::{Error, Result};
use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;

/// Trailing window used by the rolling mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// The current row and up to `n - 1` rows before it.
    RowCount(usize),
    /// Rows with timestamps in `(t - span, t]`, ending at the current row.
    TimeSpan(TimeDelta),
}

impl Window {
    /// Resolve a window token.
    ///
    /// A token made only of digits is a row count. Anything else is a time
    /// span built from `<integer><unit>` parts, e.g. `2min` or `1h30min`.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::invalid_window(token, "window is empty"));
        }
        if token.bytes().all(|b| b.is_ascii_digit()) {
            let n_rows = token
                .parse::<usize>()
                .map_err(|err| Error::invalid_window(token, err.to_string()))?;
            return Self::rows(n_rows);
        }
        parse_span(token).map(Window::TimeSpan)
    }

    pub fn rows(n_rows: usize) -> Result<Self> {
        if n_rows == 0 {
            return Err(Error::invalid_window("0", "window must be positive"));
        }
        Ok(Window::RowCount(n_rows))
    }

    /// First row of the window ending at each row.
    ///
    /// `timestamps` must be sorted ascending; it is only required by
    /// [`Window::TimeSpan`].
    pub(crate) fn starts(
        &self,
        n_rows: usize,
        timestamps: Option<&[NaiveDateTime]>,
    ) -> Result<Vec<usize>> {
        match *self {
            Window::RowCount(size) => {
                Ok((0..n_rows).map(|i| (i + 1).saturating_sub(size)).collect())
            }
            Window::TimeSpan(span) => {
                let timestamps = timestamps.ok_or_else(|| {
                    Error::invalid_window(
                        &self.to_string(),
                        "time-based window requires a timestamp index",
                    )
                })?;
                let mut starts = Vec::with_capacity(timestamps.len());
                let mut start = 0;
                for (i, &ts) in timestamps.iter().enumerate() {
                    while start < i && timestamps[start] <= ts - span {
                        start += 1;
                    }
                    starts.push(start);
                }
                Ok(starts)
            }
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::RowCount(n_rows) => write!(f, "{n_rows} rows"),
            Window::TimeSpan(span) => match span.num_nanoseconds() {
                Some(nanos) if nanos % 1_000_000_000 != 0 => write!(f, "{nanos}ns"),
                _ => write!(f, "{}s", span.num_seconds()),
            },
        }
    }
}

fn unit_nanos(unit: &str) -> Option<i64> {
    let nanos = match unit {
        "ns" | "N" => 1,
        "us" | "U" | "µs" => 1_000,
        "ms" | "L" => 1_000_000,
        "s" | "S" | "sec" => 1_000_000_000,
        "min" | "T" => 60 * 1_000_000_000,
        "h" | "H" | "hour" => 3_600 * 1_000_000_000,
        "D" | "d" | "day" => 86_400 * 1_000_000_000,
        _ => return None,
    };
    Some(nanos)
}

fn parse_span(token: &str) -> Result<TimeDelta> {
    let mut total: i64 = 0;
    let mut rest = token;
    while !rest.is_empty() {
        let n_digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (amount, tail) = rest.split_at(n_digits);
        let n_unit = tail
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit())
            .map_or(tail.len(), |(pos, _)| pos);
        let (unit, tail) = tail.split_at(n_unit);

        if unit.is_empty() {
            return Err(Error::invalid_window(token, "missing time unit"));
        }
        let nanos = unit_nanos(unit)
            .ok_or_else(|| Error::invalid_window(token, format!("unknown unit '{unit}'")))?;
        let amount = if amount.is_empty() {
            1
        } else {
            amount
                .parse::<i64>()
                .map_err(|err| Error::invalid_window(token, err.to_string()))?
        };

        total = amount
            .checked_mul(nanos)
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| Error::invalid_window(token, "window is too large"))?;
        rest = tail;
    }

    if total == 0 {
        return Err(Error::invalid_window(token, "window must be positive"));
    }
    Ok(TimeDelta::nanoseconds(total))
}
