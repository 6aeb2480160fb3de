use thiserror::Error;

/// Boxed source error of a failed load or save.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structural and I/O failures of the cleaning and detection stages.
///
/// Gaps in the data itself (missing readings) are not errors: the imputer
/// fills them. Everything here aborts the operation that detected it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("column '{column}' is missing")]
    MissingColumn { column: String },

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("column '{column}' contains no valid numeric entries")]
    NoValidData { column: String },

    #[error("cannot parse '{value}' as a timestamp")]
    InvalidTimestamp { value: String },

    #[error("invalid window '{token}': {reason}")]
    InvalidWindow { token: String, reason: String },

    #[error("malformed CSV")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to load {location}")]
    Load {
        location: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to save {location}")]
    Save {
        location: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    pub(crate) fn missing_column(column: &str) -> Self {
        Self::MissingColumn {
            column: column.to_owned(),
        }
    }

    pub(crate) fn invalid_window(token: &str, reason: impl Into<String>) -> Self {
        Self::InvalidWindow {
            token: token.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Result type for pipeline components.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn missing_column_names_the_column() {
        let error = Error::missing_column("value");
        assert_eq!(error.to_string(), "column 'value' is missing");
    }

    #[test]
    fn invalid_window_display() {
        let error = Error::invalid_window("2lightyears", "unknown unit 'lightyears'");
        assert_eq!(
            error.to_string(),
            "invalid window '2lightyears': unknown unit 'lightyears'"
        );
    }

    #[test]
    fn load_keeps_its_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such key");
        let error = Error::Load {
            location: "s3://bucket/train.csv".to_owned(),
            source: Box::new(io),
        };
        assert_eq!(error.to_string(), "failed to load s3://bucket/train.csv");
        let source = error.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("no such key"));
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
