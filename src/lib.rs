//! Cleaning and anomaly detection for sensor time series stored as CSV.
//!
//! The cleaning stage fills missing readings with a trailing rolling mean
//! ([`Imputer`]). The detection stage derives a baseline from the cleaned
//! training data ([`BaselineEstimator`]) and flags test readings outside
//! `mean ± k·std` ([`AnomalyDetector`]). [`Pipeline`] wires both stages to a
//! [`DatasetStore`].

pub mod baseline;
pub mod codec;
pub mod config;
pub mod detect;
pub mod error;
pub mod impute;
pub mod logging;
pub mod pipeline;
pub mod stats;
pub mod store;
pub mod table;
pub mod window;

#[cfg(test)]
mod testing;

pub use baseline::{BaselineEstimator, BaselineParams};
pub use config::Config;
pub use detect::{AnomalyDetector, AnomalyRecord};
pub use error::{Error, Result};
pub use impute::Imputer;
pub use logging::Logger;
pub use pipeline::Pipeline;
pub use store::{DatasetStore, FsStore, MemoryStore};
pub use table::{Cell, RowKey, TimeSeriesTable};
pub use window::Window;
