use crate::baseline::BaselineEstimator;
use crate::config::Config;
use crate::detect::{AnomalyDetector, anomalies_to_table};
use crate::error::Error;
use crate::impute::Imputer;
use crate::logging::Logger;
use crate::store::{DatasetStore, location};
use crate::table::TimeSeriesTable;
use anyhow::{Context, Result};

const CLEAN_TARGET: &str = "sensorwatch::clean";
const DETECT_TARGET: &str = "sensorwatch::detect";

/// Cleaning and detection jobs over one store and configuration.
pub struct Pipeline<'a, S> {
    cfg: Config,
    store: S,
    log: Logger<'a>,
}

impl<'a, S: DatasetStore> Pipeline<'a, S> {
    pub fn new(cfg: Config, store: S, log: Logger<'a>) -> Self {
        Self { cfg, store, log }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fill the gaps of the training set, and of the test set when a cleaned
    /// test key is configured.
    pub fn clean_data(&self) -> Result<()> {
        let log = self.log.scoped(CLEAN_TARGET);
        log.info(format_args!("starting data cleaning"));

        let window = self.cfg.window().context("failed to resolve window size")?;
        let imputer = Imputer::new(window);

        let datasets = &self.cfg.datasets;
        let input_key = datasets
            .train_input
            .as_deref()
            .context("training input dataset is not configured")?;
        let output_key = datasets
            .train_clean
            .as_deref()
            .context("cleaned training dataset is not configured")?;
        self.clean_dataset(&imputer, input_key, output_key, &log)
            .context("failed to clean training dataset")?;

        if let (Some(input_key), Some(output_key)) =
            (datasets.test_input.as_deref(), datasets.test_clean.as_deref())
        {
            self.clean_dataset(&imputer, input_key, output_key, &log)
                .context("failed to clean test dataset")?;
        }

        log.info(format_args!("data cleaning completed"));
        Ok(())
    }

    /// Flag test readings outside the training baseline and save the report.
    ///
    /// Returns the number of anomalies found.
    pub fn detect_anomalies(&self) -> Result<usize> {
        let log = self.log.scoped(DETECT_TARGET);
        log.info(format_args!("start finding anomalies"));

        let bucket = &self.cfg.storage.bucket;
        let train_key = self.cfg.train_key_for_detection()?;
        let train = self.load(train_key, &log)?;
        let baseline = BaselineEstimator::new()
            .estimate(&train, &log)
            .with_context(|| {
                format!("failed to compute baseline from {}", location(bucket, train_key))
            })?;

        let test_key = self.cfg.test_key_for_detection()?;
        let test = self.load(test_key, &log)?;
        let detector = AnomalyDetector::new(baseline, self.cfg.detection.threshold_multiplier);
        let anomalies = detector
            .detect(&test, &log)
            .with_context(|| {
                format!("failed to detect anomalies in {}", location(bucket, test_key))
            })?;

        let report = anomalies_to_table(&anomalies);
        self.save(&report, &self.cfg.datasets.test_anomalies, &log)?;

        Ok(anomalies.len())
    }

    /// Run the cleaning job, then the detection job.
    pub fn run_all(&self) -> Result<usize> {
        self.log.info(format_args!("starting the complete anomaly detection process"));
        self.clean_data().context("cleaning stage failed")?;
        let n_anomalies = self.detect_anomalies().context("detection stage failed")?;
        self.log.info(format_args!("the complete anomaly detection process finished"));
        Ok(n_anomalies)
    }

    fn clean_dataset(
        &self,
        imputer: &Imputer,
        input_key: &str,
        output_key: &str,
        log: &Logger<'_>,
    ) -> Result<()> {
        let table = self.load(input_key, log)?;
        let table = imputer.impute(table, log).with_context(|| {
            format!("failed to impute {}", location(&self.cfg.storage.bucket, input_key))
        })?;
        self.save(&table, output_key, log)
    }

    fn load(&self, key: &str, log: &Logger<'_>) -> Result<TimeSeriesTable> {
        let bucket = &self.cfg.storage.bucket;
        let location = location(bucket, key);
        log.info(format_args!("loading {location}"));

        let table = self.store.load(bucket, key)?;
        if table.is_empty() {
            return Err(Error::EmptyDataset).with_context(|| format!("could not use {location}"));
        }

        log.info(format_args!("loaded {} rows from {location}", table.len()));
        Ok(table)
    }

    fn save(&self, table: &TimeSeriesTable, key: &str, log: &Logger<'_>) -> Result<()> {
        let bucket = &self.cfg.storage.bucket;
        let location = location(bucket, key);
        log.info(format_args!("saving {location}"));

        self.store.save(table, bucket, key)?;

        log.info(format_args!("saved {} rows to {location}", table.len()));
        Ok(())
    }
}
