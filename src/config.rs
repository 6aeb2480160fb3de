use crate::window::Window;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path, path::PathBuf};

/// Pipeline configuration.
///
/// Loaded from an optional TOML file, completed with command line and
/// environment overrides, then validated (see [`Config::resolve`]).
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub storage: StorageConfig,
    pub datasets: DatasetsConfig,
    pub cleaning: CleaningConfig,
    pub detection: DetectionConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding one sub-directory per bucket.
    pub root: PathBuf,
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            bucket: String::new(),
        }
    }
}

/// Dataset keys inside the bucket.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetsConfig {
    pub train_input: Option<String>,
    pub train_clean: Option<String>,
    pub test_input: Option<String>,
    pub test_clean: Option<String>,
    pub test_anomalies: String,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            train_input: None,
            train_clean: None,
            test_input: None,
            test_clean: None,
            test_anomalies: "sensor_data_test_anomalies.csv".to_owned(),
        }
    }
}

#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleaningConfig {
    pub window_size: Option<WindowSize>,
}

/// Window size as written by users: a row count or a time-span token.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WindowSize {
    Rows(usize),
    Token(String),
}

impl WindowSize {
    pub fn resolve(&self) -> crate::Result<Window> {
        match self {
            WindowSize::Rows(n_rows) => Window::rows(*n_rows),
            WindowSize::Token(token) => Window::parse(token),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    pub threshold_multiplier: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold_multiplier: 3.0,
        }
    }
}

/// Values that replace the ones of the configuration file when present.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub store_root: Option<PathBuf>,
    pub bucket: Option<String>,
    pub train_input: Option<String>,
    pub train_clean: Option<String>,
    pub test_input: Option<String>,
    pub test_clean: Option<String>,
    pub test_anomalies: Option<String>,
    pub window_size: Option<String>,
    pub threshold_multiplier: Option<f64>,
}

impl Config {
    /// Load the optional TOML file, apply the overrides and validate the result.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or deserialized, or if the
    /// resulting configuration values are invalid.
    pub fn resolve(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = match file {
            Some(file) => Self::read_file(file)?,
            None => Config::default(),
        };
        config.apply(overrides);
        config.validate().context("failed to validate config")?;
        Ok(config)
    }

    fn read_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        toml::from_str(&contents).context("failed to deserialize config")
    }

    pub fn apply(&mut self, overrides: Overrides) {
        let Overrides {
            store_root,
            bucket,
            train_input,
            train_clean,
            test_input,
            test_clean,
            test_anomalies,
            window_size,
            threshold_multiplier,
        } = overrides;

        if let Some(root) = store_root {
            self.storage.root = root;
        }
        if let Some(bucket) = bucket {
            self.storage.bucket = bucket;
        }
        let datasets = &mut self.datasets;
        datasets.train_input = train_input.or(datasets.train_input.take());
        datasets.train_clean = train_clean.or(datasets.train_clean.take());
        datasets.test_input = test_input.or(datasets.test_input.take());
        datasets.test_clean = test_clean.or(datasets.test_clean.take());
        if let Some(key) = test_anomalies {
            datasets.test_anomalies = key;
        }
        if let Some(token) = window_size {
            self.cleaning.window_size = Some(WindowSize::Token(token));
        }
        if let Some(k) = threshold_multiplier {
            self.detection.threshold_multiplier = k;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.storage.bucket.trim().is_empty() {
            bail!("bucket name must not be empty");
        }
        check_num(self.detection.threshold_multiplier, 0.0..f64::INFINITY)
            .context("invalid threshold multiplier")?;
        if let Some(window_size) = &self.cleaning.window_size {
            window_size.resolve().context("invalid window size")?;
        }
        check_key(&self.datasets.test_anomalies).context("invalid anomaly report key")?;
        Ok(())
    }

    /// Resolved rolling window of the cleaning stage.
    pub fn window(&self) -> Result<Window> {
        let window_size = self
            .cleaning
            .window_size
            .as_ref()
            .context("window size is not configured")?;
        Ok(window_size.resolve()?)
    }

    /// Training set read by the detection stage.
    pub fn train_key_for_detection(&self) -> Result<&str> {
        self.datasets
            .train_clean
            .as_deref()
            .or(self.datasets.train_input.as_deref())
            .context("neither a cleaned nor a raw training dataset is configured")
    }

    /// Test set read by the detection stage.
    pub fn test_key_for_detection(&self) -> Result<&str> {
        self.datasets
            .test_clean
            .as_deref()
            .or(self.datasets.test_input.as_deref())
            .context("neither a cleaned nor a raw test dataset is configured")
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        bail!("key must not be empty");
    }
    Ok(())
}
