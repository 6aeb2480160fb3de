use crate::codec::{read_table, write_table};
use crate::error::{Error, Result};
use crate::table::TimeSeriesTable;
use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::PathBuf,
    sync::Mutex,
};

/// Location of a dataset, as shown in logs and errors.
pub fn location(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

/// Source and sink of CSV datasets addressed by bucket and key.
pub trait DatasetStore {
    fn load(&self, bucket: &str, key: &str) -> Result<TimeSeriesTable>;

    fn save(&self, table: &TimeSeriesTable, bucket: &str, key: &str) -> Result<()>;
}

/// Store backed by a local directory: `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

impl DatasetStore for FsStore {
    fn load(&self, bucket: &str, key: &str) -> Result<TimeSeriesTable> {
        let path = self.object_path(bucket, key);
        let read = || -> Result<TimeSeriesTable> {
            let file = File::open(&path)?;
            read_table(BufReader::new(file))
        };
        read().map_err(|err| Error::Load {
            location: location(bucket, key),
            source: Box::new(err),
        })
    }

    fn save(&self, table: &TimeSeriesTable, bucket: &str, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key);
        let write = || -> Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut writer = BufWriter::new(File::create(&path)?);
            write_table(table, &mut writer)?;
            writer.flush()?;
            Ok(())
        };
        write().map_err(|err| Error::Save {
            location: location(bucket, key),
            source: Box::new(err),
        })
    }
}

/// In-process object map, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.lock()
            .insert((bucket.to_owned(), key.to_owned()), body.into());
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .get(&(bucket.to_owned(), key.to_owned()))
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Vec<u8>>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DatasetStore for MemoryStore {
    fn load(&self, bucket: &str, key: &str) -> Result<TimeSeriesTable> {
        let body = self.get_object(bucket, key).ok_or_else(|| Error::Load {
            location: location(bucket, key),
            source: "no such key".into(),
        })?;
        read_table(body.as_slice()).map_err(|err| Error::Load {
            location: location(bucket, key),
            source: Box::new(err),
        })
    }

    fn save(&self, table: &TimeSeriesTable, bucket: &str, key: &str) -> Result<()> {
        let mut body = Vec::new();
        write_table(table, &mut body).map_err(|err| Error::Save {
            location: location(bucket, key),
            source: Box::new(err),
        })?;
        self.put_object(bucket, key, body);
        Ok(())
    }
}
