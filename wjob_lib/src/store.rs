//! Append-only store of weather records, persisted as a single JSON array.
//!
//! Every read and every read-modify-write goes through one async mutex, so
//! appends from concurrently finishing jobs never interleave. An append
//! rewrites the whole file: the new contents go to a sibling temp file which
//! is then renamed over the store, so the file is valid at any point in time.
//! Each append costs a full rewrite, which limits the store to modest volumes.

use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::{fs, sync::Mutex};
use tracing::{debug, info, instrument};
use wjob_data::WeatherRecord;

use crate::error::StoreError;

pub struct WeatherStore {
    path: PathBuf,
    // guards the file, not data
    lock: Mutex<()>,
}

impl WeatherStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// all stored records, or None if the store file does not exist yet
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Option<Vec<WeatherRecord>>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_records().await
    }

    /// create the store with an empty array, leaves an existing store untouched
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn initialize_empty(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        if fs::try_exists(&self.path).await? {
            debug!("store already exists");
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        self.write_records(&[]).await?;
        info!("created empty store");
        Ok(())
    }

    /// append one record, the whole read-modify-write runs under the store lock
    #[instrument(skip(self, record), fields(path = %self.path.display(), user_id = record.user_id))]
    pub async fn append(&self, record: WeatherRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_records().await?.unwrap_or_default();
        records.push(record);
        self.write_records(&records).await?;
        info!("appended record, store holds {} records", records.len());
        Ok(())
    }

    /// every stored record, an absent store reads as empty
    pub async fn records(&self) -> Result<Vec<WeatherRecord>, StoreError> {
        Ok(self.load().await?.unwrap_or_default())
    }

    async fn read_records(&self) -> Result<Option<Vec<WeatherRecord>>, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corruption {
                path: self.path.clone(),
                source,
            })
    }

    async fn write_records(&self, records: &[WeatherRecord]) -> Result<(), StoreError> {
        let contents = serde_json::to_vec_pretty(records).map_err(StoreError::Encode)?;
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, &contents).await?;
        if let Err(err) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
