//! JSON file record store
//!
//! Each record lives in `<dir>/<id>.json`. Writes go to a temporary file that
//! is renamed over the target, so readers never see a partial record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::{CommandError, Result};
use crate::types::{CommandId, CommandRecord};

use super::CommandStore;

/// Records persisted as one JSON file each
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    // Serializes create's existence check with its write
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    ///
    /// # Errors
    /// Returns `Persistence` if the directory cannot be created
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            CommandError::persistence(format!("cannot create {}: {e}", dir.display()))
        })?;
        log::info!("Command records stored in {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &CommandId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn write_record(&self, record: &CommandRecord) -> Result<()> {
        let path = self.record_path(&record.id);
        let tmp = self.dir.join(format!(".{}.json.tmp", record.id));
        let body = serde_json::to_vec_pretty(record)?;

        fs::write(&tmp, body).await.map_err(|e| {
            CommandError::persistence(format!("write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &path).await.map_err(|e| {
            CommandError::persistence(format!("rename to {}: {e}", path.display()))
        })
    }
}

#[async_trait]
impl CommandStore for FileStore {
    async fn create(&self, record: &CommandRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if fs::try_exists(self.record_path(&record.id))
            .await
            .unwrap_or(false)
        {
            return Err(CommandError::persistence(format!(
                "record {} already exists",
                record.id
            )));
        }
        self.write_record(record).await
    }

    async fn save(&self, record: &CommandRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if !fs::try_exists(self.record_path(&record.id))
            .await
            .unwrap_or(false)
        {
            return Err(CommandError::command_not_found(record.id.as_str()));
        }
        self.write_record(record).await
    }

    async fn get(&self, id: &CommandId) -> Result<CommandRecord> {
        let path = self.record_path(id);
        let body = match fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CommandError::command_not_found(id.as_str()));
            }
            Err(e) => {
                return Err(CommandError::persistence(format!(
                    "read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_slice(&body)
            .map_err(|e| CommandError::persistence(format!("decode {}: {e}", path.display())))
    }
}
