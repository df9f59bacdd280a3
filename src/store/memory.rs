//! In-memory record store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{CommandError, Result};
use crate::types::{CommandId, CommandRecord};

use super::CommandStore;

/// Records kept for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<CommandId, CommandRecord>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CommandStore for MemoryStore {
    async fn create(&self, record: &CommandRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(CommandError::persistence(format!(
                "record {} already exists",
                record.id
            )));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn save(&self, record: &CommandRecord) -> Result<()> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(CommandError::command_not_found(record.id.as_str())),
        }
    }

    async fn get(&self, id: &CommandId) -> Result<CommandRecord> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CommandError::command_not_found(id.as_str()))
    }
}
