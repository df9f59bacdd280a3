//! Durable command records
//!
//! The [`CommandStore`] trait is the storage seam. Sessions write through it
//! on every transition; failures are logged by the caller and never abort a
//! session.
//!
//! - `memory` - `MemoryStore`, process-lifetime storage
//! - `file` - `FileStore`, one JSON file per record

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CommandId, CommandRecord};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Storage collaborator for command records
#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Insert a new record
    ///
    /// # Errors
    /// `Persistence` if a record with the same id exists or the write fails
    async fn create(&self, record: &CommandRecord) -> Result<()>;

    /// Replace an existing record
    ///
    /// # Errors
    /// `CommandNotFound` for an unknown id, `Persistence` if the write fails
    async fn save(&self, record: &CommandRecord) -> Result<()>;

    /// Load a record
    ///
    /// # Errors
    /// `CommandNotFound` for an unknown id, `Persistence` if the read fails
    async fn get(&self, id: &CommandId) -> Result<CommandRecord>;
}
