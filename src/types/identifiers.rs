//! Newtype wrappers for type safety
//!
//! Command identifiers travel through URLs and are used as file names by the
//! file-backed store, so they are validated whenever they come from outside.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CommandError, Result};

/// Maximum accepted length of an externally supplied command id
const MAX_ID_LEN: usize = 128;

/// Command ID newtype
///
/// Generated ids look like `cmd_1735689600_1a2b3c4d`: the submission time in
/// unix seconds followed by the first eight characters of a v4 UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(String);

impl CommandId {
    /// Generate a fresh command id
    #[must_use]
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self(format!("cmd_{}_{}", Utc::now().timestamp(), &uuid[..8]))
    }

    /// Parse an id received from a client
    ///
    /// # Errors
    /// Returns `InvalidCommandId` when the id is empty, too long, or contains
    /// characters outside `[A-Za-z0-9_-]`
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_ID_LEN
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(Self(id))
        } else {
            Err(CommandError::InvalidCommandId(id))
        }
    }

    /// Get the command ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommandId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
