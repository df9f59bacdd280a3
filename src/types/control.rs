//! Inbound control messages on duplex connections

use serde::{Deserialize, Serialize};

/// Control message a duplex client may send
///
/// Clients send `{"type": "interrupt"}` or `{"type": "ping"}`. Extra fields
/// are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Cancel the session's external process
    Interrupt,
    /// Ask for a `ping` event in reply
    Ping,
}

impl ControlMessage {
    /// Parse a text frame, returning `None` for anything unrecognised
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}
