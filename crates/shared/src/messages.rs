//! Sync messages exchanged between peers
//!
//! These are the only three messages the challenge coordination protocol
//! uses. They are used by every peer: followers send `StartRequested` to the
//! authority, the authority broadcasts `StartConfirmed`, and any peer may
//! broadcast `SelectionChanged`.
//!
//! ## Versioning Policy
//!
//! - New variants can be added at the end (forward compatible)
//! - Removing or renaming variants is a breaking change
//! - Payload decode failures are never fatal: receivers drop and log

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level peer identity, used for diagnostics on inbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(u32);

impl PeerId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Challenge coordination protocol messages.
///
/// Wire payloads carry raw strings, not domain ids; conversion to
/// [`ridgeline_domain::RulesetId`] happens at the application edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMessage {
    /// Broadcast by whichever peer changes the local selection. Also
    /// mirrored into the session property store so late joiners recover it;
    /// live copies are best-effort UI sync and applied last-write-wins.
    SelectionChanged {
        /// Selected ruleset id; `None` (or empty) clears the selection.
        #[serde(default)]
        ruleset: Option<String>,
        #[serde(default)]
        difficulty: Option<i32>,
    },
    /// Follower to authority only. Asks the authority to decide the scene
    /// and confirm the start.
    StartRequested { difficulty: i32 },
    /// Authority to every peer including itself. The only message that
    /// triggers a scene load; receiving it twice must be safe.
    StartConfirmed { scene: String, difficulty: i32 },
}

/// Non-fatal payload codec failure. Receivers log and drop.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to encode sync payload: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode sync payload: {0}")]
    Decode(#[source] serde_json::Error),
}

impl SyncMessage {
    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        serde_json::to_vec(self).map_err(PayloadError::Encode)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        serde_json::from_slice(payload).map_err(PayloadError::Decode)
    }
}
