//! Typed drag-and-drop payload exchanged between item cards and drop targets.
//!
//! The payload travels as plain text (JSON) through the transfer channel; the
//! drop target decodes it back into an [`ItemTransfer`] before calling the store,
//! so a malformed payload is rejected at the boundary instead of reaching the
//! arrangement.

use crate::arrangement::{AssignableItem, SectionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Drag payload errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Drag payload is empty")]
    Empty,

    #[error("Malformed drag payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Snapshot of an item being dragged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTransfer {
    pub item: AssignableItem,
    /// Section the drag started from, `None` when dragged out of the pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_section: Option<SectionId>,
}

impl ItemTransfer {
    /// Snapshot an item as it currently sits in the arrangement
    pub fn from_item(item: &AssignableItem) -> Self {
        Self {
            item: item.clone(),
            source_section: item.section_id.clone(),
        }
    }

    /// Text form placed on the transfer channel
    pub fn encode(&self) -> Result<String, TransferError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a payload read back from the transfer channel
    pub fn decode(payload: &str) -> Result<Self, TransferError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(TransferError::Empty);
        }
        Ok(serde_json::from_str(payload)?)
    }

    pub fn into_item(self) -> AssignableItem {
        self.item
    }
}
