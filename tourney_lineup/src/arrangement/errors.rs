//! Arrangement error types and mutation outcomes.

use super::models::{ItemId, SectionId};
use std::fmt;
use thiserror::Error;

/// Errors raised by gateway operations
#[derive(Debug, Error)]
pub enum ArrangementError {
    /// Network-level failure (connection refused, timeout, DNS)
    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("Server responded with status {status}: {body}")]
    Remote { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Malformed response payload: {0}")]
    MalformedPayload(String),

    /// Request body could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation needs a competition to be selected
    #[error("No competition selected")]
    NoCompetition,

    /// Any other gateway failure
    #[error("Gateway error: {0}")]
    Gateway(String),
}

impl ArrangementError {
    /// Human-readable message shown next to the control that failed
    ///
    /// Every gateway failure the store records goes through here, so the UI
    /// never sees raw transport errors.
    pub fn client_message(&self) -> String {
        match self {
            ArrangementError::Transport(_) => {
                "Could not reach the arrangement service, please retry".to_string()
            }
            ArrangementError::Remote { status, body } => {
                let body = body.trim();
                if body.is_empty() || body.len() > 200 {
                    format!("The server rejected the request ({})", status)
                } else {
                    format!("The server rejected the request ({}): {}", status, body)
                }
            }
            ArrangementError::MalformedPayload(_) => {
                "The arrangement service returned an unexpected response".to_string()
            }
            ArrangementError::Serialization(_) => "Could not encode the arrangement".to_string(),
            ArrangementError::NoCompetition => "Select a competition first".to_string(),
            ArrangementError::Gateway(message) => message.clone(),
        }
    }
}

/// Result type for gateway operations
pub type ArrangementResult<T> = Result<T, ArrangementError>;

/// Why a local mutation left the arrangement untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoredReason {
    /// No section with this id in the current arrangement
    UnknownSection(SectionId),
    /// The item is not in the section
    ItemNotInSection { section: SectionId, item: ItemId },
    /// The item is already placed in the target section
    AlreadyInSection { section: SectionId, item: ItemId },
    /// Moving would leave the line-up bounds
    OutOfBounds { section: SectionId, item: ItemId },
    /// The section has no items to reorder
    EmptySection(SectionId),
    /// No section holds any item
    NothingPlaced,
}

impl fmt::Display for IgnoredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSection(section) => write!(f, "Unknown section '{}'", section),
            Self::ItemNotInSection { section, item } => {
                write!(f, "Item '{}' is not in section '{}'", item, section)
            }
            Self::AlreadyInSection { section, item } => {
                write!(f, "Item '{}' is already in section '{}'", item, section)
            }
            Self::OutOfBounds { section, item } => write!(
                f,
                "Item '{}' cannot move further in section '{}'",
                item, section
            ),
            Self::EmptySection(section) => write!(f, "Section '{}' is empty", section),
            Self::NothingPlaced => write!(f, "No items are placed"),
        }
    }
}

/// Result of a local store mutation
///
/// Stale UI references are tolerated: they produce `Ignored` rather than an
/// error, but callers can still tell the two cases apart.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum MutationOutcome {
    Applied,
    Ignored(IgnoredReason),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied)
    }
}

/// Result of a store operation that goes through the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum RequestOutcome {
    /// Response applied (or save accepted)
    Applied,
    /// Response dropped because a newer request was issued meanwhile
    Stale,
    /// Gateway failed; carries the message recorded as the store error
    Failed(String),
}

impl RequestOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RequestOutcome::Applied)
    }
}
