//! # Tourney Lineup
//!
//! Competitor arrangement engine for martial-arts tournament line-ups.
//!
//! Athletes and teams registered for a competition are assigned to ordered
//! line-ups ("sections"), one per content/category, for either forms (quyen)
//! or music events. The engine supports manual placement and reordering, bulk
//! shuffling and alphabetical seeding, server-computed allocation, and saving
//! the final running order.
//!
//! ## Core Modules
//!
//! - [`arrangement`]: Data model, ordering primitives and the arrangement store
//! - [`gateway`]: Remote gateway trait and an in-memory implementation
//! - [`transfer`]: Typed drag-and-drop payload

/// Data model, ordering and the arrangement store.
pub mod arrangement;
pub use arrangement::{
    ArrangementError, ArrangementResult, ArrangementStore, AssignableItem, ContentType,
    MutationOutcome, RequestOutcome, ResponsePolicy, Section,
};

/// Remote arrangement gateway.
pub mod gateway;
pub use gateway::{ArrangementGateway, MemoryGateway};

/// Drag-and-drop payload.
pub mod transfer;
pub use transfer::{ItemTransfer, TransferError};
