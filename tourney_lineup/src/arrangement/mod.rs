//! Competitor arrangement: pool, sections and the store that owns them.
//!
//! This module provides:
//! - Typed items, sections and the load/save aggregate
//! - Ordering primitives (renumbering, shuffle, alphabetical seeding)
//! - The arrangement store enforcing the placement invariants
//! - Error types and explicit mutation outcomes
//!
//! Every item is either in the pool or in exactly one section, and the order
//! indices inside a section are always exactly `1..=n`.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tourney_lineup::arrangement::{
//!     Arrangement, ArrangementStore, AssignableItem, ContentType, Gender, Section,
//! };
//! use tourney_lineup::gateway::MemoryGateway;
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = Arc::new(MemoryGateway::new());
//!     gateway.set_arrangement(
//!         "cup-2026",
//!         ContentType::Quyen,
//!         Arrangement {
//!             pool: vec![AssignableItem::athlete("1", "Binh", Gender::Male, "s")],
//!             sections: vec![Section::new("s", "Long Ho Quyen")],
//!         },
//!     );
//!
//!     let store = ArrangementStore::new(gateway);
//!     let _ = store.load("cup-2026", ContentType::Quyen).await;
//!
//!     let item = store.pool()[0].clone();
//!     assert!(store.add_to_section("s", item).is_applied());
//!     assert_eq!(store.section("s").map(|s| s.len()), Some(1));
//! }
//! ```

pub mod errors;
pub mod models;
pub mod ordering;
pub mod store;

pub use errors::{ArrangementError, ArrangementResult, IgnoredReason, MutationOutcome, RequestOutcome};
pub use models::{
    Arrangement, AssignableItem, CompetitionId, ContentItem, ContentType, ExportSnapshot, Gender,
    ItemFilters, ItemId, ItemKind, ItemPlacement, RandomizeRequest, SaveArrangement, Scope,
    Section, SectionId, SectionOrder, TeamMember,
};
pub use store::{ArrangementStore, ResponsePolicy};
