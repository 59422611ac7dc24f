//! Remote arrangement gateway.
//!
//! The gateway is the only boundary the store suspends on. Every operation is
//! scoped by competition id and content type and is a single request/response
//! exchange: reads are idempotent, saves overwrite whatever was stored before.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tourney_lineup::arrangement::{ArrangementStore, ContentType};
//! use tourney_lineup::gateway::MemoryGateway;
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = Arc::new(MemoryGateway::new());
//!     let store = ArrangementStore::new(gateway);
//!
//!     let outcome = store.load("cup-2026", ContentType::Quyen).await;
//!     assert!(outcome.is_applied());
//! }
//! ```

pub mod memory;

pub use memory::{CallCounts, MemoryGateway};

use crate::arrangement::{
    Arrangement, ArrangementResult, ContentItem, ContentType, RandomizeRequest, SaveArrangement,
};
use async_trait::async_trait;

/// Fetch/save/randomize operations against the tournament backend
#[async_trait]
pub trait ArrangementGateway: Send + Sync {
    /// Current pool and sections for a competition and content type
    async fn fetch_arrangement(
        &self,
        competition_id: &str,
        content_type: ContentType,
    ) -> ArrangementResult<Arrangement>;

    /// Persist the running order of every section
    async fn save_arrangement(
        &self,
        competition_id: &str,
        arrangement: &SaveArrangement,
    ) -> ArrangementResult<()>;

    /// Server-computed allocation of items into sections
    async fn randomize_arrangement(
        &self,
        competition_id: &str,
        request: &RandomizeRequest,
    ) -> ArrangementResult<Arrangement>;

    /// Contents/categories configured for a competition
    async fn fetch_content_catalog(
        &self,
        competition_id: &str,
        content_type: ContentType,
    ) -> ArrangementResult<Vec<ContentItem>>;
}
