//! In-memory gateway used by tests and the offline console.

use super::ArrangementGateway;
use crate::arrangement::{
    Arrangement, ArrangementError, ArrangementResult, AssignableItem, ContentItem, ContentType,
    RandomizeRequest, SaveArrangement, Section, ordering,
};
use async_trait::async_trait;
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type ScopeKey = (String, ContentType);

/// Number of calls received per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub fetch: usize,
    pub save: usize,
    pub randomize: usize,
    pub catalog: usize,
}

#[derive(Default)]
struct MemoryState {
    arrangements: HashMap<ScopeKey, Arrangement>,
    catalogs: HashMap<ScopeKey, Vec<ContentItem>>,
    saved: HashMap<ScopeKey, SaveArrangement>,
    failure: Option<(u16, String)>,
    latencies: VecDeque<Duration>,
    calls: CallCounts,
}

/// Gateway keeping arrangements in memory
///
/// Saves overwrite the stored arrangement (no merge), randomize deals every item
/// matching the filters into the section of its content id, shuffled when a
/// random draw is requested and in registration order otherwise. Failures and
/// per-call latency can be injected to exercise the store's error and
/// stale-response handling.
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    rng: Mutex<StdRng>,
}

impl MemoryGateway {
    /// Create an empty gateway with an entropy-seeded RNG
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Create an empty gateway whose random draws are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the stored arrangement for a scope
    pub fn set_arrangement(
        &self,
        competition_id: &str,
        content_type: ContentType,
        arrangement: Arrangement,
    ) {
        self.state()
            .arrangements
            .insert((competition_id.to_string(), content_type), arrangement);
    }

    /// Stored arrangement for a scope, if any
    pub fn arrangement(&self, competition_id: &str, content_type: ContentType) -> Option<Arrangement> {
        self.state()
            .arrangements
            .get(&(competition_id.to_string(), content_type))
            .cloned()
    }

    /// Replace the content catalog for a scope
    pub fn set_catalog(
        &self,
        competition_id: &str,
        content_type: ContentType,
        catalog: Vec<ContentItem>,
    ) {
        self.state()
            .catalogs
            .insert((competition_id.to_string(), content_type), catalog);
    }

    /// Last save body received for a scope
    pub fn last_saved(&self, competition_id: &str, content_type: ContentType) -> Option<SaveArrangement> {
        self.state()
            .saved
            .get(&(competition_id.to_string(), content_type))
            .cloned()
    }

    /// Make every call fail with the given HTTP-like status until [`recover`](Self::recover)
    pub fn fail_with(&self, status: u16, body: impl Into<String>) {
        self.state().failure = Some((status, body.into()));
    }

    /// Stop injecting failures
    pub fn recover(&self) {
        self.state().failure = None;
    }

    /// Delay the next call by `latency`; queued delays are consumed in call order
    pub fn push_latency(&self, latency: Duration) {
        self.state().latencies.push_back(latency);
    }

    pub fn calls(&self) -> CallCounts {
        self.state().calls
    }

    /// Common prologue: take the queued latency and check injected failure
    async fn enter(&self) -> ArrangementResult<()> {
        let (latency, failure) = {
            let mut state = self.state();
            (state.latencies.pop_front(), state.failure.clone())
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match failure {
            Some((status, body)) => Err(ArrangementError::Remote { status, body }),
            None => Ok(()),
        }
    }

    fn deal(&self, arrangement: &Arrangement, request: &RandomizeRequest) -> Arrangement {
        let mut candidates: Vec<AssignableItem> = Vec::new();
        let mut pool: Vec<AssignableItem> = Vec::new();

        for item in arrangement.all_items() {
            let mut item = item.clone();
            item.clear_placement();
            if request.filters.matches(&item) {
                candidates.push(item);
            } else {
                pool.push(item);
            }
        }

        // Registration order: student code, then id
        candidates.sort_by(|a, b| {
            a.student_code
                .cmp(&b.student_code)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut sections: Vec<Section> = arrangement
            .sections
            .iter()
            .map(|section| Section::new(section.content_id.clone(), section.name.clone()))
            .collect();

        for section in &mut sections {
            let (mut dealt, rest): (Vec<_>, Vec<_>) = candidates
                .into_iter()
                .partition(|item| item.content_id == section.content_id);
            candidates = rest;

            if request.randomize {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                dealt.shuffle(&mut *rng);
            }

            section.items = dealt;
            ordering::renumber(&section.content_id, &mut section.items);
        }

        // Candidates without a matching section stay unplaced
        pool.extend(candidates);

        Arrangement { pool, sections }
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a save body to a stored arrangement, overwriting previous placement
fn apply_save(arrangement: &Arrangement, save: &SaveArrangement) -> Arrangement {
    let mut by_id: HashMap<String, AssignableItem> = arrangement
        .all_items()
        .map(|item| {
            let mut item = item.clone();
            item.clear_placement();
            (item.id.clone(), item)
        })
        .collect();

    let sections = arrangement
        .sections
        .iter()
        .map(|section| {
            let mut placed = Section::new(section.content_id.clone(), section.name.clone());
            if let Some(order) = save
                .sections
                .iter()
                .find(|order| order.content_id == section.content_id)
            {
                let mut entries = order.items.clone();
                entries.sort_by_key(|entry| entry.order_index);
                placed.items = entries
                    .iter()
                    .filter_map(|entry| by_id.remove(&entry.id))
                    .collect();
                ordering::renumber(&placed.content_id, &mut placed.items);
            }
            placed
        })
        .collect();

    // Keep pool order stable: original pool order, then items pulled from sections
    let pool = arrangement
        .all_items()
        .filter_map(|item| by_id.remove(&item.id))
        .collect();

    Arrangement { pool, sections }
}

#[async_trait]
impl ArrangementGateway for MemoryGateway {
    async fn fetch_arrangement(
        &self,
        competition_id: &str,
        content_type: ContentType,
    ) -> ArrangementResult<Arrangement> {
        // Snapshot is taken when the call is issued, not when it resolves
        let snapshot = {
            let mut state = self.state();
            state.calls.fetch += 1;
            state
                .arrangements
                .get(&(competition_id.to_string(), content_type))
                .cloned()
                .unwrap_or_default()
        };
        self.enter().await?;

        debug!(
            "memory gateway: fetched {} pool item(s), {} section(s) for {}/{}",
            snapshot.pool.len(),
            snapshot.sections.len(),
            competition_id,
            content_type
        );
        Ok(snapshot)
    }

    async fn save_arrangement(
        &self,
        competition_id: &str,
        arrangement: &SaveArrangement,
    ) -> ArrangementResult<()> {
        self.state().calls.save += 1;
        self.enter().await?;

        let key = (competition_id.to_string(), arrangement.content_type);
        let mut state = self.state();
        let stored = state.arrangements.get(&key).cloned().unwrap_or_default();
        state
            .arrangements
            .insert(key.clone(), apply_save(&stored, arrangement));
        state.saved.insert(key, arrangement.clone());

        Ok(())
    }

    async fn randomize_arrangement(
        &self,
        competition_id: &str,
        request: &RandomizeRequest,
    ) -> ArrangementResult<Arrangement> {
        let snapshot = {
            let mut state = self.state();
            state.calls.randomize += 1;
            state
                .arrangements
                .get(&(competition_id.to_string(), request.content_type))
                .cloned()
                .unwrap_or_default()
        };
        self.enter().await?;

        Ok(self.deal(&snapshot, request))
    }

    async fn fetch_content_catalog(
        &self,
        competition_id: &str,
        content_type: ContentType,
    ) -> ArrangementResult<Vec<ContentItem>> {
        let catalog = {
            let mut state = self.state();
            state.calls.catalog += 1;
            state
                .catalogs
                .get(&(competition_id.to_string(), content_type))
                .cloned()
                .unwrap_or_default()
        };
        self.enter().await?;

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::{Gender, ItemFilters, ItemKind, ItemPlacement, SectionOrder};

    fn sample() -> Arrangement {
        Arrangement {
            pool: vec![
                AssignableItem::athlete("1", "Binh", Gender::Male, "c1").with_student_code("S02"),
                AssignableItem::athlete("2", "An", Gender::Female, "c1").with_student_code("S01"),
                AssignableItem::athlete("3", "Cuong", Gender::Male, "c2").with_student_code("S03"),
                AssignableItem::athlete("4", "Dao", Gender::Male, "c9").with_student_code("S04"),
            ],
            sections: vec![Section::new("c1", "Forms A"), Section::new("c2", "Forms B")],
        }
    }

    fn ids(section: &Section) -> Vec<&str> {
        section.items.iter().map(|item| item.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_fetch_unknown_scope_is_empty() {
        let gateway = MemoryGateway::new();
        let arrangement = gateway
            .fetch_arrangement("none", ContentType::Music)
            .await
            .unwrap();
        assert_eq!(arrangement, Arrangement::default());
        assert_eq!(gateway.calls().fetch, 1);
    }

    #[tokio::test]
    async fn test_deterministic_randomize_uses_registration_order() {
        let gateway = MemoryGateway::new();
        gateway.set_arrangement("c", ContentType::Quyen, sample());

        let request = RandomizeRequest {
            content_type: ContentType::Quyen,
            randomize: false,
            filters: ItemFilters::default(),
        };
        let result = gateway.randomize_arrangement("c", &request).await.unwrap();

        assert_eq!(ids(&result.sections[0]), vec!["2", "1"]);
        assert_eq!(ids(&result.sections[1]), vec!["3"]);
        // No section for c9
        assert_eq!(result.pool.len(), 1);
        assert_eq!(result.pool[0].id, "4");
        assert!(ordering::is_contiguous(&result.sections[0].items));
    }

    #[tokio::test]
    async fn test_randomize_respects_filters() {
        let gateway = MemoryGateway::with_seed(3);
        gateway.set_arrangement("c", ContentType::Quyen, sample());

        let request = RandomizeRequest {
            content_type: ContentType::Quyen,
            randomize: true,
            filters: ItemFilters {
                gender: Some(Gender::Female),
                form_label: None,
            },
        };
        let result = gateway.randomize_arrangement("c", &request).await.unwrap();

        assert_eq!(ids(&result.sections[0]), vec!["2"]);
        assert!(result.sections[1].is_empty());
        assert_eq!(result.pool.len(), 3);
    }

    #[tokio::test]
    async fn test_save_overwrites_stored_order() {
        let gateway = MemoryGateway::new();
        gateway.set_arrangement("c", ContentType::Quyen, sample());

        let save = SaveArrangement {
            content_type: ContentType::Quyen,
            sections: vec![SectionOrder {
                content_id: "c1".to_string(),
                items: vec![
                    ItemPlacement {
                        id: "2".to_string(),
                        kind: ItemKind::Athlete,
                        order_index: 2,
                    },
                    ItemPlacement {
                        id: "1".to_string(),
                        kind: ItemKind::Athlete,
                        order_index: 1,
                    },
                ],
            }],
        };
        gateway.save_arrangement("c", &save).await.unwrap();

        let stored = gateway.arrangement("c", ContentType::Quyen).unwrap();
        assert_eq!(ids(&stored.sections[0]), vec!["1", "2"]);
        assert_eq!(stored.pool.len(), 2);
        assert_eq!(gateway.last_saved("c", ContentType::Quyen), Some(save));

        // A second save with empty sections clears placement
        let empty = SaveArrangement {
            content_type: ContentType::Quyen,
            sections: Vec::new(),
        };
        gateway.save_arrangement("c", &empty).await.unwrap();
        let stored = gateway.arrangement("c", ContentType::Quyen).unwrap();
        assert!(stored.sections.iter().all(Section::is_empty));
        assert_eq!(stored.pool.len(), 4);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let gateway = MemoryGateway::new();
        gateway.fail_with(503, "maintenance");

        let err = gateway
            .fetch_content_catalog("c", ContentType::Quyen)
            .await
            .unwrap_err();
        assert!(matches!(err, ArrangementError::Remote { status: 503, .. }));

        gateway.recover();
        assert!(
            gateway
                .fetch_content_catalog("c", ContentType::Quyen)
                .await
                .is_ok()
        );
        assert_eq!(gateway.calls().catalog, 2);
    }
}
