//! Arrangement store: sole owner and mutator of the pool and section state.

use super::errors::{ArrangementError, ArrangementResult, IgnoredReason, MutationOutcome, RequestOutcome};
use super::models::{
    Arrangement, AssignableItem, ContentItem, ContentType, ExportDocument, ExportSnapshot,
    ItemFilters, ItemPlacement, RandomizeRequest, SaveArrangement, Scope, Section, SectionId,
    SectionOrder,
};
use super::ordering;
use crate::gateway::ArrangementGateway;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Which load/randomize response wins when requests overlap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponsePolicy {
    /// Only the most recently issued request may replace state; older
    /// responses are dropped when they resolve
    #[default]
    LatestRequest,
    /// Whichever response resolves last replaces state
    LastResolved,
}

impl fmt::Display for ResponsePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponsePolicy::LatestRequest => f.write_str("latest"),
            ResponsePolicy::LastResolved => f.write_str("last-resolved"),
        }
    }
}

impl FromStr for ResponsePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" | "latest-request" => Ok(ResponsePolicy::LatestRequest),
            "last-resolved" | "parity" => Ok(ResponsePolicy::LastResolved),
            other => Err(format!("Unknown response policy '{}'", other)),
        }
    }
}

#[derive(Default)]
struct ArrangementState {
    scope: Scope,
    pool: Vec<AssignableItem>,
    sections: HashMap<SectionId, Section>,
    catalog: Vec<ContentItem>,
    last_error: Option<String>,
}

impl ArrangementState {
    /// Swap in a fetched arrangement in one step
    ///
    /// Sections sharing a content id are merged in arrival order. An id seen
    /// more than once keeps its first placed copy (sections by content id);
    /// pool copies of placed items are dropped.
    fn replace(&mut self, scope: Scope, arrangement: Arrangement) {
        let Arrangement { pool, sections } = arrangement;

        let mut merged: HashMap<SectionId, Section> = HashMap::new();
        for mut section in sections {
            ordering::normalize(&mut section);
            match merged.get_mut(&section.content_id) {
                Some(existing) => {
                    warn!(
                        "Merging duplicate section '{}' ({} item(s)) into the first one",
                        section.content_id,
                        section.items.len()
                    );
                    existing.items.append(&mut section.items);
                }
                None => {
                    merged.insert(section.content_id.clone(), section);
                }
            }
        }

        let mut keys: Vec<SectionId> = merged.keys().cloned().collect();
        keys.sort();

        let mut seen: HashSet<String> = HashSet::new();
        let mut duplicates = 0;
        for key in &keys {
            if let Some(section) = merged.get_mut(key) {
                section.items.retain(|item| {
                    let first = seen.insert(item.id.clone());
                    if !first {
                        duplicates += 1;
                    }
                    first
                });
                ordering::renumber(&section.content_id, &mut section.items);
            }
        }

        self.pool = pool
            .into_iter()
            .filter(|item| {
                let first = seen.insert(item.id.clone());
                if !first {
                    duplicates += 1;
                }
                first
            })
            .map(|mut item| {
                item.clear_placement();
                item
            })
            .collect();
        self.sections = merged;
        self.scope = scope;

        if duplicates > 0 {
            warn!(
                "Dropped {} duplicate item(s) from the incoming arrangement",
                duplicates
            );
        }
    }

    fn clear_arrangement(&mut self) {
        self.pool.clear();
        self.sections.clear();
        self.catalog.clear();
    }

    /// Sections ordered for display and export
    fn sorted_sections(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.sections.values().collect();
        sections.sort_by(|a, b| {
            ordering::compare_names(&a.name, &b.name).then_with(|| a.content_id.cmp(&b.content_id))
        });
        sections
    }

    /// Pull an item out of whichever section other than `except` holds it
    fn take_from_other_section(&mut self, item_id: &str, except: &str) -> Option<AssignableItem> {
        let section = self
            .sections
            .values_mut()
            .find(|section| section.content_id != except && section.contains(item_id))?;
        let idx = section.position(item_id)?;
        let mut item = section.items.remove(idx);
        ordering::renumber(&section.content_id, &mut section.items);
        item.clear_placement();
        Some(item)
    }

    fn save_payload(&self) -> SaveArrangement {
        let mut sections: Vec<SectionOrder> = self
            .sections
            .values()
            .map(|section| SectionOrder {
                content_id: section.content_id.clone(),
                items: section
                    .items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| ItemPlacement {
                        id: item.id.clone(),
                        kind: item.kind,
                        order_index: idx as u32 + 1,
                    })
                    .collect(),
            })
            .collect();
        sections.sort_by(|a, b| a.content_id.cmp(&b.content_id));

        SaveArrangement {
            content_type: self.scope.content_type,
            sections,
        }
    }
}

/// Keeps the loading counter raised while a gateway call is pending
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn ignored(reason: IgnoredReason) -> MutationOutcome {
    debug!("Ignored arrangement mutation: {}", reason);
    MutationOutcome::Ignored(reason)
}

/// Owner of one competition/content-type arrangement
///
/// All reads return owned snapshots; all writes go through the methods below.
/// Local mutations are synchronous and never touch the gateway. Load, randomize
/// and save suspend on the gateway without holding the state lock, so local
/// edits stay possible while a request is in flight (and are overwritten when a
/// load or randomize response is applied).
pub struct ArrangementStore<G: ArrangementGateway + ?Sized> {
    gateway: Arc<G>,
    state: Mutex<ArrangementState>,
    policy: ResponsePolicy,
    /// Sequence number of the most recently issued load/randomize
    issued: AtomicU64,
    /// Bumped on every scope switch; catalog responses from an older scope are dropped
    scope_epoch: AtomicU64,
    in_flight: AtomicUsize,
    rng: Mutex<StdRng>,
}

impl<G: ArrangementGateway + ?Sized> ArrangementStore<G> {
    /// Create an empty store on top of a gateway
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            state: Mutex::new(ArrangementState::default()),
            policy: ResponsePolicy::default(),
            issued: AtomicU64::new(0),
            scope_epoch: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Choose how overlapping load/randomize responses are reconciled
    pub fn with_policy(mut self, policy: ResponsePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Make section shuffles reproducible
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn policy(&self) -> ResponsePolicy {
        self.policy
    }

    fn state(&self) -> MutexGuard<'_, ArrangementState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue_request(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn accepts(&self, sequence: u64) -> bool {
        match self.policy {
            ResponsePolicy::LatestRequest => self.issued.load(Ordering::SeqCst) == sequence,
            ResponsePolicy::LastResolved => true,
        }
    }

    fn record_failure(&self, operation: &str, err: &ArrangementError) -> RequestOutcome {
        warn!("Arrangement {} failed: {}", operation, err);
        let message = err.client_message();
        self.state().last_error = Some(message.clone());
        RequestOutcome::Failed(message)
    }

    /// Record a scope switch: in-flight loads and catalog fetches become stale
    fn switch_scope(&self) {
        self.issue_request();
        self.scope_epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn apply_fetch(
        &self,
        operation: &str,
        sequence: u64,
        scope: Scope,
        result: ArrangementResult<Arrangement>,
    ) -> RequestOutcome {
        let mut state = self.state();
        if !self.accepts(sequence) {
            debug!(
                "Dropping stale {} response #{} (latest is #{})",
                operation,
                sequence,
                self.issued.load(Ordering::SeqCst)
            );
            return RequestOutcome::Stale;
        }

        match result {
            Ok(arrangement) => {
                state.replace(scope, arrangement);
                info!(
                    "Applied {} #{}: {} pool item(s), {} section(s)",
                    operation,
                    sequence,
                    state.pool.len(),
                    state.sections.len()
                );
                RequestOutcome::Applied
            }
            Err(err) => {
                drop(state);
                self.record_failure(operation, &err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Gateway-backed operations
    // ------------------------------------------------------------------

    /// Fetch the arrangement for a competition and content type
    ///
    /// Scope, pool and sections are replaced in one step once the fetch
    /// resolves. On failure or a stale response the previous state, scope
    /// included, stays as it was.
    pub async fn load(&self, competition_id: &str, content_type: ContentType) -> RequestOutcome {
        let sequence = self.issue_request();
        self.state().last_error = None;
        let scope = Scope {
            competition_id: Some(competition_id.to_string()),
            content_type,
        };

        let _in_flight = InFlight::enter(&self.in_flight);
        info!(
            "Loading arrangement #{} for {}/{}",
            sequence, competition_id, content_type
        );
        let result = self
            .gateway
            .fetch_arrangement(competition_id, content_type)
            .await;

        self.apply_fetch("load", sequence, scope, result)
    }

    /// Fetch the content catalog, independent of the arrangement
    ///
    /// A response that resolves after a scope switch is dropped as stale.
    pub async fn load_content_catalog(
        &self,
        competition_id: &str,
        content_type: ContentType,
    ) -> RequestOutcome {
        self.state().last_error = None;
        let epoch = self.scope_epoch.load(Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.in_flight);

        let result = self
            .gateway
            .fetch_content_catalog(competition_id, content_type)
            .await;

        let mut state = self.state();
        if self.scope_epoch.load(Ordering::SeqCst) != epoch {
            debug!(
                "Dropping catalog for {}/{}: scope changed while in flight",
                competition_id, content_type
            );
            return RequestOutcome::Stale;
        }

        match result {
            Ok(catalog) => {
                debug!(
                    "Loaded {} content item(s) for {}/{}",
                    catalog.len(),
                    competition_id,
                    content_type
                );
                state.catalog = catalog;
                RequestOutcome::Applied
            }
            Err(err) => {
                drop(state);
                self.record_failure("catalog load", &err)
            }
        }
    }

    /// Ask the gateway for a fresh allocation and replace pool/sections with it
    ///
    /// `should_randomize` is forwarded as is: `false` requests registration
    /// order instead of a random draw.
    pub async fn randomize(&self, should_randomize: bool, filters: ItemFilters) -> RequestOutcome {
        let scope = {
            let mut state = self.state();
            state.last_error = None;
            state.scope.clone()
        };
        let Some(competition_id) = scope.competition_id.clone() else {
            return self.record_failure("randomize", &ArrangementError::NoCompetition);
        };

        let sequence = self.issue_request();
        let request = RandomizeRequest {
            content_type: scope.content_type,
            randomize: should_randomize,
            filters,
        };

        let _in_flight = InFlight::enter(&self.in_flight);
        info!(
            "Requesting {} allocation #{} for {}/{}",
            if should_randomize { "random" } else { "registration-order" },
            sequence,
            competition_id,
            scope.content_type
        );
        let result = self
            .gateway
            .randomize_arrangement(&competition_id, &request)
            .await;

        self.apply_fetch("randomize", sequence, scope, result)
    }

    /// Persist the current running order of every section
    ///
    /// Local state is the source of truth: a failed save records the error and
    /// leaves the arrangement as it is, ready for a retry.
    pub async fn save(&self) -> RequestOutcome {
        let (competition_id, payload) = {
            let mut state = self.state();
            state.last_error = None;
            (state.scope.competition_id.clone(), state.save_payload())
        };
        let Some(competition_id) = competition_id else {
            return self.record_failure("save", &ArrangementError::NoCompetition);
        };

        let _in_flight = InFlight::enter(&self.in_flight);
        match self
            .gateway
            .save_arrangement(&competition_id, &payload)
            .await
        {
            Ok(()) => {
                info!(
                    "Saved running order of {} section(s) for {}/{}",
                    payload.sections.len(),
                    competition_id,
                    payload.content_type
                );
                RequestOutcome::Applied
            }
            Err(err) => self.record_failure("save", &err),
        }
    }

    // ------------------------------------------------------------------
    // Local mutations
    // ------------------------------------------------------------------

    /// Place an item at the end of a section
    ///
    /// Dropping an item that is already in the section is ignored (double drop
    /// events). An item found in the pool is taken from there; an item placed in
    /// another section is moved out of it, so it never ends up in two
    /// containers. A payload for an item the store does not know is still
    /// appended.
    pub fn add_to_section(&self, section_id: &str, item: AssignableItem) -> MutationOutcome {
        let mut guard = self.state();
        let state = &mut *guard;

        let Some(target) = state.sections.get(section_id) else {
            return ignored(IgnoredReason::UnknownSection(section_id.to_string()));
        };
        if target.contains(&item.id) {
            return ignored(IgnoredReason::AlreadyInSection {
                section: section_id.to_string(),
                item: item.id,
            });
        }

        let mut placed = match state.take_from_other_section(&item.id, section_id) {
            Some(existing) => existing,
            None => match state.pool.iter().position(|pooled| pooled.id == item.id) {
                Some(idx) => state.pool.remove(idx),
                None => {
                    debug!("Item '{}' not found in the pool, appending payload", item.id);
                    item
                }
            },
        };

        let Some(target) = state.sections.get_mut(section_id) else {
            return ignored(IgnoredReason::UnknownSection(section_id.to_string()));
        };
        placed.place(section_id, target.len() as u32 + 1);
        debug!(
            "Placed '{}' in section '{}' at #{}",
            placed.id,
            section_id,
            target.len() + 1
        );
        target.items.push(placed);

        MutationOutcome::Applied
    }

    /// Take an item out of a section and return it to the pool
    pub fn remove_from_section(&self, section_id: &str, item_id: &str) -> MutationOutcome {
        let mut guard = self.state();
        let state = &mut *guard;

        let Some(section) = state.sections.get_mut(section_id) else {
            return ignored(IgnoredReason::UnknownSection(section_id.to_string()));
        };
        let Some(idx) = section.position(item_id) else {
            return ignored(IgnoredReason::ItemNotInSection {
                section: section_id.to_string(),
                item: item_id.to_string(),
            });
        };

        let mut item = section.items.remove(idx);
        ordering::renumber(&section.content_id, &mut section.items);
        item.clear_placement();
        state.pool.push(item);

        MutationOutcome::Applied
    }

    /// Same as [`remove_from_section`](Self::remove_from_section)
    pub fn move_back_to_pool(&self, section_id: &str, item_id: &str) -> MutationOutcome {
        self.remove_from_section(section_id, item_id)
    }

    /// Swap an item with its neighbour `delta` positions away
    ///
    /// Moving past either end of the line-up is ignored; there is no wrap-around.
    pub fn move_item_in_section(&self, section_id: &str, item_id: &str, delta: isize) -> MutationOutcome {
        let mut state = self.state();

        let Some(section) = state.sections.get_mut(section_id) else {
            return ignored(IgnoredReason::UnknownSection(section_id.to_string()));
        };
        let Some(idx) = section.position(item_id) else {
            return ignored(IgnoredReason::ItemNotInSection {
                section: section_id.to_string(),
                item: item_id.to_string(),
            });
        };

        let target = idx as isize + delta;
        if target < 0 || target >= section.len() as isize {
            return ignored(IgnoredReason::OutOfBounds {
                section: section_id.to_string(),
                item: item_id.to_string(),
            });
        }

        section.items.swap(idx, target as usize);
        ordering::renumber(&section.content_id, &mut section.items);

        MutationOutcome::Applied
    }

    /// Random permutation of a section's line-up
    pub fn shuffle_section(&self, section_id: &str) -> MutationOutcome {
        let mut state = self.state();

        let Some(section) = state.sections.get_mut(section_id) else {
            return ignored(IgnoredReason::UnknownSection(section_id.to_string()));
        };
        if section.is_empty() {
            return ignored(IgnoredReason::EmptySection(section_id.to_string()));
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        ordering::shuffle(section, &mut *rng);
        debug!("Shuffled {} item(s) in section '{}'", section.len(), section_id);

        MutationOutcome::Applied
    }

    /// Alphabetical ordering of a section's line-up by display name
    pub fn seed_section(&self, section_id: &str) -> MutationOutcome {
        let mut state = self.state();

        let Some(section) = state.sections.get_mut(section_id) else {
            return ignored(IgnoredReason::UnknownSection(section_id.to_string()));
        };
        if section.is_empty() {
            return ignored(IgnoredReason::EmptySection(section_id.to_string()));
        }

        ordering::seed(section);

        MutationOutcome::Applied
    }

    /// Move every placed item back to the pool, keeping the (now empty) sections
    pub fn reset_all(&self) -> MutationOutcome {
        let mut guard = self.state();
        let state = &mut *guard;

        let keys: Vec<SectionId> = state
            .sorted_sections()
            .into_iter()
            .map(|section| section.content_id.clone())
            .collect();

        let mut moved = 0;
        for key in keys {
            if let Some(section) = state.sections.get_mut(&key) {
                for mut item in section.items.drain(..) {
                    item.clear_placement();
                    state.pool.push(item);
                    moved += 1;
                }
            }
        }

        if moved == 0 {
            return ignored(IgnoredReason::NothingPlaced);
        }
        info!("Returned {} placed item(s) to the pool", moved);
        MutationOutcome::Applied
    }

    /// Move up to `count` pool items registered for the section's content into it
    ///
    /// Items are taken in pool order. Returns how many were placed.
    pub fn auto_assign_from_pool(&self, section_id: &str, count: usize) -> usize {
        let mut guard = self.state();
        let state = &mut *guard;

        let Some(section) = state.sections.get_mut(section_id) else {
            debug!("Auto-assign ignored: unknown section '{}'", section_id);
            return 0;
        };

        let mut moved = 0;
        let mut remaining = Vec::with_capacity(state.pool.len());
        for mut item in state.pool.drain(..) {
            if moved < count && item.content_id == section.content_id {
                item.place(&section.content_id, section.len() as u32 + 1);
                section.items.push(item);
                moved += 1;
            } else {
                remaining.push(item);
            }
        }
        state.pool = remaining;

        debug!("Auto-assigned {} item(s) to section '{}'", moved, section_id);
        moved
    }

    // ------------------------------------------------------------------
    // Scope
    // ------------------------------------------------------------------

    /// Switch content type and clear the arrangement; call [`load`](Self::load) again afterwards
    pub fn set_content_type(&self, content_type: ContentType) {
        let mut state = self.state();
        // Responses for the previous scope must not land in the new one
        self.switch_scope();
        state.scope.content_type = content_type;
        state.clear_arrangement();
    }

    /// Switch competition and clear the arrangement
    pub fn set_competition_id(&self, competition_id: Option<String>) {
        let mut state = self.state();
        self.switch_scope();
        state.scope.competition_id = competition_id;
        state.clear_arrangement();
    }

    /// Forget scope, arrangement, catalog and error
    pub fn reset(&self) {
        let mut state = self.state();
        self.switch_scope();
        *state = ArrangementState::default();
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Running order of every section as a downloadable file
    pub fn export_snapshot(&self) -> ArrangementResult<ExportSnapshot> {
        let state = self.state();
        let document = ExportDocument {
            content_type: state.scope.content_type,
            sections: state.sorted_sections(),
        };

        Ok(ExportSnapshot {
            file_name: state.scope.content_type.export_file_name(),
            contents: serde_json::to_string_pretty(&document)?,
        })
    }

    /// Body that [`save`](Self::save) would send right now
    pub fn save_payload(&self) -> SaveArrangement {
        self.state().save_payload()
    }

    pub fn scope(&self) -> Scope {
        self.state().scope.clone()
    }

    pub fn pool(&self) -> Vec<AssignableItem> {
        self.state().pool.clone()
    }

    /// Pool items passing the given filters
    pub fn pool_filtered(&self, filters: &ItemFilters) -> Vec<AssignableItem> {
        self.state()
            .pool
            .iter()
            .filter(|item| filters.matches(item))
            .cloned()
            .collect()
    }

    /// Every section, ordered by name
    pub fn sections(&self) -> Vec<Section> {
        self.state().sorted_sections().into_iter().cloned().collect()
    }

    pub fn section(&self, section_id: &str) -> Option<Section> {
        self.state().sections.get(section_id).cloned()
    }

    pub fn content_catalog(&self) -> Vec<ContentItem> {
        self.state().catalog.clone()
    }

    /// Number of items currently placed in any section
    pub fn placed_count(&self) -> usize {
        self.state().sections.values().map(Section::len).sum()
    }

    /// Whether any gateway call is pending
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state().last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::Gender;
    use crate::gateway::MemoryGateway;

    const COMPETITION: &str = "cup";

    fn athlete(id: &str, name: &str, content_id: &str) -> AssignableItem {
        AssignableItem::athlete(id, name, Gender::Male, content_id)
    }

    async fn store_with(arrangement: Arrangement) -> ArrangementStore<MemoryGateway> {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.set_arrangement(COMPETITION, ContentType::Quyen, arrangement);
        let store = ArrangementStore::new(gateway).with_rng_seed(11);
        assert!(store.load(COMPETITION, ContentType::Quyen).await.is_applied());
        store
    }

    fn ids(section: &Section) -> Vec<String> {
        section.items.iter().map(|item| item.id.clone()).collect()
    }

    fn indices(section: &Section) -> Vec<u32> {
        section
            .items
            .iter()
            .map(|item| item.order_index.unwrap_or(0))
            .collect()
    }

    #[tokio::test]
    async fn test_load_indexes_sections_and_normalizes_order() {
        let mut section = Section::new("s", "Forms");
        let mut first = athlete("1", "Binh", "s");
        first.place("s", 4);
        let mut second = athlete("2", "An", "s");
        second.place("s", 2);
        section.items = vec![first, second];

        let store = store_with(Arrangement {
            pool: vec![athlete("3", "Cuong", "s")],
            sections: vec![section],
        })
        .await;

        let section = store.section("s").unwrap();
        assert_eq!(ids(&section), vec!["2", "1"]);
        assert_eq!(indices(&section), vec![1, 2]);
        assert_eq!(store.pool().len(), 1);
        assert_eq!(
            store.scope(),
            Scope {
                competition_id: Some(COMPETITION.to_string()),
                content_type: ContentType::Quyen
            }
        );
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_load_repairs_duplicate_ids_and_sections() {
        let mut placed = athlete("1", "Binh", "s");
        placed.place("s", 1);
        let mut first = Section::new("s", "Forms");
        first.items = vec![placed];

        let mut other = athlete("2", "An", "s");
        other.place("s", 1);
        let mut again = athlete("1", "Binh", "s");
        again.place("s", 2);
        let mut second = Section::new("s", "Forms");
        second.items = vec![other, again];

        let store = store_with(Arrangement {
            pool: vec![
                athlete("1", "Binh", "s"),
                athlete("3", "Cuong", "s"),
                athlete("3", "Cuong", "s"),
            ],
            sections: vec![first, second],
        })
        .await;

        let sections = store.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(ids(&sections[0]), vec!["1", "2"]);
        assert_eq!(indices(&sections[0]), vec![1, 2]);

        let pool: Vec<String> = store.pool().into_iter().map(|item| item.id).collect();
        assert_eq!(pool, vec!["3"]);
        assert_eq!(store.placed_count(), 2);
    }

    #[tokio::test]
    async fn test_add_to_section_appends_and_removes_from_pool() {
        let store = store_with(Arrangement {
            pool: vec![athlete("1", "Binh", "s"), athlete("2", "An", "s")],
            sections: vec![Section::new("s", "Forms")],
        })
        .await;

        let item = store.pool()[0].clone();
        assert!(store.add_to_section("s", item).is_applied());

        let section = store.section("s").unwrap();
        assert_eq!(ids(&section), vec!["1"]);
        assert_eq!(indices(&section), vec![1]);
        assert_eq!(section.items[0].section_id.as_deref(), Some("s"));
        assert_eq!(store.pool().len(), 1);
    }

    #[tokio::test]
    async fn test_add_to_section_twice_is_ignored() {
        let store = store_with(Arrangement {
            pool: vec![athlete("1", "Binh", "s")],
            sections: vec![Section::new("s", "Forms")],
        })
        .await;

        let item = store.pool()[0].clone();
        assert!(store.add_to_section("s", item.clone()).is_applied());
        assert_eq!(
            store.add_to_section("s", item),
            MutationOutcome::Ignored(IgnoredReason::AlreadyInSection {
                section: "s".to_string(),
                item: "1".to_string()
            })
        );
        assert_eq!(store.section("s").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_to_unknown_section_is_ignored() {
        let store = store_with(Arrangement {
            pool: vec![athlete("1", "Binh", "s")],
            sections: vec![Section::new("s", "Forms")],
        })
        .await;

        let item = store.pool()[0].clone();
        assert_eq!(
            store.add_to_section("missing", item),
            MutationOutcome::Ignored(IgnoredReason::UnknownSection("missing".to_string()))
        );
        assert_eq!(store.pool().len(), 1);
    }

    #[tokio::test]
    async fn test_add_from_other_section_moves_item() {
        let store = store_with(Arrangement {
            pool: vec![athlete("1", "Binh", "a"), athlete("2", "An", "a")],
            sections: vec![Section::new("a", "A"), Section::new("b", "B")],
        })
        .await;

        for item in store.pool() {
            let _ = store.add_to_section("a", item);
        }
        let dragged = store.section("a").unwrap().items[0].clone();
        assert!(store.add_to_section("b", dragged).is_applied());

        let a = store.section("a").unwrap();
        let b = store.section("b").unwrap();
        assert_eq!(ids(&a), vec!["2"]);
        assert_eq!(indices(&a), vec![1]);
        assert_eq!(ids(&b), vec!["1"]);
        assert_eq!(b.items[0].section_id.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_add_unknown_item_still_appends() {
        let store = store_with(Arrangement {
            pool: Vec::new(),
            sections: vec![Section::new("s", "Forms")],
        })
        .await;

        assert!(
            store
                .add_to_section("s", athlete("99", "Ghost", "s"))
                .is_applied()
        );
        assert_eq!(ids(&store.section("s").unwrap()), vec!["99"]);
    }

    #[tokio::test]
    async fn test_remove_renumbers_and_clears_placement() {
        let store = store_with(Arrangement {
            pool: vec![
                athlete("1", "A", "s"),
                athlete("2", "B", "s"),
                athlete("3", "C", "s"),
            ],
            sections: vec![Section::new("s", "Forms")],
        })
        .await;
        assert_eq!(store.auto_assign_from_pool("s", 3), 3);

        assert!(store.move_back_to_pool("s", "2").is_applied());

        let section = store.section("s").unwrap();
        assert_eq!(ids(&section), vec!["1", "3"]);
        assert_eq!(indices(&section), vec![1, 2]);

        let pool = store.pool();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, "2");
        assert!(!pool[0].is_placed());

        assert!(matches!(
            store.remove_from_section("s", "2"),
            MutationOutcome::Ignored(IgnoredReason::ItemNotInSection { .. })
        ));
    }

    #[tokio::test]
    async fn test_move_within_bounds_swaps_neighbours() {
        let store = store_with(Arrangement {
            pool: vec![
                athlete("1", "A", "s"),
                athlete("2", "B", "s"),
                athlete("3", "C", "s"),
            ],
            sections: vec![Section::new("s", "Forms")],
        })
        .await;
        let _ = store.auto_assign_from_pool("s", 3);

        assert!(store.move_item_in_section("s", "3", -1).is_applied());
        let section = store.section("s").unwrap();
        assert_eq!(ids(&section), vec!["1", "3", "2"]);
        assert_eq!(indices(&section), vec![1, 2, 3]);

        assert!(store.move_item_in_section("s", "1", 1).is_applied());
        assert_eq!(ids(&store.section("s").unwrap()), vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn test_move_past_ends_is_ignored() {
        let store = store_with(Arrangement {
            pool: vec![athlete("1", "A", "s"), athlete("2", "B", "s")],
            sections: vec![Section::new("s", "Forms")],
        })
        .await;
        let _ = store.auto_assign_from_pool("s", 2);
        let before = store.section("s").unwrap();

        assert!(matches!(
            store.move_item_in_section("s", "1", -1),
            MutationOutcome::Ignored(IgnoredReason::OutOfBounds { .. })
        ));
        assert!(matches!(
            store.move_item_in_section("s", "2", 1),
            MutationOutcome::Ignored(IgnoredReason::OutOfBounds { .. })
        ));
        assert_eq!(store.section("s").unwrap(), before);
    }

    #[tokio::test]
    async fn test_shuffle_and_seed_on_empty_section_are_ignored() {
        let store = store_with(Arrangement {
            pool: Vec::new(),
            sections: vec![Section::new("s", "Forms")],
        })
        .await;

        assert_eq!(
            store.shuffle_section("s"),
            MutationOutcome::Ignored(IgnoredReason::EmptySection("s".to_string()))
        );
        assert_eq!(
            store.seed_section("s"),
            MutationOutcome::Ignored(IgnoredReason::EmptySection("s".to_string()))
        );
        assert!(matches!(
            store.shuffle_section("nope"),
            MutationOutcome::Ignored(IgnoredReason::UnknownSection(_))
        ));
    }

    #[tokio::test]
    async fn test_shuffle_keeps_membership() {
        let pool: Vec<AssignableItem> = (1..=8)
            .map(|n| athlete(&n.to_string(), &format!("Name {}", n), "s"))
            .collect();
        let store = store_with(Arrangement {
            pool,
            sections: vec![Section::new("s", "Forms")],
        })
        .await;
        let _ = store.auto_assign_from_pool("s", 8);

        assert!(store.shuffle_section("s").is_applied());

        let section = store.section("s").unwrap();
        let mut shuffled = ids(&section);
        shuffled.sort_by_key(|id| id.parse::<u32>().unwrap_or(0));
        let expected: Vec<String> = (1..=8).map(|n| n.to_string()).collect();
        assert_eq!(shuffled, expected);
        assert!(ordering::is_contiguous(&section.items));
    }

    #[tokio::test]
    async fn test_reset_all_keeps_sections() {
        let store = store_with(Arrangement {
            pool: vec![athlete("1", "A", "a"), athlete("2", "B", "b")],
            sections: vec![Section::new("a", "A"), Section::new("b", "B")],
        })
        .await;
        let _ = store.auto_assign_from_pool("a", 1);
        let _ = store.auto_assign_from_pool("b", 1);
        assert_eq!(store.placed_count(), 2);

        assert!(store.reset_all().is_applied());
        assert_eq!(store.placed_count(), 0);
        assert_eq!(store.sections().len(), 2);
        assert!(store.pool().iter().all(|item| !item.is_placed()));

        assert_eq!(
            store.reset_all(),
            MutationOutcome::Ignored(IgnoredReason::NothingPlaced)
        );
        assert_eq!(store.pool().len(), 2);
    }

    #[tokio::test]
    async fn test_auto_assign_matches_content_and_count() {
        let store = store_with(Arrangement {
            pool: vec![
                athlete("1", "A", "a"),
                athlete("2", "B", "b"),
                athlete("3", "C", "a"),
                athlete("4", "D", "a"),
            ],
            sections: vec![Section::new("a", "A"), Section::new("b", "B")],
        })
        .await;

        assert_eq!(store.auto_assign_from_pool("a", 2), 2);
        let a = store.section("a").unwrap();
        assert_eq!(ids(&a), vec!["1", "3"]);
        assert_eq!(indices(&a), vec![1, 2]);

        let pool: Vec<String> = store.pool().into_iter().map(|item| item.id).collect();
        assert_eq!(pool, vec!["2", "4"]);
        assert_eq!(store.auto_assign_from_pool("missing", 5), 0);
    }

    #[tokio::test]
    async fn test_set_content_type_clears_without_reload() {
        let store = store_with(Arrangement {
            pool: vec![athlete("1", "A", "a")],
            sections: vec![Section::new("a", "A")],
        })
        .await;

        store.set_content_type(ContentType::Music);

        assert!(store.pool().is_empty());
        assert!(store.sections().is_empty());
        assert_eq!(store.scope().content_type, ContentType::Music);
        assert_eq!(store.scope().competition_id.as_deref(), Some(COMPETITION));
    }

    #[tokio::test]
    async fn test_reset_forgets_scope() {
        let store = store_with(Arrangement::default()).await;
        store.reset();
        assert_eq!(store.scope(), Scope::default());
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn test_save_without_competition_records_error() {
        let store = ArrangementStore::new(Arc::new(MemoryGateway::new()));
        let outcome = store.save().await;

        assert_eq!(
            outcome,
            RequestOutcome::Failed("Select a competition first".to_string())
        );
        assert_eq!(
            store.last_error().as_deref(),
            Some("Select a competition first")
        );
    }

    #[tokio::test]
    async fn test_save_payload_uses_positions() {
        let store = store_with(Arrangement {
            pool: vec![athlete("1", "A", "s"), athlete("2", "B", "s")],
            sections: vec![Section::new("s", "Forms"), Section::new("e", "Empty")],
        })
        .await;
        let _ = store.auto_assign_from_pool("s", 2);

        let payload = store.save_payload();
        assert_eq!(payload.content_type, ContentType::Quyen);
        assert_eq!(payload.sections.len(), 2);
        assert_eq!(payload.sections[0].content_id, "e");
        assert!(payload.sections[0].items.is_empty());

        let orders: Vec<(String, u32)> = payload.sections[1]
            .items
            .iter()
            .map(|placement| (placement.id.clone(), placement.order_index))
            .collect();
        assert_eq!(
            orders,
            vec![("1".to_string(), 1), ("2".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_export_snapshot() {
        let store = store_with(Arrangement {
            pool: vec![athlete("1", "A", "s")],
            sections: vec![Section::new("s", "Forms")],
        })
        .await;
        let _ = store.auto_assign_from_pool("s", 1);

        let snapshot = store.export_snapshot().unwrap();
        assert_eq!(snapshot.file_name, "order-quyen.json");

        let value: serde_json::Value = serde_json::from_str(&snapshot.contents).unwrap();
        assert_eq!(value["contentType"], "QUYEN");
        assert_eq!(value["sections"][0]["contentId"], "s");
        assert_eq!(value["sections"][0]["items"][0]["orderIndex"], 1);
        assert!(value.get("pool").is_none());
        assert!(snapshot.contents.contains('\n'));
    }

    #[test]
    fn test_response_policy_parse() {
        assert_eq!("latest".parse::<ResponsePolicy>(), Ok(ResponsePolicy::LatestRequest));
        assert_eq!("last-resolved".parse::<ResponsePolicy>(), Ok(ResponsePolicy::LastResolved));
        assert!("newest".parse::<ResponsePolicy>().is_err());
    }
}
