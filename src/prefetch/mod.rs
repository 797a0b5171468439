//! Prefetch Buffer Manager
//!
//! Client-side component behind "load more": serves recommendation batches
//! from a per-category buffer of already-fetched items and keeps that buffer
//! topped up with single-flight background refills, so paging through
//! results almost never blocks on network latency.
//!
//! Context switches (new category, new paid search) bump a generation
//! counter instead of cancelling the in-flight fetch: late results whose
//! generation no longer matches are discarded, never merged into the new
//! context's buffer.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::PlanError;
use crate::types::{RecommendationItem, RecommendationQuery};

/// Exclusion-list-aware batch fetch, implemented by the network layer.
/// `exclude` carries every name already shown or buffered so the backend
/// does not repeat recommendations.
#[async_trait]
pub trait BatchFetcher: Send + Sync + 'static {
    async fn fetch_batch(
        &self,
        query: &RecommendationQuery,
        exclude: &[String],
    ) -> Result<Vec<RecommendationItem>, PlanError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PrefetchConfig {
    /// Items handed to the UI per "load more".
    pub batch_size: usize,
    /// Purchased queue depth; the buffer target is `batch_size * queue_size`.
    pub queue_size: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            queue_size: 1,
        }
    }
}

struct CategoryState {
    query: RecommendationQuery,
    buffer: VecDeque<RecommendationItem>,
    /// Names already surfaced or buffered, in order of first appearance.
    seen: Vec<String>,
    generation: u64,
    refill_in_flight: bool,
    /// Error from the most recent failed refill, delivered to the next
    /// waiting `load_more` call.
    refill_error: Option<PlanError>,
    /// Bumped on every state change. Waiters subscribe under the state lock,
    /// so a change landing between subscribe and await is still observed.
    version: watch::Sender<u64>,
}

impl Default for CategoryState {
    fn default() -> Self {
        Self {
            query: RecommendationQuery::default(),
            buffer: VecDeque::new(),
            seen: Vec::new(),
            generation: 0,
            refill_in_flight: false,
            refill_error: None,
            version: watch::channel(0).0,
        }
    }
}

impl CategoryState {
    fn wake_waiters(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

/// Per-category buffer manager with single-flight background refills.
pub struct PrefetchManager<F: BatchFetcher> {
    fetcher: Arc<F>,
    config: PrefetchConfig,
    categories: Arc<Mutex<HashMap<String, CategoryState>>>,
}

impl<F: BatchFetcher> PrefetchManager<F> {
    pub fn new(fetcher: Arc<F>, config: PrefetchConfig) -> Self {
        Self {
            fetcher,
            config,
            categories: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start a new query context for a category: reset its buffer, record
    /// the first foreground page as shown, and top up in the background.
    /// Stale buffered items from the previous context are discarded, and any
    /// parked `load_more` waiter resolves empty.
    pub fn begin_search(
        &self,
        category: &str,
        query: RecommendationQuery,
        first_page: &[RecommendationItem],
    ) {
        let mut categories = self.categories.lock().expect("category map lock");
        let state = categories.entry(category.to_string()).or_default();
        state.generation += 1;
        state.query = query;
        state.buffer.clear();
        state.seen = first_page.iter().map(|i| i.name.clone()).collect();
        state.refill_in_flight = false;
        state.refill_error = None;
        state.wake_waiters();
        self.maybe_refill(category, state);
    }

    /// Hand the next batch to the caller.
    ///
    /// Buffer non-empty: drain up to `batch_size` items immediately, no
    /// network round trip and no further billing (the session quota already
    /// covered them). Buffer empty: wait for the in-flight refill (starting
    /// one if none is running), then drain. A context switch while waiting
    /// resolves with an empty batch.
    pub async fn load_more(&self, category: &str) -> Result<Vec<RecommendationItem>, PlanError> {
        let mut entered_generation = None;
        loop {
            let mut rx = {
                let mut categories = self.categories.lock().expect("category map lock");
                let state = categories.get_mut(category).ok_or_else(|| {
                    PlanError::InvalidParameter(format!("no active search for category {category}"))
                })?;

                let entered = *entered_generation.get_or_insert(state.generation);
                if state.generation != entered {
                    // The waiting state was cancelled by a new query context.
                    return Ok(Vec::new());
                }
                if let Some(err) = state.refill_error.take() {
                    return Err(err);
                }
                if !state.buffer.is_empty() {
                    let take = self.config.batch_size.min(state.buffer.len());
                    let batch: Vec<RecommendationItem> = state.buffer.drain(..take).collect();
                    self.maybe_refill(category, state);
                    return Ok(batch);
                }

                self.maybe_refill(category, state);
                state.version.subscribe()
            };
            if rx.changed().await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    /// How many items are currently buffered for a category.
    pub fn buffered(&self, category: &str) -> usize {
        self.categories
            .lock()
            .expect("category map lock")
            .get(category)
            .map(|s| s.buffer.len())
            .unwrap_or(0)
    }

    fn target(&self) -> usize {
        self.config.batch_size * self.config.queue_size
    }

    /// Single-flight refill trigger; called with the state lock held.
    /// Spawns the fetch task when the buffer is below target and no fetch is
    /// already running.
    fn maybe_refill(&self, category: &str, state: &mut CategoryState) {
        if state.refill_in_flight || state.buffer.len() >= self.target() {
            return;
        }
        state.refill_in_flight = true;

        let fetcher = Arc::clone(&self.fetcher);
        let categories = Arc::clone(&self.categories);
        let category = category.to_string();
        let query = state.query.clone();
        let exclude = state.seen.clone();
        let generation = state.generation;

        tokio::spawn(async move {
            let result = fetcher.fetch_batch(&query, &exclude).await;

            let mut categories = categories.lock().expect("category map lock");
            let Some(state) = categories.get_mut(&category) else {
                return;
            };
            if state.generation != generation {
                // Late result from a stale context: ignore entirely. The new
                // context started its own refill when it reset the state.
                tracing::debug!(%category, "discarding stale refill result");
                return;
            }
            state.refill_in_flight = false;
            match result {
                Ok(items) => {
                    for item in items {
                        if !state.seen.contains(&item.name) {
                            state.seen.push(item.name.clone());
                            state.buffer.push_back(item);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(%category, error = %e, "background refill failed");
                    state.refill_error = Some(e);
                }
            }
            state.wake_waiters();
        });
    }
}
