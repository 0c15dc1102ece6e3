//! Browser orchestrator.
//!
//! [`Browser::load`] drives one request through cache-then-query
//! sequencing and publishes results on watch channels. Three sequential
//! workers do the blocking work:
//!
//! - `cache`: optional provisional read of the cached snapshot;
//! - `query`: the authoritative repository query, followed by a cache write;
//! - `prefetch`: hierarchy children one level deeper, written to the cache only.
//!
//! Every request takes a new [`RequestTicket`]. Work finishing under a
//! superseded ticket is dropped silently, so the latest request always wins.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, ResultCache};
use crate::error::Result;
use crate::model::DisplayEntry;
use crate::repository::{QueryOptions, QueryShape, VideoRepository};
use crate::worker::{Generation, RequestTicket, SerialWorker};

/// Default number of hierarchy children prefetched after a level loads.
pub const DEFAULT_PREFETCH_LIMIT: usize = 6;

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Prefetch hierarchy children after a hierarchy load.
    #[serde(default = "default_true")]
    pub prefetch_enabled: bool,

    /// Maximum number of children prefetched per load.
    #[serde(default = "default_prefetch_limit")]
    pub prefetch_limit: usize,
}

const fn default_true() -> bool {
    true
}

const fn default_prefetch_limit() -> usize {
    DEFAULT_PREFETCH_LIMIT
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            prefetch_enabled: true,
            prefetch_limit: DEFAULT_PREFETCH_LIMIT,
        }
    }
}

impl BrowserConfig {
    /// Turn prefetching off.
    #[must_use]
    pub const fn without_prefetch(mut self) -> Self {
        self.prefetch_enabled = false;
        self
    }

    /// Set the prefetch limit.
    #[must_use]
    pub const fn with_prefetch_limit(mut self, limit: usize) -> Self {
        self.prefetch_limit = limit;
        self
    }
}

/// Whether the index let us in on the most recent completed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessState {
    /// Queries are answered.
    #[default]
    Granted,
    /// The index refused access. Distinct from an empty result.
    Denied,
}

/// One browse request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// What to query.
    pub shape: QueryShape,
    /// Sort and exclusion settings.
    pub options: QueryOptions,
    /// Publish a cached snapshot first, if one exists.
    pub use_cache: bool,
    /// Drive the refreshing indicator instead of the loading indicator.
    pub show_refreshing: bool,
}

impl LoadRequest {
    /// Request for `shape` with `options`, no cache assist.
    #[must_use]
    pub const fn new(shape: QueryShape, options: QueryOptions) -> Self {
        Self {
            shape,
            options,
            use_cache: false,
            show_refreshing: false,
        }
    }

    /// Serve a cached snapshot while the query runs.
    #[must_use]
    pub const fn with_cache(mut self) -> Self {
        self.use_cache = true;
        self
    }

    /// Use the refreshing indicator.
    #[must_use]
    pub const fn refreshing(mut self) -> Self {
        self.show_refreshing = true;
        self
    }
}

/// Observable browser state.
#[derive(Debug, Clone)]
pub struct BrowserView {
    /// Latest published entries; `None` until the first publish.
    pub items: watch::Receiver<Option<Vec<DisplayEntry>>>,
    /// Loading indicator.
    pub loading: watch::Receiver<bool>,
    /// Refreshing indicator.
    pub refreshing: watch::Receiver<bool>,
    /// Index access state.
    pub access: watch::Receiver<AccessState>,
}

#[derive(Debug)]
struct Outputs {
    items: watch::Sender<Option<Vec<DisplayEntry>>>,
    loading: watch::Sender<bool>,
    refreshing: watch::Sender<bool>,
    access: watch::Sender<AccessState>,
}

impl Outputs {
    fn new() -> Self {
        Self {
            items: watch::Sender::new(None),
            loading: watch::Sender::new(false),
            refreshing: watch::Sender::new(false),
            access: watch::Sender::new(AccessState::Granted),
        }
    }

    fn indicator(&self, show_refreshing: bool) -> &watch::Sender<bool> {
        if show_refreshing {
            &self.refreshing
        } else {
            &self.loading
        }
    }

    fn clear_indicators(&self) {
        self.loading.send_replace(false);
        self.refreshing.send_replace(false);
    }
}

/// State shared by the jobs of one request.
#[derive(Debug)]
struct RequestState {
    ticket: RequestTicket,
    /// Set once the authoritative result is out; later provisional
    /// results from the cache must not overwrite it.
    settled: Mutex<bool>,
}

impl RequestState {
    /// Run `publish` if the request is still current and `allow` accepts
    /// the settled flag, then store the flag `publish` returns.
    fn publish_if(&self, allow: impl FnOnce(bool) -> bool, publish: impl FnOnce() -> bool) {
        let mut settled = self.settled.lock().unwrap_or_else(PoisonError::into_inner);
        if self.ticket.is_current() && allow(*settled) {
            *settled = publish();
        }
    }
}

/// Coordinates cache reads, authoritative queries and prefetching.
pub struct Browser {
    repository: Arc<dyn VideoRepository>,
    cache: Arc<ResultCache>,
    config: BrowserConfig,
    generation: Generation,
    outputs: Arc<Outputs>,
    query_worker: SerialWorker,
    cache_worker: SerialWorker,
    prefetch_worker: SerialWorker,
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("config", &self.config)
            .field("generation", &self.generation.current())
            .finish_non_exhaustive()
    }
}

impl Browser {
    /// Create a browser. Must be called from within a tokio runtime.
    pub fn new(
        repository: Arc<dyn VideoRepository>,
        cache: Arc<ResultCache>,
        config: BrowserConfig,
    ) -> Result<Self> {
        info!(
            "Starting browser (cache enabled: {}, prefetch: {})",
            cache.is_enabled(),
            config.prefetch_enabled
        );
        Ok(Self {
            repository,
            cache,
            config,
            generation: Generation::new(),
            outputs: Arc::new(Outputs::new()),
            query_worker: SerialWorker::spawn("query")?,
            cache_worker: SerialWorker::spawn("cache")?,
            prefetch_worker: SerialWorker::spawn("prefetch")?,
        })
    }

    /// Observe published state.
    #[must_use]
    pub fn subscribe(&self) -> BrowserView {
        BrowserView {
            items: self.outputs.items.subscribe(),
            loading: self.outputs.loading.subscribe(),
            refreshing: self.outputs.refreshing.subscribe(),
            access: self.outputs.access.subscribe(),
        }
    }

    /// Latest published entries.
    #[must_use]
    pub fn items(&self) -> Option<Vec<DisplayEntry>> {
        self.outputs.items.borrow().clone()
    }

    /// Start `request`, superseding any earlier one. Returns the request id.
    pub fn load(&self, request: LoadRequest) -> u64 {
        let ticket = self.generation.advance();
        let id = ticket.id();
        let key = CacheKey::new(&request.shape, &request.options);
        debug!("Load #{} {:?} (cache: {})", id, request.shape, request.use_cache);

        if !request.use_cache {
            self.outputs
                .indicator(request.show_refreshing)
                .send_replace(true);
        }

        let state = Arc::new(RequestState {
            ticket,
            settled: Mutex::new(false),
        });

        if request.use_cache {
            self.submit_cache_read(&state, key.clone(), request.show_refreshing);
        }
        self.submit_query(state, key, request);
        id
    }

    fn submit_cache_read(&self, state: &Arc<RequestState>, key: CacheKey, show_refreshing: bool) {
        let state = Arc::clone(state);
        let cache = Arc::clone(&self.cache);
        let outputs = Arc::clone(&self.outputs);
        self.cache_worker.submit(move || {
            let cached = cache.read(&key).filter(|items| !items.is_empty());
            state.publish_if(
                |settled| !settled,
                || {
                    let indicator = outputs.indicator(show_refreshing);
                    match cached {
                        Some(items) => {
                            debug!("Publishing {} cached entries", items.len());
                            outputs.items.send_replace(Some(items));
                            indicator.send_replace(false);
                        }
                        None => {
                            indicator.send_replace(true);
                        }
                    }
                    false
                },
            );
        });
    }

    fn submit_query(&self, state: Arc<RequestState>, key: CacheKey, request: LoadRequest) {
        let repository = Arc::clone(&self.repository);
        let cache = Arc::clone(&self.cache);
        let outputs = Arc::clone(&self.outputs);
        let prefetch = self.prefetcher();

        self.query_worker.submit(move || {
            let id = state.ticket.id();
            match request.shape.run(repository.as_ref(), &request.options) {
                Ok(items) => {
                    cache.write(&key, &items);
                    let mut published = false;
                    state.publish_if(
                        |_| true,
                        || {
                            outputs.access.send_replace(AccessState::Granted);
                            outputs.items.send_replace(Some(items.clone()));
                            outputs.clear_indicators();
                            published = true;
                            true
                        },
                    );
                    if !published {
                        debug!("Load #{} superseded, dropping result", id);
                        return;
                    }
                    if matches!(request.shape, QueryShape::Hierarchy(_)) {
                        if let Some(prefetch) = prefetch {
                            prefetch.run(&items, &state.ticket, &request.options);
                        }
                    }
                }
                Err(e) if e.is_permission_denied() => {
                    warn!("Load #{} denied: {}", id, e);
                    state.publish_if(
                        |_| true,
                        || {
                            outputs.access.send_replace(AccessState::Denied);
                            outputs.clear_indicators();
                            true
                        },
                    );
                }
                Err(e) => {
                    warn!("Load #{} failed: {}", id, e);
                    state.publish_if(
                        |_| true,
                        || {
                            outputs.clear_indicators();
                            true
                        },
                    );
                }
            }
        });
    }

    fn prefetcher(&self) -> Option<Prefetcher> {
        (self.config.prefetch_enabled && self.config.prefetch_limit > 0).then(|| Prefetcher {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
            worker: self.prefetch_worker.clone(),
            limit: self.config.prefetch_limit,
        })
    }

    /// Wait until all work queued so far, including prefetches it triggers,
    /// has finished.
    pub async fn settle(&self) {
        self.cache_worker.flush().await;
        self.query_worker.flush().await;
        self.prefetch_worker.flush().await;
    }
}

/// Warms the cache for hierarchy children of a freshly published level.
struct Prefetcher {
    repository: Arc<dyn VideoRepository>,
    cache: Arc<ResultCache>,
    worker: SerialWorker,
    limit: usize,
}

impl Prefetcher {
    fn child_paths(&self, items: &[DisplayEntry]) -> Vec<String> {
        let mut seen = HashSet::new();
        items
            .iter()
            .filter_map(|item| match item {
                DisplayEntry::HierarchyNode(node) if !node.path.is_empty() => {
                    Some(node.path.clone())
                }
                _ => None,
            })
            .filter(|path| seen.insert(path.clone()))
            .take(self.limit)
            .collect()
    }

    fn run(self, items: &[DisplayEntry], ticket: &RequestTicket, options: &QueryOptions) {
        let paths = self.child_paths(items);
        if paths.is_empty() {
            return;
        }
        let ticket = ticket.clone();
        let options = options.clone();
        let Self {
            repository,
            cache,
            worker,
            ..
        } = self;

        worker.submit(move || {
            for path in paths {
                if !ticket.is_current() {
                    debug!("Prefetch for #{} superseded", ticket.id());
                    break;
                }
                let key = CacheKey::new(&QueryShape::Hierarchy(path.clone()), &options);
                if cache.read(&key).is_some_and(|items| !items.is_empty()) {
                    continue;
                }
                match repository.load_hierarchy(&path, &options) {
                    Ok(items) => {
                        debug!("Prefetched {} ({} entries)", path, items.len());
                        cache.write(&key, &items);
                    }
                    Err(e) => {
                        debug!("Prefetch of {} stopped: {}", path, e);
                        break;
                    }
                }
            }
        });
    }
}
