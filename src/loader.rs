//! Dependent Pagination Loader
//!
//! Resolves a fixed set of asset ids (an album) against the append-only gallery
//! entry by requesting one more page at a time, only while ids are missing and the
//! server reports more pages. At most one fetch per entry is ever outstanding; an
//! observer that finds a fetch in flight returns `Pending` instead of issuing another.

use crate::cache::{CacheEntry, CacheKey, FetchTicket, QueryCache};
use crate::error::GalleryError;
use crate::service::AssetQuery;
use crate::types::AssetId;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the loader should do next for one observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadDecision {
    Resolved,
    /// Server has no more pages; the remaining ids are broken references
    Exhausted { missing: BTreeSet<AssetId> },
    InFlight { missing: BTreeSet<AssetId> },
    FetchNext { missing: BTreeSet<AssetId> },
}

/// Compute the next step from the target ids and the currently loaded entry.
pub fn evaluate(target: &HashSet<AssetId>, entry: Option<&CacheEntry>) -> LoadDecision {
    if target.is_empty() {
        return LoadDecision::Resolved;
    }
    let loaded = entry.map(CacheEntry::asset_ids).unwrap_or_default();
    let missing: BTreeSet<AssetId> = target.difference(&loaded).copied().collect();
    if missing.is_empty() {
        return LoadDecision::Resolved;
    }
    match entry {
        Some(entry) if entry.is_fetching() => LoadDecision::InFlight { missing },
        Some(entry) if !entry.has_more() && !entry.is_stale() => {
            LoadDecision::Exhausted { missing }
        }
        _ => LoadDecision::FetchNext { missing },
    }
}

/// Final state of one `ensure_resolved` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every target id is loaded
    Resolved { fetched: usize },
    /// Server exhausted; `missing` are broken references
    Partial { missing: Vec<AssetId>, fetched: usize },
    /// Another observer's fetch is outstanding
    Pending { missing: Vec<AssetId>, fetched: usize },
    /// A page request failed; the loader stopped without retrying
    Failed {
        missing: Vec<AssetId>,
        fetched: usize,
        error: String,
    },
}

impl Resolution {
    pub fn fetched(&self) -> usize {
        match self {
            Resolution::Resolved { fetched }
            | Resolution::Partial { fetched, .. }
            | Resolution::Pending { fetched, .. }
            | Resolution::Failed { fetched, .. } => *fetched,
        }
    }

    pub fn missing(&self) -> &[AssetId] {
        match self {
            Resolution::Resolved { .. } => &[],
            Resolution::Partial { missing, .. }
            | Resolution::Pending { missing, .. }
            | Resolution::Failed { missing, .. } => missing,
        }
    }
}

/// Releases an entry's fetch slot if the fetch future is dropped or fails
struct FetchGuard<'a> {
    cache: &'a QueryCache,
    ticket: Option<FetchTicket>,
}

impl<'a> FetchGuard<'a> {
    fn new(cache: &'a QueryCache, ticket: FetchTicket) -> Self {
        Self {
            cache,
            ticket: Some(ticket),
        }
    }

    fn ticket(&self) -> Option<&FetchTicket> {
        self.ticket.as_ref()
    }

    fn complete(mut self, page: crate::cache::Page) {
        if let Some(ticket) = self.ticket.take() {
            self.cache.complete_fetch(&ticket, page);
        }
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.cache.abort_fetch(&ticket.key);
        }
    }
}

pub struct DependentLoader {
    cache: Arc<QueryCache>,
    source: Arc<dyn AssetQuery>,
    page_size: usize,
}

impl DependentLoader {
    pub fn new(cache: Arc<QueryCache>, source: Arc<dyn AssetQuery>, page_size: usize) -> Self {
        Self {
            cache,
            source,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch pages of `key` until every id in `target` is loaded or the server is
    /// exhausted.
    pub async fn ensure_resolved(&self, key: &CacheKey, target: &HashSet<AssetId>) -> Resolution {
        let mut fetched = 0;
        loop {
            let snapshot = self.cache.snapshot(key);
            let missing = match evaluate(target, snapshot.as_ref()) {
                LoadDecision::Resolved => {
                    debug!(key = %key, fetched, "Target resolved");
                    return Resolution::Resolved { fetched };
                }
                LoadDecision::Exhausted { missing } => {
                    info!(key = %key, missing = missing.len(), fetched, "Server exhausted with unresolved ids");
                    return Resolution::Partial {
                        missing: missing.into_iter().collect(),
                        fetched,
                    };
                }
                LoadDecision::InFlight { missing } => {
                    debug!(key = %key, "Fetch already in flight");
                    return Resolution::Pending {
                        missing: missing.into_iter().collect(),
                        fetched,
                    };
                }
                LoadDecision::FetchNext { missing } => missing,
            };

            let Some(ticket) = self.cache.begin_fetch(key) else {
                // Lost the slot between snapshot and claim; re-evaluate.
                continue;
            };
            let requested_cursor = ticket.cursor.clone();
            let guard = FetchGuard::new(&self.cache, ticket);
            let cursor = guard.ticket().and_then(|t| t.cursor.clone());

            match self
                .source
                .fetch_page(key, cursor.as_deref(), self.page_size)
                .await
            {
                Ok(page) => {
                    fetched += 1;
                    let repeated = requested_cursor.is_some() && page.next_cursor == requested_cursor;
                    guard.complete(page);
                    if repeated {
                        warn!(key = %key, cursor = ?requested_cursor, "Server repeated continuation marker, stopping");
                        let still_missing = self.missing_now(key, target);
                        return Resolution::Partial {
                            missing: still_missing,
                            fetched,
                        };
                    }
                }
                Err(e) => {
                    drop(guard);
                    warn!(key = %key, error = %e, "Page fetch failed");
                    return Resolution::Failed {
                        missing: missing.into_iter().collect(),
                        fetched,
                        error: e.to_string(),
                    };
                }
            }
        }
    }

    /// Reload the first page of `key`, replacing whatever is loaded. Returns false
    /// when another fetch already holds the slot.
    pub async fn refetch(&self, key: &CacheKey) -> Result<bool, GalleryError> {
        let Some(ticket) = self.cache.begin_refetch(key) else {
            return Ok(false);
        };
        let guard = FetchGuard::new(&self.cache, ticket);
        let page = self.source.fetch_page(key, None, self.page_size).await?;
        guard.complete(page);
        debug!(key = %key, "Entry refetched");
        Ok(true)
    }

    fn missing_now(&self, key: &CacheKey, target: &HashSet<AssetId>) -> Vec<AssetId> {
        let loaded = self
            .cache
            .snapshot(key)
            .map(|e| e.asset_ids())
            .unwrap_or_default();
        let mut missing: Vec<AssetId> = target.difference(&loaded).copied().collect();
        missing.sort_unstable();
        missing
    }
}
