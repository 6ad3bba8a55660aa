//! Query Cache
//!
//! Keyed store of server-backed paginated result sets. Entries live for the process
//! lifetime only. Within an entry no asset id appears twice across pages: appended
//! pages are deduplicated against what is already loaded.
//!
//! The lock is never held across an await point. Fetches are bracketed by
//! `begin_fetch` / `complete_fetch` (or `abort_fetch`), which also maintain the
//! per-entry in-flight flag.

pub mod key;
pub mod view;

pub use key::{CacheKey, ParamValue, Resource};
pub use view::ActiveView;

use crate::types::{Asset, AssetId, Face, Person};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Items of one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum PageItems {
    Assets(Vec<Asset>),
    People(Vec<Person>),
    Faces(Vec<Face>),
    Summary(serde_json::Value),
}

impl PageItems {
    pub fn len(&self) -> usize {
        match self {
            PageItems::Assets(items) => items.len(),
            PageItems::People(items) => items.len(),
            PageItems::Faces(items) => items.len(),
            PageItems::Summary(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Asset ids referenced by this page (assets, or the owners of faces)
    pub fn asset_ids(&self) -> Vec<AssetId> {
        match self {
            PageItems::Assets(items) => items.iter().map(|a| a.id).collect(),
            PageItems::Faces(items) => items.iter().map(|f| f.asset_id).collect(),
            _ => Vec::new(),
        }
    }

    /// Drop every item referencing an asset in `ids`. Returns how many were removed.
    pub fn remove_assets(&mut self, ids: &HashSet<AssetId>) -> usize {
        let before = self.len();
        match self {
            PageItems::Assets(items) => items.retain(|a| !ids.contains(&a.id)),
            PageItems::Faces(items) => items.retain(|f| !ids.contains(&f.asset_id)),
            _ => {}
        }
        before - self.len()
    }
}

/// One page plus its opaque continuation marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub items: PageItems,
    /// `None` means the server has no further pages
    pub next_cursor: Option<String>,
}

impl Page {
    pub fn assets(assets: Vec<Asset>, next_cursor: Option<String>) -> Self {
        Self {
            items: PageItems::Assets(assets),
            next_cursor,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    pages: Vec<Page>,
    stale: bool,
    fetch_in_flight: bool,
    generation: u64,
}

impl CacheEntry {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch_in_flight
    }

    /// Whether another page may be requested. An entry with no pages has not seen
    /// its first page yet.
    pub fn has_more(&self) -> bool {
        match self.pages.last() {
            Some(page) => page.next_cursor.is_some(),
            None => true,
        }
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.pages.last().and_then(|p| p.next_cursor.as_deref())
    }

    pub fn asset_ids(&self) -> HashSet<AssetId> {
        self.pages
            .iter()
            .flat_map(|p| p.items.asset_ids())
            .collect()
    }

    pub fn contains_any(&self, ids: &HashSet<AssetId>) -> bool {
        self.pages
            .iter()
            .any(|p| p.items.asset_ids().iter().any(|id| ids.contains(id)))
    }

    /// Loaded assets in page order
    pub fn assets(&self) -> Vec<Asset> {
        self.pages
            .iter()
            .filter_map(|p| match &p.items {
                PageItems::Assets(items) => Some(items.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    /// Mark for refetch. Returns false when already stale.
    pub fn invalidate(&mut self) -> bool {
        self.generation += 1;
        !std::mem::replace(&mut self.stale, true)
    }

    /// Filter out items referencing `ids`, replacing only pages whose count changed.
    /// Returns the number of items removed.
    pub fn remove_assets(&mut self, ids: &HashSet<AssetId>) -> usize {
        let mut removed = 0;
        for page in self.pages.iter_mut() {
            let mut items = page.items.clone();
            let dropped = items.remove_assets(ids);
            if dropped > 0 {
                *page = Page {
                    items,
                    next_cursor: page.next_cursor.clone(),
                };
                removed += dropped;
            }
        }
        removed
    }

    fn append(&mut self, page: Page) {
        let mut seen = self.asset_ids();
        let items = match page.items {
            PageItems::Assets(items) => {
                PageItems::Assets(items.into_iter().filter(|a| seen.insert(a.id)).collect())
            }
            other => other,
        };
        self.pages.push(Page {
            items,
            next_cursor: page.next_cursor,
        });
    }
}

/// Permission to issue one fetch for an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: CacheKey,
    /// Continuation marker to request; `None` requests the first page
    pub cursor: Option<String>,
    /// The fetched page replaces all loaded pages
    pub reset: bool,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.entries.read().get(key).map_or(false, |e| e.stale)
    }

    /// Replace an entry's pages wholesale, clearing staleness
    pub fn insert_pages(&self, key: CacheKey, pages: Vec<Page>) {
        let mut entries = self.entries.write();
        let entry = entries.entry(key).or_default();
        entry.pages.clear();
        entry.stale = false;
        for page in pages {
            entry.append(page);
        }
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries
            .write()
            .get_mut(key)
            .map_or(false, CacheEntry::invalidate)
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.write().remove(key)
    }

    /// Run `f` against all entries under a single write lock.
    pub fn with_entries_mut<R>(
        &self,
        f: impl FnOnce(&mut HashMap<CacheKey, CacheEntry>) -> R,
    ) -> R {
        let mut entries = self.entries.write();
        f(&mut entries)
    }

    /// Claim the entry's fetch slot. Returns `None` when a fetch is already in
    /// flight, or when the entry is fresh and exhausted.
    pub fn begin_fetch(&self, key: &CacheKey) -> Option<FetchTicket> {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_default();
        if entry.fetch_in_flight {
            return None;
        }
        let reset = entry.stale;
        if !reset && !entry.has_more() {
            return None;
        }
        entry.fetch_in_flight = true;
        let cursor = if reset {
            None
        } else {
            entry.next_cursor().map(str::to_string)
        };
        debug!(key = %key, cursor = ?cursor, reset, "Fetch slot claimed");
        Some(FetchTicket {
            key: key.clone(),
            cursor,
            reset,
            generation: entry.generation,
        })
    }

    /// Claim the fetch slot for a first-page reload regardless of loaded pages.
    pub fn begin_refetch(&self, key: &CacheKey) -> Option<FetchTicket> {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_default();
        if entry.fetch_in_flight {
            return None;
        }
        entry.fetch_in_flight = true;
        Some(FetchTicket {
            key: key.clone(),
            cursor: None,
            reset: true,
            generation: entry.generation,
        })
    }

    /// Store a fetched page and release the fetch slot.
    ///
    /// A page arriving after the entry was invalidated is still written, but the
    /// entry stays stale.
    pub fn complete_fetch(&self, ticket: &FetchTicket, page: Page) {
        let mut entries = self.entries.write();
        let entry = entries.entry(ticket.key.clone()).or_default();
        if ticket.reset {
            entry.pages.clear();
        }
        entry.append(page);
        entry.fetch_in_flight = false;
        if ticket.generation == entry.generation {
            entry.stale = false;
        }
    }

    /// Release the fetch slot without storing anything.
    pub fn abort_fetch(&self, key: &CacheKey) {
        if let Some(entry) = self.entries.write().get_mut(key) {
            entry.fetch_in_flight = false;
        }
    }
}
