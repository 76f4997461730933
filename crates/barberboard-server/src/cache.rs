use barberboard_api::CacheStatsResponse;
use barberboard_model::Category;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Which cached view of a branch an entry holds. `SpreadsheetId` is the
/// directory mapping; it survives per-branch invalidation because the id is
/// immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheView {
    Category(Category),
    Dashboard,
    BranchSummary,
    SpreadsheetId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub branch: String,
    pub view: CacheView,
}

impl CacheKey {
    #[must_use]
    pub fn new(branch: &str, view: CacheView) -> Self {
        Self {
            branch: branch.to_string(),
            view,
        }
    }
}

/// TTL response cache shared by all handlers. No size bound: the entry
/// population is bounded by branch count times a handful of views.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Value, Instant)>>,
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub insertions: AtomicU64,
    pub invalidations: AtomicU64,
}

impl ResponseCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// An entry past the TTL reads as absent and is dropped on the spot.
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, inserted_at)) if inserted_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(branch = %key.branch, "cache hit");
                Some(value.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn put(&self, key: CacheKey, value: Value) {
        let mut entries = self.entries.lock().await;
        self.insertions.fetch_add(1, Ordering::Relaxed);
        entries.insert(key, (value, Instant::now()));
    }

    /// Drops every view of the branch except the spreadsheet-id mapping.
    /// Matching is exact, a branch named `A` never disturbs `AB`.
    pub async fn invalidate_branch(&self, branch: &str) {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| key.branch != branch || key.view == CacheView::SpreadsheetId);
        let removed = (before - entries.len()) as u64;
        self.invalidations.fetch_add(removed, Ordering::Relaxed);
        tracing::debug!(branch, removed, "cache invalidated for branch");
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        self.invalidations
            .fetch_add(entries.len() as u64, Ordering::Relaxed);
        entries.clear();
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn stats(&self) -> CacheStatsResponse {
        CacheStatsResponse {
            success: true,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entries: self.entry_count().await,
        }
    }
}
