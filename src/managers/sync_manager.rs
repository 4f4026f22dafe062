//! Bookmark sync manager for Bookmarkr.
//!
//! Holds the in-memory bookmark list and aggregate stats, mutated
//! optimistically before the store call resolves and rolled back on
//! failure. Reconciliation with the backend is always a full refetch —
//! change notifications and filter changes both funnel into
//! [`BookmarkSyncManager::refresh`]; the last resync wins. The state mutex
//! is never held across an await point, so a refetch racing an in-flight
//! mutation interleaves at well-defined snapshots.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use log::{debug, warn};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::store::BookmarkStore;
use crate::types::bookmark::{
    Bookmark, BookmarkFilters, BookmarkStats, CreateBookmarkPayload, Priority, Status,
    UpdateBookmarkPayload,
};
use crate::types::change::ChangeEvent;
use crate::types::errors::StoreError;

/// In-memory view the manager maintains for the presentation layer.
#[derive(Debug, Default)]
struct SyncState {
    bookmarks: Vec<Bookmark>,
    stats: BookmarkStats,
    filters: BookmarkFilters,
    last_error: Option<String>,
    loading: bool,
}

/// Optimistic mutation handler over a [`BookmarkStore`].
pub struct BookmarkSyncManager {
    store: Arc<dyn BookmarkStore>,
    state: Mutex<SyncState>,
}

impl BookmarkSyncManager {
    pub fn new(store: Arc<dyn BookmarkStore>) -> Self {
        Self {
            store,
            state: Mutex::new(SyncState {
                loading: true,
                ..SyncState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Accessors ─────────────────────────────────────────────

    /// Current list snapshot, newest first.
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.state().bookmarks.clone()
    }

    pub fn stats(&self) -> BookmarkStats {
        self.state().stats
    }

    pub fn filters(&self) -> BookmarkFilters {
        self.state().filters.clone()
    }

    /// Message of the last failed refresh, cleared by the next successful one.
    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    /// True until the first refresh (or the refresh after a filter change)
    /// completes.
    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    // ── Refetch ───────────────────────────────────────────────

    /// Fetches the filtered list and the stats, then swaps both in.
    ///
    /// Failures are recorded in `last_error` and leave the previous state
    /// visible; the loading flag clears either way.
    pub async fn refresh(&self) {
        let filters = self.state().filters.clone();

        let (bookmarks, stats) = tokio::join!(
            self.store.fetch_bookmarks(&filters),
            self.store.fetch_stats(),
        );

        let mut state = self.state();
        match (bookmarks, stats) {
            (Ok(bookmarks), Ok(stats)) => {
                debug!("refreshed {} bookmarks", bookmarks.len());
                state.bookmarks = bookmarks;
                state.stats = stats;
                state.last_error = None;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("refresh failed: {}", e);
                state.last_error = Some(e.to_string());
            }
        }
        state.loading = false;
    }

    /// Replaces the filters and refetches.
    pub async fn set_filters(&self, filters: BookmarkFilters) {
        {
            let mut state = self.state();
            state.filters = filters;
            state.loading = true;
        }
        self.refresh().await;
    }

    // ── Mutations ─────────────────────────────────────────────

    /// Creates a bookmark optimistically.
    ///
    /// A placeholder row with a request-scoped `temp-` id goes in at the
    /// head (total bumped) before the store call. On success the placeholder
    /// is replaced by the server row; if a racing refetch already removed
    /// it, the row is inserted only when its server id is absent, so the
    /// create never duplicates. On failure the placeholder is dropped and
    /// the error propagates.
    pub async fn add_bookmark(
        &self,
        payload: CreateBookmarkPayload,
    ) -> Result<Bookmark, StoreError> {
        let temp_id = format!("temp-{}", Uuid::new_v4());
        let now = Utc::now();
        let placeholder = Bookmark {
            id: temp_id.clone(),
            user_id: String::new(),
            title: payload.title.clone(),
            url: payload.url.clone(),
            description: payload.description.clone(),
            priority: payload.priority.unwrap_or_default(),
            status: payload.status.unwrap_or_default(),
            reminder_at: payload.reminder_at,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };

        {
            let mut state = self.state();
            state.bookmarks.insert(0, placeholder);
            state.stats.total += 1;
        }

        match self.store.create_bookmark(&payload).await {
            Ok(created) => {
                let mut state = self.state();
                let reconciled = if let Some(slot) =
                    state.bookmarks.iter_mut().find(|b| b.id == temp_id)
                {
                    *slot = created.clone();
                    true
                } else if state.bookmarks.iter().any(|b| b.id == created.id) {
                    // A refetch already brought the server row in; its stats
                    // are authoritative, so no counter adjustments here.
                    false
                } else {
                    state.bookmarks.insert(0, created.clone());
                    true
                };

                if reconciled {
                    // total was counted at placeholder time.
                    if created.priority == Priority::High {
                        state.stats.high_priority += 1;
                    }
                    match created.status {
                        Status::Reading => state.stats.reading += 1,
                        Status::Completed => state.stats.completed += 1,
                        Status::Saved => {}
                    }
                }
                Ok(created)
            }
            Err(e) => {
                let mut state = self.state();
                state.bookmarks.retain(|b| b.id != temp_id);
                state.stats.total = state.stats.total.saturating_sub(1);
                Err(e)
            }
        }
    }

    /// Edits a bookmark optimistically. Unknown ids are a no-op.
    ///
    /// The payload is merged into the row before the store call; on success
    /// the server row replaces it and the stats are refetched (priority or
    /// status may have changed); on failure the prior row is restored and
    /// the error propagates.
    pub async fn edit_bookmark(
        &self,
        id: &str,
        payload: UpdateBookmarkPayload,
    ) -> Result<(), StoreError> {
        let previous = {
            let mut state = self.state();
            match state.bookmarks.iter_mut().find(|b| b.id == id) {
                Some(bookmark) => {
                    let previous = bookmark.clone();
                    payload.apply_to(bookmark);
                    previous
                }
                None => return Ok(()),
            }
        };

        let rollback = |error: StoreError| {
            let mut state = self.state();
            if let Some(slot) = state.bookmarks.iter_mut().find(|b| b.id == id) {
                *slot = previous.clone();
            }
            Err(error)
        };

        match self.store.update_bookmark(id, &payload).await {
            Ok(updated) => {
                {
                    let mut state = self.state();
                    if let Some(slot) = state.bookmarks.iter_mut().find(|b| b.id == id) {
                        *slot = updated;
                    }
                }
                match self.store.fetch_stats().await {
                    Ok(stats) => {
                        self.state().stats = stats;
                        Ok(())
                    }
                    Err(e) => rollback(e),
                }
            }
            Err(e) => rollback(e),
        }
    }

    /// Deletes a bookmark optimistically. Unknown ids are a no-op.
    ///
    /// The row is dropped and the matching counters decremented (saturating
    /// at zero) before the store call; on failure the row is reinserted at
    /// the head, the counters restored, and the error propagates.
    pub async fn remove_bookmark(&self, id: &str) -> Result<(), StoreError> {
        let previous = {
            let mut state = self.state();
            let Some(previous) = state.bookmarks.iter().find(|b| b.id == id).cloned() else {
                return Ok(());
            };
            state.bookmarks.retain(|b| b.id != id);
            state.stats.total = state.stats.total.saturating_sub(1);
            if previous.priority == Priority::High {
                state.stats.high_priority = state.stats.high_priority.saturating_sub(1);
            }
            match previous.status {
                Status::Reading => state.stats.reading = state.stats.reading.saturating_sub(1),
                Status::Completed => {
                    state.stats.completed = state.stats.completed.saturating_sub(1)
                }
                Status::Saved => {}
            }
            previous
        };

        match self.store.delete_bookmark(id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let mut state = self.state();
                state.stats.total += 1;
                if previous.priority == Priority::High {
                    state.stats.high_priority += 1;
                }
                match previous.status {
                    Status::Reading => state.stats.reading += 1,
                    Status::Completed => state.stats.completed += 1,
                    Status::Saved => {}
                }
                state.bookmarks.insert(0, previous);
                Err(e)
            }
        }
    }

    // ── Change feed ───────────────────────────────────────────

    /// Answers every change notification with exactly one refetch cycle.
    ///
    /// A lagged receiver coalesces the missed notifications into a single
    /// refetch — full-state resync makes the skipped events irrelevant.
    pub async fn run_change_listener(&self, mut changes: broadcast::Receiver<ChangeEvent>) {
        loop {
            match changes.recv().await {
                Ok(event) => {
                    debug!("change notification: {:?} {:?}", event.kind, event.bookmark_id);
                    self.refresh().await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("change feed lagged, coalescing {} notifications", skipped);
                    self.refresh().await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Runs the change listener on the runtime.
    pub fn spawn_change_listener(
        self: &Arc<Self>,
        changes: broadcast::Receiver<ChangeEvent>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.run_change_listener(changes).await })
    }
}
