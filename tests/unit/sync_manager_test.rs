//! Unit tests for the optimistic sync manager.
//!
//! Exercised against the embedded store through a wrapper that injects
//! mutation/fetch failures and counts refetch cycles, so both the happy
//! paths and the rollback paths are observable.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bookmarkr::managers::BookmarkSyncManager;
use bookmarkr::store::{BookmarkStore, SqliteStore};
use bookmarkr::types::bookmark::*;
use bookmarkr::types::change::ChangeEvent;
use bookmarkr::types::errors::StoreError;
use tokio::sync::broadcast;

/// Store wrapper with switchable failure injection and a fetch counter.
struct HarnessStore {
    inner: SqliteStore,
    fail_mutations: AtomicBool,
    fail_fetches: AtomicBool,
    fetch_calls: AtomicUsize,
}

impl HarnessStore {
    fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory("user-1").expect("failed to open in-memory store"),
            fail_mutations: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn injected() -> StoreError {
        StoreError::Network("injected failure".to_string())
    }
}

#[async_trait]
impl BookmarkStore for HarnessStore {
    async fn fetch_bookmarks(
        &self,
        filters: &BookmarkFilters,
    ) -> Result<Vec<Bookmark>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.fetch_bookmarks(filters).await
    }

    async fn fetch_stats(&self) -> Result<BookmarkStats, StoreError> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.fetch_stats().await
    }

    async fn create_bookmark(
        &self,
        payload: &CreateBookmarkPayload,
    ) -> Result<Bookmark, StoreError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.create_bookmark(payload).await
    }

    async fn update_bookmark(
        &self,
        id: &str,
        payload: &UpdateBookmarkPayload,
    ) -> Result<Bookmark, StoreError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.update_bookmark(id, payload).await
    }

    async fn delete_bookmark(&self, id: &str) -> Result<(), StoreError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.delete_bookmark(id).await
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.subscribe_changes()
    }
}

async fn setup() -> (Arc<HarnessStore>, Arc<BookmarkSyncManager>) {
    let store = Arc::new(HarnessStore::new());
    let sync = Arc::new(BookmarkSyncManager::new(store.clone() as Arc<dyn BookmarkStore>));
    sync.refresh().await;
    (store, sync)
}

fn payload(title: &str, url: &str) -> CreateBookmarkPayload {
    CreateBookmarkPayload {
        title: title.to_string(),
        url: url.to_string(),
        ..Default::default()
    }
}

/// Polls until `condition` holds or the timeout elapses.
async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_successful_create_inserts_exactly_one_row() {
    let (_, sync) = setup().await;

    let created = sync
        .add_bookmark(CreateBookmarkPayload {
            priority: Some(Priority::High),
            status: Some(Status::Reading),
            ..payload("Example", "https://example.com")
        })
        .await
        .unwrap();

    let bookmarks = sync.bookmarks();
    let matching: Vec<_> = bookmarks
        .iter()
        .filter(|b| b.title == "Example" && b.url == "https://example.com")
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].id, created.id);
    // The placeholder is gone — only the server-assigned row remains
    assert!(!bookmarks.iter().any(|b| b.id.starts_with("temp-")));

    let stats = sync.stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.high_priority, 1);
    assert_eq!(stats.reading, 1);
}

#[tokio::test]
async fn test_failed_create_restores_list_and_stats() {
    let (store, sync) = setup().await;
    sync.add_bookmark(payload("Existing", "https://example.com/existing"))
        .await
        .unwrap();

    let bookmarks_before = sync.bookmarks();
    let stats_before = sync.stats();

    store.fail_mutations(true);
    let err = sync
        .add_bookmark(payload("Doomed", "https://example.com/doomed"))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::Network("injected failure".to_string()));

    assert_eq!(sync.bookmarks(), bookmarks_before);
    assert_eq!(sync.stats(), stats_before);
}

#[tokio::test]
async fn test_edit_applies_server_row_and_refreshes_stats() {
    let (_, sync) = setup().await;
    let created = sync
        .add_bookmark(payload("Example", "https://example.com"))
        .await
        .unwrap();

    sync.edit_bookmark(
        &created.id,
        UpdateBookmarkPayload {
            status: Some(Status::Completed),
            priority: Some(Priority::High),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let bookmarks = sync.bookmarks();
    assert_eq!(bookmarks[0].status, Status::Completed);
    assert_eq!(bookmarks[0].priority, Priority::High);

    // Stats were refetched, not incrementally patched
    let stats = sync.stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.high_priority, 1);
    assert_eq!(stats.reading, 0);
}

#[tokio::test]
async fn test_failed_edit_restores_previous_row() {
    let (store, sync) = setup().await;
    let created = sync
        .add_bookmark(payload("Original", "https://example.com"))
        .await
        .unwrap();

    store.fail_mutations(true);
    let err = sync
        .edit_bookmark(
            &created.id,
            UpdateBookmarkPayload {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::Network("injected failure".to_string()));

    let bookmarks = sync.bookmarks();
    assert_eq!(bookmarks[0].title, "Original");
}

#[tokio::test]
async fn test_edit_unknown_id_is_noop() {
    let (_, sync) = setup().await;
    sync.edit_bookmark(
        "missing",
        UpdateBookmarkPayload {
            title: Some("whatever".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(sync.bookmarks().is_empty());
}

#[tokio::test]
async fn test_remove_decrements_matching_counters_once() {
    let (_, sync) = setup().await;
    let keep = sync
        .add_bookmark(CreateBookmarkPayload {
            priority: Some(Priority::High),
            ..payload("Keep", "https://example.com/keep")
        })
        .await
        .unwrap();
    let gone = sync
        .add_bookmark(CreateBookmarkPayload {
            priority: Some(Priority::High),
            status: Some(Status::Reading),
            ..payload("Gone", "https://example.com/gone")
        })
        .await
        .unwrap();

    let before = sync.stats();
    assert_eq!(before.total, 2);
    assert_eq!(before.high_priority, 2);
    assert_eq!(before.reading, 1);

    sync.remove_bookmark(&gone.id).await.unwrap();

    let after = sync.stats();
    assert_eq!(after.total, 1);
    assert_eq!(after.high_priority, 1);
    assert_eq!(after.reading, 0);
    assert_eq!(after.completed, 0);

    let bookmarks = sync.bookmarks();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].id, keep.id);
}

#[tokio::test]
async fn test_failed_remove_restores_row_and_counters() {
    let (store, sync) = setup().await;
    let created = sync
        .add_bookmark(CreateBookmarkPayload {
            priority: Some(Priority::High),
            status: Some(Status::Reading),
            ..payload("Sticky", "https://example.com")
        })
        .await
        .unwrap();

    let stats_before = sync.stats();

    store.fail_mutations(true);
    sync.remove_bookmark(&created.id).await.unwrap_err();

    assert_eq!(sync.stats(), stats_before);
    assert_eq!(sync.bookmarks().len(), 1);
    assert_eq!(sync.bookmarks()[0].id, created.id);
}

#[tokio::test]
async fn test_remove_unknown_id_is_noop() {
    let (_, sync) = setup().await;
    sync.remove_bookmark("missing").await.unwrap();
    assert_eq!(sync.stats().total, 0);
}

#[tokio::test]
async fn test_notification_triggers_exactly_one_refetch() {
    let (store, sync) = setup().await;
    let baseline = store.fetch_calls();

    let listener = sync.spawn_change_listener(store.subscribe_changes());

    // A direct store mutation stands in for another tab writing the table
    store
        .inner
        .create_bookmark(&payload("From another tab", "https://example.com/tab"))
        .await
        .unwrap();

    wait_for(|| store.fetch_calls() == baseline + 1).await;
    assert_eq!(store.fetch_calls(), baseline + 1);

    // The refetch brought the foreign row in
    assert_eq!(sync.bookmarks().len(), 1);
    assert_eq!(sync.stats().total, 1);

    // No further refetches happen without further notifications
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.fetch_calls(), baseline + 1);

    listener.abort();
}

#[tokio::test]
async fn test_set_filters_refetches_filtered_list() {
    let (_, sync) = setup().await;
    sync.add_bookmark(CreateBookmarkPayload {
        status: Some(Status::Reading),
        ..payload("Reading", "https://example.com/reading")
    })
    .await
    .unwrap();
    sync.add_bookmark(payload("Saved", "https://example.com/saved"))
        .await
        .unwrap();

    sync.set_filters(BookmarkFilters {
        status: Some(Status::Reading),
        ..Default::default()
    })
    .await;

    let bookmarks = sync.bookmarks();
    assert_eq!(bookmarks.len(), 1);
    assert!(bookmarks.iter().all(|b| b.status == Status::Reading));
    // Stats stay global, unaffected by the list filter
    assert_eq!(sync.stats().total, 2);
}

#[tokio::test]
async fn test_refresh_failure_surfaces_error_and_keeps_state() {
    let (store, sync) = setup().await;
    sync.add_bookmark(payload("Kept", "https://example.com"))
        .await
        .unwrap();
    let bookmarks_before = sync.bookmarks();

    store.fail_fetches(true);
    sync.refresh().await;

    assert_eq!(
        sync.last_error(),
        Some("Store network error: injected failure".to_string())
    );
    assert_eq!(sync.bookmarks(), bookmarks_before);
    assert!(!sync.is_loading());

    // A successful refresh clears the error
    store.fail_fetches(false);
    sync.refresh().await;
    assert_eq!(sync.last_error(), None);
}

#[tokio::test]
async fn test_loading_clears_after_first_refresh() {
    let store = Arc::new(HarnessStore::new());
    let sync = BookmarkSyncManager::new(store as Arc<dyn BookmarkStore>);
    assert!(sync.is_loading());
    sync.refresh().await;
    assert!(!sync.is_loading());
}
