//! Bookmarkr store layer.
//!
//! The [`BookmarkStore`] and [`ProfileStore`] traits are the seam between
//! the sync layer and the relational backend. Two implementations exist:
//! [`remote::RemoteStore`] speaks the hosted REST API, and
//! [`sqlite::SqliteStore`] provides the same contract over the embedded
//! database for tests and the demo binary.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::types::bookmark::{
    Bookmark, BookmarkFilters, BookmarkStats, CreateBookmarkPayload, UpdateBookmarkPayload,
};
use crate::types::change::ChangeEvent;
use crate::types::errors::StoreError;
use crate::types::profile::{Profile, UpdateProfilePayload};

pub mod remote;
pub mod sqlite;

pub use remote::RemoteStore;
pub use sqlite::SqliteStore;

/// Capacity of the change-feed broadcast channel. Receivers that fall
/// further behind observe a lag and coalesce into a single refetch.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Trait defining bookmark table access.
///
/// All mutations resolve against the backend; the optimistic bookkeeping
/// lives in the sync layer, not here.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Fetches bookmarks matching `filters`, newest first.
    async fn fetch_bookmarks(&self, filters: &BookmarkFilters)
        -> Result<Vec<Bookmark>, StoreError>;

    /// Recomputes the aggregate stats from the full (unfiltered) row set.
    async fn fetch_stats(&self) -> Result<BookmarkStats, StoreError>;

    /// Inserts a bookmark for the configured user and returns the stored row.
    async fn create_bookmark(&self, payload: &CreateBookmarkPayload)
        -> Result<Bookmark, StoreError>;

    /// Applies a partial update and returns the stored row.
    async fn update_bookmark(
        &self,
        id: &str,
        payload: &UpdateBookmarkPayload,
    ) -> Result<Bookmark, StoreError>;

    /// Deletes a bookmark by ID.
    async fn delete_bookmark(&self, id: &str) -> Result<(), StoreError>;

    /// Subscribes to the change feed for the bookmarks table.
    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Trait defining profile table access.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetches the configured user's profile. A missing row is `Ok(None)`,
    /// not an error — the profile may simply not exist yet.
    async fn fetch_profile(&self) -> Result<Option<Profile>, StoreError>;

    /// Applies a partial update to the profile and returns the stored row.
    async fn update_profile(&self, payload: &UpdateProfilePayload) -> Result<Profile, StoreError>;
}
