//! Embedded SQLite implementation of the store traits.
//!
//! Backs the test suite and the demo binary with the exact contract of the
//! remote store, including a loopback change feed: every successful mutation
//! publishes a [`ChangeEvent`], standing in for the remote table publication
//! so multi-manager (multi-tab) scenarios work without a network.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::database::Database;
use crate::types::bookmark::{
    Bookmark, BookmarkFilters, BookmarkStats, CreateBookmarkPayload, Priority, Status,
    UpdateBookmarkPayload,
};
use crate::types::change::{ChangeEvent, ChangeKind};
use crate::types::errors::StoreError;
use crate::types::profile::{Profile, Theme, UpdateProfilePayload};

use super::{BookmarkStore, ProfileStore, CHANGE_CHANNEL_CAPACITY};

const BOOKMARK_COLUMNS: &str = "id, user_id, title, url, description, priority, status, \
     reminder_at, is_archived, created_at, updated_at";

/// Store backed by the embedded SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    user_id: Option<String>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl SqliteStore {
    /// Wraps an opened [`Database`], scoping rows to `user_id` when set.
    pub fn new(db: Database, user_id: Option<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            conn: Mutex::new(db.into_connection()),
            user_id,
            changes,
        }
    }

    /// Opens a fresh in-memory store for the given user.
    pub fn in_memory(user_id: &str) -> Result<Self, StoreError> {
        let db = Database::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self::new(db, Some(user_id.to_string())))
    }

    /// Inserts or replaces a profile row. Stands in for the trigger that
    /// provisions profiles on signup in the hosted backend.
    pub fn seed_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO profiles \
                 (id, full_name, avatar_url, slack_webhook, theme, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    profile.id,
                    profile.full_name,
                    profile.avatar_url,
                    profile.slack_webhook,
                    profile.theme.as_str(),
                    profile.created_at.to_rfc3339(),
                    profile.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, kind: ChangeKind, bookmark_id: &str) {
        // Nobody listening is fine — the feed is best-effort.
        let _ = self
            .changes
            .send(ChangeEvent::new(kind, Some(bookmark_id.to_string())));
    }

    fn require_user(&self) -> Result<&str, StoreError> {
        self.user_id.as_deref().ok_or(StoreError::NotAuthenticated)
    }

    /// Reads a single bookmark row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            priority: parse_priority(5, row.get(5)?)?,
            status: parse_status(6, row.get(6)?)?,
            reminder_at: parse_opt_timestamp(7, row.get(7)?)?,
            is_archived: row.get(8)?,
            created_at: parse_timestamp(9, row.get(9)?)?,
            updated_at: parse_timestamp(10, row.get(10)?)?,
        })
    }

    fn get_bookmark(&self, id: &str) -> Result<Bookmark, StoreError> {
        let conn = self.conn();
        let result = conn.query_row(
            &format!("SELECT {} FROM bookmarks WHERE id = ?1", BOOKMARK_COLUMNS),
            params![id],
            Self::row_to_bookmark,
        );
        match result {
            Ok(bookmark) => Ok(bookmark),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }
}

#[async_trait]
impl BookmarkStore for SqliteStore {
    /// Lists bookmarks newest first, with filters applied in SQL.
    async fn fetch_bookmarks(
        &self,
        filters: &BookmarkFilters,
    ) -> Result<Vec<Bookmark>, StoreError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(user_id) = &self.user_id {
            clauses.push("user_id = ?");
            values.push(user_id.clone());
        }
        if let Some(status) = filters.status {
            clauses.push("status = ?");
            values.push(status.as_str().to_string());
        }
        if let Some(priority) = filters.priority {
            clauses.push("priority = ?");
            values.push(priority.as_str().to_string());
        }
        if let Some(search) = filters.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                clauses.push("(title LIKE ? OR description LIKE ? OR url LIKE ?)");
                let pattern = format!("%{}%", search);
                values.push(pattern.clone());
                values.push(pattern.clone());
                values.push(pattern);
            }
        }

        let mut sql = format!("SELECT {} FROM bookmarks", BOOKMARK_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        // RFC 3339 text sorts chronologically, so this is newest-first.
        sql.push_str(" ORDER BY created_at DESC, id");

        let conn = self.conn();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), Self::row_to_bookmark)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(results)
    }

    /// Tallies stats from the full (unfiltered) row set of the user.
    async fn fetch_stats(&self) -> Result<BookmarkStats, StoreError> {
        let conn = self.conn();
        let (sql, values): (&str, Vec<String>) = match &self.user_id {
            Some(user_id) => (
                "SELECT priority, status FROM bookmarks WHERE user_id = ?",
                vec![user_id.clone()],
            ),
            None => ("SELECT priority, status FROM bookmarks", Vec::new()),
        };

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                let priority = parse_priority(0, row.get(0)?)?;
                let status = parse_status(1, row.get(1)?)?;
                Ok((priority, status))
            })
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(BookmarkStats::tally(pairs.into_iter()))
    }

    /// Inserts a bookmark for the configured user and returns the stored row.
    async fn create_bookmark(
        &self,
        payload: &CreateBookmarkPayload,
    ) -> Result<Bookmark, StoreError> {
        let user_id = self.require_user()?.to_string();
        let now = Utc::now();
        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            user_id,
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

        self.conn()
            .execute(
                "INSERT INTO bookmarks \
                 (id, user_id, title, url, description, priority, status, reminder_at, \
                  is_archived, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    bookmark.id,
                    bookmark.user_id,
                    bookmark.title,
                    bookmark.url,
                    bookmark.description,
                    bookmark.priority.as_str(),
                    bookmark.status.as_str(),
                    bookmark.reminder_at.map(|t| t.to_rfc3339()),
                    bookmark.is_archived,
                    bookmark.created_at.to_rfc3339(),
                    bookmark.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        self.publish(ChangeKind::Insert, &bookmark.id);
        Ok(bookmark)
    }

    /// Applies a partial update and returns the stored row.
    async fn update_bookmark(
        &self,
        id: &str,
        payload: &UpdateBookmarkPayload,
    ) -> Result<Bookmark, StoreError> {
        let mut bookmark = self.get_bookmark(id)?;
        payload.apply_to(&mut bookmark);
        bookmark.updated_at = Utc::now();

        let affected = self
            .conn()
            .execute(
                "UPDATE bookmarks SET title = ?1, url = ?2, description = ?3, priority = ?4, \
                 status = ?5, reminder_at = ?6, updated_at = ?7 WHERE id = ?8",
                params![
                    bookmark.title,
                    bookmark.url,
                    bookmark.description,
                    bookmark.priority.as_str(),
                    bookmark.status.as_str(),
                    bookmark.reminder_at.map(|t| t.to_rfc3339()),
                    bookmark.updated_at.to_rfc3339(),
                    id,
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.publish(ChangeKind::Update, id);
        Ok(bookmark)
    }

    /// Deletes a bookmark by ID.
    async fn delete_bookmark(&self, id: &str) -> Result<(), StoreError> {
        let affected = self
            .conn()
            .execute("DELETE FROM bookmarks WHERE id = ?1", params![id])
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.publish(ChangeKind::Delete, id);
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    /// Fetches the user's profile. A missing row is `Ok(None)`, not an error.
    async fn fetch_profile(&self) -> Result<Option<Profile>, StoreError> {
        let Some(user_id) = &self.user_id else {
            return Ok(None);
        };

        let conn = self.conn();
        let result = conn.query_row(
            "SELECT id, full_name, avatar_url, slack_webhook, theme, created_at, updated_at \
             FROM profiles WHERE id = ?1",
            params![user_id],
            row_to_profile,
        );
        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    /// Applies a partial update to the profile and returns the stored row.
    async fn update_profile(&self, payload: &UpdateProfilePayload) -> Result<Profile, StoreError> {
        let user_id = self.require_user()?.to_string();
        let mut profile = self
            .fetch_profile()
            .await?
            .ok_or_else(|| StoreError::NotFound(user_id.clone()))?;

        if let Some(full_name) = &payload.full_name {
            profile.full_name = Some(full_name.clone());
        }
        if let Some(slack_webhook) = &payload.slack_webhook {
            profile.slack_webhook = Some(slack_webhook.clone());
        }
        if let Some(theme) = payload.theme {
            profile.theme = theme;
        }
        profile.updated_at = Utc::now();

        self.conn()
            .execute(
                "UPDATE profiles SET full_name = ?1, slack_webhook = ?2, theme = ?3, \
                 updated_at = ?4 WHERE id = ?5",
                params![
                    profile.full_name,
                    profile.slack_webhook,
                    profile.theme.as_str(),
                    profile.updated_at.to_rfc3339(),
                    user_id,
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(profile)
    }
}

fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    let theme: String = row.get(4)?;
    Ok(Profile {
        id: row.get(0)?,
        full_name: row.get(1)?,
        avatar_url: row.get(2)?,
        slack_webhook: row.get(3)?,
        theme: Theme::parse(&theme).unwrap_or_default(),
        created_at: parse_timestamp(5, row.get(5)?)?,
        updated_at: parse_timestamp(6, row.get(6)?)?,
    })
}

fn parse_priority(idx: usize, value: String) -> rusqlite::Result<Priority> {
    Priority::parse(&value).ok_or_else(|| conversion_error(idx, format!("unknown priority: {}", value)))
}

fn parse_status(idx: usize, value: String) -> rusqlite::Result<Status> {
    Status::parse(&value).ok_or_else(|| conversion_error(idx, format!("unknown status: {}", value)))
}

fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e.to_string()))
}

fn parse_opt_timestamp(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match value {
        Some(text) => parse_timestamp(idx, text).map(Some),
        None => Ok(None),
    }
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        message.into(),
    )
}
