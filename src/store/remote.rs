//! Remote REST implementation of the store traits.
//!
//! Speaks the hosted backend's PostgREST-style API: `eq.`/`ilike.` column
//! operators, `or=(...)` disjunctions for free-text search, and
//! `Prefer: return=representation` so every mutation returns the stored row.
//! Row-level security on the backend scopes reads to the bearer token's
//! user; `user_id` is still stamped explicitly on inserts.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::types::bookmark::{
    Bookmark, BookmarkFilters, BookmarkStats, CreateBookmarkPayload, Priority, Status,
    UpdateBookmarkPayload,
};
use crate::types::change::ChangeEvent;
use crate::types::errors::StoreError;
use crate::types::profile::{Profile, UpdateProfilePayload};

use super::{BookmarkStore, ProfileStore, CHANGE_CHANNEL_CAPACITY};

/// Projection used for stats: status/priority of every row, tallied locally.
#[derive(Debug, Deserialize)]
struct StatRow {
    priority: Priority,
    status: Status,
}

/// Store backed by the hosted REST API.
pub struct RemoteStore {
    client: reqwest::Client,
    rest_url: String,
    user_id: Option<String>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl RemoteStore {
    /// Builds a client with the `apikey` and bearer headers preconfigured.
    pub fn new(config: &AppConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("apikey"),
            header_value(&config.api_key)?,
        );
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", config.bearer_token()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", config.remote_url),
            user_id: config.user_id.clone(),
            changes,
        })
    }

    /// Sender side of the change feed. The realtime listener publishes the
    /// table notifications it decodes through this handle, so subscribers of
    /// [`BookmarkStore::subscribe_changes`] see them.
    pub fn change_publisher(&self) -> broadcast::Sender<ChangeEvent> {
        self.changes.clone()
    }

    fn bookmarks_url(&self) -> String {
        format!("{}/bookmarks", self.rest_url)
    }

    fn profiles_url(&self) -> String {
        format!("{}/profiles", self.rest_url)
    }

    fn require_user(&self) -> Result<&str, StoreError> {
        self.user_id.as_deref().ok_or(StoreError::NotAuthenticated)
    }

    async fn fetch_bookmark_by_id(&self, id: &str) -> Result<Bookmark, StoreError> {
        let response = self
            .client
            .get(self.bookmarks_url())
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))])
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let rows: Vec<Bookmark> = decode(expect_success(response).await?).await?;
        single_row(rows, id)
    }
}

#[async_trait]
impl BookmarkStore for RemoteStore {
    /// Lists bookmarks newest first, with filters applied server-side.
    async fn fetch_bookmarks(
        &self,
        filters: &BookmarkFilters,
    ) -> Result<Vec<Bookmark>, StoreError> {
        let mut query: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(status) = filters.status {
            query.push(("status", format!("eq.{}", status.as_str())));
        }
        if let Some(priority) = filters.priority {
            query.push(("priority", format!("eq.{}", priority.as_str())));
        }
        if let Some(search) = filters.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                query.push((
                    "or",
                    format!(
                        "(title.ilike.%{s}%,description.ilike.%{s}%,url.ilike.%{s}%)",
                        s = search
                    ),
                ));
            }
        }

        let response = self
            .client
            .get(self.bookmarks_url())
            .query(&query)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        decode(expect_success(response).await?).await
    }

    /// Tallies stats from a status/priority projection of all rows.
    async fn fetch_stats(&self) -> Result<BookmarkStats, StoreError> {
        let response = self
            .client
            .get(self.bookmarks_url())
            .query(&[("select", "status,priority")])
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let rows: Vec<StatRow> = decode(expect_success(response).await?).await?;
        Ok(BookmarkStats::tally(
            rows.into_iter().map(|r| (r.priority, r.status)),
        ))
    }

    /// Inserts a bookmark for the configured user and returns the stored row.
    async fn create_bookmark(
        &self,
        payload: &CreateBookmarkPayload,
    ) -> Result<Bookmark, StoreError> {
        let user_id = self.require_user()?.to_string();

        let mut body =
            serde_json::to_value(payload).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let fields = body
            .as_object_mut()
            .ok_or_else(|| StoreError::Serialization("payload is not an object".to_string()))?;
        fields.insert("user_id".to_string(), json!(user_id));
        fields.insert(
            "priority".to_string(),
            json!(payload.priority.unwrap_or_default()),
        );
        fields.insert(
            "status".to_string(),
            json!(payload.status.unwrap_or_default()),
        );

        let response = self
            .client
            .post(self.bookmarks_url())
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let rows: Vec<Bookmark> = decode(expect_success(response).await?).await?;
        single_row(rows, "created bookmark")
    }

    /// Applies a partial update and returns the stored row.
    async fn update_bookmark(
        &self,
        id: &str,
        payload: &UpdateBookmarkPayload,
    ) -> Result<Bookmark, StoreError> {
        // PATCH with an empty body is rejected upstream; an empty update is
        // just a read.
        if payload.is_empty() {
            return self.fetch_bookmark_by_id(id).await;
        }

        let response = self
            .client
            .patch(self.bookmarks_url())
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(payload)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let rows: Vec<Bookmark> = decode(expect_success(response).await?).await?;
        single_row(rows, id)
    }

    /// Deletes a bookmark by ID.
    async fn delete_bookmark(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.bookmarks_url())
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let rows: Vec<Bookmark> = decode(expect_success(response).await?).await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl ProfileStore for RemoteStore {
    /// Fetches the user's profile. A missing row is `Ok(None)`, not an error.
    async fn fetch_profile(&self) -> Result<Option<Profile>, StoreError> {
        let Some(user_id) = &self.user_id else {
            return Ok(None);
        };

        let response = self
            .client
            .get(self.profiles_url())
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", user_id))])
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let rows: Vec<Profile> = decode(expect_success(response).await?).await?;
        Ok(rows.into_iter().next())
    }

    /// Applies a partial update to the profile and returns the stored row.
    async fn update_profile(&self, payload: &UpdateProfilePayload) -> Result<Profile, StoreError> {
        let user_id = self.require_user()?.to_string();

        if payload.is_empty() {
            return self
                .fetch_profile()
                .await?
                .ok_or_else(|| StoreError::NotFound(user_id));
        }

        let response = self
            .client
            .patch(self.profiles_url())
            .query(&[("id", format!("eq.{}", user_id))])
            .header("Prefer", "return=representation")
            .json(payload)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let rows: Vec<Profile> = decode(expect_success(response).await?).await?;
        single_row(rows, &user_id)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, StoreError> {
    HeaderValue::from_str(value)
        .map_err(|e| StoreError::Api(format!("invalid header value: {}", e)))
}

/// Maps non-success responses to `StoreError::Api` with the body attached.
async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Api(format!("{}: {}", status, body.trim())))
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StoreError> {
    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn single_row<T>(rows: Vec<T>, id: &str) -> Result<T, StoreError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}
