//! Reminder webhook notifier for Bookmarkr.
//!
//! Posts reminder messages for due bookmarks to the webhook URL stored on
//! the profile. No webhook configured means the feature is simply off.

use chrono::{DateTime, Utc};
use log::debug;
use serde_json::json;

use crate::types::bookmark::Bookmark;
use crate::types::errors::NotifyError;
use crate::types::profile::Profile;

/// Selects non-archived bookmarks whose reminder time has passed.
pub fn due_reminders(bookmarks: &[Bookmark], now: DateTime<Utc>) -> Vec<&Bookmark> {
    bookmarks
        .iter()
        .filter(|b| !b.is_archived)
        .filter(|b| b.reminder_at.map(|at| at <= now).unwrap_or(false))
        .collect()
}

/// Message body posted to the webhook.
pub fn reminder_message(bookmark: &Bookmark) -> String {
    format!(
        ":bookmark: Reminder: {} — {}",
        bookmark.title, bookmark.url
    )
}

/// Webhook client posting reminder notifications.
pub struct ReminderNotifier {
    client: reqwest::Client,
}

impl ReminderNotifier {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Posts a reminder for `bookmark` to the given webhook URL.
    pub async fn notify(&self, webhook_url: &str, bookmark: &Bookmark) -> Result<(), NotifyError> {
        let body = json!({ "text": reminder_message(bookmark) });
        let response = self
            .client
            .post(webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!(
                "{}: {}",
                status,
                detail.trim()
            )));
        }
        debug!("reminder posted for bookmark {}", bookmark.id);
        Ok(())
    }

    /// Posts a reminder using the webhook stored on the profile.
    pub async fn notify_profile(
        &self,
        profile: &Profile,
        bookmark: &Bookmark,
    ) -> Result<(), NotifyError> {
        let webhook = profile.slack_webhook.as_deref().ok_or(NotifyError::NoWebhook)?;
        self.notify(webhook, bookmark).await
    }
}

impl Default for ReminderNotifier {
    fn default() -> Self {
        Self::new()
    }
}
