use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Importance level assigned to a bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Parses the lowercase wire form. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Reading state of a bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Saved,
    Reading,
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Saved => "saved",
            Status::Reading => "reading",
            Status::Completed => "completed",
        }
    }

    /// Parses the lowercase wire form. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "saved" => Some(Status::Saved),
            "reading" => Some(Status::Reading),
            "completed" => Some(Status::Completed),
            _ => None,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Saved
    }
}

/// Represents a saved bookmark row, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: Status,
    pub reminder_at: Option<DateTime<Utc>>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a bookmark.
///
/// `priority` and `status` fall back to [`Priority::Medium`] and
/// [`Status::Saved`] when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBookmarkPayload {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_at: Option<DateTime<Utc>>,
}

/// Partial update for an existing bookmark. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBookmarkPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_at: Option<DateTime<Utc>>,
}

impl UpdateBookmarkPayload {
    /// Returns true when no field is set — applying it changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.url.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.reminder_at.is_none()
    }

    /// Merges the set fields into `bookmark`, leaving the rest untouched.
    pub fn apply_to(&self, bookmark: &mut Bookmark) {
        if let Some(title) = &self.title {
            bookmark.title = title.clone();
        }
        if let Some(url) = &self.url {
            bookmark.url = url.clone();
        }
        if let Some(description) = &self.description {
            bookmark.description = Some(description.clone());
        }
        if let Some(priority) = self.priority {
            bookmark.priority = priority;
        }
        if let Some(status) = self.status {
            bookmark.status = status;
        }
        if let Some(reminder_at) = self.reminder_at {
            bookmark.reminder_at = Some(reminder_at);
        }
    }
}

/// List filter parameters. `None` means "all" for status and priority;
/// `search` is matched case-insensitively against title, description and URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkFilters {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

/// Aggregate counters derived from the live bookmark set.
///
/// Never persisted — always recomputed from the rows themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkStats {
    pub total: u64,
    pub high_priority: u64,
    pub reading: u64,
    pub completed: u64,
}

impl BookmarkStats {
    /// Tallies stats from the `(priority, status)` pairs of the full row set.
    pub fn tally(rows: impl Iterator<Item = (Priority, Status)>) -> Self {
        let mut stats = BookmarkStats::default();
        for (priority, status) in rows {
            stats.total += 1;
            if priority == Priority::High {
                stats.high_priority += 1;
            }
            match status {
                Status::Reading => stats.reading += 1,
                Status::Completed => stats.completed += 1,
                Status::Saved => {}
            }
        }
        stats
    }
}
