use serde::{Deserialize, Serialize};

/// Kind of row change reported by the bookmarks change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Parses the uppercase wire form used by the realtime feed.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// A change notification for the bookmarks table.
///
/// Consumers only act on the fact that something changed (full refetch, no
/// incremental merge); the bookmark id is carried for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub bookmark_id: Option<String>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, bookmark_id: Option<String>) -> Self {
        Self { kind, bookmark_id }
    }
}
