use serde::{Deserialize, Serialize};

use super::bookmark::{Priority, Status};

/// AI-generated metadata for a bookmark.
///
/// Produced by the analyzer from the model's raw JSON output. `priority` and
/// `status` are always valid here — unrecognized values fall back to
/// [`Priority::Medium`] and [`Status::Saved`] during post-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: Priority,
    pub status: Status,
}
