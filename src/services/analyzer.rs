//! AI bookmark analysis for Bookmarkr.
//!
//! Single call against a generative-text endpoint: given a URL and optional
//! title, the model returns a raw JSON object with a suggested description,
//! tags, priority and status. The whole feature is best-effort — a missing
//! API key or any request/parse failure degrades to manual entry, never an
//! error for the caller.

use log::warn;
use serde::Deserialize;
use serde_json::json;

use crate::config::AppConfig;
use crate::types::analysis::AnalysisResult;
use crate::types::bookmark::{Priority, Status};
use crate::types::errors::AnalysisError;

const GENERATIVE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Raw model output before validation. Every field may be missing or junk.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    description: Option<String>,
    tags: Option<Vec<String>>,
    priority: Option<String>,
    status: Option<String>,
}

/// Analyzer over the generative-text endpoint.
pub struct BookmarkAnalyzer {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl BookmarkAnalyzer {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.gemini_api_key.clone(), config.gemini_model.clone())
    }

    /// True when an API key is configured.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Analyzes a bookmark. Returns `None` when the feature is disabled or
    /// anything goes wrong — the caller falls back to manual entry.
    pub async fn analyze(&self, url: &str, title: Option<&str>) -> Option<AnalysisResult> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("AI analysis skipped: missing API key");
            return None;
        };

        match self.request_analysis(api_key, url, title).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("AI analysis failed: {}", e);
                None
            }
        }
    }

    async fn request_analysis(
        &self,
        api_key: &str,
        url: &str,
        title: Option<&str>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let endpoint = format!(
            "{}/{}:generateContent?key={}",
            GENERATIVE_API_BASE, self.model, api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(url, title) }] }]
        });

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Provider(format!(
                "{}: {}",
                status,
                detail.trim()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Parse(e.to_string()))?;
        let text = payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| AnalysisError::Provider("response carries no text".to_string()))?;

        parse_analysis_text(text)
    }
}

/// Prompt asking for a raw JSON object describing the bookmark.
fn build_prompt(url: &str, title: Option<&str>) -> String {
    format!(
        "Analyze this bookmark.\n\
         URL: {}\n\
         Title: {}\n\n\
         Output a JSON object with:\n\
         - description: A short summary (max 100 chars).\n\
         - tags: Array of 3-5 keywords (lowercase).\n\
         - priority: \"low\", \"medium\", or \"high\" based on importance.\n\
         - status: \"saved\", \"reading\", or \"completed\".\n\n\
         Return ONLY raw JSON, no markdown formatting.",
        url,
        title.unwrap_or("Unknown")
    )
}

/// Parses the model's text output into a validated [`AnalysisResult`].
///
/// Models wrap JSON in markdown code fences despite being asked not to, so
/// fences are stripped first. Unrecognized priority/status values fall back
/// to medium/saved.
pub fn parse_analysis_text(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let cleaned = strip_code_fences(text);
    let raw: RawAnalysis =
        serde_json::from_str(&cleaned).map_err(|e| AnalysisError::Parse(e.to_string()))?;

    Ok(AnalysisResult {
        description: raw.description,
        tags: raw.tags.unwrap_or_default(),
        priority: raw
            .priority
            .as_deref()
            .and_then(Priority::parse)
            .unwrap_or_default(),
        status: raw
            .status
            .as_deref()
            .and_then(Status::parse)
            .unwrap_or_default(),
    })
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}
