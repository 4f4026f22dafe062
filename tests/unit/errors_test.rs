//! Unit tests for error type Display formatting.
//!
//! Error messages surface directly in `last_error` and in logs, so their
//! wording is part of the contract.

use bookmarkr::types::errors::{
    AnalysisError, ConfigError, NotifyError, RealtimeError, StoreError,
};

#[test]
fn test_store_error_display() {
    assert_eq!(StoreError::NotAuthenticated.to_string(), "Not authenticated");
    assert_eq!(
        StoreError::NotFound("abc".to_string()).to_string(),
        "Row not found: abc"
    );
    assert_eq!(
        StoreError::Network("timeout".to_string()).to_string(),
        "Store network error: timeout"
    );
    assert_eq!(
        StoreError::Api("400: bad request".to_string()).to_string(),
        "Store API error: 400: bad request"
    );
    assert_eq!(
        StoreError::Database("locked".to_string()).to_string(),
        "Store database error: locked"
    );
    assert_eq!(
        StoreError::Serialization("bad json".to_string()).to_string(),
        "Store serialization error: bad json"
    );
}

#[test]
fn test_config_error_display() {
    assert_eq!(
        ConfigError::Missing("BOOKMARKR_REMOTE_URL".to_string()).to_string(),
        "Missing environment variable: BOOKMARKR_REMOTE_URL"
    );
    assert_eq!(
        ConfigError::Invalid("bad url".to_string()).to_string(),
        "Invalid configuration: bad url"
    );
}

#[test]
fn test_realtime_error_display() {
    assert_eq!(
        RealtimeError::Connect("refused".to_string()).to_string(),
        "Realtime connect error: refused"
    );
    assert_eq!(
        RealtimeError::Protocol("bad frame".to_string()).to_string(),
        "Realtime protocol error: bad frame"
    );
    assert_eq!(
        RealtimeError::Closed("going away".to_string()).to_string(),
        "Realtime connection closed: going away"
    );
}

#[test]
fn test_analysis_error_display() {
    assert_eq!(
        AnalysisError::Network("dns".to_string()).to_string(),
        "Analysis network error: dns"
    );
    assert_eq!(
        AnalysisError::Provider("quota".to_string()).to_string(),
        "Analysis provider error: quota"
    );
    assert_eq!(
        AnalysisError::Parse("not json".to_string()).to_string(),
        "Analysis parse error: not json"
    );
}

#[test]
fn test_notify_error_display() {
    assert_eq!(NotifyError::NoWebhook.to_string(), "No webhook configured");
    assert_eq!(
        NotifyError::Network("reset".to_string()).to_string(),
        "Webhook network error: reset"
    );
    assert_eq!(
        NotifyError::Rejected("404: gone".to_string()).to_string(),
        "Webhook rejected: 404: gone"
    );
}

#[test]
fn test_errors_implement_std_error() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    assert_error(&StoreError::NotAuthenticated);
    assert_error(&ConfigError::Missing("X".to_string()));
    assert_error(&RealtimeError::Connect("x".to_string()));
    assert_error(&AnalysisError::Parse("x".to_string()));
    assert_error(&NotifyError::NoWebhook);
}
