use std::fmt;

// === StoreError ===

/// Errors returned by bookmark/profile store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A mutation was attempted without a configured user.
    NotAuthenticated,
    /// No row with the given ID exists.
    NotFound(String),
    /// The network request to the remote store failed.
    Network(String),
    /// The remote store rejected the request.
    Api(String),
    /// Embedded database operation failed.
    Database(String),
    /// A row could not be serialized or deserialized.
    Serialization(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotAuthenticated => write!(f, "Not authenticated"),
            StoreError::NotFound(id) => write!(f, "Row not found: {}", id),
            StoreError::Network(msg) => write!(f, "Store network error: {}", msg),
            StoreError::Api(msg) => write!(f, "Store API error: {}", msg),
            StoreError::Database(msg) => write!(f, "Store database error: {}", msg),
            StoreError::Serialization(msg) => {
                write!(f, "Store serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StoreError {}

// === ConfigError ===

/// Errors raised while reading the environment configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    Missing(String),
    /// A variable is set but fails validation.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// === RealtimeError ===

/// Errors from the realtime change-feed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    /// The websocket connection could not be established.
    Connect(String),
    /// A frame could not be encoded or decoded.
    Protocol(String),
    /// The connection was closed by the server.
    Closed(String),
}

impl fmt::Display for RealtimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealtimeError::Connect(msg) => write!(f, "Realtime connect error: {}", msg),
            RealtimeError::Protocol(msg) => write!(f, "Realtime protocol error: {}", msg),
            RealtimeError::Closed(msg) => write!(f, "Realtime connection closed: {}", msg),
        }
    }
}

impl std::error::Error for RealtimeError {}

// === AnalysisError ===

/// Errors from the AI bookmark analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// A network error occurred while calling the generative endpoint.
    Network(String),
    /// The provider returned an error response.
    Provider(String),
    /// The model output could not be parsed as the expected JSON object.
    Parse(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Network(msg) => write!(f, "Analysis network error: {}", msg),
            AnalysisError::Provider(msg) => write!(f, "Analysis provider error: {}", msg),
            AnalysisError::Parse(msg) => write!(f, "Analysis parse error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

// === NotifyError ===

/// Errors from the reminder webhook notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// No webhook URL is configured on the profile.
    NoWebhook,
    /// The webhook request failed.
    Network(String),
    /// The webhook endpoint rejected the payload.
    Rejected(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::NoWebhook => write!(f, "No webhook configured"),
            NotifyError::Network(msg) => write!(f, "Webhook network error: {}", msg),
            NotifyError::Rejected(msg) => write!(f, "Webhook rejected: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}
