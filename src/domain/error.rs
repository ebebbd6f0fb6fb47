//! Session errors

use thiserror::Error;

use super::connector::ConnectorStatus;

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The connection to the central system is gone. Fatal for the session.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No response to {action} within {timeout_secs}s")]
    Timeout { action: String, timeout_secs: u64 },

    /// The central system answered with a CallError.
    #[error("CallError {code}: {description}")]
    Protocol { code: String, description: String },

    #[error("Unexpected {action} response: {reason}")]
    InvalidResponse { action: String, reason: String },

    #[error("Invalid {action} payload: {reason}")]
    InvalidPayload { action: String, reason: String },

    #[error("Unknown configuration key: {0}")]
    UnknownConfigurationKey(String),

    #[error("Configuration key {0} is read-only")]
    ReadonlyConfigurationKey(String),

    #[error("Invalid value {value:?} for configuration key {key}")]
    InvalidConfigurationValue { key: String, value: String },

    #[error("Connector {0} already has an active transaction")]
    ConnectorBusy(u32),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(i32),

    #[error("Unknown connector: {0}")]
    UnknownConnector(u32),

    #[error("Connector {connector_id}: invalid transition {from} -> {to}")]
    InvalidTransition {
        connector_id: u32,
        from: ConnectorStatus,
        to: ConnectorStatus,
    },

    /// Startup misconfiguration. Fatal.
    #[error("Handler already registered for {0}")]
    DuplicateHandler(String),
}

impl SessionError {
    /// Errors that must terminate the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::DuplicateHandler(_))
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Protocol { .. } => "protocol",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::UnknownConfigurationKey(_)
            | Self::ReadonlyConfigurationKey(_)
            | Self::InvalidConfigurationValue { .. } => "configuration",
            Self::ConnectorBusy(_) => "connector_busy",
            Self::UnknownTransaction(_) => "unknown_transaction",
            Self::UnknownConnector(_) => "unknown_connector",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::DuplicateHandler(_) => "duplicate_handler",
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
