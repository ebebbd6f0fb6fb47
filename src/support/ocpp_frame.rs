//! OCPP-J message framing
//!
//! The three frame kinds exchanged with the central system:
//!
//! - **Call**       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<uniqueId>", {<payload>}]`
//! - **CallError**  `[4, "<uniqueId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`

use serde_json::{Map, Value};
use thiserror::Error;

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

// ── CallErrorCode ──────────────────────────────────────────────

/// Error codes a charge point may put into a `CallError` frame (OCPP-J §4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallErrorCode {
    NotImplemented,
    NotSupported,
    InternalError,
    ProtocolError,
    SecurityError,
    FormationViolation,
    PropertyConstraintViolation,
    TypeConstraintViolation,
    GenericError,
}

impl CallErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotImplemented => "NotImplemented",
            Self::NotSupported => "NotSupported",
            Self::InternalError => "InternalError",
            Self::ProtocolError => "ProtocolError",
            Self::SecurityError => "SecurityError",
            Self::FormationViolation => "FormationViolation",
            Self::PropertyConstraintViolation => "PropertyConstraintViolation",
            Self::TypeConstraintViolation => "TypeConstraintViolation",
            Self::GenericError => "GenericError",
        }
    }
}

// ── OcppFrame ──────────────────────────────────────────────────

/// A decoded OCPP-J frame.
#[derive(Debug, Clone, PartialEq)]
pub enum OcppFrame {
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    CallResult {
        unique_id: String,
        payload: Value,
    },
    CallError {
        unique_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
}

impl OcppFrame {
    pub fn call(unique_id: impl Into<String>, action: impl Into<String>, payload: Value) -> Self {
        Self::Call {
            unique_id: unique_id.into(),
            action: action.into(),
            payload,
        }
    }

    pub fn result(unique_id: impl Into<String>, payload: Value) -> Self {
        Self::CallResult {
            unique_id: unique_id.into(),
            payload,
        }
    }

    pub fn error(
        unique_id: impl Into<String>,
        code: CallErrorCode,
        description: impl Into<String>,
    ) -> Self {
        Self::CallError {
            unique_id: unique_id.into(),
            error_code: code.as_str().to_string(),
            error_description: description.into(),
            error_details: empty_object(),
        }
    }

    /// Decode a text frame received from the transport.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        let arr = value.as_array().ok_or(FrameError::NotAnArray)?;

        let msg_type = arr
            .first()
            .ok_or(FrameError::EmptyArray)?
            .as_u64()
            .ok_or(FrameError::InvalidMessageType)?;

        match msg_type {
            MSG_TYPE_CALL => {
                require_len(arr, 4)?;
                Ok(Self::Call {
                    unique_id: string_at(arr, 1, "uniqueId")?,
                    action: string_at(arr, 2, "action")?,
                    payload: arr[3].clone(),
                })
            }
            MSG_TYPE_CALL_RESULT => {
                require_len(arr, 3)?;
                let payload = match &arr[2] {
                    Value::Null => empty_object(),
                    other => other.clone(),
                };
                Ok(Self::CallResult {
                    unique_id: string_at(arr, 1, "uniqueId")?,
                    payload,
                })
            }
            MSG_TYPE_CALL_ERROR => {
                require_len(arr, 3)?;
                Ok(Self::CallError {
                    unique_id: string_at(arr, 1, "uniqueId")?,
                    error_code: string_at(arr, 2, "errorCode")?,
                    error_description: arr
                        .get(3)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    error_details: arr.get(4).cloned().unwrap_or_else(empty_object),
                })
            }
            other => Err(FrameError::UnknownMessageType(other)),
        }
    }

    /// Encode this frame as OCPP-J text.
    pub fn serialize(&self) -> String {
        let arr = match self {
            Self::Call {
                unique_id,
                action,
                payload,
            } => vec![
                Value::from(MSG_TYPE_CALL),
                Value::from(unique_id.as_str()),
                Value::from(action.as_str()),
                payload.clone(),
            ],
            Self::CallResult { unique_id, payload } => vec![
                Value::from(MSG_TYPE_CALL_RESULT),
                Value::from(unique_id.as_str()),
                payload.clone(),
            ],
            Self::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            } => vec![
                Value::from(MSG_TYPE_CALL_ERROR),
                Value::from(unique_id.as_str()),
                Value::from(error_code.as_str()),
                Value::from(error_description.as_str()),
                error_details.clone(),
            ],
        };
        Value::Array(arr).to_string()
    }

    pub fn unique_id(&self) -> &str {
        match self {
            Self::Call { unique_id, .. }
            | Self::CallResult { unique_id, .. }
            | Self::CallError { unique_id, .. } => unique_id,
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn require_len(arr: &[Value], expected: usize) -> Result<(), FrameError> {
    if arr.len() < expected {
        return Err(FrameError::MissingFields {
            expected,
            got: arr.len(),
        });
    }
    Ok(())
}

fn string_at(arr: &[Value], idx: usize, field: &'static str) -> Result<String, FrameError> {
    arr[idx]
        .as_str()
        .map(str::to_string)
        .ok_or(FrameError::FieldTypeMismatch(field))
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("OCPP message is not a JSON array")]
    NotAnArray,
    #[error("Empty OCPP message array")]
    EmptyArray,
    #[error("Message type is not a number")]
    InvalidMessageType,
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u64),
    #[error("Expected at least {expected} fields, got {got}")]
    MissingFields { expected: usize, got: usize },
    #[error("Field {0} must be a string")]
    FieldTypeMismatch(&'static str),
}
