//! Outbound OCPP 1.6 actions (charge point → central system)
//!
//! Each action builds its request payload, sends it through the
//! [`MessageCorrelator`](super::correlator::MessageCorrelator) and decodes
//! the response into the outcome the caller cares about.

pub mod boot_notification;
pub mod heartbeat;
pub mod meter_values;
pub mod start_transaction;
pub mod status_notification;
pub mod stop_transaction;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{SessionError, SessionResult};

pub use boot_notification::{send_boot_notification, BootOutcome};
pub use heartbeat::send_heartbeat;
pub use meter_values::send_meter_values;
pub use start_transaction::{send_start_transaction, StartOutcome};
pub use status_notification::send_status_notification;
pub use stop_transaction::send_stop_transaction;

fn encode<T: Serialize>(action: &str, request: &T) -> SessionResult<Value> {
    serde_json::to_value(request).map_err(|e| SessionError::InvalidPayload {
        action: action.to_string(),
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(action: &str, payload: Value) -> SessionResult<T> {
    serde_json::from_value(payload).map_err(|e| SessionError::InvalidResponse {
        action: action.to_string(),
        reason: e.to_string(),
    })
}
