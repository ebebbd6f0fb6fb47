//! Heartbeat

use chrono::{DateTime, Utc};
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use serde_json::json;
use tracing::debug;

use super::decode;
use crate::application::correlator::MessageCorrelator;
use crate::domain::SessionResult;

const ACTION: &str = "Heartbeat";

/// Returns the central system's clock.
pub async fn send_heartbeat(correlator: &MessageCorrelator) -> SessionResult<DateTime<Utc>> {
    let result = correlator.call(ACTION, json!({})).await?;
    let response: HeartbeatResponse = decode(ACTION, result)?;
    debug!(current_time = %response.current_time, "Heartbeat acknowledged");
    Ok(response.current_time)
}
