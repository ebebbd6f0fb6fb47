//! ClearChargingProfile handler

use rust_ocpp::v1_6::messages::clear_charging_profile::{
    ClearChargingProfileRequest, ClearChargingProfileResponse,
};
use rust_ocpp::v1_6::types::ClearChargingProfileStatus;
use serde_json::Value;
use tracing::info;

use crate::application::context::ChargePointContext;
use crate::application::dispatcher::{parse_payload, to_payload};
use crate::domain::SessionResult;

const ACTION: &str = "ClearChargingProfile";

/// Lifts the current cap whatever the filter says.
pub async fn handle_clear_charging_profile(
    ctx: &ChargePointContext,
    payload: Value,
) -> SessionResult<Value> {
    let req: ClearChargingProfileRequest = parse_payload(ACTION, payload)?;
    info!(
        id = ?req.id,
        connector_id = ?req.connector_id,
        purpose = ?req.charging_profile_purpose,
        stack_level = ?req.stack_level,
        "ClearChargingProfile"
    );

    ctx.limiter.clear().await;

    to_payload(
        ACTION,
        &ClearChargingProfileResponse {
            status: ClearChargingProfileStatus::Accepted,
        },
    )
}
