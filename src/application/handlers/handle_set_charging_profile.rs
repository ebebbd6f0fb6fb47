//! SetChargingProfile handler

use std::time::Duration;

use rust_ocpp::v1_6::messages::set_charging_profile::{
    SetChargingProfileRequest, SetChargingProfileResponse,
};
use rust_ocpp::v1_6::types::{ChargingProfileStatus, ChargingRateUnitType};
use serde_json::Value;
use tracing::info;

use crate::application::context::ChargePointContext;
use crate::application::dispatcher::{parse_payload, to_payload};
use crate::domain::{LimitOutcome, PowerLimitRequest, RateUnit, SessionResult};

const ACTION: &str = "SetChargingProfile";

/// Only the first schedule period is honoured; the simulator caps power
/// for `duration` seconds and then returns to the prior value.
pub async fn handle_set_charging_profile(
    ctx: &ChargePointContext,
    payload: Value,
) -> SessionResult<Value> {
    let req: SetChargingProfileRequest = parse_payload(ACTION, payload)?;
    let profile = &req.cs_charging_profiles;
    let schedule = &profile.charging_schedule;

    info!(
        connector_id = req.connector_id,
        profile_id = profile.charging_profile_id,
        unit = ?schedule.charging_rate_unit,
        periods = schedule.charging_schedule_period.len(),
        "SetChargingProfile"
    );

    let outcome = match schedule.charging_schedule_period.first() {
        Some(period) => {
            let request = PowerLimitRequest {
                unit: match schedule.charging_rate_unit {
                    ChargingRateUnitType::A => RateUnit::Ampere,
                    ChargingRateUnitType::W => RateUnit::Watt,
                },
                limit: period.limit,
                duration: schedule
                    .duration
                    .map(|secs| Duration::from_secs(secs.max(0) as u64)),
            };
            let connector_id = u32::try_from(req.connector_id).unwrap_or(u32::MAX);
            ctx.limiter.apply(connector_id, request).await?
        }
        None => LimitOutcome::Rejected,
    };

    let status = match outcome {
        LimitOutcome::Accepted => ChargingProfileStatus::Accepted,
        LimitOutcome::Rejected => ChargingProfileStatus::Rejected,
    };
    to_payload(ACTION, &SetChargingProfileResponse { status })
}
