//! BootNotification

use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::types::RegistrationStatus;
use tracing::{info, warn};

use super::{decode, encode};
use crate::application::correlator::MessageCorrelator;
use crate::domain::{ChargePointIdentity, SessionResult};

const ACTION: &str = "BootNotification";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootOutcome {
    pub accepted: bool,
    /// Heartbeat interval requested by the central system, in seconds.
    pub interval: i64,
}

pub async fn send_boot_notification(
    correlator: &MessageCorrelator,
    identity: &ChargePointIdentity,
) -> SessionResult<BootOutcome> {
    let request = BootNotificationRequest {
        charge_point_vendor: identity.vendor.clone(),
        charge_point_model: identity.model.clone(),
        charge_box_serial_number: identity.charge_box_serial_number.clone(),
        charge_point_serial_number: identity.charge_point_serial_number.clone(),
        firmware_version: identity.firmware_version.clone(),
        iccid: identity.iccid.clone(),
        imsi: identity.imsi.clone(),
        meter_serial_number: identity.meter_serial_number.clone(),
        meter_type: identity.meter_type.clone(),
    };

    let result = correlator.call(ACTION, encode(ACTION, &request)?).await?;
    let response: BootNotificationResponse = decode(ACTION, result)?;

    let accepted = matches!(response.status, RegistrationStatus::Accepted);
    if accepted {
        info!(
            interval = i64::from(response.interval),
            "Connected to central system"
        );
    } else {
        warn!(status = ?response.status, "Central system did not accept the boot notification");
    }

    Ok(BootOutcome {
        accepted,
        interval: i64::from(response.interval),
    })
}
