//! StatusNotification

use chrono::Utc;
use rust_ocpp::v1_6::messages::status_notification::StatusNotificationRequest;
use rust_ocpp::v1_6::types::{ChargePointErrorCode, ChargePointStatus};
use tracing::info;

use super::encode;
use crate::application::correlator::MessageCorrelator;
use crate::domain::{ConnectorErrorCode, ConnectorStatus, SessionResult, StatusChange};

const ACTION: &str = "StatusNotification";

pub async fn send_status_notification(
    correlator: &MessageCorrelator,
    change: &StatusChange,
) -> SessionResult<()> {
    info!(
        connector_id = change.connector_id,
        status = change.to.as_str(),
        error_code = change.error_code.as_str(),
        "StatusNotification"
    );

    let request = StatusNotificationRequest {
        connector_id: change.connector_id,
        error_code: error_code_to_ocpp(change.error_code),
        info: None,
        status: status_to_ocpp(change.to),
        timestamp: Some(Utc::now()),
        vendor_id: None,
        vendor_error_code: None,
    };

    correlator
        .call(ACTION, encode(ACTION, &request)?)
        .await
        .map(|_| ())
}

fn status_to_ocpp(status: ConnectorStatus) -> ChargePointStatus {
    match status {
        ConnectorStatus::Available => ChargePointStatus::Available,
        ConnectorStatus::Preparing => ChargePointStatus::Preparing,
        ConnectorStatus::Charging => ChargePointStatus::Charging,
        ConnectorStatus::Finishing => ChargePointStatus::Finishing,
        ConnectorStatus::Faulted => ChargePointStatus::Faulted,
        ConnectorStatus::Unavailable => ChargePointStatus::Unavailable,
    }
}

fn error_code_to_ocpp(code: ConnectorErrorCode) -> ChargePointErrorCode {
    match code {
        ConnectorErrorCode::NoError => ChargePointErrorCode::NoError,
        ConnectorErrorCode::EvCommunicationError => ChargePointErrorCode::EVCommunicationError,
        ConnectorErrorCode::GroundFailure => ChargePointErrorCode::GroundFailure,
        ConnectorErrorCode::HighTemperature => ChargePointErrorCode::HighTemperature,
        ConnectorErrorCode::InternalError => ChargePointErrorCode::InternalError,
        ConnectorErrorCode::OtherError => ChargePointErrorCode::OtherError,
        ConnectorErrorCode::PowerMeterFailure => ChargePointErrorCode::PowerMeterFailure,
    }
}
