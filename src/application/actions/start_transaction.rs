//! StartTransaction

use chrono::Utc;
use rust_ocpp::v1_6::messages::start_transaction::{
    StartTransactionRequest, StartTransactionResponse,
};
use rust_ocpp::v1_6::types::AuthorizationStatus;

use super::{decode, encode};
use crate::application::correlator::MessageCorrelator;
use crate::domain::SessionResult;

const ACTION: &str = "StartTransaction";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub transaction_id: i32,
    pub accepted: bool,
    /// Authorization status as reported by the central system.
    pub status: String,
}

pub async fn send_start_transaction(
    correlator: &MessageCorrelator,
    connector_id: u32,
    id_tag: &str,
    meter_start: i32,
) -> SessionResult<StartOutcome> {
    let request = StartTransactionRequest {
        connector_id,
        id_tag: id_tag.to_string(),
        meter_start,
        reservation_id: None,
        timestamp: Utc::now(),
    };

    let result = correlator.call(ACTION, encode(ACTION, &request)?).await?;
    let response: StartTransactionResponse = decode(ACTION, result)?;

    Ok(StartOutcome {
        transaction_id: response.transaction_id,
        accepted: matches!(response.id_tag_info.status, AuthorizationStatus::Accepted),
        status: format!("{:?}", response.id_tag_info.status),
    })
}
