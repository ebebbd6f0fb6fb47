//! StopTransaction

use chrono::Utc;
use rust_ocpp::v1_6::messages::stop_transaction::{
    StopTransactionRequest, StopTransactionResponse,
};
use rust_ocpp::v1_6::types::{AuthorizationStatus, Reason};

use super::{decode, encode};
use crate::application::correlator::MessageCorrelator;
use crate::domain::SessionResult;

const ACTION: &str = "StopTransaction";

/// Returns whether the central system accepted the id tag. A response
/// without `idTagInfo` counts as accepted.
pub async fn send_stop_transaction(
    correlator: &MessageCorrelator,
    transaction_id: i32,
    id_tag: &str,
    meter_stop: i32,
) -> SessionResult<bool> {
    let request = StopTransactionRequest {
        id_tag: Some(id_tag.to_string()),
        meter_stop,
        timestamp: Utc::now(),
        transaction_id,
        reason: Some(Reason::Remote),
        transaction_data: None,
    };

    let result = correlator.call(ACTION, encode(ACTION, &request)?).await?;
    let response: StopTransactionResponse = decode(ACTION, result)?;

    Ok(response
        .id_tag_info
        .map_or(true, |info| matches!(info.status, AuthorizationStatus::Accepted)))
}
