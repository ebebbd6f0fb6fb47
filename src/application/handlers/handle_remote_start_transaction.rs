//! RemoteStartTransaction handler

use rust_ocpp::v1_6::messages::remote_start_transaction::{
    RemoteStartTransactionRequest, RemoteStartTransactionResponse,
};
use rust_ocpp::v1_6::types::RemoteStartStopStatus;
use serde_json::Value;
use tracing::{info, warn};

use crate::application::context::ChargePointContext;
use crate::application::dispatcher::{parse_payload, to_payload};
use crate::domain::SessionResult;

const ACTION: &str = "RemoteStartTransaction";

/// Acknowledges at once; the StartTransaction exchange runs in the
/// background once the connector is free.
pub async fn handle_remote_start_transaction(
    ctx: &ChargePointContext,
    payload: Value,
) -> SessionResult<Value> {
    let req: RemoteStartTransactionRequest = parse_payload(ACTION, payload)?;
    let connector_id = req
        .connector_id
        .map(|id| u32::try_from(id).unwrap_or(u32::MAX))
        .unwrap_or_else(|| ctx.connector_id());

    info!(
        connector_id,
        id_tag = req.id_tag.as_str(),
        "RemoteStartTransaction"
    );

    let status = if connector_id == ctx.connector_id() {
        ctx.transactions.spawn_start(connector_id, req.id_tag);
        RemoteStartStopStatus::Accepted
    } else {
        warn!(connector_id, "RemoteStartTransaction for unknown connector");
        RemoteStartStopStatus::Rejected
    };

    to_payload(ACTION, &RemoteStartTransactionResponse { status })
}
