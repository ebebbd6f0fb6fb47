//! RemoteStopTransaction handler

use rust_ocpp::v1_6::messages::remote_stop_transaction::{
    RemoteStopTransactionRequest, RemoteStopTransactionResponse,
};
use rust_ocpp::v1_6::types::RemoteStartStopStatus;
use serde_json::Value;
use tracing::{info, warn};

use crate::application::context::ChargePointContext;
use crate::application::dispatcher::{parse_payload, to_payload};
use crate::domain::SessionResult;

const ACTION: &str = "RemoteStopTransaction";

pub async fn handle_remote_stop_transaction(
    ctx: &ChargePointContext,
    payload: Value,
) -> SessionResult<Value> {
    let req: RemoteStopTransactionRequest = parse_payload(ACTION, payload)?;
    let transaction_id = req.transaction_id;
    info!(transaction_id, "RemoteStopTransaction");

    let status = if ctx.transactions.active_transaction_id().await == Some(transaction_id) {
        ctx.transactions.spawn_stop(transaction_id);
        RemoteStartStopStatus::Accepted
    } else {
        warn!(transaction_id, "RemoteStopTransaction for unknown transaction");
        RemoteStartStopStatus::Rejected
    };

    to_payload(ACTION, &RemoteStopTransactionResponse { status })
}
