//! MeterValues handler
//!
//! A charge point has nothing to do with MeterValues sent to it; the
//! request is acknowledged with an empty payload.

use serde_json::{json, Value};
use tracing::debug;

use crate::application::context::ChargePointContext;
use crate::domain::SessionResult;

pub async fn handle_meter_values(ctx: &ChargePointContext, payload: Value) -> SessionResult<Value> {
    debug!(
        connector_id = ctx.connector_id(),
        %payload,
        "MeterValues received"
    );
    Ok(json!({}))
}
