//! GetConfiguration handler

use rust_ocpp::v1_6::messages::get_configuration::{
    GetConfigurationRequest, GetConfigurationResponse,
};
use rust_ocpp::v1_6::types::KeyValue;
use serde_json::Value;
use tracing::info;

use crate::application::context::ChargePointContext;
use crate::application::dispatcher::{parse_payload, to_payload};
use crate::domain::SessionResult;

const ACTION: &str = "GetConfiguration";

pub async fn handle_get_configuration(
    ctx: &ChargePointContext,
    payload: Value,
) -> SessionResult<Value> {
    let req: GetConfigurationRequest = parse_payload(ACTION, payload)?;
    let keys = req.key.unwrap_or_default();
    info!(?keys, "GetConfiguration");

    let (known, unknown) = ctx.config.entries(&keys).await;
    let configuration_key = known
        .into_iter()
        .map(|entry| KeyValue {
            key: entry.key,
            readonly: entry.readonly,
            value: Some(entry.value),
        })
        .collect();

    let response = GetConfigurationResponse {
        configuration_key: Some(configuration_key),
        unknown_key: (!unknown.is_empty()).then_some(unknown),
    };
    to_payload(ACTION, &response)
}
