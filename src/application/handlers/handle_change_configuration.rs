//! ChangeConfiguration handler

use rust_ocpp::v1_6::messages::change_configuration::{
    ChangeConfigurationRequest, ChangeConfigurationResponse,
};
use rust_ocpp::v1_6::types::ConfigurationStatus;
use serde_json::Value;
use tracing::{info, warn};

use crate::application::context::ChargePointContext;
use crate::application::dispatcher::{parse_payload, to_payload};
use crate::domain::{SessionError, SessionResult};

const ACTION: &str = "ChangeConfiguration";

/// New values take effect immediately; the periodic loops pick up interval
/// changes on their next iteration.
pub async fn handle_change_configuration(
    ctx: &ChargePointContext,
    payload: Value,
) -> SessionResult<Value> {
    let req: ChangeConfigurationRequest = parse_payload(ACTION, payload)?;
    info!(
        key = req.key.as_str(),
        value = req.value.as_str(),
        "ChangeConfiguration"
    );

    let status = match ctx.config.set(&req.key, &req.value).await {
        Ok(()) => ConfigurationStatus::Accepted,
        Err(SessionError::UnknownConfigurationKey(key)) => {
            warn!(key = key.as_str(), "Unknown configuration key");
            ConfigurationStatus::NotSupported
        }
        Err(e @ SessionError::ReadonlyConfigurationKey(_))
        | Err(e @ SessionError::InvalidConfigurationValue { .. }) => {
            warn!(error = %e, "Configuration change rejected");
            ConfigurationStatus::Rejected
        }
        Err(e) => return Err(e),
    };

    to_payload(ACTION, &ChangeConfigurationResponse { status })
}
