//! TriggerMessage handler and its after-hook
//!
//! The handler only answers whether the message will be sent; the
//! requested message itself goes out from [`TriggerMessageHook`] once the
//! response is on the wire.

use async_trait::async_trait;
use rust_ocpp::v1_6::messages::trigger_message::{TriggerMessageRequest, TriggerMessageResponse};
use rust_ocpp::v1_6::types::{MessageTrigger, TriggerMessageStatus};
use serde_json::Value;
use tracing::info;

use crate::application::actions::send_heartbeat;
use crate::application::context::{ChargePointContext, SharedContext};
use crate::application::dispatcher::{parse_payload, to_payload, ActionHook};
use crate::domain::{ReadingContext, SessionResult};

const ACTION: &str = "TriggerMessage";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Accepted,
    Rejected,
    NotImplemented,
}

fn decide(ctx: &ChargePointContext, req: &TriggerMessageRequest) -> Decision {
    let connector_ok = match req.connector_id {
        None | Some(0) => true,
        Some(id) => id == ctx.connector_id(),
    };
    match req.requested_message {
        MessageTrigger::BootNotification | MessageTrigger::Heartbeat => Decision::Accepted,
        MessageTrigger::MeterValues | MessageTrigger::StatusNotification if connector_ok => {
            Decision::Accepted
        }
        MessageTrigger::MeterValues | MessageTrigger::StatusNotification => Decision::Rejected,
        _ => Decision::NotImplemented,
    }
}

pub async fn handle_trigger_message(
    ctx: &ChargePointContext,
    payload: Value,
) -> SessionResult<Value> {
    let req: TriggerMessageRequest = parse_payload(ACTION, payload)?;
    let decision = decide(ctx, &req);
    info!(
        requested_message = ?req.requested_message,
        connector_id = ?req.connector_id,
        ?decision,
        "TriggerMessage"
    );

    let status = match decision {
        Decision::Accepted => TriggerMessageStatus::Accepted,
        Decision::Rejected => TriggerMessageStatus::Rejected,
        Decision::NotImplemented => TriggerMessageStatus::NotImplemented,
    };
    to_payload(ACTION, &TriggerMessageResponse { status })
}

/// Sends the triggered message after the TriggerMessage response.
pub struct TriggerMessageHook {
    ctx: SharedContext,
}

impl TriggerMessageHook {
    pub fn new(ctx: SharedContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ActionHook for TriggerMessageHook {
    async fn run(&self, payload: Value) -> SessionResult<()> {
        let req: TriggerMessageRequest = parse_payload(ACTION, payload)?;
        if decide(&self.ctx, &req) != Decision::Accepted {
            return Ok(());
        }

        match req.requested_message {
            MessageTrigger::BootNotification => self.ctx.boot().await.map(|_| ()),
            MessageTrigger::Heartbeat => send_heartbeat(&self.ctx.correlator).await.map(|_| ()),
            MessageTrigger::MeterValues => {
                let measurands = self.ctx.config.sampled_measurands().await?;
                self.ctx
                    .report_meter_values(&measurands, ReadingContext::Trigger)
                    .await
            }
            MessageTrigger::StatusNotification => self.ctx.connector.announce().await.map(|_| ()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::context;
    use crate::support::testing::CentralSystemStub;
    use serde_json::json;

    #[tokio::test]
    async fn supported_triggers_are_accepted() {
        let cs = CentralSystemStub::start();
        let ctx = context(&cs);
        for message in ["BootNotification", "Heartbeat", "MeterValues", "StatusNotification"] {
            let response =
                handle_trigger_message(&ctx, json!({ "requestedMessage": message }))
                    .await
                    .unwrap();
            assert_eq!(response["status"], "Accepted", "{}", message);
        }
        assert!(cs.actions().is_empty());
    }

    #[tokio::test]
    async fn firmware_trigger_is_not_implemented() {
        let cs = CentralSystemStub::start();
        let ctx = context(&cs);
        let payload = json!({ "requestedMessage": "FirmwareStatusNotification" });

        let response = handle_trigger_message(&ctx, payload.clone()).await.unwrap();
        assert_eq!(response["status"], "NotImplemented");

        TriggerMessageHook::new(ctx).run(payload).await.unwrap();
        assert!(cs.actions().is_empty());
    }

    #[tokio::test]
    async fn other_connector_is_rejected() {
        let cs = CentralSystemStub::start();
        let ctx = context(&cs);
        let response = handle_trigger_message(
            &ctx,
            json!({ "requestedMessage": "StatusNotification", "connectorId": 3 }),
        )
        .await
        .unwrap();
        assert_eq!(response["status"], "Rejected");
    }

    #[tokio::test]
    async fn hook_sends_requested_messages() {
        let cs = CentralSystemStub::start();
        let ctx = context(&cs);
        let hook = TriggerMessageHook::new(ctx.clone());

        for message in ["Heartbeat", "MeterValues", "StatusNotification", "BootNotification"] {
            hook.run(json!({ "requestedMessage": message })).await.unwrap();
        }

        assert_eq!(
            cs.actions(),
            vec!["Heartbeat", "MeterValues", "StatusNotification", "BootNotification"]
        );
        let report = &cs.calls("MeterValues")[0];
        assert_eq!(report["meterValue"][0]["sampledValue"][0]["context"], "Trigger");
        assert_eq!(
            cs.statuses(),
            vec![("Available".to_string(), "NoError".to_string())]
        );
    }
}
