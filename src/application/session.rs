//! Session orchestrator
//!
//! Owns one connection to the central system:
//!
//! 1. spawns the frame reader, which dispatches inbound calls and routes
//!    responses to the correlator,
//! 2. sends BootNotification,
//! 3. runs the heartbeat and meter loops until one of them fails fatally,
//!    the connection closes, or shutdown is requested.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::context::{ChargePointContext, SharedContext};
use super::correlator::{FrameSender, MessageCorrelator, DEFAULT_CALL_TIMEOUT};
use super::dispatcher::{ActionDispatcher, Dispatched};
use super::handlers::register_all;
use super::services::{heartbeat_loop, meter_loop};
use crate::domain::{ChargePointIdentity, SessionError, SessionResult};
use crate::support::ocpp_frame::OcppFrame;
use crate::support::shutdown::ShutdownSignal;

/// Everything a session needs besides the transport.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub identity: ChargePointIdentity,
    pub connector_id: u32,
    pub call_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            identity: ChargePointIdentity::default(),
            connector_id: 1,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

pub struct ChargePointSession {
    ctx: SharedContext,
    dispatcher: Arc<ActionDispatcher>,
    shutdown: ShutdownSignal,
}

impl ChargePointSession {
    /// Build the session and its routing table. Fails if a handler is
    /// registered twice.
    pub fn new(settings: SessionSettings, outbound: FrameSender) -> SessionResult<Self> {
        let correlator = Arc::new(MessageCorrelator::new(outbound, settings.call_timeout));
        let ctx = Arc::new(ChargePointContext::new(
            settings.identity,
            correlator,
            settings.connector_id,
        ));

        let mut dispatcher = ActionDispatcher::new();
        register_all(&mut dispatcher, &ctx)?;

        Ok(Self {
            ctx,
            dispatcher: Arc::new(dispatcher),
            shutdown: ShutdownSignal::new(),
        })
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn context(&self) -> &SharedContext {
        &self.ctx
    }

    /// Run until the connection ends (`Err(Transport)`), a fatal error
    /// occurs, or shutdown is requested (`Ok`).
    pub async fn run(self, inbound: mpsc::UnboundedReceiver<OcppFrame>) -> SessionResult<()> {
        info!(
            charge_point_id = self.ctx.identity.id.as_str(),
            vendor = self.ctx.identity.vendor.as_str(),
            connector_id = self.ctx.connector_id(),
            "Session starting"
        );

        let mut reader = tokio::spawn(read_frames(
            self.ctx.clone(),
            self.dispatcher.clone(),
            inbound,
        ));

        let result = tokio::select! {
            joined = &mut reader => match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(SessionError::Transport(format!("frame reader stopped: {}", e))),
            },
            outcome = drive(self.ctx.clone()) => outcome,
            _ = self.shutdown.wait() => {
                info!("Session shutting down");
                Ok(())
            }
        };

        reader.abort();
        self.ctx.correlator.abandon_all();

        match &result {
            Ok(()) => info!("Session ended"),
            Err(e) => warn!(error = %e, "Session ended"),
        }
        result
    }
}

/// Boot, then run both periodic loops.
async fn drive(ctx: SharedContext) -> SessionResult<()> {
    match ctx.boot().await {
        Ok(_) => {}
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => warn!(error = %e, "BootNotification failed, continuing"),
    }
    tokio::try_join!(heartbeat_loop(ctx.clone()), meter_loop(ctx)).map(|_| ())
}

/// Inbound frame loop. Calls are handled one at a time in arrival order;
/// an after-hook is spawned only once its response is queued.
async fn read_frames(
    ctx: SharedContext,
    dispatcher: Arc<ActionDispatcher>,
    mut inbound: mpsc::UnboundedReceiver<OcppFrame>,
) -> SessionResult<()> {
    while let Some(frame) = inbound.recv().await {
        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => {
                let Dispatched { response, after } =
                    dispatcher.dispatch(&unique_id, &action, payload).await;
                ctx.correlator.send_frame(response)?;
                if let Some(hook) = after {
                    tokio::spawn(hook.run());
                }
            }
            OcppFrame::CallResult { unique_id, payload } => {
                ctx.correlator.handle_response(&unique_id, payload)
            }
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => ctx
                .correlator
                .handle_error(&unique_id, &error_code, &error_description),
        }
    }
    Err(SessionError::Transport(
        "connection closed by central system".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::configuration::HEARTBEAT_INTERVAL;
    use crate::support::testing::CentralSystemStub;
    use serde_json::json;
    use tokio::task::JoinHandle;

    fn start_session(
        settings: SessionSettings,
    ) -> (CentralSystemStub, SharedContext, ShutdownSignal, JoinHandle<SessionResult<()>>) {
        let (cs, outbound, inbound) = CentralSystemStub::connect();
        let shutdown = ShutdownSignal::new();
        let session = ChargePointSession::new(settings, outbound)
            .unwrap()
            .with_shutdown(shutdown.clone());
        let ctx = session.context().clone();
        let handle = tokio::spawn(session.run(inbound));
        (cs, ctx, shutdown, handle)
    }

    fn error_code(frame: &OcppFrame) -> &str {
        match frame {
            OcppFrame::CallError { error_code, .. } => error_code.as_str(),
            other => panic!("Expected CallError, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn boot_goes_first_then_periodic_reports() {
        let (cs, _ctx, _shutdown, _handle) = start_session(SessionSettings::default());

        cs.wait_for_calls("Heartbeat", 2).await;
        cs.wait_for_calls("MeterValues", 2).await;

        assert_eq!(cs.actions()[0], "BootNotification");
        let boot = &cs.calls("BootNotification")[0];
        assert_eq!(boot["chargePointVendor"], "Test");
        assert_eq!(boot["chargeBoxSerialNumber"], "1337");
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_boot_interval_becomes_heartbeat_interval() {
        let (cs, outbound, inbound) = CentralSystemStub::connect();
        cs.respond_with(
            "BootNotification",
            json!({"currentTime": "2024-01-01T00:00:00Z", "interval": 300, "status": "Accepted"}),
        );
        let session = ChargePointSession::new(SessionSettings::default(), outbound).unwrap();
        let ctx = session.context().clone();
        let _handle = tokio::spawn(session.run(inbound));

        cs.wait_for_calls("Heartbeat", 1).await;
        assert_eq!(ctx.config.get(HEARTBEAT_INTERVAL).await.unwrap(), "300");
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_boot_keeps_session_alive() {
        let (cs, outbound, inbound) = CentralSystemStub::connect();
        cs.respond_with(
            "BootNotification",
            json!({"currentTime": "2024-01-01T00:00:00Z", "interval": 300, "status": "Rejected"}),
        );
        let session = ChargePointSession::new(SessionSettings::default(), outbound).unwrap();
        let ctx = session.context().clone();
        let handle = tokio::spawn(session.run(inbound));

        cs.wait_for_calls("Heartbeat", 2).await;
        assert!(!handle.is_finished());
        assert_eq!(ctx.config.get(HEARTBEAT_INTERVAL).await.unwrap(), "10");
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_calls_are_answered() {
        let (cs, _ctx, _shutdown, _handle) = start_session(SessionSettings::default());

        let id = cs.send_call("GetConfiguration", json!({"key": ["HeartbeatInterval"]}));
        match cs.reply_to(&id).await {
            OcppFrame::CallResult { payload, .. } => {
                assert_eq!(payload["configurationKey"][0]["value"], "10")
            }
            other => panic!("Expected CallResult, got {:?}", other),
        }

        let id = cs.send_call("Reset", json!({"type": "Soft"}));
        assert_eq!(error_code(&cs.reply_to(&id).await), "NotSupported");

        let id = cs.send_call("RemoteStopTransaction", json!({"transactionId": "x"}));
        assert_eq!(error_code(&cs.reply_to(&id).await), "FormationViolation");
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_response_precedes_triggered_message() {
        let (cs, _ctx, _shutdown, _handle) = start_session(SessionSettings::default());
        cs.wait_for_calls("MeterValues", 1).await;

        let id = cs.send_call("TriggerMessage", json!({"requestedMessage": "MeterValues"}));
        cs.reply_to(&id).await;
        cs.wait_for_calls("MeterValues", 2).await;

        let events = cs.events();
        let reply_at = events.iter().position(|e| *e == format!("reply {}", id)).unwrap();
        let triggered_at = events
            .iter()
            .enumerate()
            .skip(reply_at)
            .find(|(_, e)| e.as_str() == "call MeterValues")
            .map(|(i, _)| i);
        assert!(triggered_at.is_some());

        let triggered = cs
            .calls("MeterValues")
            .into_iter()
            .find(|p| p["meterValue"][0]["sampledValue"][0]["context"] == "Trigger");
        assert!(triggered.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_triggered_message_sends_nothing_back() {
        let (cs, _ctx, _shutdown, handle) = start_session(SessionSettings::default());
        cs.wait_for_calls("Heartbeat", 1).await;
        cs.fail_action("BootNotification");

        let id = cs.send_call(
            "TriggerMessage",
            json!({"requestedMessage": "BootNotification"}),
        );
        match cs.reply_to(&id).await {
            OcppFrame::CallResult { payload, .. } => assert_eq!(payload["status"], "Accepted"),
            other => panic!("Expected CallResult, got {:?}", other),
        }
        cs.wait_for_calls("BootNotification", 2).await;
        cs.wait_for_calls("Heartbeat", 3).await;

        let replies: Vec<_> = cs
            .events()
            .into_iter()
            .filter(|e| e.starts_with("reply "))
            .collect();
        assert_eq!(replies, vec![format!("reply {}", id)]);
        assert!(!handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn remote_start_and_stop_over_the_wire() {
        let (cs, ctx, _shutdown, _handle) = start_session(SessionSettings::default());

        let a = cs.send_call("RemoteStartTransaction", json!({"idTag": "A"}));
        let b = cs.send_call("RemoteStartTransaction", json!({"idTag": "B"}));
        for id in [&a, &b] {
            match cs.reply_to(id).await {
                OcppFrame::CallResult { payload, .. } => assert_eq!(payload["status"], "Accepted"),
                other => panic!("Expected CallResult, got {:?}", other),
            }
        }

        cs.wait_for_calls("StatusNotification", 2).await;
        let _ = ctx.connector.acquire().await;
        assert_eq!(cs.calls("StartTransaction").len(), 1);

        let transaction_id = ctx.transactions.active_transaction_id().await.unwrap();
        let stop = cs.send_call(
            "RemoteStopTransaction",
            json!({"transactionId": transaction_id}),
        );
        cs.reply_to(&stop).await;
        cs.wait_for_calls("StatusNotification", 4).await;

        let statuses: Vec<_> = cs.statuses().into_iter().map(|(s, _)| s).collect();
        assert_eq!(statuses, vec!["Preparing", "Charging", "Finishing", "Available"]);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_connection_is_a_transport_error() {
        let (cs, _ctx, _shutdown, handle) = start_session(SessionSettings::default());
        cs.wait_for_calls("Heartbeat", 1).await;

        drop(cs);
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SessionError::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_ends_session_cleanly() {
        let (cs, _ctx, shutdown, handle) = start_session(SessionSettings::default());
        cs.wait_for_calls("Heartbeat", 1).await;

        shutdown.trigger();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_boot_times_out_and_session_continues() {
        let (cs, outbound, inbound) = CentralSystemStub::connect();
        cs.ignore_action("BootNotification");
        let settings = SessionSettings {
            call_timeout: Duration::from_secs(5),
            ..SessionSettings::default()
        };
        let session = ChargePointSession::new(settings, outbound).unwrap();
        let _handle = tokio::spawn(session.run(inbound));

        cs.wait_for_calls("Heartbeat", 1).await;
        let at = cs.call_instants("Heartbeat")[0] - cs.call_instants("BootNotification")[0];
        assert!(at >= Duration::from_secs(5));
    }
}
