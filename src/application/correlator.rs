//! Message correlator
//!
//! Sends OCPP `Call` frames to the central system and pairs each one with
//! the `CallResult` / `CallError` carrying the same unique id.
//!
//! ```text
//! caller ──call()──► PendingCall{id} ──Call frame──► outbound channel
//!    ▲                    │
//!    └── oneshot ◄── handle_response / handle_error ◄── frame reader
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{SessionError, SessionResult};
use crate::support::ocpp_frame::OcppFrame;

/// Outbound half of the transport.
pub type FrameSender = mpsc::UnboundedSender<OcppFrame>;

/// Default deadline for a response from the central system.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

struct PendingCall {
    action: String,
    response_sender: oneshot::Sender<SessionResult<Value>>,
}

fn record_call(action: &str, start: Instant, outcome: &SessionResult<Value>) {
    let action = action.to_string();
    metrics::histogram!("ocpp_call_latency_seconds", "action" => action.clone())
        .record(start.elapsed().as_secs_f64());
    metrics::counter!("ocpp_calls_total", "action" => action.clone()).increment(1);
    if let Err(e) = outcome {
        metrics::counter!("ocpp_call_failures_total", "action" => action, "kind" => e.kind())
            .increment(1);
    }
}

pub struct MessageCorrelator {
    outbound: FrameSender,
    pending_calls: DashMap<String, PendingCall>,
    call_timeout: Duration,
}

impl MessageCorrelator {
    pub fn new(outbound: FrameSender, call_timeout: Duration) -> Self {
        Self {
            outbound,
            pending_calls: DashMap::new(),
            call_timeout,
        }
    }

    /// Allocate an id that no outstanding call uses.
    fn generate_message_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.pending_calls.contains_key(&id) {
                return id;
            }
        }
    }

    /// Send `action` and wait for the matching response payload.
    pub async fn call(&self, action: &str, payload: Value) -> SessionResult<Value> {
        let start = Instant::now();
        let outcome = self.exchange(action, payload).await;
        record_call(action, start, &outcome);
        outcome
    }

    async fn exchange(&self, action: &str, payload: Value) -> SessionResult<Value> {
        let message_id = self.generate_message_id();
        let (tx, rx) = oneshot::channel();

        self.pending_calls.insert(
            message_id.clone(),
            PendingCall {
                action: action.to_string(),
                response_sender: tx,
            },
        );

        info!(action, message_id = message_id.as_str(), "Sending call");

        let frame = OcppFrame::call(message_id.clone(), action, payload);
        if self.outbound.send(frame).is_err() {
            self.pending_calls.remove(&message_id);
            return Err(SessionError::Transport(
                "outbound channel closed".to_string(),
            ));
        }

        match timeout(self.call_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                self.pending_calls.remove(&message_id);
                Err(SessionError::Transport(format!(
                    "{} abandoned before a response arrived",
                    action
                )))
            }
            Err(_) => {
                self.pending_calls.remove(&message_id);
                warn!(action, message_id = message_id.as_str(), "Call timed out");
                Err(SessionError::Timeout {
                    action: action.to_string(),
                    timeout_secs: self.call_timeout.as_secs(),
                })
            }
        }
    }

    /// Complete the pending call `message_id` with a CallResult payload.
    pub fn handle_response(&self, message_id: &str, payload: Value) {
        match self.pending_calls.remove(message_id) {
            Some((_, pending)) => {
                info!(
                    action = pending.action.as_str(),
                    message_id, "Received response"
                );
                let _ = pending.response_sender.send(Ok(payload));
            }
            None => warn!(message_id, "Response for unknown or completed call, dropping"),
        }
    }

    /// Complete the pending call `message_id` with a CallError.
    pub fn handle_error(&self, message_id: &str, error_code: &str, error_description: &str) {
        match self.pending_calls.remove(message_id) {
            Some((_, pending)) => {
                warn!(
                    action = pending.action.as_str(),
                    message_id, error_code, error_description, "Received error"
                );
                let _ = pending.response_sender.send(Err(SessionError::Protocol {
                    code: error_code.to_string(),
                    description: error_description.to_string(),
                }));
            }
            None => warn!(
                message_id,
                error_code, "Error for unknown or completed call, dropping"
            ),
        }
    }

    /// Queue a frame that needs no correlation (responses to inbound calls).
    pub fn send_frame(&self, frame: OcppFrame) -> SessionResult<()> {
        self.outbound
            .send(frame)
            .map_err(|_| SessionError::Transport("outbound channel closed".to_string()))
    }

    pub fn pending_count(&self) -> usize {
        self.pending_calls.len()
    }

    /// Fail every outstanding call; used when the connection drops.
    pub fn abandon_all(&self) {
        self.pending_calls.clear();
    }
}

pub type SharedCorrelator = Arc<MessageCorrelator>;
