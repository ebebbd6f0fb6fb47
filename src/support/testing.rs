//! Fake central system for tests.
//!
//! Answers every `Call` from the charge point with a canned CallResult
//! (overridable per action), records what it received, and can push
//! requests of its own toward the charge point.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::application::correlator::{
    FrameSender, MessageCorrelator, SharedCorrelator, DEFAULT_CALL_TIMEOUT,
};
use crate::support::ocpp_frame::{CallErrorCode, OcppFrame};

const WAIT_LIMIT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub action: String,
    pub payload: Value,
    pub at: Instant,
}

#[derive(Default)]
struct StubState {
    calls: Vec<RecordedCall>,
    replies: Vec<OcppFrame>,
    /// Arrival order across calls and replies.
    events: Vec<String>,
    overrides: HashMap<String, Value>,
    failing: HashSet<String>,
    silent: HashSet<String>,
    next_transaction_id: i32,
}

impl StubState {
    fn answer(&mut self, unique_id: &str, action: &str) -> Option<OcppFrame> {
        if self.silent.contains(action) {
            return None;
        }
        if self.failing.contains(action) {
            return Some(OcppFrame::error(
                unique_id,
                CallErrorCode::InternalError,
                "rejected by test central system",
            ));
        }
        let payload = match self.overrides.get(action) {
            Some(payload) => payload.clone(),
            None => self.default_payload(action),
        };
        Some(OcppFrame::result(unique_id, payload))
    }

    fn default_payload(&mut self, action: &str) -> Value {
        match action {
            "BootNotification" => json!({
                "currentTime": Utc::now(),
                "interval": 10,
                "status": "Accepted",
            }),
            "Heartbeat" => json!({ "currentTime": Utc::now() }),
            "StartTransaction" => {
                self.next_transaction_id += 1;
                json!({
                    "transactionId": self.next_transaction_id,
                    "idTagInfo": { "status": "Accepted" },
                })
            }
            "StopTransaction" => json!({ "idTagInfo": { "status": "Accepted" } }),
            _ => json!({}),
        }
    }
}

pub struct CentralSystemStub {
    state: Arc<Mutex<StubState>>,
    calls_seen: Arc<watch::Sender<usize>>,
    to_charge_point: mpsc::UnboundedSender<OcppFrame>,
    correlator: Option<SharedCorrelator>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    next_request_id: Mutex<u64>,
}

impl CentralSystemStub {
    /// Stub paired with its own correlator, for testing services directly.
    pub fn start() -> Self {
        Self::start_with_timeout(DEFAULT_CALL_TIMEOUT)
    }

    pub fn start_with_timeout(call_timeout: Duration) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        let correlator = Arc::new(MessageCorrelator::new(outbound, call_timeout));

        let mut stub = Self::spawn(outbound_rx, inbound_tx);
        let router = {
            let correlator = correlator.clone();
            tokio::spawn(async move {
                while let Some(frame) = inbound_rx.recv().await {
                    match frame {
                        OcppFrame::CallResult { unique_id, payload } => {
                            correlator.handle_response(&unique_id, payload)
                        }
                        OcppFrame::CallError {
                            unique_id,
                            error_code,
                            error_description,
                            ..
                        } => correlator.handle_error(&unique_id, &error_code, &error_description),
                        OcppFrame::Call { .. } => {}
                    }
                }
            })
        };
        stub.tasks.get_mut().unwrap().push(router);
        stub.correlator = Some(correlator);
        stub
    }

    /// Stub for a full session: returns the sender the session writes to
    /// and the receiver it reads from.
    pub fn connect() -> (Self, FrameSender, mpsc::UnboundedReceiver<OcppFrame>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        (Self::spawn(outbound_rx, inbound_tx), outbound, inbound_rx)
    }

    fn spawn(
        mut from_charge_point: mpsc::UnboundedReceiver<OcppFrame>,
        to_charge_point: mpsc::UnboundedSender<OcppFrame>,
    ) -> Self {
        let state = Arc::new(Mutex::new(StubState::default()));
        let calls_seen = Arc::new(watch::channel(0usize).0);

        let task = {
            let state = state.clone();
            let calls_seen = calls_seen.clone();
            let to_charge_point = to_charge_point.clone();
            tokio::spawn(async move {
                while let Some(frame) = from_charge_point.recv().await {
                    let reply = {
                        let mut state = state.lock().unwrap();
                        match frame {
                            OcppFrame::Call {
                                unique_id,
                                action,
                                payload,
                            } => {
                                let reply = state.answer(&unique_id, &action);
                                state.events.push(format!("call {}", action));
                                state.calls.push(RecordedCall {
                                    action,
                                    payload,
                                    at: Instant::now(),
                                });
                                reply
                            }
                            other => {
                                state.events.push(format!("reply {}", other.unique_id()));
                                state.replies.push(other);
                                None
                            }
                        }
                    };
                    calls_seen.send_modify(|n| *n += 1);
                    if let Some(reply) = reply {
                        let _ = to_charge_point.send(reply);
                    }
                }
            })
        };

        Self {
            state,
            calls_seen,
            to_charge_point,
            correlator: None,
            tasks: Mutex::new(vec![task]),
            next_request_id: Mutex::new(0),
        }
    }

    pub fn correlator(&self) -> SharedCorrelator {
        self.correlator
            .clone()
            .expect("stub was created with connect(); no standalone correlator")
    }

    pub fn respond_with(&self, action: &str, payload: Value) {
        let mut state = self.state.lock().unwrap();
        state.failing.remove(action);
        state.overrides.insert(action.to_string(), payload);
    }

    /// Answer `action` with a CallError from now on.
    pub fn fail_action(&self, action: &str) {
        self.state.lock().unwrap().failing.insert(action.to_string());
    }

    /// Never answer `action`.
    pub fn ignore_action(&self, action: &str) {
        self.state.lock().unwrap().silent.insert(action.to_string());
    }

    /// Drop the connection: further sends from the charge point fail.
    pub async fn disconnect(&self) {
        let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
        for task in tasks {
            task.abort();
            let _ = task.await;
        }
    }

    /// Send a request to the charge point; returns its unique id.
    pub fn send_call(&self, action: &str, payload: Value) -> String {
        let id = {
            let mut next = self.next_request_id.lock().unwrap();
            *next += 1;
            format!("cs-{}", next)
        };
        self.to_charge_point
            .send(OcppFrame::call(id.clone(), action, payload))
            .expect("charge point is gone");
        id
    }

    /// Wait until the charge point has answered request `unique_id`.
    pub async fn reply_to(&self, unique_id: &str) -> OcppFrame {
        let mut seen = self.calls_seen.subscribe();
        let found = tokio::time::timeout(
            WAIT_LIMIT,
            seen.wait_for(|_| self.find_reply(unique_id).is_some()),
        )
        .await
        .is_ok();
        assert!(found, "no reply to {}", unique_id);
        self.find_reply(unique_id).unwrap()
    }

    fn find_reply(&self, unique_id: &str) -> Option<OcppFrame> {
        self.state
            .lock()
            .unwrap()
            .replies
            .iter()
            .find(|f| f.unique_id() == unique_id)
            .cloned()
    }

    /// Wait until at least `n` calls of `action` have arrived.
    pub async fn wait_for_calls(&self, action: &str, n: usize) {
        let mut seen = self.calls_seen.subscribe();
        let reached = tokio::time::timeout(
            WAIT_LIMIT,
            seen.wait_for(|_| self.calls(action).len() >= n),
        )
        .await
        .is_ok();
        assert!(reached, "expected {} {} calls", n, action);
    }

    /// `"call <Action>"` / `"reply <uniqueId>"` in arrival order.
    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn actions(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.calls.iter().map(|c| c.action.clone()).collect()
    }

    /// Payloads of every `action` call, in arrival order.
    pub fn calls(&self, action: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter(|c| c.action == action)
            .map(|c| c.payload.clone())
            .collect()
    }

    pub fn call_instants(&self, action: &str) -> Vec<Instant> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter(|c| c.action == action)
            .map(|c| c.at)
            .collect()
    }

    /// `(status, errorCode)` of every StatusNotification.
    pub fn statuses(&self) -> Vec<(String, String)> {
        self.calls("StatusNotification")
            .into_iter()
            .map(|p| {
                (
                    p["status"].as_str().unwrap_or_default().to_string(),
                    p["errorCode"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

impl Drop for CentralSystemStub {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.get_mut() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}
