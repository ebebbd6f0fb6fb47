//! Action dispatcher
//!
//! An explicit registration table mapping OCPP action names (from inbound
//! `Call` frames) to handlers plus optional before/after hooks. Built once
//! at session startup.
//!
//! The dispatcher never sends anything itself: [`ActionDispatcher::dispatch`]
//! returns the response frame together with the pending after-hook, and the
//! session runs the hook only once the response is queued.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::domain::{SessionError, SessionResult};
use crate::support::ocpp_frame::{CallErrorCode, OcppFrame};

/// Produces the CallResult payload for one inbound action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, payload: Value) -> SessionResult<Value>;
}

/// Side effect attached to an action, run before the handler or after the
/// response has been sent.
#[async_trait]
pub trait ActionHook: Send + Sync {
    async fn run(&self, payload: Value) -> SessionResult<()>;
}

/// After-hook bound to the request that triggered it.
pub struct PendingHook {
    action: String,
    hook: Arc<dyn ActionHook>,
    payload: Value,
}

impl PendingHook {
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Run the hook. Failures are logged and never reach the peer.
    pub async fn run(self) {
        if let Err(e) = self.hook.run(self.payload).await {
            warn!(
                action = self.action.as_str(),
                error = %e,
                "After-hook failed"
            );
        }
    }
}

/// Outcome of dispatching one inbound `Call`.
pub struct Dispatched {
    pub response: OcppFrame,
    pub after: Option<PendingHook>,
}

#[derive(Default)]
pub struct ActionDispatcher {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
    before_hooks: HashMap<String, Arc<dyn ActionHook>>,
    after_hooks: HashMap<String, Arc<dyn ActionHook>>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        action: &str,
        handler: impl ActionHandler + 'static,
    ) -> SessionResult<()> {
        let handler: Arc<dyn ActionHandler> = Arc::new(handler);
        insert_unique(&mut self.handlers, action, handler)
    }

    pub fn register_before(
        &mut self,
        action: &str,
        hook: impl ActionHook + 'static,
    ) -> SessionResult<()> {
        let hook: Arc<dyn ActionHook> = Arc::new(hook);
        insert_unique(&mut self.before_hooks, action, hook)
    }

    pub fn register_after(
        &mut self,
        action: &str,
        hook: impl ActionHook + 'static,
    ) -> SessionResult<()> {
        let hook: Arc<dyn ActionHook> = Arc::new(hook);
        insert_unique(&mut self.after_hooks, action, hook)
    }

    pub fn is_registered(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    pub async fn dispatch(&self, unique_id: &str, action: &str, payload: Value) -> Dispatched {
        let Some(handler) = self.handlers.get(action) else {
            warn!(action, message_id = unique_id, "No handler registered");
            return Dispatched {
                response: OcppFrame::error(
                    unique_id,
                    CallErrorCode::NotSupported,
                    format!("Action {} is not supported", action),
                ),
                after: None,
            };
        };

        info!(action, message_id = unique_id, "Dispatching call");

        if let Some(hook) = self.before_hooks.get(action) {
            if let Err(e) = hook.run(payload.clone()).await {
                return Dispatched {
                    response: error_frame(unique_id, action, &e),
                    after: None,
                };
            }
        }

        match handler.handle(payload.clone()).await {
            Ok(result) => Dispatched {
                response: OcppFrame::result(unique_id, result),
                after: self.after_hooks.get(action).map(|hook| PendingHook {
                    action: action.to_string(),
                    hook: hook.clone(),
                    payload,
                }),
            },
            Err(e) => Dispatched {
                response: error_frame(unique_id, action, &e),
                after: None,
            },
        }
    }
}

fn insert_unique<T: ?Sized>(
    table: &mut HashMap<String, Arc<T>>,
    action: &str,
    entry: Arc<T>,
) -> SessionResult<()> {
    if table.contains_key(action) {
        return Err(SessionError::DuplicateHandler(action.to_string()));
    }
    table.insert(action.to_string(), entry);
    Ok(())
}

fn error_frame(unique_id: &str, action: &str, e: &SessionError) -> OcppFrame {
    let code = match e {
        SessionError::InvalidPayload { .. } => CallErrorCode::FormationViolation,
        _ => CallErrorCode::InternalError,
    };
    error!(
        action,
        message_id = unique_id,
        error_code = code.as_str(),
        error = %e,
        "Handler failed"
    );
    OcppFrame::error(unique_id, code, e.to_string())
}

/// Deserialize an inbound request payload into its `rust_ocpp` type.
pub fn parse_payload<T: DeserializeOwned>(action: &str, payload: Value) -> SessionResult<T> {
    serde_json::from_value(payload).map_err(|e| SessionError::InvalidPayload {
        action: action.to_string(),
        reason: e.to_string(),
    })
}

/// Serialize a response into a CallResult payload.
pub fn to_payload<T: Serialize>(action: &str, response: &T) -> SessionResult<Value> {
    serde_json::to_value(response).map_err(|e| SessionError::InvalidResponse {
        action: action.to_string(),
        reason: e.to_string(),
    })
}
