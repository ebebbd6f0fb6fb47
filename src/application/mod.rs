//! Application layer - session orchestration, OCPP actions and services

pub mod actions;
pub mod context;
pub mod correlator;
pub mod dispatcher;
pub mod handlers;
pub mod services;
pub mod session;

pub use context::{ChargePointContext, SharedContext};
pub use correlator::{FrameSender, MessageCorrelator, SharedCorrelator, DEFAULT_CALL_TIMEOUT};
pub use dispatcher::{ActionDispatcher, ActionHandler, ActionHook, Dispatched, PendingHook};
pub use session::{ChargePointSession, SessionSettings};
