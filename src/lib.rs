//! # Texnouz OCPP Charge Point Simulator
//!
//! Simulates a single-connector OCPP 1.6 charge point talking to a
//! central system over OCPP-J (JSON over WebSocket).
//!
//! ## Architecture
//!
//! - **domain**: Connector states, meter readings, configuration keys,
//!   transactions, charging limits and errors
//! - **application**: Message correlation, inbound action routing, the
//!   stores and services behind each action, and the session orchestrator
//! - **infrastructure**: WebSocket client transport
//! - **support**: OCPP-J framing, shutdown signal, tracing setup

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod support;

pub use application::{ChargePointSession, SessionSettings};
pub use config::{default_config_path, AppConfig, ConfigError};
pub use domain::{SessionError, SessionResult};
