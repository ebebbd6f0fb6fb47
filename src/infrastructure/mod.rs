//! Infrastructure layer - transport to the central system

pub mod websocket;

pub use websocket::{connect, WsConnection, OCPP_SUBPROTOCOL};
