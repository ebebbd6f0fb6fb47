//! Connector state machine
//!
//! ```text
//!  Unavailable ⇄ Available ──► Preparing ──► Charging ──► Finishing ──► Available
//!                    ▲             │  │           │
//!                    │             │  └─► Faulted ◄┘
//!                    └─────────────┴───────┘ (rejection / recovery)
//! ```

use std::fmt;

use super::error::{SessionError, SessionResult};

/// Status of a single connector, as reported in StatusNotification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorStatus {
    Available,
    Preparing,
    Charging,
    Finishing,
    Faulted,
    Unavailable,
}

impl ConnectorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Preparing => "Preparing",
            Self::Charging => "Charging",
            Self::Finishing => "Finishing",
            Self::Faulted => "Faulted",
            Self::Unavailable => "Unavailable",
        }
    }

    pub fn can_transition_to(self, next: ConnectorStatus) -> bool {
        use ConnectorStatus::*;
        matches!(
            (self, next),
            (Available, Preparing)
                | (Available, Unavailable)
                | (Unavailable, Available)
                | (Preparing, Charging)
                | (Preparing, Available)
                | (Preparing, Faulted)
                | (Charging, Finishing)
                | (Charging, Faulted)
                | (Finishing, Available)
                | (Faulted, Available)
        )
    }
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ChargePointErrorCode carried by StatusNotification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorErrorCode {
    NoError,
    EvCommunicationError,
    GroundFailure,
    HighTemperature,
    InternalError,
    OtherError,
    PowerMeterFailure,
}

impl ConnectorErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoError => "NoError",
            Self::EvCommunicationError => "EVCommunicationError",
            Self::GroundFailure => "GroundFailure",
            Self::HighTemperature => "HighTemperature",
            Self::InternalError => "InternalError",
            Self::OtherError => "OtherError",
            Self::PowerMeterFailure => "PowerMeterFailure",
        }
    }
}

/// An accepted transition, to be announced with a StatusNotification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub connector_id: u32,
    pub from: ConnectorStatus,
    pub to: ConnectorStatus,
    pub error_code: ConnectorErrorCode,
}

#[derive(Debug, Clone)]
pub struct Connector {
    id: u32,
    status: ConnectorStatus,
}

impl Connector {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            status: ConnectorStatus::Available,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn status(&self) -> ConnectorStatus {
        self.status
    }

    /// Move to `to` through a regular (non-error) transition.
    pub fn transition(&mut self, to: ConnectorStatus) -> SessionResult<StatusChange> {
        if to == ConnectorStatus::Faulted {
            return self.fault(ConnectorErrorCode::OtherError);
        }
        self.apply(to, ConnectorErrorCode::NoError)
    }

    /// Error transition into `Faulted`.
    pub fn fault(&mut self, error_code: ConnectorErrorCode) -> SessionResult<StatusChange> {
        let error_code = match error_code {
            ConnectorErrorCode::NoError => ConnectorErrorCode::OtherError,
            code => code,
        };
        self.apply(ConnectorStatus::Faulted, error_code)
    }

    fn apply(
        &mut self,
        to: ConnectorStatus,
        error_code: ConnectorErrorCode,
    ) -> SessionResult<StatusChange> {
        if !self.status.can_transition_to(to) {
            return Err(SessionError::InvalidTransition {
                connector_id: self.id,
                from: self.status,
                to,
            });
        }
        let change = StatusChange {
            connector_id: self.id,
            from: self.status,
            to,
            error_code,
        };
        self.status = to;
        Ok(change)
    }

    /// The current status as a no-op change, used to re-announce it.
    pub fn current(&self) -> StatusChange {
        StatusChange {
            connector_id: self.id,
            from: self.status,
            to: self.status,
            error_code: ConnectorErrorCode::NoError,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
