//! Domain layer - charge point entities, value types and errors

pub mod charge_point;
pub mod charging_profile;
pub mod configuration;
pub mod connector;
pub mod error;
pub mod meter;
pub mod transaction;

pub use charge_point::ChargePointIdentity;
pub use charging_profile::{LimitOutcome, PowerCap, PowerLimitRequest, RateUnit};
pub use configuration::ConfigurationEntry;
pub use connector::{Connector, ConnectorErrorCode, ConnectorStatus, StatusChange};
pub use error::{SessionError, SessionResult};
pub use meter::{
    Measurand, MeterProfile, MeterSample, MeterSnapshot, Phase, ReadingContext, UnitOfMeasure,
};
pub use transaction::Transaction;
