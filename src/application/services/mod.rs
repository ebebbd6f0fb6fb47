//! Application services

pub mod configuration;
pub mod connector;
pub mod meter_store;
pub mod power_limiter;
pub mod scheduler;
pub mod transaction;

pub use configuration::ConfigurationStore;
pub use connector::ConnectorService;
pub use meter_store::MeterValueStore;
pub use power_limiter::ChargingProfileLimiter;
pub use scheduler::{heartbeat_loop, meter_loop};
pub use transaction::TransactionManager;
