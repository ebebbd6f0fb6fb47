//! Shared charge point state handed to handlers and periodic tasks

use std::sync::Arc;

use tracing::{info, warn};

use super::actions::{send_boot_notification, send_meter_values, BootOutcome};
use super::correlator::SharedCorrelator;
use super::services::{
    ChargingProfileLimiter, ConfigurationStore, ConnectorService, MeterValueStore,
    TransactionManager,
};
use crate::domain::configuration::HEARTBEAT_INTERVAL;
use crate::domain::{ChargePointIdentity, Measurand, ReadingContext, SessionResult};

pub struct ChargePointContext {
    pub identity: ChargePointIdentity,
    pub correlator: SharedCorrelator,
    pub config: Arc<ConfigurationStore>,
    pub meter: Arc<MeterValueStore>,
    pub connector: Arc<ConnectorService>,
    pub transactions: Arc<TransactionManager>,
    pub limiter: Arc<ChargingProfileLimiter>,
}

impl ChargePointContext {
    /// Wire the stores and services for a single-connector charge point.
    pub fn new(identity: ChargePointIdentity, correlator: SharedCorrelator, connector_id: u32) -> Self {
        let config = Arc::new(ConfigurationStore::new(&identity.vendor));
        let meter = Arc::new(MeterValueStore::new());
        let connector = Arc::new(ConnectorService::new(correlator.clone(), connector_id));
        let transactions = Arc::new(TransactionManager::new(
            correlator.clone(),
            connector.clone(),
            meter.clone(),
        ));
        let limiter = Arc::new(ChargingProfileLimiter::new(connector.clone(), meter.clone()));

        Self {
            identity,
            correlator,
            config,
            meter,
            connector,
            transactions,
            limiter,
        }
    }

    pub fn connector_id(&self) -> u32 {
        self.connector.connector_id()
    }

    /// Send BootNotification. An accepted registration with a positive
    /// interval becomes the new HeartbeatInterval.
    pub async fn boot(&self) -> SessionResult<BootOutcome> {
        let outcome = send_boot_notification(&self.correlator, &self.identity).await?;
        if outcome.accepted && outcome.interval > 0 {
            if let Err(e) = self
                .config
                .set(HEARTBEAT_INTERVAL, &outcome.interval.to_string())
                .await
            {
                warn!(error = %e, "Could not adopt heartbeat interval");
            }
        }
        Ok(outcome)
    }

    /// Send a MeterValues report with the current readings for `measurands`.
    pub async fn report_meter_values(
        &self,
        measurands: &[Measurand],
        context: ReadingContext,
    ) -> SessionResult<()> {
        let snapshot = self.meter.snapshot(measurands, context).await;
        let transaction_id = self.transactions.active_transaction_id().await;
        send_meter_values(&self.correlator, self.connector_id(), transaction_id, &snapshot).await
    }

    /// Log the outcome of a non-essential exchange. Returns the error only
    /// when it ends the session.
    pub fn tolerate(action: &str, result: SessionResult<()>) -> SessionResult<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                info!(action, error = %e, kind = e.kind(), "Exchange failed, continuing");
                Ok(())
            }
        }
    }
}

pub type SharedContext = Arc<ChargePointContext>;
