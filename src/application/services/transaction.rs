//! Transaction Manager
//!
//! Drives the start/stop exchange for the connector. Each operation holds
//! the connector's exclusivity token for its whole duration, so a second
//! RemoteStart queues behind the first and then finds the connector busy.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::connector::ConnectorService;
use super::meter_store::MeterValueStore;
use crate::application::actions::{send_start_transaction, send_stop_transaction};
use crate::application::correlator::SharedCorrelator;
use crate::domain::{
    ConnectorStatus, MeterProfile, SessionError, SessionResult, Transaction,
};

pub struct TransactionManager {
    correlator: SharedCorrelator,
    connector: Arc<ConnectorService>,
    meter: Arc<MeterValueStore>,
    active: Mutex<Option<Transaction>>,
}

impl TransactionManager {
    pub fn new(
        correlator: SharedCorrelator,
        connector: Arc<ConnectorService>,
        meter: Arc<MeterValueStore>,
    ) -> Self {
        Self {
            correlator,
            connector,
            meter,
            active: Mutex::new(None),
        }
    }

    pub async fn active(&self) -> Option<Transaction> {
        self.active.lock().await.clone()
    }

    pub async fn active_transaction_id(&self) -> Option<i32> {
        self.active.lock().await.as_ref().map(|tx| tx.transaction_id)
    }

    /// Start a transaction for `id_tag`.
    ///
    /// Returns `Ok(None)` when the central system refuses or does not
    /// answer; the connector is back to Available in that case.
    pub async fn start(&self, connector_id: u32, id_tag: &str) -> SessionResult<Option<i32>> {
        self.check_connector(connector_id)?;
        let _token = self.connector.acquire().await;

        if self.active.lock().await.is_some() {
            warn!(connector_id, id_tag, "Connector busy, start refused");
            return Err(SessionError::ConnectorBusy(connector_id));
        }

        self.connector.transition(ConnectorStatus::Preparing).await?;

        let meter_start = register_wh(self.meter.energy_register_wh().await);
        let outcome =
            send_start_transaction(&self.correlator, connector_id, id_tag, meter_start).await;

        match outcome {
            Ok(outcome) if outcome.accepted => {
                self.meter.apply_profile(MeterProfile::Charging).await;
                self.connector.transition(ConnectorStatus::Charging).await?;
                *self.active.lock().await = Some(Transaction::new(
                    outcome.transaction_id,
                    connector_id,
                    id_tag,
                    meter_start,
                ));
                info!(
                    connector_id,
                    transaction_id = outcome.transaction_id,
                    id_tag,
                    meter_start,
                    "Started charging"
                );
                Ok(Some(outcome.transaction_id))
            }
            Ok(outcome) => {
                warn!(
                    connector_id,
                    id_tag,
                    status = outcome.status.as_str(),
                    "StartTransaction not accepted"
                );
                self.connector.transition(ConnectorStatus::Available).await?;
                Ok(None)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(connector_id, id_tag, error = %e, "StartTransaction failed");
                self.connector.transition(ConnectorStatus::Available).await?;
                Ok(None)
            }
        }
    }

    /// Stop the active transaction. The connector ends up Available and
    /// the meter idle whatever the central system answers.
    pub async fn stop(&self, transaction_id: i32) -> SessionResult<()> {
        let _token = self.connector.acquire().await;

        let transaction = match self.active.lock().await.as_ref() {
            Some(tx) if tx.transaction_id == transaction_id => tx.clone(),
            _ => return Err(SessionError::UnknownTransaction(transaction_id)),
        };

        let meter_stop = register_wh(self.meter.energy_register_wh().await);
        match send_stop_transaction(&self.correlator, transaction_id, &transaction.id_tag, meter_stop)
            .await
        {
            Ok(true) => info!(
                transaction_id,
                energy_wh = transaction.energy_delivered(meter_stop),
                "Charging stopped"
            ),
            Ok(false) => warn!(transaction_id, "StopTransaction not accepted"),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!(transaction_id, error = %e, "StopTransaction failed"),
        }

        self.connector.transition(ConnectorStatus::Finishing).await?;
        self.meter.apply_profile(MeterProfile::Idle).await;
        *self.active.lock().await = None;
        self.connector.transition(ConnectorStatus::Available).await?;
        Ok(())
    }

    /// Run [`start`](Self::start) in the background.
    pub fn spawn_start(self: &Arc<Self>, connector_id: u32, id_tag: String) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            match this.start(connector_id, &id_tag).await {
                Ok(Some(transaction_id)) => {
                    info!(connector_id, transaction_id, "Remote start completed")
                }
                Ok(None) => info!(connector_id, "Remote start did not begin a transaction"),
                Err(e) => error!(connector_id, error = %e, "Remote start failed"),
            }
        })
    }

    /// Run [`stop`](Self::stop) in the background.
    pub fn spawn_stop(self: &Arc<Self>, transaction_id: i32) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.stop(transaction_id).await {
                error!(transaction_id, error = %e, "Remote stop failed");
            }
        })
    }

    fn check_connector(&self, connector_id: u32) -> SessionResult<()> {
        if connector_id == self.connector.connector_id() {
            Ok(())
        } else {
            Err(SessionError::UnknownConnector(connector_id))
        }
    }
}

/// Whole Wh of the energy register.
fn register_wh(value: Decimal) -> i32 {
    value.trunc().to_i32().unwrap_or_default()
}
