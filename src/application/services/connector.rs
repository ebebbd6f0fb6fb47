//! Connector service
//!
//! Wraps the connector state machine: applies transitions locally, then
//! reports them with a StatusNotification. Also owns the connector's
//! exclusivity token, which serializes transaction start/stop and the
//! charging-profile restoration.

use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::application::actions::send_status_notification;
use crate::application::correlator::SharedCorrelator;
use crate::domain::{Connector, ConnectorStatus, SessionResult, StatusChange};

pub struct ConnectorService {
    correlator: SharedCorrelator,
    connector: Mutex<Connector>,
    token: Mutex<()>,
    connector_id: u32,
}

impl ConnectorService {
    pub fn new(correlator: SharedCorrelator, connector_id: u32) -> Self {
        Self {
            correlator,
            connector: Mutex::new(Connector::new(connector_id)),
            token: Mutex::new(()),
            connector_id,
        }
    }

    pub fn connector_id(&self) -> u32 {
        self.connector_id
    }

    pub async fn status(&self) -> ConnectorStatus {
        self.connector.lock().await.status()
    }

    /// Wait for exclusive use of the connector.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.token.lock().await
    }

    /// Move to `to` and notify the central system.
    ///
    /// The local state changes even if the notification fails; only a
    /// transport failure is returned.
    pub async fn transition(&self, to: ConnectorStatus) -> SessionResult<StatusChange> {
        let change = self.connector.lock().await.transition(to)?;
        self.notify(change).await
    }

    #[cfg(test)]
    pub(crate) async fn fault(
        &self,
        error_code: crate::domain::ConnectorErrorCode,
    ) -> SessionResult<StatusChange> {
        let change = self.connector.lock().await.fault(error_code)?;
        self.notify(change).await
    }

    /// Re-send the current status without changing it.
    pub async fn announce(&self) -> SessionResult<StatusChange> {
        let change = self.connector.lock().await.current();
        self.notify(change).await
    }

    async fn notify(&self, change: StatusChange) -> SessionResult<StatusChange> {
        info!(
            connector_id = change.connector_id,
            from = change.from.as_str(),
            to = change.to.as_str(),
            "Connector status changed"
        );
        match send_status_notification(&self.correlator, &change).await {
            Ok(()) => Ok(change),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(
                    connector_id = change.connector_id,
                    status = change.to.as_str(),
                    error = %e,
                    "StatusNotification not acknowledged"
                );
                Ok(change)
            }
        }
    }
}
