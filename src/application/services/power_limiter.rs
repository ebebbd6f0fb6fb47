//! Charging Profile Limiter
//!
//! Caps Power.Active.Import for the duration of a charging profile and
//! puts the prior value back afterwards. There is a single restoration
//! slot: a new profile cancels the pending restoration of the previous one
//! and keeps the value recorded before the first cap.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::connector::ConnectorService;
use super::meter_store::MeterValueStore;
use crate::domain::meter::format_decimal;
use crate::domain::{LimitOutcome, PowerLimitRequest, SessionResult};

#[derive(Default)]
struct LimiterState {
    /// Active import before the current cap.
    baseline: Option<Decimal>,
    pending: Option<JoinHandle<()>>,
}

pub struct ChargingProfileLimiter {
    connector: Arc<ConnectorService>,
    meter: Arc<MeterValueStore>,
    state: Arc<Mutex<LimiterState>>,
}

impl ChargingProfileLimiter {
    pub fn new(connector: Arc<ConnectorService>, meter: Arc<MeterValueStore>) -> Self {
        Self {
            connector,
            meter,
            state: Arc::new(Mutex::new(LimiterState::default())),
        }
    }

    /// Cap the active import at `request`. Connector 0 addresses the whole
    /// charge point.
    pub async fn apply(
        &self,
        connector_id: u32,
        request: PowerLimitRequest,
    ) -> SessionResult<LimitOutcome> {
        if connector_id != 0 && connector_id != self.connector.connector_id() {
            info!(connector_id, "Charging profile for unknown connector rejected");
            return Ok(LimitOutcome::Rejected);
        }

        let mut state = self.state.lock().await;
        let Some(cap) = self
            .meter
            .cap_power_active_import(|voltage| request.watts(voltage))
            .await
        else {
            info!(
                unit = ?request.unit,
                limit = %request.limit,
                "Charging profile rejected, no power flowing or limit unusable"
            );
            return Ok(LimitOutcome::Rejected);
        };

        if let Some(previous) = state.pending.take() {
            debug!("Superseding pending power restoration");
            previous.abort();
        }
        let baseline = *state.baseline.get_or_insert(cap.previous);

        info!(
            unit = ?request.unit,
            applied = %format_decimal(cap.applied),
            baseline = %format_decimal(baseline),
            duration_secs = request.duration.map(|d| d.as_secs()),
            "Power limit applied"
        );

        if let Some(duration) = request.duration {
            state.pending = Some(self.schedule_restoration(duration));
        }
        Ok(LimitOutcome::Accepted)
    }

    fn schedule_restoration(&self, after: std::time::Duration) -> JoinHandle<()> {
        let connector = self.connector.clone();
        let meter = self.meter.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _token = connector.acquire().await;
            let mut state = state.lock().await;
            state.pending = None;
            if let Some(baseline) = state.baseline.take() {
                restore(&meter, baseline).await;
            }
        })
    }

    /// Drop the current cap. Always accepted.
    pub async fn clear(&self) -> LimitOutcome {
        let mut state = self.state.lock().await;
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        if let Some(baseline) = state.baseline.take() {
            restore(&self.meter, baseline).await;
        }
        LimitOutcome::Accepted
    }
}

async fn restore(meter: &MeterValueStore, baseline: Decimal) {
    if meter.restore_power_active_import_if_active(baseline).await {
        info!(value = %format_decimal(baseline), "Power limit lifted");
    } else {
        debug!("Meter idle, power limit not restored");
    }
}
