//! Periodic Task Scheduler
//!
//! Heartbeat and meter-value loops. Each loop sends first and then sleeps
//! for the interval read from the configuration store at that moment, so a
//! ChangeConfiguration takes effect on the next iteration.

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::application::actions::send_heartbeat;
use crate::application::context::{ChargePointContext, SharedContext};
use crate::domain::configuration::{CLOCK_ALIGNED_DATA_INTERVAL, HEARTBEAT_INTERVAL};
use crate::domain::{ReadingContext, SessionResult};

use super::configuration::ConfigurationStore;

/// Lower bound for loop intervals; 0 would spin.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

async fn interval(config: &ConfigurationStore, key: &str) -> Duration {
    let secs = config.get_u64(key).await.unwrap_or(0);
    Duration::from_secs(secs).max(MIN_INTERVAL)
}

/// Runs until the transport fails.
pub async fn heartbeat_loop(ctx: SharedContext) -> SessionResult<()> {
    loop {
        let sent = send_heartbeat(&ctx.correlator).await.map(|_| ());
        ChargePointContext::tolerate("Heartbeat", sent)?;

        let wait = interval(&ctx.config, HEARTBEAT_INTERVAL).await;
        debug!(secs = wait.as_secs(), "Next heartbeat");
        sleep(wait).await;
    }
}

/// Runs until the transport fails.
pub async fn meter_loop(ctx: SharedContext) -> SessionResult<()> {
    loop {
        let measurands = ctx.config.aligned_measurands().await?;
        let sent = ctx
            .report_meter_values(&measurands, ReadingContext::SamplePeriodic)
            .await;
        ChargePointContext::tolerate("MeterValues", sent)?;

        let wait = interval(&ctx.config, CLOCK_ALIGNED_DATA_INTERVAL).await;
        debug!(secs = wait.as_secs(), "Next meter report");
        sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChargePointIdentity, SessionError};
    use crate::support::testing::CentralSystemStub;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn context(cs: &CentralSystemStub) -> SharedContext {
        Arc::new(ChargePointContext::new(
            ChargePointIdentity::default(),
            cs.correlator(),
            1,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn meter_interval_change_applies_on_next_iteration() {
        let cs = CentralSystemStub::start();
        let ctx = context(&cs);
        let task = tokio::spawn(meter_loop(ctx.clone()));

        cs.wait_for_calls("MeterValues", 1).await;
        sleep(Duration::from_secs(1)).await;
        ctx.config
            .set(CLOCK_ALIGNED_DATA_INTERVAL, "1")
            .await
            .unwrap();

        // The sleep in progress still uses the old interval.
        cs.wait_for_calls("MeterValues", 3).await;
        let at = cs.call_instants("MeterValues");
        let close_to = |gap: Duration, secs: u64| {
            gap >= Duration::from_secs(secs) && gap < Duration::from_secs(secs) + Duration::from_millis(50)
        };
        assert!(close_to(at[1] - at[0], 5));
        assert!(close_to(at[2] - at[1], 1));
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_clamped() {
        let cs = CentralSystemStub::start();
        let ctx = context(&cs);
        ctx.config.set(HEARTBEAT_INTERVAL, "0").await.unwrap();
        let task = tokio::spawn(heartbeat_loop(ctx.clone()));

        let start = Instant::now();
        cs.wait_for_calls("Heartbeat", 4).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn call_errors_do_not_stop_the_loop() {
        let cs = CentralSystemStub::start();
        cs.fail_action("Heartbeat");
        let ctx = context(&cs);
        let task = tokio::spawn(heartbeat_loop(ctx));

        cs.wait_for_calls("Heartbeat", 3).await;
        assert!(!task.is_finished());
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn meter_report_carries_active_transaction() {
        let cs = CentralSystemStub::start();
        let ctx = context(&cs);
        let id = ctx.transactions.start(1, "TAG-1").await.unwrap();
        let task = tokio::spawn(meter_loop(ctx.clone()));

        cs.wait_for_calls("MeterValues", 1).await;
        let report = &cs.calls("MeterValues")[0];
        assert_eq!(report["transactionId"], id.unwrap());
        assert_eq!(report["connectorId"], 1);
        let samples = report["meterValue"][0]["sampledValue"].as_array().unwrap();
        assert_eq!(samples.len(), 9);
        assert!(samples
            .iter()
            .any(|s| s["measurand"] == "Power.Active.Import" && s["value"] == "7400"));
        task.abort();
    }

    #[tokio::test]
    async fn transport_failure_ends_the_loop() {
        let cs = CentralSystemStub::start();
        let ctx = context(&cs);
        cs.disconnect().await;

        let err = heartbeat_loop(ctx).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }
}
