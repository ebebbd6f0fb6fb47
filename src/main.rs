//! Texnouz OCPP 1.6 charge point simulator
//!
//! ```sh
//! # Connect to ws://localhost:9000/ocpp/CP_1 as vendor "Test"
//! ocpp-cp-simulator localhost 9000 /ocpp/ CP_1
//!
//! # Wall box policy (current-only charging schedules)
//! ocpp-cp-simulator localhost 9000 /ocpp/ CP_1 "Wall Box Chargers"
//!
//! # Everything from a file (~/.config/texnouz-cp-sim/config.toml by default)
//! ocpp-cp-simulator --config sim.toml
//!
//! # Validate config without connecting
//! ocpp-cp-simulator --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use texnouz_cp_sim::application::ChargePointSession;
use texnouz_cp_sim::config::AppConfig;
use texnouz_cp_sim::infrastructure::connect;
use texnouz_cp_sim::support::shutdown::ShutdownSignal;
use texnouz_cp_sim::support::telemetry::init_tracing;

/// Simulated OCPP 1.6 charge point with a single connector.
#[derive(Parser, Debug)]
#[command(name = "ocpp-cp-simulator", version)]
struct Cli {
    /// Central system host.
    cs_host: Option<String>,

    /// Central system port.
    cs_port: Option<u16>,

    /// Path the charge point id is appended to, e.g. `/ocpp/`.
    cs_path: Option<String>,

    /// Charge point id.
    cp_id: Option<String>,

    /// Vendor sent in BootNotification; "Wall Box Chargers" limits
    /// charging schedules to current.
    vendor: Option<String>,

    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "OCPP_CP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit without connecting.
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(ref host) = self.cs_host {
            config.central_system.host = host.clone();
        }
        if let Some(port) = self.cs_port {
            config.central_system.port = port;
        }
        if let Some(ref path) = self.cs_path {
            config.central_system.path = path.clone();
        }
        if let Some(ref id) = self.cp_id {
            config.charge_point.id = id.clone();
        }
        if let Some(ref vendor) = self.vendor {
            config.charge_point.vendor = vendor.clone();
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(texnouz_cp_sim::default_config_path);
    let loaded = AppConfig::load(&config_path);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    cli.apply_to(&mut config);

    init_tracing(&config.logging);
    match loaded {
        Ok(_) => info!("Configuration loaded from {}", config_path.display()),
        Err(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    config.validate()?;

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        println!("Configuration is valid");
        println!("   Config file  : {}", config_path.display());
        println!("   Endpoint     : {}", config.url());
        println!("   Vendor       : {}", config.charge_point.vendor);
        println!("   Connector    : {}", config.session.connector_id);
        println!("   Call timeout : {}s", config.session.call_timeout_secs);
        println!("   Log level    : {}", config.logging.level);
        return Ok(());
    }

    // ── Connect and run the session ────────────────────────────
    let shutdown = ShutdownSignal::new();
    shutdown.listen_for_os_signals();

    let conn = connect(&config.url(), shutdown.clone()).await?;
    let session = ChargePointSession::new(config.session_settings(), conn.outbound)?
        .with_shutdown(shutdown.clone());

    info!("Press Ctrl+C to shutdown gracefully.");
    let result = session.run(conn.inbound).await;

    shutdown.trigger();
    let _ = conn.pumps.await;

    result?;
    Ok(())
}
