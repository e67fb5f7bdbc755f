use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use headway_control::config::Config;
use headway_control::driver::{ControlLoop, DecisionSink};
use headway_control::models::HoldingDecision;
use headway_control::providers::ReplayProvider;

/// Logs every completed decision as the would-be actuation payload.
struct LogSink;

impl DecisionSink for LogSink {
    fn dispatch_holding(&self, decision: &HoldingDecision) {
        match serde_json::to_string(decision) {
            Ok(payload) => tracing::info!(
                cycle = decision.cycle,
                degraded = decision.degraded,
                %payload,
                "Holding decision"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to serialize holding decision"),
        }
    }

    fn dispatch_fleet_size(&self, buses: u32) {
        tracing::info!(buses, "Fleet size decision");
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config.yaml".to_string());
    let snapshot_path = args.next().unwrap_or_else(|| "snapshots.jsonl".to_string());

    let config = Config::load(&config_path).expect("Failed to load config");
    tracing::info!(path = %config_path, "Loaded configuration");

    let provider = Arc::new(
        ReplayProvider::from_file(&snapshot_path).expect("Failed to load snapshot recording"),
    );
    tracing::info!(path = %snapshot_path, cycles = provider.len(), "Loaded snapshot recording");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    Arc::new(ControlLoop::new(config, provider, Arc::new(LogSink)))
        .run(shutdown_rx)
        .await;
}
