//! Murmur node entry point.
//!
//! Wires the feeds subsystems, runs the startup workflow and then
//! idles; blocks and gRPC traffic arrive through the external
//! collaborators.

use anyhow::Context;
use murmur_telemetry::TelemetryConfig;
use node_runtime::{FeedsNode, RuntimeConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _guard = murmur_telemetry::init_telemetry(&telemetry).context("telemetry init failed")?;

    let config = RuntimeConfig::from_env();
    let node = FeedsNode::build(config);

    let outcome = node
        .initializer
        .ensure_personal_feed()
        .await
        .context("feeds initialization failed")?;
    info!(?outcome, "feeds initialized");

    info!("node running; ctrl-c to stop");
    tokio::signal::ctrl_c().await.context("signal wait failed")?;
    info!("shutting down");
    Ok(())
}
