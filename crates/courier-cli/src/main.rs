mod http;
mod observability;
mod wiring;

use std::path::PathBuf;

use courier_core::app::RetentionSweeper;
use courier_core::config::CourierConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("COURIER_CONFIG").ok())
        .map(PathBuf::from);
    let config = CourierConfig::load(config_path.as_deref())?;

    observability::init(config.log_format);

    let services = wiring::build(&config)?;
    let sweeper = RetentionSweeper::spawn(services.store.clone(), config.status.sweep_interval());

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %listener.local_addr()?, "courier listening");

    axum::serve(listener, http::router(services.state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let cancelled = services
        .orchestrator
        .shutdown(config.orchestrator.shutdown_grace())
        .await;
    if cancelled > 0 {
        warn!(cancelled, "task sets cancelled at shutdown");
    }
    sweeper.stop().await;

    info!("courier stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
