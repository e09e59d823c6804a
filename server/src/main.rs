//! Exhibits lifecycle HTTP server.

use exhibits_server::{Application, Config};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,exhibits=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting exhibits lifecycle service");

    let config = Config::from_env();
    info!(
        http = %config.http_addr(),
        metrics = %config.metrics_addr(),
        republish_delay_ms = config.lifecycle.republish_delay_ms,
        "Configuration loaded"
    );

    Application::build(config).await?.run().await?;
    Ok(())
}
