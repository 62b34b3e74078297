#[macro_use]
extern crate tracing;

mod error;
mod logging;
pub mod server;

use eyre::{
    Context as _,
    Result,
};
pub use logging::{
    init_errors,
    init_logging,
};
use usage_exporter_browser::ConsoleClient;
use usage_exporter_config::Config;
use usage_exporter_core::{
    Credentials,
    Exporter,
    ExporterMetrics,
    PageSnapshotter,
    TotpProvider,
};

/// Wire everything up and poll the console until the process is asked to stop.
pub async fn run(config: Config) -> Result<()> {
    let (username, password) = config.login()?;
    let credentials = Credentials::new(username, password.clone());

    let one_time_codes = TotpProvider::new(config.totp_secret()).context("invalid TOTP secret")?;
    if one_time_codes.is_configured() {
        info!("two-factor authentication is configured");
    }

    let metrics = ExporterMetrics::new()?;
    let server = server::spawn_server(config.metrics_listen_address(), metrics.clone()).await?;

    let snapshotter = PageSnapshotter::new(&config.diagnostics.directory, config.diagnostics.max_history);
    info!(directory = ?snapshotter.directory(), "diagnostic snapshots");

    let exporter = Exporter::new(
        ConsoleClient::new(config.browser.clone()),
        credentials,
        one_time_codes,
        metrics,
        snapshotter,
        config.interval(),
    );

    tokio::select! {
        never = exporter.run() => match never {},
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for the shutdown signal")?;
            info!("shutting down");
        }
    }

    server.abort();
    Ok(())
}
