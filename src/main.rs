use clap::Parser;
use color_eyre::Result;
use hcloud_usage_exporter::{
    init_errors,
    init_logging,
    run,
};
use usage_exporter_config::{
    Args,
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    init_logging()?;
    let config = Config::new(Args::parse())?;
    config.validate()?;
    tracing::debug!(?config, "loaded configuration");
    run(config).await
}
