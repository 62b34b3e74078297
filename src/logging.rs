use color_eyre::Result;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

/// Used when `RUST_LOG` is not set. The CDP handler is chatty about events it
/// cannot deserialize.
const DEFAULT_FILTER: &str = "info,chromiumoxide=warn";

pub fn init_errors() -> Result<()> {
    color_eyre::install()
}

pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;
    Ok(())
}
