#[macro_use]
extern crate tracing;

use chromiumoxide::{
    browser,
    Browser,
    Element,
    Handler,
    Page,
};
use eyre::{
    Context as _,
    Result,
};
use std::{
    path::PathBuf,
    time::Duration,
};
use usage_exporter_config::BrowserConfig;

mod console;
mod error;
mod selectors;
mod usage;

pub use console::ConsoleClient;
pub use error::ConsoleError;
pub use usage::{
    parse_cost,
    parse_usage_row,
};

fn get_binary() -> Result<PathBuf> {
    // Chromium / Chrome can have different binary names
    let chrome = ["chromium", "chromium-browser", "google-chrome", "google-chrome-stable", "chrome"]
        .iter()
        .find_map(|name| {
            which::which(name).ok().map(|path| {
                debug!(?path, "found {} at", name);
                path
            })
        })
        .ok_or_else(|| eyre::eyre!("failed to find chromium or google-chrome binary"))?;
    Ok(chrome)
}

/// Launch a browser that keeps its profile (and with it the console cookies)
/// in the configured user data directory.
async fn create_browser(browser_config: &BrowserConfig) -> Result<(Browser, Handler)> {
    let binary = match &browser_config.chrome_executable {
        Some(binary) => binary.clone(),
        None => get_binary()?,
    };
    debug!(?binary, "using browser binary");

    std::fs::create_dir_all(&browser_config.user_data_dir)
        .wrap_err_with(|| format!("failed to create {:?}", browser_config.user_data_dir))?;

    let chrome_args = [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-gpu",
    ];

    let mut config = browser::BrowserConfig::builder();

    if !browser_config.headless {
        config = config.with_head();
    }

    let config = config
        .window_size(1920, 1080)
        .user_data_dir(&browser_config.user_data_dir)
        .chrome_executable(binary)
        .args(chrome_args)
        .build()
        .map_err(|e| eyre::eyre!(e))
        .context("failed to build browser config")?;

    browser::Browser::launch(config)
        .await
        .context("failed to launch browser")
}

/// Pages render their forms after the navigation finished, so poll for the
/// element until it shows up or the timeout passes.
async fn wait_for_element(page: &Page, selector: &str, timeout: Duration) -> Result<Element> {
    let now = std::time::Instant::now();

    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }

        // Sleep for a short duration to avoid busy waiting
        tokio::time::sleep(Duration::from_millis(100)).await;

        if now.elapsed() > timeout {
            return Err(ConsoleError::ElementNotFound(selector.to_string()).into());
        }
    }
}
