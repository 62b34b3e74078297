use serde::Deserialize;
use std::{
    path::PathBuf,
    time::Duration,
};
use url::Url;

#[derive(Clone, Debug, Deserialize)]
pub struct BrowserConfig {
    /// Root of the cloud console, the usage page is resolved against it.
    pub console_url: Url,
    #[serde(default = "headless_by_default")]
    pub headless: bool,
    /// Browser profile, kept between runs so console cookies survive.
    pub user_data_dir: PathBuf,
    /// Chromium binary. Looked up on `PATH` when unset.
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
    pub element_timeout_seconds: u64,
    /// The usage page first renders a placeholder table that is replaced shortly after.
    pub settle_seconds: u64,
}

fn headless_by_default() -> bool {
    true
}

impl BrowserConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_seconds)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_seconds)
    }
}
