use clap::Parser;
use std::path::PathBuf;

/// Exports per-project costs of the Hetzner Cloud console as Prometheus metrics.
#[derive(Parser, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Console login (e-mail address).
    #[arg(long, env = "HCLOUD_USERNAME")]
    pub username: Option<String>,

    /// Console password.
    #[arg(long, env = "HCLOUD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Base32 secret of the two-factor authenticator, if the account uses one.
    #[arg(long, env = "HCLOUD_TOTP_SECRET", hide_env_values = true)]
    pub totp_secret: Option<String>,

    /// Seconds between two polls of the console.
    #[arg(long, env = "HCLOUD_USAGE_INTERVAL", value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Port of the metrics endpoint.
    #[arg(long, env = "HCLOUD_USAGE_METRICS_PORT", value_name = "PORT")]
    pub metrics_port: Option<u16>,

    /// Directory receiving screenshots of failed logins and fetches.
    #[arg(long, env = "HCLOUD_USAGE_DIAGNOSTICS_DIR", value_name = "DIR")]
    pub diagnostics_dir: Option<PathBuf>,

    /// How many screenshots to keep.
    #[arg(long, env = "HCLOUD_USAGE_DIAGNOSTICS_HISTORY", value_name = "COUNT")]
    pub diagnostics_history: Option<u64>,

    /// Run the browser without a window.
    #[arg(long, env = "HCLOUD_USAGE_HEADLESS", value_name = "BOOL")]
    pub headless: Option<bool>,

    /// Configuration file to use instead of the one in the config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |secret: &Option<String>| secret.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Args")
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("totp_secret", &redacted(&self.totp_secret))
            .field("interval", &self.interval)
            .field("metrics_port", &self.metrics_port)
            .field("diagnostics_dir", &self.diagnostics_dir)
            .field("diagnostics_history", &self.diagnostics_history)
            .field("headless", &self.headless)
            .field("config", &self.config)
            .finish()
    }
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(username) = &self.username {
                cache.insert("username".to_string(), username.clone().into());
            }
            if let Some(password) = &self.password {
                cache.insert("password".to_string(), password.clone().into());
            }
            if let Some(totp_secret) = &self.totp_secret {
                cache.insert("totp_secret".to_string(), totp_secret.clone().into());
            }
            if let Some(interval) = self.interval {
                cache.insert("interval_seconds".to_string(), interval.into());
            }
            if let Some(port) = self.metrics_port {
                cache.insert("metrics_port".to_string(), u64::from(port).into());
            }
            if let Some(dir) = &self.diagnostics_dir {
                cache.insert(
                    "diagnostics.directory".to_string(),
                    dir.to_string_lossy().into_owned().into(),
                );
            }
            if let Some(history) = self.diagnostics_history {
                cache.insert("diagnostics.max_history".to_string(), history.into());
            }
            if let Some(headless) = self.headless {
                cache.insert("browser.headless".to_string(), headless.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();
    let data_dir_path = crate::get_data_dir().display().to_string();

    format!(
        "{}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}",
        clap::crate_version!()
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn debug_output_redacts_secrets() {
        let args = Args {
            username: Some("ops@example.com".to_string()),
            password: Some("hunter2".to_string()),
            totp_secret: Some("GEZDGNBVGY3TQOJQ".to_string()),
            ..Args::default()
        };
        let debug = format!("{args:?}");

        assert!(debug.contains("ops@example.com"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("GEZDGNBVGY3TQOJQ"));
        assert_eq!(debug.matches("[REDACTED]").count(), 2);
    }

    #[test]
    fn debug_output_without_secrets() {
        let debug = format!("{:?}", Args::default());
        assert!(debug.contains("password: None"));
        assert!(!debug.contains("[REDACTED]"));
    }
}
