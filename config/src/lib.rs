#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod browser_config;

pub use app_config::{
    get_config_dir,
    get_data_dir,
};
pub use args::Args;
pub use browser_config::BrowserConfig;
use eyre::{
    bail,
    OptionExt as _,
    Result,
};
use secrecy::{
    ExposeSecret as _,
    SecretString,
};
use serde::Deserialize;
use std::{
    net::SocketAddr,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub totp_secret: Option<SecretString>,
    pub interval_seconds: u64,
    pub metrics_listen_address: SocketAddr,
    /// Overrides the port of `metrics_listen_address`.
    #[serde(default)]
    pub metrics_port: Option<u16>,
    pub diagnostics: DiagnosticsConfig,
    pub browser: BrowserConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DiagnosticsConfig {
    pub directory: PathBuf,
    pub max_history: usize,
}

impl Config {
    /// Layers, lowest precedence first: built-in defaults, the config file,
    /// command-line arguments and their environment variables.
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        let config_file = args
            .config
            .clone()
            .unwrap_or_else(|| get_config_dir().join("config.yaml"));
        Self::with_config_file(args, &config_file, get_data_dir())
    }

    fn with_config_file(args: Args, config_file: &Path, data_dir: PathBuf) -> Result<Self, config::ConfigError> {
        let required = args.config.is_some();
        debug!(?config_file, required, "loading configuration");

        let builder = config::Config::builder()
            .set_default(
                "browser.user_data_dir",
                data_dir.join("browser-profile").to_string_lossy().into_owned(),
            )?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml))
            .add_source(
                config::File::from(config_file)
                    .format(config::FileFormat::Yaml)
                    .required(required),
            )
            .add_source(args);

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        self.login()?;
        if self.interval_seconds == 0 {
            bail!("the poll interval must be at least one second");
        }
        if self.diagnostics.max_history == 0 {
            bail!("at least one diagnostic snapshot must be kept");
        }
        Ok(())
    }

    /// Username and password, both non-empty.
    pub fn login(&self) -> Result<(&str, &SecretString)> {
        let username = self
            .username
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_eyre("please provide a username via --username or HCLOUD_USERNAME")?;
        let password = self
            .password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty())
            .ok_or_eyre("please provide a password via --password or HCLOUD_PASSWORD")?;
        Ok((username, password))
    }

    /// The TOTP secret, treating an empty value as absent.
    pub fn totp_secret(&self) -> Option<&SecretString> {
        self.totp_secret
            .as_ref()
            .filter(|secret| !secret.expose_secret().trim().is_empty())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn metrics_listen_address(&self) -> SocketAddr {
        let mut address = self.metrics_listen_address;
        if let Some(port) = self.metrics_port {
            address.set_port(port);
        }
        address
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn load(args: Args, yaml: Option<&str>) -> Result<Config, config::ConfigError> {
        let dir = temp_dir::TempDir::new().unwrap();
        let file = dir.path().join("config.yaml");
        if let Some(yaml) = yaml {
            std::fs::write(&file, yaml).unwrap();
        }
        Config::with_config_file(args, &file, dir.path().join("data"))
    }

    fn with_login() -> Args {
        Args {
            username: Some("ops@example.com".to_string()),
            password: Some("hunter2".to_string()),
            ..Args::default()
        }
    }

    #[test]
    fn defaults() {
        let config = load(with_login(), None).unwrap();
        config.validate().unwrap();

        assert_eq!(config.interval(), Duration::from_secs(300));
        assert_eq!(config.metrics_listen_address(), "0.0.0.0:3000".parse().unwrap());
        assert_eq!(
            config.diagnostics.directory,
            PathBuf::from("/var/lib/hcloud-usage-exporter/error-history")
        );
        assert_eq!(config.diagnostics.max_history, 10);
        assert_eq!(config.browser.console_url.as_str(), "https://console.hetzner.cloud/");
        assert!(config.browser.headless);
        assert!(config.browser.user_data_dir.ends_with("data/browser-profile"));
        assert_eq!(config.browser.settle_delay(), Duration::from_secs(5));
        assert!(config.totp_secret().is_none());
    }

    #[test]
    fn file_overrides_defaults_and_args_override_file() {
        let yaml = r#"
interval_seconds: 120
metrics_listen_address: "127.0.0.1:9100"
diagnostics:
  max_history: 3
browser:
  headless: false
"#;
        let args = Args {
            interval: Some(60),
            metrics_port: Some(9200),
            diagnostics_dir: Some(PathBuf::from("/tmp/snapshots")),
            ..with_login()
        };
        let config = load(args, Some(yaml)).unwrap();

        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.metrics_listen_address(), "127.0.0.1:9200".parse().unwrap());
        assert_eq!(config.diagnostics.directory, PathBuf::from("/tmp/snapshots"));
        assert_eq!(config.diagnostics.max_history, 3);
        assert!(!config.browser.headless);
    }

    #[test]
    fn requires_login() {
        let config = load(Args::default(), None).unwrap();
        assert!(config.validate().is_err());

        let args = Args {
            password: Some(String::new()),
            ..with_login()
        };
        assert!(load(args, None).unwrap().validate().is_err());
    }

    #[test]
    fn rejects_zero_interval() {
        let args = Args {
            interval: Some(0),
            ..with_login()
        };
        assert!(load(args, None).unwrap().validate().is_err());
    }

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let args = Args {
            totp_secret: Some("GEZDGNBVGY3TQOJQ".to_string()),
            ..with_login()
        };
        let config = load(args, None).unwrap();
        let debug = format!("{config:?}");

        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("GEZDGNBVGY3TQOJQ"));
        assert_eq!(config.totp_secret().unwrap().expose_secret(), "GEZDGNBVGY3TQOJQ");
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = temp_dir::TempDir::new().unwrap();
        let args = Args {
            config: Some(dir.path().join("missing.yaml")),
            ..with_login()
        };
        let file = args.config.clone().unwrap();
        assert!(Config::with_config_file(args, &file, dir.path().to_path_buf()).is_err());
    }
}
