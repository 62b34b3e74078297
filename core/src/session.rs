use eyre::Result;
use secrecy::SecretString;
use std::future::Future;
use strum::{
    Display,
    EnumIter,
    IntoStaticStr,
};

/// Health of the console session as seen by the polling loop.
#[derive(Debug, Default, Clone, Copy, Display, EnumIter, IntoStaticStr, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    /// No login has been attempted yet.
    #[default]
    Pending,
    /// The last login and the last fetch (if any) succeeded.
    Healthy,
    /// The last login or fetch failed. The next iteration logs in again.
    Error,
}

impl SessionState {
    pub fn needs_login(self) -> bool {
        matches!(self, SessionState::Pending | SessionState::Error)
    }
}

/// Current billing period total of one project.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub project: String,
    pub total_eur: f64,
}

impl UsageRecord {
    pub fn new(project: impl Into<String>, total_eur: f64) -> Self {
        Self {
            project: project.into(),
            total_eur,
        }
    }
}

/// Console login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Everything the polling loop needs from the remote console.
///
/// Errors are opaque to the caller: any failure moves the loop into
/// [`SessionState::Error`]. Implementations are free to carry a richer error
/// taxonomy inside the [`eyre::Report`].
pub trait SessionClient {
    /// Authenticate against the console, optionally answering a one-time code prompt.
    fn login(&mut self, credentials: &Credentials, one_time_code: Option<&str>) -> impl Future<Output = Result<()>>;

    /// Read the usage table of the current billing period.
    fn fetch_usage(&mut self) -> impl Future<Output = Result<Vec<UsageRecord>>>;

    /// Encoded image (PNG) of whatever the session currently shows.
    fn capture_diagnostic(&self) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Source of the optional second login factor.
pub trait CredentialProvider {
    fn current_code(&self) -> Option<String>;
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Option<String>,
{
    fn current_code(&self) -> Option<String> {
        self()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator as _;

    #[test]
    fn state_labels_are_lowercase() {
        let labels = SessionState::iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["pending", "healthy", "error"]);
    }

    #[test]
    fn only_healthy_skips_login() {
        assert!(SessionState::Pending.needs_login());
        assert!(SessionState::Error.needs_login());
        assert!(!SessionState::Healthy.needs_login());
    }
}
