/// Ways the console can fail us. The polling loop treats all of them alike;
/// the distinction only shows up in the logs.
#[derive(thiserror::Error, Debug)]
pub enum ConsoleError {
    #[error("timed out waiting for element {0}")]
    ElementNotFound(String),
    #[error("the console asks for a one-time code but no TOTP secret is configured")]
    OneTimeCodeRequired,
    #[error("usage row without a project name")]
    EmptyProjectName,
    #[error("cannot read cost {0:?}")]
    InvalidCost(String),
    #[error("no page is open to capture")]
    NoPage,
}
