//! Polling core of the usage exporter.
//!
//! [`Exporter`] drives a [`SessionClient`] through login and usage fetches,
//! publishes the result through [`ExporterMetrics`] and falls back to a fresh
//! login whenever anything goes wrong. The browser automation itself lives
//! behind the [`SessionClient`] trait so the loop can be exercised without one.

#[macro_use]
extern crate tracing;

mod exporter;
mod metrics;
mod otp;
mod session;
mod snapshot;
mod timer;

pub use exporter::Exporter;
pub use metrics::ExporterMetrics;
pub use otp::TotpProvider;
pub use session::{
    CredentialProvider,
    Credentials,
    SessionClient,
    SessionState,
    UsageRecord,
};
pub use snapshot::PageSnapshotter;
pub use timer::Timer;
