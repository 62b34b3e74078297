use crate::{
    metrics::ExporterMetrics,
    session::{
        CredentialProvider,
        Credentials,
        SessionClient,
        SessionState,
    },
    snapshot::PageSnapshotter,
    timer::Timer,
};
use std::{
    convert::Infallible,
    time::Duration,
};

/// The polling loop: keeps a console session alive and mirrors its usage
/// table into [`ExporterMetrics`].
///
/// Only one iteration runs at a time and the session client is owned
/// exclusively by the loop.
#[derive(Debug)]
pub struct Exporter<C, P> {
    client: C,
    credentials: Credentials,
    one_time_codes: P,
    metrics: ExporterMetrics,
    snapshotter: PageSnapshotter,
    interval: Duration,
    state: SessionState,
    timer: Timer,
}

impl<C, P> Exporter<C, P>
where
    C: SessionClient,
    P: CredentialProvider,
{
    pub fn new(
        client: C,
        credentials: Credentials,
        one_time_codes: P,
        metrics: ExporterMetrics,
        snapshotter: PageSnapshotter,
        interval: Duration,
    ) -> Self {
        metrics.set_state(SessionState::Pending);
        Self {
            client,
            credentials,
            one_time_codes,
            metrics,
            snapshotter,
            interval,
            state: SessionState::Pending,
            timer: Timer::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    /// Run iterations forever, one every `interval`.
    pub async fn run(mut self) -> Infallible {
        info!(interval = ?self.interval, "starting polling loop");
        self.timer.reset();
        loop {
            self.iterate().await;
            self.metrics.observe_loop_duration(self.timer.elapsed());
            let slept = self.timer.sleep_delta(self.interval).await;
            if slept.is_zero() {
                warn!(interval = ?self.interval, "iteration took longer than the poll interval");
            }
        }
    }

    /// One pass through the state machine: log in if the session is not
    /// healthy, then fetch usage if it is.
    pub async fn iterate(&mut self) -> SessionState {
        if self.state.needs_login() {
            self.login().await;
            self.metrics.set_state(self.state);
        }

        match self.state {
            SessionState::Healthy => self.fetch().await,
            // Already cleared when entering the state, repeated so nothing set
            // in between can outlive a broken session.
            SessionState::Error => self.metrics.clear_project_costs(),
            SessionState::Pending => {}
        }

        self.metrics.set_state(self.state);
        self.state
    }

    async fn login(&mut self) {
        info!(state = %self.state, "trying to log in");
        let one_time_code = self.one_time_codes.current_code();
        match self
            .client
            .login(&self.credentials, one_time_code.as_deref())
            .await
        {
            Ok(()) => {
                info!(username = %self.credentials.username, "logged in");
                self.metrics.logins.inc();
                self.state = SessionState::Healthy;
            }
            Err(err) => self.fail("logging in", err).await,
        }
    }

    async fn fetch(&mut self) {
        info!("fetching project cost");
        match self.client.fetch_usage().await {
            Ok(usage) => {
                self.metrics.fetches.inc();
                for record in &usage {
                    debug!(project = %record.project, total_eur = record.total_eur, "project cost");
                    self.metrics.set_project_cost(&record.project, record.total_eur);
                }
                info!(projects = usage.len(), "updated project cost");
            }
            Err(err) => self.fail("fetching usage", err).await,
        }
    }

    /// Enter [`SessionState::Error`]: count it, drop every cost gauge, and
    /// leave a screenshot behind if possible.
    async fn fail(&mut self, action: &str, err: eyre::Report) {
        self.state = SessionState::Error;
        self.metrics.errors.inc();
        self.metrics.clear_project_costs();
        self.metrics.set_state(self.state);

        match self.snapshotter.capture(&self.client).await {
            Ok(path) => error!(?path, "error while {action}, captured snapshot: {err:?}"),
            Err(capture_err) => {
                error!("error while {action}: {err:?}");
                warn!("failed to capture snapshot: {capture_err:#}");
            }
        }
    }
}
