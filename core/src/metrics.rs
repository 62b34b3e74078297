use crate::session::SessionState;
use eyre::{
    Context as _,
    Result,
};
use prometheus::{
    core::Collector as _,
    Encoder as _,
    GaugeVec,
    Histogram,
    HistogramOpts,
    IntCounter,
    IntGaugeVec,
    Opts,
    Registry,
    TextEncoder,
};
use std::time::Duration;
use strum::IntoEnumIterator as _;

const NAMESPACE: &str = "hcloud_usage_exporter";

/// Loop iterations include page loads and a fixed settle delay, so the
/// interesting range is seconds to minutes.
const LOOP_DURATION_BUCKETS: &[f64] = &[1.0, 2.5, 5.0, 7.5, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0];

/// Metrics written by the polling loop and read by the scrape endpoint.
///
/// Every handle is atomic on its own; no consistency across metrics is
/// attempted. Cloning shares the underlying metrics.
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    pub logins: IntCounter,
    pub fetches: IntCounter,
    pub errors: IntCounter,
    pub project_cost: GaugeVec,
    pub state: IntGaugeVec,
    pub loop_duration: Histogram,
}

impl ExporterMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let logins = IntCounter::with_opts(Opts::new("logins_total", "Total number of logins").namespace(NAMESPACE))?;
        let fetches =
            IntCounter::with_opts(Opts::new("fetches_total", "Total number of fetches").namespace(NAMESPACE))?;
        let errors = IntCounter::with_opts(Opts::new("errors_total", "Total number of errors").namespace(NAMESPACE))?;
        let project_cost = GaugeVec::new(
            Opts::new("project_cost_eur", "Total cost in EUR for projects").namespace(NAMESPACE),
            &["project_name"],
        )?;
        let state = IntGaugeVec::new(
            Opts::new("state", "Current state of the exporter").namespace(NAMESPACE),
            &["state"],
        )?;
        let loop_duration = Histogram::with_opts(
            HistogramOpts::new("loop_duration_seconds", "Duration of a single main loop in seconds")
                .namespace(NAMESPACE)
                .buckets(LOOP_DURATION_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(logins.clone()))?;
        registry.register(Box::new(fetches.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(project_cost.clone()))?;
        registry.register(Box::new(state.clone()))?;
        registry.register(Box::new(loop_duration.clone()))?;

        let metrics = Self {
            registry,
            logins,
            fetches,
            errors,
            project_cost,
            state,
            loop_duration,
        };
        metrics.set_state(SessionState::default());
        Ok(metrics)
    }

    /// One-hot encode the state so exactly one label carries `1`.
    pub fn set_state(&self, current: SessionState) {
        for state in SessionState::iter() {
            let label: &'static str = state.into();
            self.state.with_label_values(&[label]).set(i64::from(state == current));
        }
    }

    pub fn current_state(&self) -> Option<SessionState> {
        SessionState::iter().find(|state| {
            let label: &'static str = (*state).into();
            self.state.with_label_values(&[label]).get() == 1
        })
    }

    pub fn set_project_cost(&self, project: &str, total_eur: f64) {
        self.project_cost.with_label_values(&[project]).set(total_eur);
    }

    /// Exposed cost of a project, `None` if no gauge exists for it.
    pub fn project_cost(&self, project: &str) -> Option<f64> {
        self.project_cost
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == "project_name" && label.get_value() == project)
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    pub fn project_count(&self) -> usize {
        self.project_cost
            .collect()
            .iter()
            .map(|family| family.get_metric().len())
            .sum()
    }

    pub fn clear_project_costs(&self) {
        self.project_cost.reset();
    }

    pub fn observe_loop_duration(&self, duration: Duration) {
        self.loop_duration.observe(duration.as_secs_f64());
    }

    /// Prometheus text exposition of all metrics.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("failed to encode metrics")?;
        String::from_utf8(buffer).context("metrics are not valid utf-8")
    }
}

impl std::fmt::Debug for ExporterMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterMetrics")
            .field("logins", &self.logins.get())
            .field("fetches", &self.fetches.get())
            .field("errors", &self.errors.get())
            .field("projects", &self.project_count())
            .field("state", &self.current_state())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn starts_pending() {
        let metrics = ExporterMetrics::new().unwrap();
        assert_eq!(metrics.current_state(), Some(SessionState::Pending));
        assert_eq!(metrics.state.with_label_values(&["healthy"]).get(), 0);
        assert_eq!(metrics.state.with_label_values(&["error"]).get(), 0);
    }

    #[test]
    fn state_is_one_hot() {
        let metrics = ExporterMetrics::new().unwrap();
        metrics.set_state(SessionState::Error);
        assert_eq!(metrics.state.with_label_values(&["pending"]).get(), 0);
        assert_eq!(metrics.state.with_label_values(&["error"]).get(), 1);
        metrics.set_state(SessionState::Healthy);
        assert_eq!(metrics.current_state(), Some(SessionState::Healthy));
        assert_eq!(metrics.state.with_label_values(&["error"]).get(), 0);
    }

    #[test]
    fn project_costs_can_be_cleared() {
        let metrics = ExporterMetrics::new().unwrap();
        metrics.set_project_cost("proj-a", 12.5);
        metrics.set_project_cost("proj-b", 0.0);
        assert_eq!(metrics.project_cost("proj-a"), Some(12.5));
        assert_eq!(metrics.project_cost("proj-b"), Some(0.0));
        assert_eq!(metrics.project_count(), 2);

        metrics.clear_project_costs();
        assert_eq!(metrics.project_count(), 0);
        assert_eq!(metrics.project_cost("proj-a"), None);
    }

    #[test]
    fn renders_text_exposition() {
        let metrics = ExporterMetrics::new().unwrap();
        metrics.logins.inc();
        metrics.set_project_cost("proj-a", 12.5);
        metrics.observe_loop_duration(Duration::from_secs(3));

        let text = metrics.render().unwrap();
        assert!(text.contains("hcloud_usage_exporter_logins_total 1"));
        assert!(text.contains(r#"hcloud_usage_exporter_project_cost_eur{project_name="proj-a"} 12.5"#));
        assert!(text.contains(r#"hcloud_usage_exporter_state{state="pending"} 1"#));
        assert!(text.contains("hcloud_usage_exporter_loop_duration_seconds_count 1"));
    }
}
