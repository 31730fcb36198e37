use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process-wide `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

/// Metrics handle for sync call sites; `None` until `get_metrics` ran once.
pub fn try_metrics() -> Option<&'static Arc<Metrics>> {
    METRICS_INSTANCE.get()
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Upstream metrics
    pub upstream_requests: IntCounterVec,
    pub upstream_failures: IntCounterVec,
    pub upstream_duration: HistogramVec,

    // Fan-out metrics
    pub aggregation_partial_failures: IntCounterVec,
    pub aggregation_total_failures: IntCounterVec,

    // Credential metrics
    pub token_renewals: IntCounter,
    pub token_failures: IntCounter,
    pub token_expiry_unix: IntGauge,

    // Server
    pub http_responses: IntCounterVec,
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("backendforge".into()), None)
            .unwrap_or_default();

        let metrics = Arc::new(Self {
            upstream_requests: IntCounterVec::new(Opts::new("upstream_requests_total", "Outbound requests by provider"), &["provider"]).unwrap(),
            upstream_failures: IntCounterVec::new(Opts::new("upstream_failures_total", "Outbound failures by provider and reason"), &["provider", "reason"]).unwrap(),
            upstream_duration: HistogramVec::new(HistogramOpts::new("upstream_duration_seconds", "Outbound request duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]), &["provider"]).unwrap(),

            aggregation_partial_failures: IntCounterVec::new(Opts::new("aggregation_partial_failures_total", "Fan-out calls that lost at least one task"), &["aggregation"]).unwrap(),
            aggregation_total_failures: IntCounterVec::new(Opts::new("aggregation_total_failures_total", "Fan-out calls where every task failed"), &["aggregation"]).unwrap(),

            token_renewals: IntCounter::new("token_renewals_total", "Signed tokens minted").unwrap(),
            token_failures: IntCounter::new("token_failures_total", "Token minting failures").unwrap(),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry of the cached signed token").unwrap(),

            http_responses: IntCounterVec::new(Opts::new("http_responses_total", "Responses by route and status"), &["route", "status"]).unwrap(),
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").unwrap(),
            up: IntGauge::new("up", "1 if service is serving").unwrap(),

            registry,
        });

        let reg = &metrics.registry;
        reg.register(Box::new(metrics.upstream_requests.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_failures.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_duration.clone())).unwrap();
        reg.register(Box::new(metrics.aggregation_partial_failures.clone())).unwrap();
        reg.register(Box::new(metrics.aggregation_total_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_renewals.clone())).unwrap();
        reg.register(Box::new(metrics.token_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.http_responses.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
