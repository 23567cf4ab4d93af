use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Upstream API
    pub upstream_requests: IntCounterVec,
    pub upstream_failures: IntCounterVec,
    pub upstream_duration: HistogramVec,
    pub token_exchanges: IntCounterVec,

    // Rate limiting
    pub rate_limit_waits: IntCounter,
    pub rate_limit_remaining: IntGauge,

    // Lookups
    pub lookups: IntCounterVec,
    pub grade_rows: IntCounter,

    // Student index
    pub index_students: IntGauge,
    pub index_rebuilds: IntCounterVec,

    // Config/runtime
    pub config_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("interimreport".into()), None)
            .expect("registry prefix is valid");

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Upstream
            upstream_requests: counter_vec("upstream_requests_total", "Upstream page requests by API mode", &["mode"]),
            upstream_failures: counter_vec("upstream_failures_total", "Upstream failures by API mode and reason", &["mode", "reason"]),
            upstream_duration: HistogramVec::new(HistogramOpts::new("upstream_request_duration_seconds", "Upstream page request duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["mode"]).expect("metric definition is valid"),
            token_exchanges: counter_vec("token_exchanges_total", "Client-credentials exchanges by outcome", &["outcome"]),

            // Rate limiting
            rate_limit_waits: counter("rate_limit_waits_total", "Pauses taken because the rate-limit low-water mark was reached"),
            rate_limit_remaining: gauge("rate_limit_remaining", "Last X-Rate-Limit-Remaining value seen"),

            // Lookups
            lookups: counter_vec("lookups_total", "Grade lookups by outcome", &["outcome"]),
            grade_rows: counter("grade_rows_total", "Grade rows produced"),

            // Student index
            index_students: gauge("index_students", "Student records in the loaded snapshot"),
            index_rebuilds: counter_vec("index_rebuilds_total", "Snapshot rebuilds by outcome", &["outcome"]),

            // Config/runtime
            config_errors: counter("config_errors_total", "Parse and validation errors during config load"),
            up: gauge("up", "1 if service is healthy"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.upstream_requests.clone()),
            Box::new(metrics.upstream_failures.clone()),
            Box::new(metrics.upstream_duration.clone()),
            Box::new(metrics.token_exchanges.clone()),
            Box::new(metrics.rate_limit_waits.clone()),
            Box::new(metrics.rate_limit_remaining.clone()),
            Box::new(metrics.lookups.clone()),
            Box::new(metrics.grade_rows.clone()),
            Box::new(metrics.index_students.clone()),
            Box::new(metrics.index_rebuilds.clone()),
            Box::new(metrics.config_errors.clone()),
            Box::new(metrics.up.clone()),
        ];
        for collector in collectors {
            reg.register(collector).expect("metric names are unique");
        }

        metrics
    }
}

fn counter(name: &str, help: &str) -> IntCounter {
    IntCounter::new(name, help).expect("metric definition is valid")
}

fn counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    IntCounterVec::new(Opts::new(name, help), labels).expect("metric definition is valid")
}

fn gauge(name: &str, help: &str) -> IntGauge {
    IntGauge::new(name, help).expect("metric definition is valid")
}
