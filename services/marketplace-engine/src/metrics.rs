use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref JOBS_PAID: IntCounter = IntCounter::new(
        "marketplace_jobs_paid_total",
        "Total jobs paid"
    ).expect("metric can be created");

    pub static ref PAYMENT_VOLUME: Histogram = Histogram::with_opts(
        HistogramOpts::new("marketplace_payment_amount", "Distribution of job payment amounts")
            .buckets(vec![10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0])
    ).expect("metric can be created");

    pub static ref DEPOSITS: IntCounter = IntCounter::new(
        "marketplace_deposits_total",
        "Total accepted client deposits"
    ).expect("metric can be created");

    pub static ref LEDGER_REJECTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("marketplace_ledger_rejections_total", "Ledger operations rejected"),
        &["operation", "reason"]
    ).expect("metric can be created");

    pub static ref REPORT_QUERIES: IntCounterVec = IntCounterVec::new(
        Opts::new("marketplace_report_queries_total", "Reporting queries served"),
        &["report"]
    ).expect("metric can be created");
}

/// Register all metrics with the given registry
pub fn register_metrics(registry: &Registry) -> Result<(), Box<dyn std::error::Error>> {
    registry.register(Box::new(JOBS_PAID.clone()))?;
    registry.register(Box::new(PAYMENT_VOLUME.clone()))?;
    registry.register(Box::new(DEPOSITS.clone()))?;
    registry.register(Box::new(LEDGER_REJECTIONS.clone()))?;
    registry.register(Box::new(REPORT_QUERIES.clone()))?;

    Ok(())
}

pub fn record_rejection(operation: &str, reason: &str) {
    LEDGER_REJECTIONS.with_label_values(&[operation, reason]).inc();
}

/// Generate metrics output in Prometheus text format
pub fn metrics_handler() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
