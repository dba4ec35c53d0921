use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static STORE_WRITES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let opts = Opts::new("store_writes_total", "Store writes by class and outcome");
    let vec = IntCounterVec::new(opts, &["class", "outcome"]).expect("create counter vec");
    REGISTRY
        .register(Box::new(vec.clone()))
        .expect("register store_writes_total");
    vec
});

static STORE_READS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let opts = Opts::new("store_reads_total", "Store reads by class and outcome");
    let vec = IntCounterVec::new(opts, &["class", "outcome"]).expect("create counter vec");
    REGISTRY
        .register(Box::new(vec.clone()))
        .expect("register store_reads_total");
    vec
});

static STORE_DELETES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let opts = Opts::new("store_deletes_total", "Store deletes by class and outcome");
    let vec = IntCounterVec::new(opts, &["class", "outcome"]).expect("create counter vec");
    REGISTRY
        .register(Box::new(vec.clone()))
        .expect("register store_deletes_total");
    vec
});

static STORE_OPERATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let opts = HistogramOpts::new(
        "store_operation_duration_seconds",
        "Store operation latency by operation",
    )
    .buckets(latency_buckets());
    let vec = HistogramVec::new(opts, &["operation"]).expect("create histogram vec");
    REGISTRY
        .register(Box::new(vec.clone()))
        .expect("register store_operation_duration_seconds");
    vec
});

static UPSTREAM_FETCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let opts = Opts::new("upstream_fetches_total", "Upstream fetches by outcome");
    let vec = IntCounterVec::new(opts, &["outcome"]).expect("create counter vec");
    REGISTRY
        .register(Box::new(vec.clone()))
        .expect("register upstream_fetches_total");
    vec
});

fn latency_buckets() -> Vec<f64> {
    vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
}

/// `operation` is one of `store`, `retrieve` or `delete`; anything else only
/// feeds the latency histogram.
pub fn record_store_operation(operation: &str, class: &str, outcome: &str, elapsed: Duration) {
    let counter = match operation {
        "store" => Some(&*STORE_WRITES_TOTAL),
        "retrieve" => Some(&*STORE_READS_TOTAL),
        "delete" => Some(&*STORE_DELETES_TOTAL),
        _ => None,
    };
    if let Some(counter) = counter {
        counter.with_label_values(&[class, outcome]).inc();
    }
    STORE_OPERATION_SECONDS
        .with_label_values(&[operation])
        .observe(elapsed.as_secs_f64());
}

pub fn record_upstream_fetch(outcome: &str) {
    UPSTREAM_FETCHES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Text exposition of every registered metric, for a host process to serve.
pub fn render() -> Vec<u8> {
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %err, "failed to encode metrics");
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_basic_metrics() {
        record_store_operation("store", "request", "ok", Duration::from_millis(2));
        record_store_operation("retrieve", "body", "not_found", Duration::from_millis(1));
        record_store_operation("delete", "header", "ok", Duration::from_millis(1));
        record_upstream_fetch("ok");
        let text = String::from_utf8(render()).expect("utf8");
        for name in [
            "store_writes_total",
            "store_reads_total",
            "store_deletes_total",
            "store_operation_duration_seconds",
            "upstream_fetches_total",
        ] {
            assert!(text.contains(name), "expected {name} in metrics output");
        }
        assert!(
            text.contains(r#"store_reads_total{class="body",outcome="not_found"}"#),
            "labels missing from output: {text}"
        );
    }
}
