//! Prometheus metrics & middleware helper.

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// HTTP request metrics, exposed at `/metrics`.
pub static METRICS: Lazy<PrometheusMetrics> = Lazy::new(|| {
    PrometheusMetricsBuilder::new("api")
        .endpoint("/metrics") // exposed URL
        .build()
        .expect("metrics builder")
});

/// Battle-engine counters, exposed at `/api/metrics/battles`.
pub static BATTLE_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static ACTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("battle_actions_total", "Battle actions by kind and result"),
        &["kind", "result"],
    )
    .expect("battle_actions_total");
    BATTLE_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("register battle_actions_total");
    counter
});

static CONFLICTS: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "battle_commit_conflicts_total",
        "Commits rejected by the version check",
    )
    .expect("battle_commit_conflicts_total");
    BATTLE_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("register battle_commit_conflicts_total");
    counter
});

/// `result` is `ok` or the error code.
pub fn record_action(kind: &str, result: &str) {
    ACTIONS.with_label_values(&[kind, result]).inc();
}

pub fn record_conflict() {
    CONFLICTS.inc();
}

/// Text exposition of the battle counters.
pub fn render_battle_metrics() -> String {
    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&BATTLE_REGISTRY.gather(), &mut buf) {
        log::warn!("metrics encode failed: {e}");
    }
    String::from_utf8(buf).unwrap_or_default()
}
