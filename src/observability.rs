use std::net::SocketAddr;

// ── Refresh cycles ──────────────────────────────────────────────

/// Counter: fetch cycles dispatched. Labels: controller.
pub const CYCLES_STARTED_TOTAL: &str = "fixcal_cycles_started_total";

/// Counter: cycles whose result was published. Labels: controller, status.
pub const CYCLES_PUBLISHED_TOTAL: &str = "fixcal_cycles_published_total";

/// Counter: cycles superseded before publishing. Labels: controller.
pub const CYCLES_DISCARDED_TOTAL: &str = "fixcal_cycles_discarded_total";

/// Histogram: cycle latency in seconds, dispatch to settle. Labels: controller.
pub const CYCLE_DURATION_SECONDS: &str = "fixcal_cycle_duration_seconds";

// ── Source ──────────────────────────────────────────────────────

/// Counter: backend requests. Labels: endpoint, status.
pub const SOURCE_REQUESTS_TOTAL: &str = "fixcal_source_requests_total";

/// Counter: template lookups served from cache.
pub const TEMPLATE_CACHE_HITS_TOTAL: &str = "fixcal_template_cache_hits_total";

// ── Data quality ────────────────────────────────────────────────

/// Counter: slots with more than one active appointment.
pub const INVARIANT_VIOLATIONS_TOTAL: &str = "fixcal_invariant_violations_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
