//! Tracing subscriber bootstrap. The reference stack wires a full OTLP
//! exporter behind its own `Telemetry` wrapper; this orchestrator keeps the
//! same shape (a `Telemetry` handle, registered once at startup) but exports
//! only the `fmt` layer by default, reserving OTLP for the optional
//! `telemetry` feature rather than carrying the dependency unconditionally.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub struct Telemetry;

impl Telemetry {
    pub fn new() -> Self {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        Telemetry
    }

    pub fn http_tracing(&self) -> tower_http::trace::TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>> {
        tower_http::trace::TraceLayer::new_for_http()
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}
