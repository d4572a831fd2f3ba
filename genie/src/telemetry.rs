use crate::config::{LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};
use tracing_subscriber::filter::{EnvFilter, ParseError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

const METRICS_PREFIX: &str = "genie";

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("could not install log subscriber: {0}")]
    Subscriber(#[from] TryInitError),
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] StatsdError),
    #[error("could not install metrics recorder: {0}")]
    Recorder(String),
}

/// Keeps the Sentry client alive. Events still queued are flushed on drop.
pub struct TelemetryGuard {
    _sentry: Option<sentry::ClientInitGuard>,
}

/// Install the global log subscriber, the Sentry client and the StatsD
/// recorder. Call once, before starting the runtime.
pub fn init(
    logging: &LoggingConfig,
    metrics: Option<&MetricsConfig>,
) -> Result<TelemetryGuard, TelemetryError> {
    let sentry = logging.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)?,
    };
    let sentry_layer = sentry
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .try_init()?;

    if let Some(metrics) = metrics {
        let recorder = StatsdBuilder::from(metrics.statsd_host.as_str(), metrics.statsd_port)
            .build(Some(METRICS_PREFIX))?;
        metrics::set_global_recorder(recorder)
            .map_err(|e| TelemetryError::Recorder(e.to_string()))?;
        tracing::info!(
            host = %metrics.statsd_host,
            port = metrics.statsd_port,
            "sending metrics to statsd"
        );
    }

    shared::metrics_defs::describe_all(upstream::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe_all(aggregator::metrics_defs::ALL_METRICS);

    Ok(TelemetryGuard { _sentry: sentry })
}
