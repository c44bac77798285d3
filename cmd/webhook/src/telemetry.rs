use clap::ValueEnum;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("sample ratio must be between 0.0 and 1.0, got {0}")]
    SampleRatio(f64),

    #[error("failed to build OTLP span exporter: {0}")]
    Exporter(String),

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

fn tracer(tracing_url: &str, sample_ratio: f64) -> Result<SdkTracer, Error> {
    if !(0.0..=1.0).contains(&sample_ratio) {
        return Err(Error::SampleRatio(sample_ratio));
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(tracing_url)
        .build()
        .map_err(|e| Error::Exporter(e.to_string()))?;

    let provider = SdkTracerProvider::builder()
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            sample_ratio,
        ))))
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .with_batch_exporter(exporter)
        .build();

    global::set_text_map_propagator(TraceContextPropagator::new());
    global::set_tracer_provider(provider.clone());

    Ok(provider.tracer(SERVICE_NAME))
}

/// Install the global subscriber: env filter, text or JSON output, and span
/// export over OTLP when `tracing_url` is set.
pub async fn init(
    log_filter: &str,
    log_format: LogFormat,
    tracing_url: Option<&str>,
    sample_ratio: f64,
) -> Result<(), Error> {
    let filter = EnvFilter::try_new(log_filter)?;

    let fmt_layer = match log_format {
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };

    let otel_layer = tracing_url
        .map(|url| tracer(url, sample_ratio))
        .transpose()?
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!(LogFormat::from_str("text", true).unwrap(), LogFormat::Text);
        assert_eq!(LogFormat::from_str("JSON", true).unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("yaml", true).is_err());
    }

    #[test]
    fn test_sample_ratio_out_of_range() {
        assert!(matches!(
            tracer("http://localhost:4317", 1.5),
            Err(Error::SampleRatio(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_log_filter() {
        let result = init("info,podgate=verbose", LogFormat::Text, None, 0.1).await;
        assert!(matches!(result, Err(Error::LogFilter(_))));
    }
}
