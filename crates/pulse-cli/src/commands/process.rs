use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pulse_config::{CliOverrides, SinkConfig, SinkKind};
use pulse_core::PulseError;
use pulse_log_engine::{Extractor, InvocationEvent};
use pulse_metrics::{Dispatcher, HttpSink, JsonLinesSink, MemorySink, MetricsSink, PrometheusSink};

pub struct ProcessArgs {
    pub file: Option<PathBuf>,
    pub namespace: Option<String>,
    pub config: Option<PathBuf>,
    pub sink: Option<SinkKind>,
    pub endpoint: Option<String>,
    pub dry_run: bool,
    pub json: bool,
}

pub async fn run(args: ProcessArgs) -> Result<(), PulseError> {
    let mut config = pulse_config::load_or_default(args.config.as_deref()).map_err(config_error)?;
    config.apply_process_env().map_err(config_error)?;
    let settings = config
        .resolve(&CliOverrides {
            namespace: args.namespace,
            sink: args.sink,
            endpoint: args.endpoint,
        })
        .map_err(config_error)?;

    crate::logging::init(settings.log_filter.as_deref());

    let sink = select_sink(args.dry_run, &settings.sink)?;
    tracing::debug!(sink = sink.name(), namespace = %settings.namespace, "publishing");

    let input = super::read_input(args.file.as_deref())?;
    let payload = InvocationEvent::payload_from(&input);

    let dispatcher = Dispatcher::new(Extractor::with_defaults(), sink, settings.namespace);
    let report = dispatcher.dispatch(&payload).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.control {
        eprintln!("[pulse] Control message, nothing published");
    } else {
        eprintln!(
            "[pulse] {}: {} lines, {} matched, {} published, {} failed",
            report.origin_id.as_deref().unwrap_or("-"),
            report.lines,
            report.matched_lines,
            report.published,
            report.failed
        );
    }

    Ok(())
}

/// Dry runs collect into memory regardless of the configured sink.
fn select_sink(dry_run: bool, config: &SinkConfig) -> Result<Arc<dyn MetricsSink>, PulseError> {
    if dry_run {
        return Ok(Arc::new(MemorySink::new()));
    }
    build_sink(config)
}

fn build_sink(config: &SinkConfig) -> Result<Arc<dyn MetricsSink>, PulseError> {
    let sink: Arc<dyn MetricsSink> = match config.kind {
        SinkKind::Json => Arc::new(JsonLinesSink::stdout()),
        SinkKind::Prometheus => Arc::new(PrometheusSink::stdout()),
        SinkKind::Http => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| PulseError::Config("http sink requires an endpoint".into()))?;
            Arc::new(HttpSink::new(
                endpoint,
                Duration::from_millis(config.timeout_ms),
            )?)
        }
    };
    Ok(sink)
}

fn config_error(e: pulse_config::ConfigError) -> PulseError {
    PulseError::Config(e.to_string())
}
