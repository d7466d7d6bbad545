use std::sync::Arc;

use pulse_core::{LogBatch, MetricDatum, PulseError};
use pulse_log_engine::{decode_batch, resolve_origin, Extractor};
use serde::Serialize;

use crate::sink::MetricsSink;

/// Outcome of one dispatched batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub origin_id: Option<String>,
    pub control: bool,
    pub lines: usize,
    pub matched_lines: usize,
    pub published: usize,
    pub failed: usize,
}

/// Decodes batches, extracts measurements and forwards them to a sink.
pub struct Dispatcher {
    extractor: Extractor,
    sink: Arc<dyn MetricsSink>,
    namespace: String,
}

impl Dispatcher {
    pub fn new(extractor: Extractor, sink: Arc<dyn MetricsSink>, namespace: impl Into<String>) -> Self {
        Self {
            extractor,
            sink,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Decode an opaque payload and dispatch it.
    pub async fn dispatch(&self, payload: &str) -> Result<DispatchReport, PulseError> {
        let batch = decode_batch(payload)?;
        self.dispatch_batch(&batch).await
    }

    /// Dispatch an already decoded batch.
    ///
    /// Fails only when the origin cannot be resolved. Sink errors are logged
    /// and counted; they never stop the remaining measurements.
    pub async fn dispatch_batch(&self, batch: &LogBatch) -> Result<DispatchReport, PulseError> {
        if batch.is_control_message() {
            tracing::info!(log_stream = %batch.log_stream, "control message, nothing to publish");
            return Ok(DispatchReport {
                control: true,
                lines: batch.events.len(),
                ..Default::default()
            });
        }

        let origin_id = resolve_origin(&batch.log_stream)?;
        let mut report = DispatchReport {
            origin_id: Some(origin_id.to_string()),
            lines: batch.events.len(),
            ..Default::default()
        };

        for record in &batch.events {
            let Some(measurements) = self.extractor.extract_line(record, origin_id) else {
                continue;
            };
            report.matched_lines += 1;

            for measurement in measurements {
                let datum = MetricDatum::from_measurement(&self.namespace, measurement);
                match self.sink.put_metric(&datum).await {
                    Ok(()) => report.published += 1,
                    Err(e) => {
                        tracing::warn!(
                            sink = self.sink.name(),
                            metric = %datum.metric_name,
                            error = %e,
                            "failed to publish measurement"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            origin_id,
            lines = report.lines,
            matched = report.matched_lines,
            published = report.published,
            failed = report.failed,
            "batch dispatched"
        );
        Ok(report)
    }
}
