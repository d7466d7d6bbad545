use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use pulse_core::{MetricDatum, SinkError};

use crate::sink::MetricsSink;

/// Writes each datum as one JSON line.
/// Output: `{"namespace":"PCoIP","metricName":"PCoIPAvgTx",...,"timestampIso":"..."}`
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> MetricsSink for JsonLinesSink<W> {
    async fn put_metric(&self, datum: &MetricDatum) -> Result<(), SinkError> {
        let line = serde_json::to_string(datum)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| SinkError::Transport("json sink writer poisoned".into()))?;
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
