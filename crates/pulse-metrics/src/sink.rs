use std::sync::Mutex;

use async_trait::async_trait;
use pulse_core::{MetricDatum, SinkError};

/// Destination for published measurements. One call per datum.
///
/// Retries and timeouts are the implementation's concern; callers treat
/// every error as final for that datum.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn put_metric(&self, datum: &MetricDatum) -> Result<(), SinkError>;

    /// Human-readable backend name
    fn name(&self) -> &'static str;
}

/// Keeps every datum in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    data: Mutex<Vec<MetricDatum>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn data(&self) -> Vec<MetricDatum> {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetricsSink for MemorySink {
    async fn put_metric(&self, datum: &MetricDatum) -> Result<(), SinkError> {
        self.data
            .lock()
            .map_err(|_| SinkError::Transport("memory sink poisoned".into()))?
            .push(datum.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
