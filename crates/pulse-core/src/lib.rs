pub mod error;
pub mod record;

pub use error::{DecodeError, EncodeError, PulseError, SinkError};
pub use record::{LogBatch, LogRecord, MeasurementRecord, MetricDatum, MetricValue, Unit};
