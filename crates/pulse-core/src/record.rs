use std::fmt;

use serde::{Deserialize, Serialize};

/// Dimension name attached to every published measurement.
pub const INSTANCE_DIMENSION: &str = "InstanceId";

/// Batch `messageType` that carries no log data.
pub const CONTROL_MESSAGE: &str = "CONTROL_MESSAGE";

// ============================================================
// Input: decoded log batch
// ============================================================

/// One decoded log batch: stream metadata plus its lines in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group: Option<String>,
    pub log_stream: String,
    #[serde(rename = "logEvents")]
    pub events: Vec<LogRecord>,
}

impl LogBatch {
    pub fn new(log_stream: impl Into<String>, events: Vec<LogRecord>) -> Self {
        Self {
            message_type: None,
            owner: None,
            log_group: None,
            log_stream: log_stream.into(),
            events,
        }
    }

    pub fn is_control_message(&self) -> bool {
        self.message_type.as_deref() == Some(CONTROL_MESSAGE)
    }
}

/// A single log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    pub message: String,
}

impl LogRecord {
    pub fn new(timestamp_ms: i64, message: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp_ms,
            message: message.into(),
        }
    }
}

// ============================================================
// Output: measurements
// ============================================================

/// Measurement unit, spelled the way the metrics sink expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Seconds,
    Microseconds,
    Milliseconds,
    Bytes,
    Kilobytes,
    Megabytes,
    Bits,
    Kilobits,
    Megabits,
    Percent,
    Count,
    #[serde(rename = "Bytes/Second")]
    BytesPerSecond,
    #[serde(rename = "Kilobytes/Second")]
    KilobytesPerSecond,
    #[serde(rename = "Megabytes/Second")]
    MegabytesPerSecond,
    #[serde(rename = "Bits/Second")]
    BitsPerSecond,
    #[serde(rename = "Kilobits/Second")]
    KilobitsPerSecond,
    #[serde(rename = "Megabits/Second")]
    MegabitsPerSecond,
    #[serde(rename = "Count/Second")]
    CountPerSecond,
    None,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds => "Seconds",
            Self::Microseconds => "Microseconds",
            Self::Milliseconds => "Milliseconds",
            Self::Bytes => "Bytes",
            Self::Kilobytes => "Kilobytes",
            Self::Megabytes => "Megabytes",
            Self::Bits => "Bits",
            Self::Kilobits => "Kilobits",
            Self::Megabits => "Megabits",
            Self::Percent => "Percent",
            Self::Count => "Count",
            Self::BytesPerSecond => "Bytes/Second",
            Self::KilobytesPerSecond => "Kilobytes/Second",
            Self::MegabytesPerSecond => "Megabytes/Second",
            Self::BitsPerSecond => "Bits/Second",
            Self::KilobitsPerSecond => "Kilobits/Second",
            Self::MegabitsPerSecond => "Megabits/Second",
            Self::CountPerSecond => "Count/Second",
            Self::None => "None",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coerced numeric value. Integers stay integral on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Integer(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One extracted measurement, ready for the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    pub metric_name: String,
    pub unit: Unit,
    pub origin_id: String,
    pub value: MetricValue,
    pub timestamp_iso: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// Wire shape of a single sink call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDatum {
    pub namespace: String,
    pub metric_name: String,
    pub unit: Unit,
    pub dimensions: Vec<Dimension>,
    pub value: MetricValue,
    pub timestamp_iso: String,
}

impl MetricDatum {
    pub fn from_measurement(namespace: &str, record: MeasurementRecord) -> Self {
        Self {
            namespace: namespace.to_string(),
            metric_name: record.metric_name,
            unit: record.unit,
            dimensions: vec![Dimension {
                name: INSTANCE_DIMENSION.to_string(),
                value: record.origin_id,
            }],
            value: record.value,
            timestamp_iso: record.timestamp_iso,
        }
    }

    /// Value of the `InstanceId` dimension, if present.
    pub fn instance_id(&self) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name == INSTANCE_DIMENSION)
            .map(|d| d.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(value: MetricValue) -> MeasurementRecord {
        MeasurementRecord {
            metric_name: "PCoIPAvgTx".to_string(),
            unit: Unit::KilobytesPerSecond,
            origin_id: "i-0abc123def4567890".to_string(),
            value,
            timestamp_iso: "2023-11-14T22:13:20.123000Z".to_string(),
        }
    }

    #[test]
    fn test_batch_deserialize_wire_names() {
        let json = r#"{
            "messageType": "DATA_MESSAGE",
            "owner": "123456789012",
            "logGroup": "pcoip",
            "logStream": "i-0abc123def4567890",
            "subscriptionFilters": ["all"],
            "logEvents": [
                {"id": "1", "timestamp": 1700000000123, "message": "hello"},
                {"timestamp": 1700000000124, "message": "world"}
            ]
        }"#;
        let batch: LogBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.log_stream, "i-0abc123def4567890");
        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.events[0].timestamp_ms, 1700000000123);
        assert_eq!(batch.events[1].message, "world");
        assert!(!batch.is_control_message());
    }

    #[test]
    fn test_batch_missing_events_rejected() {
        let json = r#"{"logStream": "i-0abc123def4567890"}"#;
        assert!(serde_json::from_str::<LogBatch>(json).is_err());
    }

    #[test]
    fn test_control_message() {
        let mut batch = LogBatch::new("stream", Vec::new());
        batch.message_type = Some(CONTROL_MESSAGE.to_string());
        assert!(batch.is_control_message());
    }

    #[test]
    fn test_unit_serializes_to_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&Unit::KilobytesPerSecond).unwrap(),
            "\"Kilobytes/Second\""
        );
        assert_eq!(serde_json::to_string(&Unit::Percent).unwrap(), "\"Percent\"");
        assert_eq!(Unit::CountPerSecond.as_str(), "Count/Second");
    }

    #[test]
    fn test_datum_wire_shape() {
        let datum = MetricDatum::from_measurement("PCoIP", make_record(MetricValue::Integer(300)));
        let v = serde_json::to_value(&datum).unwrap();
        assert_eq!(v["namespace"], "PCoIP");
        assert_eq!(v["metricName"], "PCoIPAvgTx");
        assert_eq!(v["unit"], "Kilobytes/Second");
        assert_eq!(v["dimensions"][0]["name"], "InstanceId");
        assert_eq!(v["dimensions"][0]["value"], "i-0abc123def4567890");
        assert_eq!(v["value"], 300);
        assert!(v["value"].is_i64());
        assert_eq!(v["timestampIso"], "2023-11-14T22:13:20.123000Z");
        assert_eq!(datum.instance_id(), Some("i-0abc123def4567890"));
    }

    #[test]
    fn test_float_value_serializes_as_number() {
        let datum = MetricDatum::from_measurement("ns", make_record(MetricValue::Float(0.25)));
        let v = serde_json::to_value(&datum).unwrap();
        assert!(v["value"].is_f64());
        assert_eq!(MetricValue::Integer(7).as_f64(), 7.0);
    }
}
