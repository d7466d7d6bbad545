use std::sync::Arc;

use pulse_core::{LogBatch, LogRecord, MeasurementRecord};
use regex::Captures;

use crate::coerce::coerce;
use crate::format::format_timestamp_iso;
use crate::registry::{ExtractionRule, MetricSpec, RuleRegistry};

/// Classifies log lines against an ordered rule registry and yields
/// measurements for the first rule that matches.
#[derive(Debug, Clone)]
pub struct Extractor {
    registry: Arc<RuleRegistry>,
}

impl Extractor {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    /// Extractor over the builtin PCoIP rules.
    pub fn with_defaults() -> Self {
        Self::new(RuleRegistry::builtin())
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Index and rule of the first rule matching `message`, if any.
    pub fn classify(&self, message: &str) -> Option<(usize, &ExtractionRule)> {
        self.registry
            .rules()
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.pattern().is_match(message))
    }

    fn first_match<'a>(
        &'a self,
        message: &'a str,
    ) -> Option<(usize, &'a ExtractionRule, Captures<'a>)> {
        self.registry
            .rules()
            .iter()
            .enumerate()
            .find_map(|(index, rule)| rule.pattern().captures(message).map(|c| (index, rule, c)))
    }

    /// Measurements for a single line.
    ///
    /// `None` when no rule claims the line. A claimed line may still yield
    /// nothing if its captures are empty or not numeric.
    pub fn extract_line<'a>(
        &'a self,
        record: &'a LogRecord,
        origin_id: &'a str,
    ) -> Option<Measurements<'a>> {
        let (rule_index, rule, captures) = self.first_match(&record.message)?;
        tracing::debug!(rule = rule.name(), rule_index, "log line matched");

        let Some(timestamp_iso) = format_timestamp_iso(record.timestamp_ms) else {
            tracing::warn!(
                rule = rule.name(),
                timestamp_ms = record.timestamp_ms,
                "timestamp out of range, skipping line"
            );
            return None;
        };

        Some(Measurements {
            rule,
            rule_index,
            captures,
            outputs: rule.outputs().iter(),
            origin_id,
            timestamp_iso,
        })
    }

    /// All measurements of a batch, lazily, in source order.
    pub fn extract<'a>(
        &'a self,
        batch: &'a LogBatch,
        origin_id: &'a str,
    ) -> impl Iterator<Item = MeasurementRecord> + 'a {
        batch
            .events
            .iter()
            .filter_map(move |record| self.extract_line(record, origin_id))
            .flatten()
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Lazy sequence of measurements produced by one matched line.
pub struct Measurements<'a> {
    rule: &'a ExtractionRule,
    rule_index: usize,
    captures: Captures<'a>,
    outputs: std::slice::Iter<'a, MetricSpec>,
    origin_id: &'a str,
    timestamp_iso: String,
}

impl<'a> Measurements<'a> {
    pub fn rule(&self) -> &'a ExtractionRule {
        self.rule
    }

    pub fn rule_index(&self) -> usize {
        self.rule_index
    }

    fn measure(&self, spec: &MetricSpec) -> Option<MeasurementRecord> {
        let text = self
            .captures
            .name(&spec.group)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty());
        let Some(text) = text else {
            tracing::debug!(metric = %spec.metric_name, group = %spec.group, "empty capture, skipping");
            return None;
        };

        match coerce(text) {
            Ok(value) => Some(MeasurementRecord {
                metric_name: spec.metric_name.clone(),
                unit: spec.unit,
                origin_id: self.origin_id.to_string(),
                value,
                timestamp_iso: self.timestamp_iso.clone(),
            }),
            Err(e) => {
                tracing::debug!(metric = %spec.metric_name, error = %e, "capture not numeric, skipping");
                None
            }
        }
    }
}

impl Iterator for Measurements<'_> {
    type Item = MeasurementRecord;

    fn next(&mut self) -> Option<MeasurementRecord> {
        while let Some(spec) = self.outputs.next() {
            if let Some(record) = self.measure(spec) {
                return Some(record);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{MetricValue, Unit};

    const ORIGIN: &str = "i-0abc123def4567890";
    const TS: i64 = 1700000000123;

    fn make_record(msg: &str) -> LogRecord {
        LogRecord::new(TS, msg)
    }

    fn extract_all(e: &Extractor, msg: &str) -> Vec<MeasurementRecord> {
        let record = make_record(msg);
        e.extract_line(&record, ORIGIN)
            .map(|m| m.collect())
            .unwrap_or_default()
    }

    fn values(records: &[MeasurementRecord]) -> Vec<(&str, MetricValue)> {
        records
            .iter()
            .map(|r| (r.metric_name.as_str(), r.value))
            .collect()
    }

    #[test]
    fn test_bandwidth_scenario() {
        let e = Extractor::with_defaults();
        let out = extract_all(
            &e,
            "MGMT_PCOIP_DATA ... Tx thread info ... bw limit 1500 ... avg tx 300 ... avg rx 250",
        );
        assert_eq!(
            values(&out),
            vec![
                ("PCoIPBandwidthLimit", MetricValue::Integer(1500)),
                ("PCoIPAvgTx", MetricValue::Integer(300)),
                ("PCoIPAvgRx", MetricValue::Integer(250)),
            ]
        );
        for r in &out {
            assert_eq!(r.unit, Unit::KilobytesPerSecond);
            assert_eq!(r.origin_id, ORIGIN);
            assert_eq!(r.timestamp_iso, "2023-11-14T22:13:20.123000Z");
        }
    }

    #[test]
    fn test_bandwidth_agent_format() {
        let e = Extractor::with_defaults();
        let out = extract_all(
            &e,
            "2023-11-14T22:13:20.123Z 00000000-0000 LVL:2 RC:   0 MGMT_PCOIP_DATA :Tx thread info: bw limit = 12500, avg tx = 45.7, avg rx = 3.2 (KBytes/s)",
        );
        assert_eq!(
            values(&out),
            vec![
                ("PCoIPBandwidthLimit", MetricValue::Integer(12500)),
                ("PCoIPAvgTx", MetricValue::Float(45.7)),
                ("PCoIPAvgRx", MetricValue::Float(3.2)),
            ]
        );
    }

    #[test]
    fn test_latency_line() {
        let e = Extractor::with_defaults();
        let out = extract_all(
            &e,
            "MGMT_PCOIP_DATA :Tx thread info: round trip time (ms) = 30, variance = 5, rto = 230, last = 29, max = 255",
        );
        assert_eq!(
            values(&out),
            vec![
                ("PCoIPRoundTripTime", MetricValue::Integer(30)),
                ("PCoIPVariance", MetricValue::Integer(5)),
            ]
        );
        assert!(out.iter().all(|r| r.unit == Unit::Milliseconds));
    }

    #[test]
    fn test_packet_loss_line() {
        let e = Extractor::with_defaults();
        let out = extract_all(
            &e,
            "VGMAC :Stat frms: R=000000/000000/003322  T=003288/012121/000000 (A/I/O) Loss=0.25%/1.50% (R/T)",
        );
        assert_eq!(
            values(&out),
            vec![
                ("PCoIPPackeLossR", MetricValue::Float(0.25)),
                ("PCoIPPackeLossT", MetricValue::Float(1.5)),
            ]
        );
    }

    #[test]
    fn test_floor_line_claimed_without_output() {
        let e = Extractor::with_defaults();
        let record = make_record(
            "MGMT_PCOIP_DATA :ubs-BW-decr: Decrease (loss) loss=0.020 current[kbit/s]=8010.2622, active[kbit/s]=8138.6580 -> 7982.6572, adjust factor=2.50%, floor[kbit/s]=104.0000",
        );
        let m = e.extract_line(&record, ORIGIN).expect("floor rule claims the line");
        assert_eq!(m.rule_index(), 3);
        assert_eq!(m.rule().name(), "Floor metrics");
        assert_eq!(m.count(), 0);
    }

    #[test]
    fn test_image_quality_line() {
        let e = Extractor::with_defaults();
        let out = extract_all(&e, "MGMT_IMG :log (SoftIPC) tbl 222 fps 29.97 quality 90");
        assert_eq!(
            values(&out),
            vec![
                ("PCoIPQuality", MetricValue::Integer(90)),
                ("PCoIPFPS", MetricValue::Float(29.97)),
                ("PCoIPTBL", MetricValue::Integer(222)),
            ]
        );
    }

    #[test]
    fn test_non_ascii_digits_captured_and_coerced() {
        let e = Extractor::with_defaults();
        let out = extract_all(&e, "MGMT_IMG :log (SoftIPC) tbl ٣ fps 2 quality 3");
        assert_eq!(
            values(&out),
            vec![
                ("PCoIPQuality", MetricValue::Integer(3)),
                ("PCoIPFPS", MetricValue::Integer(2)),
                ("PCoIPTBL", MetricValue::Integer(3)),
            ]
        );
    }

    #[test]
    fn test_image_bits_line() {
        let e = Extractor::with_defaults();
        let out = extract_all(
            &e,
            "MGMT_IMG :log (SoftIPC) bits/pixel - 0.59, bits/sec - 3500000, MPix/sec - 14.2",
        );
        assert_eq!(
            values(&out),
            vec![
                ("PCoIPBitsPerPixel", MetricValue::Float(0.59)),
                ("PCoIPBitsPerSec", MetricValue::Integer(3500000)),
                ("PCoIPMpixPerSec", MetricValue::Float(14.2)),
            ]
        );
    }

    #[test]
    fn test_overlapping_image_rules_first_wins() {
        let e = Extractor::with_defaults();
        let msg = "MGMT_IMG :log (SoftIPC) tbl 1 fps 30 quality 80 bits/pixel 2 bits/sec 3 MPix/sec 4";
        let (index, _) = e.classify(msg).unwrap();
        assert_eq!(index, 4);
        let names: Vec<String> = extract_all(&e, msg).into_iter().map(|r| r.metric_name).collect();
        assert_eq!(names, vec!["PCoIPQuality", "PCoIPFPS", "PCoIPTBL"]);
    }

    #[test]
    fn test_unmatched_line() {
        let e = Extractor::with_defaults();
        let record = make_record("Server started on port 3000");
        assert!(e.extract_line(&record, ORIGIN).is_none());
        assert!(e.classify(&record.message).is_none());
    }

    #[test]
    fn test_empty_capture_skips_only_that_metric() {
        let e = Extractor::with_defaults();
        let out = extract_all(
            &e,
            "MGMT_PCOIP_DATA :Tx thread info: bw limit = , avg tx = 300, avg rx = 250",
        );
        assert_eq!(
            values(&out),
            vec![
                ("PCoIPAvgTx", MetricValue::Integer(300)),
                ("PCoIPAvgRx", MetricValue::Integer(250)),
            ]
        );
    }

    #[test]
    fn test_unparsable_capture_skips_only_that_metric() {
        let e = Extractor::with_defaults();
        let out = extract_all(
            &e,
            "MGMT_PCOIP_DATA :Tx thread info: bw limit = 1.2.3, avg tx = 300, avg rx = 250",
        );
        let names: Vec<&str> = out.iter().map(|r| r.metric_name.as_str()).collect();
        assert_eq!(names, vec!["PCoIPAvgTx", "PCoIPAvgRx"]);
    }

    #[test]
    fn test_earliest_matching_rule_wins() {
        let registry = RuleRegistry::builder()
            .rule("generic", r"value (?P<v>[\d.]*)", vec![MetricSpec::new("Generic", Unit::Count, "v")])
            .unwrap()
            .rule("specific", r"cpu value (?P<v>[\d.]*)", vec![MetricSpec::new("Cpu", Unit::Percent, "v")])
            .unwrap()
            .build();
        let e = Extractor::new(Arc::new(registry));
        let out = extract_all(&e, "cpu value 42");
        assert_eq!(values(&out), vec![("Generic", MetricValue::Integer(42))]);
    }

    #[test]
    fn test_out_of_range_timestamp_skips_line() {
        let e = Extractor::with_defaults();
        let record = LogRecord::new(i64::MAX, "MGMT_IMG :log (SoftIPC) tbl 1 fps 2 quality 3");
        assert!(e.extract_line(&record, ORIGIN).is_none());

        // Representable by chrono, but past year 9999.
        let record = LogRecord::new(253402300800000, "MGMT_IMG :log (SoftIPC) tbl 1 fps 2 quality 3");
        assert!(e.extract_line(&record, ORIGIN).is_none());
    }

    #[test]
    fn test_extract_batch_in_source_order() {
        let e = Extractor::with_defaults();
        let batch = LogBatch::new(
            ORIGIN,
            vec![
                LogRecord::new(1000, "MGMT_IMG :log (SoftIPC) tbl 1 fps 2 quality 3"),
                LogRecord::new(2000, "nothing to see here"),
                LogRecord::new(3000, "MGMT_PCOIP_DATA :Tx thread info: round trip time = 7, variance = 1, rto = 200, last = 7, max = 9"),
            ],
        );
        let out: Vec<MeasurementRecord> = e.extract(&batch, ORIGIN).collect();
        let names: Vec<&str> = out.iter().map(|r| r.metric_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["PCoIPQuality", "PCoIPFPS", "PCoIPTBL", "PCoIPRoundTripTime", "PCoIPVariance"]
        );
        assert_eq!(out[0].timestamp_iso, "1970-01-01T00:00:01.000000Z");
        assert_eq!(out[4].timestamp_iso, "1970-01-01T00:00:03.000000Z");
    }
}
