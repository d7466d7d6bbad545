use std::path::PathBuf;

use pulse_core::{LogBatch, LogRecord, PulseError};
use pulse_log_engine::encode_batch;

pub fn run(file: Option<PathBuf>, log_stream: String, envelope: bool) -> Result<(), PulseError> {
    let input = super::read_input(file.as_deref())?;
    let now_ms = chrono::Utc::now().timestamp_millis();

    let events: Vec<LogRecord> = input
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| parse_line(l, now_ms))
        .collect();
    tracing::debug!(lines = events.len(), "encoding batch");

    let payload = encode_batch(&LogBatch::new(log_stream, events))?;

    if envelope {
        println!("{}", serde_json::json!({ "awslogs": { "data": payload } }));
    } else {
        println!("{payload}");
    }
    Ok(())
}

/// `1700000000123\tmessage` keeps its timestamp; a bare line gets `default_ms`.
fn parse_line(line: &str, default_ms: i64) -> LogRecord {
    if let Some((ts, message)) = line.split_once('\t') {
        if let Ok(ms) = ts.trim().parse::<i64>() {
            return LogRecord::new(ms, message);
        }
    }
    LogRecord::new(default_ms, line)
}
