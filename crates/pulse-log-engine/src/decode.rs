use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use pulse_core::{DecodeError, EncodeError, LogBatch};
use serde::Deserialize;

/// Trigger envelope wrapping a payload: `{"awslogs": {"data": "<payload>"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvocationEvent {
    pub awslogs: AwsLogsData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwsLogsData {
    pub data: String,
}

impl InvocationEvent {
    /// Pull the payload out of an envelope, or treat the input as a bare payload.
    pub fn payload_from(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.starts_with('{') {
            if let Ok(event) = serde_json::from_str::<InvocationEvent>(trimmed) {
                return event.awslogs.data;
            }
        }
        trimmed.to_string()
    }
}

/// Decode base64 → gzip → UTF-8 → JSON into a `LogBatch`.
///
/// Stages run strictly in that order and the first failure aborts the batch.
pub fn decode_batch(payload: &str) -> Result<LogBatch, DecodeError> {
    let compressed = STANDARD
        .decode(payload.trim().as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    let mut raw = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut raw)
        .map_err(DecodeError::Decompress)?;

    let text = String::from_utf8(raw)?;
    let batch = serde_json::from_str(&text)?;
    Ok(batch)
}

/// Inverse of [`decode_batch`]: JSON → gzip → base64.
pub fn encode_batch(batch: &LogBatch) -> Result<String, EncodeError> {
    let json = serde_json::to_vec(batch)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}
