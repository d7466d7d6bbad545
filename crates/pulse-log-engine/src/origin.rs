use std::sync::LazyLock;

use pulse_core::PulseError;
use regex::Regex;

static RE_INSTANCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"i-[a-zA-Z0-9]{17}").expect("instance id pattern"));

/// Find the node instance id (`i-` + 17 alphanumerics) in a log stream name.
///
/// Returns the first occurrence. A stream without one cannot be attributed,
/// so the whole batch fails with `OriginNotFound`.
pub fn resolve_origin(log_stream: &str) -> Result<&str, PulseError> {
    RE_INSTANCE_ID
        .find(log_stream)
        .map(|m| m.as_str())
        .ok_or_else(|| PulseError::OriginNotFound(log_stream.to_string()))
}
