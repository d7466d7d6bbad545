use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::DateTime;
use pulse_core::{MetricDatum, SinkError};

use crate::sink::MetricsSink;

/// Writes each datum as a Prometheus text-format sample with an explicit
/// millisecond timestamp.
///
/// `# HELP` / `# TYPE` headers are emitted the first time a metric is seen.
pub struct PrometheusSink<W: Write + Send> {
    state: Mutex<PromState<W>>,
}

struct PromState<W> {
    out: W,
    described: HashSet<String>,
}

impl<W: Write + Send> PrometheusSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            state: Mutex::new(PromState {
                out,
                described: HashSet::new(),
            }),
        }
    }

    pub fn into_inner(self) -> W {
        match self.state.into_inner() {
            Ok(s) => s.out,
            Err(poisoned) => poisoned.into_inner().out,
        }
    }
}

impl PrometheusSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> MetricsSink for PrometheusSink<W> {
    async fn put_metric(&self, datum: &MetricDatum) -> Result<(), SinkError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SinkError::Transport("prometheus sink writer poisoned".into()))?;

        let name = metric_name(&datum.namespace, &datum.metric_name);
        let mut text = String::new();
        if state.described.insert(name.clone()) {
            write_help_type(
                &mut text,
                &name,
                &format!("{} ({})", datum.metric_name, datum.unit),
                "gauge",
            );
        }
        text.push_str(&format_sample(&name, datum)?);

        state.out.write_all(text.as_bytes())?;
        state.out.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "prometheus"
    }
}

fn format_sample(name: &str, datum: &MetricDatum) -> Result<String, SinkError> {
    let ts = DateTime::parse_from_rfc3339(&datum.timestamp_iso)
        .map_err(|e| SinkError::Transport(format!("bad timestamp '{}': {e}", datum.timestamp_iso)))?
        .timestamp_millis();

    let labels: Vec<String> = datum
        .dimensions
        .iter()
        .map(|d| format!("{}=\"{}\"", label_name(&d.name), escape(&d.value)))
        .collect();

    let mut out = String::new();
    if labels.is_empty() {
        writeln!(out, "{name} {} {ts}", datum.value).ok();
    } else {
        writeln!(out, "{name}{{{}}} {} {ts}", labels.join(","), datum.value).ok();
    }
    Ok(out)
}

fn write_help_type(out: &mut String, name: &str, help: &str, metric_type: &str) {
    writeln!(out, "# HELP {name} {help}").ok();
    writeln!(out, "# TYPE {name} {metric_type}").ok();
}

/// `PCoIP` + `PCoIPAvgTx` → `pcoip_PCoIPAvgTx`; invalid characters become `_`.
fn metric_name(namespace: &str, metric: &str) -> String {
    let ns: String = sanitize(namespace).to_lowercase();
    let metric = sanitize(metric);
    if ns.is_empty() {
        metric
    } else {
        format!("{ns}_{metric}")
    }
}

/// `InstanceId` → `instance_id`
fn label_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in sanitize(name).chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Escape label values for Prometheus text format.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
