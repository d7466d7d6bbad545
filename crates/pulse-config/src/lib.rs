use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pulse.toml";

/// Environment variables consulted for the namespace, in priority order.
pub const NAMESPACE_ENV_VARS: &[&str] = &["PULSE_NAMESPACE", "metrics_namespace"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("metrics namespace is not configured (set `namespace`, PULSE_NAMESPACE or metrics_namespace)")]
    MissingNamespace,

    #[error("unknown sink kind: {0} (expected json, http or prometheus)")]
    UnknownSink(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// TOML data model
// ---------------------------------------------------------------------------

/// Where measurements are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// JSON lines on stdout.
    #[default]
    Json,
    /// HTTP POST per measurement.
    Http,
    /// Prometheus text samples on stdout.
    Prometheus,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Http => "http",
            Self::Prometheus => "prometheus",
        }
    }
}

impl FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "http" => Ok(Self::Http),
            "prometheus" | "prom" => Ok(Self::Prometheus),
            other => Err(ConfigError::UnknownSink(other.to_string())),
        }
    }
}

/// Sink section (`[sink]`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    /// Ingestion URL, required for the http sink.
    pub endpoint: Option<String>,
    /// Per-request timeout in ms for the http sink.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            endpoint: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Logging section (`[log]`).
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct LogConfig {
    /// `tracing` env-filter directive, e.g. "info,pulse_log_engine=debug".
    pub filter: Option<String>,
}

/// Top-level TOML config file (`pulse.toml`).
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct PulseConfig {
    /// Metrics namespace every measurement is published under.
    pub namespace: Option<String>,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Command-line overrides; `None` keeps the file/env value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub namespace: Option<String>,
    pub sink: Option<SinkKind>,
    pub endpoint: Option<String>,
}

/// Fully resolved, validated settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub namespace: String,
    pub sink: SinkConfig,
    pub log_filter: Option<String>,
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

fn default_timeout_ms() -> u64 {
    5000
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
pub fn load(path: &Path) -> Result<PulseConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Load `path` if given, else `pulse.toml` when present, else defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<PulseConfig> {
    match path {
        Some(p) => load(p),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                load(default_path)
            } else {
                Ok(PulseConfig::default())
            }
        }
    }
}

/// Parse TOML string into a PulseConfig.
pub fn parse(toml_str: &str) -> Result<PulseConfig> {
    let config: PulseConfig = toml::from_str(toml_str)?;
    validate(&config)?;
    Ok(config)
}

impl PulseConfig {
    /// Overlay environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ns) = NAMESPACE_ENV_VARS.iter().find_map(|k| lookup(*k)) {
            self.namespace = Some(ns);
        }
        if let Some(kind) = lookup("PULSE_SINK") {
            self.sink.kind = kind.parse()?;
        }
        if let Some(endpoint) = lookup("PULSE_SINK_ENDPOINT") {
            self.sink.endpoint = Some(endpoint);
        }
        if let Some(filter) = lookup("PULSE_LOG") {
            self.log.filter = Some(filter);
        }
        Ok(())
    }

    /// Overlay the process environment.
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|k| std::env::var(k).ok())
    }

    /// Apply CLI overrides and validate into final settings.
    pub fn resolve(mut self, overrides: &CliOverrides) -> Result<Settings> {
        if let Some(ref ns) = overrides.namespace {
            self.namespace = Some(ns.clone());
        }
        if let Some(kind) = overrides.sink {
            self.sink.kind = kind;
        }
        if let Some(ref endpoint) = overrides.endpoint {
            self.sink.endpoint = Some(endpoint.clone());
        }

        validate(&self)?;
        let namespace = self.namespace.ok_or(ConfigError::MissingNamespace)?;

        if self.sink.kind == SinkKind::Http && self.sink.endpoint.is_none() {
            return Err(ConfigError::Validation(
                "sink kind 'http' requires an endpoint".into(),
            ));
        }

        Ok(Settings {
            namespace,
            sink: self.sink,
            log_filter: self.log.filter,
        })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &PulseConfig) -> Result<()> {
    if let Some(ref ns) = config.namespace {
        if ns.trim().is_empty() {
            return Err(ConfigError::Validation(
                "namespace must not be empty".into(),
            ));
        }
        if ns.len() > 255 {
            return Err(ConfigError::Validation(format!(
                "namespace must be at most 255 characters, got {}",
                ns.len()
            )));
        }
    }

    if config.sink.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "sink timeout_ms must be >= 100, got {}",
            config.sink.timeout_ms
        )));
    }

    if let Some(ref endpoint) = config.sink.endpoint {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "sink endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }
    }

    Ok(())
}
