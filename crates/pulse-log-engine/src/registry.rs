use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use pulse_core::Unit;
use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("rule '{rule}': invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule}': metric '{metric}' references unknown group '{group}'")]
    UnknownGroup {
        rule: String,
        metric: String,
        group: String,
    },

    #[error("rule '{rule}': metric '{metric}' is defined twice")]
    DuplicateMetric { rule: String, metric: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;

// ---------------------------------------------------------------------------
// Rule data
// ---------------------------------------------------------------------------

/// One output measurement of a rule, read from a named capture group.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricSpec {
    pub metric_name: String,
    pub unit: Unit,
    pub group: String,
}

impl MetricSpec {
    pub fn new(metric_name: &str, unit: Unit, group: &str) -> Self {
        Self {
            metric_name: metric_name.to_string(),
            unit,
            group: group.to_string(),
        }
    }
}

/// A compiled pattern plus the measurements it yields when it matches.
///
/// Construction checks that every output names a group of the pattern.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    name: String,
    pattern: Regex,
    outputs: Vec<MetricSpec>,
}

impl ExtractionRule {
    pub fn new(name: &str, pattern: &str, outputs: Vec<MetricSpec>) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| RegistryError::InvalidPattern {
            rule: name.to_string(),
            source,
        })?;

        let groups: HashSet<&str> = pattern.capture_names().flatten().collect();
        let mut seen = HashSet::new();
        for spec in &outputs {
            if !groups.contains(spec.group.as_str()) {
                return Err(RegistryError::UnknownGroup {
                    rule: name.to_string(),
                    metric: spec.metric_name.clone(),
                    group: spec.group.clone(),
                });
            }
            if !seen.insert(spec.metric_name.as_str()) {
                return Err(RegistryError::DuplicateMetric {
                    rule: name.to_string(),
                    metric: spec.metric_name.clone(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            pattern,
            outputs,
        })
    }

    /// Diagnostic name; not required to be unique.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn outputs(&self) -> &[MetricSpec] {
        &self.outputs
    }
}

/// Static rule definition, compiled into an `ExtractionRule` at startup.
pub struct RuleDef {
    pub name: &'static str,
    pub pattern: &'static str,
    pub outputs: &'static [(&'static str, Unit, &'static str)],
}

impl RuleDef {
    pub fn compile(&self) -> Result<ExtractionRule> {
        let outputs = self
            .outputs
            .iter()
            .map(|(metric, unit, group)| MetricSpec::new(metric, *unit, group))
            .collect();
        ExtractionRule::new(self.name, self.pattern, outputs)
    }
}

/// PCoIP agent log rules. Order is significant: the first matching rule
/// claims the line, so more specific patterns come first.
pub const BUILTIN_RULES: &[RuleDef] = &[
    RuleDef {
        name: "Bandwidth metrics",
        pattern: r".*MGMT_PCOIP_DATA.*Tx thread info.*(?P<bw_group>bw limit\D*(?P<bw>[\d.]*))\W*(?P<avg_tx_group>avg tx\D*(?P<avg_tx>[\d.]*))\W*(?P<avg_rx_group>avg rx\D*(?P<avg_rx>[\d.]*)).*",
        outputs: &[
            ("PCoIPBandwidthLimit", Unit::KilobytesPerSecond, "bw"),
            ("PCoIPAvgTx", Unit::KilobytesPerSecond, "avg_tx"),
            ("PCoIPAvgRx", Unit::KilobytesPerSecond, "avg_rx"),
        ],
    },
    RuleDef {
        name: "Latency metrics",
        pattern: r".*MGMT_PCOIP_DATA.*Tx thread info.*(?P<rtt_group>round trip time\D*(?P<rtt>[\d.]*))\W*(?P<variance_group>variance\D*(?P<variance>[\d.]*))\W*(?P<rto_group>rto = (?P<rto>[\d.]*))\W*(?P<last_group>last\D*(?P<last>[\d.]*))\W*(?P<max_group>max\D*(?P<max>[\d.]*)).*",
        outputs: &[
            ("PCoIPRoundTripTime", Unit::Milliseconds, "rtt"),
            ("PCoIPVariance", Unit::Milliseconds, "variance"),
        ],
    },
    RuleDef {
        name: "Packet loss metrics",
        pattern: r".*VGMAC.*Stat frms\W*(?P<R>R\D*(?P<r_a>[\d.]*)/(?P<r_i>[\d.]*)/(?P<r_o>[\d.]*))\W*(?P<T>T\D*(?P<t_a>[\d.]*)/(?P<t_i>[\d.]*)/(?P<t_o>[\d.]*)).*(?P<loss>Loss\D*(?P<r_loss>[\d.]*)%/(?P<t_loss>[\d.]*)%).*",
        outputs: &[
            ("PCoIPPackeLossR", Unit::Percent, "r_loss"),
            ("PCoIPPackeLossT", Unit::Percent, "t_loss"),
        ],
    },
    // Claims adaptive-floor lines without publishing anything.
    RuleDef {
        name: "Floor metrics",
        pattern: r".*MGMT_PCOIP_DATA.*ubs-BW-decr\W*(?P<decrease_loss_group>Decrease\D*(?P<decrease_loss>[\d.]*))\W*(?P<current_group>current\D*(?P<current>[\d.]*))\W*(?P<active_group>active\D*(?P<active_from>[\d.]*)\D*(?P<active_to>[\d.]*))\W*(?P<adjust_factor_group>adjust factor\D*(?P<adjust_factor>[\d.]*)%)\W*(?P<floor_group>floor\D*(?P<floor>[\d.]*))\W*",
        outputs: &[],
    },
    RuleDef {
        name: "Image metrics",
        pattern: r".*MGMT_IMG.*log \(SoftIPC\).*(?P<tbl_group>tbl\W*(?P<tbl>[\d.]*))\W*(?P<fps_group>fps\W*(?P<fps>[\d.]*))\W*(?P<q_group>quality\W*(?P<quality>[\d.]*)).*",
        outputs: &[
            ("PCoIPQuality", Unit::Percent, "quality"),
            ("PCoIPFPS", Unit::Count, "fps"),
            ("PCoIPTBL", Unit::Count, "tbl"),
        ],
    },
    // Shares its prefix with the rule above, which wins on lines satisfying both.
    RuleDef {
        name: "Image metrics",
        pattern: r".*MGMT_IMG.*log \(SoftIPC\).*(?P<group1>bits/pixel\W*(?P<bits_pixel>[\d.]*))\W*(?P<group2>bits/sec\W*(?P<bits_sec>[\d.]*))\W*(?P<group3>MPix/sec\W*(?P<mpix_sec>[\d.]*)).*",
        outputs: &[
            ("PCoIPBitsPerPixel", Unit::Count, "bits_pixel"),
            ("PCoIPBitsPerSec", Unit::Count, "bits_sec"),
            ("PCoIPMpixPerSec", Unit::Count, "mpix_sec"),
        ],
    },
];

static BUILTIN: LazyLock<Arc<RuleRegistry>> = LazyLock::new(|| {
    Arc::new(RuleRegistry::from_defs(BUILTIN_RULES).expect("builtin rule fixture is valid"))
});

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered, immutable collection of extraction rules.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<ExtractionRule>,
}

impl RuleRegistry {
    /// Shared handle to the builtin PCoIP rules.
    pub fn builtin() -> Arc<RuleRegistry> {
        Arc::clone(&BUILTIN)
    }

    pub fn from_defs(defs: &[RuleDef]) -> Result<Self> {
        let rules = defs.iter().map(RuleDef::compile).collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Appends rules in evaluation order.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    rules: Vec<ExtractionRule>,
}

impl RegistryBuilder {
    pub fn rule(mut self, name: &str, pattern: &str, outputs: Vec<MetricSpec>) -> Result<Self> {
        self.rules.push(ExtractionRule::new(name, pattern, outputs)?);
        Ok(self)
    }

    pub fn push(mut self, rule: ExtractionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn build(self) -> RuleRegistry {
        RuleRegistry { rules: self.rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_compiles_in_order() {
        let registry = RuleRegistry::builtin();
        let names: Vec<&str> = registry.rules().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec![
                "Bandwidth metrics",
                "Latency metrics",
                "Packet loss metrics",
                "Floor metrics",
                "Image metrics",
                "Image metrics",
            ]
        );
    }

    #[test]
    fn test_builtin_output_counts() {
        let registry = RuleRegistry::builtin();
        let counts: Vec<usize> = registry.rules().iter().map(|r| r.outputs().len()).collect();
        assert_eq!(counts, vec![3, 2, 2, 0, 3, 3]);
    }

    #[test]
    fn test_builtin_units() {
        let registry = RuleRegistry::builtin();
        let bandwidth = &registry.rules()[0];
        assert!(bandwidth
            .outputs()
            .iter()
            .all(|o| o.unit == Unit::KilobytesPerSecond));
        let image = &registry.rules()[4];
        assert_eq!(image.outputs()[0], MetricSpec::new("PCoIPQuality", Unit::Percent, "quality"));
    }

    #[test]
    fn test_builtin_is_shared() {
        assert!(Arc::ptr_eq(&RuleRegistry::builtin(), &RuleRegistry::builtin()));
    }

    #[test]
    fn test_unknown_group_rejected() {
        let err = ExtractionRule::new(
            "bad",
            r"fps (?P<fps>\d+)",
            vec![MetricSpec::new("FPS", Unit::Count, "frames")],
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownGroup { ref group, .. } if group == "frames"));
    }

    #[test]
    fn test_duplicate_metric_rejected() {
        let err = ExtractionRule::new(
            "dup",
            r"a (?P<a>\d+) b (?P<b>\d+)",
            vec![
                MetricSpec::new("Same", Unit::Count, "a"),
                MetricSpec::new("Same", Unit::Count, "b"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateMetric { .. }));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = ExtractionRule::new("broken", r"(?P<x>[\d.]*", Vec::new()).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPattern { .. }));

        // Group names must be unique within a pattern.
        let err = ExtractionRule::new("twice", r"(?P<x>\d)(?P<x>\d)", Vec::new()).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPattern { .. }));
    }

    #[test]
    fn test_builder_keeps_order() {
        let registry = RuleRegistry::builder()
            .rule("first", r"alpha (?P<n>\d+)", vec![MetricSpec::new("A", Unit::Count, "n")])
            .unwrap()
            .rule("second", r"beta (?P<n>\d+)", vec![MetricSpec::new("B", Unit::Count, "n")])
            .unwrap()
            .build();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.rules()[0].name(), "first");
        assert_eq!(registry.rules()[1].name(), "second");
        assert!(RuleRegistry::default().is_empty());
    }
}
