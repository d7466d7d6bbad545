use comfy_table::{Cell, Table};
use pulse_core::PulseError;
use pulse_log_engine::RuleRegistry;

pub fn run(json: bool) -> Result<(), PulseError> {
    let registry = RuleRegistry::builtin();

    if json {
        println!("{}", rules_json(&registry)?);
    } else {
        println!("{}", rules_table(&registry));
    }
    Ok(())
}

fn rules_json(registry: &RuleRegistry) -> Result<String, PulseError> {
    let rules: Vec<_> = registry
        .rules()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            serde_json::json!({
                "index": i,
                "name": r.name(),
                "pattern": r.pattern().as_str(),
                "outputs": r.outputs(),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rules)?)
}

/// One row per output; a rule without outputs still gets a placeholder row.
fn rules_table(registry: &RuleRegistry) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Rule", "Metric", "Unit", "Group"]);

    for (i, rule) in registry.rules().iter().enumerate() {
        if rule.outputs().is_empty() {
            table.add_row(vec![
                Cell::new(i),
                Cell::new(rule.name()),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
            ]);
            continue;
        }
        for spec in rule.outputs() {
            table.add_row(vec![
                Cell::new(i),
                Cell::new(rule.name()),
                Cell::new(&spec.metric_name),
                Cell::new(spec.unit.as_str()),
                Cell::new(&spec.group),
            ]);
        }
    }
    table
}
