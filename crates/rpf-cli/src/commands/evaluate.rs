use clap::Args;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use rpf_core::asset::{AssetInputs, AssetResults};
use rpf_core::plan::EvaluationPlan;
use rpf_core::{default_objects, Evaluation, InputValue, ObjectId, OutputValue, Scenario};

use crate::input;

/// Arguments for scenario evaluation
#[derive(Args)]
pub struct EvaluateArgs {
    /// Scenario JSON: `{ "objects": [...]?, "overrides": {...} }`
    #[arg(long)]
    pub input: Option<String>,

    /// Asset-input JSON whose fields are applied as overrides
    #[arg(long)]
    pub asset: Option<String>,

    /// Single override, e.g. `capex.total_capex=90000000` or
    /// `operating_debt.principal_source=manual` (repeatable)
    #[arg(long = "set", value_name = "OBJECT.INPUT=VALUE")]
    pub set: Vec<String>,

    /// Print the per-asset results summary instead of every output
    #[arg(long, conflicts_with = "full")]
    pub results: bool,

    /// Print the full evaluation (order, object status, issues)
    #[arg(long)]
    pub full: bool,
}

pub fn run_evaluate(args: EvaluateArgs, display: bool) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: Scenario = input::load(args.input.as_deref())?.unwrap_or_default();
    let mut store = scenario.into_store();

    if let Some(ref path) = args.asset {
        let asset: AssetInputs = input::read_file(path)?;
        store.merge(asset.to_overrides())?;
    }
    for assignment in &args.set {
        let (object, name, value) = parse_assignment(assignment)?;
        store.set_input(object, &name, value)?;
    }

    let mut out = store.evaluate()?;
    if display {
        out.result = out.result.for_display(store.definitions());
    }

    if args.results {
        let results = AssetResults::from_evaluation(&out.result);
        return Ok(json!({
            "result": results,
            "methodology": out.methodology,
            "warnings": out.warnings,
        }));
    }
    if args.full {
        return Ok(serde_json::to_value(out)?);
    }

    let mut value = serde_json::to_value(&out)?;
    value["result"] = serde_json::to_value(flatten(&out.result))?;
    Ok(value)
}

/// `object.output` → value, skipped objects omitted.
fn flatten(evaluation: &Evaluation) -> IndexMap<String, OutputValue> {
    evaluation
        .objects
        .iter()
        .flat_map(|(id, r)| {
            r.outputs
                .iter()
                .map(move |(key, v)| (format!("{id}.{key}"), v.clone()))
        })
        .collect()
}

fn parse_assignment(raw: &str) -> Result<(ObjectId, String, InputValue), Box<dyn std::error::Error>> {
    let (target, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected OBJECT.INPUT=VALUE, got '{raw}'"))?;
    let (object, name) = target
        .split_once('.')
        .ok_or_else(|| format!("expected OBJECT.INPUT before '=', got '{target}'"))?;
    let object: ObjectId = object.trim().parse()?;
    let value = value.trim();
    let value = match value.parse::<Decimal>() {
        Ok(n) => InputValue::Number(n),
        Err(_) => InputValue::Choice(value.to_string()),
    };
    Ok((object, name.trim().to_string(), value))
}

pub fn run_objects() -> Result<Value, Box<dyn std::error::Error>> {
    let rows: Vec<Value> = default_objects()
        .iter()
        .map(|o| {
            json!({
                "id": o.id,
                "name": o.name,
                "inputs": o.inputs.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
                "outputs": o.outputs.iter().map(|out| out.id.as_str()).collect::<Vec<_>>(),
                "depends_on": o.id.bindings().iter().map(|b| format!("{}.{}", b.from, b.output)).collect::<Vec<_>>(),
            })
        })
        .collect();
    Ok(Value::Array(rows))
}

/// Arguments for printing the evaluation plan
#[derive(Args)]
pub struct PlanArgs {
    /// Scenario JSON; its `objects` replace the built-in definitions
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_plan(args: PlanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: Scenario = input::load(args.input.as_deref())?.unwrap_or_default();
    let store = scenario.into_store();
    let plan = EvaluationPlan::build(store.definitions())?;
    let rows: Vec<Value> = plan
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            json!({
                "step": i + 1,
                "object": step.object,
                "depends_on": step.depends_on,
            })
        })
        .collect();
    Ok(Value::Array(rows))
}
