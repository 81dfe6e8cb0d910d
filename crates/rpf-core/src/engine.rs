//! Evaluates a full scenario: every object in dependency order, one pass.
use std::collections::HashSet;
use std::time::Instant;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::construction::{self, funding::SOURCES_USES_TOLERANCE};
use crate::costs;
use crate::diagnostics::{Diagnostics, Issue, IssueKind};
use crate::error::EngineError;
use crate::financing;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs, Overrides};
use crate::object::{CalculationObject, ObjectId};
use crate::plan::EvaluationPlan;
use crate::returns;
use crate::revenue;
use crate::timeline;
use crate::types::{with_metadata, ComputationOutput, OutputValue};
use crate::EngineResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStatus {
    Evaluated,
    /// Not evaluated: an own input is missing or invalid, or a source failed
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectResult {
    pub status: ObjectStatus,
    pub outputs: Outputs,
}

/// Outputs of every object for one input snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub order: Vec<ObjectId>,
    pub objects: IndexMap<ObjectId, ObjectResult>,
    pub issues: Vec<Issue>,
}

impl Evaluation {
    pub fn output(&self, object: ObjectId, key: &str) -> Option<&OutputValue> {
        self.objects.get(&object)?.outputs.get(key)
    }

    pub fn number(&self, object: ObjectId, key: &str) -> Option<Decimal> {
        self.output(object, key)?.as_number()
    }

    pub fn series(&self, object: ObjectId, key: &str) -> Option<&[Decimal]> {
        self.output(object, key)?.as_series()
    }

    pub fn is_evaluated(&self, object: ObjectId) -> bool {
        self.objects
            .get(&object)
            .is_some_and(|r| r.status == ObjectStatus::Evaluated)
    }

    pub fn issues_for(&self, object: ObjectId) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.object == object)
    }

    /// Copy with outputs rounded by unit: currency and energy to whole units,
    /// multiples and ratios to 2 dp, rates to 4 dp. Everything else is left
    /// at full precision.
    pub fn for_display(&self, definitions: &[CalculationObject]) -> Evaluation {
        let mut shown = self.clone();
        for (id, result) in shown.objects.iter_mut() {
            let Some(def) = definitions.iter().find(|d| d.id == *id) else {
                continue;
            };
            for (key, value) in result.outputs.iter_mut() {
                if let Some(dp) = def.output_unit(key).and_then(display_places) {
                    *value = value.rounded(dp);
                }
            }
        }
        shown
    }
}

fn display_places(unit: &str) -> Option<u32> {
    match unit {
        "$" | "MWh" | "$/MWh" => Some(0),
        "x" | "ratio" => Some(2),
        "rate" => Some(4),
        _ => None,
    }
}

fn run_object(
    id: ObjectId,
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    use ObjectId::*;
    match id {
        Timeline => timeline::evaluate(inputs, deps, diag),
        Volume => revenue::volume::evaluate(inputs, deps, diag),
        ContractedRevenue => revenue::contracted::evaluate(inputs, deps, diag),
        MerchantRevenue => revenue::merchant::evaluate(inputs, deps, diag),
        Revenue => revenue::aggregate::evaluate(inputs, deps, diag),
        FixedCosts => costs::fixed::evaluate(inputs, deps, diag),
        OperationalCapex => costs::operational_capex::evaluate(inputs, deps, diag),
        Opex => costs::opex::evaluate(inputs, deps, diag),
        Capex => construction::capex::evaluate(inputs, deps, diag),
        ConstructionDebt => construction::debt::evaluate(inputs, deps, diag),
        ConstructionEquity => construction::equity::evaluate(inputs, deps, diag),
        Funding => construction::funding::evaluate(inputs, deps, diag),
        CashflowBeforeDebt => financing::cfads::evaluate(inputs, deps, diag),
        DebtSizing => financing::sizing::evaluate(inputs, deps, diag),
        OperatingDebt => financing::operating_debt::evaluate(inputs, deps, diag),
        TaxDepreciation => returns::tax::evaluate(inputs, deps, diag),
        TerminalValue => returns::terminal::evaluate(inputs, deps, diag),
        EquityCashflow => returns::equity::evaluate(inputs, deps, diag),
        CashflowSummary => returns::summary::evaluate(inputs, deps, diag),
    }
}

/// Overrides may only target objects and inputs that are defined.
fn check_overrides(definitions: &[CalculationObject], overrides: &Overrides) -> EngineResult<()> {
    for (object, values) in overrides {
        let Some(def) = definitions.iter().find(|d| d.id == *object) else {
            return Err(EngineError::UnknownObject(object.to_string()));
        };
        if let Some(field) = values.keys().find(|k| def.input(k).is_none()) {
            return Err(EngineError::InvalidInput {
                object: object.to_string(),
                field: field.clone(),
                reason: "not an input of this object".into(),
            });
        }
    }
    Ok(())
}

/// Required inputs with neither a default nor an override.
fn missing_required(def: &CalculationObject, inputs: &ObjectInputs) -> Vec<Issue> {
    def.inputs
        .iter()
        .filter(|i| i.required && !inputs.contains(&i.id))
        .map(|i| {
            Issue::from_error(
                def.id,
                &EngineError::MissingInput {
                    object: def.id.to_string(),
                    field: i.id.clone(),
                },
            )
        })
        .collect()
}

fn check_sources_uses(evaluation: &Evaluation, diag: &mut Diagnostics) {
    let Some(delta) = evaluation.number(ObjectId::Funding, "sources_uses_delta") else {
        return;
    };
    if delta.abs() > SOURCES_USES_TOLERANCE {
        diag.note(
            ObjectId::Funding,
            IssueKind::SourcesUsesMismatch,
            Some("sources_uses_delta"),
            format!("sources exceed uses by {delta} (tolerance ±{SOURCES_USES_TOLERANCE})"),
        );
    }
}

/// Evaluate every object once, in dependency order.
///
/// Wiring errors (unknown dependency, undeclared output, cycle) and
/// overrides naming unknown objects or inputs fail the whole call. Input
/// problems fail only the object concerned: it and everything downstream
/// of it is skipped, and the rest of the scenario still evaluates.
pub fn evaluate(
    definitions: &[CalculationObject],
    overrides: &Overrides,
) -> EngineResult<ComputationOutput<Evaluation>> {
    let start = Instant::now();

    let plan = EvaluationPlan::build(definitions)?;
    check_overrides(definitions, overrides)?;

    let mut diag = Diagnostics::new();
    let mut failed: HashSet<ObjectId> = HashSet::new();
    let mut evaluation = Evaluation {
        order: plan.order().collect(),
        objects: IndexMap::new(),
        issues: Vec::new(),
    };

    for step in &plan.steps {
        let id = step.object;
        let Some(def) = definitions.iter().find(|d| d.id == id) else {
            continue;
        };
        let span = tracing::debug_span!("object", object = %id);
        let _enter = span.enter();

        let skipped = ObjectResult {
            status: ObjectStatus::Skipped,
            outputs: Outputs::new(),
        };

        if let Some(upstream) = step.depends_on.iter().find(|d| failed.contains(d)) {
            diag.note(
                id,
                IssueKind::UpstreamFailed,
                None,
                format!("not evaluated because '{upstream}' failed"),
            );
            failed.insert(id);
            evaluation.objects.insert(id, skipped);
            continue;
        }

        let inputs = ObjectInputs::resolve(def, overrides.get(&id));
        let missing = missing_required(def, &inputs);
        if !missing.is_empty() {
            for issue in missing {
                diag.push(issue);
            }
            failed.insert(id);
            evaluation.objects.insert(id, skipped);
            continue;
        }

        let mut deps = DependencyBundle::for_object(id);
        for binding in id.bindings() {
            if let Some(value) = evaluation.output(binding.from, binding.output) {
                deps.insert(binding.output, value.clone());
            }
        }

        match run_object(id, &inputs, &deps, &mut diag) {
            Ok(mut outputs) => {
                outputs.retain(|key, _| def.declares_output(key));
                tracing::debug!(outputs = outputs.len(), "evaluated");
                evaluation.objects.insert(
                    id,
                    ObjectResult {
                        status: ObjectStatus::Evaluated,
                        outputs,
                    },
                );
            }
            Err(err) => {
                diag.push(Issue::from_error(id, &err));
                failed.insert(id);
                evaluation.objects.insert(id, skipped);
            }
        }
    }

    check_sources_uses(&evaluation, &mut diag);

    evaluation.issues = diag.into_issues();
    let warnings: Vec<String> = evaluation.issues.iter().map(|i| i.to_string()).collect();
    let assumptions = serde_json::json!({
        "objects": definitions.len(),
        "overrides": overrides,
    });

    let elapsed = start.elapsed().as_micros() as u64;
    tracing::info!(
        objects = evaluation.objects.len(),
        failed = failed.len(),
        issues = evaluation.issues.len(),
        elapsed_us = elapsed,
        "scenario evaluated"
    );

    Ok(with_metadata(
        "Project-finance cashflow network evaluated in dependency order",
        &assumptions,
        warnings,
        elapsed,
        evaluation,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::default_objects;
    use rust_decimal_macros::dec;

    fn run(overrides: Overrides) -> Evaluation {
        evaluate(&default_objects(), &overrides).unwrap().result
    }

    #[test]
    fn test_default_scenario_evaluates_every_object() {
        let e = run(Overrides::new());
        for id in ObjectId::ALL {
            assert!(e.is_evaluated(id), "{id} was skipped: {:?}", e.issues);
        }
        assert_eq!(e.order.len(), ObjectId::ALL.len());
    }

    #[test]
    fn test_default_scenario_flags_sources_uses_mismatch() {
        let e = run(Overrides::new());
        assert!(e
            .issues_for(ObjectId::Funding)
            .any(|i| i.kind == IssueKind::SourcesUsesMismatch));
    }

    #[test]
    fn test_display_rounding_leaves_full_precision_intact() {
        let defs = default_objects();
        let mut overrides = Overrides::new();
        overrides
            .entry(ObjectId::ContractedRevenue)
            .or_default()
            .insert("contract_years".into(), dec!(20).into());
        overrides
            .entry(ObjectId::OperationalCapex)
            .or_default()
            .insert("major_replacement_cost".into(), dec!(0).into());
        let e = run(overrides);
        let shown = e.for_display(&defs);
        let max_debt = e.number(ObjectId::DebtSizing, "max_debt").unwrap();
        let shown_debt = shown.number(ObjectId::DebtSizing, "max_debt").unwrap();
        assert_eq!(shown_debt, max_debt.round_dp(0));
        assert_ne!(max_debt, shown_debt);
        let status = shown.output(ObjectId::EquityCashflow, "irr_status").unwrap();
        assert_eq!(status.as_text(), Some("converged"));
    }

    #[test]
    fn test_default_merchant_tail_leaves_no_debt_capacity() {
        let e = run(Overrides::new());
        assert_eq!(e.number(ObjectId::DebtSizing, "max_debt"), Some(Decimal::ZERO));
        assert!(e.number(ObjectId::DebtSizing, "sizing_cfads").unwrap() < Decimal::ZERO);
        assert!(e
            .issues_for(ObjectId::DebtSizing)
            .any(|i| i.kind == IssueKind::NumericGuard));
    }

    #[test]
    fn test_unknown_override_input_is_rejected() {
        let mut overrides = Overrides::new();
        overrides
            .entry(ObjectId::Capex)
            .or_default()
            .insert("no_such_input".into(), dec!(1).into());
        let err = evaluate(&default_objects(), &overrides).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }

    #[test]
    fn test_invalid_input_skips_only_downstream() {
        let mut overrides = Overrides::new();
        overrides
            .entry(ObjectId::MerchantRevenue)
            .or_default()
            .insert("merchant_price".into(), "cheap".into());
        let e = run(overrides);
        assert!(!e.is_evaluated(ObjectId::MerchantRevenue));
        assert!(!e.is_evaluated(ObjectId::EquityCashflow));
        assert!(e.is_evaluated(ObjectId::Capex));
        assert!(e.is_evaluated(ObjectId::Funding));
        assert!(e
            .issues_for(ObjectId::MerchantRevenue)
            .any(|i| i.kind == IssueKind::InvalidInput && i.field.as_deref() == Some("merchant_price")));
        assert!(e
            .issues_for(ObjectId::Revenue)
            .any(|i| i.kind == IssueKind::UpstreamFailed));
    }
}
