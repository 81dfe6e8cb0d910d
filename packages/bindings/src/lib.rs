use napi::Result as NapiResult;
use napi_derive::napi;

use rpf_core::asset::{AssetInputs, AssetResults};
use rpf_core::plan::EvaluationPlan;
use rpf_core::{default_objects, Scenario};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Scenario evaluation
// ---------------------------------------------------------------------------

/// Evaluate a scenario document; `display` rounds outputs for presentation.
#[napi]
pub fn evaluate_scenario(scenario_json: String, display: Option<bool>) -> NapiResult<String> {
    let store = Scenario::from_json(&scenario_json)
        .map_err(to_napi_error)?
        .into_store();
    let mut output = store.evaluate().map_err(to_napi_error)?;
    if display.unwrap_or(false) {
        output.result = output.result.for_display(store.definitions());
    }
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Evaluate the default objects with an asset record applied, returning the
/// per-asset results summary.
#[napi]
pub fn evaluate_asset(asset_json: String) -> NapiResult<String> {
    let asset: AssetInputs = serde_json::from_str(&asset_json).map_err(to_napi_error)?;
    let mut store = Scenario::default().into_store();
    store.merge(asset.to_overrides()).map_err(to_napi_error)?;
    let output = store.evaluate().map_err(to_napi_error)?;
    let results = AssetResults::from_evaluation(&output.result);
    serde_json::to_string(&serde_json::json!({
        "result": results,
        "warnings": output.warnings,
    }))
    .map_err(to_napi_error)
}

#[napi]
pub fn default_object_definitions() -> NapiResult<String> {
    serde_json::to_string(&default_objects()).map_err(to_napi_error)
}

#[napi]
pub fn evaluation_plan(scenario_json: String) -> NapiResult<String> {
    let store = Scenario::from_json(&scenario_json)
        .map_err(to_napi_error)?
        .into_store();
    let plan = EvaluationPlan::build(store.definitions()).map_err(to_napi_error)?;
    serde_json::to_string(&plan).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Standalone solvers
// ---------------------------------------------------------------------------

#[napi]
pub fn solve_irr(input_json: String) -> NapiResult<String> {
    let input: rpf_core::returns::equity::CashflowReturnsInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        rpf_core::returns::equity::analyze_cashflows(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn size_debt(input_json: String) -> NapiResult<String> {
    let input: rpf_core::financing::sizing::DebtSizingRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        rpf_core::financing::sizing::size_debt_to_target(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
