use pretty_assertions::assert_eq;
use rpf_core::diagnostics::IssueKind;
use rpf_core::inputs::Overrides;
use rpf_core::plan::EvaluationPlan;
use rpf_core::{default_objects, evaluate, EngineError, Evaluation, InputValue, ObjectId, ScenarioStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn run(overrides: &Overrides) -> Evaluation {
    evaluate(&default_objects(), overrides).unwrap().result
}

fn set(overrides: &mut Overrides, object: ObjectId, input: &str, value: impl Into<InputValue>) {
    overrides
        .entry(object)
        .or_default()
        .insert(input.to_string(), value.into());
}

fn close(actual: Decimal, expected: Decimal, tol: Decimal) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected} ± {tol}, got {actual}"
    );
}

// ===========================================================================
// Default scenario
// ===========================================================================

#[test]
fn test_default_scenario_end_to_end() {
    let e = run(&Overrides::new());

    assert_eq!(e.number(ObjectId::Timeline, "cod_year"), Some(dec!(1)));
    assert_eq!(e.number(ObjectId::Timeline, "terminal_year"), Some(dec!(21)));

    let discharge = e.series(ObjectId::Volume, "annual_discharge_mwh").unwrap();
    assert_eq!(discharge.len(), 20);
    close(discharge[0], dec!(69_350), dec!(0.0001));

    assert_eq!(e.number(ObjectId::Capex, "total_capex_amount"), Some(dec!(105_000_000)));
    assert_eq!(e.number(ObjectId::ConstructionEquity, "itc_value"), Some(dec!(31_500_000)));
    assert_eq!(e.number(ObjectId::Funding, "sources_uses_delta"), Some(dec!(800_000)));

    let cfbd = e.series(ObjectId::CashflowBeforeDebt, "cashflow_before_debt").unwrap();
    assert_eq!(cfbd.len(), 22);
    assert_eq!(cfbd[0], dec!(21_800_000));
    assert_eq!(cfbd[1], dec!(-21_000_000));

    let cfads = e.series(ObjectId::CashflowBeforeDebt, "cfads_operating").unwrap();
    assert_eq!(cfads.len(), 20);
    close(cfads[0], dec!(8_275_000), dec!(0.01));
    close(cfads[8], dec!(9_512_172.97), dec!(0.01));
    // Year 10 carries the major replacement
    close(cfads[9], dec!(-322_897.16), dec!(0.01));

    // Merchant tail runs at a loss, so the final-year EBITDA is negative
    close(
        e.number(ObjectId::TerminalValue, "terminal_value").unwrap(),
        dec!(-62_853_635.20),
        dec!(0.01),
    );

    let vector = e.series(ObjectId::EquityCashflow, "equity_cf_by_period").unwrap();
    assert_eq!(vector.len(), 22);
    assert_eq!(vector[0], dec!(-12_500_000));
    assert_eq!(vector[1], dec!(-12_500_000));
    close(vector[2], dec!(38_867_500), dec!(0.01));

    let status = e.output(ObjectId::EquityCashflow, "irr_status").unwrap();
    assert_eq!(status.as_text(), Some("converged"));
    close(
        e.number(ObjectId::EquityCashflow, "equity_irr").unwrap(),
        dec!(0.0365),
        dec!(0.001),
    );
}

#[test]
fn test_operating_cfads_deducts_opex_and_operational_capex() {
    let e = run(&Overrides::new());
    let revenue = e.series(ObjectId::Revenue, "total_revenue").unwrap();
    let opex = e.series(ObjectId::Opex, "annual_opex").unwrap();
    let op_capex = e.series(ObjectId::OperationalCapex, "annual_operational_capex").unwrap();
    let cfads = e.series(ObjectId::CashflowBeforeDebt, "cfads_operating").unwrap();

    for t in 0..cfads.len() {
        assert_eq!(cfads[t], revenue[t] - opex[t] - op_capex[t], "period {}", t + 1);
    }
    // 15,000,000 - 6,225,000 - 500,000
    assert_eq!(cfads[0], dec!(8_275_000));
}

#[test]
fn test_capex_phasing_default() {
    let e = run(&Overrides::new());
    assert_eq!(e.number(ObjectId::Capex, "year0_capex"), Some(dec!(84_000_000)));
    assert_eq!(e.number(ObjectId::Capex, "year1_capex"), Some(dec!(21_000_000)));
}

#[test]
fn test_evaluation_is_repeatable() {
    let store = ScenarioStore::default();
    let a = store.evaluate().unwrap();
    let b = store.evaluate().unwrap();
    assert_eq!(a.result, b.result);
    assert_eq!(a.warnings, b.warnings);
}

#[test]
fn test_contract_and_merchant_are_mutually_exclusive() {
    let e = run(&Overrides::new());
    let contracted = e.series(ObjectId::Revenue, "contracted_revenue").unwrap();
    let merchant = e.series(ObjectId::Revenue, "merchant_revenue").unwrap();
    let flags = e.series(ObjectId::ContractedRevenue, "is_contracted").unwrap();

    for (year, ((c, m), flag)) in contracted.iter().zip(merchant).zip(flags).enumerate() {
        assert!(c.is_zero() || m.is_zero(), "year {} has both revenues", year + 1);
        if year < 10 {
            assert_eq!(*flag, Decimal::ONE);
            assert!(*c > Decimal::ZERO);
        } else {
            assert_eq!(*flag, Decimal::ZERO);
            assert!(c.is_zero());
            assert!(*m > Decimal::ZERO);
        }
    }
}

#[test]
fn test_balanced_funding_raises_no_sources_uses_issue() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::Capex, "contingency", dec!(0));
    set(&mut o, ObjectId::ConstructionEquity, "construction_equity_amount", dec!(20_000_000));
    set(&mut o, ObjectId::ConstructionDebt, "construction_debt_amount", dec!(80_000_000));
    set(&mut o, ObjectId::ConstructionDebt, "construction_debt_fee_pct", dec!(0));
    let e = run(&o);

    assert_eq!(e.number(ObjectId::Funding, "sources_uses_delta"), Some(Decimal::ZERO));
    assert!(!e
        .issues
        .iter()
        .any(|i| i.kind == IssueKind::SourcesUsesMismatch));
}

// ===========================================================================
// Debt in a fully contracted scenario
// ===========================================================================

#[test]
fn test_major_replacement_year_leaves_contracted_scenario_without_capacity() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::ContractedRevenue, "contract_years", dec!(20));
    let e = run(&o);

    close(
        e.number(ObjectId::DebtSizing, "sizing_cfads").unwrap(),
        dec!(-322_897.16),
        dec!(0.01),
    );
    assert_eq!(e.number(ObjectId::DebtSizing, "max_debt"), Some(Decimal::ZERO));
}

#[test]
fn test_fully_contracted_scenario_sizes_debt_to_target() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::ContractedRevenue, "contract_years", dec!(20));
    set(&mut o, ObjectId::OperationalCapex, "major_replacement_cost", dec!(0));
    let e = run(&o);

    // CFADS grows every year, so the first operating year binds
    close(
        e.number(ObjectId::DebtSizing, "sizing_cfads").unwrap(),
        dec!(8_275_000),
        dec!(0.01),
    );
    let max_debt = e.number(ObjectId::DebtSizing, "max_debt").unwrap();
    close(max_debt, dec!(62_515_336.25), dec!(0.05));
    assert_eq!(e.number(ObjectId::OperatingDebt, "principal"), Some(max_debt));

    close(
        e.number(ObjectId::OperatingDebt, "min_dscr").unwrap(),
        dec!(1.35),
        dec!(0.0001),
    );

    let balances = e.series(ObjectId::OperatingDebt, "closing_balance_by_year").unwrap();
    assert_eq!(balances[14], Decimal::ZERO);
    assert!(balances[15..].iter().all(|b| b.is_zero()));

    let status = e.output(ObjectId::EquityCashflow, "irr_status").unwrap();
    assert_eq!(status.as_text(), Some("converged"));
    assert!(e.number(ObjectId::EquityCashflow, "equity_irr").unwrap() > dec!(0.3));
}

#[test]
fn test_manual_principal_overrides_sizing() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::OperatingDebt, "principal_source", "manual");
    set(&mut o, ObjectId::OperatingDebt, "debt_amount", dec!(50_000_000));
    let e = run(&o);
    assert_eq!(e.number(ObjectId::OperatingDebt, "principal"), Some(dec!(50_000_000)));
    assert!(e.number(ObjectId::OperatingDebt, "debt_service").unwrap() > Decimal::ZERO);
}

#[test]
fn test_manual_principal_without_amount_skips_downstream() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::OperatingDebt, "principal_source", "manual");
    let e = run(&o);
    assert!(!e.is_evaluated(ObjectId::OperatingDebt));
    assert!(!e.is_evaluated(ObjectId::EquityCashflow));
    assert!(e.is_evaluated(ObjectId::DebtSizing));
    assert!(e
        .issues_for(ObjectId::OperatingDebt)
        .any(|i| i.kind == IssueKind::MissingInput && i.field.as_deref() == Some("debt_amount")));
}

// ===========================================================================
// Failure isolation and wiring errors
// ===========================================================================

#[test]
fn test_missing_required_input_is_isolated() {
    let mut defs = default_objects();
    let merchant = defs
        .iter_mut()
        .find(|d| d.id == ObjectId::MerchantRevenue)
        .unwrap();
    merchant
        .inputs
        .iter_mut()
        .find(|i| i.id == "merchant_price")
        .unwrap()
        .value = None;

    let e = evaluate(&defs, &Overrides::new()).unwrap().result;

    assert!(!e.is_evaluated(ObjectId::MerchantRevenue));
    assert!(e
        .issues_for(ObjectId::MerchantRevenue)
        .any(|i| i.kind == IssueKind::MissingInput));
    for downstream in [ObjectId::Revenue, ObjectId::CashflowBeforeDebt, ObjectId::EquityCashflow] {
        assert!(!e.is_evaluated(downstream), "{downstream} should be skipped");
    }
    for independent in [ObjectId::Timeline, ObjectId::Capex, ObjectId::Funding, ObjectId::Opex] {
        assert!(e.is_evaluated(independent), "{independent} should still run");
    }
    assert!(e.output(ObjectId::Revenue, "total_revenue").is_none());
}

#[test]
fn test_undefined_source_object_fails_the_call() {
    let defs: Vec<_> = default_objects()
        .into_iter()
        .filter(|d| d.id != ObjectId::Timeline)
        .collect();
    let err = evaluate(&defs, &Overrides::new()).unwrap_err();
    assert!(matches!(err, EngineError::UnknownDependency { ref depends_on, .. } if depends_on == "timeline"));
}

#[test]
fn test_undeclared_output_fails_the_call() {
    let mut defs = default_objects();
    let capex = defs.iter_mut().find(|d| d.id == ObjectId::Capex).unwrap();
    capex.outputs.retain(|o| o.id != "year1_capex");
    let err = EvaluationPlan::build(&defs).unwrap_err();
    assert!(matches!(err, EngineError::WiringMismatch { ref output, .. } if output == "year1_capex"));
}

#[test]
fn test_override_for_unknown_object_is_rejected() {
    let defs: Vec<_> = default_objects()
        .into_iter()
        .filter(|d| d.id != ObjectId::CashflowSummary)
        .collect();
    let mut o = Overrides::new();
    set(&mut o, ObjectId::CashflowSummary, "discount_rate", dec!(0.1));
    let err = evaluate(&defs, &o).unwrap_err();
    assert_eq!(err, EngineError::UnknownObject("cashflow_summary".into()));
}

#[test]
fn test_plan_places_every_object_after_its_sources() {
    let plan = EvaluationPlan::build(&default_objects()).unwrap();
    let order: Vec<ObjectId> = plan.order().collect();
    assert_eq!(order.len(), ObjectId::ALL.len());
    assert_eq!(order[0], ObjectId::Timeline);
    for step in &plan.steps {
        let at = order.iter().position(|o| *o == step.object).unwrap();
        for dep in &step.depends_on {
            let dep_at = order.iter().position(|o| o == dep).unwrap();
            assert!(dep_at < at, "{} runs before its source {}", step.object, dep);
        }
    }
}

// ===========================================================================
// Edge cases
// ===========================================================================

#[test]
fn test_zero_construction_years_nets_equity_into_first_period() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::Timeline, "construction_years", dec!(0));
    let e = run(&o);

    assert!(e.is_evaluated(ObjectId::EquityCashflow));
    let vector = e.series(ObjectId::EquityCashflow, "equity_cf_by_period").unwrap();
    assert_eq!(vector.len(), 20);
    let cfbd = e.series(ObjectId::CashflowBeforeDebt, "cashflow_before_debt").unwrap();
    assert_eq!(cfbd.len(), 20);
    // 8,275,000 CFADS - 907,500 tax + 31.5M ITC - 25M equity
    close(vector[0], dec!(13_867_500), dec!(0.01));
    assert!(e
        .issues
        .iter()
        .any(|i| i.kind == IssueKind::ConfigurationNote));
}

#[test]
fn test_zero_debt_rate_is_guarded_not_fatal() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::DebtSizing, "debt_rate", dec!(0));
    set(&mut o, ObjectId::OperatingDebt, "debt_rate", dec!(0));
    let e = run(&o);
    assert!(e.is_evaluated(ObjectId::EquityCashflow));
    assert_eq!(e.number(ObjectId::DebtSizing, "max_debt"), Some(Decimal::ZERO));
    assert!(e
        .issues_for(ObjectId::DebtSizing)
        .any(|i| i.kind == IssueKind::NumericGuard));
}

#[test]
fn test_first_year_sizing_basis_restores_debt_capacity() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::DebtSizing, "sizing_basis", "first_year");
    let e = run(&o);
    close(
        e.number(ObjectId::DebtSizing, "max_debt").unwrap(),
        dec!(62_515_336.25),
        dec!(0.05),
    );
}

#[test]
fn test_unknown_sizing_basis_is_invalid() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::DebtSizing, "sizing_basis", "median");
    let e = run(&o);
    assert!(!e.is_evaluated(ObjectId::DebtSizing));
    assert!(e
        .issues_for(ObjectId::DebtSizing)
        .any(|i| i.kind == IssueKind::InvalidInput && i.field.as_deref() == Some("sizing_basis")));
}

// ===========================================================================
// Numeric range
// ===========================================================================

#[test]
fn test_runaway_escalation_fails_only_the_escalating_object() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::Timeline, "operating_years", dec!(60));
    set(&mut o, ObjectId::ContractedRevenue, "toll_escalation", dec!(2));
    let e = run(&o);

    assert!(!e.is_evaluated(ObjectId::ContractedRevenue));
    assert!(e
        .issues_for(ObjectId::ContractedRevenue)
        .any(|i| i.kind == IssueKind::NumericFailure));

    for downstream in [
        ObjectId::MerchantRevenue,
        ObjectId::Revenue,
        ObjectId::CashflowBeforeDebt,
        ObjectId::DebtSizing,
        ObjectId::TerminalValue,
        ObjectId::EquityCashflow,
    ] {
        assert!(!e.is_evaluated(downstream), "{downstream} should be skipped");
        assert!(e
            .issues_for(downstream)
            .any(|i| i.kind == IssueKind::UpstreamFailed));
    }
    for independent in [
        ObjectId::Timeline,
        ObjectId::Volume,
        ObjectId::FixedCosts,
        ObjectId::OperationalCapex,
        ObjectId::Opex,
        ObjectId::Funding,
    ] {
        assert!(e.is_evaluated(independent), "{independent} should still run");
    }
}

#[test]
fn test_long_horizon_with_ordinary_escalation_evaluates() {
    let mut o = Overrides::new();
    set(&mut o, ObjectId::Timeline, "operating_years", dec!(100));
    let e = run(&o);

    for id in ObjectId::ALL {
        assert!(e.is_evaluated(id), "{id} was skipped: {:?}", e.issues);
    }
    let vector = e.series(ObjectId::EquityCashflow, "equity_cf_by_period").unwrap();
    assert_eq!(vector.len(), 102);
    assert!(!e.issues.iter().any(|i| i.kind == IssueKind::NumericFailure));
}
