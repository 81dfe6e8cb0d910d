//! Calculation-object definitions and their declared dependency bindings.
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;
use crate::types::InputValue;

/// Identifier of a calculation object in the cashflow network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectId {
    Timeline,
    Volume,
    ContractedRevenue,
    MerchantRevenue,
    Revenue,
    FixedCosts,
    OperationalCapex,
    Opex,
    Capex,
    ConstructionDebt,
    ConstructionEquity,
    Funding,
    CashflowBeforeDebt,
    DebtSizing,
    OperatingDebt,
    TaxDepreciation,
    TerminalValue,
    EquityCashflow,
    CashflowSummary,
}

/// A named output of another object consumed by this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub from: ObjectId,
    pub output: &'static str,
}

impl ObjectId {
    pub const ALL: [ObjectId; 19] = [
        ObjectId::Timeline,
        ObjectId::Volume,
        ObjectId::ContractedRevenue,
        ObjectId::MerchantRevenue,
        ObjectId::Revenue,
        ObjectId::FixedCosts,
        ObjectId::OperationalCapex,
        ObjectId::Opex,
        ObjectId::Capex,
        ObjectId::ConstructionDebt,
        ObjectId::ConstructionEquity,
        ObjectId::Funding,
        ObjectId::CashflowBeforeDebt,
        ObjectId::DebtSizing,
        ObjectId::OperatingDebt,
        ObjectId::TaxDepreciation,
        ObjectId::TerminalValue,
        ObjectId::EquityCashflow,
        ObjectId::CashflowSummary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectId::Timeline => "timeline",
            ObjectId::Volume => "volume",
            ObjectId::ContractedRevenue => "contracted_revenue",
            ObjectId::MerchantRevenue => "merchant_revenue",
            ObjectId::Revenue => "revenue",
            ObjectId::FixedCosts => "fixed_costs",
            ObjectId::OperationalCapex => "operational_capex",
            ObjectId::Opex => "opex",
            ObjectId::Capex => "capex",
            ObjectId::ConstructionDebt => "construction_debt",
            ObjectId::ConstructionEquity => "construction_equity",
            ObjectId::Funding => "funding",
            ObjectId::CashflowBeforeDebt => "cashflow_before_debt",
            ObjectId::DebtSizing => "debt_sizing",
            ObjectId::OperatingDebt => "operating_debt",
            ObjectId::TaxDepreciation => "tax_depreciation",
            ObjectId::TerminalValue => "terminal_value",
            ObjectId::EquityCashflow => "equity_cashflow",
            ObjectId::CashflowSummary => "cashflow_summary",
        }
    }

    /// Outputs of other objects this object reads. This table is the only
    /// place wiring is declared; the scheduler orders evaluation from it.
    pub fn bindings(self) -> &'static [Binding] {
        use ObjectId::*;
        match self {
            Timeline | Capex | ConstructionDebt => &[],
            Volume | ContractedRevenue | FixedCosts | OperationalCapex => {
                &[Binding { from: Timeline, output: "operating_years" }]
            }
            MerchantRevenue => &[
                Binding { from: Volume, output: "annual_discharge_mwh" },
                Binding { from: ContractedRevenue, output: "is_contracted" },
            ],
            Revenue => &[
                Binding { from: ContractedRevenue, output: "contracted_revenue" },
                Binding { from: MerchantRevenue, output: "merchant_revenue" },
            ],
            Opex => &[
                Binding { from: FixedCosts, output: "fixed_costs" },
                Binding { from: OperationalCapex, output: "annual_operational_capex" },
            ],
            ConstructionEquity => &[Binding { from: Capex, output: "total_capex_amount" }],
            Funding => &[
                Binding { from: ConstructionEquity, output: "construction_equity_total" },
                Binding { from: ConstructionDebt, output: "construction_debt_total" },
                Binding { from: Capex, output: "total_capex_amount" },
            ],
            CashflowBeforeDebt => &[
                Binding { from: Timeline, output: "construction_years" },
                Binding { from: Funding, output: "total_funding" },
                Binding { from: Capex, output: "year0_capex" },
                Binding { from: Capex, output: "year1_capex" },
                Binding { from: Revenue, output: "total_revenue" },
                Binding { from: Opex, output: "annual_opex" },
                Binding { from: OperationalCapex, output: "annual_operational_capex" },
            ],
            DebtSizing => &[Binding { from: CashflowBeforeDebt, output: "cfads_operating" }],
            OperatingDebt => &[
                Binding { from: DebtSizing, output: "max_debt" },
                Binding { from: CashflowBeforeDebt, output: "cfads_operating" },
            ],
            TaxDepreciation => &[
                Binding { from: Capex, output: "total_capex_amount" },
                Binding { from: CashflowBeforeDebt, output: "cfads_operating" },
                Binding { from: OperatingDebt, output: "debt_service_by_year" },
                Binding { from: OperatingDebt, output: "interest_by_year" },
            ],
            TerminalValue => &[
                Binding { from: Revenue, output: "total_revenue" },
                Binding { from: Opex, output: "annual_opex" },
                Binding { from: Timeline, output: "terminal_year" },
            ],
            EquityCashflow => &[
                Binding { from: Timeline, output: "construction_years" },
                Binding { from: Timeline, output: "operating_years" },
                Binding { from: Funding, output: "equity_contribution" },
                Binding { from: CashflowBeforeDebt, output: "cfads_operating" },
                Binding { from: OperatingDebt, output: "debt_service_by_year" },
                Binding { from: TaxDepreciation, output: "tax_by_year" },
                Binding { from: ConstructionEquity, output: "itc_value" },
                Binding { from: TerminalValue, output: "terminal_value" },
            ],
            CashflowSummary => &[
                Binding { from: Timeline, output: "construction_years" },
                Binding { from: CashflowBeforeDebt, output: "cashflow_before_debt" },
                Binding { from: OperatingDebt, output: "debt_service_by_year" },
                Binding { from: TaxDepreciation, output: "tax_by_year" },
                Binding { from: ConstructionEquity, output: "itc_value" },
                Binding { from: TerminalValue, output: "terminal_value" },
            ],
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| EngineError::UnknownObject(s.to_string()))
    }
}

/// A single editable input of a calculation object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub id: String,
    pub label: String,
    /// Default value; `None` means the caller must supply one if `required`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<InputValue>,
    pub unit: String,
    pub required: bool,
}

/// A declared output. `used_by` is documentation for UI wiring only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub id: String,
    pub label: String,
    pub unit: String,
    #[serde(default)]
    pub used_by: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationObject {
    pub id: ObjectId,
    pub name: String,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    /// Human-readable formulas. Not executed.
    #[serde(default)]
    pub logic: Vec<String>,
}

impl CalculationObject {
    pub fn input(&self, id: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.id == id)
    }

    pub fn declares_output(&self, id: &str) -> bool {
        self.outputs.iter().any(|o| o.id == id)
    }

    pub fn output_unit(&self, id: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.unit.as_str())
    }
}

fn num(id: &str, label: &str, value: Decimal, unit: &str, required: bool) -> Input {
    Input {
        id: id.into(),
        label: label.into(),
        value: Some(InputValue::Number(value)),
        unit: unit.into(),
        required,
    }
}

fn choice(id: &str, label: &str, value: &str, unit: &str) -> Input {
    Input {
        id: id.into(),
        label: label.into(),
        value: Some(InputValue::Choice(value.into())),
        unit: unit.into(),
        required: false,
    }
}

fn out(id: &str, label: &str, unit: &str) -> Output {
    Output {
        id: id.into(),
        label: label.into(),
        unit: unit.into(),
        used_by: Vec::new(),
    }
}

fn object(
    id: ObjectId,
    name: &str,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    logic: &[&str],
) -> CalculationObject {
    CalculationObject {
        id,
        name: name.into(),
        inputs,
        outputs,
        logic: logic.iter().map(|l| l.to_string()).collect(),
    }
}

/// The default 100 MW / 2 h battery scenario with a ten-year toll.
pub fn default_objects() -> Vec<CalculationObject> {
    use ObjectId::*;

    let mut objects = vec![
        object(
            Timeline,
            "Timeline",
            vec![
                num("construction_start_year", "Construction Start Year", dec!(-1), "year", true),
                num("construction_years", "Construction Duration", dec!(2), "years", true),
                num("operating_years", "Operating Years", dec!(20), "years", true),
                num("terminal_year_offset", "Terminal Year Offset", dec!(0), "years", false),
            ],
            vec![
                out("cod_year", "COD Year", "year"),
                out("operations_end_year", "Operations End Year", "year"),
                out("terminal_year", "Terminal Year", "year"),
                out("total_model_years", "Total Model Years", "years"),
                out("year_array", "Year Array", "year"),
                out("construction_years", "Construction Years", "years"),
                out("operating_years", "Operating Years", "years"),
            ],
            &[
                "COD_Year = Construction_Start_Year + Construction_Years",
                "Operations_End_Year = COD_Year + Operating_Years",
                "Terminal_Year = Operations_End_Year + Terminal_Year_Offset",
                "Total_Model_Years = Terminal_Year - Construction_Start_Year + 1",
            ],
        ),
        object(
            Volume,
            "Volume (BESS)",
            vec![
                num("rated_power_mw", "Rated Power", dec!(100), "MW", true),
                num("duration_hours", "Duration", dec!(2), "hours", true),
                num("cycles_per_day", "Cycles per Day", dec!(1), "cycles/day", true),
                num("availability_factor", "Availability Factor", dec!(0.95), "ratio", true),
                num("degradation_rate", "Degradation Rate", dec!(0.02), "rate", true),
                num("round_trip_efficiency", "Round Trip Efficiency", dec!(0.88), "ratio", false),
            ],
            vec![
                out("annual_discharge_mwh", "Annual Discharge", "MWh"),
                out("annual_charge_mwh", "Annual Charge (proxy)", "MWh"),
            ],
            &[
                "Gross_Discharge_MWh = Power × Duration × Cycles_per_Day × 365",
                "Annual_Discharge_MWh = Gross × (1 - Degradation)^(Year - 1) × Availability",
                "Annual_Charge_MWh = Annual_Discharge_MWh / Round_Trip_Efficiency",
            ],
        ),
        object(
            ContractedRevenue,
            "Contracted Revenue",
            vec![
                num("contract_years", "Contract Years", dec!(10), "years", true),
                num("toll_payment_year1", "Toll Payment (Year 1)", dec!(15_000_000), "$", true),
                num("toll_escalation", "Toll Escalation", dec!(0.02), "rate", true),
                num("toll_availability_factor", "Toll Availability Factor", dec!(1), "ratio", false),
            ],
            vec![
                out("is_contracted", "Is Contracted (1/0)", "flag"),
                out("toll_payment_current_year", "Toll Payment (Current Year)", "$"),
                out("contracted_revenue", "Contracted Revenue", "$"),
            ],
            &[
                "Is_Contracted = Operating_Year <= Contract_Years",
                "Toll_Current = Toll_Year1 × (1 + Escalation)^(Operating_Year - 1)",
                "Contracted_Revenue = Is_Contracted ? Toll_Current × Availability : 0",
            ],
        ),
        object(
            MerchantRevenue,
            "Merchant Revenue",
            vec![num("merchant_price", "Merchant Price", dec!(70), "$/MWh", true)],
            vec![out("merchant_revenue", "Merchant Revenue", "$")],
            &["Merchant_Revenue = Is_Contracted ? 0 : Annual_Discharge_MWh × Merchant_Price"],
        ),
        object(
            Revenue,
            "Revenue (Aggregator)",
            vec![],
            vec![
                out("total_revenue", "Total Revenue", "$"),
                out("contracted_revenue", "Contracted Revenue", "$"),
                out("merchant_revenue", "Merchant Revenue", "$"),
            ],
            &["Total_Revenue = Contracted_Revenue + Merchant_Revenue"],
        ),
        object(
            FixedCosts,
            "Fixed Costs",
            vec![
                num("om_contract_base", "O&M Contract Base", dec!(5_000_000), "$", true),
                num("om_escalation", "O&M Escalation", dec!(0.025), "rate", true),
                num("land_lease", "Land Lease", dec!(200_000), "$", true),
                num("insurance", "Insurance", dec!(300_000), "$", true),
                num("other_opex", "Other OpEx", dec!(100_000), "$", false),
            ],
            vec![
                out("fixed_costs", "Fixed Costs", "$"),
                out("om_cost", "O&M Cost", "$"),
                out("lease_cost", "Lease Cost", "$"),
                out("insurance_cost", "Insurance Cost", "$"),
            ],
            &["Fixed_Costs = O&M_Base × (1 + Escalation)^Operating_Year + Lease + Insurance + Other"],
        ),
        object(
            OperationalCapex,
            "Operational CAPEX",
            vec![
                num("annual_opex_capex", "Annual OpEx CAPEX", dec!(500_000), "$", true),
                num("opex_capex_escalation", "OpEx CAPEX Escalation", dec!(0.025), "rate", true),
                num("major_replacement_year", "Major Replacement Year", dec!(10), "years", false),
                num("major_replacement_cost", "Major Replacement Cost", dec!(5_000_000), "$", false),
            ],
            vec![out("annual_operational_capex", "Annual Operational CAPEX", "$")],
            &[
                "Base = Annual_OpEx_CAPEX × (1 + Escalation)^(Operating_Year - 1)",
                "Major = Operating_Year == Major_Replacement_Year ? Major_Replacement_Cost : 0",
            ],
        ),
        object(
            Opex,
            "OpEx (Aggregator)",
            vec![],
            vec![
                out("annual_opex", "Annual OpEx", "$"),
                out("fixed_costs", "Fixed Costs", "$"),
                out("operational_capex", "Operational Capex", "$"),
            ],
            &["Annual_OpEx = Fixed_Costs + Operational_CAPEX"],
        ),
        object(
            Capex,
            "CAPEX",
            vec![
                num("total_capex", "Total CAPEX", dec!(100_000_000), "$", true),
                num("year0_percentage", "Year 0 Percentage", dec!(0.80), "rate", true),
                num("year1_percentage", "Year 1 Percentage", dec!(0.20), "rate", true),
                num("contingency", "Contingency", dec!(0.05), "rate", false),
            ],
            vec![
                out("total_capex_amount", "Total CAPEX Amount", "$"),
                out("year0_capex", "Year 0 CAPEX", "$"),
                out("year1_capex", "Year 1 CAPEX", "$"),
            ],
            &[
                "Total_CAPEX_Amount = Total_CAPEX × (1 + Contingency)",
                "Year_N_CAPEX = Total_CAPEX_Amount × Year_N_Percentage",
            ],
        ),
        object(
            ConstructionDebt,
            "Construction Debt",
            vec![
                num("construction_debt_amount", "Construction Debt Amount", dec!(80_000_000), "$", true),
                num("construction_debt_fee_pct", "Upfront Fee", dec!(0.01), "rate", false),
            ],
            vec![out("construction_debt_total", "Construction Debt Total", "$")],
            &["Construction_Debt_Total = Amount × (1 + Fee)"],
        ),
        object(
            ConstructionEquity,
            "Construction Equity",
            vec![
                num("construction_equity_amount", "Construction Equity Amount", dec!(25_000_000), "$", true),
                num("itc_percentage", "ITC Percentage", dec!(0.30), "rate", true),
            ],
            vec![
                out("construction_equity_total", "Construction Equity Total", "$"),
                out("itc_value", "ITC Value", "$"),
            ],
            &["ITC_Value = Total_CAPEX_Amount × ITC_Percentage"],
        ),
        object(
            Funding,
            "Funding (Aggregator)",
            vec![
                num("equity_year0_pct", "Equity Year 0 %", dec!(0.80), "rate", true),
                num("debt_year0_pct", "Debt Year 0 %", dec!(0.80), "rate", true),
            ],
            vec![
                out("total_funding", "Total Funding", "$"),
                out("equity_contribution", "Equity Contribution", "$"),
                out("debt_drawdown", "Debt Drawdown", "$"),
                out("equity_year0", "Equity Drawdown (Year 0)", "$"),
                out("equity_year1", "Equity Drawdown (Year 1)", "$"),
                out("debt_year0", "Debt Drawdown (Year 0)", "$"),
                out("debt_year1", "Debt Drawdown (Year 1)", "$"),
                out("sources_uses_delta", "Sources - Uses (Delta)", "$"),
            ],
            &[
                "Total_Funding = Construction_Equity_Total + Construction_Debt_Total",
                "Sources_Uses_Delta = Total_Funding - Total_CAPEX_Amount",
            ],
        ),
        object(
            CashflowBeforeDebt,
            "Cashflow (Before Debt)",
            vec![],
            vec![
                out("cashflow_before_debt", "Cashflow Before Debt (all periods)", "$"),
                out("cfads_operating", "CFADS (operating periods)", "$"),
                out("cashflow_before_debt_year0", "Cashflow Before Debt (Year 0)", "$"),
                out("cashflow_before_debt_year1", "Cashflow Before Debt (Year 1)", "$"),
            ],
            &[
                "Year_0 = Total_Funding - Year_0_CAPEX",
                "Year_1 = -Year_1_CAPEX",
                "Operating_t = Total_Revenue_t - Annual_OpEx_t - Annual_Operational_CAPEX_t",
            ],
        ),
        object(
            DebtSizing,
            "Debt Sizing (Target DSCR)",
            vec![
                num("target_dscr", "Target DSCR", dec!(1.35), "x", true),
                num("debt_rate", "Debt Interest Rate", dec!(0.055), "rate", true),
                num("debt_term", "Debt Term", dec!(15), "years", true),
                choice("sizing_basis", "Sizing Basis", "minimum", "enum"),
            ],
            vec![
                out("sizing_cfads", "Sizing CFADS", "$"),
                out("max_annual_ds", "Max Annual Debt Service", "$"),
                out("max_debt", "Max Debt (Target DSCR)", "$"),
                out("actual_annual_ds", "Annual Debt Service (Sized)", "$"),
                out("achievable_dscr", "Achievable DSCR", "x"),
            ],
            &[
                "Sizing_CFADS = Min | Average | First of CFADS over term (Sizing_Basis)",
                "Max_Annual_DS = Sizing_CFADS / Target_DSCR",
                "Max_Debt = Max_Annual_DS / 12 × (1 - (1 + r_m)^-n) / r_m",
                "Achievable_DSCR = Sizing_CFADS / Actual_Annual_DS",
            ],
        ),
        object(
            OperatingDebt,
            "Operating Debt",
            vec![
                choice("principal_source", "Principal Source", "sized", "enum"),
                Input {
                    id: "debt_amount".into(),
                    label: "Debt Amount (manual)".into(),
                    value: None,
                    unit: "$".into(),
                    required: false,
                },
                num("debt_rate", "Debt Interest Rate", dec!(0.055), "rate", true),
                num("debt_term", "Debt Term", dec!(15), "years", true),
            ],
            vec![
                out("principal", "Principal", "$"),
                out("debt_service", "Annual Debt Service", "$"),
                out("debt_service_by_year", "Debt Service by Year", "$"),
                out("interest_by_year", "Interest by Year", "$"),
                out("principal_by_year", "Principal Repaid by Year", "$"),
                out("closing_balance_by_year", "Closing Balance by Year", "$"),
                out("dscr_by_year", "DSCR by Year", "x"),
                out("min_dscr", "Minimum DSCR", "x"),
            ],
            &["Annual_DS = P × r_m(1 + r_m)^n / ((1 + r_m)^n - 1) × 12"],
        ),
        object(
            TaxDepreciation,
            "Tax & Depreciation",
            vec![
                num("tax_rate", "Tax Rate", dec!(0.30), "rate", true),
                num("depr_years", "Depreciation Life", dec!(20), "years", true),
                choice("interest_method", "Interest Deduction Method", "schedule", "enum"),
                num("interest_proxy_pct", "Interest Proxy (% of Debt Service)", dec!(0.50), "rate", false),
            ],
            vec![
                out("annual_depreciation", "Annual Depreciation", "$"),
                out("depreciation_by_year", "Depreciation by Year", "$"),
                out("interest_deduction_by_year", "Interest Deduction by Year", "$"),
                out("taxable_income_by_year", "Taxable Income by Year", "$"),
                out("tax_by_year", "Tax by Year", "$"),
                out("total_tax", "Total Tax", "$"),
            ],
            &[
                "Annual_Depreciation = Total_CAPEX_Amount / Depreciation_Life",
                "Taxable_t = CFADS_t - Interest_t - Depreciation_t",
                "Tax_t = max(0, Taxable_t × Tax_Rate)",
            ],
        ),
        object(
            TerminalValue,
            "Terminal Value",
            vec![
                num("terminal_multiple", "Terminal Multiple", dec!(10), "x", true),
                num("discount_rate", "Discount Rate", dec!(0.08), "rate", true),
            ],
            vec![
                out("final_year_ebitda", "Final Year EBITDA", "$"),
                out("terminal_value", "Terminal Value", "$"),
                out("present_value_terminal", "Present Value Terminal", "$"),
            ],
            &[
                "Terminal_Value = Final_Year_EBITDA × Terminal_Multiple",
                "PV_Terminal = Terminal_Value / (1 + Discount_Rate)^Terminal_Year",
            ],
        ),
        object(
            EquityCashflow,
            "Equity Cashflow",
            vec![num("irr_guess", "IRR Initial Guess", dec!(0.10), "rate", false)],
            vec![
                out("equity_cf_by_period", "Equity Cashflow Vector", "$"),
                out("equity_cf_construction", "Equity CF (Construction)", "$"),
                out("equity_cf_operations", "Equity CF (Operations Avg)", "$"),
                out("equity_cf_terminal", "Equity CF (Terminal)", "$"),
                out("equity_irr", "Equity IRR", "rate"),
                out("irr_status", "IRR Status", "status"),
                out("equity_moic", "Equity MOIC", "x"),
            ],
            &[
                "Construction_CF = -Equity_Contribution / Construction_Years",
                "Operating_CF_t = CFADS_t - Debt_Service_t - Tax_t (+ ITC in year 1)",
                "Terminal value added to the final period",
            ],
        ),
        object(
            CashflowSummary,
            "Cashflow Summary (After Debt)",
            vec![num("discount_rate", "Project Discount Rate", dec!(0.08), "rate", false)],
            vec![
                out("net_cash_flow_by_year", "Net Cash Flow by Period", "$"),
                out("cumulative_cash_flow", "Cumulative Cash Flow", "$"),
                out("project_npv", "Project NPV (before debt)", "$"),
            ],
            &[
                "Net_t = CFBD_t - Debt_Service_t - Tax_t (+ ITC in first operating period)",
                "Cumulative = Σ Net_t + Terminal_Value",
            ],
        ),
    ];

    fill_used_by(&mut objects);
    objects
}

/// Populate `used_by` metadata from the binding table.
pub fn fill_used_by(objects: &mut [CalculationObject]) {
    let present: Vec<ObjectId> = objects.iter().map(|o| o.id).collect();
    for obj in objects.iter_mut() {
        for output in obj.outputs.iter_mut() {
            output.used_by = present
                .iter()
                .copied()
                .filter(|consumer| {
                    consumer
                        .bindings()
                        .iter()
                        .any(|b| b.from == obj.id && b.output == output.id)
                })
                .collect();
        }
    }
}
