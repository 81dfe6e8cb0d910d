//! Mapping between the per-asset documents and the engine.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::Evaluation;
use crate::inputs::Overrides;
use crate::object::ObjectId;
use crate::types::{InputValue, Money, Multiple, Rate};

/// Contract terms carried on an asset record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractTerms {
    #[serde(default)]
    pub contract_years: Option<u32>,
    #[serde(default)]
    pub toll_payment_year1: Option<Money>,
    #[serde(default)]
    pub toll_escalation: Option<Rate>,
    #[serde(default)]
    pub availability_factor: Option<Decimal>,
}

/// Asset-input document. Every field is optional; absent fields leave the
/// object defaults in place. Rates are decimals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetInputs {
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub asset_name: Option<String>,
    /// Rated power, MW
    #[serde(default)]
    pub capacity: Option<Decimal>,
    /// Storage duration, hours
    #[serde(default)]
    pub duration_hours: Option<Decimal>,
    /// Storage volume, MWh; gives the duration when `duration_hours` is absent
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub availability_factor: Option<Decimal>,
    #[serde(default)]
    pub annual_degradation: Option<Rate>,
    #[serde(default)]
    pub cost_capex: Option<Money>,
    #[serde(default)]
    pub cost_operating_costs: Option<Money>,
    #[serde(default)]
    pub cost_operating_cost_escalation: Option<Rate>,
    #[serde(default)]
    pub cost_interest_rate: Option<Rate>,
    #[serde(default)]
    pub cost_tenor_years: Option<u32>,
    #[serde(default)]
    pub cost_target_dscr: Option<Multiple>,
    #[serde(default)]
    pub merchant_price: Option<Money>,
    #[serde(default)]
    pub construction_start_year: Option<i64>,
    #[serde(default)]
    pub construction_duration: Option<u32>,
    /// Operating life in years
    #[serde(default)]
    pub asset_life: Option<u32>,
    #[serde(default)]
    pub contract: Option<ContractTerms>,
}

impl AssetInputs {
    /// Input overrides implied by the asset record.
    pub fn to_overrides(&self) -> Overrides {
        let mut overrides = Overrides::new();
        let mut put = |object: ObjectId, input: &str, value: Option<Decimal>| {
            if let Some(v) = value {
                overrides
                    .entry(object)
                    .or_default()
                    .insert(input.to_string(), InputValue::Number(v));
            }
        };

        put(ObjectId::Timeline, "construction_start_year", self.construction_start_year.map(Decimal::from));
        put(ObjectId::Timeline, "construction_years", self.construction_duration.map(Decimal::from));
        put(ObjectId::Timeline, "operating_years", self.asset_life.map(Decimal::from));

        put(ObjectId::Volume, "rated_power_mw", self.capacity);
        put(ObjectId::Volume, "duration_hours", self.duration());
        put(ObjectId::Volume, "availability_factor", self.availability_factor);
        put(ObjectId::Volume, "degradation_rate", self.annual_degradation);

        put(ObjectId::MerchantRevenue, "merchant_price", self.merchant_price);

        put(ObjectId::FixedCosts, "om_contract_base", self.cost_operating_costs);
        put(ObjectId::FixedCosts, "om_escalation", self.cost_operating_cost_escalation);

        put(ObjectId::Capex, "total_capex", self.cost_capex);

        for object in [ObjectId::DebtSizing, ObjectId::OperatingDebt] {
            put(object, "debt_rate", self.cost_interest_rate);
            put(object, "debt_term", self.cost_tenor_years.map(Decimal::from));
        }
        put(ObjectId::DebtSizing, "target_dscr", self.cost_target_dscr);

        if let Some(c) = &self.contract {
            put(ObjectId::ContractedRevenue, "contract_years", c.contract_years.map(Decimal::from));
            put(ObjectId::ContractedRevenue, "toll_payment_year1", c.toll_payment_year1);
            put(ObjectId::ContractedRevenue, "toll_escalation", c.toll_escalation);
            put(ObjectId::ContractedRevenue, "toll_availability_factor", c.availability_factor);
        }

        overrides
    }

    fn duration(&self) -> Option<Decimal> {
        self.duration_hours.or_else(|| match (self.volume, self.capacity) {
            (Some(mwh), Some(mw)) if !mw.is_zero() => Some(mwh / mw),
            _ => None,
        })
    }
}

/// Per-asset results summary. A field is `None` when the object that
/// produces it was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetResults {
    pub total_capex: Option<Money>,
    pub total_debt: Option<Money>,
    pub total_equity: Option<Money>,
    /// Debt / total CAPEX
    pub gearing: Option<Decimal>,
    pub total_revenue: Option<Money>,
    pub total_opex: Option<Money>,
    pub total_cfads: Option<Money>,
    pub terminal_value: Option<Money>,
    pub equity_irr: Option<Rate>,
    pub irr_status: Option<String>,
}

impl AssetResults {
    pub fn from_evaluation(evaluation: &Evaluation) -> Self {
        let sum = |object: ObjectId, key: &str| {
            evaluation
                .series(object, key)
                .map(|s| s.iter().copied().sum::<Decimal>())
        };

        let total_capex = evaluation.number(ObjectId::Capex, "total_capex_amount");
        let total_debt = evaluation.number(ObjectId::OperatingDebt, "principal");
        let gearing = match (total_debt, total_capex) {
            (Some(d), Some(c)) if !c.is_zero() => Some(d / c),
            _ => None,
        };

        AssetResults {
            total_capex,
            total_debt,
            total_equity: evaluation.number(ObjectId::Funding, "equity_contribution"),
            gearing,
            total_revenue: sum(ObjectId::Revenue, "total_revenue"),
            total_opex: sum(ObjectId::Opex, "annual_opex"),
            total_cfads: sum(ObjectId::CashflowBeforeDebt, "cfads_operating"),
            terminal_value: evaluation.number(ObjectId::TerminalValue, "terminal_value"),
            equity_irr: evaluation.number(ObjectId::EquityCashflow, "equity_irr"),
            irr_status: evaluation
                .output(ObjectId::EquityCashflow, "irr_status")
                .and_then(|v| v.as_text())
                .map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_volume_derives_duration() {
        let asset = AssetInputs {
            capacity: Some(dec!(50)),
            volume: Some(dec!(200)),
            ..Default::default()
        };
        let o = asset.to_overrides();
        assert_eq!(o[&ObjectId::Volume]["duration_hours"], InputValue::Number(dec!(4)));
        assert_eq!(o[&ObjectId::Volume]["rated_power_mw"], InputValue::Number(dec!(50)));
    }

    #[test]
    fn test_debt_terms_apply_to_sizing_and_schedule() {
        let asset = AssetInputs {
            cost_interest_rate: Some(dec!(0.06)),
            cost_tenor_years: Some(18),
            ..Default::default()
        };
        let o = asset.to_overrides();
        for object in [ObjectId::DebtSizing, ObjectId::OperatingDebt] {
            assert_eq!(o[&object]["debt_rate"], InputValue::Number(dec!(0.06)));
            assert_eq!(o[&object]["debt_term"], InputValue::Number(dec!(18)));
        }
    }

    #[test]
    fn test_empty_asset_overrides_nothing() {
        assert!(AssetInputs::default().to_overrides().is_empty());
    }
}
